pub mod ir;
mod output;
mod naming;
mod entry;
mod xml;
mod json;

pub use ir::Stmt;
pub use output::{Indenter, Output};
pub use naming::{alphanum_hash, variable_name};
pub use entry::assemble_entry;
pub use xml::XmlGenerator;
pub use json::JsonGenerator;

use crate::model::{Format, Specification};
use serde::Serialize;

/// Name printed in the generated-code banner
pub const GENERATOR_NAME: &str = "bibsearch-codegen";

/// Generator options
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Specification path shown in the banner
    pub input_name: String,
    /// Wrap the body in a complete function of this name
    pub function_name: Option<String>,
    /// Indent depth of the body in 4-space units (default: 2, or 0 with `function_name`)
    pub base_depth: Option<usize>,
    /// Logging category for emitted `qCWarning` diagnostics
    pub log_category: String,
    /// Upper bound on JSON records processed per document
    pub max_records: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            input_name: "<stdin>".to_string(),
            function_name: None,
            base_depth: None,
            log_category: "LOG_KBIBTEX_NETWORKING".to_string(),
            max_records: 1024,
        }
    }
}

impl GenerateOptions {
    pub fn depth(&self) -> usize {
        self.base_depth
            .unwrap_or(if self.function_name.is_some() { 0 } else { 2 })
    }

    /// `qCWarning(...) << <message>;`
    pub(crate) fn warning(&self, message: &str) -> String {
        format!("qCWarning({}) << {};", self.log_category, message)
    }
}

/// Which rule list a generated variable belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Field,
    Value,
}

/// Local variable generated for one field or value rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub key: String,
    pub name: String,
    pub kind: RuleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
}

/// Generation result
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResult {
    pub code: String,
    pub variables: Vec<Variable>,
}

/// Statements of a parsing function body and the variables they declare
#[derive(Debug, Clone)]
pub struct Body {
    pub stmts: Vec<Stmt>,
    pub variables: Vec<Variable>,
}

/// Generator trait - builds the body of a parsing function
pub trait Generator {
    fn body(&self, spec: &Specification, options: &GenerateOptions) -> Body;
}

/// Generate the complete output for a specification
pub fn generate(spec: &Specification, options: &GenerateOptions) -> GenerateResult {
    let Body { stmts: body, variables } = match spec.format {
        Format::Xml => XmlGenerator::new().body(spec, options),
        Format::Json => JsonGenerator::new().body(spec, options),
    };

    let mut output = Output::new();
    output.emit(&[
        Stmt::Comment(format!("Source code generated by {}", GENERATOR_NAME)),
        Stmt::Comment(format!("using information from configuration file '{}'", options.input_name)),
        Stmt::Blank,
    ]);

    let mut function = Vec::new();
    if let Some(introduction) = &spec.introduction {
        function.push(Stmt::code(introduction.as_str()));
        function.push(Stmt::Blank);
    }

    match &options.function_name {
        Some(name) => {
            function.insert(0, Stmt::code("QVector<QSharedPointer<Entry>> result;"));
            function.extend(body);
            function.push(Stmt::Blank);
            function.push(Stmt::code("return result;"));
            output.emit(&[Stmt::block(
                format!(
                    "QVector<QSharedPointer<Entry>> {}(const QByteArray &{}, bool *ok)",
                    name,
                    spec.format.data_parameter()
                ),
                function,
            )]);
        }
        None => {
            function.extend(body);
            output.emit(&function);
        }
    }

    tracing::debug!(lines = output.line_count(), format = %spec.format, "generated parser");

    GenerateResult {
        code: output.finish(options.depth()),
        variables,
    }
}
