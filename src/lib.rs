//! Generates C++/Qt parsing code for bibliographic search services from a
//! small line-oriented specification format.
//!
//! A specification names the response format (`xml` or `json`), the path to
//! the repeating record element, and one template per bibliographic field:
//!
//! ```text
//! format: xml
//! entries: feed/entry
//! field[Entry::ftTitle]: {{title}}
//! field[Entry::ftDOI]: {{doi}}
//! entryid: QStringLiteral("arXiv:") + {{id}}
//! ```
//!
//! The generated body flattens each record into a path-to-values map and
//! builds one entry per record from the templates.

pub mod error;
pub mod generate;
pub mod model;
pub mod runtime;
pub mod spec;
pub mod substitute;

pub use error::{Error, ErrorKind, SpecError};
pub use generate::{GenerateOptions, GenerateResult, Generator, RuleKind, Variable};
pub use model::{FieldKey, Format, Rule, Specification, ValueType};
pub use spec::{DslLoader, Loader};

use std::fs;
use std::path::Path;

/// Specification-to-code pipeline: load, then generate
pub struct Pipeline {
    loader: Box<dyn Loader>,
}

impl Pipeline {
    pub fn new(loader: Box<dyn Loader>) -> Self {
        Self { loader }
    }

    /// Pipeline reading the standard specification format
    pub fn standard() -> Self {
        Self::new(Box::new(DslLoader::new()))
    }

    pub fn load(&self, source: &str) -> Result<Specification, Error> {
        Ok(self.loader.load(source)?)
    }

    /// Generate code for specification text. Nothing is produced on error.
    pub fn compile(&self, source: &str, options: &GenerateOptions) -> Result<GenerateResult, Error> {
        let spec = self.load(source)?;
        Ok(generate::generate(&spec, options))
    }

    /// Read and compile a specification file
    pub fn compile_file(&self, path: &Path, options: &GenerateOptions) -> Result<GenerateResult, Error> {
        let source = read_source(path)?;
        self.compile(&source, options)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

/// Read a specification or document file
pub fn read_source(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn generate(source: &str) -> Result<GenerateResult, Error> {
    generate_with(source, &GenerateOptions::default())
}

pub fn generate_with(source: &str, options: &GenerateOptions) -> Result<GenerateResult, Error> {
    Pipeline::standard().compile(source, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_generate_banner_and_depth() {
        let result = generate("format: xml\nentries: a\n").unwrap();
        let mut lines = result.code.lines();
        assert_eq!(lines.next(), Some("        // Source code generated by bibsearch-codegen"));
        assert_eq!(lines.next(), Some("        // using information from configuration file '<stdin>'"));
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), Some("        *ok = true;"));
    }

    #[test]
    fn test_introduction_precedes_body() {
        let result = generate("format: json\nentries: items\nintroduction: static const int answer = 42;\n").unwrap();
        let lines: Vec<&str> = result.code.lines().collect();
        assert_eq!(lines[3], "        static const int answer = 42;");
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "        QJsonParseError parseError;");
    }

    #[test]
    fn test_function_wrapper() {
        let options = GenerateOptions {
            function_name: Some("parseFeed".to_string()),
            input_name: "feed-parser.in.cpp".to_string(),
            ..Default::default()
        };
        let result = generate_with("format: xml\nentries: feed/entry\n", &options).unwrap();
        let lines: Vec<&str> = result.code.lines().collect();
        assert_eq!(lines[1], "// using information from configuration file 'feed-parser.in.cpp'");
        assert_eq!(lines[3], "QVector<QSharedPointer<Entry>> parseFeed(const QByteArray &xmlData, bool *ok) {");
        assert_eq!(lines[4], "    QVector<QSharedPointer<Entry>> result;");
        assert_eq!(lines[5], "    *ok = true;");
        assert_eq!(lines[lines.len() - 2], "    return result;");
        assert_eq!(lines[lines.len() - 1], "}");
    }

    #[test]
    fn test_unsupported_format_produces_nothing() {
        let err = generate("format: yaml\nentries: a\n").unwrap_err();
        match err {
            Error::MalformedSpecification(err) => assert_eq!(err.kind, ErrorKind::UnsupportedFormat),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_compile_file_reports_path() {
        let err = Pipeline::standard()
            .compile_file(Path::new("/nonexistent/x-parser.in.cpp"), &GenerateOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/x-parser.in.cpp"));
    }
}
