use super::ir::Stmt;
use super::naming::variable_name;
use super::{RuleKind, Variable};
use crate::model::Specification;
use crate::substitute::substitute;

/// Render a template, falling back to `empty` for templates without content
fn render(template: &str, empty: &str) -> String {
    let rendered = substitute(template.trim());
    if rendered.is_empty() {
        empty.to_string()
    } else {
        rendered
    }
}

fn is_brace_initializer(expr: &str) -> bool {
    expr.len() >= 2 && expr.starts_with('{') && expr.ends_with('}')
}

/// Statements turning one record's `mapping` into an entry appended to `result`,
/// plus the variables declared along the way
pub fn assemble_entry(spec: &Specification) -> (Vec<Stmt>, Vec<Variable>) {
    let mut stmts = Vec::new();
    let mut variables = Vec::new();

    if let Some(hook) = &spec.post_mapping {
        stmts.push(Stmt::code(substitute(hook.trim())));
        stmts.push(Stmt::Blank);
    }

    stmts.push(Stmt::code(
        "QSharedPointer<Entry> entry = QSharedPointer<Entry>(new Entry(QStringLiteral(\"placeholderType\"), QStringLiteral(\"placeholderId\")));",
    ));

    for rule in &spec.field_rules {
        let name = variable_name(&rule.key);
        let value_type = spec.value_type_for(&rule.key);
        let class = value_type.class_name();
        let expr = render(&rule.template, "QString()");

        if is_brace_initializer(&expr) {
            stmts.push(Stmt::code(format!("const QString {} {};", name, expr)));
        } else {
            stmts.push(Stmt::code(format!("const QString {} = {};", name, expr)));
        }
        stmts.push(Stmt::guarded(
            format!("!{}.isEmpty()", name),
            format!(
                "entry->insert({}, Value() << QSharedPointer<{}>(new {}({})));",
                rule.key.to_cpp(),
                class,
                class,
                name
            ),
        ));

        variables.push(Variable {
            key: rule.key.as_written(),
            name,
            kind: RuleKind::Field,
            value_type: Some(class.to_string()),
        });
    }

    for rule in &spec.value_rules {
        let name = variable_name(&rule.key);
        let expr = render(&rule.template, "Value()");

        stmts.push(Stmt::code(format!("const Value {} = {};", name, expr)));
        stmts.push(Stmt::guarded(
            format!("!{}.isEmpty()", name),
            format!("entry->insert({}, {});", rule.key.to_cpp(), name),
        ));

        variables.push(Variable {
            key: rule.key.as_written(),
            name,
            kind: RuleKind::Value,
            value_type: None,
        });
    }

    if let Some(hook) = &spec.post_fields {
        stmts.push(Stmt::Blank);
        stmts.push(Stmt::code(substitute(hook.trim())));
    }

    if !spec.entry_id.trim().is_empty() {
        stmts.push(Stmt::code(format!("entry->setId({});", substitute(spec.entry_id.trim()))));
    }
    if !spec.entry_type.trim().is_empty() {
        stmts.push(Stmt::code(format!("entry->setType({});", substitute(spec.entry_type.trim()))));
    }

    match &spec.entry_validation {
        Some(validation) if !validation.trim().is_empty() => {
            stmts.push(Stmt::guarded(substitute(validation.trim()), "result.append(entry);"));
        }
        _ => stmts.push(Stmt::code("result.append(entry);")),
    }

    (stmts, variables)
}
