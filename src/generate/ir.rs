/// Statement of emitted C++ code, before indentation
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Code as written, possibly spanning several lines
    Code(String),
    /// `head {` ... `}`
    Block { head: String, body: Vec<Stmt> },
    /// `if (c) {` ... `} else if (c) {` ... `} else {` ... `}`
    If {
        arms: Vec<(String, Vec<Stmt>)>,
        otherwise: Option<Vec<Stmt>>,
    },
    /// Unbraced guard controlling a single statement
    Guarded { guard: String, stmt: String },
    Comment(String),
    Blank,
}

impl Stmt {
    pub fn code(text: impl Into<String>) -> Self {
        Stmt::Code(text.into())
    }

    pub fn block(head: impl Into<String>, body: Vec<Stmt>) -> Self {
        Stmt::Block {
            head: head.into(),
            body,
        }
    }

    pub fn if_then(condition: impl Into<String>, then: Vec<Stmt>) -> Self {
        Stmt::If {
            arms: vec![(condition.into(), then)],
            otherwise: None,
        }
    }

    pub fn if_else(condition: impl Into<String>, then: Vec<Stmt>, otherwise: Vec<Stmt>) -> Self {
        Stmt::If {
            arms: vec![(condition.into(), then)],
            otherwise: Some(otherwise),
        }
    }

    /// `if (condition)` followed by one unbraced statement
    pub fn guarded(condition: impl AsRef<str>, stmt: impl Into<String>) -> Self {
        Stmt::Guarded {
            guard: format!("if ({})", condition.as_ref()),
            stmt: stmt.into(),
        }
    }
}

/// Lower statements into unindented lines
pub fn lower(stmts: &[Stmt]) -> Vec<String> {
    let mut lines = Vec::new();
    lower_into(stmts, &mut lines);
    lines
}

fn lower_into(stmts: &[Stmt], lines: &mut Vec<String>) {
    for stmt in stmts {
        match stmt {
            Stmt::Code(text) => push_code(text, lines),
            Stmt::Block { head, body } => {
                lines.push(format!("{} {{", head));
                lower_into(body, lines);
                lines.push("}".to_string());
            }
            Stmt::If { arms, otherwise } => {
                for (i, (condition, body)) in arms.iter().enumerate() {
                    if i == 0 {
                        lines.push(format!("if ({}) {{", condition));
                    } else {
                        lines.push(format!("}} else if ({}) {{", condition));
                    }
                    lower_into(body, lines);
                }
                if let Some(body) = otherwise {
                    lines.push("} else {".to_string());
                    lower_into(body, lines);
                }
                lines.push("}".to_string());
            }
            Stmt::Guarded { guard, stmt } => {
                // The guard must stay one line for the indenter to see it
                lines.push(join_lines(guard));
                push_code(stmt, lines);
            }
            Stmt::Comment(text) => lines.push(format!("// {}", text)),
            Stmt::Blank => lines.push(String::new()),
        }
    }
}

fn push_code(text: &str, lines: &mut Vec<String>) {
    lines.extend(text.split('\n').map(|line| line.trim().to_string()));
}

fn join_lines(text: &str) -> String {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
