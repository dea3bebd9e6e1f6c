use super::ir::{Stmt, lower};

/// Re-indents brace-language code without parsing it.
///
/// - one unit deeper after a line ending in `{`
/// - one unit shallower for a line starting with `}`
/// - one extra unit for the single statement after an unbraced
///   `if`/`while`/`for`/`else`/`else if` guard; comment lines in between keep it
#[derive(Debug, Clone, Copy)]
pub struct Indenter {
    pub unit: usize,
}

impl Default for Indenter {
    fn default() -> Self {
        Self { unit: 4 }
    }
}

impl Indenter {
    pub fn indent<S: AsRef<str>>(&self, lines: &[S], base_depth: usize) -> String {
        let mut result = String::new();
        let mut depth = base_depth;
        // Extra units owed to unbraced guards, given back after their statement
        let mut pending = 0;
        let mut previous_opens_block = false;

        for line in lines {
            let line = line.as_ref().trim();

            if previous_opens_block {
                depth += 1;
            }
            if line.starts_with('}') {
                depth = depth.saturating_sub(1);
            }

            if !line.is_empty() {
                result.push_str(&" ".repeat(depth * self.unit));
                result.push_str(line);
            }
            result.push('\n');

            if is_unbraced_guard(line) {
                pending += 1;
                depth += 1;
            } else if pending > 0 && !line.is_empty() && !is_comment(line) {
                depth = depth.saturating_sub(pending);
                pending = 0;
            }

            previous_opens_block = line.ends_with('{');
        }

        result
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with("//")
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn starts_with_keyword(line: &str, keyword: &str) -> bool {
    line.strip_prefix(keyword)
        .is_some_and(|rest| !rest.starts_with(is_identifier_char))
}

fn ends_with_keyword(line: &str, keyword: &str) -> bool {
    line.strip_suffix(keyword)
        .is_some_and(|rest| !rest.ends_with(is_identifier_char))
}

/// Guard line whose consequent is the next statement rather than a braced block
fn is_unbraced_guard(line: &str) -> bool {
    if line.is_empty() || is_comment(line) || line.ends_with('{') || line.ends_with(';') {
        return false;
    }
    starts_with_keyword(line, "if")
        || starts_with_keyword(line, "while")
        || starts_with_keyword(line, "for")
        || line.contains("else if")
        || ends_with_keyword(line, "else")
}

/// Output buffer that accumulates lowered statements
pub struct Output {
    lines: Vec<String>,
}

impl Output {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add statements
    pub fn emit(&mut self, stmts: &[Stmt]) {
        self.lines.extend(lower(stmts));
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Indent and return the generated code
    pub fn finish(self, base_depth: usize) -> String {
        Indenter::default().indent(&self.lines, base_depth)
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
