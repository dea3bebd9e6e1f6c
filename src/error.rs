use crate::spec::Span;
use std::fmt;
use std::path::PathBuf;

/// Kind of specification error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingSeparator,
    OrphanContinuation,
    MalformedKey,
    MissingFormat,
    UnsupportedFormat,
    MissingEntries,
    EmptyPathSegment,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingSeparator => "Missing separator",
            ErrorKind::OrphanContinuation => "Orphan continuation line",
            ErrorKind::MalformedKey => "Malformed key",
            ErrorKind::MissingFormat => "Missing format",
            ErrorKind::UnsupportedFormat => "Unsupported format",
            ErrorKind::MissingEntries => "Missing entries path",
            ErrorKind::EmptyPathSegment => "Empty path segment",
        }
    }
}

/// Malformed specification, located in the source text
#[derive(Debug, Clone)]
pub struct SpecError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
    pub help: Option<String>,
}

impl SpecError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            help: None,
        }
    }

    /// Add help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render the error with source context
    pub fn render(&self, source: &str, filename: &str) -> String {
        self.render_inner(source, filename, false)
    }

    /// Render the error with ANSI color codes
    pub fn render_color(&self, source: &str, filename: &str) -> String {
        self.render_inner(source, filename, true)
    }

    fn render_inner(&self, source: &str, filename: &str, color: bool) -> String {
        let red = if color { "\x1b[1;31m" } else { "" };
        let dim = if color { "\x1b[2m" } else { "" };
        let cyan = if color { "\x1b[1;38;5;73m" } else { "" };
        let reset = if color { "\x1b[0m" } else { "" };

        let mut output = String::new();
        output.push('\n');

        let line = self.span.start.line + 1;
        let col = self.span.start.col + 1;
        output.push_str(&format!(" {}file:{} {}:{}:{}\n", dim, reset, filename, line, col));
        output.push_str(&format!("{}error:{} {}\n", red, reset, self.message));

        // Errors found after the whole file was read point past the last line
        if let Some(source_line) = source.lines().nth(self.span.start.line) {
            let width = format!("{}", line).len().max(2);
            output.push_str(&format!("{}{:>width$} |{}\n", dim, "", reset, width = width));
            output.push_str(&format!(
                "{}{:>width$} |{} {}\n",
                dim, line, reset, source_line,
                width = width
            ));

            let underline_start = self.span.start.col;
            let underline_len = if self.span.end.line == self.span.start.line {
                self.span.end.col.saturating_sub(self.span.start.col).max(1)
            } else {
                source_line.chars().count().saturating_sub(underline_start).max(1)
            };
            output.push_str(&format!(
                "{}{:>width$} |{} {}{}{}{}\n",
                dim, "", reset,
                " ".repeat(underline_start), red, "^".repeat(underline_len), reset,
                width = width
            ));
        }

        if let Some(ref help) = self.help {
            output.push('\n');
            for (i, help_line) in help.lines().enumerate() {
                if i == 0 {
                    output.push_str(&format!(" {}help:{} {}\n", cyan, reset, help_line));
                } else {
                    output.push_str(&format!("       {}\n", help_line));
                }
            }
        }

        output.push('\n');
        output
    }
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for SpecError {}

/// Fatal generation-time error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed specification: {0}")]
    MalformedSpecification(#[from] SpecError),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Render with source context where the error points into the specification
    pub fn render(&self, source: &str, filename: &str, color: bool) -> String {
        match self {
            Error::MalformedSpecification(err) if color => err.render_color(source, filename),
            Error::MalformedSpecification(err) => err.render(source, filename),
            Error::Io { .. } => format!("error: {}\n", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Position;

    fn span(line: usize, col: usize, len: usize) -> Span {
        Span {
            start: Position { byte: 0, line, col },
            end: Position { byte: len, line, col: col + len },
        }
    }

    #[test]
    fn test_render_points_at_line() {
        let source = "format: xml\nentries a/b\n";
        let err = SpecError::new(ErrorKind::MissingSeparator, "expected `key: value`", span(1, 0, 11))
            .with_help("separate key and value with a colon and a space");
        let rendered = err.render(source, "arxiv-parser.in.cpp");

        assert!(rendered.contains(" file: arxiv-parser.in.cpp:2:1"));
        assert!(rendered.contains("error: expected `key: value`"));
        assert!(rendered.contains(" 2 | entries a/b"));
        assert!(rendered.contains("^^^^^^^^^^^"));
        assert!(rendered.contains(" help: separate key and value"));
        assert!(!rendered.contains('\x1b'));
    }

    #[test]
    fn test_render_past_end_of_file() {
        let err = SpecError::new(ErrorKind::MissingFormat, "no `format` key", span(5, 0, 1));
        let rendered = err.render("entries: a\n", "x.in.cpp");
        assert!(rendered.contains("x.in.cpp:6:1"));
        assert!(!rendered.contains(" | "));
    }

    #[test]
    fn test_error_display() {
        let err: Error = SpecError::new(ErrorKind::UnsupportedFormat, "format `yaml` is not supported", span(0, 8, 4)).into();
        assert_eq!(
            err.to_string(),
            "malformed specification: Unsupported format: format `yaml` is not supported"
        );
    }
}
