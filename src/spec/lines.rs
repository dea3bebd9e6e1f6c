use crate::error::{ErrorKind, SpecError};

/// Position in the specification source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset in source
    pub byte: usize,
    /// Line number (0-indexed)
    pub line: usize,
    /// Column number (0-indexed, in characters)
    pub col: usize,
}

/// Span in source code (a range from start position to end position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    /// Span between two byte offsets of a single source line
    fn on_line(line_start: usize, line: usize, text: &str, byte_from: usize, byte_to: usize) -> Self {
        Span {
            start: Position {
                byte: line_start + byte_from,
                line,
                col: text[..byte_from].chars().count(),
            },
            end: Position {
                byte: line_start + byte_to,
                line,
                col: text[..byte_to].chars().count(),
            },
        }
    }
}

/// Tokens produced from the line-oriented specification format
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `key: value`
    Entry {
        key: String,
        value: String,
        key_span: Span,
        span: Span,
    },
    /// Indented line continuing the previous key's value
    Continuation { text: String, span: Span },
}

impl Token {
    pub fn span(&self) -> Span {
        match self {
            Token::Entry { span, .. } => *span,
            Token::Continuation { span, .. } => *span,
        }
    }
}

/// Split a specification into tokens.
///
/// Blank lines and lines starting with `#` produce nothing. Trailing whitespace
/// is ignored everywhere, so a key may also end in a bare `:` when its value
/// starts on the next line.
pub fn tokenize(source: &str) -> Result<Vec<Token>, SpecError> {
    let mut tokens = Vec::new();
    let mut line_start = 0;

    for (line_number, raw) in source.split('\n').enumerate() {
        let next_line_start = line_start + raw.len() + 1;
        let line = raw.trim_end();

        if line.is_empty() || line.starts_with('#') {
            line_start = next_line_start;
            continue;
        }

        let span = Span::on_line(line_start, line_number, line, 0, line.len());

        if line.starts_with(char::is_whitespace) {
            tokens.push(Token::Continuation {
                text: line.trim().to_string(),
                span,
            });
        } else if let Some(colon) = line.find(": ").filter(|&pos| pos > 0) {
            tokens.push(Token::Entry {
                key: line[..colon].trim().to_string(),
                value: line[colon + 2..].trim().to_string(),
                key_span: Span::on_line(line_start, line_number, line, 0, colon),
                span,
            });
        } else if let Some(key) = line.strip_suffix(':').filter(|key| !key.is_empty()) {
            tokens.push(Token::Entry {
                key: key.trim().to_string(),
                value: String::new(),
                key_span: Span::on_line(line_start, line_number, line, 0, key.len()),
                span,
            });
        } else {
            return Err(SpecError::new(
                ErrorKind::MissingSeparator,
                format!("expected `key: value`, found `{}`", line),
                span,
            )
            .with_help("separate the key from its value with a colon followed by a space"));
        }

        line_start = next_line_start;
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_blank_and_comment_lines() {
        let tokens = tokenize("# comment\n\n   \nformat: xml\n").unwrap();
        assert_eq!(tokens.len(), 1);
        match &tokens[0] {
            Token::Entry { key, value, span, .. } => {
                assert_eq!(key, "format");
                assert_eq!(value, "xml");
                assert_eq!(span.start.line, 3);
                assert_eq!(span.start.byte, 15);
            }
            other => panic!("unexpected token {:?}", other),
        }
    }

    #[test]
    fn test_splits_on_first_separator() {
        let tokens = tokenize("field[Entry::ftTitle]: a: b\n").unwrap();
        match &tokens[0] {
            Token::Entry { key, value, key_span, .. } => {
                assert_eq!(key, "field[Entry::ftTitle]");
                assert_eq!(value, "a: b");
                assert_eq!(key_span.end.col, 21);
            }
            other => panic!("unexpected token {:?}", other),
        }
    }

    #[test]
    fn test_continuation_lines_are_trimmed() {
        let tokens = tokenize("entryid: []() {\n     return x;\n\t}()\n").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(
            tokens[1],
            Token::Continuation {
                text: "return x;".to_string(),
                span: tokens[1].span(),
            }
        );
        assert!(matches!(&tokens[2], Token::Continuation { text, .. } if text == "}()"));
    }

    #[test]
    fn test_bare_colon_key() {
        let tokens = tokenize("postprocessingfields:\n    foo();\n").unwrap();
        assert!(matches!(&tokens[0], Token::Entry { key, value, .. } if key == "postprocessingfields" && value.is_empty()));
    }

    #[test]
    fn test_missing_separator() {
        let err = tokenize("format: xml\nentries records\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingSeparator);
        assert_eq!(err.span.start.line, 1);
        assert_eq!(err.span.end.col, 15);
    }

    #[test]
    fn test_separator_at_line_start() {
        let err = tokenize(": value\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingSeparator);
    }
}
