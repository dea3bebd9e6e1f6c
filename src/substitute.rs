//! Placeholder rewriting for specification templates.
//!
//! Templates are C++ fragments with `{{...}}` placeholders:
//!
//! - `{{field[Entry::ftDOI]}}` or `{{field["doi"]}}`: text of a field already stored in the entry
//! - `{{QStringList:authors/author}}`: every value found at a path, as a list
//! - `{{article/title}}`: every value found at a path, joined with line breaks
//!
//! Rewriting is a single left-to-right pass; text produced by a replacement is
//! never scanned again.

use crate::model::FieldKey;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    // First lambda introducer with an empty parameter list, e.g. `[]()` or `[entry]()`
    static ref LAMBDA_CAPTURE: Regex = Regex::new(r"\[(?P<capture>[^\[\]\n]*)\]\(\)").unwrap();
}

/// Name of the per-record path-value store in emitted code
pub const STORE_VARIABLE: &str = "mapping";

/// A parsed `{{...}}` placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder<'a> {
    Field(FieldKey),
    List(&'a str),
    Join(&'a str),
}

impl<'a> Placeholder<'a> {
    fn parse(inner: &'a str) -> Self {
        if let Some(key) = inner.strip_prefix("field[").and_then(|rest| rest.strip_suffix(']')) {
            Placeholder::Field(FieldKey::parse(key))
        } else if let Some(path) = inner.strip_prefix("QStringList:") {
            Placeholder::List(path)
        } else {
            Placeholder::Join(inner)
        }
    }
}

/// Piece of template text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Placeholder(Placeholder<'a>),
}

/// Split template text into literal text and placeholders
pub fn scan(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open + 2..].find("}}") else {
            break;
        };
        if open > 0 {
            segments.push(Segment::Text(&rest[..open]));
        }
        let inner = &rest[open + 2..open + 2 + close];
        segments.push(Segment::Placeholder(Placeholder::parse(inner)));
        rest = &rest[open + 2 + close + 2..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    segments
}

/// Turns placeholders into replacement text
pub trait Resolver {
    /// Text of a field already assigned to the entry
    fn field(&self, key: &FieldKey) -> String;
    /// All values at `path` as a list
    fn list(&self, path: &str) -> String;
    /// All values at `path` joined with line breaks
    fn join(&self, path: &str) -> String;
}

/// Rewrite every placeholder in `text` exactly once, left to right
pub fn rewrite<R: Resolver + ?Sized>(text: &str, resolver: &R) -> String {
    let mut result = String::with_capacity(text.len());
    for segment in scan(text) {
        match segment {
            Segment::Text(t) => result.push_str(t),
            Segment::Placeholder(Placeholder::Field(key)) => result.push_str(&resolver.field(&key)),
            Segment::Placeholder(Placeholder::List(path)) => result.push_str(&resolver.list(path)),
            Segment::Placeholder(Placeholder::Join(path)) => result.push_str(&resolver.join(path)),
        }
    }
    result
}

/// Resolves placeholders into C++ expressions over the per-record store
pub struct CodeResolver;

impl Resolver for CodeResolver {
    fn field(&self, key: &FieldKey) -> String {
        format!("PlainTextValue::text(entry->value({}))", key.to_cpp())
    }

    fn list(&self, path: &str) -> String {
        format!(
            "const_cast<const QStringList &>({}[QStringLiteral(\"{}\")])",
            STORE_VARIABLE,
            escape_cpp(path)
        )
    }

    fn join(&self, path: &str) -> String {
        format!(
            "{}[QStringLiteral(\"{}\")].join(QStringLiteral(\"\\n\"))",
            STORE_VARIABLE,
            escape_cpp(path)
        )
    }
}

/// Give the first lambda in `text` access to the per-record store.
///
/// Existing captures are kept after the injected one.
pub fn inject_capture(text: &str) -> String {
    LAMBDA_CAPTURE
        .replace(text, |caps: &Captures| {
            let existing = &caps["capture"];
            if existing.is_empty() {
                format!("[&{}]()", STORE_VARIABLE)
            } else {
                format!("[&{},{}]()", STORE_VARIABLE, existing)
            }
        })
        .into_owned()
}

/// Rewrite a template into C++ code reading from the per-record store
pub fn substitute(text: &str) -> String {
    inject_capture(&rewrite(text, &CodeResolver))
}

/// Escape text for a C++ string literal
pub fn escape_cpp(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}
