//! Rust rendition of what the generated parsing code does at run time.
//!
//! Used to preview a specification against a sample response and to test
//! generated behavior without a C++ toolchain.

mod store;
pub mod xml;
pub mod json;
pub mod preview;

pub use store::PathValueStore;
pub use preview::{RecordPreview, preview};

use crate::model::{Format, Specification};
use serde::Serialize;

/// Outcome of flattening one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flattened {
    /// Success flag as the generated code would leave it
    pub ok: bool,
    pub records: Vec<PathValueStore>,
    pub diagnostics: Vec<String>,
}

impl Flattened {
    pub fn new() -> Self {
        Self {
            ok: true,
            records: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Record a diagnostic that does not affect the success flag
    pub(crate) fn warn(&mut self, message: String) {
        tracing::debug!(%message, "document diagnostic");
        self.diagnostics.push(message);
    }

    /// Record a diagnostic and mark the document as failed
    pub(crate) fn fail(&mut self, message: String) {
        self.warn(message);
        self.ok = false;
    }
}

impl Default for Flattened {
    fn default() -> Self {
        Self::new()
    }
}

/// Cleanup applied to every XML value before it is stored.
///
/// Emitted code also passes the trimmed text through the host application's
/// `OnlineSearchAbstract::deHTMLify`, which is not reproduced here: text
/// arrives already unescaped, so `&lt;` in a title stays a literal `<`.
pub fn clean_text(text: &str) -> String {
    text.trim().to_string()
}

/// Flatten a document with the backend matching the specification's format
pub fn flatten_document(spec: &Specification, document: &str, max_records: usize) -> Flattened {
    match spec.format {
        Format::Xml => xml::flatten(document, &spec.entries_path),
        Format::Json => json::flatten(document, &spec.entries_path, max_records),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::load;

    #[test]
    fn test_clean_text_only_trims() {
        assert_eq!(clean_text("  Quantum dots \n"), "Quantum dots");
        assert_eq!(clean_text("if x < y and y > z"), "if x < y and y > z");
        assert_eq!(clean_text(" \t "), "");
    }

    #[test]
    fn test_flatten_document_dispatches_on_format() {
        let xml = load("format: xml\nentries: a\n").unwrap();
        let flattened = flatten_document(&xml, "<a><b>X</b></a>", 1024);
        assert!(flattened.ok);
        assert_eq!(flattened.records[0].get("b"), ["X"]);

        let json = load("format: json\nentries: items\n").unwrap();
        let flattened = flatten_document(&json, r#"{"items":[{"name":"X"}]}"#, 1024);
        assert!(flattened.ok);
        assert_eq!(flattened.records[0].get("name"), ["X"]);
    }
}
