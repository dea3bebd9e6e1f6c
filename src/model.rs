use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Document format served by a search service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Xml,
    Json,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Xml => "xml",
            Format::Json => "json",
        }
    }

    /// Name of the raw document parameter in the emitted function
    pub fn data_parameter(&self) -> &'static str {
        match self {
            Format::Xml => "xmlData",
            Format::Json => "jsonData",
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xml" => Ok(Format::Xml),
            "json" => Ok(Format::Json),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of a field or value rule.
///
/// `field[Entry::ftTitle]` names a symbol known to the generated code,
/// `field["eprint"]` names a free-form field by its literal text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum FieldKey {
    Symbol(String),
    Literal(String),
}

impl FieldKey {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.len() > 2 && raw.starts_with('"') && raw.ends_with('"') {
            FieldKey::Literal(raw[1..raw.len() - 1].to_string())
        } else {
            FieldKey::Symbol(raw.to_string())
        }
    }

    /// Key text exactly as written in the specification (quotes included)
    pub fn as_written(&self) -> String {
        match self {
            FieldKey::Symbol(name) => name.clone(),
            FieldKey::Literal(text) => format!("\"{}\"", text),
        }
    }

    /// Expression naming this key in emitted code
    pub fn to_cpp(&self) -> String {
        match self {
            FieldKey::Symbol(name) => name.clone(),
            FieldKey::Literal(text) => format!("QStringLiteral(\"{}\")", text),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_written())
    }
}

/// Runtime value class a field's text is wrapped in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ValueType {
    PlainText,
    VerbatimText,
    MacroKey,
    Other(String),
}

impl ValueType {
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "PlainText" => ValueType::PlainText,
            "VerbatimText" => ValueType::VerbatimText,
            "MacroKey" => ValueType::MacroKey,
            other => ValueType::Other(other.to_string()),
        }
    }

    /// Educated guess for fields without an explicit override
    pub fn guess(key: &FieldKey) -> Self {
        match key {
            FieldKey::Symbol(name) if name == "Entry::ftDOI" || name == "Entry::ftUrl" => {
                ValueType::VerbatimText
            }
            FieldKey::Symbol(name) if name == "Entry::ftMonth" => ValueType::MacroKey,
            _ => ValueType::PlainText,
        }
    }

    pub fn class_name(&self) -> &str {
        match self {
            ValueType::PlainText => "PlainText",
            ValueType::VerbatimText => "VerbatimText",
            ValueType::MacroKey => "MacroKey",
            ValueType::Other(name) => name,
        }
    }
}

/// A field or value rule: key plus raw template text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub key: FieldKey,
    pub template: String,
}

/// Parsed, immutable form of one search service's configuration file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Specification {
    pub format: Format,
    /// Structural path to the repeating record element, never empty
    pub entries_path: Vec<String>,
    pub introduction: Option<String>,
    pub field_rules: Vec<Rule>,
    pub value_rules: Vec<Rule>,
    pub type_overrides: Vec<(FieldKey, ValueType)>,
    pub entry_id: String,
    pub entry_type: String,
    pub entry_validation: Option<String>,
    pub post_mapping: Option<String>,
    pub post_fields: Option<String>,
}

impl Specification {
    /// Slash-joined entries path as written in the specification
    pub fn entries(&self) -> String {
        self.entries_path.join("/")
    }

    pub fn value_type_for(&self, key: &FieldKey) -> ValueType {
        self.type_overrides
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, ty)| ty.clone())
            .unwrap_or_else(|| ValueType::guess(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_key_quoting() {
        assert_eq!(FieldKey::parse("Entry::ftTitle"), FieldKey::Symbol("Entry::ftTitle".into()));
        assert_eq!(FieldKey::parse("\"eprint\""), FieldKey::Literal("eprint".into()));
        // Two quote characters alone are not a literal
        assert_eq!(FieldKey::parse("\"\""), FieldKey::Symbol("\"\"".into()));
        assert_eq!(FieldKey::parse("\"eprint\"").to_cpp(), "QStringLiteral(\"eprint\")");
        assert_eq!(FieldKey::parse("\"eprint\"").as_written(), "\"eprint\"");
    }

    #[test]
    fn test_value_type_guess() {
        assert_eq!(ValueType::guess(&FieldKey::parse("Entry::ftDOI")), ValueType::VerbatimText);
        assert_eq!(ValueType::guess(&FieldKey::parse("Entry::ftUrl")), ValueType::VerbatimText);
        assert_eq!(ValueType::guess(&FieldKey::parse("Entry::ftMonth")), ValueType::MacroKey);
        assert_eq!(ValueType::guess(&FieldKey::parse("Entry::ftTitle")), ValueType::PlainText);
        assert_eq!(ValueType::guess(&FieldKey::parse("\"Entry::ftDOI\"")), ValueType::PlainText);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("xml".parse::<Format>(), Ok(Format::Xml));
        assert_eq!("json".parse::<Format>(), Ok(Format::Json));
        assert!("XML".parse::<Format>().is_err());
        assert!("yaml".parse::<Format>().is_err());
    }
}
