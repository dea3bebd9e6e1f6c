use super::lines::{Position, Span, Token};
use crate::error::{ErrorKind, SpecError};
use crate::model::{FieldKey, Format, Rule, Specification, ValueType};

/// Where the value of the most recent key goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Format,
    Entries,
    Introduction,
    Field(usize),
    Value(usize),
    ItemType(usize),
    EntryId,
    EntryType,
    Validation,
    PostMapping,
    PostFields,
    Ignored,
}

/// Accumulated text of one bracketed key
#[derive(Debug)]
struct Keyed {
    key: FieldKey,
    text: String,
    span: Span,
}

/// Accumulates tokens into a [`Specification`]
pub struct SpecBuilder {
    tokens: Vec<Token>,
    end: Position,
    format: String,
    format_span: Option<Span>,
    entries: String,
    entries_span: Option<Span>,
    introduction: String,
    fields: Vec<Keyed>,
    values: Vec<Keyed>,
    item_types: Vec<Keyed>,
    entry_id: String,
    entry_type: String,
    validation: String,
    post_mapping: String,
    post_fields: String,
}

impl SpecBuilder {
    /// `line_count` locates errors that only show up once the whole file is read
    pub fn new(tokens: Vec<Token>, line_count: usize) -> Self {
        Self {
            tokens,
            end: Position {
                byte: 0,
                line: line_count,
                col: 0,
            },
            format: String::new(),
            format_span: None,
            entries: String::new(),
            entries_span: None,
            introduction: String::new(),
            fields: Vec::new(),
            values: Vec::new(),
            item_types: Vec::new(),
            entry_id: String::new(),
            entry_type: String::new(),
            validation: String::new(),
            post_mapping: String::new(),
            post_fields: String::new(),
        }
    }

    pub fn build(mut self) -> Result<Specification, SpecError> {
        let tokens = std::mem::take(&mut self.tokens);
        let mut slot: Option<Slot> = None;

        for token in tokens {
            match token {
                Token::Continuation { text, span } => {
                    let Some(current) = slot else {
                        return Err(SpecError::new(
                            ErrorKind::OrphanContinuation,
                            "indented line does not continue any key",
                            span,
                        )
                        .with_help("only lines following a `key: value` line may be indented"));
                    };
                    self.append(current, &format!("\n{}", text));
                }
                Token::Entry { key, value, key_span, span } => {
                    let current = self.dispatch(&key, key_span, span)?;
                    self.append(current, &value);
                    slot = Some(current);
                }
            }
        }

        self.finish()
    }

    /// Pick the slot a key's value accumulates into
    fn dispatch(&mut self, key: &str, key_span: Span, span: Span) -> Result<Slot, SpecError> {
        let slot = match key {
            "format" => {
                self.format_span.get_or_insert(span);
                Slot::Format
            }
            "entries" => {
                self.entries_span.get_or_insert(span);
                Slot::Entries
            }
            "introduction" => Slot::Introduction,
            "entryid" => Slot::EntryId,
            "entrytype" => Slot::EntryType,
            "entryvalidation" => Slot::Validation,
            "postprocessingmapping" => Slot::PostMapping,
            "postprocessingfields" => Slot::PostFields,
            _ => {
                if let Some(inner) = bracketed(key, "field[", key_span)? {
                    Slot::Field(keyed_index(&mut self.fields, inner, span))
                } else if let Some(inner) = bracketed(key, "valueItemType[", key_span)? {
                    Slot::ItemType(keyed_index(&mut self.item_types, inner, span))
                } else if let Some(inner) = bracketed(key, "value[", key_span)? {
                    Slot::Value(keyed_index(&mut self.values, inner, span))
                } else {
                    tracing::warn!(line = span.start.line + 1, key, "ignoring unknown specification key");
                    Slot::Ignored
                }
            }
        };
        Ok(slot)
    }

    fn append(&mut self, slot: Slot, text: &str) {
        let target = match slot {
            Slot::Format => &mut self.format,
            Slot::Entries => &mut self.entries,
            Slot::Introduction => &mut self.introduction,
            Slot::Field(i) => &mut self.fields[i].text,
            Slot::Value(i) => &mut self.values[i].text,
            Slot::ItemType(i) => &mut self.item_types[i].text,
            Slot::EntryId => &mut self.entry_id,
            Slot::EntryType => &mut self.entry_type,
            Slot::Validation => &mut self.validation,
            Slot::PostMapping => &mut self.post_mapping,
            Slot::PostFields => &mut self.post_fields,
            Slot::Ignored => return,
        };
        target.push_str(text);
    }

    fn finish(self) -> Result<Specification, SpecError> {
        let eof = Span {
            start: self.end,
            end: self.end,
        };

        let format = match self.format.trim() {
            "" => {
                return Err(SpecError::new(ErrorKind::MissingFormat, "missing `format` key", eof)
                    .with_help("add `format: xml` or `format: json`"));
            }
            name => name.parse::<Format>().map_err(|name| {
                SpecError::new(
                    ErrorKind::UnsupportedFormat,
                    format!("unsupported format `{}`", name),
                    self.format_span.unwrap_or(eof),
                )
                .with_help("supported formats are `xml` and `json`")
            })?,
        };

        let entries = self.entries.trim();
        if entries.is_empty() {
            return Err(SpecError::new(ErrorKind::MissingEntries, "missing `entries` path", eof)
                .with_help("add the slash-separated path to the repeating record, e.g. `entries: feed/entry`"));
        }
        let entries_path: Vec<String> = entries.split('/').map(|s| s.trim().to_string()).collect();
        if entries_path.iter().any(|segment| segment.is_empty()) {
            return Err(SpecError::new(
                ErrorKind::EmptyPathSegment,
                format!("entries path `{}` contains an empty segment", entries),
                self.entries_span.unwrap_or(eof),
            ));
        }

        let type_overrides: Vec<(FieldKey, ValueType)> = self
            .item_types
            .iter()
            .map(|keyed| (keyed.key.clone(), ValueType::parse(&keyed.text)))
            .collect();
        for keyed in &self.item_types {
            if !self.fields.iter().any(|field| field.key == keyed.key) {
                tracing::warn!(
                    line = keyed.span.start.line + 1,
                    key = %keyed.key,
                    "valueItemType given for a key without a field rule"
                );
            }
        }

        let spec = Specification {
            format,
            entries_path,
            introduction: non_empty(self.introduction),
            field_rules: into_rules(self.fields),
            value_rules: into_rules(self.values),
            type_overrides,
            entry_id: self.entry_id,
            entry_type: self.entry_type,
            entry_validation: non_empty(self.validation),
            post_mapping: non_empty(self.post_mapping),
            post_fields: non_empty(self.post_fields),
        };

        tracing::debug!(
            format = %spec.format,
            entries = %spec.entries(),
            fields = spec.field_rules.len(),
            values = spec.value_rules.len(),
            "loaded specification"
        );

        Ok(spec)
    }
}

/// Inner text of `prefix...]`, or `None` when `key` does not start with `prefix`
fn bracketed<'a>(key: &'a str, prefix: &str, key_span: Span) -> Result<Option<&'a str>, SpecError> {
    let Some(rest) = key.strip_prefix(prefix) else {
        return Ok(None);
    };
    match rest.strip_suffix(']') {
        Some(inner) if !inner.trim().is_empty() => Ok(Some(inner)),
        _ => Err(SpecError::new(
            ErrorKind::MalformedKey,
            format!("malformed key `{}`", key),
            key_span,
        )
        .with_help(format!("expected `{}NAME]`", prefix))),
    }
}

/// Index of the entry for `raw`, appended on first use so rule order follows the file
fn keyed_index(list: &mut Vec<Keyed>, raw: &str, span: Span) -> usize {
    let key = FieldKey::parse(raw);
    if let Some(i) = list.iter().position(|keyed| keyed.key == key) {
        return i;
    }
    list.push(Keyed {
        key,
        text: String::new(),
        span,
    });
    list.len() - 1
}

fn into_rules(list: Vec<Keyed>) -> Vec<Rule> {
    list.into_iter()
        .map(|keyed| Rule {
            key: keyed.key,
            template: keyed.text,
        })
        .collect()
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() { None } else { Some(text) }
}
