use super::PathValueStore;
use crate::generate::variable_name;
use crate::model::{FieldKey, Specification};
use crate::substitute::{Resolver, rewrite};
use serde::Serialize;

/// Resolves placeholders against a flattened record instead of emitting code
pub struct PreviewResolver<'a> {
    store: &'a PathValueStore,
    /// Fields and values rendered so far, in the order they reach the entry
    assigned: &'a [PreviewField],
}

impl<'a> PreviewResolver<'a> {
    pub fn new(store: &'a PathValueStore, assigned: &'a [PreviewField]) -> Self {
        Self { store, assigned }
    }
}

impl Resolver for PreviewResolver<'_> {
    fn field(&self, key: &FieldKey) -> String {
        // Later inserts under the same key replace earlier ones
        self.assigned
            .iter()
            .rev()
            .find(|field| field.stored && &field.key == key)
            .map(|field| field.text.clone())
            .unwrap_or_default()
    }

    fn list(&self, path: &str) -> String {
        serde_json::to_string(self.store.get(path)).unwrap_or_default()
    }

    fn join(&self, path: &str) -> String {
        self.store.join(path)
    }
}

/// Rendered template of one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewField {
    pub key: FieldKey,
    pub variable: String,
    pub text: String,
    /// Whether the generated code would insert the value into the entry
    pub stored: bool,
}

/// Field assignment of one record, with templates rendered as text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordPreview {
    pub fields: Vec<PreviewField>,
    pub values: Vec<PreviewField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<String>,
}

impl RecordPreview {
    /// Text of a stored field or value
    pub fn get(&self, key: &FieldKey) -> Option<&str> {
        self.fields
            .iter()
            .chain(&self.values)
            .find(|field| field.stored && &field.key == key)
            .map(|field| field.text.as_str())
    }
}

fn render_rule(key: &FieldKey, template: &str, store: &PathValueStore, assigned: &[PreviewField]) -> PreviewField {
    let text = rewrite(template.trim(), &PreviewResolver::new(store, assigned));
    PreviewField {
        key: key.clone(),
        variable: variable_name(key),
        stored: !text.is_empty(),
        text,
    }
}

/// Run field assignment for one record.
///
/// Templates are rendered, not evaluated: embedded C++ stays as written with
/// placeholders replaced by record data. `{{field[X]}}` sees every field and
/// value rule before it, and id and type see all of them.
pub fn preview(spec: &Specification, store: &PathValueStore) -> RecordPreview {
    let mut assigned: Vec<PreviewField> = Vec::new();
    for rule in &spec.field_rules {
        let field = render_rule(&rule.key, &rule.template, store, &assigned);
        assigned.push(field);
    }
    for rule in &spec.value_rules {
        let value = render_rule(&rule.key, &rule.template, store, &assigned);
        assigned.push(value);
    }

    let resolver = PreviewResolver::new(store, &assigned);
    let render = |template: &str| {
        let template = template.trim();
        (!template.is_empty()).then(|| rewrite(template, &resolver))
    };
    let id = render(&spec.entry_id);
    let entry_type = render(&spec.entry_type);

    let values = assigned.split_off(spec.field_rules.len());
    let fields = assigned;
    RecordPreview {
        fields,
        values,
        id,
        entry_type,
    }
}
