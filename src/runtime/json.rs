use super::{Flattened, PathValueStore};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};

lazy_static! {
    static ref ENDS_WITH_NUMBER: Regex = Regex::new(r"/(0|[1-9][0-9]*)$").unwrap();
}

/// Render a number the way `QString::number(double)` does (`%g`, six significant digits)
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let scientific = format!("{:.5e}", value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if !(-4..6).contains(&exponent) {
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            if exponent < 0 { '-' } else { '+' },
            exponent.abs()
        )
    } else {
        let decimals = (5 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// Every leaf of the document under its slash-joined path, breadth first
fn global_flatten(root: &Value) -> BTreeMap<String, Vec<String>> {
    let mut global: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut queue: VecDeque<(&Value, Vec<String>)> = VecDeque::new();
    queue.push_back((root, Vec::new()));

    while let Some((current, path)) = queue.pop_front() {
        let text = match current {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    let mut child = path.clone();
                    child.push(i.to_string());
                    queue.push_back((item, child));
                }
                continue;
            }
            Value::Object(members) => {
                for (key, item) in members {
                    let mut child = path.clone();
                    child.push(key.clone());
                    queue.push_back((item, child));
                }
                continue;
            }
            Value::String(s) => s.clone(),
            Value::Number(n) => format_number(n.as_f64().unwrap_or_default()),
            Value::Bool(b) => b.to_string(),
            Value::Null => continue,
        };
        global.entry(path.join("/")).or_default().push(text);
    }

    global
}

/// Value at a slash path; numeric segments index into arrays
fn lookup<'v>(root: &'v Value, path: &[String]) -> Option<&'v Value> {
    path.iter().try_fold(root, |current, segment| match current {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        Value::Object(members) => members.get(segment),
        _ => None,
    })
}

/// Flatten a JSON document into one store per element of the array at `entries_path`
pub fn flatten(document: &str, entries_path: &[String], max_records: usize) -> Flattened {
    let mut out = Flattened::new();

    let root: Value = match serde_json::from_str(document) {
        Ok(root) => root,
        Err(err) => {
            out.fail(format!("Problem with JSON data: {}", err));
            return out;
        }
    };
    if !root.is_object() {
        out.fail("JSON document is not an object".to_string());
        return out;
    }

    let global = global_flatten(&root);
    let entries_count = lookup(&root, entries_path)
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let entries = entries_path.join("/");

    for n in 0..entries_count.min(max_records) {
        let prefix = format!("{}/{}/", entries, n);
        let mut store = PathValueStore::new();
        for (key, values) in &global {
            if let Some(rest) = key.strip_prefix(&prefix) {
                let key = ENDS_WITH_NUMBER.replace(rest, "").into_owned();
                for value in values {
                    store.append(key.clone(), value.clone());
                }
            }
        }
        if store.is_empty() {
            break;
        }
        out.records.push(store);
    }

    tracing::debug!(entries = entries_count, records = out.records.len(), "flattened JSON document");
    out
}
