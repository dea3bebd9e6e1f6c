use super::{Flattened, PathValueStore, clean_text};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Start {
        name: String,
        attributes: Vec<(String, String)>,
    },
    End(String),
    Text(String),
}

/// Pre-read token stream with a cursor, read the way `QXmlStreamReader::readNext` is
struct TokenStream<'a> {
    document: &'a str,
    tokens: Vec<(Node, usize)>,
    next: usize,
    /// Byte offset and message of the error that ended tokenizing
    error: Option<(usize, String)>,
}

fn start_node(e: &BytesStart<'_>) -> Result<Node, String> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|err| err.to_string())?.into_owned();
        attributes.push((key, value));
    }
    Ok(Node::Start { name, attributes })
}

impl<'a> TokenStream<'a> {
    fn read(document: &'a str) -> Self {
        let mut reader = Reader::from_str(document);
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        let mut error = None;

        loop {
            let event = reader.read_event();
            let offset = reader.buffer_position() as usize;
            let node = match event {
                Ok(Event::Start(e)) => {
                    depth += 1;
                    start_node(&e)
                }
                Ok(Event::Empty(e)) => match start_node(&e) {
                    Ok(node) => {
                        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        tokens.push((node, offset));
                        Ok(Node::End(name))
                    }
                    Err(err) => Err(err),
                },
                Ok(Event::End(e)) => {
                    depth = depth.saturating_sub(1);
                    Ok(Node::End(String::from_utf8_lossy(e.name().as_ref()).into_owned()))
                }
                Ok(Event::Text(e)) => e
                    .unescape()
                    .map(|text| Node::Text(text.into_owned()))
                    .map_err(|err| err.to_string()),
                Ok(Event::CData(e)) => Ok(Node::Text(String::from_utf8_lossy(&e).into_owned())),
                Ok(Event::Eof) => {
                    if depth > 0 {
                        error = Some((offset, "premature end of document".to_string()));
                    }
                    break;
                }
                Ok(_) => continue,
                Err(err) => Err(err.to_string()),
            };
            match node {
                Ok(node) => tokens.push((node, offset)),
                Err(message) => {
                    error = Some((offset, message));
                    break;
                }
            }
        }

        Self {
            document,
            tokens,
            next: 0,
            error,
        }
    }

    fn next(&mut self) -> Option<Node> {
        let (node, _) = self.tokens.get(self.next)?;
        self.next += 1;
        Some(node.clone())
    }

    /// Name of the first start element, or `None` if an end element or the end comes first
    fn next_start_element(&mut self) -> Option<String> {
        while let Some(node) = self.next() {
            match node {
                Node::Start { name, .. } => return Some(name),
                Node::End(_) => return None,
                Node::Text(_) => {}
            }
        }
        None
    }

    fn exhausted(&self) -> bool {
        self.next >= self.tokens.len()
    }

    fn offset(&self) -> usize {
        match (&self.error, self.exhausted()) {
            (Some((offset, _)), true) => *offset,
            _ => self.next.checked_sub(1).map_or(0, |i| self.tokens[i].1),
        }
    }

    /// One-based line of the current read position
    fn line(&self) -> usize {
        let end = self.offset().min(self.document.len());
        self.document.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
    }

    fn error_message(&self) -> &str {
        self.error.as_ref().map_or("no root element", |(_, message)| message.as_str())
    }

    /// Report the tokenizer error once reading has run into it
    fn check_invalid(&self, out: &mut Flattened) {
        if let (Some((offset, message)), true) = (&self.error, self.exhausted()) {
            out.warn(format!("Invalid XML while parsing data at offset {}: {}", offset, message));
        }
    }
}

/// Flatten an XML document into one store per record found at `entries_path`
pub fn flatten(document: &str, entries_path: &[String]) -> Flattened {
    let mut out = Flattened::new();
    let Some((root, rest)) = entries_path.split_first() else {
        return out;
    };
    let mut stream = TokenStream::read(document);

    match stream.next_start_element() {
        Some(name) if &name == root => scan(&mut stream, root, rest, &mut out),
        Some(name) => {
            let message = format!("Expected '{}', got \"{}\" at XML line {}", root, name, stream.line());
            out.fail(message);
        }
        None => {
            let message = format!(
                "Could not read start element at XML line {}: {}",
                stream.line(),
                stream.error_message()
            );
            out.fail(message);
        }
    }

    tracing::debug!(records = out.records.len(), ok = out.ok, "flattened XML document");
    out
}

fn scan(stream: &mut TokenStream<'_>, parent: &str, remaining: &[String], out: &mut Flattened) {
    let Some((segment, rest)) = remaining.split_first() else {
        let store = record(stream, parent, out);
        out.records.push(store);
        return;
    };

    let mut found = false;
    while let Some(node) = stream.next() {
        if matches!(&node, Node::Start { name, .. } if name == segment) {
            found = true;
            scan(stream, segment, rest, out);
        }
    }
    stream.check_invalid(out);

    // Only the final segment may be absent
    if !rest.is_empty() && !found {
        let message = format!("Expected '{}' inside '{}' at XML line {}", segment, parent, stream.line());
        out.fail(message);
    }
}

/// Flatten the content of the record element the stream is positioned in
fn record(stream: &mut TokenStream<'_>, record: &str, out: &mut Flattened) -> PathValueStore {
    let mut store = PathValueStore::new();
    let mut stack: Vec<String> = Vec::new();
    let mut type_attribute: Option<(String, String)> = None;

    while let Some(node) = stream.next() {
        match node {
            Node::End(name) if stack.is_empty() && name == record => break,
            Node::Start { name, attributes } => {
                stack.push(name);
                type_attribute = None;
                for (key, value) in attributes {
                    let text = clean_text(&value);
                    if text.is_empty() {
                        continue;
                    }
                    if key.to_lowercase().contains("type") {
                        type_attribute = Some((key.clone(), text.clone()));
                    }
                    store.append(format!("{}/@{}", stack.join("/"), key), text);
                }
            }
            Node::End(name) => {
                if stack.last() == Some(&name) {
                    stack.pop();
                }
            }
            Node::Text(text) => {
                let text = clean_text(&text);
                if text.is_empty() {
                    continue;
                }
                let key = stack.join("/");
                if let Some((attribute, value)) = &type_attribute {
                    store.append(format!("{}[@{}={}]", key, attribute, value), text.clone());
                }
                store.append(key, text);
            }
        }
    }
    stream.check_invalid(out);

    store
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(entries: &str) -> Vec<String> {
        entries.split('/').map(String::from).collect()
    }

    #[test]
    fn test_single_segment_root_is_the_record() {
        let flattened = flatten("<a><b>X</b></a>", &path("a"));
        assert!(flattened.ok);
        assert_eq!(flattened.records.len(), 1);
        assert_eq!(flattened.records[0].get("b"), ["X"]);
        assert_eq!(flattened.records[0].len(), 1);
    }

    #[test]
    fn test_repeating_records_with_attributes() {
        let document = r#"<?xml version="1.0"?>
<feed>
  <entry>
    <link rel="alternate" type="text/html" href="http://example.org/1"/>
    <title type="html">First</title>
  </entry>
  <entry><title>Second</title></entry>
</feed>"#;
        let flattened = flatten(document, &path("feed/entry"));
        assert!(flattened.ok);
        assert_eq!(flattened.records.len(), 2);

        let first = &flattened.records[0];
        assert_eq!(first.get("link/@rel"), ["alternate"]);
        assert_eq!(first.get("link/@href"), ["http://example.org/1"]);
        assert_eq!(first.get("title/@type"), ["html"]);
        assert_eq!(first.get("title"), ["First"]);
        assert_eq!(first.get("title[@type=html]"), ["First"]);

        let second = &flattened.records[1];
        assert_eq!(second.get("title"), ["Second"]);
        assert!(second.get("title[@type=html]").is_empty());
    }

    #[test]
    fn test_nested_element_with_record_name() {
        let flattened = flatten("<a><a>inner</a><c>after</c></a>", &path("a"));
        assert_eq!(flattened.records[0].get("a"), ["inner"]);
        assert_eq!(flattened.records[0].get("c"), ["after"]);
    }

    #[test]
    fn test_repeated_paths_collect_all_values() {
        let flattened = flatten(
            "<r><e><author>A</author><author>B</author></e></r>",
            &path("r/e"),
        );
        assert_eq!(flattened.records[0].join("author"), "A\nB");
    }

    #[test]
    fn test_wrong_root_fails() {
        let flattened = flatten("<b/>", &path("a"));
        assert!(!flattened.ok);
        assert!(flattened.records.is_empty());
        assert!(flattened.diagnostics[0].starts_with("Expected 'a', got \"b\""));
    }

    #[test]
    fn test_missing_intermediate_segment_fails() {
        let flattened = flatten("<feed><entry/></feed>", &path("feed/group/entry"));
        assert!(!flattened.ok);
        assert!(flattened.diagnostics.iter().any(|d| d.starts_with("Expected 'group' inside 'feed'")));
    }

    #[test]
    fn test_zero_records_is_success() {
        let flattened = flatten("<feed><other/></feed>", &path("feed/entry"));
        assert!(flattened.ok);
        assert!(flattened.records.is_empty());
        assert!(flattened.diagnostics.is_empty());
    }

    #[test]
    fn test_empty_document_fails() {
        let flattened = flatten("", &path("a"));
        assert!(!flattened.ok);
        assert!(flattened.diagnostics[0].starts_with("Could not read start element"));
    }

    #[test]
    fn test_malformed_xml_is_reported_but_not_fatal() {
        let flattened = flatten("<a><b>X</c></a>", &path("a"));
        assert!(flattened.ok);
        assert_eq!(flattened.records.len(), 1);
        assert_eq!(flattened.records[0].get("b"), ["X"]);
        assert!(flattened.diagnostics[0].starts_with("Invalid XML while parsing data at offset"));
    }

    #[test]
    fn test_escaped_text_and_cdata() {
        let flattened = flatten(
            "<a><t>if x &lt; y and y &gt; z then</t><c><![CDATA[x < y]]></c><e>  </e></a>",
            &path("a"),
        );
        let store = &flattened.records[0];
        assert_eq!(store.get("t"), ["if x < y and y > z then"]);
        assert_eq!(store.get("c"), ["x < y"]);
        assert!(store.get("e").is_empty());
    }

    #[test]
    fn test_type_attribute_resets_on_next_element() {
        let flattened = flatten(
            r#"<a><id type="doi">10.1/x</id><n>plain</n></a>"#,
            &path("a"),
        );
        let store = &flattened.records[0];
        assert_eq!(store.get("id[@type=doi]"), ["10.1/x"]);
        assert_eq!(store.get("n"), ["plain"]);
        assert_eq!(store.iter().filter(|(key, _)| key.contains("[@")).count(), 1);
    }
}
