use super::entry::assemble_entry;
use super::ir::Stmt;
use super::{Body, GenerateOptions, Generator};
use crate::model::Specification;
use crate::substitute::escape_cpp;

/// Streaming `QXmlStreamReader` backend
pub struct XmlGenerator {
    // Configuration only, no state
}

impl XmlGenerator {
    pub fn new() -> Self {
        Self {}
    }

    fn is_named(name: &str) -> String {
        format!("xsr.qualifiedName() == QStringLiteral(\"{}\")", escape_cpp(name))
    }

    fn invalid_check(options: &GenerateOptions) -> Stmt {
        Stmt::guarded(
            "xsr.tokenType() == QXmlStreamReader::Invalid",
            options.warning("\"Invalid XML while parsing data at offset\" << xsr.characterOffset() << \":\" << xsr.errorString()"),
        )
    }

    /// Scans for the remaining path segments below `parent`, one nested loop per segment
    fn scan_segments(
        &self,
        parent: &str,
        remaining: &[String],
        index: usize,
        entry: Vec<Stmt>,
        options: &GenerateOptions,
    ) -> Vec<Stmt> {
        let Some((segment, rest)) = remaining.split_first() else {
            return self.record(parent, entry, options);
        };

        let mut found = self.scan_segments(segment, rest, index + 1, entry, options);
        let loop_ = |body| {
            Stmt::block(
                "while (!xsr.atEnd() && xsr.readNext() != QXmlStreamReader::Invalid)",
                vec![Stmt::if_then(
                    format!("xsr.isStartElement() && {}", Self::is_named(segment)),
                    body,
                )],
            )
        };

        // The last segment repeats and may legitimately not occur at all
        if rest.is_empty() {
            return vec![loop_(found), Self::invalid_check(options)];
        }

        let flag = format!("foundSegment{}", index);
        found.insert(0, Stmt::code(format!("{} = true;", flag)));
        vec![
            Stmt::code(format!("bool {} = false;", flag)),
            loop_(found),
            Self::invalid_check(options),
            Stmt::if_then(
                format!("!{}", flag),
                vec![
                    Stmt::code(options.warning(&format!(
                        "\"Expected '{}' inside '{}' at XML line\" << xsr.lineNumber()",
                        escape_cpp(segment),
                        escape_cpp(parent)
                    ))),
                    Stmt::code("*ok = false;"),
                ],
            ),
        ]
    }

    /// Flattens one record element into `mapping`, then runs `entry` on it
    fn record(&self, record: &str, entry: Vec<Stmt>, options: &GenerateOptions) -> Vec<Stmt> {
        let start = vec![
            Stmt::code("stack.append(xsr.qualifiedName().toString());"),
            Stmt::code("typeAttribute = qMakePair(QString(), QString());"),
            Stmt::block(
                "for (const QXmlStreamAttribute &attr : xsr.attributes())",
                vec![
                    Stmt::code("const QString text{OnlineSearchAbstract::deHTMLify(attr.value().toString().trimmed())};"),
                    Stmt::if_then(
                        "!text.isEmpty()",
                        vec![
                            Stmt::guarded(
                                "attr.qualifiedName().toString().toLower().contains(QStringLiteral(\"type\"))",
                                "typeAttribute = qMakePair(attr.qualifiedName().toString(), text);",
                            ),
                            Stmt::code("mapping[stack.join(QStringLiteral(\"/\")) + QStringLiteral(\"/@\") + attr.qualifiedName().toString()].append(text);"),
                        ],
                    ),
                ],
            ),
        ];
        let end = vec![Stmt::guarded(
            "!stack.isEmpty() && stack.last() == xsr.qualifiedName()",
            "stack.removeLast();",
        )];
        let characters = vec![
            Stmt::code("const QString text{OnlineSearchAbstract::deHTMLify(xsr.text().toString().trimmed())};"),
            Stmt::if_then(
                "!text.isEmpty()",
                vec![
                    Stmt::code("const QString key{stack.join(QStringLiteral(\"/\"))};"),
                    Stmt::code("mapping[key].append(text);"),
                    Stmt::guarded(
                        "!typeAttribute.first.isEmpty() && !typeAttribute.second.isEmpty()",
                        "mapping[key + QStringLiteral(\"[@\") + typeAttribute.first + QStringLiteral(\"=\") + typeAttribute.second + QStringLiteral(\"]\")].append(text);",
                    ),
                ],
            ),
        ];

        let mut stmts = vec![
            Stmt::code("QStringList stack;"),
            Stmt::code("QPair<QString, QString> typeAttribute;"),
            Stmt::code("QMap<QString, QStringList> mapping;"),
            Stmt::block(
                format!(
                    "while (!xsr.atEnd() && xsr.readNext() != QXmlStreamReader::Invalid && !(xsr.isEndElement() && stack.isEmpty() && {}))",
                    Self::is_named(record)
                ),
                vec![Stmt::If {
                    arms: vec![
                        ("xsr.isStartElement()".to_string(), start),
                        ("xsr.isEndElement()".to_string(), end),
                        ("xsr.isCharacters() && !xsr.isWhitespace()".to_string(), characters),
                    ],
                    otherwise: None,
                }],
            ),
            Self::invalid_check(options),
            Stmt::Blank,
        ];
        stmts.extend(entry);
        stmts
    }
}

impl Default for XmlGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for XmlGenerator {
    fn body(&self, spec: &Specification, options: &GenerateOptions) -> Body {
        let (entry, variables) = assemble_entry(spec);
        let Some((root, rest)) = spec.entries_path.split_first() else {
            return Body {
                stmts: Vec::new(),
                variables,
            };
        };

        let stmts = vec![
            Stmt::code("*ok = true;"),
            Stmt::code("QXmlStreamReader xsr(xmlData);"),
            Stmt::if_else(
                "xsr.readNextStartElement()",
                vec![Stmt::if_else(
                    Self::is_named(root),
                    self.scan_segments(root, rest, 1, entry, options),
                    vec![
                        Stmt::code(options.warning(&format!(
                            "\"Expected '{}', got\" << xsr.qualifiedName() << \"at XML line\" << xsr.lineNumber()",
                            escape_cpp(root)
                        ))),
                        Stmt::code("*ok = false;"),
                    ],
                )],
                vec![
                    Stmt::code(options.warning(
                        "\"Could not read start element at XML line\" << xsr.lineNumber() << \":\" << xsr.errorString()",
                    )),
                    Stmt::code("*ok = false;"),
                ],
            ),
        ];
        Body { stmts, variables }
    }
}
