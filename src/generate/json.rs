use super::entry::assemble_entry;
use super::ir::Stmt;
use super::{Body, GenerateOptions, Generator};
use crate::model::Specification;
use crate::substitute::escape_cpp;

/// Whole-document `QJsonDocument` backend
pub struct JsonGenerator {
    // Configuration only, no state
}

impl JsonGenerator {
    pub fn new() -> Self {
        Self {}
    }

    /// Breadth-first walk filling `globalMapping` with every leaf under its joined path
    fn global_flatten(&self) -> Vec<Stmt> {
        vec![
            Stmt::code("QMap<QString, QStringList> globalMapping;"),
            Stmt::code("QQueue<QPair<QJsonValue, QStringList>> queue;"),
            Stmt::code("queue.enqueue(qMakePair(QJsonValue(document.object()), QStringList()));"),
            Stmt::block(
                "while (!queue.isEmpty())",
                vec![
                    Stmt::code("const auto p{queue.dequeue()};"),
                    Stmt::code("const QJsonValue cur{p.first};"),
                    Stmt::code("const QStringList path{p.second};"),
                    Stmt::If {
                        arms: vec![
                            (
                                "cur.isArray()".to_string(),
                                vec![
                                    Stmt::code("const QJsonArray curArray = cur.toArray();"),
                                    Stmt::Guarded {
                                        guard: "for (int i = 0; i < curArray.size(); ++i)".to_string(),
                                        stmt: "queue.enqueue(qMakePair(curArray[i], QStringList(path) << QString::number(i)));".to_string(),
                                    },
                                ],
                            ),
                            (
                                "cur.isObject()".to_string(),
                                vec![
                                    Stmt::code("const QJsonObject curObj = cur.toObject();"),
                                    Stmt::Guarded {
                                        guard: "for (auto it = curObj.constBegin(); it != curObj.constEnd(); ++it)".to_string(),
                                        stmt: "queue.enqueue(qMakePair(it.value(), QStringList(path) << it.key()));".to_string(),
                                    },
                                ],
                            ),
                            (
                                "cur.isString() || cur.isDouble() || cur.isBool()".to_string(),
                                vec![
                                    Stmt::code("const QString text{cur.isString() ? cur.toString() : (cur.isDouble() ? QString::number(cur.toDouble()) : (cur.toBool() ? QStringLiteral(\"true\") : QStringLiteral(\"false\")))};"),
                                    Stmt::code("globalMapping[path.join(QStringLiteral(\"/\"))].append(text);"),
                                ],
                            ),
                        ],
                        otherwise: None,
                    },
                ],
            ),
        ]
    }

    /// One record per index of the entries array, re-keyed relative to the record
    fn records(&self, spec: &Specification, entry: Vec<Stmt>, options: &GenerateOptions) -> Vec<Stmt> {
        let entries = escape_cpp(&spec.entries());

        let mut record = vec![
            Stmt::code(format!(
                "const QString keyPrefix{{QStringLiteral(\"{}/\") + QString::number(n) + QStringLiteral(\"/\")}};",
                entries
            )),
            Stmt::code("QMap<QString, QStringList> mapping;"),
            Stmt::block(
                "for (auto it = globalMapping.constBegin(); it != globalMapping.constEnd(); ++it)",
                vec![Stmt::if_then(
                    "it.key().startsWith(keyPrefix)",
                    vec![
                        Stmt::code("QString key{it.key().mid(keyPrefix.length())};"),
                        Stmt::code("const auto endsWithNumbersMatch{endsWithNumbersRegExp.match(key)};"),
                        Stmt::guarded(
                            "endsWithNumbersMatch.hasMatch()",
                            "key = key.left(key.length() - endsWithNumbersMatch.capturedLength());",
                        ),
                        Stmt::code("mapping[key].append(it.value());"),
                    ],
                )],
            ),
            Stmt::guarded("mapping.isEmpty()", "break;"),
            Stmt::Blank,
        ];
        record.extend(entry);

        vec![
            Stmt::code("QJsonValue entriesValue{document.object()};"),
            Stmt::Guarded {
                guard: format!(
                    "for (const QString &segment : QStringLiteral(\"{}\").split(QLatin1Char('/')))",
                    entries
                ),
                stmt: "entriesValue = entriesValue.isArray() ? entriesValue.toArray().at(segment.toInt()) : entriesValue.toObject().value(segment);".to_string(),
            },
            Stmt::code("const int entriesCount = entriesValue.isArray() ? entriesValue.toArray().size() : 0;"),
            Stmt::code("static const QRegularExpression endsWithNumbersRegExp{QStringLiteral(\"/(0|[1-9][0-9]*)$\")};"),
            Stmt::block(
                format!("for (int n = 0; n < entriesCount && n < {}; ++n)", options.max_records),
                record,
            ),
        ]
    }
}

impl Default for JsonGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for JsonGenerator {
    fn body(&self, spec: &Specification, options: &GenerateOptions) -> Body {
        let (entry, variables) = assemble_entry(spec);
        let mut document = self.global_flatten();
        document.push(Stmt::Blank);
        document.extend(self.records(spec, entry, options));
        document.push(Stmt::code("*ok = true;"));

        let stmts = vec![
            Stmt::code("QJsonParseError parseError;"),
            Stmt::code("const QJsonDocument document = QJsonDocument::fromJson(jsonData, &parseError);"),
            Stmt::if_else(
                "parseError.error == QJsonParseError::NoError",
                vec![Stmt::if_else(
                    "document.isObject()",
                    document,
                    vec![
                        Stmt::code(options.warning("\"JSON document is not an object\"")),
                        Stmt::code("*ok = false;"),
                    ],
                )],
                vec![
                    Stmt::code(options.warning("\"Problem with JSON data:\" << parseError.errorString()")),
                    Stmt::code("*ok = false;"),
                ],
            ),
        ];
        Body { stmts, variables }
    }
}
