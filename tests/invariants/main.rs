//! Structural checks run against every specification under tests/fixtures
//!
//! Run with: cargo test --test invariants

use bibsearch_codegen::{GenerateOptions, GenerateResult, Pipeline, RuleKind};
use libtest_mimic::{Arguments, Failed, Trial};
use std::fs;
use std::path::{Path, PathBuf};

fn collect_fixtures() -> Vec<PathBuf> {
    let pattern = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/*-parser.in.cpp")
        .to_string_lossy()
        .into_owned();
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .expect("valid glob pattern")
        .filter_map(Result::ok)
        .collect();
    files.sort();
    files
}

fn compile(path: &Path, options: &GenerateOptions) -> Result<GenerateResult, Failed> {
    let source = fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    Pipeline::standard()
        .compile(&source, options)
        .map_err(|e| Failed::from(format!("{}: {}", path.display(), e)))
}

fn check_idempotent(path: &Path) -> Result<(), Failed> {
    let options = GenerateOptions::default();
    let first = compile(path, &options)?;
    let second = compile(path, &options)?;
    if first.code != second.code {
        return Err("regenerating an unchanged specification changed the output".into());
    }
    Ok(())
}

fn check_braces(path: &Path) -> Result<(), Failed> {
    for options in [
        GenerateOptions::default(),
        GenerateOptions {
            function_name: Some("parse".to_string()),
            ..Default::default()
        },
    ] {
        let result = compile(path, &options)?;
        let mut depth: i64 = 0;
        for (n, line) in result.code.lines().enumerate() {
            for c in line.chars() {
                match c {
                    '{' => depth += 1,
                    '}' => depth -= 1,
                    _ => {}
                }
                if depth < 0 {
                    return Err(format!("unbalanced closing brace on line {}: {}", n + 1, line).into());
                }
            }
            let indent = line.len() - line.trim_start().len();
            if indent % 4 != 0 {
                return Err(format!("indent of line {} is not a multiple of four: {:?}", n + 1, line).into());
            }
        }
        if depth != 0 {
            return Err(format!("{} unclosed brace(s)", depth).into());
        }
    }
    Ok(())
}

fn check_banner(path: &Path) -> Result<(), Failed> {
    let options = GenerateOptions {
        input_name: path.display().to_string(),
        ..Default::default()
    };
    let result = compile(path, &options)?;
    let mut lines = result.code.lines().map(str::trim);
    if lines.next() != Some("// Source code generated by bibsearch-codegen") {
        return Err("missing generator banner".into());
    }
    let expected = format!("// using information from configuration file '{}'", path.display());
    if lines.next() != Some(expected.as_str()) {
        return Err("banner does not name the input file".into());
    }
    Ok(())
}

fn check_declarations(path: &Path) -> Result<(), Failed> {
    let result = compile(path, &GenerateOptions::default())?;
    if result.variables.is_empty() {
        return Err("fixture declares no rules".into());
    }
    for variable in &result.variables {
        let declaration = match variable.kind {
            RuleKind::Field => format!("const QString {} ", variable.name),
            RuleKind::Value => format!("const Value {} ", variable.name),
        };
        let count = result
            .code
            .lines()
            .filter(|line| line.trim_start().starts_with(&declaration))
            .count();
        if count != 1 {
            return Err(format!("{} declared {} times for key {}", variable.name, count, variable.key).into());
        }
        let guard = format!("if (!{}.isEmpty())", variable.name);
        if !result.code.contains(&guard) {
            return Err(format!("{} is stored without an emptiness check", variable.name).into());
        }
    }
    Ok(())
}

fn check_placeholders(path: &Path) -> Result<(), Failed> {
    let result = compile(path, &GenerateOptions::default())?;
    if let Some(line) = result.code.lines().find(|line| line.contains("{{")) {
        return Err(format!("unresolved placeholder: {}", line.trim()).into());
    }
    Ok(())
}

fn main() {
    let args = Arguments::from_args();

    let checks: [(&str, fn(&Path) -> Result<(), Failed>); 5] = [
        ("idempotent", check_idempotent),
        ("braces", check_braces),
        ("banner", check_banner),
        ("declarations", check_declarations),
        ("placeholders", check_placeholders),
    ];

    let mut trials = Vec::new();
    for path in collect_fixtures() {
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("fixture")
            .trim_end_matches("-parser.in.cpp")
            .to_string();
        for (check, run) in checks {
            let path = path.clone();
            trials.push(Trial::test(format!("{}::{}", name, check), move || run(&path)));
        }
    }

    libtest_mimic::run(&args, trials).exit();
}
