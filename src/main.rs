use anyhow::{Context, bail};
use bibsearch_codegen::runtime::{self, PathValueStore, RecordPreview};
use bibsearch_codegen::{Error, GenerateOptions, Pipeline, read_source};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use walkdir::WalkDir;

const SPEC_SUFFIX: &str = "-parser.in.cpp";
const OUTPUT_SUFFIX: &str = "-parser.generated.cpp";

#[derive(Parser)]
#[command(name = "bibsearch-codegen")]
#[command(about = "Generate C++ parsing code for bibliographic search services")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate C++ from a specification file, or from every *-parser.in.cpp in a directory
    Generate {
        /// Path to a specification file or directory
        #[arg(required_unless_present = "stdin")]
        file: Option<PathBuf>,

        /// Read the specification from stdin
        #[arg(long)]
        stdin: bool,

        /// Output as JSON with the generated variable names
        #[arg(long)]
        json: bool,

        /// Wrap the body in a complete function of this name
        #[arg(long)]
        function: Option<String>,

        /// Base indent depth in 4-space units
        #[arg(long)]
        depth: Option<usize>,

        /// Logging category used in emitted warnings
        #[arg(long, default_value = "LOG_KBIBTEX_NETWORKING")]
        log_category: String,

        /// Maximum number of JSON records processed per document
        #[arg(long, default_value_t = 1024)]
        max_records: usize,
    },
    /// Flatten a sample response the way the generated code would and preview its entries
    Flatten {
        /// Specification file
        spec: PathBuf,

        /// XML or JSON response document
        document: PathBuf,

        /// Maximum number of JSON records processed
        #[arg(long, default_value_t = 1024)]
        max_records: usize,
    },
}

fn main() -> anyhow::Result<()> {
    // stdout carries generated code, so logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            file,
            stdin,
            json,
            function,
            depth,
            log_category,
            max_records,
        } => {
            let options = GenerateOptions {
                function_name: function,
                base_depth: depth,
                log_category,
                max_records,
                ..GenerateOptions::default()
            };
            if stdin {
                generate_stdin(json, options)
            } else if let Some(path) = file {
                generate_path(&path, json, options)
            } else {
                bail!("provide a file/directory or use --stdin")
            }
        }
        Commands::Flatten {
            spec,
            document,
            max_records,
        } => flatten(&spec, &document, max_records),
    }
}

/// Print a specification error with source context and exit
fn exit_with(err: &Error, source: &str, filename: &str) -> ! {
    eprint!("{}", err.render(source, filename, io::stderr().is_terminal()));
    std::process::exit(1);
}

fn compile_or_exit(source: &str, options: &GenerateOptions) -> bibsearch_codegen::GenerateResult {
    match Pipeline::standard().compile(source, options) {
        Ok(result) => result,
        Err(err) => exit_with(&err, source, &options.input_name),
    }
}

fn generate_stdin(json_output: bool, options: GenerateOptions) -> anyhow::Result<()> {
    let mut source = String::new();
    io::stdin().read_to_string(&mut source).context("failed to read stdin")?;

    let result = compile_or_exit(&source, &options);
    if json_output {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        print!("{}", result.code);
    }
    Ok(())
}

fn generate_path(path: &Path, json_output: bool, options: GenerateOptions) -> anyhow::Result<()> {
    if path.is_file() {
        let source = read_source(path)?;
        let options = GenerateOptions {
            input_name: path.display().to_string(),
            ..options
        };
        let result = compile_or_exit(&source, &options);
        if json_output {
            println!("{}", serde_json::to_string(&result)?);
        } else {
            print!("{}", result.code);
        }
        Ok(())
    } else if path.is_dir() {
        generate_directory(path, &options)
    } else {
        bail!("{} does not exist", path.display())
    }
}

fn output_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(SPEC_SUFFIX)?;
    Some(path.with_file_name(format!("{}{}", stem, OUTPUT_SUFFIX)))
}

fn generate_directory(dir: &Path, options: &GenerateOptions) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut specs: Vec<(PathBuf, PathBuf)> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| output_path(e.path()).map(|output| (e.path().to_path_buf(), output)))
        .collect();
    specs.sort();

    if specs.is_empty() {
        bail!("no *{} files found in {}", SPEC_SUFFIX, dir.display());
    }

    let reporter = Reporter::stderr();
    for (path, output) in &specs {
        let source = read_source(path)?;
        let options = GenerateOptions {
            input_name: path.display().to_string(),
            ..options.clone()
        };
        let result = compile_or_exit(&source, &options);
        fs::write(output, &result.code).with_context(|| format!("failed to write {}", output.display()))?;
        tracing::info!(spec = %path.display(), output = %output.display(), "generated");
        eprintln!("{}", reporter.written(path, output));
    }

    eprintln!("\n{}", reporter.finished(specs.len(), start.elapsed()));
    Ok(())
}

#[derive(Serialize)]
struct FlattenedRecord<'a> {
    store: &'a PathValueStore,
    preview: RecordPreview,
}

#[derive(Serialize)]
struct FlattenReport<'a> {
    ok: bool,
    diagnostics: &'a [String],
    records: Vec<FlattenedRecord<'a>>,
}

fn flatten(spec_path: &Path, document_path: &Path, max_records: usize) -> anyhow::Result<()> {
    let source = read_source(spec_path)?;
    let spec = match Pipeline::standard().load(&source) {
        Ok(spec) => spec,
        Err(err) => exit_with(&err, &source, &spec_path.display().to_string()),
    };
    let document = read_source(document_path)?;

    let flattened = runtime::flatten_document(&spec, &document, max_records);
    let report = FlattenReport {
        ok: flattened.ok,
        diagnostics: &flattened.diagnostics,
        records: flattened
            .records
            .iter()
            .map(|store| FlattenedRecord {
                store,
                preview: runtime::preview(&spec, store),
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Progress lines for directory runs, written to stderr
struct Reporter {
    color: bool,
}

impl Reporter {
    fn stderr() -> Self {
        Self {
            color: io::stderr().is_terminal(),
        }
    }

    fn written(&self, spec: &Path, output: &Path) -> String {
        let name = output.file_name().map(Path::new).unwrap_or(output);
        if self.color {
            format!("  \x1b[2m{}\x1b[0m -> \x1b[32m{}\x1b[0m", spec.display(), name.display())
        } else {
            format!("  {} -> {}", spec.display(), name.display())
        }
    }

    fn finished(&self, count: usize, elapsed: Duration) -> String {
        let noun = if count == 1 { "parser" } else { "parsers" };
        let line = format!("Generated {} {} ({:.1?})", count, noun, elapsed);
        if self.color {
            format!("\x1b[1m{}\x1b[0m", line)
        } else {
            line
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_names_output_file() {
        let reporter = Reporter { color: false };
        let line = reporter.written(Path::new("svc/a-parser.in.cpp"), Path::new("svc/a-parser.generated.cpp"));
        assert_eq!(line, "  svc/a-parser.in.cpp -> a-parser.generated.cpp");
    }

    #[test]
    fn test_finished_counts_parsers() {
        let reporter = Reporter { color: false };
        assert_eq!(reporter.finished(1, Duration::from_millis(3)), "Generated 1 parser (3.0ms)");
        assert!(reporter.finished(2, Duration::from_micros(1500)).starts_with("Generated 2 parsers ("));
        assert!(Reporter { color: true }.finished(2, Duration::ZERO).starts_with("\x1b[1m"));
    }

    #[test]
    fn test_output_path_requires_suffix() {
        assert_eq!(
            output_path(Path::new("d/x-parser.in.cpp")),
            Some(PathBuf::from("d/x-parser.generated.cpp"))
        );
        assert_eq!(output_path(Path::new("d/notes.txt")), None);
    }
}
