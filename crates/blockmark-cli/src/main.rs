// SPDX-License-Identifier: AGPL-3.0-or-later
//! Batch front end for the Blockmark transcoding engine
//!
//! `normalize` rewrites files in the serializer's canonical form, `dump`
//! prints the parsed Block Model as JSON, `check` verifies that files
//! already round-trip cleanly through parse/serialize.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use blockmark_core::{Document, MarkdownParser, MarkdownSerializer};

#[derive(Parser)]
#[command(name = "blockmark", about = "Blockmark document transcoding tool", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse and reserialize to canonical form.
    Normalize {
        /// Input markdown file(s) or directory. Omit to read from stdin.
        input: Vec<PathBuf>,

        /// Output file (single input) or directory (multiple inputs).
        /// Omit to write to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse and print the Block Model as JSON.
    Dump {
        /// Input markdown file. Omit to read from stdin.
        input: Option<PathBuf>,

        /// Print compact JSON instead of pretty-printed.
        #[arg(long)]
        compact: bool,
    },

    /// Verify that files reserialize to their own content.
    Check {
        /// Input markdown file(s) or directory.
        input: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Normalize { input, output } => normalize(&input, output.as_deref()),
        Command::Dump { input, compact } => dump(input.as_deref(), compact),
        Command::Check { input } => check(&input),
    }
}

fn normalize(inputs: &[PathBuf], output: Option<&Path>) -> Result<()> {
    let parser = MarkdownParser::new();
    let serializer = MarkdownSerializer::new();

    if inputs.is_empty() {
        let doc = parser.parse_document(&read_stdin()?, "<stdin>");
        return write_output(&serializer.serialize_document(&doc)?, output);
    }

    let files = collect_markdown_files(inputs)?;
    match files.as_slice() {
        [] => bail!("no markdown files found"),
        [file] => {
            let doc = load_document(&parser, file)?;
            write_output(&serializer.serialize_document(&doc)?, output)
        }
        _ => {
            let out_dir = output.context("multiple input files require --output directory")?;
            std::fs::create_dir_all(out_dir)
                .with_context(|| format!("creating {}", out_dir.display()))?;
            for file in &files {
                let doc = load_document(&parser, file)?;
                let name = file.file_name().context("input file has no name")?;
                let out_path = out_dir.join(name);
                std::fs::write(&out_path, serializer.serialize_document(&doc)?)
                    .with_context(|| format!("writing {}", out_path.display()))?;
                info!(from = %file.display(), to = %out_path.display(), "normalized");
            }
            Ok(())
        }
    }
}

fn dump(input: Option<&Path>, compact: bool) -> Result<()> {
    let parser = MarkdownParser::new();
    let doc = match input {
        Some(file) => load_document(&parser, file)?,
        None => parser.parse_document(&read_stdin()?, "<stdin>"),
    };
    let json = if compact {
        serde_json::to_string(&doc)?
    } else {
        serde_json::to_string_pretty(&doc)?
    };
    println!("{}", json);
    Ok(())
}

fn check(inputs: &[PathBuf]) -> Result<()> {
    let parser = MarkdownParser::new();
    let serializer = MarkdownSerializer::new();

    let files = collect_markdown_files(inputs)?;
    if files.is_empty() {
        bail!("no markdown files found");
    }

    let mut offenders = Vec::new();
    for file in &files {
        let markup = read_file(file)?;
        let doc = parser.parse_document(&markup, &file.display().to_string());
        let rendered = serializer.serialize_document(&doc)?;
        if rendered == normalize_newline(&markup) {
            info!(file = %file.display(), "round-trips cleanly");
        } else {
            eprintln!("not round-trip stable: {}", file.display());
            offenders.push(file);
        }
    }

    if !offenders.is_empty() {
        bail!(
            "{} of {} files failed the round-trip check",
            offenders.len(),
            files.len()
        );
    }
    Ok(())
}

/// Compare modulo trailing-newline normalization, matching the serializer's
/// single-trailing-newline contract.
fn normalize_newline(markup: &str) -> String {
    let trimmed = markup.trim_end_matches('\n');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}\n", trimmed)
    }
}

fn load_document(parser: &MarkdownParser, file: &Path) -> Result<Document> {
    let markup = read_file(file)?;
    Ok(parser.parse_document(&markup, &file.display().to_string()))
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn read_stdin() -> Result<String> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("reading stdin")?;
    Ok(input)
}

fn write_output(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))
        }
        None => io::stdout()
            .write_all(content.as_bytes())
            .context("writing stdout"),
    }
}

fn collect_markdown_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let entries = std::fs::read_dir(input)
                .with_context(|| format!("reading directory {}", input.display()))?;
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("md") {
                    files.push(path);
                }
            }
        } else {
            files.push(input.clone());
        }
    }
    files.sort();
    Ok(files)
}
