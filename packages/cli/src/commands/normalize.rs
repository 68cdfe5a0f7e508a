use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use quill_parser::{parse_with_schema, Schema, Serializer};
use std::fs;
use std::path::PathBuf;

use super::read_input;

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Markup file to normalize (`-` for stdin)
    pub input: PathBuf,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Rewrite the input file in place
    #[arg(short, long, conflicts_with = "output")]
    pub write: bool,
}

/// Parse leniently and print the canonical serialization
pub fn normalize(args: NormalizeArgs) -> Result<()> {
    let source = read_input(&args.input)?;
    let normalized = normalize_source(&source)?;

    let target = if args.write {
        Some(args.input.clone())
    } else {
        args.output.clone()
    };

    match target {
        Some(path) => {
            fs::write(&path, &normalized).with_context(|| format!("Failed to write {}", path.display()))?;
            if normalized == source.trim_end() {
                eprintln!("{} {} already normalized", "✓".green(), path.display());
            } else {
                eprintln!("{} {} written", "✓".green(), path.display());
            }
        }
        None => println!("{}", normalized),
    }

    Ok(())
}

pub(crate) fn normalize_source(source: &str) -> Result<String> {
    let schema = Schema::builtin();
    let doc = parse_with_schema(source, schema)?;
    Ok(Serializer::new(schema).serialize(&doc))
}
