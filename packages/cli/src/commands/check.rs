use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use quill_parser::{parse_with_schema, NodeType, Schema, Serializer};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const EXTENSIONS: [&str; 3] = ["html", "htm", "quill"];

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Markup file or directory to check
    pub input: PathBuf,

    /// Also fail on files that are valid but not in canonical form
    #[arg(long)]
    pub strict: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileReport {
    path: String,
    error: Option<String>,
    normalized: bool,
    blocks: usize,
    callouts: usize,
    math: usize,
    mentions: usize,
}

/// Validate markup files against the built-in schema
pub fn check(args: CheckArgs) -> Result<()> {
    let files = if args.input.is_file() {
        vec![args.input.clone()]
    } else if args.input.is_dir() {
        find_markup_files(&args.input)
    } else {
        return Err(anyhow!("Input path does not exist: {}", args.input.display()));
    };

    let reports: Vec<FileReport> = files.iter().map(|path| check_file(path)).collect();
    let failed = reports
        .iter()
        .filter(|r| r.error.is_some() || (args.strict && !r.normalized))
        .count();

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&reports)?),
        "text" => print_text(&reports, args.strict),
        other => return Err(anyhow!("Unknown output format: {}. Use: text or json", other)),
    }

    if failed > 0 {
        return Err(anyhow!("{} of {} file(s) failed the check", failed, reports.len()));
    }
    Ok(())
}

fn check_file(path: &Path) -> FileReport {
    let mut report = FileReport {
        path: path.display().to_string(),
        error: None,
        normalized: false,
        blocks: 0,
        callouts: 0,
        math: 0,
        mentions: 0,
    };

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            report.error = Some(err.to_string());
            return report;
        }
    };

    let schema = Schema::builtin();
    let doc = match parse_with_schema(&source, schema) {
        Ok(doc) => doc,
        Err(err) => {
            report.error = Some(err.to_string());
            return report;
        }
    };
    if let Err(err) = schema.check(&doc) {
        report.error = Some(err.to_string());
        return report;
    }

    report.normalized = Serializer::new(schema).serialize(&doc) == source.trim_end();
    report.blocks = doc.child_count();
    report.callouts = doc.count_type(NodeType::CalloutNode);
    report.math = doc.count_type(NodeType::InlineMath) + doc.count_type(NodeType::BlockMath);
    report.mentions = doc.count_type(NodeType::Mention);
    report
}

fn print_text(reports: &[FileReport], strict: bool) {
    for report in reports {
        match &report.error {
            Some(err) => println!("{} {}: {}", "✗".red(), report.path, err),
            None if !report.normalized => println!(
                "{} {} {}",
                if strict { "✗".red() } else { "!".yellow() },
                report.path,
                "(not in canonical form)".dimmed()
            ),
            None => println!(
                "{} {} {}",
                "✓".green(),
                report.path,
                format!(
                    "({} blocks, {} callouts, {} math, {} mentions)",
                    report.blocks, report.callouts, report.math, report.mentions
                )
                .dimmed()
            ),
        }
    }
    println!();
    println!("   Files checked: {}", reports.len());
}

fn find_markup_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| EXTENSIONS.contains(&ext))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_file_counts_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.html");
        fs::write(
            &path,
            r#"<div class="callout" data-callout="tip"><p><span data-type="inline-math" data-latex="x"></span></p></div><p>b</p>"#,
        )
        .unwrap();

        let report = check_file(&path);
        assert!(report.error.is_none());
        assert!(report.normalized);
        assert_eq!(report.blocks, 2);
        assert_eq!(report.callouts, 1);
        assert_eq!(report.math, 1);
    }

    #[test]
    fn test_directory_walk_and_strict_mode() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ok.html"), "<p>fine</p>").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/loose.quill"), "loose").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(find_markup_files(dir.path()).len(), 2);

        let lenient = CheckArgs {
            input: dir.path().to_path_buf(),
            strict: false,
            format: "json".to_string(),
        };
        assert!(check(lenient).is_ok());

        let strict = CheckArgs {
            input: dir.path().to_path_buf(),
            strict: true,
            format: "json".to_string(),
        };
        assert!(check(strict).is_err());
    }
}
