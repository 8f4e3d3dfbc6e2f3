//! `passporter generate` command - resolve a CSV export into a path map
//!
//! Reads a Chrome-style password export, groups and deduplicates the
//! credentials by base domain, resolves every record to a unique store
//! path, and prints the path → credential map as JSON on stdout. All
//! prompts and progress go to stderr so the JSON can be piped.

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

use crate::core::alias::AliasMap;
use crate::core::ingest::read_export;
use crate::core::policy::{resolve_with_heuristics, InteractiveSource, TerminalPrompt};
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// CSV export to read (stdin when omitted)
    pub file: Option<PathBuf>,

    /// JSON login → alias file consulted before prompting
    #[arg(long)]
    pub aliases: Option<PathBuf>,
}

pub fn run(args: GenerateArgs) -> Result<()> {
    let config = Config::load();

    let source_label = args
        .file
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "stdin".to_string());
    eprintln!(
        "{} Importing credentials from {}",
        style("→").blue(),
        style(&source_label).yellow()
    );

    let (grouped, stats) = match &args.file {
        Some(path) => {
            if !path.exists() {
                return Err(miette::miette!("File not found: {}", path.display()));
            }
            let file = File::open(path).into_diagnostic()?;
            read_export(BufReader::new(file))?
        }
        None => read_export(io::stdin().lock())?,
    };

    let preseed = match &args.aliases {
        Some(path) => AliasMap::load(path).into_diagnostic()?,
        None => match config.aliases_file() {
            Some(path) if path.exists() => AliasMap::load(&path).into_diagnostic()?,
            _ => AliasMap::new(),
        },
    };
    if !preseed.is_empty() {
        eprintln!(
            "{} {} remembered {} loaded",
            style("→").blue(),
            style(preseed.len()).cyan(),
            if preseed.len() == 1 { "alias" } else { "aliases" }
        );
    }

    let mut source = InteractiveSource::new(preseed, TerminalPrompt);
    let outcome = resolve_with_heuristics(&grouped, &mut source);

    // Aliases gathered so far are worth keeping even when resolution was
    // interrupted, so show them before propagating any error.
    let memory = source.into_memory();
    if !memory.is_empty() {
        eprintln!();
        eprintln!("{}", style("Aliases used (save for future runs):").bold());
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&memory).into_diagnostic()?
        );
    }
    let resolved = outcome.into_diagnostic()?;

    eprintln!();
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("{}", style("Import Summary").bold());
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  Rows processed:  {}", style(stats.rows_processed).cyan());
    eprintln!(
        "  Entries created: {}",
        style(stats.entries_created).green()
    );
    if stats.entries_merged > 0 {
        eprintln!("  Entries merged:  {}", style(stats.entries_merged).yellow());
    }
    eprintln!("  Domains grouped: {}", style(grouped.len()).cyan());
    eprintln!("  Paths resolved:  {}", style(resolved.len()).green());

    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    serde_json::to_writer_pretty(&mut stdout, &resolved).into_diagnostic()?;
    writeln!(stdout).into_diagnostic()?;

    Ok(())
}
