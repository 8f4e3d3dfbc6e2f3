//! `passporter insert` command - store a resolved map via pass
//!
//! Reads the JSON map produced by `generate` and inserts one multi-line
//! secret per path through `pass insert --multiline`.

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use crate::core::pass::PassStore;
use crate::core::resolve::ResolvedPaths;
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct InsertArgs {
    /// Resolved JSON map to read (stdin when omitted)
    pub file: Option<PathBuf>,

    /// Show what would be inserted without touching the store
    #[arg(long)]
    pub dry_run: bool,

    /// Overwrite secrets that already exist in the store
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InsertArgs) -> Result<()> {
    let config = Config::load();

    let resolved: ResolvedPaths = match &args.file {
        Some(path) => {
            if !path.exists() {
                return Err(miette::miette!("File not found: {}", path.display()));
            }
            let file = File::open(path).into_diagnostic()?;
            serde_json::from_reader(BufReader::new(file)).into_diagnostic()?
        }
        None => serde_json::from_reader(io::stdin().lock()).into_diagnostic()?,
    };

    println!(
        "{} Inserting {} {} into the password store{}",
        style("→").blue(),
        style(resolved.len()).cyan(),
        if resolved.len() == 1 {
            "credential"
        } else {
            "credentials"
        },
        if args.dry_run {
            style(" (dry run)").dim().to_string()
        } else {
            String::new()
        }
    );

    let pass_cmd = config.pass_cmd();
    let store = PassStore::new(pass_cmd.clone());
    if !args.dry_run {
        match store.head_commit().into_diagnostic()? {
            Some(head) => {
                println!(
                    "{} Store is at {}. Revert with: {} git reset --hard {}",
                    style("→").blue(),
                    style(&head).cyan(),
                    pass_cmd,
                    head
                );
                println!(
                    "  {}",
                    style(format!(
                        "If already pushed, revert in a new commit instead: {} git revert --no-commit {}..HEAD && {} git commit",
                        pass_cmd, head, pass_cmd
                    ))
                    .dim()
                );
            }
            None => println!(
                "{}",
                style("○ Store has no git history; inserts cannot be reverted in bulk.").dim()
            ),
        }
    }
    println!();

    let mut inserted = 0usize;
    for (path, entry) in resolved.iter() {
        if args.dry_run {
            println!(
                "{} Would insert {} ({}, {} {})",
                style("○").dim(),
                style(path).cyan(),
                entry.login,
                entry.urls.len(),
                if entry.urls.len() == 1 { "URL" } else { "URLs" }
            );
        } else {
            store
                .insert(path, entry, args.force)
                .map_err(|e| miette::miette!("{}: {}", path, e))?;
            println!("{} Inserted {}", style("✓").green(), style(path).cyan());
            inserted += 1;
        }
    }

    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!("{}", style("Insert Summary").bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  Paths in map: {}", style(resolved.len()).cyan());
    println!("  Inserted:     {}", style(inserted).green());

    if args.dry_run {
        println!();
        println!(
            "{}",
            style("Dry run complete. Nothing was inserted.").yellow()
        );
    }

    Ok(())
}
