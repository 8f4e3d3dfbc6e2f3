//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand};

use crate::cli::commands::{
    completions::CompletionsArgs, generate::GenerateArgs, insert::InsertArgs,
};

#[derive(Parser)]
#[command(name = "passporter")]
#[command(author, version, about = "Password export importer for the Unix password store")]
#[command(
    long_about = "Regroups a password-manager CSV export by domain, assigns every credential a unique store path (negotiating an alias whenever two credentials contest one), and hands the result to pass."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a CSV export into a path → credential JSON map
    Generate(GenerateArgs),

    /// Insert a resolved JSON map into the pass store
    Insert(InsertArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
