//! Core module - ingestion, grouping, and path-conflict resolution

pub mod alias;
pub mod config;
pub mod entry;
pub mod host;
pub mod ingest;
pub mod pass;
pub mod policy;
pub mod resolve;

pub use alias::{AliasMap, AliasMapError};
pub use config::Config;
pub use entry::{EmptyUrlSet, PassEntry, UrlSet};
pub use host::{base_host, full_host, HostError};
pub use ingest::{read_export, GroupedEntries, ImportError, ImportStats};
pub use pass::{format_entry_body, PassError, PassStore};
pub use policy::{
    resolve_with_heuristics, AliasPrompt, AliasSource, InteractiveSource, TerminalPrompt,
};
pub use resolve::{
    resolve, PathConflict, Resolution, ResolveError, ResolvedPaths, RetryReason, Suspended,
};
