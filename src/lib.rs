//! Passporter: password export importer for pass
//!
//! Regroups a password-manager CSV export by base domain, deduplicates
//! the accounts, assigns every credential a unique store path, and hands
//! the result to the standard Unix password store.

pub mod cli;
pub mod core;
