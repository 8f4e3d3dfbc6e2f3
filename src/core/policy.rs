//! Alias-supply policies
//!
//! [`resolve`] hands out one conflict at a time; something has to answer
//! them. [`resolve_with_heuristics`] drives a resolution to completion by
//! layering two answer sources: a heuristic recheck of the grouped records
//! for conflicts that still have an unambiguous answer, and an
//! [`AliasSource`] for the rest. [`InteractiveSource`] is the shipped
//! source: preseeded aliases first, then aliases remembered during the
//! run, then an injected [`AliasPrompt`] so the policy logic stays
//! testable without a terminal.

use std::io;

use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;

use crate::core::alias::AliasMap;
use crate::core::entry::PassEntry;
use crate::core::host;
use crate::core::ingest::GroupedEntries;
use crate::core::resolve::{
    resolve, shared_full_host, PathConflict, Resolution, ResolveError, ResolvedPaths, RetryReason,
};

/// Answers the conflicts heuristics cannot.
pub trait AliasSource {
    fn supply(&mut self, conflict: &PathConflict<'_>) -> Result<String, ResolveError>;
}

/// Resolve every grouped record, answering conflicts from the heuristic
/// recheck when possible and from `source` otherwise.
pub fn resolve_with_heuristics<S: AliasSource>(
    grouped: &GroupedEntries,
    source: &mut S,
) -> Result<ResolvedPaths, ResolveError> {
    let mut step = resolve(grouped)?;
    loop {
        match step {
            Resolution::Done(resolved) => return Ok(resolved),
            Resolution::Conflict(pending) => {
                let alias = {
                    let conflict = pending.conflict();
                    match heuristic_alias(grouped, &conflict)? {
                        Some(alias) => alias,
                        None => source.supply(&conflict)?,
                    }
                };
                step = pending.resume(&alias)?;
            }
        }
    }
}

/// Recompute the automatic branches from the grouped records and supply
/// the base or full host as the alias when one of them still applies.
///
/// Never answers a retry: a heuristic answer that was just rejected would
/// be recomputed identically, and the negotiation must not loop.
fn heuristic_alias(
    grouped: &GroupedEntries,
    conflict: &PathConflict<'_>,
) -> Result<Option<String>, ResolveError> {
    if conflict.retry.is_some() {
        return Ok(None);
    }
    let Some(siblings) = grouped.get(conflict.conflicting_path) else {
        return Ok(None);
    };
    if siblings.len() == 1 {
        return Ok(Some(conflict.conflicting_path.to_string()));
    }
    if conflict.entry.urls.len() == 1 {
        let full = host::full_host(conflict.entry.urls.first())?;
        if shared_full_host(siblings, &full)? == 1 {
            return Ok(Some(full));
        }
    }
    Ok(None)
}

/// Transport for [`InteractiveSource`]
pub trait AliasPrompt {
    /// Show the conflict and ask for an alias. Accepting an offered
    /// suggestion returns it like typed input; an empty answer means the
    /// caller declined to pick one yet.
    fn ask(&mut self, conflict: &PathConflict<'_>, suggestion: Option<&str>) -> io::Result<String>;

    /// Report a recoverable oddity: a rejected alias, a replaced
    /// remembered alias.
    fn warn(&mut self, message: &str);
}

/// Prompts on the terminal via stderr, keeping stdout clean for the
/// resolved output.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl AliasPrompt for TerminalPrompt {
    fn ask(&mut self, conflict: &PathConflict<'_>, suggestion: Option<&str>) -> io::Result<String> {
        let entry = conflict.entry;
        eprintln!();
        eprintln!(
            "{} Multiple credentials contest {}",
            style("⚠").yellow().bold(),
            style(conflict.conflicting_path).cyan()
        );
        eprintln!("  {} {}", style("login:").dim(), style(&entry.login).bold());
        for url in entry.urls.iter() {
            eprintln!("  {} {}", style("url:").dim(), url);
        }

        let theme = ColorfulTheme::default();
        let mut input = Input::<String>::with_theme(&theme)
            .with_prompt(format!("Alias under {}", conflict.conflicting_path))
            .allow_empty(true);
        if let Some(suggestion) = suggestion {
            input = input.default(suggestion.to_string());
        }
        input.interact_text().map_err(io::Error::other)
    }

    fn warn(&mut self, message: &str) {
        eprintln!("{} {}", style("⚠").yellow().bold(), message);
    }
}

/// Interactive alias source with remembered aliases.
///
/// A preseeded login → alias map answers a login's first conflict without
/// prompting. Afterwards the memory built during the run takes over as
/// the suggested default. The previous conflict's record is tracked by
/// address: a re-ask for the same record offers no suggestion (the
/// remembered alias was just rejected) and replaces memory silently.
pub struct InteractiveSource<P> {
    memory: AliasMap,
    preseed: AliasMap,
    last: Option<*const PassEntry>,
    prompt: P,
}

impl<P: AliasPrompt> InteractiveSource<P> {
    pub fn new(preseed: AliasMap, prompt: P) -> Self {
        Self {
            memory: AliasMap::new(),
            preseed,
            last: None,
            prompt,
        }
    }

    /// Aliases supplied so far. Stays meaningful after an aborted
    /// resolution, so an interrupted run can still show them.
    pub fn memory(&self) -> &AliasMap {
        &self.memory
    }

    pub fn into_memory(self) -> AliasMap {
        self.memory
    }

    pub fn prompt(&self) -> &P {
        &self.prompt
    }
}

impl<P: AliasPrompt> AliasSource for InteractiveSource<P> {
    fn supply(&mut self, conflict: &PathConflict<'_>) -> Result<String, ResolveError> {
        let same_record = self
            .last
            .is_some_and(|last| std::ptr::eq(last, conflict.entry));
        self.last = Some(conflict.entry as *const PassEntry);
        let login = conflict.entry.login.as_str();

        match conflict.retry {
            Some(RetryReason::EmptyAlias) => self.prompt.warn("an alias cannot be empty"),
            Some(RetryReason::PathTaken(candidate)) => self
                .prompt
                .warn(&format!("path '{}' is already taken", candidate)),
            None => {}
        }

        if !same_record && !self.memory.contains(login) {
            if let Some(alias) = self.preseed.get(login) {
                let alias = alias.trim();
                if !alias.is_empty() {
                    let alias = alias.to_string();
                    self.memory.set(login, alias.clone());
                    return Ok(alias);
                }
            }
        }

        let suggestion = if same_record {
            None
        } else {
            self.memory.get(login).map(str::to_string)
        };
        let answer = self.prompt.ask(conflict, suggestion.as_deref())?;

        let trimmed = answer.trim();
        if !trimmed.is_empty() {
            let previous = self.memory.set(login, trimmed);
            if !same_record {
                if let Some(previous) = previous {
                    if previous != trimmed {
                        self.prompt.warn(&format!(
                            "replacing remembered alias '{}' with '{}' for {}",
                            previous, trimmed, login
                        ));
                    }
                }
            }
        }
        Ok(answer)
    }
}
