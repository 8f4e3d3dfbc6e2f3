//! Path-conflict resolution
//!
//! Every credential needs a unique storage path. Most get one without any
//! help: the only record for a domain lives at the base host itself, and a
//! record alone on its subdomain nests under `base/full`. Everything else
//! is a conflict, and resolution pauses until the caller supplies an alias
//! to build a `base/alias` path from.
//!
//! The pause is encoded in ownership: [`resolve`] returns either a finished
//! [`ResolvedPaths`] or a [`Suspended`] resolution that can only continue by
//! consuming itself through [`Suspended::resume`]. Rejected aliases (empty,
//! or a path already taken) re-suspend at the same record with the reason
//! attached, so the caller can warn and ask again.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::core::entry::PassEntry;
use crate::core::host::{self, HostError};
use crate::core::ingest::GroupedEntries;

/// Errors that can occur during path resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Two records were assigned the same path. The automatic branches
    /// never produce duplicates on their own, so this means an accepted
    /// alias path and an automatic path raced for the same key.
    #[error("path '{path}' assigned twice")]
    Collision { path: String },

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("alias input failed: {0}")]
    Prompt(#[from] std::io::Error),
}

/// Why a conflict is being re-emitted after a rejected resume
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// The supplied alias trimmed down to nothing.
    EmptyAlias,
    /// The candidate path built from the alias already exists.
    PathTaken(String),
}

/// A record that cannot be placed without an alias.
///
/// `retry` is `None` on the first emission; re-emissions after a rejected
/// alias carry the reason while `entry` and `conflicting_path` stay
/// identical.
#[derive(Debug, Clone, Copy)]
pub struct PathConflict<'a> {
    pub entry: &'a PassEntry,
    /// The base-host path the record collided at.
    pub conflicting_path: &'a str,
    pub retry: Option<&'a RetryReason>,
}

/// Outcome of starting or resuming a resolution
#[derive(Debug)]
pub enum Resolution<'a> {
    /// Paused on a conflict; call [`Suspended::resume`] with an alias.
    Conflict(Suspended<'a>),
    /// Every record has a unique path.
    Done(ResolvedPaths),
}

/// A resolution paused on a [`PathConflict`]
#[derive(Debug)]
pub struct Suspended<'a> {
    entry: &'a PassEntry,
    base_host: &'a str,
    machine: Machine<'a>,
}

impl<'a> Suspended<'a> {
    /// The conflict this resolution is paused on.
    pub fn conflict(&self) -> PathConflict<'_> {
        PathConflict {
            entry: self.entry,
            conflicting_path: self.base_host,
            retry: self.machine.retry.as_ref(),
        }
    }

    /// Resume with an alias for the conflicting record.
    ///
    /// The alias is trimmed first. An empty alias, or one whose candidate
    /// path `base/alias` is already taken, re-suspends at the same conflict
    /// with [`PathConflict::retry`] set. An accepted alias places the
    /// record and carries on to the next conflict or completion.
    pub fn resume(mut self, alias: &str) -> Result<Resolution<'a>, ResolveError> {
        let alias = alias.trim();
        if alias.is_empty() {
            self.machine.retry = Some(RetryReason::EmptyAlias);
            return Ok(Resolution::Conflict(self));
        }

        let candidate = format!("{}/{}", self.base_host, alias);
        if self.machine.resolved.contains(&candidate) {
            self.machine.retry = Some(RetryReason::PathTaken(candidate));
            return Ok(Resolution::Conflict(self));
        }

        self.machine.retry = None;
        self.machine.resolved.insert(candidate, self.entry.clone())?;
        self.machine.entry += 1;
        self.machine.advance()
    }
}

/// Assign a unique path to every record in `grouped`.
///
/// Per record, in group and record insertion order:
/// 1. sole record under its base host → path is the base host;
/// 2. single-URL record whose full host no group sibling shares →
///    `base/full`;
/// 3. otherwise suspend until [`Suspended::resume`] accepts an alias,
///    giving `base/alias`.
pub fn resolve(grouped: &GroupedEntries) -> Result<Resolution<'_>, ResolveError> {
    Machine {
        grouped,
        resolved: ResolvedPaths::default(),
        group: 0,
        entry: 0,
        retry: None,
    }
    .advance()
}

#[derive(Debug)]
struct Machine<'a> {
    grouped: &'a GroupedEntries,
    resolved: ResolvedPaths,
    group: usize,
    entry: usize,
    retry: Option<RetryReason>,
}

impl<'a> Machine<'a> {
    fn advance(mut self) -> Result<Resolution<'a>, ResolveError> {
        let grouped = self.grouped;
        while let Some((base_host, entries)) = grouped.group_at(self.group) {
            while let Some(record) = entries.get(self.entry) {
                if entries.len() == 1 {
                    self.resolved.insert(base_host.to_string(), record.clone())?;
                } else if let Some(full) = nested_host(entries, record)? {
                    self.resolved
                        .insert(format!("{}/{}", base_host, full), record.clone())?;
                } else {
                    return Ok(Resolution::Conflict(Suspended {
                        entry: record,
                        base_host,
                        machine: self,
                    }));
                }
                self.entry += 1;
            }
            self.group += 1;
            self.entry = 0;
        }
        Ok(Resolution::Done(self.resolved))
    }
}

/// The full host to nest `record` under, when it is safe to do so: the
/// record holds exactly one URL and no sibling's canonical URL shares its
/// full host.
fn nested_host(entries: &[PassEntry], record: &PassEntry) -> Result<Option<String>, HostError> {
    if record.urls.len() != 1 {
        return Ok(None);
    }
    let full = host::full_host(record.urls.first())?;
    if shared_full_host(entries, &full)? == 1 {
        Ok(Some(full))
    } else {
        Ok(None)
    }
}

/// How many records in `entries` have `full_host` as their canonical
/// URL's full host. Counts the record itself when called with its own.
pub(crate) fn shared_full_host(
    entries: &[PassEntry],
    full_host: &str,
) -> Result<usize, HostError> {
    let mut count = 0;
    for entry in entries {
        if host::full_host(entry.urls.first())? == full_host {
            count += 1;
        }
    }
    Ok(count)
}

/// The finished unique path → credential record mapping.
///
/// Keeps insertion order for serialization; JSON round-trips as an object
/// in document order, rejecting duplicate keys.
#[derive(Debug, Default)]
pub struct ResolvedPaths {
    entries: Vec<(String, PassEntry)>,
    index: HashMap<String, usize>,
}

impl ResolvedPaths {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&PassEntry> {
        self.index.get(path).map(|&at| &self.entries[at].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PassEntry)> {
        self.entries
            .iter()
            .map(|(path, entry)| (path.as_str(), entry))
    }

    fn insert(&mut self, path: String, entry: PassEntry) -> Result<(), ResolveError> {
        if self.index.contains_key(&path) {
            return Err(ResolveError::Collision { path });
        }
        self.index.insert(path.clone(), self.entries.len());
        self.entries.push((path, entry));
        Ok(())
    }
}

impl Serialize for ResolvedPaths {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (path, entry) in &self.entries {
            map.serialize_entry(path, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ResolvedPaths {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct PathsVisitor;

        impl<'de> Visitor<'de> for PathsVisitor {
            type Value = ResolvedPaths;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object mapping paths to credential records")
            }

            fn visit_map<A>(self, mut access: A) -> Result<ResolvedPaths, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut resolved = ResolvedPaths::default();
                while let Some((path, entry)) = access.next_entry::<String, PassEntry>()? {
                    resolved
                        .insert(path, entry)
                        .map_err(serde::de::Error::custom)?;
                }
                Ok(resolved)
            }
        }

        deserializer.deserialize_map(PathsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ingest::read_export;

    fn grouped(input: &str) -> GroupedEntries {
        read_export(input.as_bytes()).unwrap().0
    }

    fn logins(resolved: &ResolvedPaths) -> Vec<(String, String)> {
        resolved
            .iter()
            .map(|(path, entry)| (path.to_string(), entry.login.clone()))
            .collect()
    }

    #[test]
    fn test_singleton_groups_need_no_aliases() {
        let grouped = grouped(
            "name,url,username,password,note\n\
             A,https://www.google.com/,johnny,pw,\n\
             B,https://account.nvidia.com/,jenny,pw,\n",
        );

        let resolved = match resolve(&grouped).unwrap() {
            Resolution::Done(resolved) => resolved,
            Resolution::Conflict(_) => panic!("singleton groups must not conflict"),
        };

        assert_eq!(
            logins(&resolved),
            [
                ("google.com".to_string(), "johnny".to_string()),
                ("nvidia.com".to_string(), "jenny".to_string()),
            ]
        );
    }

    #[test]
    fn test_unique_subdomains_nest_without_aliases() {
        let grouped = grouped(
            "name,url,username,password,note\n\
             A,https://www.johnny-appleseed.com/,johnny,pw1,\n\
             B,https://blog.johnny-appleseed.com/,johnny,pw2,\n\
             C,https://shop.johnny-appleseed.com/,johnny,pw3,\n",
        );

        let resolved = match resolve(&grouped).unwrap() {
            Resolution::Done(resolved) => resolved,
            Resolution::Conflict(_) => panic!("distinct subdomains must not conflict"),
        };

        let paths: Vec<&str> = resolved.iter().map(|(path, _)| path).collect();
        assert_eq!(
            paths,
            [
                "johnny-appleseed.com/www.johnny-appleseed.com",
                "johnny-appleseed.com/blog.johnny-appleseed.com",
                "johnny-appleseed.com/shop.johnny-appleseed.com",
            ]
        );
    }

    #[test]
    fn test_shared_full_host_negotiates_aliases() {
        let grouped = grouped(
            "name,url,username,password,note\n\
             N1,http://localhost/admin,root,pw,c1\n\
             N2,http://localhost:3000/,admin,pw,c2\n\
             N3,http://localhost:3000/users,root,pw,c3\n",
        );

        let pending = match resolve(&grouped).unwrap() {
            Resolution::Conflict(pending) => pending,
            Resolution::Done(_) => panic!("shared full host must conflict"),
        };
        {
            let conflict = pending.conflict();
            assert_eq!(conflict.entry.login, "admin");
            assert_eq!(conflict.conflicting_path, "localhost:3000");
            assert!(conflict.retry.is_none());
        }

        let pending = match pending.resume("work").unwrap() {
            Resolution::Conflict(pending) => pending,
            Resolution::Done(_) => panic!("second record must conflict too"),
        };
        assert_eq!(pending.conflict().entry.login, "root");
        assert_eq!(pending.conflict().conflicting_path, "localhost:3000");

        let resolved = match pending.resume("personal").unwrap() {
            Resolution::Done(resolved) => resolved,
            Resolution::Conflict(_) => panic!("nothing left to conflict"),
        };

        assert_eq!(
            logins(&resolved),
            [
                ("localhost".to_string(), "root".to_string()),
                ("localhost:3000/work".to_string(), "admin".to_string()),
                ("localhost:3000/personal".to_string(), "root".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_alias_re_emits_the_same_conflict() {
        let grouped = grouped(
            "name,url,username,password,note\n\
             A,https://example.com/,johnny,pw1,\n\
             B,https://example.com/,jenny,pw2,\n",
        );

        let pending = match resolve(&grouped).unwrap() {
            Resolution::Conflict(pending) => pending,
            Resolution::Done(_) => panic!("expected a conflict"),
        };
        let first = pending.conflict().entry as *const PassEntry;

        let pending = match pending.resume("").unwrap() {
            Resolution::Conflict(pending) => pending,
            Resolution::Done(_) => panic!("empty alias must not advance"),
        };
        {
            let conflict = pending.conflict();
            assert!(std::ptr::eq(conflict.entry, first));
            assert_eq!(conflict.conflicting_path, "example.com");
            assert_eq!(conflict.retry, Some(&RetryReason::EmptyAlias));
        }

        let pending = match pending.resume("   ").unwrap() {
            Resolution::Conflict(pending) => pending,
            Resolution::Done(_) => panic!("whitespace alias must not advance"),
        };
        assert!(std::ptr::eq(pending.conflict().entry, first));

        match pending.resume("personal").unwrap() {
            Resolution::Conflict(pending) => {
                assert!(!std::ptr::eq(pending.conflict().entry, first));
                assert!(pending.conflict().retry.is_none());
            }
            Resolution::Done(_) => panic!("the second record still needs an alias"),
        }
    }

    #[test]
    fn test_taken_path_re_emits_with_the_candidate() {
        let grouped = grouped(
            "name,url,username,password,note\n\
             A,https://example.com/,johnny,pw1,\n\
             B,https://example.com/,jenny,pw2,\n",
        );

        let pending = match resolve(&grouped).unwrap() {
            Resolution::Conflict(pending) => pending,
            Resolution::Done(_) => panic!("expected a conflict"),
        };
        let pending = match pending.resume("personal").unwrap() {
            Resolution::Conflict(pending) => pending,
            Resolution::Done(_) => panic!("expected a second conflict"),
        };
        let second = pending.conflict().entry as *const PassEntry;

        let pending = match pending.resume("personal").unwrap() {
            Resolution::Conflict(pending) => pending,
            Resolution::Done(_) => panic!("a taken path must not advance"),
        };
        {
            let conflict = pending.conflict();
            assert!(std::ptr::eq(conflict.entry, second));
            assert_eq!(
                conflict.retry,
                Some(&RetryReason::PathTaken("example.com/personal".to_string()))
            );
        }

        let resolved = match pending.resume("work").unwrap() {
            Resolution::Done(resolved) => resolved,
            Resolution::Conflict(_) => panic!("nothing left to conflict"),
        };
        assert!(resolved.contains("example.com/personal"));
        assert!(resolved.contains("example.com/work"));
    }

    #[test]
    fn test_multi_url_record_cannot_nest() {
        // johnny's record spans two subdomains, so it may not claim either
        let grouped = grouped(
            "name,url,username,password,note\n\
             A,https://a.example.com/,johnny,pw,\n\
             B,https://b.example.com/,johnny,pw,\n\
             C,https://c.example.com/,jenny,pw2,\n",
        );

        match resolve(&grouped).unwrap() {
            Resolution::Conflict(pending) => {
                assert_eq!(pending.conflict().entry.login, "johnny");
            }
            Resolution::Done(_) => panic!("multi-URL record must conflict"),
        }
    }

    #[test]
    fn test_every_record_lands_exactly_once() {
        let grouped = grouped(
            "name,url,username,password,note\n\
             A,https://www.google.com/,personal@gmail.com,pw1,\n\
             B,https://www.google.com/,work@gmail.com,pw2,\n\
             C,https://account.nvidia.com/,MyUsername,pw3,\n\
             D,http://localhost/admin,root,pw4,\n\
             E,https://www.johnny-appleseed.com/,johnny,pw5,\n\
             F,https://blog.johnny-appleseed.com/,johnny,pw6,\n",
        );
        let total = grouped.total_entries();

        let mut step = resolve(&grouped).unwrap();
        let mut next_alias = 0;
        let resolved = loop {
            match step {
                Resolution::Done(resolved) => break resolved,
                Resolution::Conflict(pending) => {
                    next_alias += 1;
                    step = pending.resume(&format!("alias{}", next_alias)).unwrap();
                }
            }
        };

        assert_eq!(resolved.len(), total);
    }

    #[test]
    fn test_alias_colliding_with_nested_path_is_fatal() {
        // bob spans two subdomains and negotiates; alice would nest at
        // x.com/a.x.com, which the alias below takes first
        let grouped = grouped(
            "name,url,username,password,note\n\
             A,https://b.x.com/,bob,pw,\n\
             A,https://c.x.com/,bob,pw,\n\
             B,https://a.x.com/,alice,pw2,\n",
        );

        let pending = match resolve(&grouped).unwrap() {
            Resolution::Conflict(pending) => pending,
            Resolution::Done(_) => panic!("expected a conflict"),
        };
        assert_eq!(pending.conflict().entry.login, "bob");

        let err = pending.resume("a.x.com").unwrap_err();
        match err {
            ResolveError::Collision { path } => assert_eq!(path, "x.com/a.x.com"),
            other => panic!("expected a collision, got {other:?}"),
        }
    }

    #[test]
    fn test_resolved_paths_serialize_in_insertion_order() {
        let grouped = grouped(
            "name,url,username,password,note\n\
             A,https://zzz.example/,johnny,pw,\n\
             B,https://aaa.example/,jenny,pw,\n",
        );
        let resolved = match resolve(&grouped).unwrap() {
            Resolution::Done(resolved) => resolved,
            Resolution::Conflict(_) => panic!("no conflicts in this fixture"),
        };

        let json = serde_json::to_string(&resolved).unwrap();
        let zzz = json.find("\"zzz.example\"").unwrap();
        let aaa = json.find("\"aaa.example\"").unwrap();
        assert!(zzz < aaa, "insertion order must survive serialization");
    }

    #[test]
    fn test_resolved_paths_deserialize_in_document_order() {
        let json = r#"{
            "second.example": {"password": "b", "login": "b", "urls": ["https://second.example/"]},
            "first.example": {"password": "a", "login": "a", "urls": ["https://first.example/"]}
        }"#;

        let resolved: ResolvedPaths = serde_json::from_str(json).unwrap();
        let order: Vec<&str> = resolved.iter().map(|(path, _)| path).collect();
        assert_eq!(order, ["second.example", "first.example"]);
    }

    #[test]
    fn test_resolved_paths_reject_duplicate_keys() {
        let json = r#"{
            "example.com": {"password": "a", "login": "a", "urls": ["https://example.com/"]},
            "example.com": {"password": "b", "login": "b", "urls": ["https://example.com/"]}
        }"#;

        let err = serde_json::from_str::<ResolvedPaths>(json).unwrap_err();
        assert!(err.to_string().contains("assigned twice"));
    }
}
