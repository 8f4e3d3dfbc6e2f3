//! Credential records and their URL sets

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One credential as it will be stored: a secret plus the identity and
/// location data needed to find it again.
///
/// `login` always carries the most recently seen value from the source
/// rows. `username` and `email` record how that login was classified; a
/// record that absorbed both a plain username row and an email row keeps
/// both, with `login` reflecting the email (see [`PassEntry::merge`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassEntry {
    pub password: String,
    pub login: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub urls: UrlSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

impl PassEntry {
    /// Build a record from one export row. An empty note is dropped.
    pub fn from_row(login: &str, password: &str, url: &str, note: &str) -> Self {
        let (username, email) = if is_email_shaped(login) {
            (None, Some(login.to_string()))
        } else {
            (Some(login.to_string()), None)
        };

        PassEntry {
            password: password.to_string(),
            login: login.to_string(),
            username,
            email,
            urls: UrlSet::new(url),
            comments: (!note.is_empty()).then(|| note.to_string()),
        }
    }

    /// Whether a later row refers to this record: the row's login matches
    /// the stored username or email, and the passwords are equal.
    pub fn matches(&self, login: &str, password: &str) -> bool {
        (self.username.as_deref() == Some(login) || self.email.as_deref() == Some(login))
            && self.password == password
    }

    /// Fold a matching row into this record.
    ///
    /// The row's URL joins the set. An email-shaped login overwrites both
    /// `login` and `email` (email wins over a previously stored username);
    /// a plain login only updates `username`.
    pub fn merge(&mut self, login: &str, url: &str) {
        self.urls.insert(url);
        if is_email_shaped(login) {
            self.login = login.to_string();
            self.email = Some(login.to_string());
        } else {
            self.username = Some(login.to_string());
        }
    }
}

fn is_email_shaped(login: &str) -> bool {
    login.contains('@')
}

/// An insertion-ordered set of URL strings with at least one member.
///
/// The first-inserted URL is the canonical one used for host derivation.
/// Equality ignores order; serialization keeps it.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "Vec<String>")]
pub struct UrlSet {
    urls: Vec<String>,
}

/// Rejected construction of a [`UrlSet`] with no members
#[derive(Debug, Error)]
#[error("a credential record needs at least one URL")]
pub struct EmptyUrlSet;

impl UrlSet {
    pub fn new(first: impl Into<String>) -> Self {
        UrlSet {
            urls: vec![first.into()],
        }
    }

    /// Add a URL, keeping insertion order. Returns false for duplicates.
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.urls.contains(&url) {
            return false;
        }
        self.urls.push(url);
        true
    }

    /// The canonical (first-inserted) URL.
    pub fn first(&self) -> &str {
        &self.urls[0]
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.iter().any(|u| u == url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Always false; the set cannot be constructed empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }
}

impl PartialEq for UrlSet {
    fn eq(&self, other: &Self) -> bool {
        self.urls.len() == other.urls.len() && self.urls.iter().all(|u| other.contains(u))
    }
}

impl Serialize for UrlSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(&self.urls)
    }
}

impl TryFrom<Vec<String>> for UrlSet {
    type Error = EmptyUrlSet;

    fn try_from(urls: Vec<String>) -> Result<Self, EmptyUrlSet> {
        let mut iter = urls.into_iter();
        let mut set = UrlSet {
            urls: vec![iter.next().ok_or(EmptyUrlSet)?],
        };
        for url in iter {
            set.insert(url);
        }
        Ok(set)
    }
}
