//! Pass command abstraction layer
//!
//! Wraps the external password-store binary. Paths and bodies travel as
//! plain arguments and piped stdin, never through a shell, so hostile
//! text in a URL or note cannot inject commands. Paths are additionally
//! separated from options with `--`.

use std::io::Write;
use std::process::{Command, Stdio};
use thiserror::Error;

use crate::core::entry::PassEntry;

/// Password-store operations abstraction
pub struct PassStore {
    program: String,
}

/// Result of a pass command execution
#[derive(Debug)]
pub struct PassOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

/// Errors that can occur while talking to the password store
#[derive(Debug, Error)]
pub enum PassError {
    #[error("'{program}' not installed or not in PATH")]
    NotFound { program: String },

    #[error("{action} failed: {message}")]
    CommandFailed {
        action: &'static str,
        message: String,
    },

    #[error("record for '{path}' has an empty {field}")]
    MissingField { path: String, field: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PassStore {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Execute a pass command, feeding `input` on stdin when given.
    fn run(&self, args: &[&str], input: Option<&str>) -> Result<PassOutput, PassError> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PassError::NotFound {
                        program: self.program.clone(),
                    }
                } else {
                    PassError::Io(e)
                }
            })?;

        if let Some(input) = input {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes())?;
            }
        }

        let output = child.wait_with_output()?;
        Ok(PassOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            code: output.status.code(),
        })
    }

    /// Short hash of the store's git HEAD, when the store is git-backed.
    /// Shown before inserting so a botched import can be reverted.
    pub fn head_commit(&self) -> Result<Option<String>, PassError> {
        let output = self.run(&["git", "rev-parse", "--short", "HEAD"], None)?;
        if output.success && !output.stdout.is_empty() {
            Ok(Some(output.stdout))
        } else {
            Ok(None)
        }
    }

    /// Store one credential under `path` via `insert --multiline`.
    pub fn insert(&self, path: &str, entry: &PassEntry, force: bool) -> Result<(), PassError> {
        let body = format_entry_body(path, entry)?;
        let mut args = vec!["insert", "--multiline"];
        if force {
            args.push("--force");
        }
        args.push("--");
        args.push(path);

        let output = self.run(&args, Some(&body))?;
        if output.success {
            Ok(())
        } else {
            Err(PassError::CommandFailed {
                action: "insert",
                message: failure_message(output),
            })
        }
    }
}

fn failure_message(output: PassOutput) -> String {
    if !output.stderr.is_empty() {
        output.stderr
    } else if !output.stdout.is_empty() {
        output.stdout
    } else {
        match output.code {
            Some(code) => format!("exited with code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Serialize a credential as a pass secret body: the password on the
/// first line, then one `key: value` line per present field and one
/// `url:` line per URL.
pub fn format_entry_body(path: &str, entry: &PassEntry) -> Result<String, PassError> {
    if entry.password.is_empty() {
        return Err(PassError::MissingField {
            path: path.to_string(),
            field: "password",
        });
    }
    if entry.login.is_empty() {
        return Err(PassError::MissingField {
            path: path.to_string(),
            field: "login",
        });
    }

    let mut lines = vec![entry.password.clone(), format!("login: {}", entry.login)];
    if let Some(username) = &entry.username {
        lines.push(format!("username: {}", username));
    }
    if let Some(email) = &entry.email {
        lines.push(format!("email: {}", email));
    }
    for url in entry.urls.iter() {
        lines.push(format!("url: {}", url));
    }
    if let Some(comments) = &entry.comments {
        lines.push(format!("comments: {}", comments));
    }
    Ok(lines.join("\n") + "\n")
}
