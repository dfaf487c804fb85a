//! Verification helpers for testing bootsync managers
//!
//! Provides assertion helpers over executed commands and over the
//! `dhcp_tags` section of a render context.

use serde_json::Value;
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug, PartialEq)]
pub enum VerificationError {
    #[error("Expected a command containing '{pattern}', ran: {ran:?}")]
    CommandNotRun { pattern: String, ran: Vec<String> },

    #[error("Command containing '{pattern}' ran but should not have: {command}")]
    UnexpectedCommand { pattern: String, command: String },

    #[error("Expected '{first}' to run before '{second}'")]
    CommandOrder { first: String, second: String },

    #[error("Expected {expected} commands, found {actual}")]
    CommandCountMismatch { expected: usize, actual: usize },

    #[error("Render context has no '{key}' section")]
    MissingSection { key: String },

    #[error("Expected scope '{tag}' not found")]
    ScopeNotFound { tag: String },

    #[error("Expected entry '{mac}' not found in scope '{tag}'")]
    EntryNotFound { tag: String, mac: String },

    #[error("Entry '{mac}' found in scope '{tag}' but should be absent")]
    UnexpectedEntry { tag: String, mac: String },

    #[error("Value mismatch for {tag}/{mac}:{field}: expected {expected}, got {actual}")]
    ValueMismatch {
        tag: String,
        mac: String,
        field: String,
        expected: Value,
        actual: Value,
    },

    #[error("Expected {expected} entries in scope '{tag}', found {actual}")]
    EntryCountMismatch {
        tag: String,
        expected: usize,
        actual: usize,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Verifier over the commands a runner recorded
pub struct CommandVerifier<'a> {
    commands: &'a [String],
}

impl<'a> CommandVerifier<'a> {
    pub fn new(commands: &'a [String]) -> Self {
        Self { commands }
    }

    fn position(&self, pattern: &str) -> Option<usize> {
        self.commands.iter().position(|c| c.contains(pattern))
    }

    /// Verify that some command contained `pattern`
    pub fn assert_ran(&self, pattern: &str) -> VerifyResult<()> {
        match self.position(pattern) {
            Some(_) => Ok(()),
            None => Err(VerificationError::CommandNotRun {
                pattern: pattern.to_string(),
                ran: self.commands.to_vec(),
            }),
        }
    }

    /// Verify that no command contained `pattern`
    pub fn assert_not_ran(&self, pattern: &str) -> VerifyResult<()> {
        match self.position(pattern) {
            None => Ok(()),
            Some(i) => Err(VerificationError::UnexpectedCommand {
                pattern: pattern.to_string(),
                command: self.commands[i].clone(),
            }),
        }
    }

    /// Verify that the first match of `first` ran before the first match of `second`
    pub fn assert_order(&self, first: &str, second: &str) -> VerifyResult<()> {
        self.assert_ran(first)?;
        self.assert_ran(second)?;
        match (self.position(first), self.position(second)) {
            (Some(a), Some(b)) if a < b => Ok(()),
            _ => Err(VerificationError::CommandOrder {
                first: first.to_string(),
                second: second.to_string(),
            }),
        }
    }

    pub fn assert_count(&self, expected: usize) -> VerifyResult<()> {
        if self.commands.len() != expected {
            return Err(VerificationError::CommandCountMismatch {
                expected,
                actual: self.commands.len(),
            });
        }
        Ok(())
    }
}

/// Verifier over the `dhcp_tags` section of a render context
pub struct ScopeVerifier<'a> {
    tags: &'a serde_json::Map<String, Value>,
}

impl<'a> ScopeVerifier<'a> {
    /// Wraps `context["dhcp_tags"]`
    pub fn new(context: &'a Value) -> VerifyResult<Self> {
        context
            .get("dhcp_tags")
            .and_then(Value::as_object)
            .map(|tags| Self { tags })
            .ok_or_else(|| VerificationError::MissingSection {
                key: "dhcp_tags".to_string(),
            })
    }

    /// Tags present, sorted
    pub fn tags(&self) -> Vec<&str> {
        self.tags.keys().map(String::as_str).collect()
    }

    fn scope(&self, tag: &str) -> VerifyResult<&'a serde_json::Map<String, Value>> {
        self.tags
            .get(tag)
            .and_then(Value::as_object)
            .ok_or_else(|| VerificationError::ScopeNotFound {
                tag: tag.to_string(),
            })
    }

    /// Verify that `mac` has an entry in `tag` and return it
    pub fn assert_entry(&self, tag: &str, mac: &str) -> VerifyResult<&'a Value> {
        self.scope(tag)?
            .get(mac)
            .ok_or_else(|| VerificationError::EntryNotFound {
                tag: tag.to_string(),
                mac: mac.to_string(),
            })
    }

    /// Verify that `mac` has no entry in any scope
    pub fn assert_absent(&self, mac: &str) -> VerifyResult<()> {
        for (tag, scope) in self.tags {
            if scope.get(mac).is_some() {
                return Err(VerificationError::UnexpectedEntry {
                    tag: tag.clone(),
                    mac: mac.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Verify that an entry field has a specific value; a missing field reads as null
    pub fn assert_field(
        &self,
        tag: &str,
        mac: &str,
        field: &str,
        expected: impl Into<Value>,
    ) -> VerifyResult<()> {
        let expected = expected.into();
        let actual = self
            .assert_entry(tag, mac)?
            .get(field)
            .cloned()
            .unwrap_or(Value::Null);
        if actual != expected {
            return Err(VerificationError::ValueMismatch {
                tag: tag.to_string(),
                mac: mac.to_string(),
                field: field.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    pub fn assert_scope_size(&self, tag: &str, expected: usize) -> VerifyResult<()> {
        let actual = self.scope(tag)?.len();
        if actual != expected {
            return Err(VerificationError::EntryCountMismatch {
                tag: tag.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}
