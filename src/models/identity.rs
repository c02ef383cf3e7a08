use serde::{Deserialize, Serialize};

/// Commit author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// libgit2 rejects signatures with an empty name, so fall back to the email.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.email.trim()
        } else {
            self.name.trim()
        }
    }

    pub fn has_email(&self) -> bool {
        !self.email.trim().is_empty()
    }
}
