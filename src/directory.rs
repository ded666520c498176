//! User directory collaborator.
//!
//! Invitees may be referenced by id or email from a separate identity
//! system; the directory resolves those references before they are stored
//! on an event. The host application supplies its own implementation,
//! [`StaticDirectory`] serves embedded use and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A user known to the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DirectoryUser {
    pub user_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl DirectoryUser {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Trait for resolving invitee references to known users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve identifiers (user ids or emails) to directory users.
    ///
    /// Unknown identifiers are omitted from the result; the caller decides
    /// how to treat them.
    async fn resolve(&self, identifiers: &[String]) -> Result<Vec<DirectoryUser>>;
}

/// Fixed in-memory directory.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    by_id: HashMap<String, DirectoryUser>,
    by_email: HashMap<String, DirectoryUser>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user, indexed by id and lowercased email.
    pub fn with_user(mut self, user: DirectoryUser) -> Self {
        self.by_email.insert(user.email.to_lowercase(), user.clone());
        self.by_id.insert(user.user_id.clone(), user);
        self
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn resolve(&self, identifiers: &[String]) -> Result<Vec<DirectoryUser>> {
        let users = identifiers
            .iter()
            .filter_map(|identifier| {
                self.by_id
                    .get(identifier)
                    .or_else(|| self.by_email.get(&identifier.to_lowercase()))
                    .cloned()
            })
            .collect();
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolves_by_id_and_email() {
        let directory = StaticDirectory::new()
            .with_user(DirectoryUser::new("user-1", "ana@example.com"))
            .with_user(DirectoryUser::new("user-2", "bo@example.com"));

        let users = directory
            .resolve(&["user-1".into(), "BO@example.com".into()])
            .await
            .unwrap();

        let ids: Vec<_> = users.iter().map(|u| u.user_id.as_str()).collect();
        assert_eq!(ids, vec!["user-1", "user-2"]);
    }

    #[tokio::test]
    async fn test_unknown_identifiers_are_omitted() {
        let directory =
            StaticDirectory::new().with_user(DirectoryUser::new("user-1", "ana@example.com"));

        let users = directory
            .resolve(&["nobody@example.com".into(), "user-1".into()])
            .await
            .unwrap();
        assert_eq!(users.len(), 1);
    }
}
