//! Fixed user directory.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::DirectoryError;
use crate::traits::UserDirectory;

/// A directory backed by a fixed list of user ids.
#[derive(Debug, Clone, Default)]
pub struct StaticUserDirectory {
    users: Vec<String>,
}

impl StaticUserDirectory {
    /// Create a directory from any list of ids. Duplicates are dropped,
    /// first occurrence wins.
    pub fn new<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let users = users
            .into_iter()
            .map(Into::into)
            .filter(|user: &String| seen.insert(user.clone()))
            .collect();
        Self { users }
    }

    /// Number of users in the directory.
    #[inline]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the directory is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn all_user_ids(&self) -> Result<Vec<String>, DirectoryError> {
        Ok(self.users.clone())
    }
}
