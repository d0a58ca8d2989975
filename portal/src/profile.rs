//! Display data of the logged in user
//!
//! Kept next to the session in the same storage, but never consulted for routing.

use serde::{Deserialize, Serialize};

use crate::storage::{self, LocalStorage};

/// Storage key of the user email
pub const EMAIL_KEY: &str = "email";
/// Storage key of the user display name
pub const USER_NAME_KEY: &str = "userName";

/// User details returned by the backend on login
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub email: Option<String>,
    pub user_name: Option<String>,
}

impl Profile {
    /// Name to greet the user with
    pub fn display_name(&self) -> &str {
        self.user_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("User")
    }
}

/// Access to the profile keys of a context storage
#[derive(Debug, Clone)]
pub struct ProfileStore {
    storage: LocalStorage,
}

impl ProfileStore {
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    /// Reads the stored profile
    pub fn load(&self) -> Result<Profile, storage::Error> {
        Ok(Profile {
            email: self.storage.get(EMAIL_KEY)?,
            user_name: self.storage.get(USER_NAME_KEY)?,
        })
    }

    /// Replaces the stored profile; absent fields are removed
    pub fn save(&self, profile: &Profile) -> Result<(), storage::Error> {
        for (key, value) in [(EMAIL_KEY, &profile.email), (USER_NAME_KEY, &profile.user_name)] {
            match value {
                Some(value) => self.storage.set(key, value)?,
                None => self.storage.remove(key)?,
            }
        }
        Ok(())
    }

    /// Removes the stored profile
    pub fn clear(&self) -> Result<(), storage::Error> {
        self.save(&Profile::default())
    }
}
