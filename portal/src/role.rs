//! Portal user roles

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Unknown role: {0:?}")]
    UnknownRole(String),
}

/// Role of the user owning the session
///
/// Serialized in the upper-case form used by the backend and the persisted storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Employer,
    Jobseeker,
    Trainer,
    Admin,
    Guest,
}

impl Role {
    /// Every role, in display order
    pub const ALL: [Role; 5] = [
        Role::Employer,
        Role::Jobseeker,
        Role::Trainer,
        Role::Admin,
        Role::Guest,
    ];

    /// Roles a user may pick for themselves, either when registering or on the role selection
    /// page. Administrators are only ever assigned by the backend.
    pub const SELECTABLE: [Role; 4] = [Role::Employer, Role::Jobseeker, Role::Trainer, Role::Guest];

    /// Storage and wire representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Employer => "EMPLOYER",
            Self::Jobseeker => "JOBSEEKER",
            Self::Trainer => "TRAINER",
            Self::Admin => "ADMIN",
            Self::Guest => "GUEST",
        }
    }

    /// Path of the dashboard this role is allowed to see
    pub fn dashboard_path(self) -> &'static str {
        match self {
            Self::Employer => "/dashboard/employer",
            Self::Jobseeker => "/dashboard/jobseeker",
            Self::Trainer => "/dashboard/trainer",
            Self::Admin => "/dashboard/admin",
            Self::Guest => "/dashboard/guest",
        }
    }

    /// Human readable name
    pub fn label(self) -> &'static str {
        match self {
            Self::Employer => "Employer",
            Self::Jobseeker => "Jobseeker",
            Self::Trainer => "Trainer",
            Self::Admin => "Admin",
            Self::Guest => "Guest",
        }
    }

    /// Accent colour used when presenting role specific forms
    pub fn color(self) -> &'static str {
        match self {
            Self::Employer => "#FF6B6B",
            Self::Trainer => "#4CAF50",
            Self::Jobseeker | Self::Admin | Self::Guest => "#2196F3",
        }
    }

    /// Whether the user may assign this role to themselves
    pub fn is_selectable(self) -> bool {
        Self::SELECTABLE.contains(&self)
    }

    /// Finds the role owning a dashboard segment (`/dashboard/{segment}`)
    pub(crate) fn from_dashboard_segment(segment: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.dashboard_path().rsplit('/').next() == Some(segment))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| Error::UnknownRole(s.to_owned()))
    }
}
