//! User domain type.
//!
//! A user's lifecycle (creation, profile updates) is owned elsewhere; this
//! crate only resolves users per request. The tier distinguishes general
//! admins from super admins but confers no permissions by itself —
//! permissions come exclusively from role bindings.

use chrono::{DateTime, Utc};
use clamor_core::UserId;
use serde::{Deserialize, Serialize};

/// The user's tier within the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserTier {
    /// Standard dashboard user.
    General,
    /// Super admin with platform oversight.
    Super,
}

impl UserTier {
    /// Returns true for super admins.
    #[must_use]
    pub fn is_super(&self) -> bool {
        matches!(self, Self::Super)
    }
}

/// An authenticated user of the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal platform user ID; carried as the token subject.
    id: UserId,
    /// The user's email address.
    email: String,
    /// Display name, if the user has set one.
    display_name: Option<String>,
    /// Dashboard tier.
    tier: UserTier,
    /// When the user record was created.
    created_at: DateTime<Utc>,
    /// When the user record was last updated.
    updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user with a generated ID.
    #[must_use]
    pub fn new(email: String, tier: UserTier) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            email,
            display_name: None,
            tier,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a user with all fields specified.
    ///
    /// Use this when reconstituting a user from storage.
    #[must_use]
    pub fn with_all_fields(
        id: UserId,
        email: String,
        display_name: Option<String>,
        tier: UserTier,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            display_name,
            tier,
            created_at,
            updated_at,
        }
    }

    /// Returns the user's internal platform ID.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the user's email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the user's display name, if set.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Returns the user's tier.
    #[must_use]
    pub fn tier(&self) -> UserTier {
        self.tier
    }

    /// Returns when the user was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the user was last updated.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Sets the user's display name.
    pub fn set_display_name(&mut self, display_name: Option<String>) {
        self.display_name = display_name;
        self.updated_at = Utc::now();
    }
}
