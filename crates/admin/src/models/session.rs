//! Session-stored admin identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The studio admin, present in the session after a successful login.
///
/// The console has a single password, so there is no per-user identity
/// beyond when the session started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    pub signed_in_at: DateTime<Utc>,
}

impl CurrentAdmin {
    #[must_use]
    pub fn now() -> Self {
        Self {
            signed_in_at: Utc::now(),
        }
    }
}

/// Session keys for admin data.
pub mod keys {
    /// Key for the logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
