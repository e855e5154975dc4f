//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// One document per registered email (keyed by its hash)
    pub const USER_EMAILS: &str = "user_emails";
    /// Refresh token records (keyed by token id)
    pub const REFRESH_TOKENS: &str = "refresh_tokens";
    pub const REPORTS: &str = "reports";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const AUDIT_LOGS: &str = "audit_logs";
}
