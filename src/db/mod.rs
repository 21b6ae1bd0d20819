//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Password reset tokens (auto-generated document IDs)
    pub const PASSWORD_RESETS: &str = "password_resets";
}
