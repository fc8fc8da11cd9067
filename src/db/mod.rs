// SPDX-License-Identifier: MIT

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    /// Settings documents (single credential record)
    pub const SETTINGS: &str = "settings";
    /// Content items mirrored from the CMS
    pub const POSTS: &str = "posts";
}

/// Document ID of the credential record in the settings collection.
pub const CREDENTIALS_DOC_ID: &str = "google_analytics";
