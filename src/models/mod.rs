// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod analytics;
pub mod credentials;
pub mod post;

pub use analytics::{AccountEntry, AccountTree, PageStat, PropertyEntry};
pub use credentials::CredentialRecord;
pub use post::Post;
