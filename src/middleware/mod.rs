// SPDX-License-Identifier: MIT

//! Middleware modules (authentication, security, etc.).

pub mod admin_auth;
pub mod security;

pub use admin_auth::require_admin;
