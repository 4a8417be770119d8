//! `datagate-core`: shared building blocks for the access-control service.
//!
//! This crate contains identifiers, the error taxonomy and concurrency
//! primitives only (no storage or transport concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod version;

pub use entity::Entity;
pub use error::{AuthError, AuthResult, CONTACT_ADMIN};
pub use id::{ApplicationId, PrivilegeId, RoleId, UserId};
pub use version::{ExpectedVersion, Versioned};
