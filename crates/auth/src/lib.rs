//! `datagate-auth`: token lifecycle and authorization decisions.
//!
//! This crate is decoupled from HTTP and from any concrete storage: it talks
//! to the entity store through the ports in [`store`].

pub mod account;
pub mod admin;
pub mod application;
pub mod authenticate;
pub mod claims;
pub mod codec;
pub mod config;
pub mod escalation;
pub mod introspect;
pub mod long_term;
pub mod naming;
pub mod policy;
pub mod principal;
pub mod privilege;
pub mod resolver;
pub mod roles;
pub mod store;
pub mod template;
pub mod user;

pub use account::{AccountService, RefreshedToken, UserProfile};
pub use admin::{RoleRef, UserAdministration, UserDraft};
pub use application::Application;
pub use authenticate::Authenticator;
pub use claims::{TokenClaims, TokenKind, TokenSubject, TokenValidationError, validate_claims};
pub use codec::TokenCodec;
pub use config::AuthConfig;
pub use escalation::{can_apply_role_change, check_batch, holds_super_admin};
pub use introspect::{Introspection, IntrospectionRequest, TokenIntrospector};
pub use long_term::LongTermTokenManager;
pub use policy::{AuthorizationPolicy, PermitAll};
pub use principal::{Principal, PrincipalKind};
pub use privilege::{Privilege, PrivilegeSet};
pub use roles::Role;
pub use store::{ApplicationStore, EntityStore, RoleStore, StoreError, UserStore};
pub use user::User;

pub use datagate_core::{AuthError, AuthResult};
