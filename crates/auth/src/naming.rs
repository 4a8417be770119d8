//! Well-known names shared with other services.

/// Privilege name marking the highest-trust administrator.
pub const SUPER_ADMIN: &str = "SUPER_ADMIN";

/// Privilege name required for user administration.
pub const ADMIN: &str = "ADMIN";

/// Subject prefix of long-term tokens (`LONG_TERM_TOKEN|<subject>`).
pub const LONG_TERM_TOKEN_PREFIX: &str = "LONG_TERM_TOKEN";

/// Subject prefix of application tokens (`PSAMA_APPLICATION|<application id>`).
pub const APPLICATION_TOKEN_PREFIX: &str = "PSAMA_APPLICATION";

/// Separator between a subject prefix and the subject itself.
pub const SUBJECT_SEPARATOR: char = '|';

/// Subject prefix given to users created from a FENCE profile.
pub const FENCE_SUBJECT_PREFIX: &str = "fence";
