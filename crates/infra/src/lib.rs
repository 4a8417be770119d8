//! Infrastructure layer: storage adapters for the authorization core.

pub mod seed;
pub mod store;


pub use seed::{Seed, SeedError, SeedSummary};
pub use store::InMemoryEntityStore;
