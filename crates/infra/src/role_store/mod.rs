//! Role store client implementations.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryRoleStore;
pub use postgres::PostgresRoleStore;
