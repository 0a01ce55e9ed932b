//! Repository contract and its Postgres / in-memory implementations.

pub mod memory;
pub mod postgres;
pub mod repository;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;
pub use repository::{synthesized_good_name, Repository};
