pub mod events;
pub mod log;
pub mod members;
pub mod migrate;
pub mod pool;
pub mod shifts;
pub mod sites;
pub mod stats;

pub use pool::{DbPool, lock_pool};
