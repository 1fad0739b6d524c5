pub mod credential;
pub mod plan;
pub mod transaction;

// Re-export common types
pub use credential::{AllocationRow, Credentials, SoldLogin};
pub use plan::Plan;
pub use transaction::Transaction;
