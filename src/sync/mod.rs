pub mod job;
pub mod mirror;
pub mod walker;

pub use job::{RunOutcome, SyncJob};
pub use mirror::Mirror;
