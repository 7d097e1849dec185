pub mod client;
pub mod mapping;
pub mod sync;
pub mod types;
pub mod webhook;

pub use client::{DirectorySource, ScimClient};
pub use sync::{last_sync_status, perform_full_sync, SyncOptions};
