//! Service layer shared by clients.

mod sync;

pub use sync::{SyncService, UserDataSignals};
