//! Filesystem observer for the trade latency monitor.
//!
//! Watches the node's data directory and records, exactly once, the first
//! create/modify event whose file content contains the target identifier.
//!
//! ```ignore
//! let observer = FileSystemObserver::new(ObserverConfig::new("/home/hluser/hl/data"));
//! let handle = observer.start(target).await?;
//! // ... send the order, then poll `handle.matched()` ...
//! handle.shutdown().await;
//! ```

pub mod error;
pub mod observer;

pub use error::{WatchError, WatchResult};
pub use observer::{
    ChangeKind, FileSystemObserver, ObserverConfig, ObserverState, WatchHandle,
    DEFAULT_SCAN_INTERVAL,
};
