pub mod config;
pub mod context;
pub mod downloads;
pub mod error;
pub mod io;
pub mod locator;
pub mod ops;
pub mod paths;
pub mod remote;
pub mod scanner;
pub mod state;
pub mod store;
pub mod sync;

pub mod reporter;

pub use config::Config;
pub use context::AppContext;
pub use downloads::{Aggregate, DownloadManager, DownloadTask};
pub use error::{ModError, ModResult};
pub use paths::*;
pub use reporter::{NullReporter, Reporter};
pub use state::ModState;

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("modlayer/", env!("CARGO_PKG_VERSION"));
