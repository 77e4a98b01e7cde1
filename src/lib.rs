pub mod config;
pub mod doclist;
pub mod error;
pub mod pending;
pub mod varint;

pub use config::AccumulatorConfig;
pub use doclist::{DoclistIter, PoslistIter};
pub use error::{PendexError, Result};
pub use pending::{DoclistSink, PendingTerms};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
