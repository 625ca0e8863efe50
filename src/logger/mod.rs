//! Bootstrap logging before settings are parsed, then reload the filter
//! from configuration once it is available.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
