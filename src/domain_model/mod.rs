mod ids;
mod session;

pub use ids::*;
pub use session::*;
