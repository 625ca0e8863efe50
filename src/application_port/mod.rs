mod audit;
mod credentials;
mod rotation;
mod token_codec;

pub use audit::*;
pub use credentials::*;
pub use rotation::*;
pub use token_codec::*;
