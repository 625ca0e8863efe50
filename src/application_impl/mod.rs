mod audit_sink_tracing;
mod credential_verifier_fake;
mod revocation_gate;
mod rotation_engine;
mod token_codec_impl;
mod token_signer_impl;

pub use audit_sink_tracing::*;
pub use credential_verifier_fake::*;
pub use revocation_gate::*;
pub use rotation_engine::*;
pub use token_codec_impl::*;
pub use token_signer_impl::*;
