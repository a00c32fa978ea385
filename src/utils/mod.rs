pub mod error;
pub mod fingerprint;

pub use fingerprint::content_fingerprint;
