pub mod crawl;
pub mod error;
pub mod nonce;
pub mod policy;
pub mod report;

pub use error::PolicyError;
pub use nonce::{FixedNonce, NonceSource, RandomNonce};
pub use policy::{DirectiveBuckets, Policy, assemble};
pub use report::{GeneratedPolicy, PolicyFormat};
