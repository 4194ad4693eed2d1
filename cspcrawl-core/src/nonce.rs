// Per-run script nonces

use crate::error::{PolicyError, Result};

pub const NONCE_BYTES: usize = 16;

/// Produces the nonce embedded in `script-src`.
pub trait NonceSource {
    fn generate(&self) -> String;
}

/// 16 bytes from the thread-local CSPRNG, hex-encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNonce;

impl NonceSource for RandomNonce {
    fn generate(&self) -> String {
        let bytes: [u8; NONCE_BYTES] = rand::random();
        hex::encode(bytes)
    }
}

/// Always hands back the same nonce. Used for reproducible output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedNonce(String);

impl FixedNonce {
    pub fn parse(value: &str) -> Result<Self> {
        match hex::decode(value) {
            Ok(bytes) if bytes.len() == NONCE_BYTES => Ok(Self(value.to_ascii_lowercase())),
            _ => Err(PolicyError::InvalidNonce(value.to_string())),
        }
    }
}

impl NonceSource for FixedNonce {
    fn generate(&self) -> String {
        self.0.clone()
    }
}
