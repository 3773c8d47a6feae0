//! Bearer token minting and verification.
//!
//! The token is 32 random bytes, minted at startup and handed to the shell as
//! 64 hex characters.  It lives only in memory.  Rotating it makes every
//! previously issued token invalid immediately.

use rand::Rng;
use tokio::sync::watch;

/// Raw token length in bytes.
pub const TOKEN_BYTES: usize = 32;

/// Generates a fresh random token.
pub fn generate_token() -> [u8; TOKEN_BYTES] {
    rand::rng().random()
}

/// Holds the current token.  Subscribers are told about rotations so the
/// process can hand the new value to the shell.
pub struct TokenStore {
    current: watch::Sender<[u8; TOKEN_BYTES]>,
}

impl TokenStore {
    /// Creates a store with a freshly minted token.
    pub fn mint() -> Self {
        Self::from_bytes(generate_token())
    }

    pub fn from_bytes(token: [u8; TOKEN_BYTES]) -> Self {
        Self {
            current: watch::channel(token).0,
        }
    }

    /// The current token, hex-encoded.
    pub fn current_hex(&self) -> String {
        hex::encode(*self.current.borrow())
    }

    /// Replaces the token and returns the new one, hex-encoded.
    pub fn rotate(&self) -> String {
        let token = generate_token();
        self.current.send_replace(token);
        hex::encode(token)
    }

    /// Receives every rotation.
    pub fn subscribe(&self) -> watch::Receiver<[u8; TOKEN_BYTES]> {
        self.current.subscribe()
    }

    /// Checks a presented hex token.  Upper- and lower-case hex are accepted;
    /// anything that does not decode to exactly [`TOKEN_BYTES`] bytes fails.
    pub fn verify(&self, presented_hex: &str) -> bool {
        let Ok(presented) = hex::decode(presented_hex.trim()) else {
            return false;
        };
        let expected = *self.current.borrow();
        constant_time_eq(&expected, &presented)
    }
}

/// Compares without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ── Tests ─────────────────────────────────────────────────────────────────────
