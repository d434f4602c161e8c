//! Share token generation

use base64::Engine;
use rand::{rngs::OsRng, RngCore};

/// Random bytes per token (256 bits)
pub const TOKEN_BYTES: usize = 32;

/// Encoded token length (base64url, no padding)
pub const TOKEN_LEN: usize = 43;

/// Mint a new share token from the OS CSPRNG
///
/// Tokens are bearer credentials. They are never derived from file ids,
/// counters or timestamps.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Cheap shape check so obviously bogus tokens skip the store lookup
pub fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
