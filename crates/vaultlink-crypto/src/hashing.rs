//! BLAKE3 helpers

/// Hex BLAKE3 digest of `data`, used as a content checksum
pub fn checksum(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Short, non-reversible tag for a secret such as a share token
///
/// Safe to put in logs: 8 bytes of BLAKE3 reveal nothing usable about a
/// 256-bit token but are enough to correlate log lines.
pub fn fingerprint(secret: &str) -> String {
    let hash = blake3::hash(secret.as_bytes());
    hex::encode(&hash.as_bytes()[..8])
}
