//! Content checksums.
//!
//! Checksums are lowercase hex SHA-256 digests.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

use homecloud_core::error::codes;
use homecloud_core::{AppError, AppResult};

/// Hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Re-encode a hex SHA-256 digest as base64, the form S3 expects in
/// `x-amz-checksum-sha256`.
pub fn hex_to_base64(hex: &str) -> AppResult<String> {
    let hex = parse_checksum(hex)?;
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| AppError::validation(format!("Invalid checksum: {e}")))?;
    Ok(STANDARD.encode(bytes))
}

/// Validate and lowercase a client-supplied hex checksum.
pub fn parse_checksum(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.len() != 64 || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::validation(
            "Checksum must be a 64-character hex SHA-256 digest",
        )
        .with_code(codes::CHECKSUM_MISMATCH));
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// Incremental SHA-256 over streamed chunks.
#[derive(Default, Clone)]
pub struct ChecksumWriter {
    hasher: Sha256,
    bytes: u64,
}

impl std::fmt::Debug for ChecksumWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChecksumWriter")
            .field("bytes", &self.bytes)
            .finish_non_exhaustive()
    }
}

impl ChecksumWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    /// Bytes hashed so far.
    pub fn len(&self) -> u64 {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    /// Finish and return the hex digest.
    pub fn finish(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(sha256_hex(b"hello"), HELLO_SHA256);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut writer = ChecksumWriter::new();
        writer.update(b"he");
        writer.update(b"llo");
        assert_eq!(writer.len(), 5);
        assert_eq!(writer.finish(), HELLO_SHA256);
    }

    #[test]
    fn test_parse_checksum() {
        assert_eq!(
            parse_checksum(&format!(" {} ", HELLO_SHA256.to_uppercase())).unwrap(),
            HELLO_SHA256
        );
        assert!(parse_checksum("abc").is_err());
        assert!(parse_checksum(&"z".repeat(64)).is_err());
    }

    #[test]
    fn test_hex_to_base64() {
        assert_eq!(
            hex_to_base64(HELLO_SHA256).unwrap(),
            "LPJNul+wow4m6DsqxbninhsWHlwfp0JecwQzYpOLmCQ="
        );
        assert!(hex_to_base64("not-a-digest").is_err());
    }
}
