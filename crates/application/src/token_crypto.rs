use std::fmt::Write;

use sha2::{Digest, Sha256};
use tenantgate_core::{AppError, AppResult};
use tenantgate_domain::API_KEY_SCHEME;

/// Hex characters of the secret shown in the display prefix.
const DISPLAY_PREFIX_HEX_CHARS: usize = 8;

/// Freshly generated API key material.
pub(crate) struct GeneratedApiKey {
    pub(crate) raw_token: String,
    pub(crate) key_hash: String,
    pub(crate) display_prefix: String,
}

/// Generates `tgk_<64 hex>` from 32 random bytes along with its hash and display prefix.
pub(crate) fn generate_api_key() -> AppResult<GeneratedApiKey> {
    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes)
        .map_err(|error| AppError::Internal(format!("failed to generate api key: {error}")))?;

    let secret = to_hex(&bytes);
    let raw_token = format!("{API_KEY_SCHEME}_{secret}");
    let display_prefix = format!(
        "{API_KEY_SCHEME}_{}",
        &secret[..DISPLAY_PREFIX_HEX_CHARS]
    );
    let key_hash = hash_token(&raw_token);

    Ok(GeneratedApiKey {
        raw_token,
        key_hash,
        display_prefix,
    })
}

/// Returns whether the token carries the API key scheme prefix.
pub(crate) fn is_api_key_token(token: &str) -> bool {
    token
        .strip_prefix(API_KEY_SCHEME)
        .is_some_and(|rest| rest.starts_with('_'))
}

/// Computes the SHA-256 hash of a token string for storage.
pub(crate) fn hash_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        })
}

#[cfg(test)]
mod tests {
    use tenantgate_core::AppResult;

    use super::{generate_api_key, hash_token, is_api_key_token};

    #[test]
    fn generated_key_has_scheme_prefix_and_matching_hash() -> AppResult<()> {
        let key = generate_api_key()?;

        assert!(key.raw_token.starts_with("tgk_"));
        assert_eq!(key.raw_token.len(), 4 + 64);
        assert!(key.raw_token.starts_with(key.display_prefix.as_str()));
        assert_eq!(key.display_prefix.len(), 4 + 8);
        assert_eq!(key.key_hash, hash_token(&key.raw_token));
        assert_eq!(key.key_hash.len(), 64);
        Ok(())
    }

    #[test]
    fn generated_keys_are_unique() -> AppResult<()> {
        let first = generate_api_key()?;
        let second = generate_api_key()?;
        assert_ne!(first.raw_token, second.raw_token);
        Ok(())
    }

    #[test]
    fn scheme_detection_requires_separator() {
        assert!(is_api_key_token("tgk_abc"));
        assert!(!is_api_key_token("tgkabc"));
        assert!(!is_api_key_token("eyJhbGciOi"));
    }
}
