//! Share URL composition and parsing
//!
//! A share URL has the form:
//! ```text
//! https://vault.example/share/<token>
//! https://vault.example/share/<token>?iv=<nonce>&key=<wrapped-key>
//! ```
//!
//! The second form is used for E2EE links. `iv` and `key` are standard
//! base64, percent-encoded. Whoever holds the full URL plus the recipient's
//! private key can decrypt, so the query string is as sensitive as the token.

use crate::{metadata::EncryptionInfo, token, CoreError, Result};
use base64::Engine;
use vaultlink_crypto::Nonce;

/// Path segment preceding the token
pub const SHARE_PATH_PREFIX: &str = "/share/";

/// A parsed or composed share URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareUrl {
    base_url: String,
    token: String,
    encryption: Option<EncryptionInfo>,
}

impl ShareUrl {
    /// Plain link to `token` under `base_url`
    pub fn new(base_url: &str, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            encryption: None,
        }
    }

    /// Attach the wrapped key and nonce for an E2EE link
    pub fn with_encryption(mut self, encryption: EncryptionInfo) -> Self {
        self.encryption = Some(encryption);
        self
    }

    /// Render the full URL
    pub fn to_url(&self) -> String {
        let mut url = format!("{}{}{}", self.base_url, SHARE_PATH_PREFIX, self.token);
        if let Some(enc) = &self.encryption {
            let key = base64::engine::general_purpose::STANDARD.encode(&enc.wrapped_key);
            url.push_str(&format!(
                "?iv={}&key={}",
                urlencoding::encode(&enc.nonce.to_base64()),
                urlencoding::encode(&key)
            ));
        }
        url
    }

    /// Parse a full share URL
    pub fn parse(input: &str) -> Result<Self> {
        let parsed = ::url::Url::parse(input)
            .map_err(|e| CoreError::InvalidShareUrl(format!("{}: {}", input, e)))?;

        let path = parsed.path();
        let idx = path.rfind(SHARE_PATH_PREFIX).ok_or_else(|| {
            CoreError::InvalidShareUrl(format!("missing {} segment", SHARE_PATH_PREFIX))
        })?;
        let token = &path[idx + SHARE_PATH_PREFIX.len()..];
        if !token::is_well_formed(token) {
            return Err(CoreError::InvalidShareUrl("malformed token".to_string()));
        }
        let base_url = format!("{}{}", parsed.origin().ascii_serialization(), &path[..idx]);

        let mut iv = None;
        let mut key = None;
        for (name, value) in parsed.query_pairs() {
            match name.as_ref() {
                "iv" => iv = Some(value.into_owned()),
                "key" => key = Some(value.into_owned()),
                _ => {}
            }
        }

        let encryption = match (iv, key) {
            (None, None) => None,
            (Some(iv), Some(key)) => {
                let nonce = Nonce::from_base64(&iv)
                    .map_err(|e| CoreError::InvalidShareUrl(format!("iv: {}", e)))?;
                let wrapped_key = base64::engine::general_purpose::STANDARD
                    .decode(&key)
                    .map_err(|e| CoreError::InvalidShareUrl(format!("key: {}", e)))?;
                if wrapped_key.is_empty() {
                    return Err(CoreError::InvalidShareUrl("key is empty".to_string()));
                }
                Some(EncryptionInfo { wrapped_key, nonce })
            }
            _ => {
                return Err(CoreError::InvalidShareUrl(
                    "iv and key must appear together".to_string(),
                ))
            }
        };

        Ok(Self {
            base_url,
            token: token.to_string(),
            encryption,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn encryption(&self) -> Option<&EncryptionInfo> {
        self.encryption.as_ref()
    }

    pub fn is_e2ee(&self) -> bool {
        self.encryption.is_some()
    }
}

impl std::fmt::Display for ShareUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_url())
    }
}
