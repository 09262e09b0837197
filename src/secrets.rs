//! Credential secret handling.

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::{Result, SeqflowError};

/// Reversible codec applied to credential values at rest.
pub trait CredentialCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String>;
    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// Base64 codec for stored credential values. Not cryptography; it
/// keeps raw keys out of casual reads of the database.
#[derive(Debug, Default, Clone, Copy)]
pub struct Base64Cipher;

impl CredentialCipher for Base64Cipher {
    fn encrypt(
        &self,
        plaintext: &str,
    ) -> Result<String> {
        Ok(STANDARD.encode(plaintext.as_bytes()))
    }

    fn decrypt(
        &self,
        ciphertext: &str,
    ) -> Result<String> {
        let bytes = STANDARD
            .decode(ciphertext.as_bytes())
            .map_err(|err| SeqflowError::Config(format!("credential value is not valid base64: {err}")))?;
        Ok(String::from_utf8(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let cipher = Base64Cipher;
        let stored = cipher.encrypt("sk-test-12345").unwrap();
        assert_ne!(stored, "sk-test-12345");
        assert_eq!(cipher.decrypt(&stored).unwrap(), "sk-test-12345");
    }

    #[test]
    fn test_decrypt_rejects_bad_encoding() {
        let cipher = Base64Cipher;
        assert!(cipher.decrypt("not base64 !!!").is_err());
    }
}
