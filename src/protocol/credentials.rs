//! Login credential payloads.
//!
//! The `login` method takes exactly one parameter, whose shape selects the
//! authentication mechanism:
//!
//! | Mechanism | Payload |
//! |-----------|---------|
//! | Password | `{"user": {"username"\|"email": v}, "password": {"digest": hex, "algorithm": "sha-256"}}` |
//! | Resume token | `{"resume": token}` |
//! | OAuth | `{"oauth": {"credentialToken": t, "credentialSecret": s}}` |

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

// ============================================================================
// Constants
// ============================================================================

/// Algorithm name the server expects next to a password digest.
pub const DIGEST_ALGORITHM: &str = "sha-256";

// ============================================================================
// Credentials
// ============================================================================

/// One of the three supported login payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Credentials {
    /// Username or email with a hashed password.
    Password {
        /// Who is logging in.
        user: UserIdentifier,
        /// Hashed password.
        password: PasswordDigest,
    },

    /// Previously issued login token.
    Resume {
        /// The token.
        resume: String,
    },

    /// OAuth credential pair obtained out of band.
    OAuth {
        /// Token and secret.
        oauth: OAuthCredential,
    },
}

impl Credentials {
    /// Builds password credentials, hashing `password` with SHA-256.
    ///
    /// An identifier containing `@` is sent as `email`, anything else as
    /// `username`.
    #[must_use]
    pub fn password(identifier: &str, password: &str) -> Self {
        Self::Password {
            user: UserIdentifier::classify(identifier),
            password: PasswordDigest::sha256(password),
        }
    }

    /// Builds resume-token credentials.
    #[inline]
    #[must_use]
    pub fn resume(token: impl Into<String>) -> Self {
        Self::Resume {
            resume: token.into(),
        }
    }

    /// Builds OAuth credentials.
    #[inline]
    #[must_use]
    pub fn oauth(credential_token: impl Into<String>, credential_secret: impl Into<String>) -> Self {
        Self::OAuth {
            oauth: OAuthCredential {
                credential_token: credential_token.into(),
                credential_secret: credential_secret.into(),
            },
        }
    }

    /// Short mechanism name for logs. Never includes secret material.
    #[must_use]
    pub fn mechanism(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::Resume { .. } => "resume",
            Self::OAuth { .. } => "oauth",
        }
    }

    /// Converts the credentials into the `login` method parameter.
    ///
    /// # Errors
    ///
    /// Propagates the serde error; every variant is plain strings so this
    /// does not fail in practice.
    pub fn to_param(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

// ============================================================================
// UserIdentifier
// ============================================================================

/// The `user` selector of a password login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserIdentifier {
    /// Login by username.
    Username(String),
    /// Login by email address.
    Email(String),
}

impl UserIdentifier {
    /// Picks `email` when the identifier contains `@`, otherwise `username`.
    #[must_use]
    pub fn classify(identifier: &str) -> Self {
        if identifier.contains('@') {
            Self::Email(identifier.to_string())
        } else {
            Self::Username(identifier.to_string())
        }
    }

    /// Wire field name this identifier is sent under.
    #[must_use]
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Username(_) => "username",
            Self::Email(_) => "email",
        }
    }
}

// ============================================================================
// PasswordDigest
// ============================================================================

/// Hex-encoded password hash plus its algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordDigest {
    /// Lowercase hex digest.
    pub digest: String,
    /// Always [`DIGEST_ALGORITHM`].
    pub algorithm: &'static str,
}

impl PasswordDigest {
    /// Hashes a plaintext password.
    #[must_use]
    pub fn sha256(password: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        Self {
            digest: format!("{:x}", hasher.finalize()),
            algorithm: DIGEST_ALGORITHM,
        }
    }
}

// ============================================================================
// OAuthCredential
// ============================================================================

/// OAuth token/secret pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthCredential {
    /// Credential token.
    pub credential_token: String,
    /// Credential secret.
    pub credential_secret: String,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_email_identifier() {
        let param = Credentials::password("user@x.com", "pw").to_param().expect("serialize");
        assert_eq!(param["user"], json!({"email": "user@x.com"}));
        assert_eq!(param["password"]["algorithm"], "sha-256");
    }

    #[test]
    fn test_username_identifier() {
        let param = Credentials::password("user", "pw").to_param().expect("serialize");
        assert_eq!(param["user"], json!({"username": "user"}));
    }

    #[test]
    fn test_known_digest() {
        let digest = PasswordDigest::sha256("password");
        assert_eq!(
            digest.digest,
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }

    #[test]
    fn test_resume_payload() {
        let param = Credentials::resume("token-1").to_param().expect("serialize");
        assert_eq!(param, json!({"resume": "token-1"}));
    }

    #[test]
    fn test_oauth_payload() {
        let param = Credentials::oauth("tok", "sec").to_param().expect("serialize");
        assert_eq!(
            param,
            json!({"oauth": {"credentialToken": "tok", "credentialSecret": "sec"}})
        );
    }

    #[test]
    fn test_mechanism_names() {
        assert_eq!(Credentials::password("a", "b").mechanism(), "password");
        assert_eq!(Credentials::resume("t").mechanism(), "resume");
        assert_eq!(Credentials::oauth("t", "s").mechanism(), "oauth");
    }

    proptest! {
        #[test]
        fn prop_at_sign_selects_email(local in "[a-z0-9.]{1,12}", domain in "[a-z]{1,8}\\.[a-z]{2,3}") {
            let identifier = format!("{local}@{domain}");
            prop_assert_eq!(UserIdentifier::classify(&identifier).field_name(), "email");
        }

        #[test]
        fn prop_no_at_sign_selects_username(name in "[a-zA-Z0-9._-]{1,20}") {
            prop_assert_eq!(UserIdentifier::classify(&name).field_name(), "username");
        }

        #[test]
        fn prop_digest_is_64_lowercase_hex(password in ".{0,64}") {
            let digest = PasswordDigest::sha256(&password).digest;
            prop_assert_eq!(digest.len(), 64);
            prop_assert!(digest.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }
}
