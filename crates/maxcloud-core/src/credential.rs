//! Opaque bearer credential codec.
//!
//! API keys (`mc_`) and invitation tokens (`mci_`) share one shape:
//! 32 cryptographically random bytes, hex-encoded, behind a literal
//! prefix. Only the SHA-256 hash of the full secret is persisted; the
//! first 8 hex characters after the literal form a non-secret lookup
//! prefix. The prefix is an index and the hash is the authenticator:
//! callers must iterate every stored candidate sharing the prefix and
//! compare hashes in constant time.

use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

const SECRET_BYTES: usize = 32;
const LOOKUP_PREFIX_LEN: usize = 8;

/// Which credential lexicon a secret belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// `mc_` — API keys authenticating a user to an organization.
    ApiKey,
    /// `mci_` — single-use invitation tokens.
    InviteToken,
}

impl Kind {
    pub fn literal(self) -> &'static str {
        match self {
            Kind::ApiKey => "mc_",
            Kind::InviteToken => "mci_",
        }
    }
}

/// A freshly generated secret. `raw` exists only here and in the
/// creation response; it is never persisted or logged.
#[derive(Debug)]
pub struct Generated {
    pub raw: String,
    pub hash: String,
    pub prefix: String,
}

/// The input was too short or carried the wrong literal prefix.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed bearer secret")]
pub struct InvalidSecret;

/// Draw a new secret of the given kind.
pub fn generate(kind: Kind) -> Generated {
    let bytes: [u8; SECRET_BYTES] = rand::rng().random();
    let raw = format!("{}{}", kind.literal(), hex::encode(bytes));
    let hash = hash(&raw);
    let literal = kind.literal().len();
    let prefix = raw[literal..literal + LOOKUP_PREFIX_LEN].to_string();
    Generated { raw, hash, prefix }
}

/// SHA-256 of the full raw secret, hex-encoded. This is the stored
/// authenticator.
pub fn hash(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extract the lookup prefix from a raw secret.
///
/// Only length and literal are checked here; everything else is decided
/// by the hash comparison against stored candidates.
pub fn parse_prefix(kind: Kind, raw: &str) -> Result<&str, InvalidSecret> {
    let literal = kind.literal();
    if raw.len() < literal.len() + LOOKUP_PREFIX_LEN {
        return Err(InvalidSecret);
    }
    if !raw.starts_with(literal) {
        return Err(InvalidSecret);
    }
    Ok(&raw[literal.len()..literal.len() + LOOKUP_PREFIX_LEN])
}

/// Constant-time comparison of two hex-encoded hashes.
pub fn verify(stored_hash: &str, candidate_hash: &str) -> bool {
    stored_hash
        .as_bytes()
        .ct_eq(candidate_hash.as_bytes())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_round_trips() {
        let generated = generate(Kind::ApiKey);
        assert!(generated.raw.starts_with("mc_"));
        assert_eq!(generated.raw.len(), 3 + SECRET_BYTES * 2);
        assert_eq!(
            parse_prefix(Kind::ApiKey, &generated.raw).unwrap(),
            generated.prefix
        );
        assert_eq!(hash(&generated.raw), generated.hash);
    }

    #[test]
    fn generated_invite_token_round_trips() {
        let generated = generate(Kind::InviteToken);
        assert!(generated.raw.starts_with("mci_"));
        assert_eq!(
            parse_prefix(Kind::InviteToken, &generated.raw).unwrap(),
            generated.prefix
        );
        assert_eq!(hash(&generated.raw), generated.hash);
    }

    #[test]
    fn prefix_is_eight_chars() {
        let generated = generate(Kind::ApiKey);
        assert_eq!(generated.prefix.len(), LOOKUP_PREFIX_LEN);
    }

    #[test]
    fn parse_rejects_short_input() {
        assert_eq!(parse_prefix(Kind::ApiKey, "mc_abc"), Err(InvalidSecret));
        assert_eq!(parse_prefix(Kind::ApiKey, ""), Err(InvalidSecret));
    }

    #[test]
    fn parse_rejects_wrong_literal() {
        let generated = generate(Kind::InviteToken);
        assert_eq!(
            parse_prefix(Kind::ApiKey, &generated.raw),
            Err(InvalidSecret)
        );
    }

    #[test]
    fn verify_accepts_equal_hashes_only() {
        let a = hash("mc_aaaa");
        let b = hash("mc_bbbb");
        assert!(verify(&a, &a));
        assert!(!verify(&a, &b));
    }

    #[test]
    fn secrets_are_unique() {
        let a = generate(Kind::ApiKey);
        let b = generate(Kind::ApiKey);
        assert_ne!(a.raw, b.raw);
        assert_ne!(a.hash, b.hash);
    }
}
