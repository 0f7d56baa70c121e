//! Inbound identity-token verification
//!
//! RS256 signature check against a supplied public key, validating issuer,
//! audience and expiry. Used only for inbound identity tokens; never part
//! of the request retry path.

use fhirbridge_domain::{FhirError, Result};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;

/// Public key material accepted for id-token verification.
pub enum IdTokenKey {
    /// PEM-encoded RSA public key.
    RsaPem(Vec<u8>),
    /// JWK-style base64url modulus and exponent.
    RsaComponents { n: String, e: String },
}

impl IdTokenKey {
    fn decoding_key(&self) -> Result<DecodingKey> {
        match self {
            Self::RsaPem(pem) => DecodingKey::from_rsa_pem(pem),
            Self::RsaComponents { n, e } => DecodingKey::from_rsa_components(n, e),
        }
        .map_err(|err| FhirError::Decode(format!("invalid public key: {err}")))
    }
}

/// Verify an RS256 id token and return its claims.
///
/// # Errors
/// `Decode` on bad signature, wrong algorithm, expired token, or
/// issuer/audience mismatch.
pub fn check_id_token(
    id_token: &str,
    key: &IdTokenKey,
    issuer: &str,
    audience: &str,
) -> Result<Value> {
    let decoding_key = key.decoding_key()?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[audience]);
    validation.validate_exp = true;

    let data = decode::<Value>(id_token, &decoding_key, &validation)
        .map_err(|err| FhirError::Decode(format!("error decoding jwt token: {err}")))?;
    Ok(data.claims)
}
