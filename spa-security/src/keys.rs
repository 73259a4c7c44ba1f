//! JWK to RSA public key conversion.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::DecodingKey;
use rsa::{BigUint, RsaPublicKey};

use crate::error::SecurityError;
use crate::jwks::Jwk;

/// Decode a base64url value, accepting padded or unpadded input.
pub fn decode_base64url(field: &str, value: &str) -> Result<Vec<u8>, SecurityError> {
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| SecurityError::KeyConversion(format!("failed to decode {field}: {e}")))
}

/// Big-endian accumulation of the exponent bytes.
pub fn exponent_from_bytes(bytes: &[u8]) -> Result<u64, SecurityError> {
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(SecurityError::KeyConversion(format!(
            "unsupported exponent length: {}",
            bytes.len()
        )));
    }
    Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Build a verifying key from the JWK's modulus and exponent.
///
/// The components are checked as an RSA public key first, so an oversized
/// modulus or out-of-range exponent is reported here rather than as a
/// signature failure.
pub fn rsa_decoding_key(jwk: &Jwk) -> Result<DecodingKey, SecurityError> {
    if let Some(kty) = jwk.kty.as_deref() {
        if kty != "RSA" {
            return Err(SecurityError::KeyConversion(format!("unsupported key type: {kty}")));
        }
    }
    let n = jwk
        .n
        .as_deref()
        .ok_or_else(|| SecurityError::KeyConversion("missing modulus".into()))?;
    let e = jwk
        .e
        .as_deref()
        .ok_or_else(|| SecurityError::KeyConversion("missing exponent".into()))?;

    let n_bytes = decode_base64url("modulus", n)?;
    let e_bytes = decode_base64url("exponent", e)?;
    let exponent = exponent_from_bytes(&e_bytes)?;

    RsaPublicKey::new(BigUint::from_bytes_be(&n_bytes), BigUint::from(exponent))
        .map_err(|err| SecurityError::KeyConversion(err.to_string()))?;

    Ok(DecodingKey::from_rsa_raw_components(&n_bytes, &e_bytes))
}
