//! The subset of the itsdangerous URL-safe serializer the dojo uses for flags
//! and workspace tokens. Signatures are produced but never verified: the
//! secret is unknown to the client, only the payload shape matters.

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha1::{Digest, Sha1};

const SALT: &[u8] = b"itsdangerous";
const SEPARATOR: char = '.';

type HmacSha1 = Hmac<Sha1>;

/// django-concat key derivation: `sha1(salt + "signer" + secret)`
fn derive_key(secret: &[u8]) -> Vec<u8> {
    let mut hasher = Sha1::new();
    hasher.update(SALT);
    hasher.update(b"signer");
    hasher.update(secret);
    hasher.finalize().to_vec()
}

fn signature(secret: &[u8], value: &str) -> Result<String> {
    let mut mac = HmacSha1::new_from_slice(&derive_key(secret))
        .map_err(|e| anyhow!("Invalid signing key: {}", e))?;
    mac.update(value.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// Sign `obj` the way `URLSafeSerializer(secret).dumps(obj)` does
pub fn dumps<T: Serialize>(secret: &[u8], obj: &T) -> Result<String> {
    let json = serde_json::to_vec(obj)?;
    let payload = URL_SAFE_NO_PAD.encode(json);
    let sig = signature(secret, &payload)?;
    Ok(format!("{}{}{}", payload, SEPARATOR, sig))
}

/// Decode the payload of a signed value without checking its signature
///
/// Compressed payloads (leading `.`) are not produced for the small values
/// the dojo signs and are rejected.
pub fn loads_unsafe<T: DeserializeOwned>(signed: &str) -> Option<T> {
    let (payload, _sig) = signed.rsplit_once(SEPARATOR)?;
    decode_payload(payload)
}

/// Like [`loads_unsafe`] for `URLSafeTimedSerializer` values (`payload.timestamp.sig`)
pub fn loads_timed_unsafe<T: DeserializeOwned>(signed: &str) -> Option<T> {
    let (rest, _sig) = signed.rsplit_once(SEPARATOR)?;
    let (payload, _timestamp) = rest.rsplit_once(SEPARATOR)?;
    decode_payload(payload)
}

fn decode_payload<T: DeserializeOwned>(payload: &str) -> Option<T> {
    if payload.is_empty() || payload.starts_with(SEPARATOR) {
        return None;
    }
    let json = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&json).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_matches_reference_output() {
        // itsdangerous.URLSafeSerializer('').dumps([1, 2])
        let signed = dumps(b"", &[1, 2]).unwrap();
        assert_eq!(signed, "WzEsMl0.fdw5c35DkfIIMoM5bxZAyamQJsY");
    }

    #[test]
    fn test_loads_ignores_signature() {
        let value: Vec<i64> = loads_unsafe("WzEsMl0.not-the-signature").unwrap();
        assert_eq!(value, vec![1, 2]);
    }

    #[test]
    fn test_loads_requires_separator() {
        assert_eq!(loads_unsafe::<Vec<i64>>("WzEsMl0"), None);
    }

    #[test]
    fn test_timed_payload() {
        let payload = URL_SAFE_NO_PAD.encode(br#"[7,"abc","cli-auth-token"]"#);
        let token = format!("{}.ZxYwVu.c2lnbmF0dXJl", payload);
        let value: serde_json::Value = loads_timed_unsafe(&token).unwrap();
        assert_eq!(value, serde_json::json!([7, "abc", "cli-auth-token"]));
    }

    #[test]
    fn test_compressed_payload_is_rejected() {
        assert_eq!(loads_unsafe::<serde_json::Value>(".eJyLVgAA.sig"), None);
    }
}
