//! `verify_signature`: HMAC-SHA256 over the raw request body,
//! header format `sha256=<hex>`, constant-time comparison.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verifies `header_value` (e.g. `"sha256=<hex>"`) against `secret` and
/// `raw_body`. Returns `false` on any malformed input rather than panicking.
///
/// `Mac::verify_slice` performs a constant-time comparison internally, so no
/// hand-rolled constant-time equality is needed here.
pub fn verify_hmac_sha256(secret: &str, raw_body: &[u8], header_value: &str) -> bool {
    let Some(hex_sig) = header_value.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(raw_body);
    mac.verify_slice(&sig_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_signature() {
        let secret = "topsecret";
        let body = b"{\"hello\":\"world\"}";
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let sig = hex::encode(mac.finalize().into_bytes());
        let header = format!("sha256={sig}");
        assert!(verify_hmac_sha256(secret, body, &header));
    }

    #[test]
    fn rejects_tampered_body() {
        let secret = "topsecret";
        let body = b"{\"hello\":\"world\"}";
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let sig = hex::encode(mac.finalize().into_bytes());
        let header = format!("sha256={sig}");
        assert!(!verify_hmac_sha256(secret, b"{\"hello\":\"mars\"}", &header));
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(!verify_hmac_sha256("s", b"body", "not-a-signature"));
    }
}
