//! Sale-event webhook verification.
//!
//! The sale-event source signs each delivery with HMAC-SHA256 over
//! `"{timestamp}.{body}"`, sent as `X-Sale-Signature: t=<unix>,v1=<hex>`.
//! Verification uses constant-time comparison and a bounded timestamp
//! window against replays.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed age for deliveries (5 minutes).
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Maximum allowed clock skew for future timestamps (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "x-sale-signature";

/// Why a delivery was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// The header did not parse.
    Malformed(String),

    /// The timestamp fell outside the replay window.
    Stale,

    /// The HMAC did not match.
    Mismatch,
}

impl std::fmt::Display for SignatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureError::Malformed(reason) => write!(f, "malformed signature: {}", reason),
            SignatureError::Stale => write!(f, "signature timestamp outside window"),
            SignatureError::Mismatch => write!(f, "signature mismatch"),
        }
    }
}

/// Parsed components from the signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,

    /// HMAC-SHA256 signature bytes.
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    /// Parses a header string of the form `t=<timestamp>,v1=<hex>`.
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| SignatureError::Malformed("missing '='".to_string()))?;

            match key.trim() {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        SignatureError::Malformed("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signature = Some(hex::decode(value).map_err(|_| {
                        SignatureError::Malformed("invalid signature hex".to_string())
                    })?);
                }
                _ => {
                    // Ignore unknown fields for forward compatibility
                }
            }
        }

        Ok(SignatureHeader {
            timestamp: timestamp
                .ok_or_else(|| SignatureError::Malformed("missing timestamp".to_string()))?,
            v1_signature: v1_signature
                .ok_or_else(|| SignatureError::Malformed("missing v1 signature".to_string()))?,
        })
    }
}

/// Verifier for sale-event webhook signatures.
pub struct SaleWebhookVerifier {
    secret: SecretString,
}

impl SaleWebhookVerifier {
    /// Creates a verifier with the given signing secret.
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verifies a delivery against its signature header.
    pub fn verify(
        &self,
        payload: &[u8],
        header: &str,
        now_unix: i64,
    ) -> Result<(), SignatureError> {
        let header = SignatureHeader::parse(header)?;

        let age = now_unix - header.timestamp;
        if age > MAX_EVENT_AGE_SECS || age < -MAX_CLOCK_SKEW_SECS {
            return Err(SignatureError::Stale);
        }

        let expected = self.compute(payload, header.timestamp);
        let provided: &[u8] = &header.v1_signature;
        if expected.ct_eq(provided).into() {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    fn compute(&self, payload: &[u8], timestamp: i64) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }

    /// Signs a payload, producing a full header value. Test helper for
    /// the sale-event source's side of the contract.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> String {
        format!(
            "t={},v1={}",
            timestamp,
            hex::encode(self.compute(payload, timestamp))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> SaleWebhookVerifier {
        SaleWebhookVerifier::new(SecretString::new("whsec_test_secret".to_string()))
    }

    #[test]
    fn parses_well_formed_header() {
        let header = SignatureHeader::parse("t=1700000000,v1=deadbeef").unwrap();
        assert_eq!(header.timestamp, 1_700_000_000);
        assert_eq!(header.v1_signature, vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn rejects_header_without_signature() {
        assert!(matches!(
            SignatureHeader::parse("t=1700000000"),
            Err(SignatureError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_bad_hex() {
        assert!(matches!(
            SignatureHeader::parse("t=1700000000,v1=zzzz"),
            Err(SignatureError::Malformed(_))
        ));
    }

    #[test]
    fn valid_signature_verifies() {
        let v = verifier();
        let payload = br#"{"sale_reference":"pi_1"}"#;
        let now = 1_700_000_000;
        let header = v.sign(payload, now);
        assert!(v.verify(payload, &header, now).is_ok());
    }

    #[test]
    fn tampered_payload_fails() {
        let v = verifier();
        let now = 1_700_000_000;
        let header = v.sign(b"original", now);
        assert_eq!(
            v.verify(b"tampered", &header, now),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn wrong_secret_fails() {
        let signer = SaleWebhookVerifier::new(SecretString::new("other".to_string()));
        let now = 1_700_000_000;
        let header = signer.sign(b"payload", now);
        assert_eq!(
            verifier().verify(b"payload", &header, now),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn stale_timestamp_fails() {
        let v = verifier();
        let signed_at = 1_700_000_000;
        let header = v.sign(b"payload", signed_at);
        let much_later = signed_at + MAX_EVENT_AGE_SECS + 1;
        assert_eq!(
            v.verify(b"payload", &header, much_later),
            Err(SignatureError::Stale)
        );
    }

    #[test]
    fn small_clock_skew_is_tolerated() {
        let v = verifier();
        let now = 1_700_000_000;
        let header = v.sign(b"payload", now + 30);
        assert!(v.verify(b"payload", &header, now).is_ok());
    }
}
