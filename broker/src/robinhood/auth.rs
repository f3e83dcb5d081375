//! Time-based one-time passwords (RFC 6238) for Robinhood MFA.
//!
//! HMAC-SHA1, 30-second step, 6 digits: what authenticator apps produce from
//! the base32 secret shown when MFA is enabled.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::BrokerError;

type HmacSha1 = Hmac<Sha1>;

/// Seconds per TOTP time step.
pub const STEP_SECS: u64 = 30;

/// Digits in a generated code.
pub const DIGITS: u32 = 6;

/// Decode a base32 secret. Spaces, `=` padding and case are ignored.
pub fn decode_secret(secret: &str) -> Result<Vec<u8>, BrokerError> {
    let cleaned: String = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if cleaned.is_empty() {
        return Err(BrokerError::Auth("empty TOTP secret".into()));
    }
    data_encoding::BASE32_NOPAD
        .decode(cleaned.as_bytes())
        .map_err(|e| BrokerError::Auth(format!("invalid TOTP secret: {e}")))
}

/// One-time code for the step containing `unix_secs`.
pub fn code_at(secret: &str, unix_secs: u64) -> Result<String, BrokerError> {
    let key = decode_secret(secret)?;
    let counter = unix_secs / STEP_SECS;

    let mut mac = HmacSha1::new_from_slice(&key)
        .map_err(|e| BrokerError::Auth(format!("invalid TOTP key: {e}")))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    let code = binary % 10u32.pow(DIGITS);

    Ok(format!("{code:0width$}", width = DIGITS as usize))
}

/// One-time code for the current time.
pub fn current_code(secret: &str) -> Result<String, BrokerError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs();
    code_at(secret, now)
}
