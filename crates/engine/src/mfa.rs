//! TOTP helpers for two-factor login.
//!
//! Secrets are stored base32-encoded on the user row. Codes are 6 digits,
//! SHA1, 30 second step, accepting one step of clock skew either way.

use chrono::{DateTime, Utc};
use totp_rs::{Algorithm, Secret, TOTP};

use crate::{EngineError, ResultEngine};

pub const MFA_ISSUER: &str = "The Big Tip";
const DIGITS: usize = 6;
const SKEW: u8 = 1;
const STEP: u64 = 30;

/// Generates a new random base32 secret.
pub fn generate_secret() -> String {
    Secret::generate_secret().to_encoded().to_string()
}

fn totp(secret_b32: &str, account: &str) -> ResultEngine<TOTP> {
    let bytes = Secret::Encoded(secret_b32.to_string())
        .to_bytes()
        .map_err(|err| EngineError::Internal(format!("invalid mfa secret: {err:?}")))?;
    TOTP::new(
        Algorithm::SHA1,
        DIGITS,
        SKEW,
        STEP,
        bytes,
        Some(MFA_ISSUER.to_string()),
        account.to_string(),
    )
    .map_err(|err| EngineError::Internal(format!("invalid mfa configuration: {err:?}")))
}

/// The `otpauth://` URL authenticator apps scan (usually as a QR code).
pub fn provisioning_url(secret_b32: &str, account: &str) -> ResultEngine<String> {
    Ok(totp(secret_b32, account)?.get_url())
}

/// Checks `code` against the secret at `now`.
pub fn verify_code(secret_b32: &str, account: &str, code: &str, now: DateTime<Utc>) -> ResultEngine<bool> {
    let code = code.trim();
    if code.len() != DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(false);
    }
    let time = u64::try_from(now.timestamp()).unwrap_or_default();
    Ok(totp(secret_b32, account)?.check(code, time))
}

/// Current code for the secret; used by tests and the admin CLI.
pub fn current_code(secret_b32: &str, account: &str, now: DateTime<Utc>) -> ResultEngine<String> {
    let time = u64::try_from(now.timestamp()).unwrap_or_default();
    Ok(totp(secret_b32, account)?.generate(time))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn generated_code_verifies() {
        let secret = generate_secret();
        let now = Utc::now();
        let code = current_code(&secret, "alice", now).unwrap();
        assert!(verify_code(&secret, "alice", &code, now).unwrap());
    }

    #[test]
    fn code_from_one_step_ago_is_accepted() {
        let secret = generate_secret();
        let now = Utc::now();
        let code = current_code(&secret, "alice", now - Duration::seconds(30)).unwrap();
        assert!(verify_code(&secret, "alice", &code, now).unwrap());
    }

    #[test]
    fn stale_code_is_rejected() {
        let secret = generate_secret();
        let now = Utc::now();
        let code = current_code(&secret, "alice", now - Duration::minutes(10)).unwrap();
        assert!(!verify_code(&secret, "alice", &code, now).unwrap());
    }

    #[test]
    fn malformed_code_is_rejected() {
        let secret = generate_secret();
        assert!(!verify_code(&secret, "alice", "12ab56", Utc::now()).unwrap());
        assert!(!verify_code(&secret, "alice", "1234", Utc::now()).unwrap());
    }

    #[test]
    fn url_names_issuer() {
        let secret = generate_secret();
        let url = provisioning_url(&secret, "alice").unwrap();
        assert!(url.starts_with("otpauth://totp/"));
        assert!(url.contains("alice"));
    }
}
