//! One-time codes for email verification and password reset. Codes are
//! six decimal digits, valid for ten minutes, compared by string equality,
//! and cleared once consumed.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use thiserror::Error;

use companion_db::Database;
use companion_db::models::UserRow;
use companion_mail::{Mailer, send_otp_email};

const OTP_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    Signup,
    Reset,
}

/// Validation failures, in the order they are checked. The messages are
/// user-visible.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OtpError {
    #[error("OTP has expired. Please request a new one.")]
    Expired,
    #[error("Invalid OTP")]
    Mismatch,
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("failed to store OTP: {0}")]
    Store(#[source] anyhow::Error),
    #[error("failed to send OTP email: {0}")]
    Send(#[source] anyhow::Error),
}

pub fn generate_otp() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

/// Persist a fresh code for the purpose, then make exactly one email
/// attempt. The code is stored even when the send fails, so the user can
/// still be verified out-of-band or request a resend.
pub async fn issue(
    db: &Database,
    mailer: &dyn Mailer,
    purpose: OtpPurpose,
    email: &str,
) -> Result<(), IssueError> {
    let code = generate_otp();
    let issued_at = Utc::now().to_rfc3339();

    match purpose {
        OtpPurpose::Signup => db.set_signup_otp(email, &code, &issued_at),
        OtpPurpose::Reset => db.set_reset_otp(email, &code, &issued_at),
    }
    .map_err(IssueError::Store)?;

    send_otp_email(mailer, email, &code)
        .await
        .map_err(IssueError::Send)
}

/// Check the submitted code against the user's stored state. Expiry is
/// checked first, so a cleared or never-issued code reads as expired
/// rather than mismatched.
pub fn validate(
    user: &UserRow,
    purpose: OtpPurpose,
    submitted: &str,
    now: DateTime<Utc>,
) -> Result<(), OtpError> {
    let (code, issued_at) = match purpose {
        OtpPurpose::Signup => (user.otp.as_deref(), user.otp_created_at.as_deref()),
        OtpPurpose::Reset => (user.reset_otp.as_deref(), user.reset_otp_created_at.as_deref()),
    };

    if is_expired(issued_at, now) {
        return Err(OtpError::Expired);
    }

    match code {
        Some(stored) if stored == submitted => Ok(()),
        _ => Err(OtpError::Mismatch),
    }
}

fn is_expired(issued_at: Option<&str>, now: DateTime<Utc>) -> bool {
    let Some(raw) = issued_at else {
        return true;
    };
    match raw.parse::<DateTime<Utc>>() {
        Ok(at) => now - at > Duration::minutes(OTP_TTL_MINUTES),
        // unreadable timestamp: treat as expired, forcing a fresh code
        Err(_) => true,
    }
}
