use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use companion_mail::send_welcome_email;
use companion_types::api::{
    EmailVerificationRequest, ForgotPasswordRequest, LoginRequest, LoginResponse, SignupRequest,
    SignupResponse, StatusMessage, VerifyResetRequest,
};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::otp::{self, IssueError, OtpPurpose};

/// Shown for any unknown-identity or stale-code case on the verification
/// endpoints, so they never reveal whether an email is registered.
const INVALID_OR_EXPIRED: &str = "Invalid or expired OTP";

const RESET_REQUESTED: &str =
    "If an account exists with this email, a password reset OTP has been sent";

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))
}

pub fn verify_password(plain: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<Json<SignupResponse>> {
    if req.password != req.confirm_password {
        return Err(ApiError::Validation("Passwords do not match".into()));
    }

    if state.db.get_user_by_email(&req.email)?.is_some() {
        return Err(ApiError::Validation("User already exists".into()));
    }

    let user_id = Uuid::new_v4().to_string();
    let password_hash = hash_password(&req.password)?;
    state
        .db
        .create_user(&user_id, &req.full_name, &req.email, &password_hash)?;
    info!("user {} signed up", user_id);

    // The account exists from here on, whatever happens to the emails.
    let welcome = send_welcome_email(state.mailer.as_ref(), &req.email, &req.full_name).await;
    let issued = otp::issue(&state.db, state.mailer.as_ref(), OtpPurpose::Signup, &req.email).await;

    let email_sent = match issued {
        Ok(()) => welcome.is_ok(),
        Err(IssueError::Store(e)) => return Err(ApiError::Internal(e)),
        Err(IssueError::Send(_)) => false,
    };

    if !email_sent {
        warn!("signup email delivery failed for {}", req.email);
        return Ok(Json(SignupResponse {
            message:
                "Account created but failed to send verification email. Please request a new code."
                    .into(),
            email_sent: false,
        }));
    }

    Ok(Json(SignupResponse {
        message: "Signup successful. Please check your email for the verification code.".into(),
        email_sent: true,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = state
        .db
        .get_user_by_email(&req.email)?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".into()))?;

    if !verify_password(&req.password, &user.password) {
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    if !user.is_verified {
        return Err(ApiError::Forbidden("Email not verified".into()));
    }

    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        user_id: user.user_id,
        full_name: user.full_name,
    }))
}

pub async fn forgot_password_request(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<StatusMessage>> {
    // Same response whether or not the account exists.
    if state.db.get_user_by_email(&req.email)?.is_none() {
        return Ok(Json(StatusMessage {
            message: RESET_REQUESTED.into(),
        }));
    }

    match otp::issue(&state.db, state.mailer.as_ref(), OtpPurpose::Reset, &req.email).await {
        Ok(()) => Ok(Json(StatusMessage {
            message: RESET_REQUESTED.into(),
        })),
        Err(IssueError::Store(e)) => Err(ApiError::Internal(e)),
        Err(IssueError::Send(e)) => {
            warn!("reset email delivery failed for {}: {}", req.email, e);
            Err(ApiError::Upstream(
                "Failed to send password reset email".into(),
            ))
        }
    }
}

pub async fn forgot_password_verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyResetRequest>,
) -> ApiResult<Json<StatusMessage>> {
    let Some(user) = state.db.get_user_by_email(&req.email)? else {
        return Err(ApiError::Validation(INVALID_OR_EXPIRED.into()));
    };

    otp::validate(&user, OtpPurpose::Reset, &req.otp, Utc::now())
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    // An empty new_password means "just check the code" (two-step UX).
    let new_password = match req.new_password.as_deref() {
        Some(p) if !p.is_empty() => p,
        _ => {
            return Ok(Json(StatusMessage {
                message: "OTP verified. You can now set a new password.".into(),
            }));
        }
    };

    if new_password.chars().count() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".into(),
        ));
    }

    if verify_password(new_password, &user.password) {
        return Err(ApiError::Validation(
            "New password cannot be the same as your current password".into(),
        ));
    }

    let password_hash = hash_password(new_password)?;
    state.db.update_password(&user.email, &password_hash)?;
    info!("password reset for user {}", user.user_id);

    Ok(Json(StatusMessage {
        message: "Password reset successful. You can now login with your new password.".into(),
    }))
}

pub async fn email_verification(
    State(state): State<AppState>,
    Json(req): Json<EmailVerificationRequest>,
) -> ApiResult<Json<StatusMessage>> {
    let Some(user) = state.db.get_user_by_email(&req.email)? else {
        return Err(ApiError::Validation(INVALID_OR_EXPIRED.into()));
    };

    otp::validate(&user, OtpPurpose::Signup, &req.otp, Utc::now())
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    state.db.mark_verified(&user.email)?;
    info!("user {} verified", user.user_id);

    Ok(Json(StatusMessage {
        message: "Email verified successfully".into(),
    }))
}
