pub mod auth;
pub mod bots;
pub mod chat;
pub mod error;
pub mod otp;

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{delete, get, post},
};

use companion_db::Database;
use companion_llm::TextGenerator;
use companion_mail::Mailer;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub mailer: Arc<dyn Mailer>,
    pub generator: Arc<dyn TextGenerator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot-password/request", post(auth::forgot_password_request))
        .route("/auth/forgot-password/verify", post(auth::forgot_password_verify))
        .route("/auth/email-verification", post(auth::email_verification))
        .route("/bots/createbot", post(bots::create_bot))
        .route("/bots/public", get(bots::list_public_bots))
        .route("/bots/my", get(bots::list_my_bots))
        .route(
            "/bots/{bot_id}",
            get(bots::get_bot).put(bots::update_bot).delete(bots::delete_bot),
        )
        .route("/chat/ask", post(chat::ask))
        .route("/chat/history", get(chat::history))
        .route("/chat/restart", delete(chat::restart))
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Welcome to AI Companion API" }))
}
