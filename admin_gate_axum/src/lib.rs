//! admin-gate-axum - axum router and handlers over the admin-gate core.
//!
//! Mount the router under [`ADMIN_GATE_ROUTE_PREFIX`]:
//!
//! ```ignore
//! let app = Router::new()
//!     .nest(ADMIN_GATE_ROUTE_PREFIX.as_str(), admin_gate_axum::router());
//! ```

mod config;
mod errors;
mod handlers;

use axum::Router;
use axum::routing::{delete, get, post};

pub use admin_gate::ADMIN_GATE_ROUTE_PREFIX;

/// Builds the gate router. The one-time-code endpoints are mounted only when
/// the fallback path is enabled; the passkey and OTP paths stay configured
/// alternatives rather than a merged surface.
pub fn router() -> Router {
    let mut router = Router::new()
        .route("/verify-pin", post(handlers::verify_pin))
        .route("/human-check", get(handlers::human_check))
        .route("/verify-human", post(handlers::verify_human))
        .route("/register-challenge", post(handlers::register_challenge))
        .route("/register-verify", post(handlers::register_verify))
        .route("/login-challenge", post(handlers::login_challenge))
        .route("/login-verify", post(handlers::login_verify))
        .route("/credentials", get(handlers::list_credentials))
        .route("/credentials/{id}", delete(handlers::delete_credential))
        .route("/logout", post(handlers::logout));

    if *admin_gate::OTP_ENABLED {
        router = router
            .route("/send-otp", post(handlers::send_otp))
            .route("/verify-otp", post(handlers::verify_otp));
    } else {
        tracing::debug!("One-time-code endpoints disabled");
    }

    router
}
