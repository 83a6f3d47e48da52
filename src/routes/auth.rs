use axum::{
    Form, Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use tower_sessions::Session;

use crate::{
    audit::{self, AuditAction},
    dto::auth::{AuthPage, LoginForm, RegisterForm, VerifyOtpForm, VerifyOtpPage},
    error::AppError,
    response::ApiResponse,
    routes::{flash_to, page},
    services::auth_service,
    session::{self, CurrentUser, FlashLevel, keys},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register/", get(register_page).post(register))
        .route("/login/", get(login_page).post(login))
        .route("/verify-otp/", get(verify_otp_page).post(verify_otp))
        .route("/logout/", get(logout))
}

#[utoipa::path(
    get,
    path = "/register/",
    responses((status = 200, description = "Registration form", body = ApiResponse<AuthPage>)),
    tag = "Auth"
)]
pub async fn register_page(session: Session) -> Json<ApiResponse<AuthPage>> {
    page(&session, "Register", AuthPage { page: "register".into() }).await
}

#[utoipa::path(
    post,
    path = "/register/",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to /login/ on success, back to /register/ on error")),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    match auth_service::register_user(&state, form).await {
        Ok(registration) if registration.welcome_email_sent => {
            flash_to(
                &session,
                FlashLevel::Success,
                "Registration successful! Please login.",
                "/login/",
            )
            .await
        }
        Ok(_) => {
            flash_to(
                &session,
                FlashLevel::Warning,
                "Registration successful, but the welcome email could not be sent. Please login.",
                "/login/",
            )
            .await
        }
        Err(err) => err.flash_redirect(&session, "/register/").await,
    }
}

#[utoipa::path(
    get,
    path = "/login/",
    responses((status = 200, description = "Login form", body = ApiResponse<AuthPage>)),
    tag = "Auth"
)]
pub async fn login_page(session: Session) -> Json<ApiResponse<AuthPage>> {
    page(&session, "Login", AuthPage { page: "login".into() }).await
}

#[utoipa::path(
    post,
    path = "/login/",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to /verify-otp/ once the code is sent")),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let pending = match auth_service::begin_login(&state, form).await {
        Ok(pending) => pending,
        Err(AppError::UnknownAccount) => {
            return AppError::UnknownAccount
                .flash_redirect(&session, "/register/")
                .await;
        }
        Err(err) => return err.flash_redirect(&session, "/login/").await,
    };

    if let Err(err) = session::set_pending_login(&session, &pending).await {
        return AppError::from(err).into_response();
    }
    flash_to(
        &session,
        FlashLevel::Success,
        "OTP sent to your email!",
        "/verify-otp/",
    )
    .await
}

#[utoipa::path(
    get,
    path = "/verify-otp/",
    responses(
        (status = 200, description = "Code entry form", body = ApiResponse<VerifyOtpPage>),
        (status = 303, description = "No login in progress, redirect to /login/")
    ),
    tag = "Auth"
)]
pub async fn verify_otp_page(session: Session) -> Response {
    match session::pending_login(&session).await {
        Ok(Some(pending)) => page(
            &session,
            "Verify OTP",
            VerifyOtpPage {
                email: pending.email,
            },
        )
        .await
        .into_response(),
        Ok(None) => AppError::SessionExpired.flash_redirect(&session, "/login/").await,
        Err(err) => AppError::from(err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/verify-otp/",
    request_body(content = VerifyOtpForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to / once authenticated")),
    tag = "Auth"
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<VerifyOtpForm>,
) -> Response {
    let pending = match session::pending_login(&session).await {
        Ok(pending) => pending,
        Err(err) => return AppError::from(err).into_response(),
    };

    match auth_service::verify_otp(&state, pending.as_ref(), &form.otp, Utc::now()).await {
        Ok(user) => {
            if let Err(err) = session::establish(&session, &user).await {
                return AppError::from(err).into_response();
            }
            tracing::info!(user_id = %user.id, "user logged in");
            flash_to(&session, FlashLevel::Success, "Login successful!", "/").await
        }
        Err(err @ (AppError::OtpExpired | AppError::SessionExpired)) => {
            if let Err(clear_err) = session::clear_pending_login(&session).await {
                tracing::warn!(error = %clear_err, "failed to clear pending login");
            }
            err.flash_redirect(&session, "/login/").await
        }
        Err(err) => err.flash_redirect(&session, "/verify-otp/").await,
    }
}

#[utoipa::path(
    get,
    path = "/logout/",
    responses((status = 303, description = "Session cleared, redirect to /")),
    tag = "Auth"
)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    let user = session
        .get::<CurrentUser>(keys::CURRENT_USER)
        .await
        .ok()
        .flatten();

    if let Err(err) = session::terminate(&session).await {
        return AppError::from(err).into_response();
    }

    if let Some(user) = user {
        audit::record(
            &state.pool,
            Some(user.id),
            AuditAction::UserLogout,
            "users",
            serde_json::json!({ "user_id": user.id }),
        )
        .await;
    }
    flash_to(
        &session,
        FlashLevel::Success,
        "You have been logged out.",
        "/",
    )
    .await
}
