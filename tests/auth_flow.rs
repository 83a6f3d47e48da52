mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{FailingMailer, RecordingMailer, database_url, setup_state, unique_email};
use nexus_storefront::{
    dto::auth::{LoginForm, RegisterForm},
    error::AppError,
    services::auth_service,
    session::PendingLogin,
};
use uuid::Uuid;

fn register_form(email: &str, password: &str, confirm: &str) -> RegisterForm {
    RegisterForm {
        name: "Ayesha Khan".into(),
        email: email.to_string(),
        phone: "0300-7654321".into(),
        password: password.to_string(),
        confirm_password: confirm.to_string(),
    }
}

fn login_form(email: &str, password: &str) -> LoginForm {
    LoginForm {
        email: email.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn register_login_and_verify_with_retries() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let mailer = Arc::new(RecordingMailer::default());
    let state = setup_state(&url, mailer.clone()).await?;
    let email = unique_email("buyer");

    let registration =
        auth_service::register_user(&state, register_form(&email, "pass1234", "pass1234")).await?;
    assert!(registration.welcome_email_sent);
    assert_eq!(registration.user.email, email);
    assert!(!registration.user.is_staff);
    assert!(mailer.sent().iter().any(|m| m.to == email && m.subject.contains("Welcome")));

    let pending = auth_service::begin_login(&state, login_form(&email, "pass1234")).await?;
    assert_eq!(pending.email, email);
    let code = mailer.last_code_for(&email).expect("otp mail");
    assert_eq!(code.len(), 6);

    let wrong = if code == "000000" { "111111" } else { "000000" };
    for _ in 0..3 {
        let err = auth_service::verify_otp(&state, Some(&pending), wrong, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OtpInvalid));
    }

    let user = auth_service::verify_otp(&state, Some(&pending), &code, Utc::now()).await?;
    assert_eq!(user.id, registration.user.id);
    assert_eq!(user.email, email);

    // codes are single use
    let replay = auth_service::verify_otp(&state, Some(&pending), &code, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(replay, AppError::OtpInvalid));

    let (verified,): (bool,) =
        sqlx::query_as("SELECT otp_verified FROM user_profiles WHERE user_id = $1")
            .bind(user.id)
            .fetch_one(&state.pool)
            .await?;
    assert!(verified);
    Ok(())
}

#[tokio::test]
async fn latest_code_wins_after_second_login() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let mailer = Arc::new(RecordingMailer::default());
    let state = setup_state(&url, mailer.clone()).await?;
    let email = unique_email("twotabs");
    auth_service::register_user(&state, register_form(&email, "pass1234", "pass1234")).await?;

    let first = auth_service::begin_login(&state, login_form(&email, "pass1234")).await?;
    let first_code = mailer.last_code_for(&email).expect("first code");
    let second = auth_service::begin_login(&state, login_form(&email, "pass1234")).await?;
    let second_code = mailer.last_code_for(&email).expect("second code");

    if first_code != second_code {
        let err = auth_service::verify_otp(&state, Some(&first), &first_code, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OtpInvalid));
    }
    auth_service::verify_otp(&state, Some(&second), &second_code, Utc::now()).await?;
    Ok(())
}

#[tokio::test]
async fn expired_code_is_rejected_and_cleared() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let mailer = Arc::new(RecordingMailer::default());
    let state = setup_state(&url, mailer.clone()).await?;
    let email = unique_email("late");
    auth_service::register_user(&state, register_form(&email, "pass1234", "pass1234")).await?;

    let pending = auth_service::begin_login(&state, login_form(&email, "pass1234")).await?;
    let code = mailer.last_code_for(&email).expect("otp mail");

    let later = Utc::now() + Duration::minutes(11);
    let err = auth_service::verify_otp(&state, Some(&pending), &code, later)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OtpExpired));
    assert_eq!(err.to_string(), "OTP expired! Please login again.");

    let (otp,): (Option<String>,) =
        sqlx::query_as("SELECT otp FROM user_profiles WHERE user_id = $1")
            .bind(pending.user_id)
            .fetch_one(&state.pool)
            .await?;
    assert!(otp.is_none());
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_creates_no_second_row() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Arc::new(RecordingMailer::default())).await?;
    let email = unique_email("twice");

    auth_service::register_user(&state, register_form(&email, "pass1234", "pass1234")).await?;
    let err = auth_service::register_user(
        &state,
        register_form(&email.to_uppercase(), "pass1234", "pass1234"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::DuplicateRegistration));

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(count, 1);
    Ok(())
}

#[tokio::test]
async fn registration_and_login_errors() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Arc::new(RecordingMailer::default())).await?;
    let email = unique_email("errors");

    let mismatch = auth_service::register_user(&state, register_form(&email, "a1", "b2"))
        .await
        .unwrap_err();
    assert!(matches!(mismatch, AppError::PasswordMismatch));

    let unknown = auth_service::begin_login(&state, login_form(&email, "whatever"))
        .await
        .unwrap_err();
    assert!(matches!(unknown, AppError::UnknownAccount));

    auth_service::register_user(&state, register_form(&email, "right", "right")).await?;
    let wrong = auth_service::begin_login(&state, login_form(&email, "wrong"))
        .await
        .unwrap_err();
    assert!(matches!(wrong, AppError::InvalidCredentials));

    let no_session = auth_service::verify_otp(&state, None, "123456", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(no_session, AppError::SessionExpired));

    let ghost = PendingLogin {
        user_id: Uuid::new_v4(),
        email: "ghost@example.com".into(),
    };
    let gone = auth_service::verify_otp(&state, Some(&ghost), "123456", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(gone, AppError::SessionExpired));
    Ok(())
}

#[tokio::test]
async fn mail_failures() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Arc::new(FailingMailer)).await?;
    let email = unique_email("nomail");

    // welcome mail failure still creates the account
    let registration =
        auth_service::register_user(&state, register_form(&email, "pass1234", "pass1234")).await?;
    assert!(!registration.welcome_email_sent);

    let err = auth_service::begin_login(&state, login_form(&email, "pass1234"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmailDeliveryFailure(_)));

    // the issued code stays committed
    let (otp,): (Option<String>,) =
        sqlx::query_as("SELECT otp FROM user_profiles WHERE user_id = $1")
            .bind(registration.user.id)
            .fetch_one(&state.pool)
            .await?;
    assert!(otp.is_some_and(|code| code.len() == 6));
    Ok(())
}
