use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Duration, Utc};
use password_hash::rand_core::OsRng;
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait, sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::auth::{LoginForm, RegisterForm},
    entity::{
        user_profiles::{self, ActiveModel as ProfileActive, Entity as UserProfiles},
        users::{self, Entity as Users},
    },
    error::{AppError, AppResult, is_unique_violation},
    models::User,
    services::email_service::{otp_email, welcome_email},
    session::{CurrentUser, PendingLogin},
    state::AppState,
};

/// How long an issued login code stays valid.
pub const OTP_VALIDITY_MINUTES: i64 = 10;

pub fn generate_otp() -> String {
    let code: u32 = rand::rng().random_range(0..1_000_000);
    format!("{code:06}")
}

/// A code is expired once strictly more than the validity window has passed.
pub fn otp_expired(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - created_at > Duration::minutes(OTP_VALIDITY_MINUTES)
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug)]
pub struct Registration {
    pub user: User,
    pub welcome_email_sent: bool,
}

pub async fn register_user(state: &AppState, form: RegisterForm) -> AppResult<Registration> {
    let email = normalize_email(&form.email);
    let name = form.name.trim().to_string();
    let phone = form.phone.trim().to_string();

    if email.is_empty() || form.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required.".into(),
        ));
    }
    if form.password != form.confirm_password {
        return Err(AppError::PasswordMismatch);
    }

    let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(&state.pool)
        .await?;
    if exist.is_some() {
        return Err(AppError::DuplicateRegistration);
    }

    let password_hash = hash_password(&form.password)?;

    let mut tx = state.pool.begin().await?;
    let inserted = sqlx::query_as::<_, (Uuid, chrono::DateTime<Utc>)>(
        "INSERT INTO users (id, email, name, password_hash) VALUES ($1, $2, $3, $4) RETURNING id, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(email.as_str())
    .bind(name.as_str())
    .bind(password_hash)
    .fetch_one(&mut *tx)
    .await;

    // A concurrent registration can slip past the existence check; the unique index decides.
    let (user_id, created_at) = match inserted {
        Ok(row) => row,
        Err(err) if is_unique_violation(&err) => return Err(AppError::DuplicateRegistration),
        Err(err) => return Err(err.into()),
    };

    sqlx::query("INSERT INTO user_profiles (id, user_id, phone) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(phone.as_str())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(user_id = %user_id, "user registered");
    audit::record(
        &state.pool,
        Some(user_id),
        AuditAction::UserRegister,
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    let (subject, body) = welcome_email(&name, &email, &phone);
    let welcome_email_sent = match state.mailer.send(&email, &subject, &body).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, user_id = %user_id, "welcome email failed");
            false
        }
    };

    Ok(Registration {
        user: User {
            id: user_id,
            email,
            name,
            is_staff: false,
            created_at,
        },
        welcome_email_sent,
    })
}

/// Step one of login: check credentials, issue a fresh code and mail it.
///
/// The code is committed before the mail is sent, so a transport error that
/// still delivered the message leaves a usable code behind.
pub async fn begin_login(state: &AppState, form: LoginForm) -> AppResult<PendingLogin> {
    let email = normalize_email(&form.email);
    let user = Users::find()
        .filter(users::Column::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::UnknownAccount)?;

    if !verify_password(&form.password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    let code = issue_otp(state, user.id, Utc::now()).await?;

    let (subject, body) = otp_email(&user.name, &code, OTP_VALIDITY_MINUTES);
    if let Err(err) = state.mailer.send(&user.email, &subject, &body).await {
        tracing::error!(error = %err, user_id = %user.id, "OTP email failed");
        return Err(AppError::EmailDeliveryFailure(err));
    }

    audit::record(
        &state.pool,
        Some(user.id),
        AuditAction::OtpIssued,
        "user_profiles",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(PendingLogin {
        user_id: user.id,
        email: user.email,
    })
}

/// Store a new code on the user's profile, replacing any earlier one.
/// The profile row is locked so concurrent logins for one account serialize.
pub async fn issue_otp(state: &AppState, user_id: Uuid, now: DateTime<Utc>) -> AppResult<String> {
    let code = generate_otp();
    let txn = state.orm.begin().await?;

    let profile = UserProfiles::find()
        .filter(user_profiles::Column::UserId.eq(user_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?;

    match profile {
        Some(profile) => {
            let mut active: ProfileActive = profile.into();
            active.otp = Set(Some(code.clone()));
            active.otp_created_at = Set(Some(now.into()));
            active.otp_verified = Set(false);
            active.update(&txn).await?;
        }
        None => {
            ProfileActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                phone: Set(String::new()),
                otp: Set(Some(code.clone())),
                otp_created_at: Set(Some(now.into())),
                otp_verified: Set(false),
            }
            .insert(&txn)
            .await?;
        }
    }

    txn.commit().await?;
    tracing::debug!(user_id = %user_id, "OTP issued");
    Ok(code)
}

/// Step two of login: check the submitted code against the latest one issued.
///
/// A wrong code leaves the stored code and its timer untouched. An expired
/// code is cleared and the caller must restart from the credential check.
pub async fn verify_otp(
    state: &AppState,
    pending: Option<&PendingLogin>,
    submitted: &str,
    now: DateTime<Utc>,
) -> AppResult<CurrentUser> {
    let pending = pending.ok_or(AppError::SessionExpired)?;

    let txn = state.orm.begin().await?;
    let user = Users::find_by_id(pending.user_id)
        .one(&txn)
        .await?
        .ok_or(AppError::SessionExpired)?;

    let profile = UserProfiles::find()
        .filter(user_profiles::Column::UserId.eq(user.id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::SessionExpired)?;

    if let Some(created_at) = profile.otp_created_at {
        if otp_expired(created_at.with_timezone(&Utc), now) {
            let mut active: ProfileActive = profile.into();
            active.otp = Set(None);
            active.update(&txn).await?;
            txn.commit().await?;
            tracing::info!(user_id = %user.id, "OTP expired");
            return Err(AppError::OtpExpired);
        }
    }

    let matches = profile
        .otp
        .as_deref()
        .is_some_and(|stored| stored == submitted.trim());
    if !matches {
        tracing::info!(user_id = %user.id, "OTP mismatch");
        return Err(AppError::OtpInvalid);
    }

    let mut active: ProfileActive = profile.into();
    active.otp = Set(None);
    active.otp_verified = Set(true);
    active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.id),
        AuditAction::UserLogin,
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(CurrentUser {
        id: user.id,
        email: user.email,
        name: user.name,
        is_staff: user.is_staff,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_otp_is_six_digits() {
        for _ in 0..50 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn otp_valid_at_exactly_ten_minutes() {
        let issued = Utc::now();
        assert!(!otp_expired(issued, issued + Duration::minutes(10)));
    }

    #[test]
    fn otp_expired_just_after_window() {
        let issued = Utc::now();
        assert!(otp_expired(
            issued,
            issued + Duration::minutes(10) + Duration::seconds(1)
        ));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22").expect("hash");
        assert!(verify_password("hunter22", &hash).expect("verify"));
        assert!(!verify_password("hunter23", &hash).expect("verify"));
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  A@X.com "), "a@x.com");
    }
}
