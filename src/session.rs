//! Typed data kept in the server-side session.
//!
//! The login flow moves a visitor from [`PendingLogin`] (credentials checked,
//! OTP sent) to [`CurrentUser`] (OTP verified). Flash messages survive one
//! redirect and are drained by the next page render.

use serde::{Deserialize, Serialize};
use tower_sessions::{Session, session::Error as SessionError};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod keys {
    /// Account whose OTP is awaiting verification.
    pub const PENDING_LOGIN: &str = "pending_login";
    /// Fully authenticated user.
    pub const CURRENT_USER: &str = "current_user";
    /// Queued flash messages.
    pub const FLASH: &str = "flash";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_staff: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

impl FlashMessage {
    pub fn new(level: FlashLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Queue a message for the next rendered page.
pub async fn push_flash(
    session: &Session,
    level: FlashLevel,
    text: impl Into<String>,
) -> Result<(), SessionError> {
    let mut messages: Vec<FlashMessage> = session.get(keys::FLASH).await?.unwrap_or_default();
    messages.push(FlashMessage::new(level, text));
    session.insert(keys::FLASH, messages).await
}

/// Drain queued messages. A broken session yields no messages rather than an error page.
pub async fn take_flash(session: &Session) -> Vec<FlashMessage> {
    match session.remove::<Vec<FlashMessage>>(keys::FLASH).await {
        Ok(messages) => messages.unwrap_or_default(),
        Err(err) => {
            tracing::warn!(error = %err, "failed to read flash messages");
            Vec::new()
        }
    }
}

pub async fn pending_login(session: &Session) -> Result<Option<PendingLogin>, SessionError> {
    session.get(keys::PENDING_LOGIN).await
}

pub async fn set_pending_login(
    session: &Session,
    pending: &PendingLogin,
) -> Result<(), SessionError> {
    session.insert(keys::PENDING_LOGIN, pending).await
}

pub async fn clear_pending_login(session: &Session) -> Result<(), SessionError> {
    session.remove::<PendingLogin>(keys::PENDING_LOGIN).await?;
    Ok(())
}

/// Promote the session to authenticated. The id is cycled so a pre-login
/// session id cannot be reused after the OTP is accepted.
pub async fn establish(session: &Session, user: &CurrentUser) -> Result<(), SessionError> {
    session.cycle_id().await?;
    clear_pending_login(session).await?;
    session.insert(keys::CURRENT_USER, user).await
}

/// Drop every authentication marker. Safe to call on an anonymous session.
pub async fn terminate(session: &Session) -> Result<(), SessionError> {
    session.remove::<CurrentUser>(keys::CURRENT_USER).await?;
    clear_pending_login(session).await?;
    session.cycle_id().await
}
