use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use sea_orm::EntityTrait;
use tower_sessions::Session;

use crate::{
    entity::users::Entity as Users,
    error::AppError,
    session::{CurrentUser, FlashLevel, keys, push_flash},
    state::AppState,
};

pub const LOGIN_PATH: &str = "/login/";
pub const HOME_PATH: &str = "/";

/// The authenticated user of the current session.
///
/// Anonymous requests are redirected to the login page.
#[derive(Debug, Clone)]
pub struct AuthUser(pub CurrentUser);

#[derive(Debug)]
pub enum AuthRejection {
    Anonymous,
    Session(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Anonymous => Redirect::to(LOGIN_PATH).into_response(),
            AuthRejection::Session(err) => err.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AuthRejection::Session(AppError::Internal(anyhow::anyhow!(msg))))?;

        session
            .get::<CurrentUser>(keys::CURRENT_USER)
            .await
            .map_err(|e| AuthRejection::Session(e.into()))?
            .map(AuthUser)
            .ok_or(AuthRejection::Anonymous)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaffAccess {
    Granted(CurrentUser),
    Anonymous,
    Forbidden,
}

/// Decide admin access from the session user and the staff flag currently stored
/// for that account. `None` for the flag means the account no longer exists.
pub fn authorize_staff(user: Option<CurrentUser>, is_staff_now: Option<bool>) -> StaffAccess {
    match (user, is_staff_now) {
        (None, _) | (Some(_), None) => StaffAccess::Anonymous,
        (Some(user), Some(true)) => StaffAccess::Granted(CurrentUser {
            is_staff: true,
            ..user
        }),
        (Some(_), Some(false)) => StaffAccess::Forbidden,
    }
}

/// Guard for the back-office routes.
///
/// The staff flag is re-read from the database so a revoked account loses
/// access without having to log out.
pub async fn require_staff(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let user = match session.get::<CurrentUser>(keys::CURRENT_USER).await {
        Ok(user) => user,
        Err(err) => return AppError::from(err).into_response(),
    };

    let is_staff_now = match &user {
        Some(user) => match Users::find_by_id(user.id).one(&state.orm).await {
            Ok(found) => found.map(|u| u.is_staff),
            Err(err) => return AppError::from(err).into_response(),
        },
        None => None,
    };

    match authorize_staff(user, is_staff_now) {
        StaffAccess::Granted(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        StaffAccess::Anonymous => Redirect::to(LOGIN_PATH).into_response(),
        StaffAccess::Forbidden => {
            tracing::warn!(path = %request.uri().path(), "non-staff user denied admin access");
            if let Err(err) =
                push_flash(&session, FlashLevel::Error, AppError::NotAuthorized.to_string()).await
            {
                tracing::warn!(error = %err, "failed to store flash message");
            }
            Redirect::to(HOME_PATH).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{StatusCode, header};
    use uuid::Uuid;

    fn user(is_staff: bool) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "someone@example.com".into(),
            name: "Someone".into(),
            is_staff,
        }
    }

    #[test]
    fn anonymous_visitor_is_sent_to_login() {
        assert_eq!(authorize_staff(None, None), StaffAccess::Anonymous);
    }

    #[test]
    fn customer_is_forbidden() {
        assert_eq!(
            authorize_staff(Some(user(false)), Some(false)),
            StaffAccess::Forbidden
        );
    }

    #[test]
    fn stale_staff_flag_in_session_is_not_trusted() {
        assert_eq!(
            authorize_staff(Some(user(true)), Some(false)),
            StaffAccess::Forbidden
        );
    }

    #[test]
    fn promoted_account_is_granted() {
        let access = authorize_staff(Some(user(false)), Some(true));
        assert!(matches!(access, StaffAccess::Granted(u) if u.is_staff));
    }

    #[test]
    fn deleted_account_counts_as_anonymous() {
        assert_eq!(
            authorize_staff(Some(user(true)), None),
            StaffAccess::Anonymous
        );
    }

    #[test]
    fn anonymous_rejection_redirects_to_login() {
        let response = AuthRejection::Anonymous.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], LOGIN_PATH);
    }
}
