use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct VerifyOtpForm {
    pub otp: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyOtpPage {
    /// Address the code was sent to.
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthPage {
    pub page: String,
}
