use serde::{Deserialize, Serialize};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for Google sign-in.
#[derive(Debug, Deserialize)]
pub struct GoogleLoginRequest {
    #[serde(rename = "idToken", default)]
    pub id_token: String,
}

/// Response returned after register, login or Google sign-in.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}
