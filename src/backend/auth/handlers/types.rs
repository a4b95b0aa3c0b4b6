/**
 * Authentication Handler Types
 */
use serde::{Deserialize, Serialize};

/// Login request
#[derive(Deserialize, Serialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    /// Plain-text password, verified against the stored bcrypt hash
    pub password: String,
}

/// Login response; the session token itself travels in the cookie
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub message: String,
    pub nickname: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    pub nickname: String,
}
