use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub login: String,
    pub email: String,
    pub password: String,
}

/// `login` accepts either the login or the email.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username", alias = "email")]
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub login: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct TokenValidation {
    pub message: &'static str,
    pub user_id: Uuid,
    pub login: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_accepts_username_or_email_field() {
        let a: LoginRequest = serde_json::from_str(r#"{"username":"kim","password":"x"}"#).unwrap();
        let b: LoginRequest =
            serde_json::from_str(r#"{"email":"kim@example.com","password":"x"}"#).unwrap();
        assert_eq!(a.login, "kim");
        assert_eq!(b.login, "kim@example.com");
    }

    #[test]
    fn auth_response_is_bearer() {
        let resp = AuthResponse {
            access_token: "a".into(),
            refresh_token: "r".into(),
            token_type: "bearer",
            user: PublicUser {
                id: Uuid::nil(),
                login: "kim".into(),
                email: "kim@example.com".into(),
            },
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["token_type"], "bearer");
        assert_eq!(json["user"]["login"], "kim");
    }
}
