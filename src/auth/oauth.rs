//! Google OAuth2 authorization-code flow.

use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{error, info};

use crate::{
    config::GoogleConfig,
    error::{AppError, AppResult},
};

const SCOPE: &str = "openid email profile";

#[derive(Clone)]
pub struct GoogleClient {
    http: Client,
    config: GoogleConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUserInfo {
    pub sub: String,
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
}

impl GoogleClient {
    pub fn new(config: GoogleConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build oauth http client")?;
        Ok(Self { http, config })
    }

    pub fn authorization_url(&self, state: &str) -> AppResult<String> {
        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPE),
                ("state", state),
            ],
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid GOOGLE_AUTH_URL: {e}")))?;
        Ok(url.into())
    }

    pub async fn exchange_code(&self, code: &str) -> AppResult<String> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let res = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(dependency("token exchange"))?;

        if !res.status().is_success() {
            error!(status = %res.status(), "oauth token exchange rejected");
            return Err(AppError::Dependency("Failed to exchange code for token".into()));
        }
        let body: TokenResponse = res.json().await.map_err(dependency("token exchange"))?;
        body.access_token
            .ok_or_else(|| AppError::Dependency("Failed to fetch access token".into()))
    }

    pub async fn user_info(&self, access_token: &str) -> AppResult<GoogleUserInfo> {
        let res = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(dependency("userinfo"))?;

        if !res.status().is_success() {
            error!(status = %res.status(), "oauth userinfo rejected");
            return Err(AppError::Dependency("Failed to fetch user info".into()));
        }
        let info: GoogleUserInfo = res.json().await.map_err(dependency("userinfo"))?;
        info!(sub = %info.sub, "google user info fetched");
        Ok(info)
    }
}

fn dependency(step: &'static str) -> impl Fn(reqwest::Error) -> AppError {
    move |e| {
        error!(error = %e, step, "oauth provider call failed");
        AppError::Dependency(format!("OAuth provider error during {step}"))
    }
}

/// Login for a federated account: the email's local part, restricted to the
/// characters allowed in logins.
pub fn login_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let cleaned: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    if cleaned.is_empty() {
        "user".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GoogleClient {
        GoogleClient::new(GoogleConfig {
            client_id: "cid".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost:8080/api/v1/auth/google/callback".into(),
            auth_url: "https://accounts.example.com/o/oauth2/v2/auth".into(),
            token_url: "https://oauth.example.com/token".into(),
            userinfo_url: "https://oauth.example.com/userinfo".into(),
        })
        .unwrap()
    }

    #[test]
    fn authorization_url_carries_flow_params() {
        let url = Url::parse(&client().authorization_url("xyz").unwrap()).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".into(), "cid".into())));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs.contains(&("scope".into(), "openid email profile".into())));
        assert!(pairs.contains(&("state".into(), "xyz".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "http://localhost:8080/api/v1/auth/google/callback".into()
        )));
    }

    #[test]
    fn login_is_local_part_of_email() {
        assert_eq!(login_from_email("jane.doe@gmail.com"), "jane.doe");
        assert_eq!(login_from_email("jo+tag@gmail.com"), "jotag");
        assert_eq!(login_from_email("@gmail.com"), "user");
    }

    #[test]
    fn userinfo_parses_google_payload() {
        let info: GoogleUserInfo = serde_json::from_str(
            r#"{"sub":"1093","email":"jane@gmail.com","email_verified":true,"name":"Jane","picture":"x"}"#,
        )
        .unwrap();
        assert_eq!(info.email.as_deref(), Some("jane@gmail.com"));
        assert_eq!(info.email_verified, Some(true));
    }
}
