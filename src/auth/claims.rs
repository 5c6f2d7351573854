use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[serde(alias = "Access")]
    Access,
    #[serde(alias = "Refresh")]
    Refresh,
}

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,       // user ID
    pub jti: Uuid,       // token ID, key of the logout deny-list
    pub iat: usize,      // issued at (unix timestamp)
    pub exp: usize,      // expires at (unix timestamp)
    pub iss: String,     // issuer
    pub aud: String,     // audience
    pub kind: TokenKind, // access or refresh
}

impl Claims {
    /// Seconds until expiry, zero once expired.
    pub fn remaining_secs(&self, now_unix: i64) -> u64 {
        (self.exp as i64 - now_unix).max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_is_clamped_at_zero() {
        let claims = Claims {
            sub: Uuid::nil(),
            jti: Uuid::nil(),
            iat: 100,
            exp: 160,
            iss: "i".into(),
            aud: "a".into(),
            kind: TokenKind::Access,
        };
        assert_eq!(claims.remaining_secs(100), 60);
        assert_eq!(claims.remaining_secs(500), 0);
    }

    #[test]
    fn kind_accepts_capitalized_alias() {
        let kind: TokenKind = serde_json::from_str("\"Refresh\"").unwrap();
        assert_eq!(kind, TokenKind::Refresh);
        assert_eq!(serde_json::to_string(&TokenKind::Access).unwrap(), "\"access\"");
    }
}
