use crate::auth::token::TokenRecord;
use crate::error::DrivePushError;

/// Short-lived bearer handle for the Drive client. Built once per run from
/// a token the flow engine already validated; never persisted.
#[derive(Debug, Clone)]
pub struct AuthSession {
    access_token: String,
}

impl AuthSession {
    pub fn bearer_token(&self) -> &str {
        &self.access_token
    }
}

pub fn build_session(token: &TokenRecord) -> Result<AuthSession, DrivePushError> {
    if token.access_token.is_empty() {
        return Err(DrivePushError::InvalidTokenRecord(
            "access token is empty".into(),
        ));
    }
    if token.is_expired() {
        return Err(DrivePushError::InvalidTokenRecord(
            "access token is already expired".into(),
        ));
    }
    Ok(AuthSession {
        access_token: token.access_token.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(access: &str, expiry: Option<chrono::DateTime<Utc>>) -> TokenRecord {
        TokenRecord {
            access_token: access.into(),
            refresh_token: None,
            scopes: vec![],
            expiry,
            client_id: "cid".into(),
            client_secret: "cs".into(),
        }
    }

    #[test]
    fn builds_from_a_usable_token() {
        let session =
            build_session(&record("at", Some(Utc::now() + chrono::Duration::hours(1)))).unwrap();
        assert_eq!(session.bearer_token(), "at");
    }

    #[test]
    fn rejects_empty_access_token() {
        let err = build_session(&record("", None)).unwrap_err();
        assert!(matches!(err, DrivePushError::InvalidTokenRecord(_)));
    }

    #[test]
    fn rejects_expired_token() {
        let err = build_session(&record("at", Some(Utc::now() - chrono::Duration::hours(1))))
            .unwrap_err();
        assert!(matches!(err, DrivePushError::InvalidTokenRecord(_)));
    }
}
