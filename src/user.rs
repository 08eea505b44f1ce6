use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::BackendError;

/// An ID in the `users` table.
pub type UserId = i64;

/// An account that can create play records.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

const TOKEN_SCHEME: &str = "Token";

/// Extracts the token from an `Authorization: Token <uuid>` header.
pub fn parse_authorization(header: Option<&str>) -> Result<Uuid, BackendError> {
    let header = header.ok_or(BackendError::MissingCredentials)?;
    let mut parts = header.split_whitespace();

    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case(TOKEN_SCHEME) => {
            Uuid::parse_str(token).map_err(|_| BackendError::InvalidToken)
        }
        _ => Err(BackendError::InvalidToken),
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::parse_authorization;
    use crate::errors::BackendError;

    #[test]
    fn token_header_is_parsed() {
        let token = Uuid::new_v4();
        let header = format!("Token {}", token);

        assert_eq!(parse_authorization(Some(&header)).expect("parse header"), token);
    }

    #[test]
    fn missing_header_is_reported_separately() {
        assert!(matches!(
            parse_authorization(None),
            Err(BackendError::MissingCredentials)
        ));
    }

    #[test]
    fn malformed_headers_are_invalid() {
        for header in &["Token", "Bearer abc", "Token not-a-uuid", "Token a b"] {
            assert!(matches!(
                parse_authorization(Some(*header)),
                Err(BackendError::InvalidToken)
            ));
        }
    }
}
