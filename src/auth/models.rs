use std::fmt;

use serde::{Deserialize, Serialize};

/// Authorization role carried in tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::User => f.write_str("user"),
        }
    }
}

/// A seeded login credential. Never serialized to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub id: u64,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

impl CredentialRecord {
    /// Redacted view without the password hash
    pub fn public_user(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// Identity fields safe to return to clients and embed in tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: u64,
    pub username: String,
    pub role: Role,
}

/// Claims embedded in a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet {
    pub id: u64,
    pub username: String,
    pub role: Role,

    /// Issued at (Unix seconds)
    #[serde(rename = "iat")]
    pub issued_at: u64,

    /// Expiration time (Unix seconds)
    #[serde(rename = "exp")]
    pub expires_at: u64,
}

impl ClaimSet {
    pub fn user(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// `POST /login` body. Fields are optional so missing ones surface as validation errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: ClaimSet,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), json!("admin"));
        assert_eq!(serde_json::from_value::<Role>(json!("user")).unwrap(), Role::User);
        assert!(serde_json::from_value::<Role>(json!("root")).is_err());
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_claims_use_jwt_timestamp_names() {
        let claims = ClaimSet {
            id: 1,
            username: "admin".into(),
            role: Role::Admin,
            issued_at: 100,
            expires_at: 200,
        };
        assert_eq!(
            serde_json::to_value(&claims).unwrap(),
            json!({ "id": 1, "username": "admin", "role": "admin", "iat": 100, "exp": 200 })
        );
    }

    #[test]
    fn test_public_user_has_no_hash() {
        let record = CredentialRecord {
            id: 7,
            username: "alice".into(),
            password_hash: "$2b$04$secret".into(),
            role: Role::User,
        };
        let json = serde_json::to_string(&record.public_user()).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn test_login_request_tolerates_missing_fields() {
        let request: LoginRequest = serde_json::from_value(json!({ "username": "admin" })).unwrap();
        assert_eq!(request.username.as_deref(), Some("admin"));
        assert!(request.password.is_none());
    }
}
