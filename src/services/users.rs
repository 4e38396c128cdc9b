use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::models::Role;
use crate::core::server::{health, with_common_layers};
use crate::error::FieldError;
use crate::services::validation::BodyFields;
use crate::services::{create, fetch, list, remove, update, Record, RecordStore};

/// A user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct UserDraft {
    pub username: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl Record for User {
    type Draft = UserDraft;
    type Patch = UserPatch;
    const KIND: &'static str = "User";

    fn id(&self) -> u64 {
        self.id
    }

    fn from_draft(id: u64, draft: UserDraft) -> Self {
        User {
            id,
            username: draft.username,
            email: draft.email,
            role: draft.role,
        }
    }

    fn apply(&mut self, patch: UserPatch) {
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
    }

    fn parse_draft(body: &Value) -> Result<UserDraft, Vec<FieldError>> {
        let mut fields = BodyFields::for_create(body);
        let username = fields.non_empty_string("username");
        let email = fields.email("email");
        let role = fields.optional::<Role>("role");
        fields.finish()?;

        Ok(UserDraft {
            username: username.unwrap_or_default(),
            email: email.unwrap_or_default(),
            role: role.unwrap_or_default(),
        })
    }

    fn parse_patch(body: &Value) -> Result<UserPatch, Vec<FieldError>> {
        let mut fields = BodyFields::for_update(body);
        let patch = UserPatch {
            username: fields.non_empty_string("username"),
            email: fields.email("email"),
            role: fields.optional("role"),
        };
        fields.finish()?;
        Ok(patch)
    }
}

/// Users present at startup
pub fn seed_users() -> Vec<User> {
    vec![
        User {
            id: 1,
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            role: Role::Admin,
        },
        User {
            id: 2,
            username: "user1".to_string(),
            email: "user1@example.com".to_string(),
            role: Role::User,
        },
    ]
}

pub fn user_routes(store: Arc<RecordStore<User>>) -> Router {
    Router::new()
        .route("/health", health("user-service"))
        .route("/", get(list::<User>).post(create::<User>))
        .route(
            "/:id",
            get(fetch::<User>).put(update::<User>).delete(remove::<User>),
        )
        .layer(Extension(store))
}

/// User service application with the shared layers
pub fn app(store: Arc<RecordStore<User>>) -> Router {
    with_common_layers(user_routes(store))
}
