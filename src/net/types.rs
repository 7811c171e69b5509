//! Shared wire DTOs for the client/server boundary.
//!
//! DESIGN
//! ======
//! The login endpoint has answered in two shapes over time: a flat
//! `{token, type, id, username, email}` record and `{token, user: {...}}`.
//! [`LoginResponse`] accepts both and [`LoginResponse::into_grant`] folds them
//! into one canonical [`LoginGrant`] so nothing past this module has to care.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// An authenticated user as returned by `/api/user/profile` and the login endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Numeric user identifier.
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Contact email, if the server sent one.
    #[serde(default)]
    pub email: Option<String>,
}

/// `POST /api/auth/login` request body.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// `POST /api/auth/register` request body.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub email: &'a str,
}

/// Successful login payload in either of its two shapes.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LoginResponse {
    /// `{token, user: {id, username, email}}`
    Embedded { token: String, user: User },
    /// `{token, type, id, username, email}`
    Flat {
        token: String,
        #[serde(rename = "type", default)]
        token_type: Option<String>,
        #[serde(deserialize_with = "deserialize_i64_from_number")]
        id: i64,
        username: String,
        #[serde(default)]
        email: Option<String>,
    },
}

/// Canonical result of a login: the token plus the user it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginGrant {
    pub token: String,
    pub user: User,
}

impl LoginResponse {
    /// Normalize either response shape into a [`LoginGrant`].
    #[must_use]
    pub fn into_grant(self) -> LoginGrant {
        match self {
            Self::Embedded { token, user } => LoginGrant { token, user },
            Self::Flat { token, id, username, email, .. } => LoginGrant { token, user: User { id, username, email } },
        }
    }
}

/// `{message}` body used by the register endpoint and by error responses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Attachment category; the server only emits `NOTE` and `EXAM`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttachmentCategory {
    Note,
    Exam,
    #[serde(other)]
    Other,
}

/// A file attached to a course resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub id: i64,
    /// Original upload file name.
    pub name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Size in bytes.
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub size: i64,
    pub category: AttachmentCategory,
}

/// A shared course resource with its attachments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub id: i64,
    /// Course name.
    pub title: String,
    #[serde(default)]
    pub college: Option<String>,
    /// Username of the uploader, absent for anonymous uploads.
    #[serde(default)]
    pub uploader: Option<String>,
    /// ISO 8601 creation instant.
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// One page of search results. `page` is 1-based.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub page: i64,
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub size: i64,
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub total_elements: i64,
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub total_pages: i64,
}

fn deserialize_i64_from_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                return Ok(int);
            }
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            if let Some(float) = number.as_f64()
                && float.is_finite()
                && float.fract() == 0.0
                && float >= i64::MIN as f64
                && float <= i64::MAX as f64
            {
                return Ok(float as i64);
            }
            Err(D::Error::custom("expected integer-compatible number"))
        }
        serde_json::Value::String(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| D::Error::custom(format!("expected numeric string, got {raw:?}"))),
        _ => Err(D::Error::custom("expected number")),
    }
}
