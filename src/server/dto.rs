use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{ItemUpdate, NewItem};
use crate::types::{MemberRole, Token};

/// Role flags a client may send along with a request, usually echoed from an
/// earlier response. They never influence authorization; the role is always
/// re-derived server-side.
#[derive(Debug, Default, Deserialize)]
pub struct ClientHints {
    #[serde(default)]
    pub is_owner: Option<bool>,
    #[serde(default)]
    pub can_edit: Option<bool>,
}

impl ClientHints {
    pub fn log_ignored(&self, op: &str) {
        if self.is_owner.is_some() || self.can_edit.is_some() {
            tracing::debug!(
                op,
                is_owner = ?self.is_owner,
                can_edit = ?self.can_edit,
                "ignoring client-supplied role hints"
            );
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePantryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub hints: ClientHints,
}

#[derive(Debug, Deserialize)]
pub struct InviteMemberRequest {
    pub email: String,
    pub role: MemberRole,
    #[serde(flatten)]
    pub hints: ClientHints,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: MemberRole,
    #[serde(flatten)]
    pub hints: ClientHints,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    #[serde(flatten)]
    pub item: NewItem,
    #[serde(flatten)]
    pub hints: ClientHints,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(flatten)]
    pub update: ItemUpdate,
    #[serde(flatten)]
    pub hints: ClientHints,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserTokenRequest {
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        Self {
            id: token.id,
            is_admin: token.is_admin,
            user_id: token.user_id,
            created_at: token.created_at,
            expires_at: token.expires_at,
            last_used_at: token.last_used_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub metadata: TokenResponse,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hints_parse_alongside_payload() {
        let req: InviteMemberRequest = serde_json::from_str(
            r#"{"email": "a@x.com", "role": "edit", "is_owner": true, "can_edit": true}"#,
        )
        .unwrap();
        assert_eq!(req.role, MemberRole::Edit);
        assert_eq!(req.hints.is_owner, Some(true));
    }

    #[test]
    fn test_item_payload_with_hints() {
        let req: AddItemRequest = serde_json::from_str(
            r#"{"name": "Rice", "quantity": 2, "unit": "kg", "can_edit": true}"#,
        )
        .unwrap();
        assert_eq!(req.item.name, "Rice");
        assert_eq!(req.item.quantity, Some(2.0));
        assert_eq!(req.hints.can_edit, Some(true));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result: Result<ChangeRoleRequest, _> = serde_json::from_str(r#"{"role": "owner"}"#);
        assert!(result.is_err());
    }
}
