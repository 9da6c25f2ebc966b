use std::fmt;

use serde::{Deserialize, Serialize};

/// Role stored on a membership row. Owners never carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    View,
    Edit,
}

impl MemberRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            MemberRole::View => "view",
            MemberRole::Edit => "edit",
        }
    }

    /// Converts a stored role string to its variant.
    pub fn parse(s: &str) -> Option<MemberRole> {
        match s {
            "view" => Some(MemberRole::View),
            "edit" => Some(MemberRole::Edit),
            _ => None,
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl rusqlite::types::ToSql for MemberRole {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl rusqlite::types::FromSql for MemberRole {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        let s = value.as_str()?;
        MemberRole::parse(s).ok_or_else(|| {
            rusqlite::types::FromSqlError::Other(format!("unknown member role: {s}").into())
        })
    }
}

/// The authority a user holds over a pantry at the moment of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectiveRole {
    Owner,
    Editor,
    Viewer,
    None,
}

impl EffectiveRole {
    #[must_use]
    pub const fn can_view(self) -> bool {
        !matches!(self, EffectiveRole::None)
    }

    /// Owners and editors may change items.
    #[must_use]
    pub const fn can_edit(self) -> bool {
        matches!(self, EffectiveRole::Owner | EffectiveRole::Editor)
    }

    /// Only owners may share, change roles, remove members or delete.
    #[must_use]
    pub const fn can_manage(self) -> bool {
        matches!(self, EffectiveRole::Owner)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            EffectiveRole::Owner => "owner",
            EffectiveRole::Editor => "editor",
            EffectiveRole::Viewer => "viewer",
            EffectiveRole::None => "none",
        }
    }
}

impl From<MemberRole> for EffectiveRole {
    fn from(role: MemberRole) -> Self {
        match role {
            MemberRole::View => EffectiveRole::Viewer,
            MemberRole::Edit => EffectiveRole::Editor,
        }
    }
}

impl From<Option<MemberRole>> for EffectiveRole {
    fn from(role: Option<MemberRole>) -> Self {
        role.map_or(EffectiveRole::None, EffectiveRole::from)
    }
}

impl fmt::Display for EffectiveRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
