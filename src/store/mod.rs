mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    /// Case-insensitive; `email` is normalized before lookup.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>>;
    fn delete_user(&self, id: &str) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>>;
    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Pantry operations
    fn create_pantry(&self, pantry: &Pantry) -> Result<()>;
    fn get_pantry(&self, id: &str) -> Result<Option<Pantry>>;
    fn list_owned_pantries(&self, owner_id: &str) -> Result<Vec<Pantry>>;
    fn list_shared_pantries(&self, user_id: &str) -> Result<Vec<(Pantry, MemberRole)>>;
    /// Removes the pantry with its memberships and items in one transaction.
    fn delete_pantry_cascade(&self, id: &str) -> Result<bool>;

    // Membership operations
    fn get_membership(&self, pantry_id: &str, user_id: &str) -> Result<Option<PantryMember>>;
    /// Inserts or overwrites the role keyed on (pantry_id, user_id).
    /// Returns true if a new row was created.
    fn upsert_membership(&self, member: &PantryMember) -> Result<bool>;
    fn update_membership_role(&self, pantry_id: &str, user_id: &str, role: MemberRole)
    -> Result<bool>;
    fn delete_membership(&self, pantry_id: &str, user_id: &str) -> Result<bool>;
    fn list_memberships(&self, pantry_id: &str) -> Result<Vec<MemberWithEmail>>;
    fn count_memberships(&self, pantry_id: &str) -> Result<u32>;

    // Item operations
    fn create_item(&self, item: &PantryItem) -> Result<()>;
    fn get_item(&self, id: &str) -> Result<Option<PantryItem>>;
    fn list_items(&self, pantry_id: &str) -> Result<Vec<PantryItem>>;
    fn update_item(&self, item: &PantryItem) -> Result<()>;
    fn delete_item(&self, id: &str) -> Result<bool>;

    // Admin token check
    fn has_admin_token(&self) -> Result<bool>;
}

/// Trims and lowercases an email for storage and lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
