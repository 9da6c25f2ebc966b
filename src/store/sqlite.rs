use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::schema::SCHEMA;
use super::{Store, normalize_email};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Holds the connection lock, stalling every other store call.
    #[cfg(test)]
    pub(crate) fn hold_connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

const USER_COLUMNS: &str = "id, email, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        created_at: parse_datetime(&row.get::<_, String>(2)?),
    })
}

const TOKEN_COLUMNS: &str =
    "id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at";

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        is_admin: row.get(3)?,
        user_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
    })
}

const PANTRY_COLUMNS: &str = "p.id, p.name, p.description, p.owner_id, p.created_at";

fn pantry_from_row(row: &Row<'_>) -> rusqlite::Result<Pantry> {
    Ok(Pantry {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        owner_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

const ITEM_COLUMNS: &str = "id, pantry_id, name, quantity, unit, category, avg_price, location, created_at, updated_at";

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<PantryItem> {
    Ok(PantryItem {
        id: row.get(0)?,
        pantry_id: row.get(1)?,
        name: row.get(2)?,
        quantity: row.get(3)?,
        unit: row.get(4)?,
        category: row.get(5)?,
        avg_price: row.get(6)?,
        location: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (id, email, created_at) VALUES (?1, ?2, ?3)",
            params![
                user.id,
                normalize_email(&user.email),
                format_datetime(&user.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![normalize_email(email)],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id > ?1 ORDER BY id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_user(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::TokenLookupCollision)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE id = ?1"),
            params![id],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_lookup = ?1"),
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE id > ?1 ORDER BY id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], token_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map(params![user_id], token_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // Pantry operations

    fn create_pantry(&self, pantry: &Pantry) -> Result<()> {
        self.conn().execute(
            "INSERT INTO pantries (id, name, description, owner_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                pantry.id,
                pantry.name,
                pantry.description,
                pantry.owner_id,
                format_datetime(&pantry.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_pantry(&self, id: &str) -> Result<Option<Pantry>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PANTRY_COLUMNS} FROM pantries p WHERE p.id = ?1"),
            params![id],
            pantry_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_owned_pantries(&self, owner_id: &str) -> Result<Vec<Pantry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PANTRY_COLUMNS} FROM pantries p
             WHERE p.owner_id = ?1 ORDER BY p.created_at DESC, p.id"
        ))?;

        let rows = stmt.query_map(params![owner_id], pantry_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_shared_pantries(&self, user_id: &str) -> Result<Vec<(Pantry, MemberRole)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PANTRY_COLUMNS}, m.role FROM pantries p
             JOIN pantry_members m ON m.pantry_id = p.id
             WHERE m.user_id = ?1 ORDER BY p.created_at DESC, p.id"
        ))?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok((pantry_from_row(row)?, row.get::<_, MemberRole>(5)?))
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_pantry_cascade(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM pantry_items WHERE pantry_id = ?1", params![id])?;
        tx.execute("DELETE FROM pantry_members WHERE pantry_id = ?1", params![id])?;
        let rows = tx.execute("DELETE FROM pantries WHERE id = ?1", params![id])?;

        tx.commit()?;
        Ok(rows > 0)
    }

    // Membership operations

    fn get_membership(&self, pantry_id: &str, user_id: &str) -> Result<Option<PantryMember>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT pantry_id, user_id, role, created_at, updated_at
             FROM pantry_members WHERE pantry_id = ?1 AND user_id = ?2",
            params![pantry_id, user_id],
            |row| {
                Ok(PantryMember {
                    pantry_id: row.get(0)?,
                    user_id: row.get(1)?,
                    role: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                    updated_at: parse_datetime(&row.get::<_, String>(4)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn upsert_membership(&self, member: &PantryMember) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let existed: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM pantry_members WHERE pantry_id = ?1 AND user_id = ?2)",
            params![member.pantry_id, member.user_id],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO pantry_members (pantry_id, user_id, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (pantry_id, user_id) DO UPDATE SET
                role = excluded.role,
                updated_at = excluded.updated_at",
            params![
                member.pantry_id,
                member.user_id,
                member.role,
                format_datetime(&member.created_at),
                format_datetime(&member.updated_at),
            ],
        )?;

        tx.commit()?;
        Ok(!existed)
    }

    fn update_membership_role(
        &self,
        pantry_id: &str,
        user_id: &str,
        role: MemberRole,
    ) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE pantry_members SET role = ?1, updated_at = ?2
             WHERE pantry_id = ?3 AND user_id = ?4",
            params![role, format_datetime(&Utc::now()), pantry_id, user_id],
        )?;
        Ok(rows > 0)
    }

    fn delete_membership(&self, pantry_id: &str, user_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM pantry_members WHERE pantry_id = ?1 AND user_id = ?2",
            params![pantry_id, user_id],
        )?;
        Ok(rows > 0)
    }

    fn list_memberships(&self, pantry_id: &str) -> Result<Vec<MemberWithEmail>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT m.user_id, u.email, m.role
             FROM pantry_members m
             JOIN users u ON u.id = m.user_id
             JOIN pantries p ON p.id = m.pantry_id
             WHERE m.pantry_id = ?1 AND m.user_id <> p.owner_id
             ORDER BY u.email",
        )?;

        let rows = stmt.query_map(params![pantry_id], |row| {
            Ok(MemberWithEmail {
                user_id: row.get(0)?,
                email: row.get(1)?,
                role: row.get(2)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_memberships(&self, pantry_id: &str) -> Result<u32> {
        let conn = self.conn();
        let count: u32 = conn.query_row(
            "SELECT COUNT(*)
             FROM pantry_members m
             JOIN pantries p ON p.id = m.pantry_id
             WHERE m.pantry_id = ?1 AND m.user_id <> p.owner_id",
            params![pantry_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // Item operations

    fn create_item(&self, item: &PantryItem) -> Result<()> {
        self.conn().execute(
            "INSERT INTO pantry_items (id, pantry_id, name, quantity, unit, category, avg_price, location, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                item.id,
                item.pantry_id,
                item.name,
                item.quantity,
                item.unit,
                item.category,
                item.avg_price,
                item.location,
                format_datetime(&item.created_at),
                format_datetime(&item.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_item(&self, id: &str) -> Result<Option<PantryItem>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM pantry_items WHERE id = ?1"),
            params![id],
            item_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_items(&self, pantry_id: &str) -> Result<Vec<PantryItem>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM pantry_items WHERE pantry_id = ?1 ORDER BY name, id"
        ))?;

        let rows = stmt.query_map(params![pantry_id], item_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_item(&self, item: &PantryItem) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE pantry_items SET name = ?1, quantity = ?2, unit = ?3, category = ?4,
                avg_price = ?5, location = ?6, updated_at = ?7
             WHERE id = ?8",
            params![
                item.name,
                item.quantity,
                item.unit,
                item.category,
                item.avg_price,
                item.location,
                format_datetime(&item.updated_at),
                item.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_item(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM pantry_items WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn has_admin_token(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
