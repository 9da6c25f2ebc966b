//! Pantry access control.
//!
//! [`Resolver`] is the only component that decides what a user may do with a
//! pantry and the only one that mutates membership rows. Every operation takes
//! the requester explicitly and re-derives their role from the store; nothing
//! is cached between calls.

mod items;
mod membership;
mod pantries;
pub mod validation;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{EffectiveRole, MemberRole, Pantry, PantryItem, PantryView};

pub use items::{ItemFilter, ItemUpdate, NewItem};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of an invite: the membership as it now stands.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipResult {
    pub pantry_id: String,
    pub user_id: String,
    pub email: String,
    pub role: MemberRole,
    /// False when an existing membership only had its role overwritten.
    pub created: bool,
    pub member_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PantryListing {
    pub owned: Vec<PantryView>,
    pub shared: Vec<PantryView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemListing {
    pub items: Vec<PantryItem>,
    /// Distinct categories across the whole pantry, not just the filtered items.
    pub categories: Vec<String>,
    pub locations: Vec<String>,
}

pub struct Resolver {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl Resolver {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Returns the requester's authority over a pantry.
    /// A pantry that does not exist resolves to [`EffectiveRole::None`].
    pub async fn resolve_role(&self, user_id: &str, pantry_id: &str) -> Result<EffectiveRole> {
        Ok(self
            .resolve(user_id, pantry_id)
            .await?
            .map_or(EffectiveRole::None, |(_, role)| role))
    }

    /// Live membership count for a pantry, owner excluded.
    pub async fn compute_member_count(&self, pantry_id: &str) -> Result<u32> {
        let pantry_id = pantry_id.to_owned();
        self.call("count_memberships", move |store| {
            store.count_memberships(&pantry_id)
        })
        .await
    }

    async fn resolve(
        &self,
        user_id: &str,
        pantry_id: &str,
    ) -> Result<Option<(Pantry, EffectiveRole)>> {
        let id = pantry_id.to_owned();
        let Some(pantry) = self
            .call("get_pantry", move |store| store.get_pantry(&id))
            .await?
        else {
            return Ok(None);
        };

        if pantry.owner_id == user_id {
            return Ok(Some((pantry, EffectiveRole::Owner)));
        }

        let (id, user) = (pantry_id.to_owned(), user_id.to_owned());
        let membership = self
            .call("get_membership", move |store| store.get_membership(&id, &user))
            .await?;

        let role = EffectiveRole::from(membership.map(|m| m.role));
        Ok(Some((pantry, role)))
    }

    /// Resolves the requester's role and fails unless `allowed` accepts it.
    async fn require(
        &self,
        user_id: &str,
        pantry_id: &str,
        allowed: fn(EffectiveRole) -> bool,
    ) -> Result<(Pantry, EffectiveRole)> {
        let (pantry, role) = self
            .resolve(user_id, pantry_id)
            .await?
            .ok_or(Error::NotFound)?;

        if !allowed(role) {
            tracing::debug!(%user_id, %pantry_id, %role, "access denied");
            return Err(Error::NotAuthorized);
        }
        Ok((pantry, role))
    }

    /// Runs a blocking store call on the blocking pool, bounded by the
    /// configured timeout.
    pub(crate) async fn call<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&dyn Store) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || f(store.as_ref()));

        let result = with_deadline(op, self.timeout, async move {
            task.await
                .map_err(|e| Error::Persistence(format!("{op} task failed: {e}")))?
        })
        .await;

        result.map_err(|e| match e {
            Error::Database(db) => Error::Persistence(format!("{op}: {db}")),
            other => other,
        })
    }
}

async fn with_deadline<T>(
    op: &'static str,
    timeout: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(op, timeout_ms = timeout.as_millis() as u64, "store call timed out");
            Err(Error::Timeout(op))
        }
    }
}
