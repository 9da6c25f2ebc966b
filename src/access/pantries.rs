use chrono::Utc;
use uuid::Uuid;

use super::validation::{validate_description, validate_pantry_name};
use super::{PantryListing, Resolver};
use crate::error::{Error, Result};
use crate::types::{EffectiveRole, Pantry, PantryView};

impl Resolver {
    /// Creates a pantry owned by `owner_id`. The owner gets no membership row.
    pub async fn create_pantry(
        &self,
        owner_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Pantry> {
        let pantry = Pantry {
            id: Uuid::new_v4().to_string(),
            name: validate_pantry_name(name)?,
            description: validate_description(description)?,
            owner_id: owner_id.to_owned(),
            created_at: Utc::now(),
        };

        let row = pantry.clone();
        self.call("create_pantry", move |store| store.create_pantry(&row))
            .await?;

        tracing::info!(pantry_id = %pantry.id, %owner_id, "pantry created");
        Ok(pantry)
    }

    /// Deletes a pantry with all its memberships and items. Owner only.
    pub async fn delete_pantry(&self, requester_id: &str, pantry_id: &str) -> Result<()> {
        self.require(requester_id, pantry_id, EffectiveRole::can_manage)
            .await?;

        let id = pantry_id.to_owned();
        let deleted = self
            .call("delete_pantry_cascade", move |store| {
                store.delete_pantry_cascade(&id)
            })
            .await?;

        if !deleted {
            // Removed by a concurrent request between the check and the delete.
            return Err(Error::NotFound);
        }

        tracing::info!(%pantry_id, %requester_id, "pantry deleted");
        Ok(())
    }

    /// Pantries the user owns and pantries shared with them, newest first,
    /// each with a freshly counted membership.
    pub async fn list_pantries(&self, user_id: &str) -> Result<PantryListing> {
        let id = user_id.to_owned();
        let owned = self
            .call("list_owned_pantries", move |store| {
                store.list_owned_pantries(&id)
            })
            .await?;

        let id = user_id.to_owned();
        let shared = self
            .call("list_shared_pantries", move |store| {
                store.list_shared_pantries(&id)
            })
            .await?;

        let mut owned_views = Vec::with_capacity(owned.len());
        for pantry in owned {
            let member_count = self.compute_member_count(&pantry.id).await?;
            owned_views.push(PantryView {
                pantry,
                role: EffectiveRole::Owner,
                member_count,
            });
        }

        let mut shared_views = Vec::with_capacity(shared.len());
        for (pantry, role) in shared {
            // A membership row on one's own pantry never downgrades ownership.
            if pantry.owner_id == user_id {
                continue;
            }
            let member_count = self.compute_member_count(&pantry.id).await?;
            shared_views.push(PantryView {
                pantry,
                role: role.into(),
                member_count,
            });
        }

        Ok(PantryListing {
            owned: owned_views,
            shared: shared_views,
        })
    }

    /// A single pantry as seen by the requester. Any role may read it.
    pub async fn get_pantry(&self, requester_id: &str, pantry_id: &str) -> Result<PantryView> {
        let (pantry, role) = self
            .require(requester_id, pantry_id, EffectiveRole::can_view)
            .await?;
        let member_count = self.compute_member_count(&pantry.id).await?;

        Ok(PantryView {
            pantry,
            role,
            member_count,
        })
    }
}
