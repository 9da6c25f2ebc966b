use std::collections::BTreeSet;

use chrono::Utc;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use super::validation::{validate_amount, validate_item_field, validate_item_name};
use super::{ItemListing, Resolver};
use crate::error::{Error, Result};
use crate::types::{EffectiveRole, PantryItem};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub avg_price: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
}

impl NewItem {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update; absent fields keep their current value. Amounts sent as
/// `null` are cleared; text fields are cleared by a blank string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub quantity: Option<Option<f64>>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub avg_price: Option<Option<f64>>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Present-but-null becomes `Some(None)`; an absent field stays `None` via `default`.
fn nullable<'de, D>(deserializer: D) -> std::result::Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemFilter {
    /// Case-insensitive substring of the item name.
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl ItemFilter {
    fn matches(&self, item: &PantryItem) -> bool {
        let name_ok = match self.q.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(q) => item.name.to_lowercase().contains(&q.to_lowercase()),
        };
        let category_ok = match self.category.as_deref() {
            None | Some("") => true,
            Some(c) => item.category.as_deref() == Some(c),
        };
        let location_ok = match self.location.as_deref() {
            None | Some("") => true,
            Some(l) => item.location.as_deref() == Some(l),
        };
        name_ok && category_ok && location_ok
    }
}

impl Resolver {
    pub async fn list_items(
        &self,
        requester_id: &str,
        pantry_id: &str,
        filter: &ItemFilter,
    ) -> Result<ItemListing> {
        self.require(requester_id, pantry_id, EffectiveRole::can_view)
            .await?;

        let id = pantry_id.to_owned();
        let all = self
            .call("list_items", move |store| store.list_items(&id))
            .await?;

        let categories: BTreeSet<String> = all.iter().filter_map(|i| i.category.clone()).collect();
        let locations: BTreeSet<String> = all.iter().filter_map(|i| i.location.clone()).collect();
        let items = all.into_iter().filter(|i| filter.matches(i)).collect();

        Ok(ItemListing {
            items,
            categories: categories.into_iter().collect(),
            locations: locations.into_iter().collect(),
        })
    }

    /// Adds an item. Owners and editors only.
    pub async fn add_item(
        &self,
        requester_id: &str,
        pantry_id: &str,
        new_item: NewItem,
    ) -> Result<PantryItem> {
        self.require(requester_id, pantry_id, EffectiveRole::can_edit)
            .await?;

        let now = Utc::now();
        let item = PantryItem {
            id: Uuid::new_v4().to_string(),
            pantry_id: pantry_id.to_owned(),
            name: validate_item_name(&new_item.name)?,
            quantity: validate_amount(new_item.quantity, "Quantity")?,
            unit: validate_item_field(new_item.unit.as_deref(), "Unit")?,
            category: validate_item_field(new_item.category.as_deref(), "Category")?,
            avg_price: validate_amount(new_item.avg_price, "Price")?,
            location: validate_item_field(new_item.location.as_deref(), "Location")?,
            created_at: now,
            updated_at: now,
        };

        let row = item.clone();
        self.call("create_item", move |store| store.create_item(&row))
            .await?;

        tracing::info!(%pantry_id, item_id = %item.id, "item added");
        Ok(item)
    }

    /// Applies a partial update. Owners and editors only.
    pub async fn update_item(
        &self,
        requester_id: &str,
        pantry_id: &str,
        item_id: &str,
        update: ItemUpdate,
    ) -> Result<PantryItem> {
        self.require(requester_id, pantry_id, EffectiveRole::can_edit)
            .await?;
        let mut item = self.item_in_pantry(pantry_id, item_id).await?;

        if let Some(name) = update.name.as_deref() {
            item.name = validate_item_name(name)?;
        }
        if let Some(quantity) = update.quantity {
            item.quantity = validate_amount(quantity, "Quantity")?;
        }
        if let Some(avg_price) = update.avg_price {
            item.avg_price = validate_amount(avg_price, "Price")?;
        }
        if let Some(unit) = update.unit.as_deref() {
            item.unit = validate_item_field(Some(unit), "Unit")?;
        }
        if let Some(category) = update.category.as_deref() {
            item.category = validate_item_field(Some(category), "Category")?;
        }
        if let Some(location) = update.location.as_deref() {
            item.location = validate_item_field(Some(location), "Location")?;
        }
        item.updated_at = Utc::now();

        let row = item.clone();
        self.call("update_item", move |store| store.update_item(&row))
            .await?;

        tracing::info!(%pantry_id, %item_id, "item updated");
        Ok(item)
    }

    /// Deletes an item. Owners and editors only.
    pub async fn delete_item(
        &self,
        requester_id: &str,
        pantry_id: &str,
        item_id: &str,
    ) -> Result<()> {
        self.require(requester_id, pantry_id, EffectiveRole::can_edit)
            .await?;
        self.item_in_pantry(pantry_id, item_id).await?;

        let id = item_id.to_owned();
        if !self.call("delete_item", move |store| store.delete_item(&id)).await? {
            return Err(Error::NotFound);
        }

        tracing::info!(%pantry_id, %item_id, "item deleted");
        Ok(())
    }

    async fn item_in_pantry(&self, pantry_id: &str, item_id: &str) -> Result<PantryItem> {
        let id = item_id.to_owned();
        self.call("get_item", move |store| store.get_item(&id))
            .await?
            .filter(|item| item.pantry_id == pantry_id)
            .ok_or(Error::NotFound)
    }
}
