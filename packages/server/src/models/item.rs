use serde::{Deserialize, Serialize};

use crate::entity::item::{self, Category};
use crate::error::AppError;

/// An item as returned by the API. Matches the original document layout:
/// `user` is the owner's id, asset fields are reference paths under
/// `/uploads/`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ItemResponse {
    #[schema(example = 17)]
    pub id: i32,
    #[schema(example = "Lounge chair")]
    pub title: String,
    /// Short description shown in listings.
    pub description: String,
    /// Detailed description shown on the item page.
    pub description_big: String,
    /// Reference path to the preview image.
    #[schema(example = "/uploads/images/image-1700000000000-123456789.png")]
    pub image: String,
    /// Reference path to the 3D model file.
    #[serde(rename = "modelUrl")]
    #[schema(example = "/uploads/models/model-1700000000000-123456789.glb")]
    pub model_url: String,
    pub category: Category,
    #[serde(rename = "isPublic")]
    pub is_public: bool,
    /// Owner user id.
    pub user: i32,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<item::Model> for ItemResponse {
    fn from(m: item::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            description_big: m.description_big,
            image: m.image,
            model_url: m.model_url,
            category: m.category,
            is_public: m.is_public,
            user: m.user_id,
            created_at: m.created_at,
        }
    }
}

/// An item in the public gallery: the owner id is replaced by the owner's
/// username so the front-end can show attribution.
#[derive(Serialize, utoipa::ToSchema)]
pub struct PublicItemResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub description_big: String,
    pub image: String,
    #[serde(rename = "modelUrl")]
    pub model_url: String,
    pub category: Category,
    #[serde(rename = "isPublic")]
    pub is_public: bool,
    /// Owner's username, or "unknown" if the owner record is gone.
    #[schema(example = "alice_wonder")]
    pub user: String,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl PublicItemResponse {
    pub fn from_item_and_owner(m: item::Model, username: Option<String>) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            description_big: m.description_big,
            image: m.image,
            model_url: m.model_url,
            category: m.category,
            is_public: m.is_public,
            user: username.unwrap_or_else(|| "unknown".to_string()),
            created_at: m.created_at,
        }
    }
}

/// Metadata fields of an item upload, collected from the multipart form.
#[derive(Default, Debug)]
pub struct CreateItemMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub description_big: Option<String>,
    pub category: Option<String>,
    pub is_public: bool,
}

/// Validated metadata, ready to persist.
pub struct ValidatedItemMeta {
    pub title: String,
    pub description: String,
    pub description_big: String,
    pub category: Category,
    pub is_public: bool,
}

pub fn validate_create_meta(meta: CreateItemMeta) -> Result<ValidatedItemMeta, AppError> {
    let title = require_field(meta.title, "title")?;
    validate_title(&title)?;
    let description = require_field(meta.description, "description")?;
    let description_big = require_field(meta.description_big, "description_big")?;
    let category = require_field(meta.category, "category")?;

    Ok(ValidatedItemMeta {
        title,
        description,
        description_big,
        category: parse_category(&category)?,
        is_public: meta.is_public,
    })
}

fn require_field(value: Option<String>, name: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("Please fill the required field '{name}'")))
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.chars().count() > 256 {
        return Err(AppError::Validation(
            "Title must be 1-256 characters".into(),
        ));
    }
    Ok(())
}

pub fn parse_category(raw: &str) -> Result<Category, AppError> {
    use sea_orm::ActiveEnum;

    Category::try_from_value(&raw.trim().to_lowercase())
        .map_err(|_| AppError::Validation(format!("Unknown category '{raw}'")))
}

/// Request body for `PUT /api/items/{id}`.
///
/// Only this fixed allow-list of fields is mutable; anything else in the
/// payload is ignored rather than rejected. The category stays raw text
/// here so a bad value cannot fail at deserialization, before the 404 and
/// ownership checks have run.
#[derive(Deserialize, Default, utoipa::ToSchema)]
#[serde(default)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub description_big: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "isPublic")]
    pub is_public: Option<bool>,
}

pub fn validate_update_item(payload: &UpdateItemRequest) -> Result<(), AppError> {
    if let Some(ref title) = payload.title {
        let trimmed = title.trim();
        if trimmed.is_empty() || trimmed.chars().count() > 256 {
            return Err(AppError::Validation(
                "Title must be 1-256 characters".into(),
            ));
        }
    }
    if payload
        .description
        .as_deref()
        .is_some_and(|d| d.trim().is_empty())
    {
        return Err(AppError::Validation(
            "Description must not be empty".into(),
        ));
    }
    if payload
        .description_big
        .as_deref()
        .is_some_and(|d| d.trim().is_empty())
    {
        return Err(AppError::Validation(
            "Detailed description must not be empty".into(),
        ));
    }
    Ok(())
}

/// Acknowledgement body for `DELETE /api/items/{id}`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DeleteResponse {
    #[schema(example = "Item deleted successfully")]
    pub message: String,
}
