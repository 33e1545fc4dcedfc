use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The fixed set of model categories. Stored as text; anything outside this
/// enum is rejected at the API boundary as a validation error.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[sea_orm(string_value = "architecture")]
    Architecture,
    #[sea_orm(string_value = "furniture")]
    Furniture,
    #[sea_orm(string_value = "electronics")]
    Electronics,
    #[sea_orm(string_value = "toys")]
    Toys,
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "item")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    /// Short description shown in listings.
    pub description: String,
    /// Detailed description shown on the item page.
    pub description_big: String,
    /// Reference path to the preview image, e.g. `/uploads/images/image-....png`.
    pub image: String,
    /// Reference path to the 3D model file, e.g. `/uploads/models/model-....glb`.
    pub model_url: String,
    pub category: Category,
    pub is_public: bool,

    #[sea_orm(indexed)]
    pub user_id: i32,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    User,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(super::user::Entity)
                .from(Column::UserId)
                .to(super::user::Column::Id)
                .into(),
        }
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Ownership predicate for item mutation and deletion: a plain equality
/// check between the stored owner id and the authenticated requester.
/// There are no roles or admin overrides.
pub fn is_owner(item: &Model, requester_id: i32) -> bool {
    item.user_id == requester_id
}
