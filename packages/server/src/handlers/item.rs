use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, body::Body};
use sea_orm::*;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::config::AppConfig;
use crate::entity::{item, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::item::{
    CreateItemMeta, DeleteResponse, ItemResponse, PublicItemResponse, UpdateItemRequest,
    parse_category, validate_create_meta, validate_update_item,
};
use crate::state::AppState;
use crate::storage::{AssetKind, AssetStore};
use crate::utils::filename;

/// Body limit for the multipart upload route: both asset ceilings plus some
/// slack for the metadata fields.
pub fn upload_body_limit(config: &AppConfig) -> DefaultBodyLimit {
    let max = config.storage.max_image_bytes + config.storage.max_model_bytes + 1024 * 1024;
    DefaultBodyLimit::max(max as usize)
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Items",
    operation_id = "createItem",
    summary = "Upload a new 3D model",
    description = "Multipart upload with text fields `title`, `description`, `description_big`, \
        `category`, `isPublic` and file fields `model` (.glb/.gltf) and `image` (image/*). \
        Both files are stored under generated names before the metadata record is created; on \
        any failure the stored files are removed again.",
    request_body(content_type = "multipart/form-data",
        description = "Item metadata plus model and image files"),
    responses(
        (status = 201, description = "Item created", body = ItemResponse),
        (status = 400, description = "Missing field/file or disallowed file type \
            (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 413, description = "A file exceeds its size ceiling (PAYLOAD_TOO_LARGE)",
            body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn create_item(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut meta = CreateItemMeta::default();
    let mut image_ref: Option<String> = None;
    let mut model_ref: Option<String> = None;

    let collected = async {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
        {
            match field.name() {
                Some("title") => meta.title = Some(read_text(field, "title").await?),
                Some("description") => {
                    meta.description = Some(read_text(field, "description").await?)
                }
                Some("description_big") => {
                    meta.description_big = Some(read_text(field, "description_big").await?)
                }
                Some("category") => meta.category = Some(read_text(field, "category").await?),
                Some("isPublic") => {
                    meta.is_public = read_text(field, "isPublic").await? == "true"
                }
                Some("image") => {
                    if image_ref.is_some() {
                        return Err(AppError::Validation("Duplicate 'image' field".into()));
                    }
                    image_ref =
                        Some(store_upload(&state.assets, field, AssetKind::Image).await?);
                }
                Some("model") => {
                    if model_ref.is_some() {
                        return Err(AppError::Validation("Duplicate 'model' field".into()));
                    }
                    model_ref =
                        Some(store_upload(&state.assets, field, AssetKind::Model).await?);
                }
                _ => {} // Ignore unknown fields.
            }
        }
        Ok(())
    }
    .await;

    let persisted = match collected {
        Ok(()) => {
            persist_item(
                &state,
                auth_user.user_id,
                meta,
                image_ref.clone(),
                model_ref.clone(),
            )
            .await
        }
        Err(e) => Err(e),
    };

    match persisted {
        Ok(model) => Ok((StatusCode::CREATED, Json(ItemResponse::from(model)))),
        Err(e) => {
            // Validation or store failure after files hit the disk: remove
            // them again so a rejected upload leaves no orphans.
            if let Some(r) = image_ref {
                state.assets.remove(AssetKind::Image, &r).await;
            }
            if let Some(r) = model_ref {
                state.assets.remove(AssetKind::Model, &r).await;
            }
            Err(e)
        }
    }
}

async fn persist_item(
    state: &AppState,
    owner_id: i32,
    meta: CreateItemMeta,
    image_ref: Option<String>,
    model_ref: Option<String>,
) -> Result<item::Model, AppError> {
    let meta = validate_create_meta(meta)?;

    let (Some(image), Some(model_url)) = (image_ref, model_ref) else {
        return Err(AppError::Validation(
            "Both model and image files are required".into(),
        ));
    };

    let new_item = item::ActiveModel {
        title: Set(meta.title),
        description: Set(meta.description),
        description_big: Set(meta.description_big),
        image: Set(image),
        model_url: Set(model_url),
        category: Set(meta.category),
        is_public: Set(meta.is_public),
        user_id: Set(owner_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let model = new_item.insert(&state.db).await?;
    tracing::info!(item_id = model.id, "Item created");
    Ok(model)
}

async fn read_text(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read '{name}': {e}")))
}

/// Validate an upload field against its kind's allow-list and stream it to
/// disk under a generated name, enforcing the kind's size ceiling while
/// writing. A partial file is removed on any failure.
async fn store_upload(
    assets: &AssetStore,
    mut field: axum::extract::multipart::Field<'_>,
    kind: AssetKind,
) -> Result<String, AppError> {
    let file_name = field.file_name().map(|s| s.to_string());
    let content_type = field.content_type().map(|s| s.to_string());
    let ext = assets.validate_upload(kind, file_name.as_deref(), content_type.as_deref())?;

    let reference = assets.new_reference(kind, &ext);
    let path = assets.resolve(kind, &reference);
    let max = assets.max_bytes(kind);

    let written = async {
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create upload file: {e}")))?;

        let mut total: u64 = 0;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            total += chunk.len() as u64;
            if total > max {
                return Err(AppError::PayloadTooLarge(format!(
                    "The {} file exceeds the maximum size of {} bytes",
                    kind.label(),
                    max
                )));
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Upload write failed: {e}")))?;
        }

        file.flush()
            .await
            .map_err(|e| AppError::Internal(format!("Upload flush failed: {e}")))?;
        Ok(())
    }
    .await;

    match written {
        Ok(()) => Ok(reference),
        Err(e) => {
            let _ = tokio::fs::remove_file(&path).await;
            Err(e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Items",
    operation_id = "listItems",
    summary = "List public items",
    description = "All public items, newest first. No authentication required.",
    responses((status = 200, description = "Public items", body = Vec<ItemResponse>)),
)]
#[instrument(skip(state))]
pub async fn list_items(
    State(state): State<AppState>,
) -> Result<Json<Vec<ItemResponse>>, AppError> {
    let items = item::Entity::find()
        .filter(item::Column::IsPublic.eq(true))
        .order_by_desc(item::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/public",
    tag = "Items",
    operation_id = "listPublicItems",
    summary = "List public items with owner usernames",
    description = "Same as the plain listing, but the owner id is resolved to a username \
        (\"unknown\" when the owner record is missing).",
    responses((status = 200, description = "Public items with attribution",
        body = Vec<PublicItemResponse>)),
)]
#[instrument(skip(state))]
pub async fn list_public_items(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicItemResponse>>, AppError> {
    let rows = item::Entity::find()
        .filter(item::Column::IsPublic.eq(true))
        .order_by_desc(item::Column::CreatedAt)
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?;

    let items = rows
        .into_iter()
        .map(|(item, owner)| {
            PublicItemResponse::from_item_and_owner(item, owner.map(|u| u.username))
        })
        .collect();

    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/my-models",
    tag = "Items",
    operation_id = "listMyItems",
    summary = "List the caller's items",
    description = "All items owned by the authenticated user, newest first, public or not.",
    responses(
        (status = 200, description = "Caller's items", body = Vec<ItemResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_my_items(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ItemResponse>>, AppError> {
    let items = item::Entity::find()
        .filter(item::Column::UserId.eq(auth_user.user_id))
        .order_by_desc(item::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Items",
    operation_id = "getItem",
    summary = "Get an item by ID",
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item details", body = ItemResponse),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ItemResponse>, AppError> {
    let model = find_item(&state.db, id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    get,
    path = "/{id}/model",
    tag = "Items",
    operation_id = "downloadModel",
    summary = "Download an item's 3D model file",
    description = "Streams the stored model file as an attachment named after the stored file.",
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Model file stream"),
        (status = 404, description = "Item or backing file missing (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn download_model(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let model = find_item(&state.db, id).await?;
    let path = state.assets.resolve(AssetKind::Model, &model.model_url);

    let file = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(item_id = id, "Model file missing at {}", path.display());
            return Err(AppError::NotFound("Model file not found".into()));
        }
        Err(e) => return Err(AppError::Internal(format!("Failed to open model file: {e}"))),
    };

    let len = file
        .metadata()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to stat model file: {e}")))?
        .len();
    let stream = ReaderStream::new(file);

    let base_name = filename::base_name(&model.model_url);
    let content_type = mime_guess::from_path(base_name).first_or_octet_stream();
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, len.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            filename::attachment_disposition(base_name),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    Ok(response)
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Items",
    operation_id = "updateItem",
    summary = "Update an item's metadata",
    description = "Owner-only. Applies the fixed allow-list {title, description, \
        description_big, category, isPublic}; any other fields in the payload are ignored.",
    params(("id" = i32, Path, description = "Item ID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ItemResponse),
        (status = 400, description = "Constraint violation (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Caller is not the owner (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, user_id = auth_user.user_id))]
pub async fn update_item(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, AppError> {
    // Resolution and ownership are checked before the payload: an unknown
    // id is 404 and a foreign item is 403 even when the patch is invalid.
    let existing = find_item(&state.db, id).await?;
    if !item::is_owner(&existing, auth_user.user_id) {
        return Err(AppError::Forbidden(
            "Not authorized to update this item".into(),
        ));
    }

    validate_update_item(&payload)?;

    let mut active: item::ActiveModel = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(description_big) = payload.description_big {
        active.description_big = Set(description_big);
    }
    if let Some(category) = payload.category {
        active.category = Set(parse_category(&category)?);
    }
    if let Some(is_public) = payload.is_public {
        active.is_public = Set(is_public);
    }

    let model = active.update(&state.db).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Items",
    operation_id = "deleteItem",
    summary = "Delete an item",
    description = "Owner-only. Attempts to delete the two backing files first (failures are \
        logged and swallowed), then removes the metadata record. The two steps are not atomic; \
        a crash in between can orphan files on disk.",
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item deleted", body = DeleteResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Caller is not the owner (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn delete_item(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteResponse>, AppError> {
    let existing = find_item(&state.db, id).await?;
    if !item::is_owner(&existing, auth_user.user_id) {
        return Err(AppError::Forbidden(
            "Not authorized to delete this item".into(),
        ));
    }

    // Best-effort file removal before the metadata delete; the record is
    // removed regardless of the outcome here.
    state
        .assets
        .remove(AssetKind::Model, &existing.model_url)
        .await;
    state.assets.remove(AssetKind::Image, &existing.image).await;

    item::Entity::delete_by_id(id).exec(&state.db).await?;
    tracing::info!(item_id = id, "Item deleted");

    Ok(Json(DeleteResponse {
        message: "Item deleted successfully".into(),
    }))
}

async fn find_item<C: ConnectionTrait>(db: &C, id: i32) -> Result<item::Model, AppError> {
    item::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".into()))
}
