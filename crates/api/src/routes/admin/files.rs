//! Uploaded files and app pictures (banners, sliders).

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};

use emporium_core::{AppPicId, AppPicKind, FileId, Permission};

use crate::db::app_pics::AppPicFilter;
use crate::db::{AppPicRepository, FileRepository, ListParams, Page};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::catalog::ReorderInput;
use crate::models::content::{AppPic, AppPicInput, FileRecord};
use crate::state::AppState;
use crate::validation::{Path, Query, ValidJson};

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/files",
            get(list_files)
                .post(upload_file)
                .layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD)),
        )
        .route("/files/{id}", get(get_file).delete(delete_file))
        .route("/app-pics", get(list_app_pics).post(create_app_pic))
        .route("/app-pics/reorder", put(reorder_app_pics))
        .route(
            "/app-pics/{id}",
            get(get_app_pic).put(update_app_pic).delete(delete_app_pic),
        )
}

// =============================================================================
// Files
// =============================================================================

/// A file record with its absolute URL.
#[derive(Debug, Serialize)]
pub struct FileResponse {
    #[serde(flatten)]
    pub file: FileRecord,
    pub url: String,
}

impl FileResponse {
    fn new(state: &AppState, file: FileRecord) -> Self {
        let url = state.config().file_url(&file.stored_name);
        Self { file, url }
    }
}

async fn upload_file(
    admin: RequireAdmin,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<FileResponse>)> {
    admin.require(Permission::ManageFiles)?;
    let file = state
        .files()
        .upload(state.pool(), multipart, admin.actor())
        .await?;
    Ok((StatusCode::CREATED, Json(FileResponse::new(&state, file))))
}

async fn list_files(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<FileResponse>>> {
    admin.require(Permission::ManageFiles)?;
    let page = FileRepository::new(state.pool()).list(&params).await?;
    Ok(Json(page.map(|file| FileResponse::new(&state, file))))
}

async fn get_file(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<FileId>,
) -> Result<Json<FileResponse>> {
    admin.require(Permission::ManageFiles)?;
    FileRepository::new(state.pool())
        .get(id)
        .await?
        .map(|file| Json(FileResponse::new(&state, file)))
        .ok_or_else(AppError::not_found)
}

async fn delete_file(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<FileId>,
) -> Result<StatusCode> {
    admin.require(Permission::ManageFiles)?;
    FileRepository::new(state.pool())
        .delete(id, admin.actor())
        .await?;
    tracing::info!(file_id = %id, "File deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// App Pictures
// =============================================================================

#[derive(Debug, Deserialize)]
struct KindQuery {
    kind: AppPicKind,
}

async fn list_app_pics(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(filter): Query<AppPicFilter>,
) -> Result<Json<Page<AppPic>>> {
    admin.require(Permission::ManageFiles)?;
    let page = AppPicRepository::new(state.pool())
        .list(&params, filter)
        .await?;
    Ok(Json(page))
}

async fn get_app_pic(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<AppPicId>,
) -> Result<Json<AppPic>> {
    admin.require(Permission::ManageFiles)?;
    AppPicRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(AppError::not_found)
}

async fn create_app_pic(
    admin: RequireAdmin,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<AppPicInput>,
) -> Result<(StatusCode, Json<AppPic>)> {
    admin.require(Permission::ManageFiles)?;
    check_file(&state, input.file_id).await?;

    let pic = AppPicRepository::new(state.pool())
        .create(&input, admin.actor())
        .await?;
    tracing::info!(app_pic_id = %pic.id, kind = ?pic.kind, "App picture created");
    Ok((StatusCode::CREATED, Json(pic)))
}

async fn update_app_pic(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<AppPicId>,
    ValidJson(input): ValidJson<AppPicInput>,
) -> Result<Json<AppPic>> {
    admin.require(Permission::ManageFiles)?;
    check_file(&state, input.file_id).await?;

    let pic = AppPicRepository::new(state.pool())
        .update(id, &input, admin.actor())
        .await?;
    Ok(Json(pic))
}

async fn delete_app_pic(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<AppPicId>,
) -> Result<StatusCode> {
    admin.require(Permission::ManageFiles)?;
    AppPicRepository::new(state.pool())
        .delete(id, admin.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /app-pics/reorder?kind=banner` with every picture of that kind.
async fn reorder_app_pics(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(KindQuery { kind }): Query<KindQuery>,
    ValidJson(input): ValidJson<ReorderInput>,
) -> Result<Json<Vec<AppPic>>> {
    admin.require(Permission::ManageFiles)?;
    let pics = AppPicRepository::new(state.pool())
        .reorder(kind, &input.ids)
        .await?;
    Ok(Json(pics))
}

async fn check_file(state: &AppState, file_id: FileId) -> Result<()> {
    if FileRepository::new(state.pool()).exists(file_id).await? {
        Ok(())
    } else {
        Err(AppError::invalid_field("file_id", "file does not exist"))
    }
}
