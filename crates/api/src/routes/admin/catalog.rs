//! Brands, categories, colors and features.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};

use emporium_core::{BrandId, CategoryId, ColorId, FeatureId, Permission};

use crate::db::categories::CategoryFilter;
use crate::db::{
    BrandRepository, CategoryRepository, ColorRepository, FeatureRepository, FileRepository,
    ListParams, Page,
};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::catalog::{
    Brand, BrandInput, Category, CategoryInput, Color, ColorInput, Feature, FeatureInput,
};
use crate::state::AppState;
use crate::validation::{Path, Query, ValidJson};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/brands", get(list_brands).post(create_brand))
        .route(
            "/brands/{id}",
            get(get_brand).put(update_brand).delete(delete_brand),
        )
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route("/colors", get(list_colors).post(create_color))
        .route(
            "/colors/{id}",
            get(get_color).put(update_color).delete(delete_color),
        )
        .route("/features", get(list_features).post(create_feature))
        .route(
            "/features/{id}",
            get(get_feature).put(update_feature).delete(delete_feature),
        )
}

// =============================================================================
// Brands
// =============================================================================

async fn list_brands(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Brand>>> {
    admin.require(Permission::ManageCatalog)?;
    Ok(Json(BrandRepository::new(state.pool()).list(&params).await?))
}

async fn get_brand(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<BrandId>,
) -> Result<Json<Brand>> {
    admin.require(Permission::ManageCatalog)?;
    BrandRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(AppError::not_found)
}

async fn create_brand(
    admin: RequireAdmin,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<BrandInput>,
) -> Result<(StatusCode, Json<Brand>)> {
    admin.require(Permission::ManageCatalog)?;
    check_logo(&state, &input).await?;

    let brand = BrandRepository::new(state.pool())
        .create(&input, admin.actor())
        .await?;
    tracing::info!(brand_id = %brand.id, code = %brand.code, "Brand created");
    Ok((StatusCode::CREATED, Json(brand)))
}

async fn update_brand(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<BrandId>,
    ValidJson(input): ValidJson<BrandInput>,
) -> Result<Json<Brand>> {
    admin.require(Permission::ManageCatalog)?;
    check_logo(&state, &input).await?;

    let brand = BrandRepository::new(state.pool())
        .update(id, &input, admin.actor())
        .await?;
    Ok(Json(brand))
}

async fn delete_brand(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<BrandId>,
) -> Result<StatusCode> {
    admin.require(Permission::ManageCatalog)?;
    BrandRepository::new(state.pool())
        .delete(id, admin.actor())
        .await?;
    tracing::info!(brand_id = %id, "Brand deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn check_logo(state: &AppState, input: &BrandInput) -> Result<()> {
    if let Some(file_id) = input.logo_file_id
        && !FileRepository::new(state.pool()).exists(file_id).await?
    {
        return Err(AppError::invalid_field("logo_file_id", "file does not exist"));
    }
    Ok(())
}

// =============================================================================
// Categories
// =============================================================================

async fn list_categories(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(filter): Query<CategoryFilter>,
) -> Result<Json<Page<Category>>> {
    admin.require(Permission::ManageCatalog)?;
    let page = CategoryRepository::new(state.pool())
        .list(&params, filter)
        .await?;
    Ok(Json(page))
}

async fn get_category(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>> {
    admin.require(Permission::ManageCatalog)?;
    CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(AppError::not_found)
}

async fn create_category(
    admin: RequireAdmin,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    admin.require(Permission::ManageCatalog)?;
    let repo = CategoryRepository::new(state.pool());

    if let Some(parent_id) = input.parent_id
        && !repo.exists(parent_id).await?
    {
        return Err(AppError::invalid_field("parent_id", "category does not exist"));
    }

    let category = repo.create(&input, admin.actor()).await?;
    tracing::info!(category_id = %category.id, code = %category.code, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    ValidJson(input): ValidJson<CategoryInput>,
) -> Result<Json<Category>> {
    admin.require(Permission::ManageCatalog)?;
    let repo = CategoryRepository::new(state.pool());

    if let Some(parent_id) = input.parent_id {
        if parent_id == id {
            return Err(AppError::invalid_field(
                "parent_id",
                "a category cannot be its own parent",
            ));
        }
        if !repo.exists(parent_id).await? {
            return Err(AppError::invalid_field("parent_id", "category does not exist"));
        }
        // Moving a category under one of its descendants would create a cycle
        if repo.is_in_subtree(id, parent_id).await? {
            return Err(AppError::invalid_field(
                "parent_id",
                "cannot move a category under its own subcategory",
            ));
        }
    }

    Ok(Json(repo.update(id, &input, admin.actor()).await?))
}

async fn delete_category(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    admin.require(Permission::ManageCatalog)?;
    CategoryRepository::new(state.pool())
        .delete(id, admin.actor())
        .await?;
    tracing::info!(category_id = %id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Colors
// =============================================================================

async fn list_colors(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Color>>> {
    admin.require(Permission::ManageCatalog)?;
    Ok(Json(ColorRepository::new(state.pool()).list(&params).await?))
}

async fn get_color(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ColorId>,
) -> Result<Json<Color>> {
    admin.require(Permission::ManageCatalog)?;
    ColorRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(AppError::not_found)
}

async fn create_color(
    admin: RequireAdmin,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<ColorInput>,
) -> Result<(StatusCode, Json<Color>)> {
    admin.require(Permission::ManageCatalog)?;
    let color = ColorRepository::new(state.pool())
        .create(&input, admin.actor())
        .await?;
    Ok((StatusCode::CREATED, Json(color)))
}

async fn update_color(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ColorId>,
    ValidJson(input): ValidJson<ColorInput>,
) -> Result<Json<Color>> {
    admin.require(Permission::ManageCatalog)?;
    let color = ColorRepository::new(state.pool())
        .update(id, &input, admin.actor())
        .await?;
    Ok(Json(color))
}

async fn delete_color(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ColorId>,
) -> Result<StatusCode> {
    admin.require(Permission::ManageCatalog)?;
    ColorRepository::new(state.pool())
        .delete(id, admin.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Features
// =============================================================================

async fn list_features(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Feature>>> {
    admin.require(Permission::ManageCatalog)?;
    Ok(Json(FeatureRepository::new(state.pool()).list(&params).await?))
}

async fn get_feature(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<FeatureId>,
) -> Result<Json<Feature>> {
    admin.require(Permission::ManageCatalog)?;
    FeatureRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(AppError::not_found)
}

async fn create_feature(
    admin: RequireAdmin,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<FeatureInput>,
) -> Result<(StatusCode, Json<Feature>)> {
    admin.require(Permission::ManageCatalog)?;
    let feature = FeatureRepository::new(state.pool())
        .create(&input, admin.actor())
        .await?;
    Ok((StatusCode::CREATED, Json(feature)))
}

async fn update_feature(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<FeatureId>,
    ValidJson(input): ValidJson<FeatureInput>,
) -> Result<Json<Feature>> {
    admin.require(Permission::ManageCatalog)?;
    let feature = FeatureRepository::new(state.pool())
        .update(id, &input, admin.actor())
        .await?;
    Ok(Json(feature))
}

async fn delete_feature(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<FeatureId>,
) -> Result<StatusCode> {
    admin.require(Permission::ManageCatalog)?;
    FeatureRepository::new(state.pool())
        .delete(id, admin.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
