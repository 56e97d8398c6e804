//! Public catalog reads. Inactive products and items are never shown.

use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use serde::Deserialize;

use emporium_core::{AppPicKind, BrandId, CategoryId, ProductId};

use crate::db::categories::CategoryFilter;
use crate::db::products::ProductFilter;
use crate::db::{
    AppPicRepository, BrandRepository, CategoryRepository, ColorRepository, FeatureRepository,
    ListParams, Page, ProductRepository,
};
use crate::error::{AppError, Result};
use crate::models::catalog::{Brand, Category, Color, Feature, Product, ProductDetail};
use crate::models::content::AppPic;
use crate::models::settings::Settings;
use crate::state::AppState;
use crate::validation::{Path, Query};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
        .route("/brands", get(list_brands))
        .route("/brands/{id}", get(get_brand))
        .route("/categories", get(list_categories))
        .route("/categories/{id}", get(get_category))
        .route("/colors", get(list_colors))
        .route("/features", get(list_features))
        .route("/app-pics", get(list_app_pics))
        .route("/settings", get(get_settings))
}

/// Filter by `brand_id` or `category_id`; only active products are listed.
async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Page<Product>>> {
    let filter = ProductFilter {
        is_active: Some(true),
        ..filter
    };
    let page = ProductRepository::new(state.pool())
        .list(&params, filter)
        .await?;
    Ok(Json(page))
}

/// Product with its active items, features and pictures.
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetail>> {
    ProductRepository::new(state.pool())
        .get_detail(id, true)
        .await?
        .map(Json)
        .ok_or_else(AppError::not_found)
}

async fn list_brands(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Brand>>> {
    Ok(Json(BrandRepository::new(state.pool()).list(&params).await?))
}

async fn get_brand(
    State(state): State<AppState>,
    Path(id): Path<BrandId>,
) -> Result<Json<Brand>> {
    BrandRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(AppError::not_found)
}

/// `?parent_id=` lists one level of the tree.
async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(filter): Query<CategoryFilter>,
) -> Result<Json<Page<Category>>> {
    let page = CategoryRepository::new(state.pool())
        .list(&params, filter)
        .await?;
    Ok(Json(page))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>> {
    CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(AppError::not_found)
}

async fn list_colors(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Color>>> {
    Ok(Json(ColorRepository::new(state.pool()).list(&params).await?))
}

async fn list_features(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Feature>>> {
    Ok(Json(FeatureRepository::new(state.pool()).list(&params).await?))
}

#[derive(Debug, Deserialize)]
struct KindQuery {
    kind: AppPicKind,
}

/// Active banners, sliders or popups in display order.
async fn list_app_pics(
    State(state): State<AppState>,
    Query(KindQuery { kind }): Query<KindQuery>,
) -> Result<Json<Vec<AppPic>>> {
    Ok(Json(AppPicRepository::new(state.pool()).list_active(kind).await?))
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<Settings>> {
    Ok(Json(state.settings().await?))
}
