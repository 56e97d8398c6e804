//! Products, product items and product pictures.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, put},
};

use emporium_core::{Permission, ProductId, ProductItemId, ProductPicId};

use crate::db::product_items::ProductItemFilter;
use crate::db::products::ProductFilter;
use crate::db::{
    BrandRepository, CategoryRepository, ColorRepository, FeatureRepository, FileRepository,
    ListParams, Page, ProductItemRepository, ProductPicRepository, ProductRepository,
};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::catalog::{
    AttachPicInput, Product, ProductDetail, ProductInput, ProductItem, ProductItemInput,
    ProductPic, ReorderInput,
};
use crate::state::AppState;
use crate::validation::{Path, Query, ValidJson, ValidationErrors};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/{id}/pics", get(list_pics).post(attach_pic))
        .route("/products/{id}/pics/reorder", put(reorder_pics))
        .route("/products/{id}/pics/{pic_id}", delete(detach_pic))
        .route("/product-items", get(list_items).post(create_item))
        .route(
            "/product-items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
}

// =============================================================================
// Products
// =============================================================================

async fn list_products(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Page<Product>>> {
    admin.require(Permission::ManageCatalog)?;
    let page = ProductRepository::new(state.pool())
        .list(&params, filter)
        .await?;
    Ok(Json(page))
}

/// Full product view, inactive items included.
async fn get_product(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetail>> {
    admin.require(Permission::ManageCatalog)?;
    ProductRepository::new(state.pool())
        .get_detail(id, false)
        .await?
        .map(Json)
        .ok_or_else(AppError::not_found)
}

async fn create_product(
    admin: RequireAdmin,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    admin.require(Permission::ManageCatalog)?;
    check_product_refs(&state, &input).await?;

    let product = ProductRepository::new(state.pool())
        .create(&input, admin.actor())
        .await?;
    tracing::info!(product_id = %product.id, code = %product.code, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    ValidJson(input): ValidJson<ProductInput>,
) -> Result<Json<Product>> {
    admin.require(Permission::ManageCatalog)?;
    check_product_refs(&state, &input).await?;

    let product = ProductRepository::new(state.pool())
        .update(id, &input, admin.actor())
        .await?;
    Ok(Json(product))
}

async fn delete_product(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    admin.require(Permission::ManageCatalog)?;
    ProductRepository::new(state.pool())
        .delete(id, admin.actor())
        .await?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Brand, category and every feature must exist.
async fn check_product_refs(state: &AppState, input: &ProductInput) -> Result<()> {
    let pool = state.pool();
    let mut errors = ValidationErrors::new();

    if !BrandRepository::new(pool).exists(input.brand_id).await? {
        errors.add("brand_id", "brand does not exist");
    }
    if !CategoryRepository::new(pool).exists(input.category_id).await? {
        errors.add("category_id", "category does not exist");
    }

    let feature_ids: Vec<_> = input.features.iter().map(|f| f.feature_id).collect();
    if !feature_ids.is_empty() {
        let missing = FeatureRepository::new(pool).missing(&feature_ids).await?;
        if !missing.is_empty() {
            let ids: Vec<String> = missing.iter().map(ToString::to_string).collect();
            errors.add(
                "features",
                format!("unknown feature ids: {}", ids.join(", ")),
            );
        }
    }

    Ok(errors.into_result()?)
}

// =============================================================================
// Product Items
// =============================================================================

async fn list_items(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(filter): Query<ProductItemFilter>,
) -> Result<Json<Page<ProductItem>>> {
    admin.require(Permission::ManageCatalog)?;
    let page = ProductItemRepository::new(state.pool())
        .list(&params, filter)
        .await?;
    Ok(Json(page))
}

async fn get_item(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductItemId>,
) -> Result<Json<ProductItem>> {
    admin.require(Permission::ManageCatalog)?;
    ProductItemRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(AppError::not_found)
}

async fn create_item(
    admin: RequireAdmin,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<ProductItemInput>,
) -> Result<(StatusCode, Json<ProductItem>)> {
    admin.require(Permission::ManageCatalog)?;
    check_item_refs(&state, &input).await?;

    let item = ProductItemRepository::new(state.pool())
        .create(&input, admin.actor())
        .await?;
    tracing::info!(item_id = %item.id, sku = %item.sku, "Product item created");
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductItemId>,
    ValidJson(input): ValidJson<ProductItemInput>,
) -> Result<Json<ProductItem>> {
    admin.require(Permission::ManageCatalog)?;
    check_item_refs(&state, &input).await?;

    let item = ProductItemRepository::new(state.pool())
        .update(id, &input, admin.actor())
        .await?;
    Ok(Json(item))
}

async fn delete_item(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductItemId>,
) -> Result<StatusCode> {
    admin.require(Permission::ManageCatalog)?;
    ProductItemRepository::new(state.pool())
        .delete(id, admin.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn check_item_refs(state: &AppState, input: &ProductItemInput) -> Result<()> {
    let pool = state.pool();
    let mut errors = ValidationErrors::new();

    if !ProductRepository::new(pool)
        .exists(input.product_id, false)
        .await?
    {
        errors.add("product_id", "product does not exist");
    }
    if let Some(color_id) = input.color_id
        && !ColorRepository::new(pool).exists(color_id).await?
    {
        errors.add("color_id", "color does not exist");
    }

    Ok(errors.into_result()?)
}

// =============================================================================
// Product Pictures
// =============================================================================

async fn list_pics(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Vec<ProductPic>>> {
    admin.require(Permission::ManageCatalog)?;
    ensure_product(&state, id).await?;
    let pics = ProductPicRepository::new(state.pool())
        .list_for_product(id)
        .await?;
    Ok(Json(pics))
}

async fn attach_pic(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    ValidJson(input): ValidJson<AttachPicInput>,
) -> Result<(StatusCode, Json<ProductPic>)> {
    admin.require(Permission::ManageCatalog)?;
    ensure_product(&state, id).await?;
    if !FileRepository::new(state.pool()).exists(input.file_id).await? {
        return Err(AppError::invalid_field("file_id", "file does not exist"));
    }

    let pic = ProductPicRepository::new(state.pool())
        .attach(id, input.file_id, admin.actor())
        .await?;
    tracing::info!(product_id = %id, pic_id = %pic.id, priority = pic.priority, "Picture attached");
    Ok((StatusCode::CREATED, Json(pic)))
}

async fn detach_pic(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path((id, pic_id)): Path<(ProductId, ProductPicId)>,
) -> Result<StatusCode> {
    admin.require(Permission::ManageCatalog)?;
    ProductPicRepository::new(state.pool())
        .detach(id, pic_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reorder_pics(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    ValidJson(input): ValidJson<ReorderInput>,
) -> Result<Json<Vec<ProductPic>>> {
    admin.require(Permission::ManageCatalog)?;
    ensure_product(&state, id).await?;
    let pics = ProductPicRepository::new(state.pool())
        .reorder(id, &input.ids)
        .await?;
    Ok(Json(pics))
}

async fn ensure_product(state: &AppState, id: ProductId) -> Result<()> {
    if ProductRepository::new(state.pool()).exists(id, false).await? {
        Ok(())
    } else {
        Err(AppError::not_found())
    }
}
