//! Order management and discount codes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};

use emporium_core::{DiscountId, OrderId, Permission};

use crate::db::discounts::DiscountFilter;
use crate::db::orders::OrderFilter;
use crate::db::{DiscountRepository, ListParams, OrderRepository, Page};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::order::{Discount, DiscountInput, Order, OrderDetail, StatusChangeInput};
use crate::services::orders::OrderService;
use crate::state::AppState;
use crate::validation::{Path, Query, ValidJson};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/status", put(change_status))
        .route("/discounts", get(list_discounts).post(create_discount))
        .route(
            "/discounts/{id}",
            get(get_discount)
                .put(update_discount)
                .delete(delete_discount),
        )
}

// =============================================================================
// Orders
// =============================================================================

async fn list_orders(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Page<Order>>> {
    admin.require(Permission::ManageOrders)?;
    let page = OrderRepository::new(state.pool())
        .list(&params, filter)
        .await?;
    Ok(Json(page))
}

async fn get_order(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    admin.require(Permission::ManageOrders)?;
    OrderRepository::new(state.pool())
        .get(id, None)
        .await?
        .map(Json)
        .ok_or_else(AppError::not_found)
}

async fn change_status(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    ValidJson(input): ValidJson<StatusChangeInput>,
) -> Result<Json<OrderDetail>> {
    admin.require(Permission::ManageOrders)?;
    let order = OrderService::new(state.pool())
        .change_status(id, input.status, admin.actor())
        .await?;
    Ok(Json(order))
}

// =============================================================================
// Discounts
// =============================================================================

async fn list_discounts(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(filter): Query<DiscountFilter>,
) -> Result<Json<Page<Discount>>> {
    admin.require(Permission::ManageDiscounts)?;
    let page = DiscountRepository::new(state.pool())
        .list(&params, filter)
        .await?;
    Ok(Json(page))
}

async fn get_discount(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DiscountId>,
) -> Result<Json<Discount>> {
    admin.require(Permission::ManageDiscounts)?;
    DiscountRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(AppError::not_found)
}

async fn create_discount(
    admin: RequireAdmin,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<DiscountInput>,
) -> Result<(StatusCode, Json<Discount>)> {
    admin.require(Permission::ManageDiscounts)?;
    let discount = DiscountRepository::new(state.pool())
        .create(&input, admin.actor())
        .await?;
    tracing::info!(discount_id = %discount.id, code = %discount.code, "Discount created");
    Ok((StatusCode::CREATED, Json(discount)))
}

async fn update_discount(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DiscountId>,
    ValidJson(input): ValidJson<DiscountInput>,
) -> Result<Json<Discount>> {
    admin.require(Permission::ManageDiscounts)?;
    let discount = DiscountRepository::new(state.pool())
        .update(id, &input, admin.actor())
        .await?;
    Ok(Json(discount))
}

async fn delete_discount(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DiscountId>,
) -> Result<StatusCode> {
    admin.require(Permission::ManageDiscounts)?;
    DiscountRepository::new(state.pool())
        .delete(id, admin.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
