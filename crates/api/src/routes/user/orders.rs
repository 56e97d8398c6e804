//! Cart pricing, checkout and the user's own orders.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;

use emporium_core::OrderId;

use crate::db::orders::OrderFilter;
use crate::db::{DiscountRepository, ListParams, OrderRepository, Page};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::order::{
    CheckoutInput, DiscountCheck, DiscountCheckInput, Order, OrderDetail, PreviewInput, Quote,
};
use crate::services::orders::{OrderError, OrderService};
use crate::state::AppState;
use crate::validation::{Path, Query, ValidJson, normalize_code};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(checkout))
        .route("/orders/preview", post(preview))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/cancel", post(cancel))
        .route("/discounts/validate", post(validate_discount))
}

/// Price a cart with current prices, stock and shipping.
async fn preview(
    _user: RequireUser,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<PreviewInput>,
) -> Result<Json<Quote>> {
    let settings = state.settings().await?;
    let quote = OrderService::new(state.pool())
        .preview(&input, &settings)
        .await?;
    Ok(Json(quote))
}

async fn checkout(
    user: RequireUser,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CheckoutInput>,
) -> Result<(StatusCode, Json<OrderDetail>)> {
    let settings = state.settings().await?;
    let order = OrderService::new(state.pool())
        .checkout(user.id(), &input, &settings)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// The caller's orders; `?status=` narrows the list.
async fn list_orders(
    user: RequireUser,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Page<Order>>> {
    let filter = OrderFilter {
        user_id: Some(user.id()),
        ..filter
    };
    let page = OrderRepository::new(state.pool())
        .list(&params, filter)
        .await?;
    Ok(Json(page))
}

async fn get_order(
    user: RequireUser,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    OrderRepository::new(state.pool())
        .get(id, Some(user.id()))
        .await?
        .map(Json)
        .ok_or_else(AppError::not_found)
}

async fn cancel(
    user: RequireUser,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let order = OrderService::new(state.pool())
        .cancel(user.id(), id)
        .await?;
    Ok(Json(order))
}

/// Check a code against a subtotal without placing an order.
async fn validate_discount(
    _user: RequireUser,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<DiscountCheckInput>,
) -> Result<Json<DiscountCheck>> {
    let code = normalize_code(&input.code);
    let discount_amount = DiscountRepository::new(state.pool())
        .get_by_code(&code)
        .await?
        .and_then(|discount| discount.apply(input.subtotal, Utc::now()))
        .ok_or(OrderError::InvalidDiscount)?;

    Ok(Json(DiscountCheck {
        code,
        discount_amount,
    }))
}
