use std::sync::Arc;

use axum::{
    Json,
    extract::{self, rejection::JsonRejection},
    http::StatusCode,
};
use catalog::{Order, OrderRequest, order::price_order};
use tracing::info;

use crate::{auth::AuthUser, error::AppError, state::State, utils::json_body};

/// Prices every line from the catalog; client-sent prices are never trusted.
pub async fn place_order(
    user: AuthUser,
    extract::State(state): extract::State<Arc<State>>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let request = json_body(payload)?;
    request.validate()?;

    let mut resolved = Vec::with_capacity(request.items.len());
    for item in &request.items {
        resolved.push(state.store.get(item.category, item.id).await?);
    }

    let order = price_order(&user.uid, user.email, request, resolved)?;
    state.store.insert_order(&order).await?;

    info!(
        "Order {} placed by {}: {} lines, total {:.2}",
        order.order_id,
        order.uid,
        order.items.len(),
        order.total
    );

    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    user: AuthUser,
    extract::State(state): extract::State<Arc<State>>,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.store.orders_for(&user.uid).await?))
}
