use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract,
    routing::{delete, get, post, put},
};
use catalog::Category;
use serde_json::{Value, json};

use crate::{error::AppError, state::State};

pub mod admin;
pub mod orders;
pub mod products;

use admin::set_claim;
use orders::{list_orders, place_order};
use products::{add_product, delete_product, get_product, list_products, load_data, update_product};

/// `/{prefix}`, `/{prefix}/{id}`, `/{prefix}/add`, `/{prefix}/update/{id}`,
/// `/{prefix}/delete/{id}` and `/{prefix}/load-data` for one category.
pub fn category_routes(category: Category) -> Router<Arc<State>> {
    let prefix = category.prefix();

    Router::new()
        .route(&format!("/{prefix}"), get(list_products))
        .route(&format!("/{prefix}/"), get(list_products))
        .route(&format!("/{prefix}/add"), post(add_product))
        .route(&format!("/{prefix}/load-data"), post(load_data))
        .route(
            &format!("/{prefix}/update/{{id}}"),
            put(update_product).patch(update_product),
        )
        .route(&format!("/{prefix}/delete/{{id}}"), delete(delete_product))
        .route(&format!("/{prefix}/{{id}}"), get(get_product))
        .layer(Extension(category))
}

pub fn api_routes() -> Router<Arc<State>> {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/admin/set-claim", post(set_claim))
        .route("/api/place-order", post(place_order))
        .route("/api/orders", get(list_orders));

    for category in Category::ALL {
        router = router.merge(category_routes(category));
    }

    router
}

async fn health(
    extract::State(state): extract::State<Arc<State>>,
) -> Result<Json<Value>, AppError> {
    state
        .store
        .ping()
        .await
        .map_err(|e| AppError::Unavailable(e.to_string()))?;

    Ok(Json(json!({
        "status": "ok",
        "store": state.store.backend_tag(),
    })))
}
