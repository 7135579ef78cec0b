use std::{collections::HashMap, sync::Arc};

use axum::{
    Extension, Json,
    extract::{self, Path, Query, rejection::JsonRejection},
    http::StatusCode,
};
use catalog::{Category, NewProduct, Product, ProductPatch, ProductQuery};
use serde_json::{Value, json};
use tracing::info;

use crate::{
    auth::{AdminUser, Reader},
    error::AppError,
    loader::{LoadReport, reseed},
    state::State,
    utils::{json_body, parse_id},
};

pub async fn list_products(
    _reader: Reader,
    Extension(category): Extension<Category>,
    extract::State(state): extract::State<Arc<State>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Product>>, AppError> {
    let query = ProductQuery::from_params(&params)?;

    Ok(Json(state.store.list(category, &query).await?))
}

pub async fn get_product(
    _reader: Reader,
    Extension(category): Extension<Category>,
    extract::State(state): extract::State<Arc<State>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, AppError> {
    let id = parse_id(&id)?;

    state
        .store
        .get(category, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(category, id))
}

pub async fn add_product(
    AdminUser(admin): AdminUser,
    Extension(category): Extension<Category>,
    extract::State(state): extract::State<Arc<State>>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = json_body(payload)?;
    product.validate()?;

    let product = state.store.insert(category, product).await?;
    info!("{} added {category} {}", admin.uid, product.id);

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    AdminUser(admin): AdminUser,
    Extension(category): Extension<Category>,
    extract::State(state): extract::State<Arc<State>>,
    Path(id): Path<String>,
    payload: Result<Json<ProductPatch>, JsonRejection>,
) -> Result<Json<Product>, AppError> {
    let id = parse_id(&id)?;
    let patch = json_body(payload)?;
    patch.validate()?;

    let product = state
        .store
        .update(category, id, patch)
        .await?
        .ok_or_else(|| not_found(category, id))?;
    info!("{} updated {category} {id}", admin.uid);

    Ok(Json(product))
}

pub async fn delete_product(
    AdminUser(admin): AdminUser,
    Extension(category): Extension<Category>,
    extract::State(state): extract::State<Arc<State>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id)?;

    if !state.store.delete(category, id).await? {
        return Err(not_found(category, id));
    }
    info!("{} deleted {category} {id}", admin.uid);

    Ok(Json(json!({ "message": "Product deleted", "id": id })))
}

pub async fn load_data(
    AdminUser(admin): AdminUser,
    Extension(category): Extension<Category>,
    extract::State(state): extract::State<Arc<State>>,
) -> Result<Json<LoadReport>, AppError> {
    info!("{} requested a reseed of {category}", admin.uid);

    Ok(Json(
        reseed(state.store.as_ref(), state.feed.as_ref(), category).await?,
    ))
}

fn not_found(category: Category, id: i64) -> AppError {
    AppError::NotFound(format!("No {category} with id {id}"))
}
