use std::sync::Arc;

use axum::{
    Json,
    extract::{self, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::{auth::AdminUser, error::AppError, state::State, utils::json_body};

#[derive(Debug, Deserialize)]
pub struct SetClaimRequest {
    pub uid: String,
    #[serde(default = "grant")]
    pub admin: bool,
}

fn grant() -> bool {
    true
}

pub async fn set_claim(
    AdminUser(caller): AdminUser,
    extract::State(state): extract::State<Arc<State>>,
    payload: Result<Json<SetClaimRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let SetClaimRequest { uid, admin } = json_body(payload)?;
    let uid = uid.trim();

    if uid.is_empty() {
        return Err(AppError::BadRequest("uid is required".to_string()));
    }
    if uid == caller.uid && !admin {
        return Err(AppError::BadRequest(
            "Admins cannot revoke their own claim".to_string(),
        ));
    }

    state.claims.set_admin_claim(uid, admin).await?;
    info!("{} set admin={admin} on {uid}", caller.uid);

    Ok(Json(json!({
        "message": "Custom claim updated; the user must refresh their ID token",
        "uid": uid,
        "admin": admin,
    })))
}
