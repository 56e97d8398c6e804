//! Shop settings.

use axum::{Json, Router, extract::State, routing::get};

use emporium_core::Permission;

use crate::db::SettingsRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::settings::{Settings, SettingsUpdate};
use crate::state::AppState;
use crate::validation::ValidJson;

pub fn router() -> Router<AppState> {
    Router::new().route("/settings", get(get_settings).put(update_settings))
}

/// Read straight from the database, bypassing the cache.
async fn get_settings(admin: RequireAdmin, State(state): State<AppState>) -> Result<Json<Settings>> {
    admin.require(Permission::ManageSettings)?;
    Ok(Json(SettingsRepository::new(state.pool()).get().await?))
}

/// Update any subset of fields.
async fn update_settings(
    admin: RequireAdmin,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<SettingsUpdate>,
) -> Result<Json<Settings>> {
    admin.require(Permission::ManageSettings)?;
    let settings = SettingsRepository::new(state.pool())
        .update(&input, admin.actor())
        .await?;
    state.invalidate_settings().await;

    tracing::info!(user_id = %admin.0.id, "Settings updated");
    Ok(Json(settings))
}
