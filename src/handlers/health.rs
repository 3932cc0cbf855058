use axum::extract::State;
use axum::response::Response;
use diesel::prelude::*;
use diesel::sql_types::Integer;

use crate::errors::ApiError;
use crate::handler::WithDB;
use crate::state::AppState;
use crate::view_models::ok;

pub async fn health(State(state): State<AppState>) -> Result<Response, ApiError> {
    let one = state
        .db
        .query("SELECT 1", |conn| {
            diesel::select(diesel::dsl::sql::<Integer>("1")).get_result::<i32>(conn)
        })
        .await?;

    Ok(ok(serde_json::json!({
        "status": "ok",
        "database": one == 1,
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
