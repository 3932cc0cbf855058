use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use tracing::info;

use crate::auth::AuthUser;
use crate::errors::ApiError;
use crate::handler::WithDB;
use crate::handlers::common::{
    optional, parse_body, required, required_id, ApiPath, ApiQuery, Guarded,
};
use crate::models::{now_timestamp, Category, Country, NewCountry};
use crate::schema::countries;
use crate::state::AppState;
use crate::view_models::{created, ok, paginated, PageParams};

#[derive(Debug, Default, Deserialize)]
pub struct CountryBody {
    pub id: Option<String>,
    pub name: Option<String>,
}

pub async fn list_countries(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<Response, ApiError> {
    let (limit, offset) = (page.limit(), page.offset());
    let (rows, total) = state
        .db
        .query("SELECT countries WHERE deleted = 0", move |conn| {
            let live = countries::table.filter(countries::deleted.eq(false));
            let total: i64 = live.clone().count().get_result(conn)?;
            let rows = live
                .order(countries::name.asc())
                .limit(limit)
                .offset(offset)
                .select(Country::as_select())
                .load(conn)?;
            Ok((rows, total))
        })
        .await?;

    Ok(paginated(rows, page.with_total(total)))
}

pub async fn get_country(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Response, ApiError> {
    let country = state
        .db
        .query("SELECT country BY id", move |conn| Country::find_live(conn, &id))
        .await?
        .ok_or_else(|| ApiError::not_found("Country not found"))?;
    Ok(ok(country))
}

pub async fn create_country(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<CountryBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let body = parse_body(body)?;
    let id = required_id(body.id, "id")?;
    let name = required(body.name, "name")?;

    let lookup_id = id.clone();
    if state
        .db
        .query("SELECT EXISTS country BY id", move |conn| Country::exists_any(conn, &lookup_id))
        .await?
    {
        return Err(ApiError::conflict(format!("Country '{}' already exists", id)));
    }

    let country = state
        .db
        .query("INSERT INTO countries", move |conn| {
            diesel::insert_into(countries::table)
                .values(NewCountry { id: &id, name: &name })
                .execute(conn)?;
            Country::find_any(conn, &id)
        })
        .await?
        .ok_or_else(|| ApiError::internal("Country vanished after insert"))?;

    info!(id = %country.id, "created country");
    Ok(created(country))
}

pub async fn update_country(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    body: Result<Json<CountryBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let body = parse_body(body)?;
    let name = optional(body.name);

    let country = state
        .db
        .query("UPDATE countries SET name", move |conn| {
            if Country::find_live(conn, &id)?.is_none() {
                return Ok(None);
            }
            if let Some(name) = &name {
                diesel::update(countries::table.find(id.as_str()))
                    .set((countries::name.eq(name.as_str()), countries::updated_at.eq(now_timestamp())))
                    .execute(conn)?;
            }
            Country::find_live(conn, &id)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Country not found"))?;

    Ok(ok(country))
}

pub async fn delete_country(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let target = id.clone();
    let outcome = state
        .db
        .run_txn("UPDATE countries SET deleted = 1", move |conn| {
            let cities = Category::cities_in_country(conn, &target)?;
            if cities > 0 {
                return Ok(Guarded::InUse(cities));
            }
            match Country::soft_delete(conn, &target)? {
                0 => Ok(Guarded::Missing),
                _ => Ok(Guarded::Done(())),
            }
        })
        .await?;
    match outcome {
        Guarded::Done(()) => {}
        Guarded::Missing => return Err(ApiError::not_found("Country not found")),
        Guarded::InUse(n) => {
            return Err(ApiError::conflict(format!("Country '{}' is used by {} cities", id, n)))
        }
    }

    info!(id = %id, "soft-deleted country");
    Ok(ok(serde_json::json!({ "id": id, "deleted": true })))
}
