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
use crate::models::{now_timestamp, Area, AreaChanges, Category, Country, NewArea};
use crate::schema::areas;
use crate::state::AppState;
use crate::view_models::{created, ok, paginated, PageParams};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaBody {
    pub id: Option<String>,
    pub name: Option<String>,
    pub country_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AreaQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub country: Option<String>,
}

pub async fn list_areas(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<AreaQuery>,
) -> Result<Response, ApiError> {
    let page = PageParams {
        page: params.page,
        limit: params.limit,
    };
    let (limit, offset) = (page.limit(), page.offset());
    let country = optional(params.country);

    let (rows, total) = state
        .db
        .query("SELECT areas WHERE deleted = 0 [AND country_id = ?]", move |conn| {
            let mut count_q = areas::table.filter(areas::deleted.eq(false)).into_boxed();
            let mut rows_q = areas::table.filter(areas::deleted.eq(false)).into_boxed();
            if let Some(country) = &country {
                count_q = count_q.filter(areas::country_id.eq(country.as_str()));
                rows_q = rows_q.filter(areas::country_id.eq(country.as_str()));
            }
            let total: i64 = count_q.count().get_result(conn)?;
            let rows = rows_q
                .order(areas::name.asc())
                .limit(limit)
                .offset(offset)
                .select(Area::as_select())
                .load(conn)?;
            Ok((rows, total))
        })
        .await?;

    Ok(paginated(rows, page.with_total(total)))
}

pub async fn get_area(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Response, ApiError> {
    let area = state
        .db
        .query("SELECT area BY id", move |conn| Area::find_live(conn, &id))
        .await?
        .ok_or_else(|| ApiError::not_found("Area not found"))?;
    Ok(ok(area))
}

async fn ensure_country(state: &AppState, country_id: &str) -> Result<(), ApiError> {
    let id = country_id.to_string();
    let found = state
        .db
        .query("SELECT country BY id", move |conn| Country::find_live(conn, &id))
        .await?;
    match found {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found(format!("Country '{}' not found", country_id))),
    }
}

pub async fn create_area(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<AreaBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let body = parse_body(body)?;
    let id = required_id(body.id, "id")?;
    let name = required(body.name, "name")?;
    let country_id = required(body.country_id, "countryId")?;

    ensure_country(&state, &country_id).await?;

    let lookup_id = id.clone();
    if state
        .db
        .query("SELECT EXISTS area BY id", move |conn| Area::exists_any(conn, &lookup_id))
        .await?
    {
        return Err(ApiError::conflict(format!("Area '{}' already exists", id)));
    }

    let area = state
        .db
        .query("INSERT INTO areas", move |conn| {
            diesel::insert_into(areas::table)
                .values(NewArea {
                    id: &id,
                    name: &name,
                    country_id: &country_id,
                })
                .execute(conn)?;
            Area::find_any(conn, &id)
        })
        .await?
        .ok_or_else(|| ApiError::internal("Area vanished after insert"))?;

    info!(id = %area.id, country = %area.country_id, "created area");
    Ok(created(area))
}

pub async fn update_area(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    body: Result<Json<AreaBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let body = parse_body(body)?;
    let changes = AreaChanges {
        name: optional(body.name),
        country_id: optional(body.country_id),
        updated_at: now_timestamp(),
    };

    if let Some(country_id) = &changes.country_id {
        ensure_country(&state, country_id).await?;
    }

    let target = id.clone();
    let outcome = state
        .db
        .run_txn("UPDATE areas", move |conn| {
            if Area::find_live(conn, &target)?.is_none() {
                return Ok(Guarded::Missing);
            }
            if let Some(country_id) = &changes.country_id {
                let stranded = Category::placed_elsewhere(conn, &target, country_id)?;
                if stranded > 0 {
                    return Ok(Guarded::InUse(stranded));
                }
            }
            diesel::update(areas::table.find(target.as_str()))
                .set(&changes)
                .execute(conn)?;
            Ok(Area::find_live(conn, &target)?.map_or(Guarded::Missing, Guarded::Done))
        })
        .await?;

    match outcome {
        Guarded::Done(area) => Ok(ok(area)),
        Guarded::Missing => Err(ApiError::not_found("Area not found")),
        Guarded::InUse(n) => Err(ApiError::conflict(format!(
            "Area '{}' still has {} categories in another country",
            id, n
        ))),
    }
}

pub async fn delete_area(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let target = id.clone();
    let outcome = state
        .db
        .run_txn("UPDATE areas SET deleted = 1", move |conn| {
            let cities = Category::cities_in_area(conn, &target)?;
            if cities > 0 {
                return Ok(Guarded::InUse(cities));
            }
            match Area::soft_delete(conn, &target)? {
                0 => Ok(Guarded::Missing),
                _ => Ok(Guarded::Done(())),
            }
        })
        .await?;
    match outcome {
        Guarded::Done(()) => {}
        Guarded::Missing => return Err(ApiError::not_found("Area not found")),
        Guarded::InUse(n) => {
            return Err(ApiError::conflict(format!("Area '{}' is used by {} cities", id, n)))
        }
    }

    info!(id = %id, "soft-deleted area");
    Ok(ok(serde_json::json!({ "id": id, "deleted": true })))
}
