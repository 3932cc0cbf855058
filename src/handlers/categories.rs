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
use crate::handlers::common::{optional, parse_body, required, required_id, ApiPath, ApiQuery};
use crate::models::{now_timestamp, Area, Category, CategoryChanges, Country, NewCategory};
use crate::schema::categories;
use crate::state::AppState;
use crate::view_models::{created, ok, paginated, PageParams};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBody {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_city: Option<bool>,
    pub country_id: Option<String>,
    pub area_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub city: Option<bool>,
    pub country: Option<String>,
    pub area: Option<String>,
}

/// The taxonomy references a category ends up with after validation.
#[derive(Debug, Clone, PartialEq)]
struct Placement {
    is_city: bool,
    country_id: Option<String>,
    area_id: Option<String>,
}

/// A city needs both references; any reference given must point at a live
/// row, and the area must sit inside the country.
async fn validate_placement(state: &AppState, placement: &Placement) -> Result<(), ApiError> {
    if placement.is_city {
        if placement.country_id.is_none() {
            return Err(ApiError::bad_request("countryId is required for a city"));
        }
        if placement.area_id.is_none() {
            return Err(ApiError::bad_request("areaId is required for a city"));
        }
    }

    if let Some(country_id) = placement.country_id.clone() {
        let lookup = country_id.clone();
        let country = state
            .db
            .query("SELECT country BY id", move |conn| Country::find_live(conn, &lookup))
            .await?;
        if country.is_none() {
            return Err(ApiError::not_found(format!("Country '{}' not found", country_id)));
        }
    }

    if let Some(area_id) = placement.area_id.clone() {
        let lookup = area_id.clone();
        let area = state
            .db
            .query("SELECT area BY id", move |conn| Area::find_live(conn, &lookup))
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Area '{}' not found", area_id)))?;
        if let Some(country_id) = &placement.country_id {
            if &area.country_id != country_id {
                return Err(ApiError::bad_request(format!(
                    "Area '{}' does not belong to country '{}'",
                    area.id, country_id
                )));
            }
        }
    }

    Ok(())
}

pub async fn list_categories(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CategoryQuery>,
) -> Result<Response, ApiError> {
    let page = PageParams {
        page: params.page,
        limit: params.limit,
    };
    let (limit, offset) = (page.limit(), page.offset());
    let city = params.city;
    let country = optional(params.country);
    let area = optional(params.area);

    let (rows, total) = state
        .db
        .query("SELECT categories WHERE deleted = 0 [filters]", move |conn| {
            let filtered = || {
                let mut q = categories::table
                    .filter(categories::deleted.eq(false))
                    .into_boxed();
                if let Some(city) = city {
                    q = q.filter(categories::is_city.eq(city));
                }
                if let Some(country) = &country {
                    q = q.filter(categories::country_id.eq(country.as_str()));
                }
                if let Some(area) = &area {
                    q = q.filter(categories::area_id.eq(area.as_str()));
                }
                q
            };
            let total: i64 = filtered().count().get_result(conn)?;
            let rows = filtered()
                .order(categories::name.asc())
                .limit(limit)
                .offset(offset)
                .select(Category::as_select())
                .load(conn)?;
            Ok((rows, total))
        })
        .await?;

    Ok(paginated(rows, page.with_total(total)))
}

pub async fn get_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Response, ApiError> {
    let category = state
        .db
        .query("SELECT category BY id", move |conn| Category::find_live(conn, &id))
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;
    Ok(ok(category))
}

pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<CategoryBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let body = parse_body(body)?;
    let id = required_id(body.id, "id")?;
    let name = required(body.name, "name")?;
    let placement = Placement {
        is_city: body.is_city.unwrap_or(false),
        country_id: optional(body.country_id),
        area_id: optional(body.area_id),
    };
    validate_placement(&state, &placement).await?;

    let lookup_id = id.clone();
    if state
        .db
        .query("SELECT EXISTS category BY id", move |conn| Category::exists_any(conn, &lookup_id))
        .await?
    {
        return Err(ApiError::conflict(format!("Category '{}' already exists", id)));
    }

    let description = optional(body.description);
    let image = optional(body.image);
    let category = state
        .db
        .query("INSERT INTO categories", move |conn| {
            diesel::insert_into(categories::table)
                .values(NewCategory {
                    id: &id,
                    name: &name,
                    description: description.as_deref(),
                    image: image.as_deref(),
                    is_city: placement.is_city,
                    country_id: placement.country_id.as_deref(),
                    area_id: placement.area_id.as_deref(),
                })
                .execute(conn)?;
            Category::find_any(conn, &id)
        })
        .await?
        .ok_or_else(|| ApiError::internal("Category vanished after insert"))?;

    info!(id = %category.id, city = category.is_city, "created category");
    Ok(created(category))
}

/// `None` keeps the stored value, a blank string clears it.
fn merge(incoming: Option<String>, current: Option<String>) -> Option<String> {
    match incoming {
        Some(v) => optional(Some(v)),
        None => current,
    }
}

pub async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    body: Result<Json<CategoryBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let body = parse_body(body)?;

    let lookup_id = id.clone();
    let current = state
        .db
        .query("SELECT category BY id", move |conn| Category::find_live(conn, &lookup_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    let placement = Placement {
        is_city: body.is_city.unwrap_or(current.is_city),
        country_id: merge(body.country_id, current.country_id.clone()),
        area_id: merge(body.area_id, current.area_id.clone()),
    };
    validate_placement(&state, &placement).await?;

    let changes = CategoryChanges {
        name: optional(body.name).unwrap_or(current.name),
        description: merge(body.description, current.description),
        image: merge(body.image, current.image),
        is_city: placement.is_city,
        country_id: placement.country_id,
        area_id: placement.area_id,
        updated_at: now_timestamp(),
    };

    let category = state
        .db
        .query("UPDATE categories", move |conn| {
            diesel::update(categories::table.find(id.as_str()))
                .set(&changes)
                .execute(conn)?;
            Category::find_live(conn, &id)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    Ok(ok(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let target = id.clone();
    let affected = state
        .db
        .query("UPDATE categories SET deleted = 1", move |conn| {
            Category::soft_delete(conn, &target)
        })
        .await?;
    if affected == 0 {
        return Err(ApiError::not_found("Category not found"));
    }

    info!(id = %id, "soft-deleted category");
    Ok(ok(serde_json::json!({ "id": id, "deleted": true })))
}
