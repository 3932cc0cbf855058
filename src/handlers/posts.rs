use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use tracing::info;

use crate::auth::AuthUser;
use crate::errors::ApiError;
use crate::handler::WithDB;
use crate::handlers::common::{clearable, optional, parse_body, required, ApiPath, ApiQuery};
use crate::models::{now_timestamp, Author, Category, NewPost, Post, PostChanges};
use crate::post_util;
use crate::schema::{authors, categories, posts};
use crate::state::AppState;
use crate::view_models::{created, ok, paginated, PageParams, Post as PostView};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostBody {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub category_id: Option<String>,
    pub author_id: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub author: Option<String>,
}

fn load_view(conn: &mut SqliteConnection, post_id: i32) -> QueryResult<Option<PostView>> {
    posts::table
        .inner_join(categories::table)
        .inner_join(authors::table)
        .filter(posts::id.eq(post_id))
        .filter(posts::deleted.eq(false))
        .select((Post::as_select(), categories::name, authors::name))
        .first::<(Post, String, String)>(conn)
        .optional()
        .map(|row| row.map(|(post, category, author)| PostView::new_from(post, category, author)))
}

fn slug_taken(conn: &mut SqliteConnection, slug: &str, except: Option<i32>) -> QueryResult<bool> {
    Ok(match Post::by_slug(conn, slug)? {
        Some(existing) => Some(existing.id) != except,
        None => false,
    })
}

fn checked_slug(slug: Option<String>, title: &str) -> Result<String, ApiError> {
    match optional(slug) {
        Some(slug) if post_util::is_valid_slug(&slug) => Ok(slug),
        Some(slug) => Err(ApiError::bad_request(format!(
            "Invalid slug '{}': use lowercase letters, digits and hyphens",
            slug
        ))),
        None => {
            let derived = post_util::slugify(title);
            if derived.is_empty() {
                Err(ApiError::missing("slug"))
            } else {
                Ok(derived)
            }
        }
    }
}

fn checked_date(date: Option<String>) -> Result<Option<String>, ApiError> {
    match optional(date) {
        Some(d) => post_util::normalize_post_date(&d)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid date '{}'", d))),
        None => Ok(None),
    }
}

async fn ensure_refs(
    state: &AppState,
    category_id: Option<String>,
    author_id: Option<String>,
) -> Result<(), ApiError> {
    if let Some(category_id) = category_id {
        let lookup = category_id.clone();
        let found = state
            .db
            .query("SELECT category BY id", move |conn| Category::find_live(conn, &lookup))
            .await?;
        if found.is_none() {
            return Err(ApiError::not_found(format!("Category '{}' not found", category_id)));
        }
    }
    if let Some(author_id) = author_id {
        let lookup = author_id.clone();
        let found = state
            .db
            .query("SELECT author BY id", move |conn| Author::find_live(conn, &lookup))
            .await?;
        if found.is_none() {
            return Err(ApiError::not_found(format!("Author '{}' not found", author_id)));
        }
    }
    Ok(())
}

pub async fn list_posts(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PostQuery>,
) -> Result<Response, ApiError> {
    let page = PageParams {
        page: params.page,
        limit: params.limit,
    };
    let (limit, offset) = (page.limit(), page.offset());
    let category = optional(params.category);
    let author = optional(params.author);

    let (rows, total) = state
        .db
        .query("SELECT posts JOIN categories JOIN authors WHERE deleted = 0", move |conn| {
            let filtered = || {
                let mut q = posts::table
                    .inner_join(categories::table)
                    .inner_join(authors::table)
                    .filter(posts::deleted.eq(false))
                    .into_boxed();
                if let Some(category) = &category {
                    q = q.filter(posts::category_id.eq(category.as_str()));
                }
                if let Some(author) = &author {
                    q = q.filter(posts::author_id.eq(author.as_str()));
                }
                q
            };
            let total: i64 = filtered().count().get_result(conn)?;
            let rows = filtered()
                .order((posts::date.desc(), posts::id.desc()))
                .limit(limit)
                .offset(offset)
                .select((Post::as_select(), categories::name, authors::name))
                .load::<(Post, String, String)>(conn)?;
            Ok((rows, total))
        })
        .await?;

    let views: Vec<PostView> = rows
        .into_iter()
        .map(|(post, category, author)| PostView::new_from(post, category, author))
        .collect();
    Ok(paginated(views, page.with_total(total)))
}

pub async fn get_post(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Response, ApiError> {
    let post = state
        .db
        .query("SELECT post BY id", move |conn| load_view(conn, id))
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    Ok(ok(post))
}

pub async fn get_post_by_slug(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<Response, ApiError> {
    let post = state
        .db
        .query("SELECT post BY slug", move |conn| match Post::by_slug(conn, &slug)? {
            Some(post) => load_view(conn, post.id),
            None => Ok(None),
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    Ok(ok(post))
}

pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<PostBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let body = parse_body(body)?;
    let title = required(body.title, "title")?;
    let content = required(body.content, "content")?;
    let category_id = required(body.category_id, "categoryId")?;
    let author_id = required(body.author_id, "authorId")?;
    let slug = checked_slug(body.slug, &title)?;
    let date = checked_date(body.date)?.unwrap_or_else(|| post_util::today(Utc::now));
    let excerpt = optional(body.excerpt);
    let image = optional(body.image);

    ensure_refs(&state, Some(category_id.clone()), Some(author_id.clone())).await?;

    let lookup_slug = slug.clone();
    if state
        .db
        .query("SELECT post BY slug", move |conn| slug_taken(conn, &lookup_slug, None))
        .await?
    {
        return Err(ApiError::conflict(format!("A post with slug '{}' already exists", slug)));
    }

    let post = state
        .db
        .query("INSERT INTO posts", move |conn| {
            diesel::insert_into(posts::table)
                .values(NewPost {
                    slug: &slug,
                    title: &title,
                    excerpt: excerpt.as_deref(),
                    content: &content,
                    image: image.as_deref(),
                    category_id: &category_id,
                    author_id: &author_id,
                    date: &date,
                })
                .execute(conn)?;
            match Post::by_slug(conn, &slug)? {
                Some(post) => load_view(conn, post.id),
                None => Ok(None),
            }
        })
        .await?
        .ok_or_else(|| ApiError::internal("Post vanished after insert"))?;

    info!(id = post.post.id, slug = %post.post.slug, "created post");
    Ok(created(post))
}

pub async fn update_post(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
    body: Result<Json<PostBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let body = parse_body(body)?;

    let current = state
        .db
        .query("SELECT post BY id", move |conn| Post::find_live(conn, id))
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    let slug = match optional(body.slug) {
        Some(slug) if slug != current.slug => Some(checked_slug(Some(slug), &current.title)?),
        _ => None,
    };
    let changes = PostChanges {
        slug,
        title: optional(body.title),
        excerpt: clearable(body.excerpt),
        content: optional(body.content),
        image: clearable(body.image),
        category_id: optional(body.category_id),
        author_id: optional(body.author_id),
        date: checked_date(body.date)?,
        updated_at: now_timestamp(),
    };

    ensure_refs(&state, changes.category_id.clone(), changes.author_id.clone()).await?;

    if let Some(slug) = changes.slug.clone() {
        let lookup = slug.clone();
        if state
            .db
            .query("SELECT post BY slug", move |conn| slug_taken(conn, &lookup, Some(id)))
            .await?
        {
            return Err(ApiError::conflict(format!("A post with slug '{}' already exists", slug)));
        }
    }

    let post = state
        .db
        .query("UPDATE posts", move |conn| {
            diesel::update(posts::table.find(id))
                .set(&changes)
                .execute(conn)?;
            load_view(conn, id)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    Ok(ok(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let affected = state
        .db
        .query("UPDATE posts SET deleted = 1", move |conn| Post::soft_delete(conn, id))
        .await?;
    if affected == 0 {
        return Err(ApiError::not_found("Post not found"));
    }

    info!(id, "soft-deleted post");
    Ok(ok(serde_json::json!({ "id": id, "deleted": true })))
}
