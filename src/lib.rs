#[macro_use]
extern crate diesel;

use std::time::Duration;

use anyhow::anyhow;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use diesel::connection::SimpleConnection;
use diesel::prelude::SqliteConnection;
use diesel::r2d2;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod constants;
pub mod errors;
pub mod handler;
pub mod handlers;
pub mod media_util;
pub mod models;
pub mod post_util;
pub mod schema;
pub mod short_code;
pub mod state;
pub mod view_models;

pub use crate::constants::*;

use crate::handlers::{
    areas, authors, categories, contact, countries, health, posts, redirect, short_links, uploads,
    users,
};
use crate::state::AppState;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

// Room for the multipart framing around the file itself.
const UPLOAD_BODY_OVERHEAD: usize = 64 * 1024;

#[derive(Debug)]
struct SqlitePragmas;

impl r2d2::CustomizeConnection<SqliteConnection, r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            SQLITE_BUSY_TIMEOUT_MS
        ))
        .map_err(r2d2::Error::QueryError)
    }
}

pub fn new_dbconn_pool(
    database_url: &str,
    max_size: u32,
) -> Result<r2d2::Pool<r2d2::ConnectionManager<SqliteConnection>>, anyhow::Error> {
    let manager = r2d2::ConnectionManager::<SqliteConnection>::new(database_url);
    Ok(r2d2::Pool::builder()
        .max_size(max_size)
        .connection_timeout(Duration::from_secs(10))
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)?)
}

pub fn run_migrations(pool: &handler::DbPool) -> Result<(), anyhow::Error> {
    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!("error running migrations: {}", e))?;
    for migration in applied {
        info!("applied migration {}", migration);
    }
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + UPLOAD_BODY_OVERHEAD;

    let api = Router::new()
        .route("/health", get(health::health))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        .route(
            "/countries",
            get(countries::list_countries).post(countries::create_country),
        )
        .route(
            "/countries/:id",
            get(countries::get_country)
                .put(countries::update_country)
                .delete(countries::delete_country),
        )
        .route("/areas", get(areas::list_areas).post(areas::create_area))
        .route(
            "/areas/:id",
            get(areas::get_area)
                .put(areas::update_area)
                .delete(areas::delete_area),
        )
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/:id",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route(
            "/authors",
            get(authors::list_authors).post(authors::create_author),
        )
        .route(
            "/authors/:id",
            get(authors::get_author)
                .put(authors::update_author)
                .delete(authors::delete_author),
        )
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/slug/:slug", get(posts::get_post_by_slug))
        .route(
            "/posts/:id",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/contact",
            get(contact::list_messages).post(contact::submit_message),
        )
        .route(
            "/contact/:id",
            get(contact::get_message)
                .put(contact::update_message)
                .delete(contact::delete_message),
        )
        .route(
            "/short-links",
            get(short_links::list_short_links).post(short_links::create_short_link),
        )
        .route("/short-links/track", post(short_links::track_click))
        .route(
            "/short-links/:id",
            get(short_links::get_short_link).delete(short_links::delete_short_link),
        )
        .route(
            "/upload",
            post(uploads::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        );

    Router::new()
        .nest("/api", api)
        .route("/uploads/*path", get(uploads::serve_upload))
        .route("/redirect", get(redirect::redirect))
        .route("/s/:code", get(redirect::follow_short_link))
        .fallback(|| async { errors::ApiError::not_found("Route not found") })
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
