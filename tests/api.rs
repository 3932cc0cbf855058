use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use diesel::prelude::*;
use http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use gazette_rs::auth::{self, Claims, Role};
use gazette_rs::config::CmsConfig;
use gazette_rs::handler::{CmsDB, DbPool};
use gazette_rs::models::{Area, Author, Category, Country, NewUser, User};
use gazette_rs::schema::{posts, users};
use gazette_rs::state::AppState;

const SECRET: &str = "integration-secret-integration-secret";

struct TestApp {
    _dir: TempDir,
    pool: Arc<DbPool>,
    router: Router,
    admin_token: String,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("cms.db");
        let pool = Arc::new(gazette_rs::new_dbconn_pool(db_path.to_str().unwrap(), 4).unwrap());
        gazette_rs::run_migrations(&pool).unwrap();

        let config = CmsConfig {
            jwt_secret: SECRET.into(),
            upload_dir: dir.path().join("uploads"),
            ..CmsConfig::default()
        };
        let router = gazette_rs::build_router(AppState::new(CmsDB::new(pool.clone()), config));

        let mut app = TestApp {
            _dir: dir,
            pool,
            router,
            admin_token: String::new(),
        };
        let admin = app.seed_user("admin@example.com", "admin password", "admin", "active");
        app.admin_token =
            auth::issue_token(&Claims::new(admin.id, &admin.email, Role::Admin), SECRET).unwrap();
        app
    }

    fn seed_user(&self, email: &str, password: &str, role: &str, status: &str) -> User {
        let mut conn = self.pool.get().unwrap();
        let hash = auth::hash_password(password).unwrap();
        diesel::insert_into(users::table)
            .values(NewUser {
                name: "Seeded",
                email,
                password_hash: &hash,
                role,
                status,
                avatar: None,
            })
            .execute(&mut conn)
            .unwrap();
        User::by_email(&mut conn, email).unwrap().unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, http::HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let (status, _, body) = self
            .send(Request::get(uri).body(Body::empty()).unwrap())
            .await;
        (status, body)
    }

    async fn admin(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.admin_token))
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, body) = self.send(request).await;
        (status, body)
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, http::HeaderMap, Value) {
        let request = Request::post(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn seed_taxonomy(&self) {
        let (status, _) = self
            .admin("POST", "/api/categories", json!({"id": "travel", "name": "Travel"}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = self
            .admin("POST", "/api/authors", json!({"id": "ana", "name": "Ana"}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

fn multipart_file(mime_type: &str, filename: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "gazette-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            boundary, filename, mime_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}

#[tokio::test]
async fn health_pings_the_database() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["database"], true);
}

#[tokio::test]
async fn creating_a_short_link_normalizes_the_url() {
    let app = TestApp::new();
    let (status, body) = app
        .admin("POST", "/api/short-links", json!({"originalUrl": "example.com/page"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["originalUrl"], "https://example.com/page");
    let code = body["data"]["shortCode"].as_str().unwrap();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(body["data"]["clicks"], 0);
}

#[tokio::test]
async fn short_links_need_a_session() {
    let app = TestApp::new();
    let (status, _, body) = app
        .post_json("/api/short-links", json!({"originalUrl": "example.com"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, body) = app.admin("POST", "/api/short-links", json!({"originalUrl": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "URL is required");
}

#[tokio::test]
async fn duplicate_slug_is_a_conflict() {
    let app = TestApp::new();
    app.seed_taxonomy().await;

    let post = json!({
        "slug": "night-trains",
        "title": "Night Trains",
        "content": "All aboard.",
        "categoryId": "travel",
        "authorId": "ana",
    });
    let (status, body) = app.admin("POST", "/api/posts", post.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["categoryName"], "Travel");
    assert_eq!(body["data"]["authorName"], "Ana");

    let (status, body) = app.admin("POST", "/api/posts", post).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let mut conn = app.pool.get().unwrap();
    let rows: i64 = posts::table.count().get_result(&mut conn).unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn posts_need_existing_references() {
    let app = TestApp::new();
    app.seed_taxonomy().await;

    let (status, _) = app
        .admin(
            "POST",
            "/api/posts",
            json!({"title": "Lost", "content": "x", "categoryId": "nowhere", "authorId": "ana"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .admin("POST", "/api/posts", json!({"title": "No content", "categoryId": "travel"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "content is required");
}

#[tokio::test]
async fn posts_are_listed_with_pagination_and_found_by_slug() {
    let app = TestApp::new();
    app.seed_taxonomy().await;
    for title in ["First Light", "Second Wind", "Third Rail"] {
        let (status, _) = app
            .admin(
                "POST",
                "/api/posts",
                json!({"title": title, "content": "body", "categoryId": "travel", "authorId": "ana"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app.get("/api/posts?limit=2&category=travel").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["totalPages"], 2);

    let (status, body) = app.get("/api/posts/slug/second-wind").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Second Wind");
}

#[tokio::test]
async fn soft_deleted_rows_are_hidden_but_kept() {
    let app = TestApp::new();
    let (status, _) = app
        .admin("POST", "/api/countries", json!({"id": "pt", "name": "Portugal"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.admin("DELETE", "/api/countries/pt", Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], true);

    let (status, _) = app.get("/api/countries/pt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = app.get("/api/countries").await;
    assert_eq!(body["pagination"]["total"], 0);

    let mut conn = app.pool.get().unwrap();
    let row = Country::find_any(&mut conn, "pt").unwrap().unwrap();
    assert!(row.deleted);

    let (status, _) = app
        .admin("POST", "/api/countries", json!({"id": "pt", "name": "Portugal again"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn cities_need_a_matching_area() {
    let app = TestApp::new();
    app.admin("POST", "/api/countries", json!({"id": "pt", "name": "Portugal"})).await;
    app.admin("POST", "/api/countries", json!({"id": "es", "name": "Spain"})).await;
    let (status, _) = app
        .admin("POST", "/api/areas", json!({"id": "north", "name": "North", "countryId": "pt"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .admin("POST", "/api/categories", json!({"id": "porto", "name": "Porto", "isCity": true, "countryId": "pt"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .admin(
            "POST",
            "/api/categories",
            json!({"id": "porto", "name": "Porto", "isCity": true, "countryId": "es", "areaId": "north"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .admin(
            "POST",
            "/api/categories",
            json!({"id": "porto", "name": "Porto", "isCity": true, "countryId": "pt", "areaId": "north"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["isCity"], true);

    let (_, body) = app.get("/api/categories?city=true").await;
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn active_users_log_in_with_a_cookie_and_a_token() {
    let app = TestApp::new();
    app.seed_user("ed@example.com", "editor password", "editor", "active");

    let (status, headers, body) = app
        .post_json(
            "/api/auth/login",
            json!({"email": "ed@example.com", "password": "editor password"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());
    assert_eq!(body["data"]["user"]["email"], "ed@example.com");
    assert!(body["data"]["user"].get("passwordHash").is_none());
    assert!(!body["data"]["user"]["lastLoginAt"].is_null());

    let cookie = headers[SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("auth_token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=604800"));

    let request = Request::get("/api/auth/me")
        .header(COOKIE, format!("auth_token={}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "editor");
}

#[tokio::test]
async fn login_failures_map_to_the_right_status() {
    let app = TestApp::new();
    app.seed_user("ed@example.com", "editor password", "editor", "active");
    app.seed_user("sus@example.com", "right password", "editor", "suspended");

    let cases = [
        (json!({"email": "ed@example.com"}), StatusCode::BAD_REQUEST),
        (json!({"email": "nobody@example.com", "password": "whatever1"}), StatusCode::UNAUTHORIZED),
        (json!({"email": "ed@example.com", "password": "wrong password"}), StatusCode::UNAUTHORIZED),
        (json!({"email": "sus@example.com", "password": "right password"}), StatusCode::FORBIDDEN),
        (json!({"email": "sus@example.com", "password": "wrong password"}), StatusCode::FORBIDDEN),
    ];
    for (body, expected) in cases {
        let (status, headers, _) = app.post_json("/api/auth/login", body.clone()).await;
        assert_eq!(status, expected, "login with {}", body);
        assert!(headers.get(SET_COOKIE).is_none());
    }

    let (status, _) = app.get("/api/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn viewers_cannot_write() {
    let app = TestApp::new();
    let viewer = app.seed_user("view@example.com", "viewer password", "viewer", "active");
    let token = auth::issue_token(&Claims::new(viewer.id, &viewer.email, Role::Viewer), SECRET).unwrap();

    let request = Request::post("/api/countries")
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(json!({"id": "pt", "name": "Portugal"}).to_string()))
        .unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admins_manage_users_but_not_themselves() {
    let app = TestApp::new();
    let (status, body) = app
        .admin(
            "POST",
            "/api/users",
            json!({"name": "Bea", "email": "Bea@Example.com", "password": "long enough", "role": "editor"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["email"], "bea@example.com");
    assert_eq!(body["data"]["status"], "active");

    let (status, _) = app
        .admin(
            "POST",
            "/api/users",
            json!({"name": "Bea 2", "email": "bea@example.com", "password": "long enough"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .admin("POST", "/api/users", json!({"name": "X", "email": "x@example.com", "password": "x", "role": "owner"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.admin("DELETE", "/api/users/1", Value::Null).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tracking_counts_known_links_only() {
    let app = TestApp::new();
    let (status, _, body) = app
        .post_json("/api/short-links/track", json!({"url": "https://nowhere.example/x"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["tracked"], false);

    let (_, created) = app
        .admin("POST", "/api/short-links", json!({"originalUrl": "https://example.com/a"}))
        .await;
    let code = created["data"]["shortCode"].as_str().unwrap().to_string();
    let id = created["data"]["id"].as_i64().unwrap();

    let (_, _, body) = app
        .post_json("/api/short-links/track", json!({"shortCode": code}))
        .await;
    assert_eq!(body["data"]["tracked"], true);
    let (_, _, body) = app
        .post_json("/api/short-links/track", json!({"url": "example.com/a"}))
        .await;
    assert_eq!(body["data"]["tracked"], true);

    let (_, body) = app.admin("GET", &format!("/api/short-links/{}", id), Value::Null).await;
    assert_eq!(body["data"]["clicks"], 2);
}

#[tokio::test]
async fn redirect_validates_the_target() {
    let app = TestApp::new();
    let (status, headers, _) = app
        .send(Request::get("/redirect?link=example.com%2Fa%3Fb%3D1").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[LOCATION], "https://example.com/a?b=1");

    let (status, body) = app.get("/redirect?link=ftp%3A%2F%2Fexample.com%2Ffile").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/redirect").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn short_codes_redirect_to_their_url() {
    let app = TestApp::new();
    let (_, created) = app
        .admin("POST", "/api/short-links", json!({"originalUrl": "https://example.com/long/path"}))
        .await;
    let code = created["data"]["shortCode"].as_str().unwrap();

    let (status, headers, _) = app
        .send(Request::get(format!("/s/{}", code)).body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[LOCATION], "https://example.com/long/path");

    let (status, _) = app.get("/s/zzzzzz").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploads_accept_images_only() {
    let app = TestApp::new();

    let (content_type, body) = multipart_file("text/plain", "notes.txt", b"hello");
    let request = Request::post("/api/upload")
        .header(CONTENT_TYPE, content_type)
        .header(AUTHORIZATION, format!("Bearer {}", app.admin_token))
        .body(Body::from(body))
        .unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    let (content_type, body) = multipart_file("image/png", "pixel.png", png);
    let request = Request::post("/api/upload")
        .header(CONTENT_TYPE, content_type)
        .header(AUTHORIZATION, format!("Bearer {}", app.admin_token))
        .body(Body::from(body))
        .unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["mimeType"], "image/png");
    assert_eq!(body["data"]["size"], png.len());
    let url = body["data"]["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/"));
    assert!(url.ends_with(".png"));

    let response = app
        .router
        .clone()
        .oneshot(Request::get(url.as_str()).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "image/png");
    let served = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&served[..], &png[..]);
}

#[tokio::test]
async fn upload_paths_cannot_escape_the_directory() {
    let app = TestApp::new();
    let (status, body) = app.get("/uploads/..%2Fcms.db").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/uploads/missing.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn contact_messages_are_public_to_send_and_private_to_read() {
    let app = TestApp::new();
    let (status, _, body) = app
        .post_json(
            "/api/contact",
            json!({"name": "Rui", "email": "rui@example.com", "message": "Hello"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["isRead"], false);

    let (status, _, _) = app
        .post_json("/api/contact", json!({"name": "Rui", "email": "nope", "message": "Hello"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/contact").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .admin("PUT", &format!("/api/contact/{}", id), json!({"isRead": true}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isRead"], true);

    let (status, _) = app.admin("DELETE", &format!("/api/contact/{}", id), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.admin("GET", &format!("/api/contact/{}", id), Value::Null).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn huge_page_numbers_return_an_empty_page() {
    let app = TestApp::new();
    app.admin("POST", "/api/countries", json!({"id": "pt", "name": "Portugal"})).await;

    let (status, body) = app.get("/api/countries?page=9223372036854775807&limit=100").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn malformed_paths_and_queries_use_the_error_envelope() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/posts/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid URL"));

    let (status, body) = app.get("/api/categories?city=maybe").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid query string"));

    let (status, body) = app.get("/api/countries?page=first").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app.get("/api/nothing-here").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let request = Request::post("/api/upload")
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {}", app.admin_token))
        .body(Body::from("{}"))
        .unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn areas_and_countries_in_use_by_cities_stay_put() {
    let app = TestApp::new();
    app.admin("POST", "/api/countries", json!({"id": "pt", "name": "Portugal"})).await;
    app.admin("POST", "/api/countries", json!({"id": "es", "name": "Spain"})).await;
    app.admin("POST", "/api/areas", json!({"id": "north", "name": "North", "countryId": "pt"}))
        .await;
    let (status, _) = app
        .admin(
            "POST",
            "/api/categories",
            json!({"id": "porto", "name": "Porto", "isCity": true, "countryId": "pt", "areaId": "north"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.admin("PUT", "/api/areas/north", json!({"countryId": "es"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    let (_, body) = app.get("/api/areas/north").await;
    assert_eq!(body["data"]["countryId"], "pt");

    let (status, body) = app.admin("PUT", "/api/areas/north", json!({"name": "Norte"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Norte");

    let (status, _) = app.admin("DELETE", "/api/areas/north", Value::Null).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app.admin("DELETE", "/api/countries/pt", Value::Null).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app.get("/api/areas/north").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/api/countries/pt").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.admin("DELETE", "/api/categories/porto", Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.admin("PUT", "/api/areas/north", json!({"countryId": "es"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["countryId"], "es");
    let (status, _) = app.admin("DELETE", "/api/areas/north", Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.admin("DELETE", "/api/countries/pt", Value::Null).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn soft_deleted_areas_categories_and_authors_are_hidden_but_kept() {
    let app = TestApp::new();
    app.admin("POST", "/api/countries", json!({"id": "pt", "name": "Portugal"})).await;
    app.admin("POST", "/api/areas", json!({"id": "north", "name": "North", "countryId": "pt"}))
        .await;
    app.seed_taxonomy().await;

    for (uri, list) in [
        ("/api/areas/north", "/api/areas"),
        ("/api/categories/travel", "/api/categories"),
        ("/api/authors/ana", "/api/authors"),
    ] {
        let (status, body) = app.admin("DELETE", uri, Value::Null).await;
        assert_eq!(status, StatusCode::OK, "delete {}", uri);
        assert_eq!(body["data"]["deleted"], true);

        let (status, _) = app.get(uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "get {}", uri);
        let (_, body) = app.get(list).await;
        assert_eq!(body["pagination"]["total"], 0, "list {}", list);

        let (status, _) = app.admin("DELETE", uri, Value::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "second delete {}", uri);
    }

    let mut conn = app.pool.get().unwrap();
    assert!(Area::find_any(&mut conn, "north").unwrap().unwrap().deleted);
    assert!(Category::find_any(&mut conn, "travel").unwrap().unwrap().deleted);
    assert!(Author::find_any(&mut conn, "ana").unwrap().unwrap().deleted);
}

#[tokio::test]
async fn renaming_a_post_onto_a_taken_slug_is_a_conflict() {
    let app = TestApp::new();
    app.seed_taxonomy().await;
    for slug in ["first-light", "second-wind"] {
        let (status, _) = app
            .admin(
                "POST",
                "/api/posts",
                json!({"slug": slug, "title": slug, "content": "body", "categoryId": "travel", "authorId": "ana"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (_, body) = app.get("/api/posts/slug/second-wind").await;
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = app
        .admin("PUT", &format!("/api/posts/{}", id), json!({"slug": "first-light"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .admin("PUT", &format!("/api/posts/{}", id), json!({"slug": "second-wind", "title": "Second Wind"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Second Wind");
}

#[tokio::test]
async fn blank_post_excerpt_and_image_clear_them() {
    let app = TestApp::new();
    app.seed_taxonomy().await;
    let (status, body) = app
        .admin(
            "POST",
            "/api/posts",
            json!({
                "title": "Harbour",
                "content": "Boats.",
                "excerpt": "Boats, mostly",
                "image": "/uploads/harbour.png",
                "categoryId": "travel",
                "authorId": "ana",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/posts/{}", body["data"]["id"]);

    let (status, body) = app.admin("PUT", &uri, json!({"title": "Harbour Days"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["excerpt"], "Boats, mostly");
    assert_eq!(body["data"]["image"], "/uploads/harbour.png");

    let (status, body) = app.admin("PUT", &uri, json!({"excerpt": "", "image": " "})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["excerpt"].is_null());
    assert!(body["data"]["image"].is_null());
    assert_eq!(body["data"]["title"], "Harbour Days");
}

#[tokio::test]
async fn changing_a_user_email_to_a_taken_one_is_a_conflict() {
    let app = TestApp::new();
    app.seed_user("bea@example.com", "bea password", "editor", "active");
    let cid = app.seed_user("cid@example.com", "cid password", "editor", "active");

    let uri = format!("/api/users/{}", cid.id);
    let (status, body) = app.admin("PUT", &uri, json!({"email": "BEA@example.com"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, body) = app.admin("PUT", &uri, json!({"email": "cid@example.org"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "cid@example.org");
}

#[tokio::test]
async fn logout_expires_the_auth_cookie() {
    let app = TestApp::new();
    let request = Request::post("/api/auth/logout")
        .header(COOKIE, format!("auth_token={}", app.admin_token))
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["loggedOut"], true);
    let cookie = headers[SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("auth_token=;"));
    assert!(cookie.contains("Max-Age=0"));

    let (status, headers, _) = app.post_json("/api/auth/logout", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[SET_COOKIE].to_str().unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn a_corrupt_stored_role_is_a_server_error() {
    let app = TestApp::new();
    app.seed_user("odd@example.com", "odd password", "owner", "active");

    let (status, headers, body) = app
        .post_json("/api/auth/login", json!({"email": "odd@example.com", "password": "odd password"}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(headers.get(SET_COOKIE).is_none());
}

async fn upload_png(app: &TestApp, size: usize) -> (StatusCode, Value) {
    let (content_type, body) = multipart_file("image/png", "big.png", &vec![7u8; size]);
    let request = Request::post("/api/upload")
        .header(CONTENT_TYPE, content_type)
        .header(AUTHORIZATION, format!("Bearer {}", app.admin_token))
        .body(Body::from(body))
        .unwrap();
    let (status, _, body) = app.send(request).await;
    (status, body)
}

#[tokio::test]
async fn uploads_over_five_megabytes_are_refused() {
    let app = TestApp::new();
    let limit = gazette_rs::DEFAULT_MAX_UPLOAD_BYTES;

    let (status, body) = upload_png(&app, limit).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["size"], limit);

    let (status, body) = upload_png(&app, limit + 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("File too large"));

    // Past the router's body limit the multipart stream itself fails.
    let (status, body) = upload_png(&app, limit + 256 * 1024).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("File too large"));
}
