use diesel::prelude::*;
use serde::Serialize;

use crate::schema::{areas, authors, categories, contact_messages, countries, posts, short_links, users};

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = users)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub status: String,
    pub avatar: Option<String>,
    pub last_login_at: Option<String>,
    #[serde(skip_serializing)]
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
    pub status: &'a str,
    pub avatar: Option<&'a str>,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub avatar: Option<Option<String>>,
    pub updated_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = authors)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    #[serde(skip_serializing)]
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = authors)]
pub struct NewAuthor<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub avatar: Option<&'a str>,
    pub bio: Option<&'a str>,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = authors)]
pub struct AuthorChanges {
    pub name: Option<String>,
    pub avatar: Option<Option<String>>,
    pub bio: Option<Option<String>>,
    pub updated_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = countries)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = countries)]
pub struct NewCountry<'a> {
    pub id: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = areas)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub id: String,
    pub name: String,
    pub country_id: String,
    #[serde(skip_serializing)]
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = areas)]
pub struct NewArea<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub country_id: &'a str,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = areas)]
pub struct AreaChanges {
    pub name: Option<String>,
    pub country_id: Option<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = categories)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_city: bool,
    pub country_id: Option<String>,
    pub area_id: Option<String>,
    #[serde(skip_serializing)]
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = categories)]
pub struct NewCategory<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub image: Option<&'a str>,
    pub is_city: bool,
    pub country_id: Option<&'a str>,
    pub area_id: Option<&'a str>,
}

/// Full replacement of the mutable category columns. The city references are
/// written as-is so that turning a city back into a plain category clears them.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = categories, treat_none_as_null = true)]
pub struct CategoryChanges {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_city: bool,
    pub country_id: Option<String>,
    pub area_id: Option<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = posts)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i32,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub image: Option<String>,
    pub category_id: String,
    pub author_id: String,
    pub date: String,
    #[serde(skip_serializing)]
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = posts)]
pub struct NewPost<'a> {
    pub slug: &'a str,
    pub title: &'a str,
    pub excerpt: Option<&'a str>,
    pub content: &'a str,
    pub image: Option<&'a str>,
    pub category_id: &'a str,
    pub author_id: &'a str,
    pub date: &'a str,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = posts)]
pub struct PostChanges {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<Option<String>>,
    pub content: Option<String>,
    pub image: Option<Option<String>>,
    pub category_id: Option<String>,
    pub author_id: Option<String>,
    pub date: Option<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = contact_messages)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = contact_messages)]
pub struct NewContactMessage<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub subject: Option<&'a str>,
    pub message: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = short_links)]
#[serde(rename_all = "camelCase")]
pub struct ShortLink {
    pub id: i32,
    pub original_url: String,
    pub short_code: String,
    pub clicks: i32,
    #[serde(skip_serializing)]
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = short_links)]
pub struct NewShortLink<'a> {
    pub original_url: &'a str,
    pub short_code: &'a str,
}

// Lookups shared by the handlers. `find_live` honours the soft-delete flag,
// `find_any` is the raw storage-layer lookup by id.
macro_rules! id_lookups {
    ($model:ty, $table:ident, $id:ty) => {
        impl $model {
            pub fn find_live(conn: &mut SqliteConnection, key: $id) -> QueryResult<Option<Self>> {
                $table::table
                    .find(key)
                    .filter($table::deleted.eq(false))
                    .select(<$model>::as_select())
                    .first(conn)
                    .optional()
            }

            pub fn find_any(conn: &mut SqliteConnection, key: $id) -> QueryResult<Option<Self>> {
                $table::table
                    .find(key)
                    .select(<$model>::as_select())
                    .first(conn)
                    .optional()
            }

            pub fn exists_any(conn: &mut SqliteConnection, key: $id) -> QueryResult<bool> {
                diesel::select(diesel::dsl::exists($table::table.find(key))).get_result(conn)
            }

            pub fn soft_delete(conn: &mut SqliteConnection, key: $id) -> QueryResult<usize> {
                diesel::update($table::table.find(key).filter($table::deleted.eq(false)))
                    .set(($table::deleted.eq(true), $table::updated_at.eq(now_timestamp())))
                    .execute(conn)
            }
        }
    };
}

id_lookups!(User, users, i32);
id_lookups!(Author, authors, &str);
id_lookups!(Country, countries, &str);
id_lookups!(Area, areas, &str);
id_lookups!(Category, categories, &str);
id_lookups!(Post, posts, i32);
id_lookups!(ShortLink, short_links, i32);

impl User {
    pub fn by_email(conn: &mut SqliteConnection, email: &str) -> QueryResult<Option<Self>> {
        users::table
            .filter(users::email.eq(email))
            .filter(users::deleted.eq(false))
            .select(User::as_select())
            .first(conn)
            .optional()
    }
}

impl Post {
    pub fn by_slug(conn: &mut SqliteConnection, slug: &str) -> QueryResult<Option<Self>> {
        posts::table
            .filter(posts::slug.eq(slug))
            .filter(posts::deleted.eq(false))
            .select(Post::as_select())
            .first(conn)
            .optional()
    }
}

impl Category {
    /// Live city categories placed in the given area.
    pub fn cities_in_area(conn: &mut SqliteConnection, area_id: &str) -> QueryResult<i64> {
        categories::table
            .filter(categories::deleted.eq(false))
            .filter(categories::is_city.eq(true))
            .filter(categories::area_id.eq(area_id))
            .count()
            .get_result(conn)
    }

    /// Live city categories placed in the given country.
    pub fn cities_in_country(conn: &mut SqliteConnection, country_id: &str) -> QueryResult<i64> {
        categories::table
            .filter(categories::deleted.eq(false))
            .filter(categories::is_city.eq(true))
            .filter(categories::country_id.eq(country_id))
            .count()
            .get_result(conn)
    }

    /// Live categories in `area_id` whose country is set to something other
    /// than `country_id`. Moving the area there would leave them inconsistent.
    pub fn placed_elsewhere(
        conn: &mut SqliteConnection,
        area_id: &str,
        country_id: &str,
    ) -> QueryResult<i64> {
        categories::table
            .filter(categories::deleted.eq(false))
            .filter(categories::area_id.eq(area_id))
            .filter(categories::country_id.is_not_null())
            .filter(categories::country_id.ne(country_id))
            .count()
            .get_result(conn)
    }
}

impl ShortLink {
    pub fn by_code(conn: &mut SqliteConnection, code: &str) -> QueryResult<Option<Self>> {
        short_links::table
            .filter(short_links::short_code.eq(code))
            .filter(short_links::deleted.eq(false))
            .select(ShortLink::as_select())
            .first(conn)
            .optional()
    }

    pub fn code_taken(conn: &mut SqliteConnection, code: &str) -> QueryResult<bool> {
        diesel::select(diesel::dsl::exists(
            short_links::table
                .filter(short_links::short_code.eq(code))
                .filter(short_links::deleted.eq(false)),
        ))
        .get_result(conn)
    }
}

/// Timestamp in the same shape SQLite's `CURRENT_TIMESTAMP` produces.
pub fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
