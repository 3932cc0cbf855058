pub mod areas;
pub mod auth;
pub mod authors;
pub mod categories;
mod common;
pub mod contact;
pub mod countries;
pub mod health;
pub mod posts;
pub mod redirect;
pub mod short_links;
pub mod uploads;
pub mod users;
