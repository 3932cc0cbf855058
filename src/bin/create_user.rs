use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use clap::Parser;
use diesel::prelude::*;

use gazette_rs::auth::{self, Role, UserStatus};
use gazette_rs::config::CmsConfig;
use gazette_rs::handler::{CmsDB, WithDB};
use gazette_rs::models::{NewUser, User};
use gazette_rs::schema::users;

/// Create a user account directly in the database. The password is read
/// from stdin.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    email: String,

    #[arg(long)]
    name: String,

    #[arg(long, default_value = "admin")]
    role: String,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    // Only the database settings matter here, so no secret is required.
    let mut config = match &args.config {
        Some(path) => CmsConfig::from_toml(&std::fs::read_to_string(path)?)?,
        None => CmsConfig::default(),
    };
    if let Ok(url) = std::env::var(gazette_rs::DATABASE_URL_VAR) {
        config.database_url = url;
    }

    let role: Role = args.role.parse().map_err(|e| anyhow!("{}", e))?;

    let mut password = String::new();
    std::io::stdin().read_to_string(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']).to_string();
    if password.chars().count() < gazette_rs::MIN_PASSWORD_LEN {
        bail!("password must be at least {} characters", gazette_rs::MIN_PASSWORD_LEN);
    }
    let password_hash = auth::hash_password(&password).map_err(|e| anyhow!("{}", e))?;

    let dbpool = Arc::new(gazette_rs::new_dbconn_pool(&config.database_url, 1)?);
    gazette_rs::run_migrations(&dbpool)?;
    let db = CmsDB::new(dbpool);

    let email = args.email.trim().to_lowercase();
    let name = args.name.trim().to_string();
    let user = db
        .run_txn("INSERT INTO users", move |conn| {
            if User::by_email(conn, &email)?.is_some() {
                return Ok(None);
            }
            diesel::insert_into(users::table)
                .values(NewUser {
                    name: &name,
                    email: &email,
                    password_hash: &password_hash,
                    role: role.as_str(),
                    status: UserStatus::Active.as_str(),
                    avatar: None,
                })
                .execute(conn)?;
            User::by_email(conn, &email)
        })
        .await?;

    match user {
        Some(user) => println!("created {} user {} with id {}", user.role, user.email, user.id),
        None => bail!("a user with email '{}' already exists", args.email),
    }

    Ok(())
}
