pub const AUTH_COOKIE: &str = "auth_token";
pub const TOKEN_TTL_DAYS: i64 = 7;
pub const MIN_JWT_SECRET_LEN: usize = 32;
pub const MIN_PASSWORD_LEN: usize = 8;

pub const DEFAULT_QUERY_RETRIES: u32 = 2;
pub const DEFAULT_DB_POOL_MAX_SIZE: u32 = 10;
pub const SQLITE_BUSY_TIMEOUT_MS: u32 = 5000;

pub const SHORT_CODE_LEN: usize = 6;
pub const MAX_SHORT_CODE_ATTEMPTS: usize = 10;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024; // 5 megabytes
pub const UPLOAD_URL_PREFIX: &str = "/uploads";

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const JWT_SECRET_VAR: &str = "GAZETTE_JWT_SECRET";
