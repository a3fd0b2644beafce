pub mod auth;
pub mod locale;
pub mod rate_limit;
