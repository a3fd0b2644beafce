pub mod audit;
pub mod auth;
pub mod company;
pub mod config;
pub mod entity;
pub mod field_filter;
pub mod health;
pub mod rate_limit;
pub mod report;
pub mod role;
pub mod user;
