//! Idempotent default data applied at startup.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::{
    entities,
    models::{
        company::Company,
        role::{Role, RolePermissions},
        user::{CreateUser, User},
    },
};

pub const ADMIN_ROLE: &str = "admin";
pub const ADMIN_EMAIL: &str = "admin@admin.com";
pub const DEFAULT_COMPANY_EMAIL: &str = "default@company.com";

const SITUATIONS: [(&str, &str, &str); 3] = [
    ("001", "In Progress", "Work is underway"),
    ("002", "Pending", "Waiting to be started"),
    ("003", "Completed", "Work is finished"),
];

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("failed to hash admin password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub admin_password: String,
    pub password_cost: u32,
}

pub async fn run(pool: &SqlitePool, options: &SeedOptions) -> Result<(), SeedError> {
    let role = match Role::find_by_name(pool, ADMIN_ROLE).await? {
        Some(role) => role,
        None => {
            let permissions =
                RolePermissions::full_access(entities::all().iter().map(|def| def.slug));
            info!("Seeding '{}' role", ADMIN_ROLE);
            Role::create(pool, ADMIN_ROLE, Some("Full access"), &permissions).await?
        }
    };

    let company = match Company::find_by_email(pool, DEFAULT_COMPANY_EMAIL).await? {
        Some(company) => company,
        None => {
            info!("Seeding default company");
            Company::create(pool, "Default Company", Some(DEFAULT_COMPANY_EMAIL)).await?
        }
    };

    if User::find_by_email(pool, ADMIN_EMAIL).await?.is_none() {
        let (password, cost) = (options.admin_password.clone(), options.password_cost);
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        User::create(
            pool,
            &CreateUser {
                user_name: Some("Administrator".to_string()),
                user_email: ADMIN_EMAIL.to_string(),
                user_password: hash,
                user_fk_company_id: company.id,
                user_fk_role_id: Some(role.id),
            },
        )
        .await?;
        info!("Seeded admin user {}", ADMIN_EMAIL);
    }

    for (code, name, description) in SITUATIONS {
        sqlx::query(
            "INSERT INTO situations (situation_code, situation_name, situation_description)
             VALUES (?, ?, ?)
             ON CONFLICT(situation_code) DO NOTHING",
        )
        .bind(code)
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;
    }

    Ok(())
}
