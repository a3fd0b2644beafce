//! Login, token verification and password hashing.

use db::{
    DBService,
    models::{role::Role, user::User},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use utils::{
    i18n::Message,
    jwt::{JwtConfig, TokenError},
};

use super::entity::ServiceContext;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error(transparent)]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{}", Message::InvalidCredentials)]
    InvalidCredentials,
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("failed to issue token: {0}")]
    Token(#[from] TokenError),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// bcrypt is CPU bound, keep it off the async workers
pub async fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    let password = password.to_string();
    Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??)
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let password = password.to_string();
    let hash = hash.to_string();
    Ok(tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??)
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

/// The authenticated caller, attached to each request by the auth middleware
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub role: Option<Role>,
}

impl AuthUser {
    pub fn context(&self) -> ServiceContext {
        ServiceContext::new(self.user.id, self.user.user_fk_company_id)
    }

    pub fn can(&self, resource: &str, action: &str) -> bool {
        self.role
            .as_ref()
            .is_some_and(|role| role.role_permissions.allows(resource, action))
    }
}

#[derive(Clone)]
pub struct AuthService {
    db: DBService,
    jwt: JwtConfig,
}

impl AuthService {
    pub fn new(db: DBService, jwt: JwtConfig) -> Self {
        Self { db, jwt }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let Some(user) = User::find_by_email(&self.db.pool, email.trim()).await? else {
            debug!("Login attempt for unknown email");
            return Err(AuthError::InvalidCredentials);
        };
        if !user.user_is_active || !verify_password(password, &user.user_password).await? {
            return Err(AuthError::InvalidCredentials);
        }
        let token = self
            .jwt
            .issue(user.id, &user.user_email, user.user_fk_company_id)?;
        info!(user_id = user.id, "User logged in");
        Ok(LoginResponse { user, token })
    }

    /// Resolve a bearer token into the active user it was issued to
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.jwt.verify(token).map_err(|e| match e {
            TokenError::Expired => AuthError::Unauthorized("Token expired"),
            _ => AuthError::Unauthorized("Invalid token"),
        })?;
        let user = User::find_by_id(&self.db.pool, claims.sub)
            .await?
            .ok_or(AuthError::Unauthorized("User not found"))?;
        if !user.user_is_active {
            return Err(AuthError::Unauthorized("User is inactive"));
        }
        let role = match user.user_fk_role_id {
            Some(role_id) => Role::find_by_id(&self.db.pool, role_id).await?,
            None => None,
        };
        Ok(AuthUser { user, role })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use db::seed::{self, ADMIN_EMAIL, SeedOptions};

    use super::*;

    async fn setup() -> (DBService, AuthService) {
        let db = DBService::new_in_memory().await.unwrap();
        seed::run(
            &db.pool,
            &SeedOptions {
                admin_password: "admin-pass".into(),
                password_cost: 4,
            },
        )
        .await
        .unwrap();
        let auth = AuthService::new(
            db.clone(),
            JwtConfig::new("test-secret", Duration::from_secs(60)),
        );
        (db, auth)
    }

    #[tokio::test]
    async fn test_password_round_trip() {
        let hash = hash_password("correct horse", 4).await.unwrap();
        assert!(verify_password("correct horse", &hash).await.unwrap());
        assert!(!verify_password("wrong", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_login_and_authenticate() {
        let (_db, auth) = setup().await;
        let login = auth.login(ADMIN_EMAIL, "admin-pass").await.unwrap();
        assert_eq!(login.user.user_email, ADMIN_EMAIL);

        let caller = auth.authenticate(&login.token).await.unwrap();
        assert_eq!(caller.user.id, login.user.id);
        assert!(caller.can("projects", "create"));
        assert!(!caller.can("unknown", "read"));
        assert_eq!(caller.context().user_id, Some(login.user.id));
    }

    #[tokio::test]
    async fn test_bad_credentials_are_indistinguishable() {
        let (db, auth) = setup().await;
        let wrong_password = auth.login(ADMIN_EMAIL, "nope").await.unwrap_err();
        let unknown_email = auth.login("ghost@example.com", "nope").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());

        sqlx::query("UPDATE users SET user_is_active = 0")
            .execute(&db.pool)
            .await
            .unwrap();
        assert!(matches!(
            auth.login(ADMIN_EMAIL, "admin-pass").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_bad_tokens() {
        let (_db, auth) = setup().await;
        assert!(matches!(
            auth.authenticate("not-a-token").await,
            Err(AuthError::Unauthorized("Invalid token"))
        ));

        let other = JwtConfig::new("other-secret", Duration::from_secs(60));
        let forged = other.issue(1, ADMIN_EMAIL, 1).unwrap();
        assert!(matches!(
            auth.authenticate(&forged).await,
            Err(AuthError::Unauthorized(_))
        ));

        let jwt = JwtConfig::new("test-secret", Duration::from_secs(60));
        let orphan = jwt.issue(999, "ghost@example.com", 1).unwrap();
        assert!(matches!(
            auth.authenticate(&orphan).await,
            Err(AuthError::Unauthorized("User not found"))
        ));
    }
}
