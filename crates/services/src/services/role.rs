//! User ↔ role assignment. A user holds at most one role.

use db::{
    DBService,
    models::{role::Role, user::User},
};
use thiserror::Error;
use tracing::info;

use super::entity::ServiceContext;

#[derive(Debug, Error)]
pub enum RoleError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("User {0} not found")]
    UserNotFound(i64),
    #[error("Role {0} not found")]
    RoleNotFound(i64),
}

#[derive(Clone)]
pub struct RoleService {
    db: DBService,
}

impl RoleService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    /// Users outside the acting company are reported as missing
    async fn user(&self, ctx: &ServiceContext, user_id: i64) -> Result<User, RoleError> {
        User::find_in_company(&self.db.pool, user_id, ctx.company_id)
            .await?
            .ok_or(RoleError::UserNotFound(user_id))
    }

    async fn role(&self, role_id: i64) -> Result<Role, RoleError> {
        Role::find_by_id(&self.db.pool, role_id)
            .await?
            .ok_or(RoleError::RoleNotFound(role_id))
    }

    /// Replaces whatever role the user had
    pub async fn assign_role_to_user(
        &self,
        ctx: &ServiceContext,
        user_id: i64,
        role_id: i64,
    ) -> Result<Role, RoleError> {
        self.user(ctx, user_id).await?;
        let role = self.role(role_id).await?;
        User::set_role(&self.db.pool, user_id, Some(role_id)).await?;
        info!(user_id, role_id, "Role assigned");
        Ok(role)
    }

    /// Clears the user's role only when it is `role_id`; returns whether it was cleared
    pub async fn remove_role_from_user(
        &self,
        ctx: &ServiceContext,
        user_id: i64,
        role_id: i64,
    ) -> Result<bool, RoleError> {
        let user = self.user(ctx, user_id).await?;
        self.role(role_id).await?;
        if user.user_fk_role_id != Some(role_id) {
            return Ok(false);
        }
        User::set_role(&self.db.pool, user_id, None).await?;
        info!(user_id, role_id, "Role removed");
        Ok(true)
    }

    pub async fn get_user_roles(
        &self,
        ctx: &ServiceContext,
        user_id: i64,
    ) -> Result<Vec<Role>, RoleError> {
        let user = self.user(ctx, user_id).await?;
        Ok(match user.user_fk_role_id {
            Some(role_id) => Role::find_by_id(&self.db.pool, role_id)
                .await?
                .into_iter()
                .collect(),
            None => Vec::new(),
        })
    }
}
