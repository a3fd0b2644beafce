//! Validation and password handling around user writes.

use async_trait::async_trait;
use db::{
    DBService,
    models::{company::Company, record::Record, user::User},
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use utils::i18n::Message;

use super::{
    auth::hash_password,
    entity::{EntityError, EntityHooks, ServiceContext},
};

pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub struct UserHooks {
    db: DBService,
    password_cost: u32,
}

impl UserHooks {
    pub fn new(db: DBService, password_cost: u32) -> Self {
        Self { db, password_cost }
    }

    async fn check_email(
        &self,
        email: Option<&Value>,
        exclude_id: Option<i64>,
    ) -> Result<(), EntityError> {
        let Some(email) = email.and_then(Value::as_str).map(str::trim) else {
            return Err(EntityError::Validation(Message::EmailRequired.to_string()));
        };
        if !is_valid_email(email) {
            return Err(EntityError::Validation(Message::InvalidEmail.to_string()));
        }
        if User::email_taken(&self.db.pool, email, exclude_id).await? {
            return Err(EntityError::Conflict(Message::EmailAlreadyInUse.to_string()));
        }
        Ok(())
    }

    async fn check_company(&self, company: Option<&Value>) -> Result<(), EntityError> {
        let company_id = company
            .and_then(|v| v.as_i64().or_else(|| v.as_str()?.trim().parse().ok()))
            .ok_or_else(|| EntityError::Validation(Message::CompanyRequired.to_string()))?;
        if Company::find_by_id(&self.db.pool, company_id).await?.is_none() {
            return Err(EntityError::Validation(
                Message::CompanyNotFound(company_id).to_string(),
            ));
        }
        Ok(())
    }

    /// Replace the plain password in `data` with its hash
    async fn hash_into(&self, data: &mut Record) -> Result<(), EntityError> {
        let Some(password) = data.get("user_password").and_then(Value::as_str) else {
            return Err(EntityError::Validation(Message::PasswordRequired.to_string()));
        };
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(EntityError::Validation(
                Message::PasswordTooShort(MIN_PASSWORD_LEN).to_string(),
            ));
        }
        let hash = hash_password(password, self.password_cost)
            .await
            .map_err(|e| EntityError::Hash(e.to_string()))?;
        data.insert("user_password".to_string(), Value::String(hash));
        Ok(())
    }
}

#[async_trait]
impl EntityHooks for UserHooks {
    async fn before_create(
        &self,
        _ctx: &ServiceContext,
        data: &mut Record,
    ) -> Result<(), EntityError> {
        self.check_email(data.get("user_email"), None).await?;
        self.check_company(data.get("user_fk_company_id")).await?;
        self.hash_into(data).await
    }

    async fn before_update(
        &self,
        _ctx: &ServiceContext,
        id: i64,
        data: &mut Record,
    ) -> Result<(), EntityError> {
        if data.contains_key("user_email") {
            self.check_email(data.get("user_email"), Some(id)).await?;
        }
        if data.contains_key("user_fk_company_id") {
            self.check_company(data.get("user_fk_company_id")).await?;
        }
        let blank = match data.get("user_password") {
            None => return Ok(()),
            Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        };
        // an empty password on edit keeps the current one
        if blank {
            data.remove("user_password");
            Ok(())
        } else {
            self.hash_into(data).await
        }
    }

    async fn before_delete(&self, ctx: &ServiceContext, id: i64) -> Result<(), EntityError> {
        if ctx.user_id == Some(id) {
            return Err(EntityError::Forbidden(
                Message::CannotDeleteSelf.to_string(),
            ));
        }
        Ok(())
    }
}
