//! Uniqueness rules around company writes.

use async_trait::async_trait;
use db::{
    DBService,
    models::{company::Company, record::Record},
};
use serde_json::Value;
use utils::i18n::Message;

use super::entity::{EntityError, EntityHooks, ServiceContext};

pub struct CompanyHooks {
    db: DBService,
}

impl CompanyHooks {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    /// A blank or absent CNPJ is never a duplicate
    async fn check_cnpj(&self, data: &Record, exclude_id: Option<i64>) -> Result<(), EntityError> {
        let Some(cnpj) = data
            .get("company_cnpj")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|cnpj| !cnpj.is_empty())
        else {
            return Ok(());
        };
        if Company::cnpj_taken(&self.db.pool, cnpj, exclude_id).await? {
            return Err(EntityError::Conflict(
                Message::CnpjAlreadyRegistered.to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityHooks for CompanyHooks {
    async fn before_create(
        &self,
        _ctx: &ServiceContext,
        data: &mut Record,
    ) -> Result<(), EntityError> {
        self.check_cnpj(data, None).await
    }

    async fn before_update(
        &self,
        _ctx: &ServiceContext,
        id: i64,
        data: &mut Record,
    ) -> Result<(), EntityError> {
        self.check_cnpj(data, Some(id)).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use db::{entities, models::record::record_id};
    use serde_json::json;
    use utils::{i18n::Locale, jwt::JwtConfig};

    use super::*;
    use crate::services::{config::ServiceConfig, entity::EntityService};

    fn obj(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    async fn companies() -> EntityService {
        let db = DBService::new_in_memory().await.unwrap();
        let config = ServiceConfig {
            password_cost: 4,
            jwt: JwtConfig::new("test", Duration::from_secs(60)),
            report_output_dir: std::env::temp_dir(),
        };
        EntityService::for_entity(db, &entities::COMPANIES, &config)
    }

    #[tokio::test]
    async fn test_duplicate_cnpj_is_a_conflict() {
        let companies = companies().await;
        let ctx = ServiceContext::default();
        companies
            .create(&ctx, obj(json!({ "company_name": "Acme", "company_cnpj": "12.345.678/0001-90" })))
            .await
            .unwrap();

        let duplicate = companies
            .create(&ctx, obj(json!({ "company_name": "Other", "company_cnpj": " 12.345.678/0001-90 " })))
            .await;
        match duplicate {
            Err(EntityError::Conflict(message)) => assert_eq!(message, "CNPJ already registered"),
            other => panic!("expected conflict, got {other:?}"),
        }

        let message = Locale::Pt
            .scope(companies.create(
                &ctx,
                obj(json!({ "company_name": "Outra", "company_cnpj": "12.345.678/0001-90" })),
            ))
            .await
            .unwrap_err()
            .to_string();
        assert_eq!(message, "CNPJ já cadastrado");
    }

    #[tokio::test]
    async fn test_blank_cnpj_is_not_checked() {
        let companies = companies().await;
        let ctx = ServiceContext::default();
        for name in ["A", "B"] {
            companies
                .create(&ctx, obj(json!({ "company_name": name, "company_cnpj": "" })))
                .await
                .unwrap();
        }
        companies
            .create(&ctx, obj(json!({ "company_name": "C" })))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_may_keep_own_cnpj_but_not_take_another() {
        let companies = companies().await;
        let ctx = ServiceContext::default();
        let acme = companies
            .create(&ctx, obj(json!({ "company_name": "Acme", "company_cnpj": "111" })))
            .await
            .unwrap();
        let other = companies
            .create(&ctx, obj(json!({ "company_name": "Other", "company_cnpj": "222" })))
            .await
            .unwrap();
        let acme_id = record_id(&acme).unwrap();

        companies
            .update(&ctx, acme_id, obj(json!({ "company_cnpj": "111", "company_name": "Acme SA" })))
            .await
            .unwrap()
            .unwrap();
        let taken = companies
            .update(&ctx, record_id(&other).unwrap(), obj(json!({ "company_cnpj": "111" })))
            .await;
        assert!(matches!(taken, Err(EntityError::Conflict(_))));
    }
}
