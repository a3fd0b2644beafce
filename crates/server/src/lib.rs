use std::{collections::HashMap, sync::Arc};

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
};
use db::{DBService, entities, metadata::EntityDef};
use services::services::{
    auth::AuthService, entity::EntityService, health::HealthService, rate_limit::RateLimiter,
    report::ReportService, role::RoleService,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

use config::Config;

/// Everything a request handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct Deployment {
    db: DBService,
    auth: AuthService,
    roles: RoleService,
    reports: ReportService,
    health: HealthService,
    rate_limiter: RateLimiter,
    entities: Arc<HashMap<&'static str, EntityService>>,
}

impl Deployment {
    pub fn new(db: DBService, config: Config) -> Self {
        let service_config = config.service_config();
        let entities = entities::all()
            .iter()
            .copied()
            .map(|def| {
                (
                    def.slug,
                    EntityService::for_entity(db.clone(), def, &service_config),
                )
            })
            .collect();
        Self {
            auth: AuthService::new(db.clone(), config.jwt.clone()),
            roles: RoleService::new(db.clone()),
            reports: ReportService::new(&config.report_output_dir),
            health: HealthService::new(db.clone()),
            rate_limiter: RateLimiter::new(config.rate_limit_max, config.rate_limit_window),
            entities: Arc::new(entities),
            db,
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn roles(&self) -> &RoleService {
        &self.roles
    }

    pub fn reports(&self) -> &ReportService {
        &self.reports
    }

    pub fn health(&self) -> &HealthService {
        &self.health
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn entity(&self, def: &EntityDef) -> Option<&EntityService> {
        self.entities.get(def.slug)
    }
}

pub fn app(deployment: Deployment) -> Router {
    let protected = routes::protected_router(&deployment).layer(from_fn_with_state(
        deployment.clone(),
        middleware::auth::require_auth,
    ));
    let api = Router::new()
        .merge(routes::auth::public_router())
        .merge(protected)
        .layer(from_fn_with_state(
            deployment.clone(),
            middleware::rate_limit::rate_limit,
        ));

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", api)
        .layer(from_fn(middleware::locale::locale))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(deployment)
}
