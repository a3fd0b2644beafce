use axum::Router;
use db::entities as registry;

use crate::Deployment;

pub mod audits;
pub mod auth;
pub mod entities;
pub mod health;
pub mod roles;

/// Every route that needs an authenticated caller, relative to `/api/v1`
pub fn protected_router(deployment: &Deployment) -> Router<Deployment> {
    let mut router = Router::new().merge(auth::protected_router());
    for def in registry::all().iter().copied() {
        let Some(service) = deployment.entity(def) else {
            continue;
        };
        let mut entity_router = entities::router(service.clone());
        match def.slug {
            "audits" => entity_router = entity_router.merge(audits::router()),
            "roles" => entity_router = entity_router.merge(roles::router()),
            _ => {}
        }
        router = router.nest(&format!("/{}", def.slug), entity_router);
    }
    router
}
