use std::collections::HashMap;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use db::{
    DBService,
    models::{
        company::Company,
        user::{CreateUser, User},
    },
    seed::{self, ADMIN_EMAIL, SeedOptions},
};
use serde_json::{Value, json};
use server::{Deployment, app, config::Config};
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN_PASSWORD: &str = "admin-pass";

struct TestApp {
    router: Router,
    db: DBService,
    _reports: TempDir,
}

impl TestApp {
    async fn new(overrides: &[(&str, &str)]) -> Self {
        let reports = tempfile::tempdir().unwrap();
        let mut vars: HashMap<String, String> = HashMap::from([
            ("JWT_SECRET".to_string(), "test-secret".to_string()),
            ("PASSWORD_HASH_COST".to_string(), "4".to_string()),
            (
                "REPORT_OUTPUT_DIR".to_string(),
                reports.path().to_string_lossy().to_string(),
            ),
        ]);
        for (key, value) in overrides {
            vars.insert(key.to_string(), value.to_string());
        }
        let config = Config::from_lookup(|name| vars.get(name).cloned()).unwrap();

        let db = DBService::new_in_memory().await.unwrap();
        seed::run(
            &db.pool,
            &SeedOptions {
                admin_password: ADMIN_PASSWORD.to_string(),
                password_cost: 4,
            },
        )
        .await
        .unwrap();

        Self {
            router: app(Deployment::new(db.clone(), config)),
            db,
            _reports: reports,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send_with_headers(method, uri, token, body, &[]).await
    }

    async fn send_with_headers(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn admin(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }
}

#[tokio::test]
async fn health_reports_database_state() {
    let app = TestApp::new(&[]).await;
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "connected");
    assert!(body["data"]["uptime"]["formatted"].is_string());
}

#[tokio::test]
async fn login_and_current_user() {
    let app = TestApp::new(&[]).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": ADMIN_EMAIL, "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Invalid email or password");

    let (status, body) = app.send(Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = app
        .send(Method::GET, "/api/v1/auth/me", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.admin().await;
    let (status, body) = app
        .send(Method::GET, "/api/v1/auth/me", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user_email"], ADMIN_EMAIL);
    assert_eq!(body["data"]["role"]["role_name"], "admin");
    assert!(body["data"].get("user_password").is_none());
}

#[tokio::test]
async fn client_crud_round() {
    let app = TestApp::new(&[]).await;
    let token = app.admin().await;
    let token = Some(token.as_str());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/clients",
            token,
            Some(json!({ "client_name": "Ana", "client_email": "ana@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = app
        .send(Method::POST, "/api/v1/clients", token, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Required fields missing")
    );

    let (status, body) = app
        .send(Method::GET, &format!("/api/v1/clients/{id}"), token, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["client_name"], "Ana");

    let (status, body) = app
        .send(Method::GET, "/api/v1/clients/abc", token, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid id");

    let (status, body) = app
        .send(Method::GET, "/api/v1/clients/999", token, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/v1/clients/{id}"),
            token,
            Some(json!({ "client_name": "Ana Maria" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["client_name"], "Ana Maria");

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/v1/clients/999",
            token,
            Some(json!({ "client_name": "Nobody" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/clients/{id}/clone"),
            token,
            Some(json!({ "client_name": "Copy" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(body["data"]["id"].as_i64().unwrap(), id);
    assert_eq!(body["data"]["client_email"], "ana@example.com");

    let (status, body) = app
        .send(Method::GET, "/api/v1/clients?limit=1", token, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["meta"]["totalItems"], 2);
    assert_eq!(body["meta"]["totalPages"], 2);
    assert_eq!(body["meta"]["hasNextPage"], true);

    let (_, body) = app
        .send(
            Method::GET,
            "/api/v1/clients/search?searchFields=client_name&searchTerm=copy",
            token,
            None,
        )
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = app
        .send(Method::GET, "/api/v1/clients/count?client_name=Copy", token, None)
        .await;
    assert_eq!(body["data"]["count"], 1);

    let (_, body) = app
        .send(
            Method::GET,
            "/api/v1/clients/filter?client_name=Ana%20Maria",
            token,
            None,
        )
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .send(Method::GET, "/api/v1/clients/filter?nope=1", token, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Unknown field: nope");

    let (_, body) = app
        .send(Method::GET, "/api/v1/clients/select-options", token, None)
        .await;
    let labels: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|option| option["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["Ana Maria", "Copy"]);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/v1/clients/{id}"), token, None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .send(Method::DELETE, &format!("/api/v1/clients/{id}"), token, None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .send(Method::GET, &format!("/api/v1/clients/{id}"), token, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(Method::GET, "/api/v1/audits/history/clients", token, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["totalItems"], 4);
    assert_eq!(body["data"][0]["audit_action"], "DELETE");
    assert_eq!(body["data"][0]["audit_entity_name"], "Client");
}

#[tokio::test]
async fn audits_are_read_only() {
    let app = TestApp::new(&[]).await;
    let token = app.admin().await;
    let token = Some(token.as_str());

    let (status, _) = app.send(Method::GET, "/api/v1/audits", token, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send(Method::POST, "/api/v1/audits", token, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let (status, _) = app
        .send(Method::DELETE, "/api/v1/audits/1", token, None)
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn users_are_tenant_scoped_and_hide_passwords() {
    let app = TestApp::new(&[]).await;
    let token = app.admin().await;
    let token = Some(token.as_str());
    let (_, me) = app.send(Method::GET, "/api/v1/auth/me", token, None).await;
    let admin_id = me["data"]["id"].as_i64().unwrap();
    let company_id = me["data"]["user_fk_company_id"].as_i64().unwrap();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/users",
            token,
            Some(json!({
                "user_email": "bob@example.com",
                "user_password": "password123",
                "user_fk_company_id": 999
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["user_fk_company_id"], company_id);
    assert!(body["data"].get("user_password").is_none());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/users",
            token,
            Some(json!({ "user_email": "BOB@example.com", "user_password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (_, body) = app.send(Method::GET, "/api/v1/users", token, None).await;
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|user| user.get("user_password").is_none()));

    let (status, body) = app
        .send(Method::DELETE, &format!("/api/v1/users/{admin_id}"), token, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["message"], "You cannot delete your own account");
}

#[tokio::test]
async fn role_permissions_are_enforced() {
    let app = TestApp::new(&[]).await;
    let admin = app.admin().await;
    let admin = Some(admin.as_str());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/roles",
            admin,
            Some(json!({
                "role_name": "viewer",
                "role_permissions": { "clients": { "read": true } }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let role_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/users",
            admin,
            Some(json!({
                "user_email": "viewer@example.com",
                "user_password": "password123",
                "user_fk_role_id": role_id
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let viewer = app.login("viewer@example.com", "password123").await;
    let viewer = Some(viewer.as_str());
    let (status, _) = app.send(Method::GET, "/api/v1/clients", viewer, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/clients",
            viewer,
            Some(json!({ "client_name": "Nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = app.send(Method::GET, "/api/v1/projects", viewer, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn user_role_assignment_routes() {
    let app = TestApp::new(&[]).await;
    let token = app.admin().await;
    let token = Some(token.as_str());

    let (_, role) = app
        .send(
            Method::POST,
            "/api/v1/roles",
            token,
            Some(json!({ "role_name": "editor", "role_permissions": {} })),
        )
        .await;
    let role_id = role["data"]["id"].as_i64().unwrap();
    let (_, user) = app
        .send(
            Method::POST,
            "/api/v1/users",
            token,
            Some(json!({ "user_email": "eve@example.com", "user_password": "password123" })),
        )
        .await;
    let user_id = user["data"]["id"].as_i64().unwrap();

    let assign = format!("/api/v1/roles/users/{user_id}/roles/{role_id}");
    let list = format!("/api/v1/roles/users/{user_id}/roles");

    let (status, body) = app.send(Method::POST, &assign, token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role_name"], "editor");

    let (_, body) = app.send(Method::GET, &list, token, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = app.send(Method::DELETE, &assign, token, None).await;
    assert_eq!(body["data"]["removed"], true);
    let (_, body) = app.send(Method::GET, &list, token, None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/v1/roles/users/999/roles/{role_id}"),
            token,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn report_and_fields() {
    let app = TestApp::new(&[]).await;
    let token = app.admin().await;
    let token = Some(token.as_str());

    app.send(
        Method::POST,
        "/api/v1/clients",
        token,
        Some(json!({ "client_name": "Ana" })),
    )
    .await;

    let (status, body) = app
        .send(
            Method::GET,
            "/api/v1/clients/report?orientation=landscape",
            token,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["total"], 1);
    let path = body["data"]["path"].as_str().unwrap();
    assert!(std::path::Path::new(path).exists());

    let (status, _) = app
        .send(
            Method::GET,
            "/api/v1/clients/report?orientation=sideways",
            token,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(Method::GET, "/api/v1/projects/fields", token, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["entity"], "Project");
    assert!(
        body["data"]["fields"]
            .as_array()
            .unwrap()
            .iter()
            .any(|field| field["name"] == "project_code")
    );
}

#[tokio::test]
async fn rate_limit_rejects_after_max() {
    let app = TestApp::new(&[("RATE_LIMIT_MAX", "2")]).await;
    let attempt = || {
        app.send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "ghost@example.com", "password": "nope" })),
        )
    };

    assert_eq!(attempt().await.0, StatusCode::BAD_REQUEST);
    assert_eq!(attempt().await.0, StatusCode::BAD_REQUEST);
    let (status, body) = attempt().await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "TOO_MANY_REQUESTS");
    assert!(body["error"]["details"]["waitFor"].as_u64().unwrap() > 0);

    let (status, _) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn role_routes_do_not_reach_other_companies() {
    let app = TestApp::new(&[]).await;
    let token = app.admin().await;
    let token = Some(token.as_str());

    let other = Company::create(&app.db.pool, "Other", None).await.unwrap();
    let outsider = User::create(
        &app.db.pool,
        &CreateUser {
            user_name: None,
            user_email: "outsider@other.com".to_string(),
            user_password: "hash".to_string(),
            user_fk_company_id: other.id,
            user_fk_role_id: None,
        },
    )
    .await
    .unwrap();

    let assign = format!("/api/v1/roles/users/{}/roles/1", outsider.id);
    let (status, body) = app.send(Method::POST, &assign, token, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let (status, _) = app.send(Method::DELETE, &assign, token, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .send(
            Method::GET,
            &format!("/api/v1/roles/users/{}/roles", outsider.id),
            token,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stored = User::find_by_id(&app.db.pool, outsider.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.user_fk_role_id, None);

    let (status, _) = app
        .send(Method::GET, &format!("/api/v1/users/{}", outsider.id), token, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_cnpj_is_rejected_in_the_request_language() {
    let app = TestApp::new(&[]).await;
    let token = app.admin().await;
    let token = Some(token.as_str());
    let company = json!({ "company_name": "Acme", "company_cnpj": "12.345.678/0001-90" });

    let (status, body) = app
        .send(Method::POST, "/api/v1/companies", token, Some(company.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = app
        .send(Method::POST, "/api/v1/companies", token, Some(company.clone()))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert_eq!(body["error"]["message"], "CNPJ already registered");

    let (status, body) = app
        .send_with_headers(
            Method::POST,
            "/api/v1/companies",
            token,
            Some(company.clone()),
            &[("accept-language", "pt-BR,pt;q=0.9")],
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["message"], "CNPJ já cadastrado");

    let (status, body) = app
        .send(Method::POST, "/api/v1/companies?lang=pt", token, Some(company))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert_eq!(body["error"]["message"], "CNPJ já cadastrado");

    let (status, body) = app
        .send(Method::GET, "/api/v1/companies/count?lang=pt", token, None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}
