//! The CRUD surface mounted once per registered entity.

use std::collections::HashMap;

use axum::{
    Extension, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::{metadata::EntityDef, models::record::Record};
use serde::Serialize;
use serde_json::Value;
use services::services::{
    auth::AuthUser,
    entity::{
        EntityError, EntityFields, EntityService, Page, PageRequest, SearchRequest,
        SelectOption, SelectRequest,
    },
    field_filter::{self, ValidationMode},
    report::{Orientation, ReportOptions, ReportOutput},
};
use utils::{i18n::Message, response::ApiResponse};

use crate::{Deployment, error::ApiError};

type Params = HashMap<String, String>;

/// Query keys that are never filter conditions
const RESERVED_KEYS: [&str; 4] = ["page", "limit", "order", "lang"];

pub(crate) fn authorize(caller: &AuthUser, resource: &str, action: &str) -> Result<(), ApiError> {
    if caller.can(resource, action) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "You do not have permission to {action} {resource}"
        )))
    }
}

pub(crate) fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::Validation("Invalid id".to_string()))
}

fn parse_number(params: &Params, key: &str) -> Result<Option<u32>, ApiError> {
    params
        .get(key)
        .map(|raw| raw.trim())
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            raw.parse()
                .map_err(|_| ApiError::Validation(format!("Invalid {key}: {raw}")))
        })
        .transpose()
}

pub(crate) fn page_request(params: &Params) -> Result<PageRequest, ApiError> {
    Ok(PageRequest {
        page: parse_number(params, "page")?,
        limit: parse_number(params, "limit")?,
        order: params.get("order").cloned(),
    })
}

/// Query parameters other than paging and locale, as equality conditions
fn conditions(params: Params) -> Record {
    params
        .into_iter()
        .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

fn list(params: &Params, key: &str) -> Vec<String> {
    params
        .get(key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// An empty body is an empty record
fn body_record(body: &Bytes) -> Result<Record, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Record::new());
    }
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::Validation(
            "Request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(ApiError::Validation(format!("Invalid JSON body: {e}"))),
    }
}

fn not_found(def: &EntityDef, id: i64) -> ApiError {
    EntityError::NotFound(
        Message::ItemNotFound {
            model: def.name.to_string(),
            id,
        }
        .to_string(),
    )
    .into()
}

fn browsable(def: &EntityDef, mut page: Page) -> ResponseJson<ApiResponse<Vec<Record>>> {
    field_filter::filter_browsable(def, &mut page.records);
    ResponseJson(ApiResponse::paginated(page.records, page.meta))
}

fn readable(def: &EntityDef, mut record: Record) -> Record {
    field_filter::filter_readable(def, &mut record);
    record
}

pub async fn find_all(
    Extension(entity): Extension<EntityService>,
    Extension(caller): Extension<AuthUser>,
    Query(params): Query<Params>,
) -> Result<ResponseJson<ApiResponse<Vec<Record>>>, ApiError> {
    authorize(&caller, entity.def().slug, "read")?;
    let page = entity
        .find_all(&caller.context(), &page_request(&params)?)
        .await?;
    Ok(browsable(entity.def(), page))
}

pub async fn find_by_conditions(
    Extension(entity): Extension<EntityService>,
    Extension(caller): Extension<AuthUser>,
    Query(params): Query<Params>,
) -> Result<ResponseJson<ApiResponse<Vec<Record>>>, ApiError> {
    authorize(&caller, entity.def().slug, "read")?;
    let page_request = page_request(&params)?;
    let page = entity
        .find_by_conditions(&caller.context(), &conditions(params), &page_request)
        .await?;
    Ok(browsable(entity.def(), page))
}

pub async fn search(
    Extension(entity): Extension<EntityService>,
    Extension(caller): Extension<AuthUser>,
    Query(params): Query<Params>,
) -> Result<ResponseJson<ApiResponse<Vec<Record>>>, ApiError> {
    authorize(&caller, entity.def().slug, "read")?;
    let request = SearchRequest {
        fields: list(&params, "searchFields"),
        term: params.get("searchTerm").cloned().unwrap_or_default(),
        page: page_request(&params)?,
    };
    let page = entity.search(&caller.context(), &request).await?;
    Ok(browsable(entity.def(), page))
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

pub async fn count(
    Extension(entity): Extension<EntityService>,
    Extension(caller): Extension<AuthUser>,
    Query(params): Query<Params>,
) -> Result<ResponseJson<ApiResponse<CountResponse>>, ApiError> {
    authorize(&caller, entity.def().slug, "read")?;
    let count = entity
        .count(&caller.context(), &conditions(params))
        .await?;
    Ok(ResponseJson(ApiResponse::success(CountResponse { count })))
}

pub async fn select_options(
    Extension(entity): Extension<EntityService>,
    Extension(caller): Extension<AuthUser>,
    Query(params): Query<Params>,
) -> Result<ResponseJson<ApiResponse<Vec<SelectOption>>>, ApiError> {
    authorize(&caller, entity.def().slug, "read")?;
    let label_fields = list(&params, "labelFields");
    let request = SelectRequest {
        label_fields: (!label_fields.is_empty()).then_some(label_fields),
        delimiter: params.get("delimiter").cloned(),
        search: params.get("search").cloned(),
    };
    let options = entity.select_options(&caller.context(), &request).await?;
    Ok(ResponseJson(ApiResponse::success(options)))
}

pub async fn fields(
    Extension(entity): Extension<EntityService>,
    Extension(caller): Extension<AuthUser>,
) -> Result<ResponseJson<ApiResponse<EntityFields>>, ApiError> {
    authorize(&caller, entity.def().slug, "read")?;
    Ok(ResponseJson(ApiResponse::success(entity.fields())))
}

pub async fn report(
    State(deployment): State<Deployment>,
    Extension(entity): Extension<EntityService>,
    Extension(caller): Extension<AuthUser>,
    Query(params): Query<Params>,
) -> Result<ResponseJson<ApiResponse<ReportOutput>>, ApiError> {
    authorize(&caller, entity.def().slug, "read")?;
    let orientation = match params.get("orientation").map(|s| s.trim().to_ascii_lowercase()) {
        None => None,
        Some(value) if value.is_empty() => None,
        Some(value) if value == "portrait" => Some(Orientation::Portrait),
        Some(value) if value == "landscape" => Some(Orientation::Landscape),
        Some(value) => {
            return Err(ApiError::Validation(format!(
                "Invalid orientation: {value}"
            )));
        }
    };
    let options = ReportOptions {
        title: params.get("title").cloned(),
        orientation,
    };
    let output = deployment
        .reports()
        .generate_report(&caller.context(), &entity, &options)
        .await?;
    Ok(ResponseJson(ApiResponse::success(output)))
}

pub async fn find_by_id(
    Extension(entity): Extension<EntityService>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<ResponseJson<ApiResponse<Record>>, ApiError> {
    authorize(&caller, entity.def().slug, "read")?;
    let id = parse_id(&id)?;
    let record = entity
        .find_by_id(&caller.context(), id)
        .await?
        .ok_or_else(|| not_found(entity.def(), id))?;
    Ok(ResponseJson(ApiResponse::success(readable(
        entity.def(),
        record,
    ))))
}

pub async fn create(
    Extension(entity): Extension<EntityService>,
    Extension(caller): Extension<AuthUser>,
    body: Bytes,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Record>>), ApiError> {
    authorize(&caller, entity.def().slug, "create")?;
    let def = entity.def();
    let ctx = caller.context();
    let mut data = body_record(&body)?;
    field_filter::filter_addable(def, &mut data);
    entity.apply_tenant(&ctx, &mut data);
    field_filter::validate_required(def, &data, ValidationMode::Create)
        .map_err(ApiError::Validation)?;

    let record = entity.create(&ctx, data).await?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(readable(def, record))),
    ))
}

pub async fn update(
    Extension(entity): Extension<EntityService>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ResponseJson<ApiResponse<Record>>, ApiError> {
    authorize(&caller, entity.def().slug, "update")?;
    let def = entity.def();
    let id = parse_id(&id)?;
    let mut data = body_record(&body)?;
    field_filter::filter_editable(def, &mut data);
    field_filter::validate_required(def, &data, ValidationMode::Update)
        .map_err(ApiError::Validation)?;

    let record = entity
        .update(&caller.context(), id, data)
        .await?
        .ok_or_else(|| not_found(def, id))?;
    Ok(ResponseJson(ApiResponse::success(readable(def, record))))
}

pub async fn delete(
    Extension(entity): Extension<EntityService>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    authorize(&caller, entity.def().slug, "delete")?;
    let id = parse_id(&id)?;
    entity.delete(&caller.context(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The body overrides copied values. Required hidden columns are not copied,
/// so cloning a user needs a `user_password` in the body.
pub async fn clone_record(
    Extension(entity): Extension<EntityService>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Record>>), ApiError> {
    authorize(&caller, entity.def().slug, "create")?;
    let def = entity.def();
    let id = parse_id(&id)?;
    let mut overrides = body_record(&body)?;
    field_filter::filter_addable(def, &mut overrides);

    let record = entity.clone_record(&caller.context(), id, overrides).await?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(readable(def, record))),
    ))
}

/// Routes for one entity; read-only entities get no mutating routes
pub fn router(entity: EntityService) -> Router<Deployment> {
    let read_only = entity.def().read_only;
    let mut root = get(find_all);
    let mut by_id = get(find_by_id);
    let mut router = Router::new()
        .route("/filter", get(find_by_conditions))
        .route("/search", get(search))
        .route("/count", get(count))
        .route("/select-options", get(select_options))
        .route("/fields", get(fields))
        .route("/report", get(report));
    if !read_only {
        root = root.post(create);
        by_id = by_id.put(update).delete(delete);
        router = router.route("/{id}/clone", post(clone_record));
    }
    router
        .route("/", root)
        .route("/{id}", by_id)
        .layer(Extension(entity))
}
