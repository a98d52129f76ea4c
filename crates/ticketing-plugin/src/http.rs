use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::pool::PoolConnection;
use sqlx::Postgres;
use ticketing_core::models::{
    BoardMode, BoardView, LinkRecord, LinkType, ListFilters, ListPage, Priority, SearchFilters,
    SearchResult, Ticket, TicketCreate, TicketDetails, TicketLinks, TicketType, TicketUpdate,
};
use ticketing_core::{TicketError, TicketService};
use tracing::warn;

use crate::adapters::ProjectHost;

/// The ticket routes, ready for the host to mount on its router.
pub fn ticket_router(host: Arc<dyn ProjectHost>) -> Router {
    Router::new()
        .route(
            "/projects/{name}/tickets",
            post(create_ticket).get(list_tickets),
        )
        .route("/projects/{name}/tickets/board", get(board_view))
        .route("/projects/{name}/tickets/search", get(search_tickets))
        .route(
            "/projects/{name}/tickets/{id}",
            get(get_ticket).put(update_ticket),
        )
        .route("/projects/{name}/tickets/{id}/move", post(move_ticket))
        .route(
            "/projects/{name}/tickets/{id}/links",
            post(add_link).get(list_links),
        )
        .route(
            "/projects/{name}/tickets/{id}/links/{link_id}",
            delete(remove_link),
        )
        .with_state(TicketApi { host })
}

#[derive(Clone)]
struct TicketApi {
    host: Arc<dyn ProjectHost>,
}

pub fn error_status(error: &TicketError) -> StatusCode {
    match error {
        TicketError::Validation(_) => StatusCode::BAD_REQUEST,
        TicketError::NotFound(_) => StatusCode::NOT_FOUND,
        TicketError::InvalidTransition { .. }
        | TicketError::NotClosable { .. }
        | TicketError::Conflict(_) => StatusCode::CONFLICT,
        TicketError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub struct ApiError(pub TicketError);

impl From<TicketError> for ApiError {
    fn from(error: TicketError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = error_status(&self.0);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            warn!(error = %self.0, "ticket request failed");
        }
        let body = json!({"error": self.0.kind(), "message": self.0.to_string()});
        (status, Json(body)).into_response()
    }
}

struct ProjectScope {
    conn: PoolConnection<Postgres>,
    schema: String,
}

impl ProjectScope {
    fn service(&mut self) -> Result<TicketService<'_>, ApiError> {
        Ok(TicketService::bind(&mut self.conn, &self.schema)?)
    }
}

async fn scoped(api: &TicketApi, name: &str) -> Result<ProjectScope, ApiError> {
    if let Some(message) = api.host.check_project(Some(name)) {
        return Err(ApiError(TicketError::Validation(message)));
    }
    let project = api.host.project_name(Some(name))?;
    let schema = api.host.resolve_schema(&project);
    let conn = api.host.acquire(Some(name)).await?;
    Ok(ProjectScope { conn, schema })
}

/// Bodies are decoded from raw JSON so shape errors surface as the same
/// validation kind the service uses, not as an extractor rejection.
fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body)
        .map_err(|err| ApiError(TicketError::Validation(err.to_string())))
}

async fn create_ticket(
    State(api): State<TicketApi>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Ticket>), ApiError> {
    let request: TicketCreate = decode(body)?;
    let mut scope = scoped(&api, &name).await?;
    let ticket = scope.service()?.create(request).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    #[serde(rename = "type")]
    ticket_type: Option<TicketType>,
    status: Option<String>,
    priority: Option<Priority>,
    assignee: Option<String>,
    tags: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

async fn list_tickets(
    State(api): State<TicketApi>,
    Path(name): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListPage>, ApiError> {
    let filters = ListFilters {
        ticket_type: query.ticket_type,
        status: query.status,
        priority: query.priority,
        assignee: query.assignee,
        tags: query.tags.map(split_tags),
        limit: query.limit,
        offset: query.offset,
    };
    let mut scope = scoped(&api, &name).await?;
    let page = scope.service()?.list(filters).await?;
    Ok(Json(page))
}

fn split_tags(raw: String) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct BoardQuery {
    view: Option<BoardMode>,
    #[serde(rename = "type")]
    ticket_type: Option<TicketType>,
    limit: Option<i64>,
}

async fn board_view(
    State(api): State<TicketApi>,
    Path(name): Path<String>,
    Query(query): Query<BoardQuery>,
) -> Result<Json<BoardView>, ApiError> {
    let mut scope = scoped(&api, &name).await?;
    let board = scope
        .service()?
        .board(query.view.unwrap_or_default(), query.ticket_type, query.limit)
        .await?;
    Ok(Json(board))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    query: String,
    #[serde(rename = "type")]
    ticket_type: Option<TicketType>,
    status: Option<String>,
    limit: Option<i64>,
}

async fn search_tickets(
    State(api): State<TicketApi>,
    Path(name): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResult>, ApiError> {
    let mut scope = scoped(&api, &name).await?;
    let result = scope
        .service()?
        .search(
            &query.query,
            SearchFilters {
                ticket_type: query.ticket_type,
                status: query.status,
                limit: query.limit,
            },
        )
        .await?;
    Ok(Json(result))
}

async fn get_ticket(
    State(api): State<TicketApi>,
    Path((name, ticket_id)): Path<(String, i64)>,
) -> Result<Json<TicketDetails>, ApiError> {
    let mut scope = scoped(&api, &name).await?;
    let details = scope.service()?.get(ticket_id).await?;
    Ok(Json(details))
}

async fn update_ticket(
    State(api): State<TicketApi>,
    Path((name, ticket_id)): Path<(String, i64)>,
    Json(mut body): Json<Value>,
) -> Result<Json<Ticket>, ApiError> {
    // `changed_by` rides alongside the field updates but is attribution, not
    // a ticket field, so it is peeled off before the strict decode.
    let changed_by = match body.as_object_mut().and_then(|map| map.remove("changed_by")) {
        None | Some(Value::Null) => None,
        Some(Value::String(changed_by)) => Some(changed_by),
        Some(_) => {
            return Err(ApiError(TicketError::Validation(
                "changed_by must be a string".to_owned(),
            )))
        }
    };
    let request: TicketUpdate = decode(body)?;
    let mut scope = scoped(&api, &name).await?;
    let ticket = scope
        .service()?
        .update(ticket_id, request, changed_by.as_deref())
        .await?;
    Ok(Json(ticket))
}

#[derive(Debug, Deserialize)]
struct MoveRequest {
    status: String,
    #[serde(default)]
    changed_by: Option<String>,
}

async fn move_ticket(
    State(api): State<TicketApi>,
    Path((name, ticket_id)): Path<(String, i64)>,
    Json(body): Json<Value>,
) -> Result<Json<Ticket>, ApiError> {
    let request: MoveRequest = decode(body)?;
    let mut scope = scoped(&api, &name).await?;
    let ticket = scope
        .service()?
        .transition(ticket_id, &request.status, request.changed_by.as_deref())
        .await?;
    Ok(Json(ticket))
}

#[derive(Debug, Deserialize)]
struct LinkRequest {
    target_id: i64,
    #[serde(default)]
    link_type: LinkType,
}

async fn add_link(
    State(api): State<TicketApi>,
    Path((name, ticket_id)): Path<(String, i64)>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<LinkRecord>), ApiError> {
    let request: LinkRequest = decode(body)?;
    let mut scope = scoped(&api, &name).await?;
    let link = scope
        .service()?
        .link_add(ticket_id, request.target_id, request.link_type)
        .await?;
    Ok((StatusCode::CREATED, Json(link)))
}

async fn list_links(
    State(api): State<TicketApi>,
    Path((name, ticket_id)): Path<(String, i64)>,
) -> Result<Json<TicketLinks>, ApiError> {
    let mut scope = scoped(&api, &name).await?;
    let links = scope.service()?.link_list(ticket_id).await?;
    Ok(Json(links))
}

async fn remove_link(
    State(api): State<TicketApi>,
    Path((name, _ticket_id, link_id)): Path<(String, i64, i64)>,
) -> Result<StatusCode, ApiError> {
    let mut scope = scoped(&api, &name).await?;
    scope.service()?.link_remove(link_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
