use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::pool::PoolConnection;
use sqlx::Postgres;
use ticketing_core::models::{
    BoardMode, LinkType, ListFilters, Priority, SearchFilters, TicketCreate, TicketType,
    TicketUpdate,
};
use ticketing_core::{TicketError, TicketService};
use tracing::warn;

use crate::adapters::{ProjectHost, RpcTool};

pub const TICKET_TOOL: &str = "ticket";
pub const TICKET_BOARD_TOOL: &str = "ticket_board";
pub const TICKET_SEARCH_TOOL: &str = "ticket_search";
pub const TICKET_LINK_TOOL: &str = "ticket_link";

/// A request-scoped `(connection, schema)` pair resolved through the host.
struct ProjectScope {
    conn: PoolConnection<Postgres>,
    schema: String,
}

impl ProjectScope {
    fn service(&mut self) -> Result<TicketService<'_>, TicketError> {
        TicketService::bind(&mut self.conn, &self.schema)
    }
}

fn check_project(host: &dyn ProjectHost, project: Option<&str>) -> Result<(), TicketError> {
    match host.check_project(project) {
        Some(message) => Err(TicketError::Validation(message)),
        None => Ok(()),
    }
}

async fn open_scope(
    host: &dyn ProjectHost,
    project: Option<&str>,
) -> Result<ProjectScope, TicketError> {
    let name = host.project_name(project)?;
    let schema = host.resolve_schema(&name);
    let conn = host.acquire(project).await?;
    Ok(ProjectScope { conn, schema })
}

fn project_of(args: &Value) -> Option<String> {
    args.get("project")
        .and_then(Value::as_str)
        .map(str::to_owned)
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, TicketError> {
    serde_json::from_value(args).map_err(|err| TicketError::Validation(err.to_string()))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, TicketError> {
    serde_json::to_value(value).map_err(TicketError::internal)
}

fn error_envelope(error: TicketError) -> Value {
    if matches!(error, TicketError::Internal(_)) {
        warn!(error = %error, "ticketing tool call failed");
    }
    json!({"error": error.kind(), "message": error.to_string()})
}

// ---------------------------------------------------------------------------
// ticket
// ---------------------------------------------------------------------------

pub struct TicketTool {
    host: Arc<dyn ProjectHost>,
}

impl TicketTool {
    pub fn new(host: Arc<dyn ProjectHost>) -> Self {
        Self { host }
    }

    async fn execute(&self, args: Value) -> Result<Value, TicketError> {
        let project = project_of(&args);
        check_project(self.host.as_ref(), project.as_deref())?;

        if args.get("action").and_then(Value::as_str) == Some("update") {
            for field in ["status", "type"] {
                if args.get(field).is_some() {
                    return Err(TicketError::Validation(format!(
                        "'{field}' cannot be changed via update; use the move action"
                    )));
                }
            }
        }

        let action: TicketAction = parse_args(args)?;
        let mut scope = open_scope(self.host.as_ref(), project.as_deref()).await?;
        let mut service = scope.service()?;

        match action {
            TicketAction::Create {
                title,
                description,
                ticket_type,
                priority,
                assignee,
                reporter,
                tags,
                metadata,
            } => {
                let ticket = service
                    .create(TicketCreate {
                        title,
                        description,
                        ticket_type,
                        priority,
                        assignee,
                        reporter,
                        tags,
                        metadata,
                    })
                    .await?;
                Ok(json!({"status": "created", "ticket": to_json(&ticket)?}))
            }
            TicketAction::Get { ticket_id } => {
                let details = service.get(ticket_id).await?;
                to_json(&details)
            }
            TicketAction::List {
                ticket_type,
                status,
                priority,
                assignee,
                tags,
                limit,
                offset,
            } => {
                let page = service
                    .list(ListFilters {
                        ticket_type,
                        status,
                        priority,
                        assignee,
                        tags,
                        limit,
                        offset,
                    })
                    .await?;
                to_json(&page)
            }
            TicketAction::Update {
                ticket_id,
                title,
                description,
                priority,
                assignee,
                reporter,
                tags,
                metadata,
                changed_by,
            } => {
                let request = TicketUpdate {
                    title,
                    description,
                    priority,
                    assignee,
                    reporter,
                    tags,
                    metadata,
                };
                let ticket = service
                    .update(ticket_id, request, changed_by.as_deref())
                    .await?;
                Ok(json!({"status": "updated", "ticket": to_json(&ticket)?}))
            }
            TicketAction::Move {
                ticket_id,
                status,
                changed_by,
            } => {
                let ticket = service
                    .transition(ticket_id, &status, changed_by.as_deref())
                    .await?;
                Ok(json!({"status": "transitioned", "ticket": to_json(&ticket)?}))
            }
            TicketAction::Close {
                ticket_id,
                changed_by,
            } => {
                let ticket = service.close(ticket_id, changed_by.as_deref()).await?;
                Ok(json!({"status": "closed", "ticket": to_json(&ticket)?}))
            }
        }
    }
}

#[async_trait]
impl RpcTool for TicketTool {
    fn name(&self) -> &'static str {
        TICKET_TOOL
    }

    fn description(&self) -> &'static str {
        "Ticket CRUD and lifecycle. Actions: create, get, list, update, move, close."
    }

    async fn call(&self, args: Value) -> Value {
        match self.execute(args).await {
            Ok(value) => value,
            Err(error) => error_envelope(error),
        }
    }
}

/// Actions arrive as an internally tagged map; the tag doubles as the action
/// vocabulary, so an unknown action fails deserialization outright.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum TicketAction {
    Create {
        title: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(rename = "type")]
        ticket_type: TicketType,
        #[serde(default)]
        priority: Priority,
        #[serde(default)]
        assignee: Option<String>,
        #[serde(default)]
        reporter: Option<String>,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        metadata: Map<String, Value>,
    },
    Get {
        ticket_id: i64,
    },
    List {
        #[serde(rename = "type", default)]
        ticket_type: Option<TicketType>,
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        priority: Option<Priority>,
        #[serde(default)]
        assignee: Option<String>,
        #[serde(default)]
        tags: Option<Vec<String>>,
        #[serde(default)]
        limit: Option<i64>,
        #[serde(default)]
        offset: Option<i64>,
    },
    Update {
        ticket_id: i64,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        priority: Option<Priority>,
        #[serde(default)]
        assignee: Option<String>,
        #[serde(default)]
        reporter: Option<String>,
        #[serde(default)]
        tags: Option<Vec<String>>,
        #[serde(default)]
        metadata: Option<Map<String, Value>>,
        #[serde(default)]
        changed_by: Option<String>,
    },
    Move {
        ticket_id: i64,
        status: String,
        #[serde(default)]
        changed_by: Option<String>,
    },
    Close {
        ticket_id: i64,
        #[serde(default)]
        changed_by: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// ticket_board
// ---------------------------------------------------------------------------

pub struct TicketBoardTool {
    host: Arc<dyn ProjectHost>,
}

impl TicketBoardTool {
    pub fn new(host: Arc<dyn ProjectHost>) -> Self {
        Self { host }
    }

    async fn execute(&self, args: Value) -> Result<Value, TicketError> {
        let project = project_of(&args);
        check_project(self.host.as_ref(), project.as_deref())?;
        let parsed: BoardArgs = parse_args(args)?;
        let mut scope = open_scope(self.host.as_ref(), project.as_deref()).await?;
        let board = scope
            .service()?
            .board(parsed.view, parsed.ticket_type, parsed.limit)
            .await?;
        to_json(&board)
    }
}

#[async_trait]
impl RpcTool for TicketBoardTool {
    fn name(&self) -> &'static str {
        TICKET_BOARD_TOOL
    }

    fn description(&self) -> &'static str {
        "Ticket board grouped by status; view is kanban (full tickets), summary (counts), \
         or compact (id/title/priority). Kanban and compact cap each column at `limit`."
    }

    async fn call(&self, args: Value) -> Value {
        match self.execute(args).await {
            Ok(value) => value,
            Err(error) => error_envelope(error),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BoardArgs {
    #[serde(default)]
    view: BoardMode,
    #[serde(rename = "type", default)]
    ticket_type: Option<TicketType>,
    /// Tickets per column for kanban/compact; 0 disables the cap.
    #[serde(default)]
    limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// ticket_search
// ---------------------------------------------------------------------------

pub struct TicketSearchTool {
    host: Arc<dyn ProjectHost>,
}

impl TicketSearchTool {
    pub fn new(host: Arc<dyn ProjectHost>) -> Self {
        Self { host }
    }

    async fn execute(&self, args: Value) -> Result<Value, TicketError> {
        let project = project_of(&args);
        check_project(self.host.as_ref(), project.as_deref())?;
        let parsed: SearchArgs = parse_args(args)?;
        let mut scope = open_scope(self.host.as_ref(), project.as_deref()).await?;
        let result = scope
            .service()?
            .search(
                &parsed.query,
                SearchFilters {
                    ticket_type: parsed.ticket_type,
                    status: parsed.status,
                    limit: parsed.limit,
                },
            )
            .await?;
        to_json(&result)
    }
}

#[async_trait]
impl RpcTool for TicketSearchTool {
    fn name(&self) -> &'static str {
        TICKET_SEARCH_TOOL
    }

    fn description(&self) -> &'static str {
        "Full-text ticket search ranked by relevance."
    }

    async fn call(&self, args: Value) -> Value {
        match self.execute(args).await {
            Ok(value) => value,
            Err(error) => error_envelope(error),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(rename = "type", default)]
    ticket_type: Option<TicketType>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// ticket_link
// ---------------------------------------------------------------------------

pub struct TicketLinkTool {
    host: Arc<dyn ProjectHost>,
}

impl TicketLinkTool {
    pub fn new(host: Arc<dyn ProjectHost>) -> Self {
        Self { host }
    }

    async fn execute(&self, args: Value) -> Result<Value, TicketError> {
        let project = project_of(&args);
        check_project(self.host.as_ref(), project.as_deref())?;
        let action: LinkAction = parse_args(args)?;
        let mut scope = open_scope(self.host.as_ref(), project.as_deref()).await?;
        let mut service = scope.service()?;

        match action {
            LinkAction::Add {
                ticket_id,
                target_id,
                link_type,
            } => {
                let link = service.link_add(ticket_id, target_id, link_type).await?;
                Ok(json!({"status": "linked", "link": to_json(&link)?}))
            }
            LinkAction::List { ticket_id } => {
                let links = service.link_list(ticket_id).await?;
                to_json(&links)
            }
            LinkAction::Remove { link_id } => {
                let removed = service.link_remove(link_id).await?;
                Ok(json!({"status": "removed", "link_id": removed}))
            }
        }
    }
}

#[async_trait]
impl RpcTool for TicketLinkTool {
    fn name(&self) -> &'static str {
        TICKET_LINK_TOOL
    }

    fn description(&self) -> &'static str {
        "Directed ticket relationships. Actions: add, list, remove."
    }

    async fn call(&self, args: Value) -> Value {
        match self.execute(args).await {
            Ok(value) => value,
            Err(error) => error_envelope(error),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum LinkAction {
    Add {
        ticket_id: i64,
        target_id: i64,
        #[serde(default)]
        link_type: LinkType,
    },
    List {
        ticket_id: i64,
    },
    Remove {
        link_id: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_actions_parse_from_tagged_maps() {
        let action: TicketAction = serde_json::from_value(json!({
            "action": "create",
            "title": "X",
            "type": "task",
            "tags": ["a", "b"],
            "project": "demo",
        }))
        .expect("parse create");
        assert!(matches!(
            action,
            TicketAction::Create { ref title, ticket_type: TicketType::Task, .. } if title == "X"
        ));

        let action: TicketAction =
            serde_json::from_value(json!({"action": "move", "ticket_id": 4, "status": "done"}))
                .expect("parse move");
        assert!(matches!(
            action,
            TicketAction::Move { ticket_id: 4, ref status, .. } if status == "done"
        ));
    }

    #[test]
    fn unknown_actions_fail_to_parse() {
        let result: Result<TicketAction, _> =
            serde_json::from_value(json!({"action": "obliterate", "ticket_id": 1}));
        assert!(result.is_err());

        let result: Result<LinkAction, _> =
            serde_json::from_value(json!({"action": "merge", "link_id": 1}));
        assert!(result.is_err());
    }

    #[test]
    fn link_add_defaults_to_related() {
        let action: LinkAction =
            serde_json::from_value(json!({"action": "add", "ticket_id": 1, "target_id": 2}))
                .expect("parse add");
        assert!(matches!(
            action,
            LinkAction::Add { link_type: LinkType::Related, .. }
        ));
    }

    #[test]
    fn board_view_defaults_to_kanban() {
        let parsed: BoardArgs = serde_json::from_value(json!({})).expect("parse board args");
        assert_eq!(parsed.view, BoardMode::Kanban);
        assert_eq!(parsed.ticket_type, None);
        assert_eq!(parsed.limit, None);

        let parsed: BoardArgs =
            serde_json::from_value(json!({"view": "compact", "limit": 5}))
                .expect("parse compact board args");
        assert_eq!(parsed.view, BoardMode::Compact);
        assert_eq!(parsed.limit, Some(5));
    }

    #[test]
    fn error_envelopes_carry_kind_and_message() {
        let value = error_envelope(TicketError::NotFound("ticket 9 not found".to_owned()));
        assert_eq!(value["error"], "NotFound");
        assert_eq!(value["message"], "not found: ticket 9 not found");
    }
}
