use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};

use crate::error::TicketError;
use crate::models::{
    BoardColumn, BoardMode, BoardView, CompactTicket, HistoryEntry, LinkCounterpart, LinkDetails,
    LinkRecord, LinkType, ListFilters, ListPage, Priority, SearchFilters, SearchHit, SearchResult,
    Ticket, TicketCreate, TicketDetails, TicketLinks, TicketType, TicketUpdate,
};
use crate::state_machine;
use crate::statements::{Statements, TICKET_COLUMNS};

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 200;
pub const DEFAULT_SEARCH_LIMIT: i64 = 20;
pub const MAX_SEARCH_LIMIT: i64 = 100;
/// Tickets shown per board column unless the caller overrides; 0 disables
/// the cap.
pub const DEFAULT_BOARD_COLUMN_LIMIT: i64 = 10;
/// Kanban board descriptions are cut here; full text comes from `get`.
pub const BOARD_DESCRIPTION_MAX_CHARS: usize = 100;

/// Ticket operations bound to one `(connection, schema)` pair for the
/// duration of a request. The caller owns the connection lifecycle; the
/// service holds no state of its own beyond the rendered statements.
pub struct TicketService<'c> {
    conn: &'c mut PgConnection,
    sql: Statements,
}

impl<'c> TicketService<'c> {
    pub fn bind(conn: &'c mut PgConnection, schema: &str) -> Result<Self, TicketError> {
        Ok(Self {
            conn,
            sql: Statements::render(schema)?,
        })
    }

    pub fn schema(&self) -> &str {
        &self.sql.schema
    }

    pub async fn create(&mut self, request: TicketCreate) -> Result<Ticket, TicketError> {
        if request.title.trim().is_empty() {
            return Err(TicketError::validation("title must not be empty"));
        }
        let now = epoch_now();
        let status = state_machine::initial_status(request.ticket_type);

        let row: TicketRow = sqlx::query_as(&self.sql.insert_ticket)
            .bind(&request.title)
            .bind(&request.description)
            .bind(request.ticket_type.as_str())
            .bind(status)
            .bind(request.priority.as_str())
            .bind(&request.assignee)
            .bind(&request.reporter)
            .bind(tags_value(&request.tags))
            .bind(Value::Object(request.metadata))
            .bind(now)
            .bind(now)
            .fetch_one(&mut *self.conn)
            .await
            .map_err(db_error)?;
        row.try_into()
    }

    pub async fn get(&mut self, ticket_id: i64) -> Result<TicketDetails, TicketError> {
        let row: Option<TicketRow> = sqlx::query_as(&self.sql.select_ticket)
            .bind(ticket_id)
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(db_error)?;
        let ticket: Ticket = row.ok_or_else(|| ticket_not_found(ticket_id))?.try_into()?;

        let history = self.history(ticket_id).await?;
        let outgoing = self.links_from(ticket_id).await?;
        let incoming = self.links_to(ticket_id).await?;
        Ok(TicketDetails {
            ticket,
            history,
            outgoing,
            incoming,
        })
    }

    pub async fn list(&mut self, filters: ListFilters) -> Result<ListPage, TicketError> {
        let limit = filters
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        let offset = filters.offset.unwrap_or(0).max(0);

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {TICKET_COLUMNS} FROM {}",
            self.sql.ticket_table
        ));
        push_list_filters(&mut query, &filters);
        query.push(" ORDER BY updated_at DESC, id DESC LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);
        let rows: Vec<TicketRow> = query
            .build_query_as()
            .fetch_all(&mut *self.conn)
            .await
            .map_err(db_error)?;

        let mut count = QueryBuilder::<Postgres>::new(format!(
            "SELECT COUNT(*) FROM {}",
            self.sql.ticket_table
        ));
        push_list_filters(&mut count, &filters);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&mut *self.conn)
            .await
            .map_err(db_error)?;

        let by_status = self.grouped_counts("status", &filters).await?;
        let by_type = self.grouped_counts("type", &filters).await?;

        let tickets = rows
            .into_iter()
            .map(Ticket::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ListPage {
            tickets,
            total,
            limit,
            offset,
            has_more: offset + limit < total,
            by_status,
            by_type,
        })
    }

    pub async fn update(
        &mut self,
        ticket_id: i64,
        request: TicketUpdate,
        changed_by: Option<&str>,
    ) -> Result<Ticket, TicketError> {
        if let Some(title) = &request.title {
            if title.trim().is_empty() {
                return Err(TicketError::validation("title must not be empty"));
            }
        }

        let mut tx = self.conn.begin().await.map_err(db_error)?;
        let row: Option<TicketRow> = sqlx::query_as(&self.sql.select_ticket_for_update)
            .bind(ticket_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
        let current: Ticket = row.ok_or_else(|| ticket_not_found(ticket_id))?.try_into()?;

        let now = epoch_now();
        let mut changes: Vec<(&'static str, Option<String>, Option<String>)> = Vec::new();

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "UPDATE {} SET ",
            self.sql.ticket_table
        ));
        {
            let mut assignments = query.separated(", ");

            if let Some(title) = &request.title {
                if *title != current.title {
                    assignments.push("title = ");
                    assignments.push_bind_unseparated(title.clone());
                    changes.push(("title", Some(current.title.clone()), Some(title.clone())));
                }
            }
            if let Some(description) = &request.description {
                if Some(description) != current.description.as_ref() {
                    assignments.push("description = ");
                    assignments.push_bind_unseparated(description.clone());
                    changes.push((
                        "description",
                        current.description.clone(),
                        Some(description.clone()),
                    ));
                }
            }
            if let Some(priority) = request.priority {
                if priority != current.priority {
                    assignments.push("priority = ");
                    assignments.push_bind_unseparated(priority.as_str());
                    changes.push((
                        "priority",
                        Some(current.priority.as_str().to_owned()),
                        Some(priority.as_str().to_owned()),
                    ));
                }
            }
            if let Some(assignee) = &request.assignee {
                if Some(assignee) != current.assignee.as_ref() {
                    assignments.push("assignee = ");
                    assignments.push_bind_unseparated(assignee.clone());
                    changes.push((
                        "assignee",
                        current.assignee.clone(),
                        Some(assignee.clone()),
                    ));
                }
            }
            if let Some(reporter) = &request.reporter {
                if Some(reporter) != current.reporter.as_ref() {
                    assignments.push("reporter = ");
                    assignments.push_bind_unseparated(reporter.clone());
                    changes.push((
                        "reporter",
                        current.reporter.clone(),
                        Some(reporter.clone()),
                    ));
                }
            }
            if let Some(tags) = &request.tags {
                if *tags != current.tags {
                    assignments.push("tags = ");
                    assignments.push_bind_unseparated(tags_value(tags));
                    changes.push((
                        "tags",
                        Some(json_text(&tags_value(&current.tags))?),
                        Some(json_text(&tags_value(tags))?),
                    ));
                }
            }
            if let Some(metadata) = &request.metadata {
                if *metadata != current.metadata {
                    assignments.push("metadata = ");
                    assignments.push_bind_unseparated(Value::Object(metadata.clone()));
                    changes.push((
                        "metadata",
                        Some(json_text(&Value::Object(current.metadata.clone()))?),
                        Some(json_text(&Value::Object(metadata.clone()))?),
                    ));
                }
            }

            assignments.push("updated_at = ");
            assignments.push_bind_unseparated(now);
        }
        query.push(" WHERE id = ");
        query.push_bind(ticket_id);
        query.push(format!(" RETURNING {TICKET_COLUMNS}"));

        let updated: TicketRow = query
            .build_query_as()
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;

        for (field, old_value, new_value) in changes {
            sqlx::query(&self.sql.insert_history)
                .bind(ticket_id)
                .bind(field)
                .bind(old_value)
                .bind(new_value)
                .bind(changed_by)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        updated.try_into()
    }

    /// Status changes go through the state machine under a row lock, so the
    /// state that was validated is the state that gets overwritten.
    pub async fn transition(
        &mut self,
        ticket_id: i64,
        target_status: &str,
        changed_by: Option<&str>,
    ) -> Result<Ticket, TicketError> {
        let mut tx = self.conn.begin().await.map_err(db_error)?;
        let row: Option<TicketRow> = sqlx::query_as(&self.sql.select_ticket_for_update)
            .bind(ticket_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
        let current: Ticket = row.ok_or_else(|| ticket_not_found(ticket_id))?.try_into()?;

        state_machine::validate_transition(current.ticket_type, &current.status, target_status)?;

        let now = epoch_now();
        let closed_at =
            state_machine::is_terminal(current.ticket_type, target_status).then_some(now);

        let updated: TicketRow = sqlx::query_as(&self.sql.update_status)
            .bind(ticket_id)
            .bind(target_status)
            .bind(now)
            .bind(closed_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;

        sqlx::query(&self.sql.insert_history)
            .bind(ticket_id)
            .bind("status")
            .bind(Some(current.status.as_str()))
            .bind(Some(target_status))
            .bind(changed_by)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        updated.try_into()
    }

    pub async fn close(
        &mut self,
        ticket_id: i64,
        changed_by: Option<&str>,
    ) -> Result<Ticket, TicketError> {
        let row: Option<(String, String)> = sqlx::query_as(&self.sql.select_type_and_status)
            .bind(ticket_id)
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(db_error)?;
        let (type_name, status) = row.ok_or_else(|| ticket_not_found(ticket_id))?;
        let ticket_type = parse_type(&type_name, ticket_id)?;
        let target = state_machine::close_target(ticket_type, &status)?;
        self.transition(ticket_id, target, changed_by).await
    }

    /// Kanban and compact views cap each column at `limit_per_column`
    /// (default 10, 0 disables the cap) while `count` keeps the full column
    /// size; summary ignores the limit entirely.
    pub async fn board(
        &mut self,
        view: BoardMode,
        ticket_type: Option<TicketType>,
        limit_per_column: Option<i64>,
    ) -> Result<BoardView, TicketError> {
        let statuses = match ticket_type {
            Some(ticket_type) => state_machine::declared_statuses(ticket_type),
            None => state_machine::statuses_across_all_types(),
        };

        if view == BoardMode::Summary {
            let mut query = QueryBuilder::<Postgres>::new(format!(
                "SELECT status, COUNT(*) FROM {}",
                self.sql.ticket_table
            ));
            if let Some(ticket_type) = ticket_type {
                query.push(" WHERE type = ");
                query.push_bind(ticket_type.as_str());
            }
            query.push(" GROUP BY status");
            let counts: Vec<(String, i64)> = query
                .build_query_as()
                .fetch_all(&mut *self.conn)
                .await
                .map_err(db_error)?;
            let by_status: BTreeMap<String, i64> = counts.into_iter().collect();

            let columns: Vec<BoardColumn> = statuses
                .iter()
                .map(|status| BoardColumn {
                    status: (*status).to_owned(),
                    count: by_status.get(*status).copied().unwrap_or(0),
                    tickets: Vec::new(),
                    compact_tickets: Vec::new(),
                    has_more: false,
                })
                .collect();
            let total = columns.iter().map(|column| column.count).sum();
            return Ok(BoardView {
                view,
                ticket_type,
                columns,
                total,
                limit_per_column: None,
            });
        }

        let limit = limit_per_column.unwrap_or(DEFAULT_BOARD_COLUMN_LIMIT).max(0);

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {TICKET_COLUMNS} FROM {}",
            self.sql.ticket_table
        ));
        if let Some(ticket_type) = ticket_type {
            query.push(" WHERE type = ");
            query.push_bind(ticket_type.as_str());
        }
        query.push(" ORDER BY updated_at DESC, id DESC");
        let rows: Vec<TicketRow> = query
            .build_query_as()
            .fetch_all(&mut *self.conn)
            .await
            .map_err(db_error)?;

        let mut buckets: BTreeMap<String, Vec<Ticket>> = BTreeMap::new();
        for row in rows {
            let ticket: Ticket = row.try_into()?;
            buckets.entry(ticket.status.clone()).or_default().push(ticket);
        }

        let columns: Vec<BoardColumn> = statuses
            .iter()
            .map(|status| {
                let mut tickets = buckets.remove(*status).unwrap_or_default();
                let count = tickets.len() as i64;
                if limit > 0 && tickets.len() > limit as usize {
                    tickets.truncate(limit as usize);
                }
                let has_more = (tickets.len() as i64) < count;

                if view == BoardMode::Compact {
                    BoardColumn {
                        status: (*status).to_owned(),
                        count,
                        tickets: Vec::new(),
                        compact_tickets: tickets.into_iter().map(CompactTicket::from).collect(),
                        has_more,
                    }
                } else {
                    for ticket in &mut tickets {
                        truncate_description(&mut ticket.description);
                    }
                    BoardColumn {
                        status: (*status).to_owned(),
                        count,
                        tickets,
                        compact_tickets: Vec::new(),
                        has_more,
                    }
                }
            })
            .collect();

        let total = columns.iter().map(|column| column.count).sum();
        Ok(BoardView {
            view,
            ticket_type,
            columns,
            total,
            limit_per_column: Some(limit),
        })
    }

    /// Free-text search. Terms are OR-joined so partial matches surface,
    /// ranked by how many terms a document hits.
    pub async fn search(
        &mut self,
        query_text: &str,
        filters: SearchFilters,
    ) -> Result<SearchResult, TicketError> {
        let tsquery = query_text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" | ");
        if tsquery.is_empty() {
            return Err(TicketError::validation("search query must not be empty"));
        }
        let limit = filters
            .limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT);

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {TICKET_COLUMNS}, ts_rank(tsv, to_tsquery('english', "
        ));
        query.push_bind(tsquery.clone());
        query.push(format!(
            ")) AS rank FROM {} WHERE tsv @@ to_tsquery('english', ",
            self.sql.ticket_table
        ));
        query.push_bind(tsquery);
        query.push(")");
        if let Some(ticket_type) = filters.ticket_type {
            query.push(" AND type = ");
            query.push_bind(ticket_type.as_str());
        }
        if let Some(status) = &filters.status {
            query.push(" AND status = ");
            query.push_bind(status.clone());
        }
        query.push(" ORDER BY rank DESC, id ASC LIMIT ");
        query.push_bind(limit);

        let rows: Vec<SearchRow> = query
            .build_query_as()
            .fetch_all(&mut *self.conn)
            .await
            .map_err(db_error)?;

        let hits = rows
            .into_iter()
            .map(|row| {
                Ok(SearchHit {
                    ticket: row.ticket.try_into()?,
                    rank: row.rank,
                })
            })
            .collect::<Result<Vec<_>, TicketError>>()?;

        Ok(SearchResult {
            query: query_text.to_owned(),
            total: hits.len() as i64,
            hits,
        })
    }

    pub async fn link_add(
        &mut self,
        source_id: i64,
        target_id: i64,
        link_type: LinkType,
    ) -> Result<LinkRecord, TicketError> {
        if source_id == target_id {
            return Err(TicketError::validation("a ticket cannot link to itself"));
        }
        for ticket_id in [source_id, target_id] {
            let exists: Option<i64> = sqlx::query_scalar(&self.sql.select_ticket_id)
                .bind(ticket_id)
                .fetch_optional(&mut *self.conn)
                .await
                .map_err(db_error)?;
            if exists.is_none() {
                return Err(ticket_not_found(ticket_id));
            }
        }

        let row: LinkRow = sqlx::query_as(&self.sql.insert_link)
            .bind(source_id)
            .bind(target_id)
            .bind(link_type.as_str())
            .bind(epoch_now())
            .fetch_one(&mut *self.conn)
            .await
            .map_err(db_error)?;
        row.try_into()
    }

    pub async fn link_list(&mut self, ticket_id: i64) -> Result<TicketLinks, TicketError> {
        let outgoing = self.links_from(ticket_id).await?;
        let incoming = self.links_to(ticket_id).await?;
        Ok(TicketLinks {
            ticket_id,
            outgoing,
            incoming,
        })
    }

    pub async fn link_remove(&mut self, link_id: i64) -> Result<i64, TicketError> {
        let deleted: Option<i64> = sqlx::query_scalar(&self.sql.delete_link)
            .bind(link_id)
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(db_error)?;
        deleted.ok_or_else(|| TicketError::NotFound(format!("link {link_id} not found")))
    }

    async fn history(&mut self, ticket_id: i64) -> Result<Vec<HistoryEntry>, TicketError> {
        let rows: Vec<HistoryRow> = sqlx::query_as(&self.sql.select_history)
            .bind(ticket_id)
            .fetch_all(&mut *self.conn)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(HistoryEntry::from).collect())
    }

    async fn links_from(&mut self, ticket_id: i64) -> Result<Vec<LinkDetails>, TicketError> {
        let rows: Vec<LinkDetailsRow> = sqlx::query_as(&self.sql.select_outgoing_links)
            .bind(ticket_id)
            .fetch_all(&mut *self.conn)
            .await
            .map_err(db_error)?;
        rows.into_iter().map(LinkDetails::try_from).collect()
    }

    async fn links_to(&mut self, ticket_id: i64) -> Result<Vec<LinkDetails>, TicketError> {
        let rows: Vec<LinkDetailsRow> = sqlx::query_as(&self.sql.select_incoming_links)
            .bind(ticket_id)
            .fetch_all(&mut *self.conn)
            .await
            .map_err(db_error)?;
        rows.into_iter().map(LinkDetails::try_from).collect()
    }

    async fn grouped_counts(
        &mut self,
        column: &str,
        filters: &ListFilters,
    ) -> Result<BTreeMap<String, i64>, TicketError> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {column}, COUNT(*) FROM {}",
            self.sql.ticket_table
        ));
        push_list_filters(&mut query, filters);
        query.push(format!(" GROUP BY {column}"));
        let counts: Vec<(String, i64)> = query
            .build_query_as()
            .fetch_all(&mut *self.conn)
            .await
            .map_err(db_error)?;
        Ok(counts.into_iter().collect())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: i64,
    title: String,
    description: Option<String>,
    #[sqlx(rename = "type")]
    ticket_type: String,
    status: String,
    priority: String,
    assignee: Option<String>,
    reporter: Option<String>,
    tags: Value,
    metadata: Value,
    created_at: f64,
    updated_at: f64,
    closed_at: Option<f64>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = TicketError;

    fn try_from(row: TicketRow) -> Result<Self, TicketError> {
        let ticket_type = parse_type(&row.ticket_type, row.id)?;
        let priority = Priority::parse(&row.priority).ok_or_else(|| {
            TicketError::internal(format!(
                "ticket {} has unknown priority '{}'",
                row.id, row.priority
            ))
        })?;
        let tags: Vec<String> = serde_json::from_value(row.tags)
            .map_err(|err| TicketError::internal(format!("ticket {} tags: {err}", row.id)))?;
        let metadata: Map<String, Value> = serde_json::from_value(row.metadata)
            .map_err(|err| TicketError::internal(format!("ticket {} metadata: {err}", row.id)))?;

        Ok(Ticket {
            id: row.id,
            title: row.title,
            description: row.description,
            ticket_type,
            status: row.status,
            priority,
            assignee: row.assignee,
            reporter: row.reporter,
            tags,
            metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
            closed_at: row.closed_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SearchRow {
    #[sqlx(flatten)]
    ticket: TicketRow,
    rank: f32,
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: i64,
    ticket_id: i64,
    field: String,
    old_value: Option<String>,
    new_value: Option<String>,
    changed_by: Option<String>,
    changed_at: f64,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            ticket_id: row.ticket_id,
            field: row.field,
            old_value: row.old_value,
            new_value: row.new_value,
            changed_by: row.changed_by,
            changed_at: row.changed_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LinkRow {
    id: i64,
    source_id: i64,
    target_id: i64,
    link_type: String,
    created_at: f64,
}

impl TryFrom<LinkRow> for LinkRecord {
    type Error = TicketError;

    fn try_from(row: LinkRow) -> Result<Self, TicketError> {
        let link_type = LinkType::parse(&row.link_type).ok_or_else(|| {
            TicketError::internal(format!(
                "link {} has unknown link type '{}'",
                row.id, row.link_type
            ))
        })?;
        Ok(LinkRecord {
            id: row.id,
            source_id: row.source_id,
            target_id: row.target_id,
            link_type,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LinkDetailsRow {
    #[sqlx(flatten)]
    link: LinkRow,
    counterpart_id: i64,
    counterpart_title: String,
    counterpart_type: String,
    counterpart_status: String,
}

impl TryFrom<LinkDetailsRow> for LinkDetails {
    type Error = TicketError;

    fn try_from(row: LinkDetailsRow) -> Result<Self, TicketError> {
        let ticket_type = parse_type(&row.counterpart_type, row.counterpart_id)?;
        Ok(LinkDetails {
            link: row.link.try_into()?,
            counterpart: LinkCounterpart {
                id: row.counterpart_id,
                title: row.counterpart_title,
                ticket_type,
                status: row.counterpart_status,
            },
        })
    }
}

fn push_clause<'args>(has_clause: &mut bool, query: &mut QueryBuilder<'args, Postgres>) {
    if *has_clause {
        query.push(" AND ");
    } else {
        *has_clause = true;
        query.push(" WHERE ");
    }
}

fn push_list_filters<'args>(query: &mut QueryBuilder<'args, Postgres>, filters: &ListFilters) {
    let mut has_clause = false;

    if let Some(ticket_type) = filters.ticket_type {
        push_clause(&mut has_clause, query);
        query.push("type = ");
        query.push_bind(ticket_type.as_str());
    }
    if let Some(status) = &filters.status {
        push_clause(&mut has_clause, query);
        query.push("status = ");
        query.push_bind(status.clone());
    }
    if let Some(priority) = filters.priority {
        push_clause(&mut has_clause, query);
        query.push("priority = ");
        query.push_bind(priority.as_str());
    }
    if let Some(assignee) = &filters.assignee {
        push_clause(&mut has_clause, query);
        query.push("assignee = ");
        query.push_bind(assignee.clone());
    }
    if let Some(tags) = &filters.tags {
        // Double containment is set equality over the stored array.
        let tags = tags_value(tags);
        push_clause(&mut has_clause, query);
        query.push("tags @> ");
        query.push_bind(tags.clone());
        query.push(" AND tags <@ ");
        query.push_bind(tags);
    }
}

fn truncate_description(description: &mut Option<String>) {
    if let Some(text) = description {
        if text.chars().count() > BOARD_DESCRIPTION_MAX_CHARS {
            let mut truncated: String = text.chars().take(BOARD_DESCRIPTION_MAX_CHARS).collect();
            truncated.push_str("...");
            *text = truncated;
        }
    }
}

fn tags_value(tags: &[String]) -> Value {
    Value::Array(tags.iter().cloned().map(Value::String).collect())
}

fn json_text(value: &Value) -> Result<String, TicketError> {
    serde_json::to_string(value).map_err(TicketError::internal)
}

fn parse_type(value: &str, ticket_id: i64) -> Result<TicketType, TicketError> {
    TicketType::parse(value).ok_or_else(|| {
        TicketError::internal(format!(
            "ticket {ticket_id} has unknown type '{value}'"
        ))
    })
}

fn ticket_not_found(ticket_id: i64) -> TicketError {
    TicketError::NotFound(format!("ticket {ticket_id} not found"))
}

fn epoch_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

fn db_error(error: sqlx::Error) -> TicketError {
    if let Some(db) = error.as_database_error() {
        match db.code().as_deref() {
            Some("23505") => return TicketError::Conflict(db.message().to_owned()),
            Some("23503") => return TicketError::NotFound(db.message().to_owned()),
            Some("23514") => return TicketError::Validation(db.message().to_owned()),
            _ => {}
        }
    }
    TicketError::Internal(error.to_string())
}
