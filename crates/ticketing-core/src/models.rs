use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketType {
    Task,
    Bug,
    Feature,
    Decision,
}

impl TicketType {
    pub const ALL: [TicketType; 4] = [Self::Task, Self::Bug, Self::Feature, Self::Decision];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Bug => "bug",
            Self::Feature => "feature",
            Self::Decision => "decision",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "task" => Some(Self::Task),
            "bug" => Some(Self::Bug),
            "feature" => Some(Self::Feature),
            "decision" => Some(Self::Decision),
            _ => None,
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Blocks,
    Parent,
    #[default]
    Related,
    Duplicate,
}

impl LinkType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::Parent => "parent",
            Self::Related => "related",
            Self::Duplicate => "duplicate",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "blocks" => Some(Self::Blocks),
            "parent" => Some(Self::Parent),
            "related" => Some(Self::Related),
            "duplicate" => Some(Self::Duplicate),
            _ => None,
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardMode {
    #[default]
    Kanban,
    Summary,
    Compact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ticket_type: TicketType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub reporter: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Field-level update. `status` and `type` are deliberately absent; unknown
/// keys are rejected so a status change cannot slip past the transition path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub reporter: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListFilters {
    #[serde(rename = "type", default)]
    pub ticket_type: Option<TicketType>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(rename = "type", default)]
    pub ticket_type: Option<TicketType>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ticket_type: TicketType,
    pub status: String,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub tags: Vec<String>,
    pub metadata: Map<String, Value>,
    pub created_at: f64,
    pub updated_at: f64,
    pub closed_at: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub ticket_id: i64,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: Option<String>,
    pub changed_at: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketDetails {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub history: Vec<HistoryEntry>,
    pub outgoing: Vec<LinkDetails>,
    pub incoming: Vec<LinkDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub id: i64,
    pub source_id: i64,
    pub target_id: i64,
    pub link_type: LinkType,
    pub created_at: f64,
}

/// The ticket on the other end of a link, as seen from the queried ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkCounterpart {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub ticket_type: TicketType,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDetails {
    #[serde(flatten)]
    pub link: LinkRecord,
    pub counterpart: LinkCounterpart,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketLinks {
    pub ticket_id: i64,
    pub outgoing: Vec<LinkDetails>,
    pub incoming: Vec<LinkDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPage {
    pub tickets: Vec<Ticket>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
    pub by_status: BTreeMap<String, i64>,
    pub by_type: BTreeMap<String, i64>,
}

/// The id/title/type/priority sliver of a ticket, for board responses that
/// have to stay small.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactTicket {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub ticket_type: TicketType,
    pub priority: Priority,
}

impl From<Ticket> for CompactTicket {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            title: ticket.title,
            ticket_type: ticket.ticket_type,
            priority: ticket.priority,
        }
    }
}

/// `count` is the full column size; `tickets` (or `compact_tickets` in the
/// compact view) holds at most the per-column limit, with `has_more` set
/// when rows were cut.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardColumn {
    pub status: String,
    pub count: i64,
    pub tickets: Vec<Ticket>,
    pub compact_tickets: Vec<CompactTicket>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardView {
    pub view: BoardMode,
    #[serde(rename = "type")]
    pub ticket_type: Option<TicketType>,
    pub columns: Vec<BoardColumn>,
    pub total: i64,
    pub limit_per_column: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub ticket: Ticket,
    pub rank: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub total: i64,
}
