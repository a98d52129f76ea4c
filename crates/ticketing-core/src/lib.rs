pub mod error;
pub mod migrations;
pub mod models;
pub mod service;
pub mod state_machine;
mod statements;

pub use error::TicketError;
pub use models::{
    BoardColumn, BoardMode, BoardView, CompactTicket, HistoryEntry, LinkCounterpart, LinkDetails,
    LinkRecord, LinkType, ListFilters, ListPage, Priority, SearchFilters, SearchHit, SearchResult,
    Ticket, TicketCreate, TicketDetails, TicketLinks, TicketType, TicketUpdate,
};
pub use service::TicketService;
