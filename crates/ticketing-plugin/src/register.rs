use std::sync::Arc;

use ticketing_core::migrations::{
    self, MigrationRecord, DEFAULT_MIGRATION_START_ID,
};
use ticketing_core::TicketError;
use tracing::info;

use crate::adapters::{HttpHost, ProjectHost, RpcHost};
use crate::http::ticket_router;
use crate::rpc::{TicketBoardTool, TicketLinkTool, TicketSearchTool, TicketTool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterConfig {
    /// First migration id; the host allocates the block.
    pub migration_start_id: u32,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            migration_start_id: DEFAULT_MIGRATION_START_ID,
        }
    }
}

/// What the host gets back: the migration block to append to its runner, and
/// the same DDL as a single script for project schemas created after boot.
pub struct Registration {
    pub migrations: Vec<MigrationRecord>,
    pub schema_sql: fn(&str) -> Result<String, TicketError>,
}

/// One-call registration: binds the four RPC tools, mounts the ticket
/// routes, and hands back the migration contract. Synchronous, and
/// side-effect-free beyond the two bindings.
pub fn register(
    rpc_host: &mut dyn RpcHost,
    http_host: &mut dyn HttpHost,
    project_host: Arc<dyn ProjectHost>,
    config: RegisterConfig,
) -> Registration {
    rpc_host.bind_tool(Arc::new(TicketTool::new(Arc::clone(&project_host))));
    rpc_host.bind_tool(Arc::new(TicketBoardTool::new(Arc::clone(&project_host))));
    rpc_host.bind_tool(Arc::new(TicketSearchTool::new(Arc::clone(&project_host))));
    rpc_host.bind_tool(Arc::new(TicketLinkTool::new(Arc::clone(&project_host))));
    info!("ticketing: bound 4 RPC tools");

    http_host.mount(ticket_router(project_host));
    info!("ticketing: mounted ticket routes");

    Registration {
        migrations: migrations::ticket_migrations(config.migration_start_id),
        schema_sql: migrations::schema_sql,
    }
}
