use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::Value;
use sqlx::pool::PoolConnection;
use sqlx::Postgres;
use ticketing_core::TicketError;

/// Everything the enclosing host supplies: scoped connections, project
/// validation, and project-to-schema resolution. One implementation is
/// injected at registration; the plugin holds no state of its own.
#[async_trait]
pub trait ProjectHost: Send + Sync {
    /// A connection scoped to the request. Dropping it releases it on every
    /// exit path.
    async fn acquire(
        &self,
        project: Option<&str>,
    ) -> Result<PoolConnection<Postgres>, TicketError>;

    /// `None` means the project is valid; `Some(message)` short-circuits the
    /// facade with a validation error.
    fn check_project(&self, project: Option<&str>) -> Option<String>;

    fn project_name(&self, project: Option<&str>) -> Result<String, TicketError>;

    fn resolve_schema(&self, project_name: &str) -> String {
        project_name.to_owned()
    }
}

/// One named tool on the host's RPC dispatcher. Calls take and return plain
/// JSON values; errors come back as `{"error", "message"}` envelopes rather
/// than propagating.
#[async_trait]
pub trait RpcTool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn call(&self, args: Value) -> Value;
}

pub trait RpcHost {
    fn bind_tool(&mut self, tool: Arc<dyn RpcTool>);
}

pub trait HttpHost {
    fn mount(&mut self, router: Router);
}
