use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::Postgres;
use ticketing_core::TicketError;
use ticketing_plugin::ProjectHost;

/// A host with no database behind it. `acquire` always fails, which makes
/// the dispatch order observable: anything rejected before the connection is
/// opened comes back as a validation error, anything after as internal.
pub struct StubHost {
    pub reject_with: Option<String>,
}

impl StubHost {
    pub fn accepting() -> Self {
        Self { reject_with: None }
    }

    pub fn rejecting(message: &str) -> Self {
        Self {
            reject_with: Some(message.to_owned()),
        }
    }
}

#[async_trait]
impl ProjectHost for StubHost {
    async fn acquire(
        &self,
        _project: Option<&str>,
    ) -> Result<PoolConnection<Postgres>, TicketError> {
        Err(TicketError::Internal(
            "no database behind the stub host".to_owned(),
        ))
    }

    fn check_project(&self, _project: Option<&str>) -> Option<String> {
        self.reject_with.clone()
    }

    fn project_name(&self, project: Option<&str>) -> Result<String, TicketError> {
        Ok(project.unwrap_or("demo").to_owned())
    }
}
