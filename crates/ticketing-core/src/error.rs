use thiserror::Error;

use crate::models::TicketType;

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(
        "invalid transition: {ticket_type} cannot move from '{from}' to '{to}' (allowed: {allowed:?})"
    )]
    InvalidTransition {
        ticket_type: TicketType,
        from: String,
        to: String,
        allowed: Vec<&'static str>,
    },
    #[error("invalid transition: {ticket_type} at '{status}' has no single-step terminal status")]
    NotClosable {
        ticket_type: TicketType,
        status: String,
    },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl TicketError {
    /// Stable error kind names shared by the RPC and HTTP surfaces.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::NotFound(_) => "NotFound",
            Self::InvalidTransition { .. } | Self::NotClosable { .. } => "InvalidTransition",
            Self::Conflict(_) => "Conflict",
            Self::Internal(_) => "InternalError",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn internal(message: impl std::fmt::Display) -> Self {
        Self::Internal(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(
            TicketError::Validation("bad".to_owned()).kind(),
            "ValidationError"
        );
        assert_eq!(
            TicketError::NotFound("ticket 7".to_owned()).kind(),
            "NotFound"
        );
        assert_eq!(
            TicketError::InvalidTransition {
                ticket_type: TicketType::Task,
                from: "backlog".to_owned(),
                to: "done".to_owned(),
                allowed: vec!["in_progress", "cancelled"],
            }
            .kind(),
            "InvalidTransition"
        );
        assert_eq!(
            TicketError::NotClosable {
                ticket_type: TicketType::Decision,
                status: "deferred".to_owned(),
            }
            .kind(),
            "InvalidTransition"
        );
        assert_eq!(
            TicketError::Conflict("duplicate link".to_owned()).kind(),
            "Conflict"
        );
        assert_eq!(
            TicketError::Internal("boom".to_owned()).kind(),
            "InternalError"
        );
    }

    #[test]
    fn messages_carry_the_detail() {
        let error = TicketError::InvalidTransition {
            ticket_type: TicketType::Bug,
            from: "triage".to_owned(),
            to: "in_progress".to_owned(),
            allowed: vec!["confirmed", "wont_fix"],
        };
        let message = error.to_string();
        assert!(message.contains("bug"));
        assert!(message.contains("triage"));
        assert!(message.contains("confirmed"));
    }
}
