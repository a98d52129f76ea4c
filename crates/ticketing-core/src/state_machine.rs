use crate::error::TicketError;
use crate::models::TicketType;

/// A per-type transition graph. Edge target order is meaningful: `close`
/// resolves to the first terminal status among the allowed targets.
#[derive(Debug)]
pub struct StateMachine {
    pub initial: &'static str,
    pub terminal: &'static [&'static str],
    pub edges: &'static [(&'static str, &'static [&'static str])],
}

const TASK: StateMachine = StateMachine {
    initial: "backlog",
    terminal: &["done", "cancelled"],
    edges: &[
        ("backlog", &["in_progress", "cancelled"]),
        ("in_progress", &["done", "cancelled"]),
        ("done", &[]),
        ("cancelled", &[]),
    ],
};

const BUG: StateMachine = StateMachine {
    initial: "triage",
    terminal: &["resolved", "wont_fix"],
    edges: &[
        ("triage", &["confirmed", "wont_fix"]),
        ("confirmed", &["in_progress", "wont_fix"]),
        ("in_progress", &["resolved", "wont_fix"]),
        ("resolved", &[]),
        ("wont_fix", &[]),
    ],
};

const FEATURE: StateMachine = StateMachine {
    initial: "proposed",
    terminal: &["shipped", "rejected"],
    edges: &[
        ("proposed", &["approved", "rejected"]),
        ("approved", &["in_progress", "rejected"]),
        ("in_progress", &["shipped", "rejected"]),
        ("shipped", &[]),
        ("rejected", &[]),
    ],
};

// The only terminal with an exit: deferred decisions can be reopened.
const DECISION: StateMachine = StateMachine {
    initial: "open",
    terminal: &["decided", "deferred"],
    edges: &[
        ("open", &["decided", "deferred"]),
        ("decided", &[]),
        ("deferred", &["open"]),
    ],
};

pub fn machine(ticket_type: TicketType) -> &'static StateMachine {
    match ticket_type {
        TicketType::Task => &TASK,
        TicketType::Bug => &BUG,
        TicketType::Feature => &FEATURE,
        TicketType::Decision => &DECISION,
    }
}

impl StateMachine {
    pub fn statuses(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.edges.iter().map(|(status, _)| *status)
    }

    pub fn is_status(&self, status: &str) -> bool {
        self.statuses().any(|known| known == status)
    }

    pub fn is_terminal(&self, status: &str) -> bool {
        self.terminal.contains(&status)
    }

    pub fn allowed_targets(&self, status: &str) -> Option<&'static [&'static str]> {
        self.edges
            .iter()
            .find(|(from, _)| *from == status)
            .map(|(_, targets)| *targets)
    }
}

pub fn initial_status(ticket_type: TicketType) -> &'static str {
    machine(ticket_type).initial
}

pub fn terminal_statuses(ticket_type: TicketType) -> &'static [&'static str] {
    machine(ticket_type).terminal
}

pub fn is_terminal(ticket_type: TicketType, status: &str) -> bool {
    machine(ticket_type).is_terminal(status)
}

/// Statuses of one type, in declaration order (used as board column order).
pub fn declared_statuses(ticket_type: TicketType) -> Vec<&'static str> {
    machine(ticket_type).statuses().collect()
}

/// First-occurrence union of every type's statuses, in declaration order.
pub fn statuses_across_all_types() -> Vec<&'static str> {
    let mut seen = Vec::new();
    for ticket_type in TicketType::ALL {
        for status in machine(ticket_type).statuses() {
            if !seen.contains(&status) {
                seen.push(status);
            }
        }
    }
    seen
}

/// Accept exactly the listed edges; no self-edges, no skipping ahead.
pub fn validate_transition(
    ticket_type: TicketType,
    from: &str,
    to: &str,
) -> Result<(), TicketError> {
    let machine = machine(ticket_type);
    let Some(targets) = machine.allowed_targets(from) else {
        return Err(TicketError::Validation(format!(
            "'{from}' is not a valid status for type '{ticket_type}'"
        )));
    };
    if !targets.contains(&to) {
        return Err(TicketError::InvalidTransition {
            ticket_type,
            from: from.to_owned(),
            to: to.to_owned(),
            allowed: targets.to_vec(),
        });
    }
    Ok(())
}

/// The terminal status one edge away from `from`, honoring the per-type
/// preference order encoded in the edge lists.
pub fn close_target(ticket_type: TicketType, from: &str) -> Result<&'static str, TicketError> {
    let machine = machine(ticket_type);
    let Some(targets) = machine.allowed_targets(from) else {
        return Err(TicketError::Validation(format!(
            "'{from}' is not a valid status for type '{ticket_type}'"
        )));
    };
    targets
        .iter()
        .copied()
        .find(|target| machine.is_terminal(target))
        .ok_or_else(|| TicketError::NotClosable {
            ticket_type,
            status: from.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_statuses_match_per_type() {
        assert_eq!(initial_status(TicketType::Task), "backlog");
        assert_eq!(initial_status(TicketType::Bug), "triage");
        assert_eq!(initial_status(TicketType::Feature), "proposed");
        assert_eq!(initial_status(TicketType::Decision), "open");
    }

    #[test]
    fn every_terminal_is_a_declared_status() {
        for ticket_type in TicketType::ALL {
            let machine = machine(ticket_type);
            for terminal in machine.terminal {
                assert!(machine.is_status(terminal), "{terminal} missing from edges");
            }
            assert!(machine.is_status(machine.initial));
        }
    }

    #[test]
    fn task_happy_path_is_accepted() {
        validate_transition(TicketType::Task, "backlog", "in_progress").expect("start task");
        validate_transition(TicketType::Task, "in_progress", "done").expect("finish task");
    }

    #[test]
    fn skipping_ahead_is_rejected() {
        let error = validate_transition(TicketType::Task, "backlog", "done")
            .expect_err("backlog cannot jump to done");
        assert_eq!(error.kind(), "InvalidTransition");

        let error = validate_transition(TicketType::Bug, "triage", "in_progress")
            .expect_err("bugs must be confirmed first");
        assert_eq!(error.kind(), "InvalidTransition");
    }

    #[test]
    fn self_transitions_are_rejected() {
        for ticket_type in TicketType::ALL {
            for status in declared_statuses(ticket_type) {
                let result = validate_transition(ticket_type, status, status);
                assert!(result.is_err(), "{ticket_type}:{status} allowed a self-edge");
            }
        }
    }

    #[test]
    fn terminal_statuses_are_absorbing_except_deferred() {
        assert!(validate_transition(TicketType::Task, "done", "backlog").is_err());
        assert!(validate_transition(TicketType::Bug, "wont_fix", "triage").is_err());
        assert!(validate_transition(TicketType::Feature, "shipped", "proposed").is_err());
        assert!(validate_transition(TicketType::Decision, "decided", "open").is_err());
        validate_transition(TicketType::Decision, "deferred", "open").expect("reopen edge");
    }

    #[test]
    fn unknown_statuses_are_a_validation_error() {
        let error = validate_transition(TicketType::Task, "limbo", "done")
            .expect_err("unknown from-status");
        assert_eq!(error.kind(), "ValidationError");

        let error =
            validate_transition(TicketType::Task, "backlog", "limbo").expect_err("unknown target");
        assert_eq!(error.kind(), "InvalidTransition");
    }

    #[test]
    fn close_prefers_the_positive_terminal() {
        assert_eq!(
            close_target(TicketType::Task, "in_progress").expect("close task"),
            "done"
        );
        assert_eq!(
            close_target(TicketType::Bug, "in_progress").expect("close bug"),
            "resolved"
        );
        assert_eq!(
            close_target(TicketType::Feature, "in_progress").expect("close feature"),
            "shipped"
        );
        assert_eq!(
            close_target(TicketType::Decision, "open").expect("close decision"),
            "decided"
        );
    }

    #[test]
    fn close_falls_back_to_the_reachable_terminal() {
        assert_eq!(
            close_target(TicketType::Task, "backlog").expect("close from backlog"),
            "cancelled"
        );
        assert_eq!(
            close_target(TicketType::Bug, "triage").expect("close from triage"),
            "wont_fix"
        );
        assert_eq!(
            close_target(TicketType::Feature, "proposed").expect("close from proposed"),
            "rejected"
        );
    }

    #[test]
    fn close_fails_where_no_terminal_is_one_step_away() {
        let error = close_target(TicketType::Decision, "deferred")
            .expect_err("deferred only reopens");
        assert_eq!(error.kind(), "InvalidTransition");

        for ticket_type in TicketType::ALL {
            for terminal in terminal_statuses(ticket_type) {
                if *terminal == "deferred" {
                    continue;
                }
                let result = close_target(ticket_type, terminal);
                assert!(result.is_err(), "{ticket_type}:{terminal} closed twice");
            }
        }
    }

    #[test]
    fn declared_order_starts_at_initial() {
        for ticket_type in TicketType::ALL {
            let statuses = declared_statuses(ticket_type);
            assert_eq!(statuses.first().copied(), Some(initial_status(ticket_type)));
        }
    }

    #[test]
    fn union_deduplicates_shared_statuses() {
        let all = statuses_across_all_types();
        let in_progress = all.iter().filter(|status| **status == "in_progress").count();
        assert_eq!(in_progress, 1);
        assert_eq!(all.len(), 15);
        assert!(all.contains(&"backlog"));
        assert!(all.contains(&"deferred"));
    }
}
