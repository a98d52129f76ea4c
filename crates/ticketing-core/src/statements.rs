use crate::error::TicketError;
use crate::migrations;

/// Ticket columns in row-mapping order. `tsv` is deliberately excluded.
pub(crate) const TICKET_COLUMNS: &str = "id, title, description, type, status, priority, \
     assignee, reporter, tags, metadata, created_at, updated_at, closed_at";

/// Fixed statements for one schema, rendered once when a service binds.
/// Everything request-scoped goes through bound parameters.
#[derive(Debug, Clone)]
pub(crate) struct Statements {
    pub schema: String,
    pub ticket_table: String,
    pub select_ticket: String,
    pub select_ticket_for_update: String,
    pub select_ticket_id: String,
    pub select_type_and_status: String,
    pub insert_ticket: String,
    pub update_status: String,
    pub insert_history: String,
    pub select_history: String,
    pub insert_link: String,
    pub select_outgoing_links: String,
    pub select_incoming_links: String,
    pub delete_link: String,
}

impl Statements {
    pub fn render(schema: &str) -> Result<Self, TicketError> {
        migrations::validate_schema_name(schema)?;
        let ticket = format!("{schema}.ticket");
        let history = format!("{schema}.ticket_history");
        let link = format!("{schema}.ticket_link");

        let link_columns =
            "l.id, l.source_id, l.target_id, l.link_type, l.created_at, \
             t.id AS counterpart_id, t.title AS counterpart_title, \
             t.type AS counterpart_type, t.status AS counterpart_status";

        Ok(Self {
            select_ticket: format!("SELECT {TICKET_COLUMNS} FROM {ticket} WHERE id = $1"),
            select_ticket_for_update: format!(
                "SELECT {TICKET_COLUMNS} FROM {ticket} WHERE id = $1 FOR UPDATE"
            ),
            select_ticket_id: format!("SELECT id FROM {ticket} WHERE id = $1"),
            select_type_and_status: format!("SELECT type, status FROM {ticket} WHERE id = $1"),
            insert_ticket: format!(
                "INSERT INTO {ticket} \
                 (title, description, type, status, priority, assignee, reporter, \
                  tags, metadata, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
                 RETURNING {TICKET_COLUMNS}"
            ),
            update_status: format!(
                "UPDATE {ticket} SET status = $2, updated_at = $3, closed_at = $4 \
                 WHERE id = $1 RETURNING {TICKET_COLUMNS}"
            ),
            insert_history: format!(
                "INSERT INTO {history} \
                 (ticket_id, field, old_value, new_value, changed_by, changed_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)"
            ),
            select_history: format!(
                "SELECT id, ticket_id, field, old_value, new_value, changed_by, changed_at \
                 FROM {history} WHERE ticket_id = $1 ORDER BY changed_at ASC, id ASC"
            ),
            insert_link: format!(
                "INSERT INTO {link} (source_id, target_id, link_type, created_at) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING id, source_id, target_id, link_type, created_at"
            ),
            select_outgoing_links: format!(
                "SELECT {link_columns} FROM {link} l \
                 JOIN {ticket} t ON t.id = l.target_id \
                 WHERE l.source_id = $1 ORDER BY l.id ASC"
            ),
            select_incoming_links: format!(
                "SELECT {link_columns} FROM {link} l \
                 JOIN {ticket} t ON t.id = l.source_id \
                 WHERE l.target_id = $1 ORDER BY l.id ASC"
            ),
            delete_link: format!("DELETE FROM {link} WHERE id = $1 RETURNING id"),
            schema: schema.to_owned(),
            ticket_table: ticket,
        })
    }
}
