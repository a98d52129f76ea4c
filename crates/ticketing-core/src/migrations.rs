use serde::Serialize;

use crate::error::TicketError;

/// First migration id when the host does not supply its own offset.
pub const DEFAULT_MIGRATION_START_ID: u32 = 26;

/// One schema migration, in the shape the host's migration runner consumes.
/// The DDL keeps its `{schema}` markers; the runner substitutes per project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRecord {
    pub id: u32,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub migration_type: &'static str,
    pub table: &'static str,
    pub schema: &'static str,
    pub spec: MigrationSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationSpec {
    pub create_if_not_exists: bool,
    pub sql: &'static str,
}

const TICKET_TABLE_SQL: &str = "\
CREATE TABLE IF NOT EXISTS {schema}.ticket (
    id BIGSERIAL PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    type TEXT NOT NULL,
    status TEXT NOT NULL,
    priority TEXT NOT NULL DEFAULT 'medium',
    assignee TEXT,
    reporter TEXT,
    tags JSONB NOT NULL DEFAULT '[]'::jsonb,
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at DOUBLE PRECISION NOT NULL,
    updated_at DOUBLE PRECISION NOT NULL,
    closed_at DOUBLE PRECISION
);
CREATE INDEX IF NOT EXISTS idx_ticket_type ON {schema}.ticket(type);
CREATE INDEX IF NOT EXISTS idx_ticket_status ON {schema}.ticket(status);
CREATE INDEX IF NOT EXISTS idx_ticket_priority ON {schema}.ticket(priority);
CREATE INDEX IF NOT EXISTS idx_ticket_assignee ON {schema}.ticket(assignee)
    WHERE assignee IS NOT NULL;
";

const TICKET_HISTORY_TABLE_SQL: &str = "\
CREATE TABLE IF NOT EXISTS {schema}.ticket_history (
    id BIGSERIAL PRIMARY KEY,
    ticket_id BIGINT NOT NULL REFERENCES {schema}.ticket(id) ON DELETE CASCADE,
    field TEXT NOT NULL,
    old_value TEXT,
    new_value TEXT,
    changed_by TEXT,
    changed_at DOUBLE PRECISION NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_ticket_history_ticket ON {schema}.ticket_history(ticket_id);
";

const TICKET_LINK_TABLE_SQL: &str = "\
CREATE TABLE IF NOT EXISTS {schema}.ticket_link (
    id BIGSERIAL PRIMARY KEY,
    source_id BIGINT NOT NULL REFERENCES {schema}.ticket(id) ON DELETE CASCADE,
    target_id BIGINT NOT NULL REFERENCES {schema}.ticket(id) ON DELETE CASCADE,
    link_type TEXT NOT NULL,
    created_at DOUBLE PRECISION NOT NULL,
    CHECK (source_id <> target_id),
    UNIQUE (source_id, target_id, link_type)
);
CREATE INDEX IF NOT EXISTS idx_ticket_link_source ON {schema}.ticket_link(source_id);
CREATE INDEX IF NOT EXISTS idx_ticket_link_target ON {schema}.ticket_link(target_id);
";

const TICKET_TSV_TRIGGER_SQL: &str = "\
ALTER TABLE {schema}.ticket ADD COLUMN IF NOT EXISTS tsv tsvector;

CREATE OR REPLACE FUNCTION {schema}.ticket_tsv_refresh()
RETURNS trigger AS $$
BEGIN
    NEW.tsv := to_tsvector(
        'english',
        coalesce(NEW.title, '') || ' ' || coalesce(NEW.description, '')
    );
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

DROP TRIGGER IF EXISTS ticket_tsv_refresh ON {schema}.ticket;
CREATE TRIGGER ticket_tsv_refresh
    BEFORE INSERT OR UPDATE OF title, description ON {schema}.ticket
    FOR EACH ROW EXECUTE FUNCTION {schema}.ticket_tsv_refresh();
";

const TICKET_TSV_INDEX_SQL: &str = "\
CREATE INDEX IF NOT EXISTS idx_ticket_tsv ON {schema}.ticket USING gin (tsv);
";

/// The five ticketing migrations with contiguous ids from `start_id`.
pub fn ticket_migrations(start_id: u32) -> Vec<MigrationRecord> {
    let record = |offset: u32, description, table, sql| MigrationRecord {
        id: start_id + offset,
        description,
        migration_type: "custom",
        table,
        schema: "project",
        spec: MigrationSpec {
            create_if_not_exists: true,
            sql,
        },
    };

    vec![
        record(0, "create_ticket_table", "ticket", TICKET_TABLE_SQL),
        record(
            1,
            "create_ticket_history_table",
            "ticket_history",
            TICKET_HISTORY_TABLE_SQL,
        ),
        record(
            2,
            "create_ticket_link_table",
            "ticket_link",
            TICKET_LINK_TABLE_SQL,
        ),
        record(3, "add_ticket_tsv_trigger", "ticket", TICKET_TSV_TRIGGER_SQL),
        record(4, "add_ticket_tsv_index", "ticket", TICKET_TSV_INDEX_SQL),
    ]
}

/// Schema names come from the host's resolver, never from request data, but
/// they still have to be plain identifiers before they are spliced into SQL.
pub fn validate_schema_name(schema: &str) -> Result<(), TicketError> {
    let mut chars = schema.chars();
    let valid_first = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_first || !valid_rest || schema.len() > 63 {
        return Err(TicketError::Validation(format!(
            "'{schema}' is not a valid schema name"
        )));
    }
    Ok(())
}

/// The full DDL as one script for a project schema created after boot.
pub fn schema_sql(schema: &str) -> Result<String, TicketError> {
    validate_schema_name(schema)?;
    let script = [
        TICKET_TABLE_SQL,
        TICKET_HISTORY_TABLE_SQL,
        TICKET_LINK_TABLE_SQL,
        TICKET_TSV_TRIGGER_SQL,
        TICKET_TSV_INDEX_SQL,
    ]
    .join("\n");
    Ok(script.replace("{schema}", schema))
}
