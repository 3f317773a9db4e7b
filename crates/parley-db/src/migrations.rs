use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        // Cross-table references are ids only: readers tolerate rows whose
        // parent has vanished.
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                image       TEXT,
                created_at  INTEGER NOT NULL
            );

            CREATE TABLE workspaces (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                user_id     TEXT NOT NULL,
                join_code   TEXT NOT NULL,
                created_at  INTEGER NOT NULL
            );

            CREATE TABLE members (
                id            TEXT PRIMARY KEY,
                workspace_id  TEXT NOT NULL,
                user_id       TEXT NOT NULL,
                role          TEXT NOT NULL CHECK (role IN ('admin', 'member')),
                created_at    INTEGER NOT NULL,
                UNIQUE (workspace_id, user_id)
            );

            CREATE INDEX idx_members_user ON members(user_id);

            CREATE TABLE channels (
                id            TEXT PRIMARY KEY,
                workspace_id  TEXT NOT NULL,
                name          TEXT NOT NULL,
                created_at    INTEGER NOT NULL
            );

            CREATE INDEX idx_channels_workspace ON channels(workspace_id);

            CREATE TABLE conversations (
                id             TEXT PRIMARY KEY,
                workspace_id   TEXT NOT NULL,
                member_one_id  TEXT NOT NULL,
                member_two_id  TEXT NOT NULL,
                created_at     INTEGER NOT NULL,
                CHECK (member_one_id <= member_two_id),
                UNIQUE (workspace_id, member_one_id, member_two_id)
            );

            CREATE TABLE messages (
                id                 TEXT PRIMARY KEY,
                workspace_id       TEXT NOT NULL,
                channel_id         TEXT,
                conversation_id    TEXT,
                parent_message_id  TEXT,
                member_id          TEXT NOT NULL,
                body               TEXT NOT NULL,
                image              TEXT,
                created_at         INTEGER NOT NULL,
                updated_at         INTEGER,
                CHECK ((channel_id IS NULL) <> (conversation_id IS NULL))
            );

            CREATE INDEX idx_messages_channel
                ON messages(channel_id, parent_message_id, created_at);
            CREATE INDEX idx_messages_conversation
                ON messages(conversation_id, parent_message_id, created_at);
            CREATE INDEX idx_messages_parent ON messages(parent_message_id, created_at);
            CREATE INDEX idx_messages_workspace ON messages(workspace_id);
            CREATE INDEX idx_messages_member ON messages(member_id);

            CREATE TABLE reactions (
                id            TEXT PRIMARY KEY,
                workspace_id  TEXT NOT NULL,
                message_id    TEXT NOT NULL,
                member_id     TEXT NOT NULL,
                value         TEXT NOT NULL,
                created_at    INTEGER NOT NULL,
                UNIQUE (message_id, member_id, value)
            );

            CREATE INDEX idx_reactions_message ON reactions(message_id);
            CREATE INDEX idx_reactions_workspace ON reactions(workspace_id);

            CREATE TABLE files (
                id           TEXT PRIMARY KEY,
                uploader_id  TEXT NOT NULL,
                size         INTEGER NOT NULL,
                created_at   INTEGER NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
