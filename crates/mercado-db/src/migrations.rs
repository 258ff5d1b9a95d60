use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const ESCORT_CATEGORY_ID: &str = "00000000-0000-0000-0000-000000000001";
pub const REAL_ESTATE_CATEGORY_ID: &str = "00000000-0000-0000-0000-000000000002";
pub const VEHICLES_CATEGORY_ID: &str = "00000000-0000-0000-0000-000000000003";

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS profiles (
            id          TEXT PRIMARY KEY REFERENCES users(id),
            name        TEXT,
            phone       TEXT,
            avatar_url  TEXT,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS categories (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            slug        TEXT NOT NULL UNIQUE,
            kind        TEXT NOT NULL CHECK (kind IN ('escort', 'real_estate', 'general'))
        );

        CREATE TABLE IF NOT EXISTS listings (
            id              TEXT PRIMARY KEY,
            title           TEXT NOT NULL,
            description     TEXT,
            price           REAL,
            category_id     TEXT NOT NULL REFERENCES categories(id),
            listing_type    TEXT,
            city            TEXT,
            state           TEXT,
            status          TEXT NOT NULL DEFAULT 'draft'
                            CHECK (status IN ('draft', 'active', 'inactive')),
            owner_id        TEXT NOT NULL REFERENCES users(id),
            attributes      TEXT NOT NULL DEFAULT '{}',
            promotion       TEXT NOT NULL DEFAULT '{}',
            images          TEXT NOT NULL DEFAULT '[]',
            views           INTEGER NOT NULL DEFAULT 0,
            whatsapp_clicks INTEGER NOT NULL DEFAULT 0,
            email_clicks    INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_listings_owner
            ON listings(owner_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_listings_search
            ON listings(status, category_id, created_at);

        CREATE TABLE IF NOT EXISTS favorites (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            listing_id  TEXT NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            UNIQUE(user_id, listing_id)
        );

        CREATE TABLE IF NOT EXISTS conversations (
            id          TEXT PRIMARY KEY,
            listing_id  TEXT NOT NULL REFERENCES listings(id),
            buyer_id    TEXT NOT NULL REFERENCES users(id),
            seller_id   TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL,
            UNIQUE(listing_id, buyer_id)
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_seller
            ON conversations(seller_id);

        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL REFERENCES conversations(id),
            sender_id       TEXT NOT NULL REFERENCES users(id),
            body            TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            read_at         TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, created_at);

        -- Seed the category tree
        INSERT OR IGNORE INTO categories (id, name, slug, kind) VALUES
            ('00000000-0000-0000-0000-000000000001', 'Acompanhantes', 'acompanhantes', 'escort'),
            ('00000000-0000-0000-0000-000000000002', 'Imóveis', 'alugar-casa-apartamento', 'real_estate'),
            ('00000000-0000-0000-0000-000000000003', 'Veículos', 'veiculos', 'general'),
            ('00000000-0000-0000-0000-000000000004', 'Empregos', 'empregos', 'general'),
            ('00000000-0000-0000-0000-000000000005', 'Serviços', 'servicos', 'general'),
            ('00000000-0000-0000-0000-000000000006', 'Compra e venda', 'compra-e-venda', 'general');
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
