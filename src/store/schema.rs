pub const SCHEMA: &str = r#"
-- Users are identified by a unique, lowercased email
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Tokens are auth credentials; non-admin tokens must belong to a user
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- first 8 chars of ID for fast lookup
    is_admin INTEGER NOT NULL DEFAULT 0,  -- admin tokens only access /api/v1/admin/* routes

    -- User binding (required for non-admin tokens, NULL only for admin tokens)
    user_id TEXT REFERENCES users(id) ON DELETE CASCADE,

    -- Lifecycle
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,            -- NULL = never
    last_used_at TEXT
);

-- Pantries have exactly one owner, who never appears in pantry_members
CREATE TABLE IF NOT EXISTS pantries (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    owner_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Non-owner access; one row per (pantry, user)
CREATE TABLE IF NOT EXISTS pantry_members (
    pantry_id TEXT NOT NULL REFERENCES pantries(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role TEXT NOT NULL CHECK (role IN ('view', 'edit')),
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (pantry_id, user_id)
);

-- Inventory
CREATE TABLE IF NOT EXISTS pantry_items (
    id TEXT PRIMARY KEY,
    pantry_id TEXT NOT NULL REFERENCES pantries(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    quantity REAL,
    unit TEXT,
    category TEXT,
    avg_price REAL,
    location TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Create indexes
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
CREATE INDEX IF NOT EXISTS idx_pantries_owner ON pantries(owner_id);
CREATE INDEX IF NOT EXISTS idx_pantry_members_user ON pantry_members(user_id);
CREATE INDEX IF NOT EXISTS idx_pantry_items_pantry ON pantry_items(pantry_id);
"#;
