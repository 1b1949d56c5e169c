//! SQLite表结构
//!
//! 状态列以整数存储（见 `TaskStatus::rank` / `ExpressionStatus::rank`），
//! 条件更新直接用 `status < $new` 表达单调推进。

pub const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS expressions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        expression TEXT NOT NULL,
        idempotency_key TEXT,
        status INTEGER NOT NULL DEFAULT 0,
        result REAL,
        created_at DATETIME NOT NULL,
        finished_at DATETIME
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_expressions_owner_key
        ON expressions (owner_id, idempotency_key)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS task_nodes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        parent_id INTEGER REFERENCES task_nodes (id) ON DELETE CASCADE,
        expression_id INTEGER NOT NULL REFERENCES expressions (id) ON DELETE CASCADE,
        position INTEGER NOT NULL DEFAULT 0,
        operation TEXT,
        status INTEGER NOT NULL DEFAULT 0,
        result REAL,
        worker_id TEXT
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_task_nodes_parent ON task_nodes (parent_id, position)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_task_nodes_worker ON task_nodes (worker_id, status)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_task_nodes_expression ON task_nodes (expression_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS workers (
        id TEXT PRIMARY KEY,
        url TEXT NOT NULL,
        executors INTEGER NOT NULL,
        last_heartbeat DATETIME NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS operations (
        operation TEXT PRIMARY KEY,
        duration_ms INTEGER NOT NULL
    )
    "#,
];
