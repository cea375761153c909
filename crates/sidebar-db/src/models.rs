//! Row types mapping directly to SQLite rows, kept apart from
//! `sidebar-types` so the DB layer stays independent.

pub struct MessageRow {
    pub id: String,
    pub path: String,
    pub author: String,
    pub message: String,
    /// Unix seconds
    pub created_at: i64,
}

pub struct UserRow {
    pub name: String,
    pub handle: String,
}

pub struct DescriptionRow {
    pub path: String,
    pub text: String,
    pub updated_at: String,
}
