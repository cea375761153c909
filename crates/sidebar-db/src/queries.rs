use crate::models::{DescriptionRow, MessageRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::Connection;
use sidebar_types::models::handle_for;

impl Database {
    // -- Messages --

    /// Store a message and record its author in the user directory.
    pub fn insert_message(
        &self,
        id: &str,
        path: &str,
        author: &str,
        message: &str,
        created_at: i64,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, path, author, message, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, path, author, message, created_at],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO users (name, handle) VALUES (?1, ?2)",
                (author, handle_for(author)),
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Messages whose path starts with `path_prefix`, oldest first.
    pub fn get_messages(&self, path_prefix: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, path_prefix))
    }

    // -- Users --

    pub fn record_user(&self, name: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO users (name, handle) VALUES (?1, ?2)",
                (name, handle_for(name)),
            )?;
            Ok(())
        })
    }

    /// Case-insensitive prefix search over the directory.
    pub fn search_users(&self, prefix: &str, limit: u32) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name, handle FROM users
                 WHERE name LIKE ?1 ESCAPE '\\'
                 ORDER BY name COLLATE NOCASE
                 LIMIT ?2",
            )?;
            let pattern = format!("{}%", escape_like(prefix));
            let rows = stmt
                .query_map(rusqlite::params![pattern, limit], |row| {
                    Ok(UserRow {
                        name: row.get(0)?,
                        handle: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Resolve a mention handle (`Alice.Smith`) back to a directory user.
    pub fn get_user_by_handle(&self, handle: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT name, handle FROM users WHERE handle = ?1 COLLATE NOCASE",
                [handle],
                |row| {
                    Ok(UserRow {
                        name: row.get(0)?,
                        handle: row.get(1)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- Descriptions --

    pub fn get_description(&self, path: &str) -> Result<Option<DescriptionRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT path, text, updated_at FROM descriptions WHERE path = ?1",
                [path],
                |row| {
                    Ok(DescriptionRow {
                        path: row.get(0)?,
                        text: row.get(1)?,
                        updated_at: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn upsert_description(&self, path: &str, text: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO descriptions (path, text) VALUES (?1, ?2)
                 ON CONFLICT(path) DO UPDATE SET text = excluded.text, updated_at = datetime('now')",
                (path, text),
            )?;
            Ok(())
        })
    }
}

fn query_messages(conn: &Connection, path_prefix: &str) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, path, author, message, created_at
         FROM messages
         WHERE substr(path, 1, length(?1)) = ?1
         ORDER BY created_at ASC, rowid ASC",
    )?;

    let rows = stmt
        .query_map([path_prefix], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                path: row.get(1)?,
                author: row.get(2)?,
                message: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn post(db: &Database, path: &str, author: &str, message: &str, at: i64) {
        db.insert_message(&uuid::Uuid::new_v4().to_string(), path, author, message, at)
            .unwrap();
    }

    #[test]
    fn messages_are_listed_by_path_prefix_oldest_first() {
        let db = db();
        post(&db, "/docs/b.txt", "alice", "second", 20);
        post(&db, "/docs/a.txt", "bob", "first", 10);
        post(&db, "/other/c.txt", "alice", "elsewhere", 5);

        let rows = db.get_messages("/docs/").unwrap();
        let texts: Vec<_> = rows.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(texts, ["first", "second"]);

        assert_eq!(db.get_messages("/").unwrap().len(), 3);
        assert!(db.get_messages("/nothing/").unwrap().is_empty());
    }

    #[test]
    fn posting_records_the_author() {
        let db = db();
        post(&db, "/a", "Alice Smith", "hi", 1);
        post(&db, "/a", "Alice Smith", "again", 2);

        let users = db.search_users("ali", 10).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "Alice Smith");
        assert_eq!(users[0].handle, "Alice.Smith");
    }

    #[test]
    fn user_search_is_prefix_and_escapes_wildcards() {
        let db = db();
        db.record_user("Alice").unwrap();
        db.record_user("alfred").unwrap();
        db.record_user("Bob").unwrap();
        db.record_user("100%_real").unwrap();

        let names: Vec<_> = db
            .search_users("al", 10)
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, ["alfred", "Alice"]);

        assert_eq!(db.search_users("", 10).unwrap().len(), 4);
        assert_eq!(db.search_users("", 2).unwrap().len(), 2);
        assert!(db.search_users("%", 10).unwrap().is_empty());
        assert_eq!(db.search_users("100%_", 10).unwrap().len(), 1);
    }

    #[test]
    fn handle_lookup_is_case_insensitive() {
        let db = db();
        db.record_user("Jane Doe").unwrap();

        let user = db.get_user_by_handle("jane.doe").unwrap().unwrap();
        assert_eq!(user.name, "Jane Doe");
        assert!(db.get_user_by_handle("john.doe").unwrap().is_none());
    }

    #[test]
    fn descriptions_upsert() {
        let db = db();
        assert!(db.get_description("/a/").unwrap().is_none());

        db.upsert_description("/a/", "first").unwrap();
        db.upsert_description("/a/", "second").unwrap();

        let row = db.get_description("/a/").unwrap().unwrap();
        assert_eq!(row.text, "second");
        assert_eq!(row.path, "/a/");
    }
}
