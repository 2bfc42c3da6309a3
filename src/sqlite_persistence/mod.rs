//! Declarative SQLite schema definitions.
//!
//! Tables are described as const data and created or validated against an
//! existing database on open. The `user_version` pragma is offset by
//! `BASE_DB_VERSION` to tell a versioned database apart from a fresh file.

use anyhow::{bail, Result};
use rusqlite::Connection;

pub const BASE_DB_VERSION: usize = 77000;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SqlType {
    Text,
    Integer,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
        }
    }
}

pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub primary_key: bool,
    pub non_null: bool,
    pub unique: bool,
    pub foreign_key: Option<ForeignKey>,
}

impl Column {
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Column {
            name,
            sql_type,
            primary_key: false,
            non_null: false,
            unique: false,
            foreign_key: None,
        }
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub const fn non_null(mut self) -> Self {
        self.non_null = true;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.foreign_key = Some(ForeignKey { table, column });
        self
    }
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub unique_constraints: &'static [&'static [&'static str]],
    pub indices: &'static [(&'static str, &'static str)],
}

impl Table {
    fn create_sql(&self) -> String {
        let mut sql = format!("CREATE TABLE {} (", self.name);
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(column.name);
            sql.push(' ');
            sql.push_str(column.sql_type.as_sql());
            if column.primary_key {
                sql.push_str(" PRIMARY KEY");
            }
            if column.non_null {
                sql.push_str(" NOT NULL");
            }
            if column.unique {
                sql.push_str(" UNIQUE");
            }
            if let Some(fk) = &column.foreign_key {
                sql.push_str(&format!(" REFERENCES {}({})", fk.table, fk.column));
            }
        }
        for constraint in self.unique_constraints {
            sql.push_str(&format!(", UNIQUE ({})", constraint.join(", ")));
        }
        sql.push_str(");");
        sql
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute(&self.create_sql(), [])?;
        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                [],
            )?;
        }
        Ok(())
    }
}

pub struct Schema {
    pub version: usize,
    pub tables: &'static [Table],
}

impl Schema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    /// Check an existing database against this schema, column by column.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", table.name))?;
            let actual: Vec<(String, String, bool, bool)> = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i32>(3)? == 1,
                        row.get::<_, i32>(5)? == 1,
                    ))
                })?
                .collect::<Result<_, _>>()?;

            if actual.len() != table.columns.len() {
                bail!(
                    "Table {} has {} columns, expected {}",
                    table.name,
                    actual.len(),
                    table.columns.len()
                );
            }

            for ((name, sql_type, non_null, primary_key), expected) in
                actual.iter().zip(table.columns.iter())
            {
                if name != expected.name {
                    bail!(
                        "Table {} column name mismatch: expected {}, got {}",
                        table.name,
                        expected.name,
                        name
                    );
                }
                if sql_type != expected.sql_type.as_sql() {
                    bail!(
                        "Table {} column {} type mismatch: expected {}, got {}",
                        table.name,
                        name,
                        expected.sql_type.as_sql(),
                        sql_type
                    );
                }
                if *non_null != expected.non_null {
                    bail!(
                        "Table {} column {} non-null mismatch: expected {}, got {}",
                        table.name,
                        name,
                        expected.non_null,
                        non_null
                    );
                }
                if *primary_key != expected.primary_key {
                    bail!(
                        "Table {} column {} primary key mismatch: expected {}, got {}",
                        table.name,
                        name,
                        expected.primary_key,
                        primary_key
                    );
                }
            }

            for (index_name, _) in table.indices {
                let exists: bool = conn
                    .query_row(
                        "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                        rusqlite::params![index_name, table.name],
                        |_| Ok(true),
                    )
                    .unwrap_or(false);
                if !exists {
                    bail!("Table {} is missing index '{}'", table.name, index_name);
                }
            }
        }
        Ok(())
    }

    /// Create the schema on a fresh database, or validate an existing one.
    pub fn create_or_validate(&self, conn: &Connection) -> Result<()> {
        let table_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |r| r.get(0),
        )?;
        if table_count == 0 {
            self.create(conn)?;
        } else {
            conn.execute("PRAGMA foreign_keys = ON;", [])?;
            self.validate(conn)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARENT_TABLE: Table = Table {
        name: "parent",
        columns: &[
            Column::new("id", SqlType::Integer).primary_key(),
            Column::new("name", SqlType::Text).non_null().unique(),
        ],
        unique_constraints: &[],
        indices: &[("idx_parent_name", "name")],
    };

    const CHILD_TABLE: Table = Table {
        name: "child",
        columns: &[
            Column::new("parent_id", SqlType::Integer)
                .non_null()
                .references("parent", "id"),
            Column::new("note", SqlType::Text),
        ],
        unique_constraints: &[&["parent_id", "note"]],
        indices: &[],
    };

    const TEST_SCHEMA: Schema = Schema {
        version: 0,
        tables: &[PARENT_TABLE, CHILD_TABLE],
    };

    #[test]
    fn create_then_validate_passes() {
        let conn = Connection::open_in_memory().unwrap();
        TEST_SCHEMA.create(&conn).unwrap();
        TEST_SCHEMA.validate(&conn).unwrap();
    }

    #[test]
    fn validate_detects_missing_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE parent (id INTEGER PRIMARY KEY)", [])
            .unwrap();
        conn.execute(
            "CREATE TABLE child (parent_id INTEGER NOT NULL, note TEXT)",
            [],
        )
        .unwrap();

        let result = TEST_SCHEMA.validate(&conn);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("columns"));
    }

    #[test]
    fn validate_detects_missing_index() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE parent (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE)",
            [],
        )
        .unwrap();
        conn.execute(
            "CREATE TABLE child (parent_id INTEGER NOT NULL, note TEXT, UNIQUE (parent_id, note))",
            [],
        )
        .unwrap();

        let result = TEST_SCHEMA.validate(&conn);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("idx_parent_name"));
    }

    #[test]
    fn create_or_validate_creates_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        TEST_SCHEMA.create_or_validate(&conn).unwrap();

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version as usize, BASE_DB_VERSION + TEST_SCHEMA.version);

        // Second open validates instead of re-creating.
        TEST_SCHEMA.create_or_validate(&conn).unwrap();
    }

    #[test]
    fn foreign_keys_are_enforced_after_create() {
        let conn = Connection::open_in_memory().unwrap();
        TEST_SCHEMA.create(&conn).unwrap();

        let result = conn.execute("INSERT INTO child (parent_id) VALUES (42)", []);
        assert!(result.is_err());
    }
}
