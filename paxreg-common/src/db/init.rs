//! Registry schema creation
//!
//! The Person table is the only table this crate owns. Upstream source
//! tables are created by the ingestion parsers.

use crate::{Result, ScalarField, SetField};
use sqlx::SqliteConnection;

/// Name of the canonical registry table
pub const PERSON_TABLE: &str = "Person";

/// Create the Person table if it doesn't exist
///
/// `AUTOINCREMENT` keeps PersonIDs monotonic and never reused, even after
/// the cluster merger deletes rows.
pub async fn create_person_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(&person_table_ddl()).execute(&mut *conn).await?;
    Ok(())
}

/// Drop the Person table if it exists
pub async fn drop_person_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", PERSON_TABLE))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Check whether a table exists
pub async fn table_exists(conn: &mut SqliteConnection, table: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
    )
    .bind(table)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count > 0)
}

/// `CREATE TABLE` statement for the Person table
pub fn person_table_ddl() -> String {
    let columns = ScalarField::ALL
        .iter()
        .map(|f| f.column())
        .chain(SetField::ALL.iter().map(|f| f.column()))
        .map(|column| format!("            {} TEXT NOT NULL DEFAULT ''", column))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n            PersonID INTEGER PRIMARY KEY AUTOINCREMENT,\n{}\n        )",
        PERSON_TABLE, columns
    )
}
