//! Registry export utilities: CSV dump and file copy

use paxreg_common::db::{
    create_person_table, data_columns, drop_person_table, insert_person_with_id, load_persons,
    person_sequence, set_person_sequence, Person, RegistryStore,
};
use paxreg_common::{Error, Result, ScalarField, SetField, SourceKind};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqliteConnection, ValueRef};
use std::io;
use std::path::Path;
use tracing::{debug, info};

async fn read_all(store: &RegistryStore) -> Result<Vec<Person>> {
    let mut conn = store
        .pool()
        .acquire()
        .await
        .map_err(|e| Error::StoreUnavailable(e.to_string()))?;
    load_persons(&mut conn).await
}

/// Write the Person table to `out` as CSV, header row first
///
/// Rows are written in PersonID order; `limit` caps the number of rows.
/// Returns the number of rows written.
pub async fn export_csv(store: &RegistryStore, out: &Path, limit: Option<usize>) -> Result<usize> {
    let mut persons = read_all(store).await?;
    if let Some(limit) = limit {
        persons.truncate(limit);
    }

    let mut writer = csv::Writer::from_path(out).map_err(io::Error::from)?;

    let mut header = vec!["PersonID"];
    header.extend(data_columns());
    writer.write_record(&header).map_err(io::Error::from)?;

    for person in &persons {
        writer.write_record(csv_row(person)).map_err(io::Error::from)?;
    }
    writer.flush()?;

    info!("Exported {} persons to {}", persons.len(), out.display());
    Ok(persons.len())
}

fn csv_row(person: &Person) -> Vec<String> {
    let mut row = Vec::with_capacity(1 + ScalarField::COUNT + SetField::COUNT);
    row.push(person.person_id.to_string());
    row.extend(ScalarField::ALL.iter().map(|f| person.record.scalar(*f).to_string()));
    row.extend(SetField::ALL.iter().map(|f| person.record.set(*f).to_string()));
    row
}

/// Outcome of a registry copy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopyReport {
    pub persons: usize,
    /// Rows copied per upstream table present in the source file
    pub source_tables: Vec<(String, usize)>,
}

/// Copy the registry into another file
///
/// The Person table keeps its PersonIDs and its AUTOINCREMENT sequence, so
/// ids of deleted tail rows are not reissued in the copy. Every upstream
/// source table present in the registry file is copied too. With `limit`,
/// each table is cut to its first `limit` rows, which gives a small working
/// copy of a production file. Tables already in the target are replaced.
pub async fn copy_registry(
    store: &RegistryStore,
    target: &Path,
    limit: Option<usize>,
) -> Result<CopyReport> {
    let mut persons = read_all(store).await?;
    if let Some(limit) = limit {
        persons.truncate(limit);
    }

    let (sequence, tables) = {
        let mut conn = store
            .pool()
            .acquire()
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;
        let sequence = person_sequence(&mut conn).await?;
        let mut tables = Vec::new();
        for kind in SourceKind::DEFAULT_ORDER {
            if let Some(table) = read_table(&mut conn, kind.table(), limit).await? {
                tables.push(table);
            }
        }
        (sequence, tables)
    };

    let target_store = RegistryStore::open(target).await?;
    let mut tx = target_store.begin().await?;
    drop_person_table(&mut tx).await?;
    create_person_table(&mut tx).await?;
    for person in &persons {
        insert_person_with_id(&mut tx, person).await?;
    }
    if let Some(seq) = sequence {
        set_person_sequence(&mut tx, seq).await?;
    }

    let mut report = CopyReport {
        persons: persons.len(),
        ..Default::default()
    };
    for table in &tables {
        write_table(&mut tx, table).await?;
        debug!("Copied {} rows of {}", table.rows.len(), table.name);
        report.source_tables.push((table.name.clone(), table.rows.len()));
    }
    RegistryStore::commit(tx).await?;
    target_store.close().await;

    info!(
        "Copied {} persons and {} source tables to {}",
        report.persons,
        report.source_tables.len(),
        target.display()
    );
    Ok(report)
}

/// One upstream table: its DDL and the rows selected for copying
struct TableCopy {
    name: String,
    ddl: String,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// SQLite value as stored, so a copy keeps each cell's storage class
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Blob(Vec<u8>),
}

async fn read_table(
    conn: &mut SqliteConnection,
    table: &str,
    limit: Option<usize>,
) -> Result<Option<TableCopy>> {
    let ddl: Option<String> =
        sqlx::query_scalar("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_optional(&mut *conn)
            .await?;
    let Some(ddl) = ddl else {
        return Ok(None);
    };

    // LIMIT -1 is unbounded in SQLite
    let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
    let rows = sqlx::query(&format!("SELECT * FROM \"{}\" ORDER BY rowid LIMIT ?", table))
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

    let columns = match rows.first() {
        Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
        None => Vec::new(),
    };
    let rows = rows
        .iter()
        .map(|row| (0..row.len()).map(|i| cell(row, i)).collect())
        .collect();

    Ok(Some(TableCopy {
        name: table.to_string(),
        ddl,
        columns,
        rows,
    }))
}

fn cell(row: &SqliteRow, i: usize) -> Cell {
    match row.try_get_raw(i) {
        Ok(value) if !value.is_null() => {}
        _ => return Cell::Null,
    }
    row.try_get::<String, _>(i)
        .map(Cell::Text)
        .or_else(|_| row.try_get::<i64, _>(i).map(Cell::Integer))
        .or_else(|_| row.try_get::<f64, _>(i).map(Cell::Real))
        .or_else(|_| row.try_get::<Vec<u8>, _>(i).map(Cell::Blob))
        .unwrap_or(Cell::Null)
}

async fn write_table(conn: &mut SqliteConnection, table: &TableCopy) -> Result<()> {
    sqlx::query(&format!("DROP TABLE IF EXISTS \"{}\"", table.name))
        .execute(&mut *conn)
        .await?;
    sqlx::query(&table.ddl).execute(&mut *conn).await?;
    if table.rows.is_empty() {
        return Ok(());
    }

    let columns = table
        .columns
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        table.name,
        columns,
        vec!["?"; table.columns.len()].join(", ")
    );

    for row in &table.rows {
        let mut query = sqlx::query(&sql);
        for value in row {
            query = match value {
                Cell::Null => query.bind(None::<String>),
                Cell::Text(v) => query.bind(v.as_str()),
                Cell::Integer(v) => query.bind(*v),
                Cell::Real(v) => query.bind(*v),
                Cell::Blob(v) => query.bind(v.as_slice()),
            };
        }
        query.execute(&mut *conn).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use paxreg_common::db::{insert_person, insert_persons, PersonRecord};

    async fn seeded_store() -> RegistryStore {
        let store = RegistryStore::open_in_memory().await.unwrap();
        let mut tx = store.begin().await.unwrap();
        insert_persons(
            &mut tx,
            &[
                PersonRecord::default()
                    .with_scalar(ScalarField::LastName, "SMITH")
                    .with_set(SetField::TravelDocuments, "AB1,CD2"),
                PersonRecord::default().with_scalar(ScalarField::LastName, "DOE"),
                PersonRecord::default().with_scalar(ScalarField::LastName, "ROE"),
            ],
        )
        .await
        .unwrap();
        RegistryStore::commit(tx).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_export_writes_header_and_limited_rows() {
        let store = seeded_store().await;
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("persons.csv");

        let written = export_csv(&store, &out, Some(2)).await.unwrap();
        assert_eq!(written, 2);

        let mut reader = csv::Reader::from_path(&out).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "PersonID");
        assert_eq!(&headers[1], "FirstName");
        assert_eq!(headers.len(), 1 + ScalarField::COUNT + SetField::COUNT);

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "1");
        assert_eq!(&rows[0][3], "SMITH");
        assert_eq!(&rows[0][6], "AB1,CD2");
    }

    #[tokio::test]
    async fn test_copy_keeps_person_ids() {
        let store = seeded_store().await;
        let mut tx = store.begin().await.unwrap();
        paxreg_common::db::delete_persons(&mut tx, &[2]).await.unwrap();
        RegistryStore::commit(tx).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("copy.db");
        let report = copy_registry(&store, &target, None).await.unwrap();
        assert_eq!(report.persons, 2);
        assert!(report.source_tables.is_empty());

        let copy = RegistryStore::open(&target).await.unwrap();
        let persons = read_all(&copy).await.unwrap();
        let ids: Vec<i64> = persons.iter().map(|p| p.person_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(persons[1].record.scalar(ScalarField::LastName), "ROE");

        // Copying again replaces rather than appends
        assert_eq!(copy_registry(&store, &target, None).await.unwrap().persons, 2);
        assert_eq!(copy.person_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_copy_does_not_reissue_deleted_tail_id() {
        let store = seeded_store().await;
        let mut tx = store.begin().await.unwrap();
        paxreg_common::db::delete_persons(&mut tx, &[3]).await.unwrap();
        RegistryStore::commit(tx).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("copy.db");
        copy_registry(&store, &target, None).await.unwrap();

        let copy = RegistryStore::open(&target).await.unwrap();
        let mut tx = copy.begin().await.unwrap();
        let next = insert_person(&mut tx, &PersonRecord::default()).await.unwrap();
        RegistryStore::commit(tx).await.unwrap();
        assert_eq!(next, 4);
    }

    #[tokio::test]
    async fn test_limited_copy_truncates_every_table() {
        let store = seeded_store().await;
        sqlx::query("CREATE TABLE skyteam_data (FFNumber TEXT, Fare REAL, Seq INTEGER)")
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO skyteam_data VALUES ('SU 1', 10.5, 1), ('SU 2', NULL, 2), ('SU 3', 7.0, 3)",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("small.db");
        let report = copy_registry(&store, &target, Some(2)).await.unwrap();
        assert_eq!(report.persons, 2);
        assert_eq!(report.source_tables, vec![("skyteam_data".to_string(), 2)]);

        let copy = RegistryStore::open(&target).await.unwrap();
        let rows: Vec<(String, Option<f64>, i64)> =
            sqlx::query_as("SELECT FFNumber, Fare, Seq FROM skyteam_data ORDER BY rowid")
                .fetch_all(copy.pool())
                .await
                .unwrap();
        assert_eq!(
            rows,
            vec![("SU 1".to_string(), Some(10.5), 1), ("SU 2".to_string(), None, 2)]
        );

        // Ids after the cut stay reserved
        let mut tx = copy.begin().await.unwrap();
        let next = insert_person(&mut tx, &PersonRecord::default()).await.unwrap();
        RegistryStore::commit(tx).await.unwrap();
        assert_eq!(next, 4);
    }
}
