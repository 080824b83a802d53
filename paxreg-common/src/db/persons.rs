//! Person table queries
//!
//! Write helpers take a connection so they can run inside the caller's
//! transaction (`&mut *tx`).

use super::init::PERSON_TABLE;
use super::models::{Person, PersonRecord};
use crate::{Error, Result, ScalarField, SetField};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

/// SQLite host parameter budget per statement
const MAX_BIND_PARAMS: usize = 500;

/// Data columns in persisted order (everything except PersonID)
pub fn data_columns() -> Vec<&'static str> {
    ScalarField::ALL
        .iter()
        .map(|f| f.column())
        .chain(SetField::ALL.iter().map(|f| f.column()))
        .collect()
}

/// Insert one person, returning its assigned PersonID
pub async fn insert_person(conn: &mut SqliteConnection, record: &PersonRecord) -> Result<i64> {
    let columns = data_columns();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        PERSON_TABLE,
        columns.join(", "),
        placeholders
    );

    let mut query = sqlx::query(&sql);
    for field in ScalarField::ALL {
        query = query.bind(record.scalar(field));
    }
    for field in SetField::ALL {
        query = query.bind(record.set(field));
    }

    let result = query.execute(&mut *conn).await?;
    Ok(result.last_insert_rowid())
}

/// Insert a person under its existing PersonID (registry copies)
pub async fn insert_person_with_id(conn: &mut SqliteConnection, person: &Person) -> Result<()> {
    let columns = data_columns();
    let placeholders = vec!["?"; columns.len() + 1].join(", ");
    let sql = format!(
        "INSERT INTO {} (PersonID, {}) VALUES ({})",
        PERSON_TABLE,
        columns.join(", "),
        placeholders
    );

    let mut query = sqlx::query(&sql).bind(person.person_id);
    for field in ScalarField::ALL {
        query = query.bind(person.record.scalar(field));
    }
    for field in SetField::ALL {
        query = query.bind(person.record.set(field));
    }

    query.execute(&mut *conn).await?;
    Ok(())
}

/// Highest PersonID ever issued, from `sqlite_sequence`
///
/// `None` until the first insert. Deleted tail rows still count, which is
/// what keeps AUTOINCREMENT from reissuing their ids.
pub async fn person_sequence(conn: &mut SqliteConnection) -> Result<Option<i64>> {
    let seq: Option<i64> = sqlx::query_scalar("SELECT seq FROM sqlite_sequence WHERE name = ?")
        .bind(PERSON_TABLE)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(seq)
}

/// Set the PersonID sequence so the next insert gets `seq + 1`
///
/// Never lowers the sequence below an id already present.
pub async fn set_person_sequence(conn: &mut SqliteConnection, seq: i64) -> Result<()> {
    let current = person_sequence(conn).await?;
    let seq = current.map_or(seq, |c| c.max(seq));

    sqlx::query("DELETE FROM sqlite_sequence WHERE name = ?")
        .bind(PERSON_TABLE)
        .execute(&mut *conn)
        .await?;
    sqlx::query("INSERT INTO sqlite_sequence (name, seq) VALUES (?, ?)")
        .bind(PERSON_TABLE)
        .bind(seq)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Insert many persons in order, returning their PersonIDs
pub async fn insert_persons(
    conn: &mut SqliteConnection,
    records: &[PersonRecord],
) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(records.len());
    for record in records {
        ids.push(insert_person(conn, record).await?);
    }
    Ok(ids)
}

/// Load every person ordered by PersonID
pub async fn load_persons(conn: &mut SqliteConnection) -> Result<Vec<Person>> {
    let sql = format!(
        "SELECT PersonID, {} FROM {} ORDER BY PersonID ASC",
        data_columns().join(", "),
        PERSON_TABLE
    );

    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
    rows.iter().map(person_from_row).collect()
}

/// Load one person by PersonID
pub async fn fetch_person(conn: &mut SqliteConnection, person_id: i64) -> Result<Option<Person>> {
    let sql = format!(
        "SELECT PersonID, {} FROM {} WHERE PersonID = ?",
        data_columns().join(", "),
        PERSON_TABLE
    );

    let row = sqlx::query(&sql)
        .bind(person_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(person_from_row).transpose()
}

/// Count persisted persons
pub async fn count_persons(conn: &mut SqliteConnection) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", PERSON_TABLE))
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Overwrite every data column of an existing person
///
/// Fails with `InconsistentMergeInput` if the row no longer exists.
pub async fn update_person(conn: &mut SqliteConnection, person: &Person) -> Result<()> {
    let set_clause = data_columns()
        .iter()
        .map(|column| format!("{} = ?", column))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE {} SET {} WHERE PersonID = ?", PERSON_TABLE, set_clause);

    let mut query = sqlx::query(&sql);
    for field in ScalarField::ALL {
        query = query.bind(person.record.scalar(field));
    }
    for field in SetField::ALL {
        query = query.bind(person.record.set(field));
    }

    let result = query.bind(person.person_id).execute(&mut *conn).await?;
    if result.rows_affected() != 1 {
        return Err(Error::InconsistentMergeInput(format!(
            "PersonID {} disappeared before update",
            person.person_id
        )));
    }
    Ok(())
}

/// Delete persons by PersonID
///
/// Fails with `InconsistentMergeInput` if any of the rows is already gone.
pub async fn delete_persons(conn: &mut SqliteConnection, person_ids: &[i64]) -> Result<()> {
    for chunk in person_ids.chunks(MAX_BIND_PARAMS) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "DELETE FROM {} WHERE PersonID IN ({})",
            PERSON_TABLE, placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(*id);
        }

        let result = query.execute(&mut *conn).await?;
        if result.rows_affected() != chunk.len() as u64 {
            return Err(Error::InconsistentMergeInput(format!(
                "expected to delete {} rows, deleted {}",
                chunk.len(),
                result.rows_affected()
            )));
        }
    }
    Ok(())
}

fn person_from_row(row: &SqliteRow) -> Result<Person> {
    let mut record = PersonRecord::default();
    for field in ScalarField::ALL {
        let value: Option<String> = row.try_get(field.column())?;
        record.set_scalar(field, value.unwrap_or_default());
    }
    for field in SetField::ALL {
        let value: Option<String> = row.try_get(field.column())?;
        record.set_set(field, value.unwrap_or_default());
    }

    Ok(Person {
        person_id: row.try_get("PersonID")?,
        record,
    })
}
