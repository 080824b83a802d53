//! Test Helper Utilities
//!
//! Source table fixtures and registry accessors shared by the integration
//! tests.

#![allow(dead_code)]

use paxreg_common::db::{insert_persons, load_persons, Person, PersonRecord, RegistryStore};
use tempfile::TempDir;

/// Upstream table definitions as the format parsers create them
const SOURCE_TABLES: &[(&str, &str)] = &[
    (
        "boarding_data",
        "PassengerFirstName TEXT, PassengerSecondName TEXT, PassengerLastName TEXT, \
         PassengerSex TEXT, PassengerBirthDate TEXT, PassengerDocument TEXT, BookingCode TEXT, \
         TicketNumber TEXT, Baggage TEXT, FlightDate TEXT, FlightTime TEXT, FlightNumber TEXT, \
         CodeShare TEXT, Destination TEXT",
    ),
    (
        "boarding_pass_xls",
        "PassengerTitle TEXT, PassengerName TEXT, LoyaltyProgram TEXT, LoyaltyNumber TEXT, \
         FareClass TEXT, FlightNumber TEXT, DepartureCity TEXT, ArrivalCity TEXT, \
         DepartureAirport TEXT, ArrivalAirport TEXT, FlightDate TEXT, FlightTime TEXT, \
         PNR TEXT, ETicket TEXT",
    ),
    (
        "sirena_data",
        "PaxName TEXT, PaxBirthDate TEXT, DepartDate TEXT, DepartTime TEXT, ArrivalDate TEXT, \
         ArrivalTime TEXT, FlightCode TEXT, FromAirport TEXT, Dest TEXT, Code TEXT, \
         e_Ticket TEXT, TravelDoc TEXT, Seat TEXT, Meal TEXT, TrvCls TEXT, Fare TEXT, \
         Baggage TEXT, PaxAdditionalInfo TEXT, AgentInfo TEXT",
    ),
    (
        "pointz_aggregator_data",
        "UserUID TEXT, FirstName TEXT, LastName TEXT, CardNumber TEXT, BonusProgramm TEXT, \
         FlightCode TEXT, FlightDate TEXT, Departure TEXT, Arrival TEXT, Fare TEXT",
    ),
    (
        "skyteam_data",
        "FlightDate TEXT, FlightNumber TEXT, FFProgram TEXT, FFNumber TEXT, TravelClass TEXT, \
         Fare TEXT, Departure TEXT, Arrival TEXT, Status TEXT",
    ),
    (
        "frequent_flyer_profiles",
        "Nick TEXT PRIMARY KEY, Sex TEXT, FirstName TEXT, LastName TEXT, \
         TravelDocuments TEXT, Loyalties TEXT",
    ),
    (
        "frequent_flyer_flights",
        "NickName TEXT, FlightDate TEXT, Flight TEXT, Codeshare INTEGER, DepartureCity TEXT, \
         DepartureAirport TEXT, DepartureCountry TEXT, ArrivalCity TEXT, ArrivalAirport TEXT, \
         ArrivalCountry TEXT",
    ),
];

/// Create a file-backed registry in a temporary directory
///
/// Returns (TempDir, RegistryStore) - TempDir must be kept alive for duration of test
pub async fn create_test_store() -> (TempDir, RegistryStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = RegistryStore::open(&temp_dir.path().join("registry.db"))
        .await
        .unwrap();
    (temp_dir, store)
}

/// Create every upstream source table
pub async fn create_source_tables(store: &RegistryStore) {
    for (table, _) in SOURCE_TABLES {
        create_source_table(store, table).await;
    }
}

/// Create a single upstream source table
pub async fn create_source_table(store: &RegistryStore, table: &str) {
    let (_, columns) = SOURCE_TABLES
        .iter()
        .find(|(name, _)| *name == table)
        .unwrap_or_else(|| panic!("unknown source table {}", table));
    sqlx::query(&format!("CREATE TABLE IF NOT EXISTS {} ({})", table, columns))
        .execute(store.pool())
        .await
        .unwrap();
}

/// Insert one source row; columns not named stay NULL
pub async fn insert_row(store: &RegistryStore, table: &str, values: &[(&str, &str)]) {
    let columns = values.iter().map(|(c, _)| *c).collect::<Vec<_>>().join(", ");
    let placeholders = vec!["?"; values.len()].join(", ");
    let sql = format!("INSERT INTO {} ({}) VALUES ({})", table, columns, placeholders);

    let mut query = sqlx::query(&sql);
    for (_, value) in values {
        query = query.bind(*value);
    }
    query.execute(store.pool()).await.unwrap();
}

/// Append persons directly, bypassing consolidation
pub async fn seed_persons(store: &RegistryStore, records: &[PersonRecord]) -> Vec<i64> {
    let mut tx = store.begin().await.unwrap();
    let ids = insert_persons(&mut tx, records).await.unwrap();
    RegistryStore::commit(tx).await.unwrap();
    ids
}

/// Every persisted person in PersonID order
pub async fn persons(store: &RegistryStore) -> Vec<Person> {
    let mut conn = store.pool().acquire().await.unwrap();
    load_persons(&mut conn).await.unwrap()
}
