//! Read upstream tables into typed source records
//!
//! Columns are read by name, so a column the parser never wrote reads as
//! empty. A missing table is reported and treated as an empty source.

use super::{
    BoardingPassRecord, BoardingRecord, FlyerFlightRecord, FlyerOwner, FlyerProfileRecord,
    PointzRecord, SirenaRecord, SkyteamRecord, SourceRecord,
};
use paxreg_common::db::table_exists;
use paxreg_common::{Result, SourceKind};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::{debug, warn};

/// All records of one source, in table order
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub kind: SourceKind,
    pub records: Vec<SourceRecord>,
    /// False when the upstream table does not exist
    pub table_present: bool,
}

/// Load every record of `kind` from its upstream table
pub async fn load_source(conn: &mut SqliteConnection, kind: SourceKind) -> Result<SourceBatch> {
    if !table_exists(conn, kind.table()).await? {
        warn!("Source table {} not found, treating {} as empty", kind.table(), kind);
        return Ok(SourceBatch {
            kind,
            records: Vec::new(),
            table_present: false,
        });
    }

    let join_profiles = kind == SourceKind::FlyerFlights
        && table_exists(conn, SourceKind::FlyerProfiles.table()).await?;

    let sql = if join_profiles {
        "SELECT f.*, p.* FROM frequent_flyer_flights f \
         LEFT JOIN frequent_flyer_profiles p ON p.Nick = f.NickName \
         ORDER BY f.rowid"
            .to_string()
    } else {
        format!("SELECT * FROM {} ORDER BY rowid", kind.table())
    };

    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
    let records: Vec<SourceRecord> = rows.iter().map(|row| record_from_row(kind, row)).collect();
    debug!("Loaded {} {} records", records.len(), kind);

    Ok(SourceBatch {
        kind,
        records,
        table_present: true,
    })
}

fn record_from_row(kind: SourceKind, row: &SqliteRow) -> SourceRecord {
    match kind {
        SourceKind::Boarding => SourceRecord::Boarding(BoardingRecord {
            first_name: text(row, "PassengerFirstName"),
            middle_name: text(row, "PassengerSecondName"),
            last_name: text(row, "PassengerLastName"),
            sex: text(row, "PassengerSex"),
            birth_date: text(row, "PassengerBirthDate"),
            document: text(row, "PassengerDocument"),
            booking_code: text(row, "BookingCode"),
            ticket_number: text(row, "TicketNumber"),
            baggage: text(row, "Baggage"),
            flight_date: text(row, "FlightDate"),
            flight_time: text(row, "FlightTime"),
            flight_number: text(row, "FlightNumber"),
            codeshare: text(row, "CodeShare"),
            destination: text(row, "Destination"),
        }),
        SourceKind::BoardingPass => SourceRecord::BoardingPass(BoardingPassRecord {
            title: text(row, "PassengerTitle"),
            passenger_name: text(row, "PassengerName"),
            loyalty_program: text(row, "LoyaltyProgram"),
            loyalty_number: text(row, "LoyaltyNumber"),
            fare_class: text(row, "FareClass"),
            flight_number: text(row, "FlightNumber"),
            departure_city: text(row, "DepartureCity"),
            arrival_city: text(row, "ArrivalCity"),
            departure_airport: text(row, "DepartureAirport"),
            arrival_airport: text(row, "ArrivalAirport"),
            flight_date: text(row, "FlightDate"),
            flight_time: text(row, "FlightTime"),
            pnr: text(row, "PNR"),
            eticket: text(row, "ETicket"),
        }),
        SourceKind::Sirena => SourceRecord::Sirena(SirenaRecord {
            pax_name: text(row, "PaxName"),
            birth_date: text(row, "PaxBirthDate"),
            depart_date: text(row, "DepartDate"),
            depart_time: text(row, "DepartTime"),
            arrival_date: text(row, "ArrivalDate"),
            arrival_time: text(row, "ArrivalTime"),
            flight_code: text(row, "FlightCode"),
            from_airport: text(row, "FromAirport"),
            destination: text(row, "Dest"),
            booking_code: text(row, "Code"),
            eticket: text(row, "e_Ticket"),
            travel_doc: text(row, "TravelDoc"),
            seat: text(row, "Seat"),
            meal: text(row, "Meal"),
            travel_class: text(row, "TrvCls"),
            fare: text(row, "Fare"),
            baggage: text(row, "Baggage"),
            pax_info: text(row, "PaxAdditionalInfo"),
            agent_info: text(row, "AgentInfo"),
        }),
        SourceKind::Pointz => SourceRecord::Pointz(PointzRecord {
            user_uid: text(row, "UserUID"),
            first_name: text(row, "FirstName"),
            last_name: text(row, "LastName"),
            card_number: text(row, "CardNumber"),
            bonus_program: text(row, "BonusProgramm"),
            flight_code: text(row, "FlightCode"),
            flight_date: text(row, "FlightDate"),
            departure: text(row, "Departure"),
            arrival: text(row, "Arrival"),
            fare: text(row, "Fare"),
        }),
        SourceKind::Skyteam => SourceRecord::Skyteam(SkyteamRecord {
            flight_date: text(row, "FlightDate"),
            flight_number: text(row, "FlightNumber"),
            ff_program: text(row, "FFProgram"),
            ff_number: text(row, "FFNumber"),
            travel_class: text(row, "TravelClass"),
            fare: text(row, "Fare"),
            departure: text(row, "Departure"),
            arrival: text(row, "Arrival"),
            status: text(row, "Status"),
        }),
        SourceKind::FlyerProfiles => SourceRecord::FlyerProfile(FlyerProfileRecord {
            nick: text(row, "Nick"),
            sex: text(row, "Sex"),
            first_name: text(row, "FirstName"),
            last_name: text(row, "LastName"),
            travel_documents: text(row, "TravelDocuments"),
            loyalties: text(row, "Loyalties"),
        }),
        SourceKind::FlyerFlights => {
            // Joined profile columns are NULL when the nick has no profile
            let owner = if text(row, "Nick").is_empty() {
                None
            } else {
                Some(FlyerOwner {
                    first_name: text(row, "FirstName"),
                    last_name: text(row, "LastName"),
                    travel_documents: text(row, "TravelDocuments"),
                })
            };

            SourceRecord::FlyerFlight(FlyerFlightRecord {
                nick: text(row, "NickName"),
                flight_date: text(row, "FlightDate"),
                flight: text(row, "Flight"),
                codeshare: text(row, "Codeshare"),
                departure_city: text(row, "DepartureCity"),
                departure_airport: text(row, "DepartureAirport"),
                departure_country: text(row, "DepartureCountry"),
                arrival_city: text(row, "ArrivalCity"),
                arrival_airport: text(row, "ArrivalAirport"),
                arrival_country: text(row, "ArrivalCountry"),
                owner,
            })
        }
    }
}

/// Read a column as text whatever its storage class; missing or NULL reads as ""
fn text(row: &SqliteRow, column: &str) -> String {
    if let Ok(value) = row.try_get::<Option<String>, _>(column) {
        return value.unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(column) {
        return value.map(|v| v.to_string()).unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(column) {
        return value.map(|v| v.to_string()).unwrap_or_default();
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Connection;

    async fn connect() -> SqliteConnection {
        SqliteConnection::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_missing_table_is_empty_source() {
        let mut conn = connect().await;
        let batch = load_source(&mut conn, SourceKind::Sirena).await.unwrap();
        assert!(!batch.table_present);
        assert!(batch.records.is_empty());
    }

    #[tokio::test]
    async fn test_missing_columns_read_as_empty() {
        let mut conn = connect().await;
        sqlx::query("CREATE TABLE skyteam_data (FFNumber TEXT, FlightNumber TEXT)")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO skyteam_data VALUES ('SU 100', 'SU1234')")
            .execute(&mut conn)
            .await
            .unwrap();

        let batch = load_source(&mut conn, SourceKind::Skyteam).await.unwrap();
        assert_eq!(
            batch.records,
            vec![SourceRecord::Skyteam(SkyteamRecord {
                ff_number: "SU 100".into(),
                flight_number: "SU1234".into(),
                ..Default::default()
            })]
        );
    }

    #[tokio::test]
    async fn test_flights_join_owner_and_integer_codeshare() {
        let mut conn = connect().await;
        sqlx::query(
            "CREATE TABLE frequent_flyer_profiles (Nick TEXT PRIMARY KEY, Sex TEXT, \
             FirstName TEXT, LastName TEXT, TravelDocuments TEXT, Loyalties TEXT)",
        )
        .execute(&mut conn)
        .await
        .unwrap();
        sqlx::query(
            "CREATE TABLE frequent_flyer_flights (NickName TEXT, FlightDate TEXT, Flight TEXT, \
             Codeshare INTEGER, DepartureCity TEXT, DepartureAirport TEXT, DepartureCountry TEXT, \
             ArrivalCity TEXT, ArrivalAirport TEXT, ArrivalCountry TEXT)",
        )
        .execute(&mut conn)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO frequent_flyer_profiles VALUES ('jet', 'M', 'Ivan', 'Petrov', '[\"AB1\"]', '[]')",
        )
        .execute(&mut conn)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO frequent_flyer_flights VALUES \
             ('jet', '2017-01-01', 'SU10', 1, 'Moscow', 'SVO', 'Russia', 'Paris', 'CDG', 'France'), \
             ('ghost', '2017-01-02', 'SU11', 0, '', '', '', '', '', '')",
        )
        .execute(&mut conn)
        .await
        .unwrap();

        let batch = load_source(&mut conn, SourceKind::FlyerFlights).await.unwrap();
        assert_eq!(batch.records.len(), 2);

        match &batch.records[0] {
            SourceRecord::FlyerFlight(flight) => {
                assert_eq!(flight.codeshare, "1");
                let owner = flight.owner.as_ref().expect("owner joined");
                assert_eq!(owner.last_name, "Petrov");
                assert_eq!(owner.travel_documents, "[\"AB1\"]");
            }
            other => panic!("unexpected record {:?}", other),
        }
        match &batch.records[1] {
            SourceRecord::FlyerFlight(flight) => assert!(flight.owner.is_none()),
            other => panic!("unexpected record {:?}", other),
        }
    }
}
