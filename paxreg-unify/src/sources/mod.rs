//! Upstream source records
//!
//! Each upstream parser writes one table; the consolidator reads them as
//! typed records. Field values are raw text exactly as the parser stored
//! it; normalization happens during consolidation.

mod lists;
mod loader;

pub use lists::{parse_list, ListEntry};
pub use loader::{load_source, SourceBatch};

use paxreg_common::SourceKind;

/// Row of `boarding_data` (delimited boarding export)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardingRecord {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub sex: String,
    pub birth_date: String,
    pub document: String,
    pub booking_code: String,
    pub ticket_number: String,
    pub baggage: String,
    pub flight_date: String,
    pub flight_time: String,
    pub flight_number: String,
    pub codeshare: String,
    pub destination: String,
}

/// Row of `boarding_pass_xls` (one boarding pass spreadsheet)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardingPassRecord {
    pub title: String,
    /// "LAST FIRST [MIDDLE]"
    pub passenger_name: String,
    pub loyalty_program: String,
    pub loyalty_number: String,
    pub fare_class: String,
    pub flight_number: String,
    pub departure_city: String,
    pub arrival_city: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub flight_date: String,
    pub flight_time: String,
    pub pnr: String,
    pub eticket: String,
}

/// Row of `sirena_data` (fixed-width reservation export)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SirenaRecord {
    /// "LAST FIRST [MIDDLE]"
    pub pax_name: String,
    pub birth_date: String,
    pub depart_date: String,
    pub depart_time: String,
    pub arrival_date: String,
    pub arrival_time: String,
    pub flight_code: String,
    pub from_airport: String,
    pub destination: String,
    pub booking_code: String,
    pub eticket: String,
    pub travel_doc: String,
    pub seat: String,
    pub meal: String,
    pub travel_class: String,
    pub fare: String,
    pub baggage: String,
    pub pax_info: String,
    pub agent_info: String,
}

/// Row of `pointz_aggregator_data` (loyalty aggregator feed)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointzRecord {
    pub user_uid: String,
    pub first_name: String,
    pub last_name: String,
    pub card_number: String,
    pub bonus_program: String,
    pub flight_code: String,
    pub flight_date: String,
    pub departure: String,
    pub arrival: String,
    pub fare: String,
}

/// Row of `skyteam_data` (alliance exchange, keyed by FF number only)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkyteamRecord {
    pub flight_date: String,
    pub flight_number: String,
    pub ff_program: String,
    /// Usually "<PROGRAM> <NUMBER>"
    pub ff_number: String,
    pub travel_class: String,
    pub fare: String,
    pub departure: String,
    pub arrival: String,
    pub status: String,
}

/// Row of `frequent_flyer_profiles` (forum profile)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlyerProfileRecord {
    pub nick: String,
    pub sex: String,
    pub first_name: String,
    pub last_name: String,
    /// JSON list (or plain delimited text) of travel documents
    pub travel_documents: String,
    /// JSON list (or plain delimited text) of loyalty memberships
    pub loyalties: String,
}

/// Identity fields of the profile that owns a forum flight
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlyerOwner {
    pub first_name: String,
    pub last_name: String,
    pub travel_documents: String,
}

/// Row of `frequent_flyer_flights` joined with its owning profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlyerFlightRecord {
    pub nick: String,
    pub flight_date: String,
    pub flight: String,
    pub codeshare: String,
    pub departure_city: String,
    pub departure_airport: String,
    pub departure_country: String,
    pub arrival_city: String,
    pub arrival_airport: String,
    pub arrival_country: String,
    /// `None` when no profile carries this nick
    pub owner: Option<FlyerOwner>,
}

/// One record handed to the consolidator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRecord {
    Boarding(BoardingRecord),
    BoardingPass(BoardingPassRecord),
    Sirena(SirenaRecord),
    Pointz(PointzRecord),
    Skyteam(SkyteamRecord),
    FlyerProfile(FlyerProfileRecord),
    FlyerFlight(FlyerFlightRecord),
}

impl SourceRecord {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceRecord::Boarding(_) => SourceKind::Boarding,
            SourceRecord::BoardingPass(_) => SourceKind::BoardingPass,
            SourceRecord::Sirena(_) => SourceKind::Sirena,
            SourceRecord::Pointz(_) => SourceKind::Pointz,
            SourceRecord::Skyteam(_) => SourceKind::Skyteam,
            SourceRecord::FlyerProfile(_) => SourceKind::FlyerProfiles,
            SourceRecord::FlyerFlight(_) => SourceKind::FlyerFlights,
        }
    }
}
