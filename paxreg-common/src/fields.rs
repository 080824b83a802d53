//! Person field catalogue and upstream source kinds
//!
//! The Person table has five scalar text columns and eighteen set-valued
//! text columns. Column order here is the persisted column order.

use crate::normalize::{normalize_document, normalize_loyalty};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scalar person attributes, resolved to a single value per person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarField {
    FirstName,
    MiddleName,
    LastName,
    Sex,
    BirthDate,
}

impl ScalarField {
    pub const COUNT: usize = 5;

    pub const ALL: [ScalarField; Self::COUNT] = [
        ScalarField::FirstName,
        ScalarField::MiddleName,
        ScalarField::LastName,
        ScalarField::Sex,
        ScalarField::BirthDate,
    ];

    /// Person table column name
    pub fn column(self) -> &'static str {
        match self {
            ScalarField::FirstName => "FirstName",
            ScalarField::MiddleName => "MiddleName",
            ScalarField::LastName => "LastName",
            ScalarField::Sex => "Sex",
            ScalarField::BirthDate => "BirthDate",
        }
    }

    /// Position within `ALL`
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Set-valued person attributes, stored as sorted comma-joined tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SetField {
    TravelDocuments,
    LoyaltyNumbers,
    TicketNumbers,
    BookingCodes,
    FlightHistory,
    DepartureCities,
    ArrivalCities,
    LoyaltyPrograms,
    Meals,
    TravelClasses,
    FareBases,
    Baggages,
    Seats,
    Statuses,
    DepartureCountries,
    ArrivalCountries,
    AdditionalInfos,
    AgentInfos,
}

impl SetField {
    pub const COUNT: usize = 18;

    pub const ALL: [SetField; Self::COUNT] = [
        SetField::TravelDocuments,
        SetField::LoyaltyNumbers,
        SetField::TicketNumbers,
        SetField::BookingCodes,
        SetField::FlightHistory,
        SetField::DepartureCities,
        SetField::ArrivalCities,
        SetField::LoyaltyPrograms,
        SetField::Meals,
        SetField::TravelClasses,
        SetField::FareBases,
        SetField::Baggages,
        SetField::Seats,
        SetField::Statuses,
        SetField::DepartureCountries,
        SetField::ArrivalCountries,
        SetField::AdditionalInfos,
        SetField::AgentInfos,
    ];

    /// Person table column name
    pub fn column(self) -> &'static str {
        match self {
            SetField::TravelDocuments => "TravelDocuments",
            SetField::LoyaltyNumbers => "LoyaltyNumbers",
            SetField::TicketNumbers => "TicketNumbers",
            SetField::BookingCodes => "BookingCodes",
            SetField::FlightHistory => "FlightHistory",
            SetField::DepartureCities => "DepartureCities",
            SetField::ArrivalCities => "ArrivalCities",
            SetField::LoyaltyPrograms => "LoyaltyPrograms",
            SetField::Meals => "Meals",
            SetField::TravelClasses => "TravelClasses",
            SetField::FareBases => "FareBases",
            SetField::Baggages => "Baggages",
            SetField::Seats => "Seats",
            SetField::Statuses => "Statuses",
            SetField::DepartureCountries => "DepartureCountries",
            SetField::ArrivalCountries => "ArrivalCountries",
            SetField::AdditionalInfos => "AdditionalInfos",
            SetField::AgentInfos => "AgentInfos",
        }
    }

    /// Position within `ALL`
    pub fn index(self) -> usize {
        self as usize
    }

    /// Identifier columns hold document-style tokens (no whitespace, upper case)
    pub fn is_identifier(self) -> bool {
        matches!(
            self,
            SetField::TravelDocuments
                | SetField::LoyaltyNumbers
                | SetField::TicketNumbers
                | SetField::BookingCodes
        )
    }

    /// Canonical form of an identifier token stored in this column
    ///
    /// Loyalty numbers lose their program code; other identifiers are
    /// normalized as documents. Commas become `;`.
    pub fn normalize_identifier(self, raw: &str) -> String {
        let normalized = match self {
            SetField::LoyaltyNumbers => normalize_loyalty(raw),
            _ => normalize_document(raw),
        };
        normalized.replace(',', ";")
    }
}

/// Upstream collaborator tables read by the consolidator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Boarding,
    BoardingPass,
    Sirena,
    Pointz,
    Skyteam,
    FlyerProfiles,
    FlyerFlights,
}

impl SourceKind {
    /// Default processing order
    pub const DEFAULT_ORDER: [SourceKind; 7] = [
        SourceKind::Boarding,
        SourceKind::BoardingPass,
        SourceKind::Sirena,
        SourceKind::Pointz,
        SourceKind::Skyteam,
        SourceKind::FlyerProfiles,
        SourceKind::FlyerFlights,
    ];

    /// Configuration / CLI name
    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Boarding => "boarding",
            SourceKind::BoardingPass => "boarding_pass",
            SourceKind::Sirena => "sirena",
            SourceKind::Pointz => "pointz",
            SourceKind::Skyteam => "skyteam",
            SourceKind::FlyerProfiles => "flyer_profiles",
            SourceKind::FlyerFlights => "flyer_flights",
        }
    }

    /// Table the upstream parser writes
    pub fn table(self) -> &'static str {
        match self {
            SourceKind::Boarding => "boarding_data",
            SourceKind::BoardingPass => "boarding_pass_xls",
            SourceKind::Sirena => "sirena_data",
            SourceKind::Pointz => "pointz_aggregator_data",
            SourceKind::Skyteam => "skyteam_data",
            SourceKind::FlyerProfiles => "frequent_flyer_profiles",
            SourceKind::FlyerFlights => "frequent_flyer_flights",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::DEFAULT_ORDER
            .into_iter()
            .find(|kind| kind.name() == s.trim())
            .ok_or_else(|| crate::Error::Config(format!("Unknown source: {}", s)))
    }
}
