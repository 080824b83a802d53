//! Cross-source consolidation
//!
//! Drains every source in the configured order, resolves each record to a
//! profile through the identity indexes and folds its values in. The
//! resulting profiles are appended to the Person table in one transaction.

use crate::identity::{Fallback, IdentityIndex, IdentityKey, ProfileId};
use crate::profile::{flight_token, PersonProfile};
use crate::sources::{
    load_source, parse_list, BoardingPassRecord, BoardingRecord, FlyerFlightRecord,
    FlyerProfileRecord, PointzRecord, SirenaRecord, SkyteamRecord, SourceBatch, SourceRecord,
};
use paxreg_common::config::validate_source_order;
use paxreg_common::db::{insert_persons, PersonRecord, RegistryStore};
use paxreg_common::normalize::normalize_loyalty;
use paxreg_common::{Error, Result, ScalarField, SetField, SourceKind};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Per-run consolidation state: profile arena plus lookup indexes
///
/// Owned by one run and dropped with it, so separate runs never share
/// profiles or index entries.
#[derive(Debug, Default)]
pub struct ConsolidationContext {
    profiles: Vec<PersonProfile>,
    index: IdentityIndex,
}

impl ConsolidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn profile(&self, id: ProfileId) -> Option<&PersonProfile> {
        self.profiles.get(id)
    }

    /// Fold one record into its profile
    ///
    /// Returns `MalformedRecord` without touching any profile when the record
    /// cannot be keyed.
    pub fn ingest(&mut self, record: &SourceRecord) -> Result<ProfileId> {
        match record {
            SourceRecord::Boarding(r) => self.ingest_boarding(r),
            SourceRecord::BoardingPass(r) => self.ingest_boarding_pass(r),
            SourceRecord::Sirena(r) => self.ingest_sirena(r),
            SourceRecord::Pointz(r) => self.ingest_pointz(r),
            SourceRecord::Skyteam(r) => self.ingest_skyteam(r),
            SourceRecord::FlyerProfile(r) => self.ingest_flyer_profile(r),
            SourceRecord::FlyerFlight(r) => self.ingest_flyer_flight(r),
        }
    }

    /// Ingest a whole batch, skipping malformed records
    pub fn ingest_batch(&mut self, batch: &SourceBatch) -> Result<SourceStats> {
        let mut stats = SourceStats {
            source: batch.kind,
            table_present: batch.table_present,
            records: batch.records.len(),
            ingested: 0,
            skipped: 0,
        };

        for (position, record) in batch.records.iter().enumerate() {
            match self.ingest(record) {
                Ok(_) => stats.ingested += 1,
                Err(e) if e.is_recoverable() => {
                    debug!("Skipping {} row {}: {}", record.kind(), position + 1, e);
                    stats.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if stats.skipped > 0 {
            warn!(
                "Skipped {} of {} malformed {} records",
                stats.skipped, stats.records, batch.kind
            );
        }
        Ok(stats)
    }

    /// Serialize every profile in creation order
    pub fn into_records(self) -> Vec<PersonRecord> {
        self.profiles.iter().map(PersonProfile::to_record).collect()
    }

    fn ingest_boarding(&mut self, r: &BoardingRecord) -> Result<ProfileId> {
        let key = IdentityKey::derive(&r.first_name, &r.last_name, &r.birth_date, &r.document);
        require_name_or_document(SourceKind::Boarding, &key)?;

        let id = self.resolve(key, Fallback::None);
        let p = &mut self.profiles[id];
        p.fill_scalar(ScalarField::FirstName, &r.first_name);
        p.fill_scalar(ScalarField::MiddleName, &r.middle_name);
        p.fill_scalar(ScalarField::LastName, &r.last_name);
        p.fill_scalar(ScalarField::Sex, &r.sex);
        p.fill_scalar(ScalarField::BirthDate, &r.birth_date);

        p.add(SetField::TravelDocuments, &r.document);
        p.add(SetField::TicketNumbers, &r.ticket_number);
        p.add(SetField::BookingCodes, &r.booking_code);
        p.add_flight(flight_token(
            &[&r.flight_number, &r.flight_date, &r.flight_time],
            Some(&r.codeshare),
        ));
        p.add(SetField::ArrivalCities, &r.destination);
        p.add(SetField::Baggages, &r.baggage);
        Ok(id)
    }

    fn ingest_boarding_pass(&mut self, r: &BoardingPassRecord) -> Result<ProfileId> {
        let name = FullName::parse(&r.passenger_name);
        let key = IdentityKey::name_only(&name.first, &name.last);
        require_name_or_document(SourceKind::BoardingPass, &key)?;

        let id = self.resolve(key, Fallback::NamePair);
        let p = &mut self.profiles[id];
        p.fill_scalar(ScalarField::FirstName, &name.first);
        p.fill_scalar(ScalarField::MiddleName, &name.middle);
        p.fill_scalar(ScalarField::LastName, &name.last);

        p.add(SetField::LoyaltyPrograms, &r.loyalty_program);
        p.add(SetField::TicketNumbers, &r.eticket);
        p.add(SetField::BookingCodes, &r.pnr);
        p.add_flight(flight_token(
            &[&r.flight_number, &r.flight_date, &r.flight_time],
            None,
        ));
        p.add(SetField::DepartureCities, or_else(&r.departure_city, &r.departure_airport));
        p.add(SetField::ArrivalCities, or_else(&r.arrival_city, &r.arrival_airport));
        p.add(SetField::TravelClasses, &r.fare_class);
        self.add_loyalty(id, &r.loyalty_number);
        Ok(id)
    }

    fn ingest_sirena(&mut self, r: &SirenaRecord) -> Result<ProfileId> {
        let name = FullName::parse(&r.pax_name);
        let key = IdentityKey::derive(&name.first, &name.last, &r.birth_date, &r.travel_doc);
        require_name_or_document(SourceKind::Sirena, &key)?;

        let id = self.resolve(key, Fallback::None);
        let p = &mut self.profiles[id];
        p.fill_scalar(ScalarField::FirstName, &name.first);
        p.fill_scalar(ScalarField::MiddleName, &name.middle);
        p.fill_scalar(ScalarField::LastName, &name.last);
        p.fill_scalar(ScalarField::BirthDate, &r.birth_date);

        p.add(SetField::TravelDocuments, &r.travel_doc);
        p.add(SetField::TicketNumbers, &r.eticket);
        p.add(SetField::BookingCodes, &r.booking_code);
        p.add_flight(flight_token(
            &[&r.flight_code, &r.depart_date, &r.depart_time],
            None,
        ));
        p.add(SetField::DepartureCities, &r.from_airport);
        p.add(SetField::ArrivalCities, &r.destination);
        p.add(SetField::Seats, &r.seat);
        p.add(SetField::Meals, &r.meal);
        p.add(SetField::TravelClasses, &r.travel_class);
        p.add(SetField::FareBases, &r.fare);
        p.add(SetField::Baggages, &r.baggage);
        p.add(SetField::AdditionalInfos, &r.pax_info);
        p.add(SetField::AgentInfos, &r.agent_info);
        Ok(id)
    }

    fn ingest_pointz(&mut self, r: &PointzRecord) -> Result<ProfileId> {
        require_loyalty(SourceKind::Pointz, &r.card_number)?;
        let key = IdentityKey {
            document: normalize_loyalty(&r.card_number),
            ..IdentityKey::name_only(&r.first_name, &r.last_name)
        };

        let id = self.resolve(key, Fallback::Loyalty(r.card_number.clone()));
        let p = &mut self.profiles[id];
        p.fill_scalar(ScalarField::FirstName, &r.first_name);
        p.fill_scalar(ScalarField::LastName, &r.last_name);

        p.add(SetField::LoyaltyPrograms, &r.bonus_program);
        p.add_flight(flight_token(&[&r.flight_code, &r.flight_date], None));
        p.add(SetField::DepartureCities, &r.departure);
        p.add(SetField::ArrivalCities, &r.arrival);
        p.add(SetField::FareBases, &r.fare);
        self.add_loyalty(id, &r.card_number);
        Ok(id)
    }

    fn ingest_skyteam(&mut self, r: &SkyteamRecord) -> Result<ProfileId> {
        require_loyalty(SourceKind::Skyteam, &r.ff_number)?;
        let key = IdentityKey::loyalty_only(&r.ff_number);

        let id = self.resolve(key, Fallback::Loyalty(r.ff_number.clone()));
        let p = &mut self.profiles[id];
        p.add(SetField::LoyaltyPrograms, &r.ff_program);
        p.add_flight(flight_token(&[&r.flight_number, &r.flight_date], None));
        p.add(SetField::TravelClasses, &r.travel_class);
        p.add(SetField::FareBases, &r.fare);
        p.add(SetField::DepartureCities, &r.departure);
        p.add(SetField::ArrivalCities, &r.arrival);
        p.add(SetField::Statuses, &r.status);
        self.add_loyalty(id, &r.ff_number);
        Ok(id)
    }

    fn ingest_flyer_profile(&mut self, r: &FlyerProfileRecord) -> Result<ProfileId> {
        let documents = parse_list(&r.travel_documents);
        let primary = documents.first().map(|d| d.value.as_str()).unwrap_or("");
        let key = IdentityKey::derive(&r.first_name, &r.last_name, "", primary);
        require_name_or_document(SourceKind::FlyerProfiles, &key)?;

        let id = self.resolve(key, Fallback::None);
        let p = &mut self.profiles[id];
        p.fill_scalar(ScalarField::FirstName, &r.first_name);
        p.fill_scalar(ScalarField::LastName, &r.last_name);
        p.fill_scalar(ScalarField::Sex, &r.sex);

        for document in &documents {
            p.add(SetField::TravelDocuments, &document.value);
        }

        for membership in parse_list(&r.loyalties) {
            let p = &mut self.profiles[id];
            if let Some(program) = &membership.program {
                p.add(SetField::LoyaltyPrograms, program);
            }
            if let Some(status) = &membership.status {
                p.add(SetField::Statuses, status);
            }
            self.add_loyalty(id, &membership.value);
        }
        Ok(id)
    }

    fn ingest_flyer_flight(&mut self, r: &FlyerFlightRecord) -> Result<ProfileId> {
        let owner = r.owner.as_ref().ok_or_else(|| {
            Error::malformed(
                SourceKind::FlyerFlights.name(),
                format!("no profile for nick '{}'", r.nick),
            )
        })?;

        // Same derivation as the owning profile, so either may arrive first
        let documents = parse_list(&owner.travel_documents);
        let primary = documents.first().map(|d| d.value.as_str()).unwrap_or("");
        let key = IdentityKey::derive(&owner.first_name, &owner.last_name, "", primary);
        require_name_or_document(SourceKind::FlyerFlights, &key)?;

        let id = self.resolve(key, Fallback::None);
        let p = &mut self.profiles[id];
        p.fill_scalar(ScalarField::FirstName, &owner.first_name);
        p.fill_scalar(ScalarField::LastName, &owner.last_name);

        p.add_flight(flight_token(&[&r.flight, &r.flight_date], Some(&r.codeshare)));
        p.add(SetField::DepartureCities, or_else(&r.departure_city, &r.departure_airport));
        p.add(SetField::ArrivalCities, or_else(&r.arrival_city, &r.arrival_airport));
        p.add(SetField::DepartureCountries, &r.departure_country);
        p.add(SetField::ArrivalCountries, &r.arrival_country);
        Ok(id)
    }

    /// Exact key, then fallback index, then a new profile
    fn resolve(&mut self, key: IdentityKey, fallback: Fallback) -> ProfileId {
        if let Some(id) = self.index.lookup(&key, &fallback) {
            self.index.alias(key, id);
            return id;
        }

        let id = self.profiles.len();
        self.profiles.push(PersonProfile::new());
        self.index.register(key, id);
        id
    }

    /// Add a loyalty number and make it visible to the loyalty index
    fn add_loyalty(&mut self, id: ProfileId, raw: &str) {
        if let Some(token) = self.profiles[id].add(SetField::LoyaltyNumbers, raw) {
            self.index.register_loyalty(&token, id);
        }
    }
}

/// Per-source counters for one consolidation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub source: SourceKind,
    pub table_present: bool,
    pub records: usize,
    pub ingested: usize,
    pub skipped: usize,
}

/// Outcome of one consolidation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsolidationReport {
    pub sources: Vec<SourceStats>,
    pub profiles_inserted: usize,
    pub first_person_id: Option<i64>,
    pub last_person_id: Option<i64>,
    pub duration_ms: u128,
}

impl ConsolidationReport {
    pub fn records_read(&self) -> usize {
        self.sources.iter().map(|s| s.records).sum()
    }

    pub fn records_skipped(&self) -> usize {
        self.sources.iter().map(|s| s.skipped).sum()
    }
}

/// Consolidation phase with an explicit source processing order
///
/// The order decides which source supplies first-come scalars and which
/// profile an ambiguous fallback lookup attaches to.
#[derive(Debug, Clone)]
pub struct Consolidator {
    order: Vec<SourceKind>,
}

impl Default for Consolidator {
    fn default() -> Self {
        Self {
            order: SourceKind::DEFAULT_ORDER.to_vec(),
        }
    }
}

impl Consolidator {
    /// Build a consolidator; the order must not repeat a source
    pub fn new(order: Vec<SourceKind>) -> Result<Self> {
        validate_source_order(&order)?;
        Ok(Self { order })
    }

    /// Read every source from the store and append the resulting profiles
    pub async fn run(&self, store: &RegistryStore) -> Result<ConsolidationReport> {
        let start = Instant::now();
        let mut context = ConsolidationContext::new();
        let mut report = ConsolidationReport::default();

        info!(
            "Consolidating sources: {}",
            self.order
                .iter()
                .map(|k| k.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        {
            let mut conn = store
                .pool()
                .acquire()
                .await
                .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

            for kind in &self.order {
                let batch = load_source(&mut conn, *kind).await?;
                let stats = context.ingest_batch(&batch)?;
                info!(
                    "{}: {} records, {} ingested, {} skipped",
                    kind, stats.records, stats.ingested, stats.skipped
                );
                report.sources.push(stats);
            }
        }

        let records = context.into_records();
        let mut tx = store.begin().await?;
        let ids = insert_persons(&mut tx, &records).await?;
        RegistryStore::commit(tx).await?;

        report.profiles_inserted = ids.len();
        report.first_person_id = ids.first().copied();
        report.last_person_id = ids.last().copied();
        report.duration_ms = start.elapsed().as_millis();

        info!(
            "Consolidation complete: {} records read, {} skipped, {} persons inserted in {}ms",
            report.records_read(),
            report.records_skipped(),
            report.profiles_inserted,
            report.duration_ms
        );
        Ok(report)
    }
}

/// Name split from a single "LAST FIRST [MIDDLE...]" field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FullName {
    first: String,
    middle: String,
    last: String,
}

impl FullName {
    fn parse(raw: &str) -> Self {
        let cleaned = raw.replace('/', " ");
        let mut parts = cleaned.split_whitespace();
        let last = parts.next().unwrap_or_default().to_string();
        let first = parts.next().unwrap_or_default().to_string();
        let middle = parts.collect::<Vec<_>>().join(" ");
        Self { first, middle, last }
    }
}

fn require_name_or_document(kind: SourceKind, key: &IdentityKey) -> Result<()> {
    if key.first_name.is_empty() && key.last_name.is_empty() && key.document.is_empty() {
        return Err(Error::malformed(kind.name(), "no name and no document"));
    }
    Ok(())
}

fn require_loyalty(kind: SourceKind, number: &str) -> Result<()> {
    if normalize_loyalty(number).is_empty() {
        return Err(Error::malformed(kind.name(), "empty loyalty number"));
    }
    Ok(())
}

fn or_else<'a>(preferred: &'a str, fallback: &'a str) -> &'a str {
    if preferred.trim().is_empty() {
        fallback
    } else {
        preferred
    }
}
