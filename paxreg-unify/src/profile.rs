//! In-memory person profile built during consolidation

use paxreg_common::db::PersonRecord;
use paxreg_common::normalize::{is_placeholder, normalize_name, normalize_token};
use paxreg_common::{ScalarField, SetField};
use std::collections::BTreeSet;

/// Accumulator for one person's observed attributes
///
/// Scalars are first-come: a value is only taken while the field is still
/// empty. Sets collect every normalized, non-placeholder value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonProfile {
    scalars: [String; ScalarField::COUNT],
    sets: [BTreeSet<String>; SetField::COUNT],
}

impl PersonProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(&self, field: ScalarField) -> &str {
        &self.scalars[field.index()]
    }

    pub fn values(&self, field: SetField) -> &BTreeSet<String> {
        &self.sets[field.index()]
    }

    /// Populate a scalar if it is still empty
    ///
    /// Names go through `normalize_name`; other scalars are trimmed with
    /// placeholder suppression.
    pub fn fill_scalar(&mut self, field: ScalarField, raw: &str) {
        let slot = &mut self.scalars[field.index()];
        if !slot.is_empty() {
            return;
        }

        *slot = match field {
            ScalarField::FirstName | ScalarField::MiddleName | ScalarField::LastName => {
                normalize_name(raw)
            }
            ScalarField::Sex | ScalarField::BirthDate => normalize_token(raw).unwrap_or_default(),
        };
    }

    /// Add one value to a set field, returning the stored token
    ///
    /// Identifier fields go through `SetField::normalize_identifier`,
    /// everything else is a free-text token. Empty and placeholder values
    /// are skipped.
    pub fn add(&mut self, field: SetField, raw: &str) -> Option<String> {
        let token = if field.is_identifier() {
            Some(field.normalize_identifier(raw)).filter(|t| !t.is_empty())
        } else {
            normalize_token(raw)
        }?;

        self.sets[field.index()].insert(token.clone());
        Some(token)
    }

    /// Add an already composed flight token to FlightHistory
    pub fn add_flight(&mut self, token: Option<String>) {
        if let Some(token) = token {
            self.sets[SetField::FlightHistory.index()].insert(token);
        }
    }

    /// Serialize for persistence: sets become sorted comma-joined strings
    pub fn to_record(&self) -> PersonRecord {
        let mut record = PersonRecord::default();
        for field in ScalarField::ALL {
            record.set_scalar(field, self.scalar(field));
        }
        for field in SetField::ALL {
            let joined = self.values(field).iter().cloned().collect::<Vec<_>>().join(",");
            record.set_set(field, joined);
        }
        record
    }
}

/// Compose a human-readable flight token
///
/// Non-empty parts (flight number, date, optional time) are joined with a
/// single space; a codeshare annotation is appended in parentheses.
/// Returns `None` when every part is blank.
pub fn flight_token(parts: &[&str], codeshare: Option<&str>) -> Option<String> {
    let mut token = parts
        .iter()
        .filter_map(|part| normalize_token(part))
        .collect::<Vec<_>>()
        .join(" ");

    if token.is_empty() {
        return None;
    }

    if let Some(annotation) = codeshare.and_then(codeshare_annotation) {
        token.push_str(&format!(" ({})", annotation));
    }
    Some(token)
}

/// Codeshare column value worth annotating
///
/// Numeric/boolean flags collapse to `codeshare` or nothing; any other text
/// (typically the operating flight) is kept as is.
fn codeshare_annotation(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if is_placeholder(trimmed) {
        return None;
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "0" | "false" | "no" => None,
        "1" | "true" | "yes" => Some("codeshare".to_string()),
        _ => normalize_token(trimmed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_are_first_come() {
        let mut profile = PersonProfile::new();
        profile.fill_scalar(ScalarField::FirstName, "");
        profile.fill_scalar(ScalarField::FirstName, "john");
        profile.fill_scalar(ScalarField::FirstName, "Johnathan");
        assert_eq!(profile.scalar(ScalarField::FirstName), "JOHN");

        profile.fill_scalar(ScalarField::Sex, "Not Presented");
        assert_eq!(profile.scalar(ScalarField::Sex), "");
        profile.fill_scalar(ScalarField::Sex, " F ");
        assert_eq!(profile.scalar(ScalarField::Sex), "F");
    }

    #[test]
    fn test_identifier_tokens_deduplicate_after_normalization() {
        let mut profile = PersonProfile::new();
        profile.add(SetField::TravelDocuments, "AB123456");
        profile.add(SetField::TravelDocuments, "ab 123456");
        profile.add(SetField::TravelDocuments, "CD999");
        assert_eq!(profile.to_record().set(SetField::TravelDocuments), "AB123456,CD999");
    }

    #[test]
    fn test_placeholder_and_blank_values_skipped() {
        let mut profile = PersonProfile::new();
        assert_eq!(profile.add(SetField::Meals, "not presented"), None);
        assert_eq!(profile.add(SetField::Meals, "   "), None);
        assert_eq!(profile.add(SetField::LoyaltyNumbers, "Not Presented"), None);
        assert!(profile.values(SetField::Meals).is_empty());
        assert_eq!(profile.to_record().set(SetField::LoyaltyNumbers), "");
    }

    #[test]
    fn test_free_text_keeps_case_and_drops_commas() {
        let mut profile = PersonProfile::new();
        profile.add(SetField::AdditionalInfos, "Needs  wheelchair, aisle");
        assert_eq!(
            profile.to_record().set(SetField::AdditionalInfos),
            "Needs wheelchair; aisle"
        );
    }

    #[test]
    fn test_flight_token_composition() {
        assert_eq!(
            flight_token(&["SU1234", "2017-05-01", "10:30"], Some("AF 555")),
            Some("SU1234 2017-05-01 10:30 (AF 555)".to_string())
        );
        assert_eq!(
            flight_token(&["SU1234", "2017-05-01", ""], Some("0")),
            Some("SU1234 2017-05-01".to_string())
        );
        assert_eq!(
            flight_token(&["KL12", "2017-06-02"], Some("1")),
            Some("KL12 2017-06-02 (codeshare)".to_string())
        );
        assert_eq!(flight_token(&["", " "], Some("AF1")), None);
    }

    #[test]
    fn test_serialized_sets_are_sorted() {
        let mut profile = PersonProfile::new();
        profile.add(SetField::ArrivalCities, "Paris");
        profile.add(SetField::ArrivalCities, "Amsterdam");
        profile.add(SetField::ArrivalCities, "Paris");
        assert_eq!(profile.to_record().set(SetField::ArrivalCities), "Amsterdam,Paris");
    }
}
