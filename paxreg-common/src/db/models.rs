//! Person row model

use crate::{ScalarField, SetField};

/// Person attributes without identity (pre-insert form)
///
/// Set fields hold their serialized form: sorted, de-duplicated,
/// comma-joined tokens, or `""` when nothing was observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonRecord {
    scalars: [String; ScalarField::COUNT],
    sets: [String; SetField::COUNT],
}

impl PersonRecord {
    pub fn scalar(&self, field: ScalarField) -> &str {
        &self.scalars[field.index()]
    }

    pub fn set_scalar(&mut self, field: ScalarField, value: impl Into<String>) {
        self.scalars[field.index()] = value.into();
    }

    /// Serialized set column
    pub fn set(&self, field: SetField) -> &str {
        &self.sets[field.index()]
    }

    pub fn set_set(&mut self, field: SetField, value: impl Into<String>) {
        self.sets[field.index()] = value.into();
    }

    /// Builder form of `set_scalar`
    pub fn with_scalar(mut self, field: ScalarField, value: impl Into<String>) -> Self {
        self.set_scalar(field, value);
        self
    }

    /// Builder form of `set_set`
    pub fn with_set(mut self, field: SetField, value: impl Into<String>) -> Self {
        self.set_set(field, value);
        self
    }

    /// Split a set column into its trimmed, non-empty tokens
    pub fn tokens(&self, field: SetField) -> impl Iterator<Item = &str> {
        split_tokens(self.set(field))
    }
}

/// Persisted person: attributes plus stable `PersonID`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub person_id: i64,
    pub record: PersonRecord,
}

/// Split a serialized set value into trimmed, non-empty tokens
pub fn split_tokens(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|t| !t.is_empty())
}
