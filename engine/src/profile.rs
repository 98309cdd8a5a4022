//! Profile fields and the registration-time capture buffer.

use crate::store::list::{decode_list, encode_list};
use crate::store::DataType;

/// Placeholder for a buffer slot that holds no value.
pub const SENTINEL: &str = "0";

/// Editable profile fields, in buffer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    FirstName,
    FamilyName,
    Gender,
    YearOfBirth,
    Location,
    Offerings,
}

impl ProfileField {
    pub const ALL: [ProfileField; 6] = [
        ProfileField::FirstName,
        ProfileField::FamilyName,
        ProfileField::Gender,
        ProfileField::YearOfBirth,
        ProfileField::Location,
        ProfileField::Offerings,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn data_type(self) -> DataType {
        match self {
            ProfileField::FirstName => DataType::FIRST_NAME,
            ProfileField::FamilyName => DataType::FAMILY_NAME,
            ProfileField::Gender => DataType::GENDER,
            ProfileField::YearOfBirth => DataType::YOB,
            ProfileField::Location => DataType::LOCATION,
            ProfileField::Offerings => DataType::OFFERINGS,
        }
    }

    /// Flag raised once the field has a permanent value.
    pub fn flag_name(self) -> &'static str {
        match self {
            ProfileField::FirstName => "flag_firstname_set",
            ProfileField::FamilyName => "flag_familyname_set",
            ProfileField::Gender => "flag_gender_set",
            ProfileField::YearOfBirth => "flag_yob_set",
            ProfileField::Location => "flag_location_set",
            ProfileField::Offerings => "flag_offerings_set",
        }
    }
}

/// Ordered buffer of captured profile values, at most one per field.
///
/// Slots without a value hold [`SENTINEL`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileBuffer {
    items: Vec<String>,
}

impl ProfileBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(encoded: &str) -> Self {
        let mut items = decode_list(encoded);
        items.truncate(ProfileField::ALL.len());
        Self { items }
    }

    pub fn encode(&self) -> String {
        encode_list(&self.items)
    }

    /// Store `value` at `index`. Later slots are discarded; missing earlier
    /// slots are padded with the sentinel.
    pub fn insert_or_shift(&mut self, index: usize, value: &str) {
        if index >= ProfileField::ALL.len() {
            return;
        }
        if index < self.items.len() {
            self.items.truncate(index);
        } else {
            self.items.resize(index, SENTINEL.to_string());
        }
        self.items.push(value.to_string());
    }

    /// Value captured for a field, if any.
    pub fn get(&self, field: ProfileField) -> Option<&str> {
        self.items
            .get(field.index())
            .map(String::as_str)
            .filter(|v| !v.is_empty() && *v != SENTINEL)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
