use super::{empty_string_as_none, ImportError};
use crate::metrics::identity::key_for;
use crate::metrics::PartnerKey;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Delivery details for a partner, kept apart from the appointment records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartnerContact {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub route: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ContactDirectory {
    entries: BTreeMap<PartnerKey, PartnerContact>,
}

impl ContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, partner: &str, contact: PartnerContact) {
        self.entries.insert(key_for(partner), contact);
    }

    pub fn get(&self, key: &PartnerKey) -> Option<&PartnerContact> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ImportError> {
        let file = File::open(path)?;
        Ok(Self::from_reader(file)?)
    }

    /// Reads a `Partner,Phone,Email,Appt Route` export; the first phone column that is filled wins.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let mut directory = Self::new();

        for row in csv_reader.deserialize::<ContactRow>() {
            let row = row?;
            if row.partner.trim().is_empty() {
                continue;
            }
            let phone = row.phone.or(row.phone_2).or(row.phone_3);
            directory.insert(
                &row.partner,
                PartnerContact {
                    phone,
                    email: row.email,
                    route: row.route,
                },
            );
        }

        Ok(directory)
    }
}

#[derive(Debug, Deserialize)]
struct ContactRow {
    #[serde(rename = "Partner", alias = "Name", default)]
    partner: String,
    #[serde(
        rename = "Phone",
        alias = "Phone 1",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    phone: Option<String>,
    #[serde(rename = "Phone 2", default, deserialize_with = "empty_string_as_none")]
    phone_2: Option<String>,
    #[serde(rename = "Phone 3", default, deserialize_with = "empty_string_as_none")]
    phone_3: Option<String>,
    #[serde(rename = "Email", default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    #[serde(
        rename = "Appt Route",
        alias = "Route",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    route: Option<String>,
}
