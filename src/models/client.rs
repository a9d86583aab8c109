use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::Field;
use crate::error::ValidationError;
use crate::models::Note;

/// A client record as stored under the `clients` key.
///
/// A nil `id` marks a record that has not been added to the store yet.
/// Attributes imported from unrecognized columns land in `extra` and are
/// serialized next to the known fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Client {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub address: String,
    pub province: String,
    pub tax_id: String,
    pub dni: String,
    pub location: String,
    pub tags: Vec<String>,
    pub notes: Vec<Note>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Client {
    pub fn is_new(&self) -> bool {
        self.id.is_nil()
    }

    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        name.trim().to_string()
    }

    /// Text value of a scalar field; `None` for tags and notes.
    pub fn field(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::FirstName => &self.first_name,
            Field::LastName => &self.last_name,
            Field::Email => &self.email,
            Field::Phone => &self.phone,
            Field::Company => &self.company,
            Field::Address => &self.address,
            Field::Province => &self.province,
            Field::TaxId => &self.tax_id,
            Field::Dni => &self.dni,
            Field::Location => &self.location,
            Field::Tags | Field::Notes => return None,
        };
        Some(value.as_str())
    }

    pub fn field_mut(&mut self, field: Field) -> Option<&mut String> {
        let value = match field {
            Field::FirstName => &mut self.first_name,
            Field::LastName => &mut self.last_name,
            Field::Email => &mut self.email,
            Field::Phone => &mut self.phone,
            Field::Company => &mut self.company,
            Field::Address => &mut self.address,
            Field::Province => &mut self.province,
            Field::TaxId => &mut self.tax_id,
            Field::Dni => &mut self.dni,
            Field::Location => &mut self.location,
            Field::Tags | Field::Notes => return None,
        };
        Some(value)
    }

    /// Adds the tag if missing, removes it otherwise.
    pub fn toggle_tag(&mut self, tag: &str) {
        match self.tags.iter().position(|t| t == tag) {
            Some(index) => {
                self.tags.remove(index);
            }
            None => self.tags.push(tag.to_string()),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Required fields for an explicit add or edit
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::MissingFirstName);
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::MissingEmail);
        }
        Ok(())
    }
}
