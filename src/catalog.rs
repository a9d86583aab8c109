//! Canonical client fields and the spreadsheet header aliases that map onto them.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Tags offered by the client form before any client carries them.
pub const SUGGESTED_TAGS: [&str; 3] = ["Nuevo", "Activo", "Inactivo"];

/// A recognized client attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    FirstName,
    LastName,
    Email,
    Phone,
    Company,
    Address,
    Province,
    TaxId,
    Dni,
    Location,
    Tags,
    Notes,
}

impl Field {
    /// Catalog order, which is also the export column order
    pub const ALL: [Field; 12] = [
        Field::FirstName,
        Field::LastName,
        Field::Email,
        Field::Phone,
        Field::Company,
        Field::Address,
        Field::Province,
        Field::TaxId,
        Field::Dni,
        Field::Location,
        Field::Tags,
        Field::Notes,
    ];

    /// Name used for storage keys and export headers
    pub fn as_str(self) -> &'static str {
        match self {
            Field::FirstName => "firstName",
            Field::LastName => "lastName",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::Company => "company",
            Field::Address => "address",
            Field::Province => "province",
            Field::TaxId => "taxId",
            Field::Dni => "dni",
            Field::Location => "location",
            Field::Tags => "tags",
            Field::Notes => "notes",
        }
    }

    /// Human readable label for forms and dialogs
    pub fn label(self) -> &'static str {
        match self {
            Field::FirstName => "First name",
            Field::LastName => "Last name",
            Field::Email => "Email",
            Field::Phone => "Phone",
            Field::Company => "Company",
            Field::Address => "Address",
            Field::Province => "Province",
            Field::TaxId => "Tax id",
            Field::Dni => "DNI",
            Field::Location => "Location",
            Field::Tags => "Tags",
            Field::Notes => "Notes",
        }
    }

    /// Matches a header against the catalog, ignoring case, whitespace and underscores.
    pub fn from_header(header: &str) -> Option<Field> {
        let key = normalize_header(header);
        Field::ALL
            .into_iter()
            .find(|field| normalize_header(field.as_str()) == key)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::from_header(s).ok_or_else(|| Error::UnknownField(s.to_string()))
    }
}

/// Known header spellings, keyed by their normalized form.
const ALIASES: &[(&str, Field)] = &[
    ("firstname", Field::FirstName),
    ("nombre", Field::FirstName),
    ("lastname", Field::LastName),
    ("apellido", Field::LastName),
    ("correo", Field::Email),
    ("mail", Field::Email),
    ("telefono", Field::Phone),
    ("celular", Field::Phone),
    ("empresa", Field::Company),
    ("direccion", Field::Address),
    ("provincia", Field::Province),
    ("cuil", Field::TaxId),
    ("cuit", Field::TaxId),
    ("dni", Field::Dni),
    ("ubicacion", Field::Location),
    ("tags", Field::Tags),
    ("etiquetas", Field::Tags),
    ("notas", Field::Notes),
];

/// Lower-cases a header and strips whitespace and underscores.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Looks up the alias table with the normalized form of `header`.
pub fn alias(header: &str) -> Option<Field> {
    let key = normalize_header(header);
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, field)| *field)
}

/// Canonical match first, then the alias table.
pub fn resolve_field(header: &str) -> Option<Field> {
    Field::from_header(header).or_else(|| alias(header))
}
