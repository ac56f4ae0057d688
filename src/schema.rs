//! Field metadata for remote tables.
//!
//! Type coercion happens outside this crate, so a field only carries what the
//! URL builders need: its storage column, the prefix tag the server expects in
//! front of a value, and whether it may be empty or edited.

use std::borrow::Cow;

use crate::error::{EwizError, EwizResult};

/// Prefix tag that marks a model's attachment field.
pub const FILE_PREFIX: &str = "file";

/// Column used when a model declares no primary key.
pub const DEFAULT_PK: &str = "id";

/// One field of a remote table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub column: String,
    pub prefix: String,
    pub nullable: bool,
    pub editable: bool,
    pub primary_key: bool,
}

impl Field {
    /// A nullable, editable field stored under its own name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            prefix: String::new(),
            nullable: true,
            editable: true,
            primary_key: false,
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }
}

/// A remote table and its declared fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub name: String,
    pub table: String,
    pub fields: Vec<Field>,
    adhoc: bool,
}

impl Model {
    pub fn new(name: impl Into<String>, table: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            fields,
            adhoc: false,
        }
    }

    /// A model without declarations. Any field name resolves to a nullable,
    /// editable field stored under the same column.
    pub fn adhoc(table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            name: table.clone(),
            table,
            fields: Vec::new(),
            adhoc: true,
        }
    }

    /// Declared field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field by name, synthesized for ad hoc models.
    pub fn resolve(&self, name: &str) -> EwizResult<Cow<'_, Field>> {
        match self.field(name) {
            Some(field) => Ok(Cow::Borrowed(field)),
            None if self.adhoc => {
                let field = Field::new(name).primary_key(name == DEFAULT_PK);
                Ok(Cow::Owned(field))
            }
            None => Err(EwizError::unknown_field(&self.name, name)),
        }
    }

    /// Declared primary key field.
    pub fn pk(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Storage column of the primary key.
    pub fn pk_column(&self) -> &str {
        self.pk().map(|f| f.column.as_str()).unwrap_or(DEFAULT_PK)
    }

    /// Whether `name` is the primary key field.
    pub fn is_pk(&self, name: &str) -> bool {
        match self.pk() {
            Some(pk) => pk.name == name,
            None => name == DEFAULT_PK,
        }
    }

    /// The field that receives attachments.
    pub fn file_field(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.prefix == FILE_PREFIX)
    }
}
