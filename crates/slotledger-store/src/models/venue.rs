//! Gaming locations and their invoices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::impl_entity;
use crate::entity::{CreateInput, UniqueKey, UpdateInput, non_empty, non_empty_opt, set};
use crate::error::Result;
use crate::models::SlotMachine;
use crate::relations::{BelongsTo, HasMany};
use crate::value::Value;

/// Invoice currency stored when none is given.
pub const DEFAULT_CURRENCY: &str = "RON";
/// Invoice status stored when none is given.
pub const DEFAULT_INVOICE_STATUS: &str = "pending";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    pub const SLOT_MACHINES: HasMany<Self, SlotMachine> = HasMany::new("location_id");
    pub const INVOICES: HasMany<Self, Invoice> = HasMany::new("location_id");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationKey {
    Id(String),
    Name(String),
}

impl UniqueKey for LocationKey {
    fn predicates(&self) -> Vec<(&'static str, Value)> {
        match self {
            Self::Id(id) => vec![("id", id.into())],
            Self::Name(name) => vec![("name", name.into())],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCreate {
    pub name: String,
    pub address: Option<String>,
}

impl LocationCreate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
        }
    }
}

impl CreateInput for LocationCreate {
    fn validate(&self) -> Result<()> {
        non_empty("name", &self.name)
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", (&self.name).into()),
            ("address", self.address.clone().into()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationUpdate {
    pub name: Option<String>,
    pub address: Option<Option<String>>,
}

impl UpdateInput for LocationUpdate {
    fn validate(&self) -> Result<()> {
        non_empty_opt("name", self.name.as_deref())
    }

    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        set(&mut out, "name", self.name.as_ref());
        set(&mut out, "address", self.address.as_ref());
        out
    }
}

impl_entity!(Location, Location, LocationKey, LocationCreate, LocationUpdate);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    /// Free-text serial reference; not a link to a slot machine.
    pub serial_number: Option<String>,
    pub location_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub const LOCATION: BelongsTo<Self, Location> =
        BelongsTo::new("location_id", |i| i.location_id.as_deref());
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceKey {
    Id(String),
    InvoiceNumber(String),
}

impl UniqueKey for InvoiceKey {
    fn predicates(&self) -> Vec<(&'static str, Value)> {
        match self {
            Self::Id(id) => vec![("id", id.into())],
            Self::InvoiceNumber(number) => vec![("invoice_number", number.into())],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceCreate {
    pub invoice_number: String,
    pub amount: f64,
    /// `None` stores [`DEFAULT_CURRENCY`].
    pub currency: Option<String>,
    /// `None` stores [`DEFAULT_INVOICE_STATUS`].
    pub status: Option<String>,
    pub serial_number: Option<String>,
    pub location_id: Option<String>,
}

impl InvoiceCreate {
    pub fn new(invoice_number: impl Into<String>, amount: f64) -> Self {
        Self {
            invoice_number: invoice_number.into(),
            amount,
            ..Self::default()
        }
    }
}

impl CreateInput for InvoiceCreate {
    fn validate(&self) -> Result<()> {
        non_empty("invoice_number", &self.invoice_number)?;
        non_empty_opt("currency", self.currency.as_deref())?;
        non_empty_opt("status", self.status.as_deref())
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        let mut out = vec![
            ("invoice_number", (&self.invoice_number).into()),
            ("amount", self.amount.into()),
            ("serial_number", self.serial_number.clone().into()),
            ("location_id", self.location_id.clone().into()),
        ];
        set(&mut out, "currency", self.currency.as_ref());
        set(&mut out, "status", self.status.as_ref());
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceUpdate {
    pub invoice_number: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub status: Option<String>,
    pub serial_number: Option<Option<String>>,
    pub location_id: Option<Option<String>>,
}

impl UpdateInput for InvoiceUpdate {
    fn validate(&self) -> Result<()> {
        non_empty_opt("invoice_number", self.invoice_number.as_deref())?;
        non_empty_opt("currency", self.currency.as_deref())?;
        non_empty_opt("status", self.status.as_deref())
    }

    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        set(&mut out, "invoice_number", self.invoice_number.as_ref());
        set(&mut out, "amount", self.amount.as_ref());
        set(&mut out, "currency", self.currency.as_ref());
        set(&mut out, "status", self.status.as_ref());
        set(&mut out, "serial_number", self.serial_number.as_ref());
        set(&mut out, "location_id", self.location_id.as_ref());
        out
    }
}

impl_entity!(Invoice, Invoice, InvoiceKey, InvoiceCreate, InvoiceUpdate);
