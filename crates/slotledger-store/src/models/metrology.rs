//! Metrology records: commissions, authorities, certificates, approvals and
//! certified software.
//!
//! `data_emitere` is the issue date and `data_expirare` the expiry date of a
//! certificate or approval. Approvals and software may reference a provider,
//! cabinet and game mix independently; nothing ties those links together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::impl_entity;
use crate::entity::{
    CreateInput, IdKey, UpdateInput, non_empty, non_empty_opt, ordered_dates, set,
};
use crate::error::Result;
use crate::models::{Cabinet, GameMix, Provider};
use crate::relations::{BelongsTo, HasMany};
use crate::value::Value;

// ============================================================================
// MetrologyCommission
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MetrologyCommission {
    pub id: String,
    pub name: String,
    pub serial_numbers: Option<String>,
    pub data_emitere: Option<DateTime<Utc>>,
    pub data_expirare: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetrologyCommissionCreate {
    pub name: String,
    pub serial_numbers: Option<String>,
    pub data_emitere: Option<DateTime<Utc>>,
    pub data_expirare: Option<DateTime<Utc>>,
}

impl CreateInput for MetrologyCommissionCreate {
    fn validate(&self) -> Result<()> {
        non_empty("name", &self.name)?;
        ordered_dates(self.data_emitere, self.data_expirare)
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", (&self.name).into()),
            ("serial_numbers", self.serial_numbers.clone().into()),
            ("data_emitere", self.data_emitere.into()),
            ("data_expirare", self.data_expirare.into()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetrologyCommissionUpdate {
    pub name: Option<String>,
    pub serial_numbers: Option<Option<String>>,
    pub data_emitere: Option<Option<DateTime<Utc>>>,
    pub data_expirare: Option<Option<DateTime<Utc>>>,
}

impl UpdateInput for MetrologyCommissionUpdate {
    fn validate(&self) -> Result<()> {
        non_empty_opt("name", self.name.as_deref())?;
        ordered_dates(self.data_emitere.flatten(), self.data_expirare.flatten())
    }

    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        set(&mut out, "name", self.name.as_ref());
        set(&mut out, "serial_numbers", self.serial_numbers.as_ref());
        set(&mut out, "data_emitere", self.data_emitere.as_ref());
        set(&mut out, "data_expirare", self.data_expirare.as_ref());
        out
    }
}

impl_entity!(
    MetrologyCommission,
    MetrologyCommission,
    IdKey,
    MetrologyCommissionCreate,
    MetrologyCommissionUpdate,
    check(record) { ordered_dates(record.data_emitere, record.data_expirare) }
);

// ============================================================================
// MetrologyAuthority
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MetrologyAuthority {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub contact: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetrologyAuthorityCreate {
    pub name: String,
    pub address: Option<String>,
    pub contact: Option<String>,
}

impl CreateInput for MetrologyAuthorityCreate {
    fn validate(&self) -> Result<()> {
        non_empty("name", &self.name)
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", (&self.name).into()),
            ("address", self.address.clone().into()),
            ("contact", self.contact.clone().into()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetrologyAuthorityUpdate {
    pub name: Option<String>,
    pub address: Option<Option<String>>,
    pub contact: Option<Option<String>>,
}

impl UpdateInput for MetrologyAuthorityUpdate {
    fn validate(&self) -> Result<()> {
        non_empty_opt("name", self.name.as_deref())
    }

    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        set(&mut out, "name", self.name.as_ref());
        set(&mut out, "address", self.address.as_ref());
        set(&mut out, "contact", self.contact.as_ref());
        out
    }
}

impl_entity!(
    MetrologyAuthority,
    MetrologyAuthority,
    IdKey,
    MetrologyAuthorityCreate,
    MetrologyAuthorityUpdate
);

// ============================================================================
// Metrology (certificate)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Metrology {
    pub id: String,
    /// Free-text serial reference of the certified machine.
    pub serial_number: String,
    pub certificate_type: Option<String>,
    pub certificate_number: Option<String>,
    pub data_emitere: Option<DateTime<Utc>>,
    pub data_expirare: Option<DateTime<Utc>>,
    /// Issuing authority, by name.
    pub authority: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetrologyCreate {
    pub serial_number: String,
    pub certificate_type: Option<String>,
    pub certificate_number: Option<String>,
    pub data_emitere: Option<DateTime<Utc>>,
    pub data_expirare: Option<DateTime<Utc>>,
    pub authority: Option<String>,
}

impl CreateInput for MetrologyCreate {
    fn validate(&self) -> Result<()> {
        non_empty("serial_number", &self.serial_number)?;
        ordered_dates(self.data_emitere, self.data_expirare)
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("serial_number", (&self.serial_number).into()),
            ("certificate_type", self.certificate_type.clone().into()),
            ("certificate_number", self.certificate_number.clone().into()),
            ("data_emitere", self.data_emitere.into()),
            ("data_expirare", self.data_expirare.into()),
            ("authority", self.authority.clone().into()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetrologyUpdate {
    pub serial_number: Option<String>,
    pub certificate_type: Option<Option<String>>,
    pub certificate_number: Option<Option<String>>,
    pub data_emitere: Option<Option<DateTime<Utc>>>,
    pub data_expirare: Option<Option<DateTime<Utc>>>,
    pub authority: Option<Option<String>>,
}

impl UpdateInput for MetrologyUpdate {
    fn validate(&self) -> Result<()> {
        non_empty_opt("serial_number", self.serial_number.as_deref())?;
        ordered_dates(self.data_emitere.flatten(), self.data_expirare.flatten())
    }

    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        set(&mut out, "serial_number", self.serial_number.as_ref());
        set(&mut out, "certificate_type", self.certificate_type.as_ref());
        set(&mut out, "certificate_number", self.certificate_number.as_ref());
        set(&mut out, "data_emitere", self.data_emitere.as_ref());
        set(&mut out, "data_expirare", self.data_expirare.as_ref());
        set(&mut out, "authority", self.authority.as_ref());
        out
    }
}

impl_entity!(
    Metrology,
    Metrology,
    IdKey,
    MetrologyCreate,
    MetrologyUpdate,
    check(record) { ordered_dates(record.data_emitere, record.data_expirare) }
);

// ============================================================================
// MetrologySoftware
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MetrologySoftware {
    pub id: String,
    pub name: String,
    pub version: Option<String>,
    pub serial_numbers: Option<String>,
    pub provider_id: Option<String>,
    pub cabinet_id: Option<String>,
    pub game_mix_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MetrologySoftware {
    pub const PROVIDER: BelongsTo<Self, Provider> =
        BelongsTo::new("provider_id", |s| s.provider_id.as_deref());
    pub const CABINET: BelongsTo<Self, Cabinet> =
        BelongsTo::new("cabinet_id", |s| s.cabinet_id.as_deref());
    pub const GAME_MIX: BelongsTo<Self, GameMix> =
        BelongsTo::new("game_mix_id", |s| s.game_mix_id.as_deref());
    pub const APPROVALS: HasMany<Self, MetrologyApproval> =
        HasMany::new("metrology_software_id");
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetrologySoftwareCreate {
    pub name: String,
    pub version: Option<String>,
    pub serial_numbers: Option<String>,
    pub provider_id: Option<String>,
    pub cabinet_id: Option<String>,
    pub game_mix_id: Option<String>,
}

impl CreateInput for MetrologySoftwareCreate {
    fn validate(&self) -> Result<()> {
        non_empty("name", &self.name)
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", (&self.name).into()),
            ("version", self.version.clone().into()),
            ("serial_numbers", self.serial_numbers.clone().into()),
            ("provider_id", self.provider_id.clone().into()),
            ("cabinet_id", self.cabinet_id.clone().into()),
            ("game_mix_id", self.game_mix_id.clone().into()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetrologySoftwareUpdate {
    pub name: Option<String>,
    pub version: Option<Option<String>>,
    pub serial_numbers: Option<Option<String>>,
    pub provider_id: Option<Option<String>>,
    pub cabinet_id: Option<Option<String>>,
    pub game_mix_id: Option<Option<String>>,
}

impl UpdateInput for MetrologySoftwareUpdate {
    fn validate(&self) -> Result<()> {
        non_empty_opt("name", self.name.as_deref())
    }

    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        set(&mut out, "name", self.name.as_ref());
        set(&mut out, "version", self.version.as_ref());
        set(&mut out, "serial_numbers", self.serial_numbers.as_ref());
        set(&mut out, "provider_id", self.provider_id.as_ref());
        set(&mut out, "cabinet_id", self.cabinet_id.as_ref());
        set(&mut out, "game_mix_id", self.game_mix_id.as_ref());
        out
    }
}

impl_entity!(
    MetrologySoftware,
    MetrologySoftware,
    IdKey,
    MetrologySoftwareCreate,
    MetrologySoftwareUpdate
);

// ============================================================================
// MetrologyApproval
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MetrologyApproval {
    pub id: String,
    pub name: String,
    pub data_emitere: Option<DateTime<Utc>>,
    pub data_expirare: Option<DateTime<Utc>>,
    pub provider_id: Option<String>,
    pub cabinet_id: Option<String>,
    pub game_mix_id: Option<String>,
    pub metrology_software_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MetrologyApproval {
    pub const PROVIDER: BelongsTo<Self, Provider> =
        BelongsTo::new("provider_id", |a| a.provider_id.as_deref());
    pub const CABINET: BelongsTo<Self, Cabinet> =
        BelongsTo::new("cabinet_id", |a| a.cabinet_id.as_deref());
    pub const GAME_MIX: BelongsTo<Self, GameMix> =
        BelongsTo::new("game_mix_id", |a| a.game_mix_id.as_deref());
    pub const SOFTWARE: BelongsTo<Self, MetrologySoftware> =
        BelongsTo::new("metrology_software_id", |a| a.metrology_software_id.as_deref());
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetrologyApprovalCreate {
    pub name: String,
    pub data_emitere: Option<DateTime<Utc>>,
    pub data_expirare: Option<DateTime<Utc>>,
    pub provider_id: Option<String>,
    pub cabinet_id: Option<String>,
    pub game_mix_id: Option<String>,
    pub metrology_software_id: Option<String>,
}

impl CreateInput for MetrologyApprovalCreate {
    fn validate(&self) -> Result<()> {
        non_empty("name", &self.name)?;
        ordered_dates(self.data_emitere, self.data_expirare)
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", (&self.name).into()),
            ("data_emitere", self.data_emitere.into()),
            ("data_expirare", self.data_expirare.into()),
            ("provider_id", self.provider_id.clone().into()),
            ("cabinet_id", self.cabinet_id.clone().into()),
            ("game_mix_id", self.game_mix_id.clone().into()),
            (
                "metrology_software_id",
                self.metrology_software_id.clone().into(),
            ),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetrologyApprovalUpdate {
    pub name: Option<String>,
    pub data_emitere: Option<Option<DateTime<Utc>>>,
    pub data_expirare: Option<Option<DateTime<Utc>>>,
    pub provider_id: Option<Option<String>>,
    pub cabinet_id: Option<Option<String>>,
    pub game_mix_id: Option<Option<String>>,
    pub metrology_software_id: Option<Option<String>>,
}

impl UpdateInput for MetrologyApprovalUpdate {
    fn validate(&self) -> Result<()> {
        non_empty_opt("name", self.name.as_deref())?;
        ordered_dates(self.data_emitere.flatten(), self.data_expirare.flatten())
    }

    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        set(&mut out, "name", self.name.as_ref());
        set(&mut out, "data_emitere", self.data_emitere.as_ref());
        set(&mut out, "data_expirare", self.data_expirare.as_ref());
        set(&mut out, "provider_id", self.provider_id.as_ref());
        set(&mut out, "cabinet_id", self.cabinet_id.as_ref());
        set(&mut out, "game_mix_id", self.game_mix_id.as_ref());
        set(
            &mut out,
            "metrology_software_id",
            self.metrology_software_id.as_ref(),
        );
        out
    }
}

impl_entity!(
    MetrologyApproval,
    MetrologyApproval,
    IdKey,
    MetrologyApprovalCreate,
    MetrologyApprovalUpdate,
    check(record) { ordered_dates(record.data_emitere, record.data_expirare) }
);
