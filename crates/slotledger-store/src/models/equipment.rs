//! Providers and the equipment they supply: cabinets, game mixes and slot machines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::impl_entity;
use crate::entity::{
    CreateInput, UniqueKey, UpdateInput, at_least, in_range, non_empty, non_empty_opt,
    non_negative, set,
};
use crate::error::Result;
use crate::models::{Location, MetrologyApproval, MetrologySoftware};
use crate::relations::{BelongsTo, HasMany};
use crate::value::Value;

/// Slot machine status stored when none is given.
pub const DEFAULT_SLOT_MACHINE_STATUS: &str = "active";
/// Gaming places stored when none is given.
pub const DEFAULT_GAMING_PLACES: i64 = 1;

// ============================================================================
// Provider
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Provider {
    pub const CABINETS: HasMany<Self, Cabinet> = HasMany::new("provider_id");
    pub const GAME_MIXES: HasMany<Self, GameMix> = HasMany::new("provider_id");
    pub const SLOT_MACHINES: HasMany<Self, SlotMachine> = HasMany::new("provider_id");
    pub const METROLOGY_APPROVALS: HasMany<Self, MetrologyApproval> = HasMany::new("provider_id");
    pub const METROLOGY_SOFTWARE: HasMany<Self, MetrologySoftware> = HasMany::new("provider_id");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKey {
    Id(String),
    Name(String),
}

impl UniqueKey for ProviderKey {
    fn predicates(&self) -> Vec<(&'static str, Value)> {
        match self {
            Self::Id(id) => vec![("id", id.into())],
            Self::Name(name) => vec![("name", name.into())],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCreate {
    pub name: String,
    pub avatar: Option<String>,
}

impl ProviderCreate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avatar: None,
        }
    }
}

impl CreateInput for ProviderCreate {
    fn validate(&self) -> Result<()> {
        non_empty("name", &self.name)
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", (&self.name).into()),
            ("avatar", self.avatar.clone().into()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderUpdate {
    pub name: Option<String>,
    pub avatar: Option<Option<String>>,
}

impl UpdateInput for ProviderUpdate {
    fn validate(&self) -> Result<()> {
        non_empty_opt("name", self.name.as_deref())
    }

    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        set(&mut out, "name", self.name.as_ref());
        set(&mut out, "avatar", self.avatar.as_ref());
        out
    }
}

impl_entity!(Provider, Provider, ProviderKey, ProviderCreate, ProviderUpdate);

// ============================================================================
// Cabinet
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Cabinet {
    pub id: String,
    pub name: String,
    pub model: Option<String>,
    pub manufacturer: String,
    pub provider_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cabinet {
    pub const PROVIDER: BelongsTo<Self, Provider> =
        BelongsTo::new("provider_id", |c| Some(c.provider_id.as_str()));
    pub const SLOT_MACHINES: HasMany<Self, SlotMachine> = HasMany::new("cabinet_id");
    pub const METROLOGY_APPROVALS: HasMany<Self, MetrologyApproval> = HasMany::new("cabinet_id");
    pub const METROLOGY_SOFTWARE: HasMany<Self, MetrologySoftware> = HasMany::new("cabinet_id");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CabinetKey {
    Id(String),
    NameManufacturer { name: String, manufacturer: String },
}

impl UniqueKey for CabinetKey {
    fn predicates(&self) -> Vec<(&'static str, Value)> {
        match self {
            Self::Id(id) => vec![("id", id.into())],
            Self::NameManufacturer { name, manufacturer } => {
                vec![("name", name.into()), ("manufacturer", manufacturer.into())]
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CabinetCreate {
    pub name: String,
    pub model: Option<String>,
    pub manufacturer: String,
    pub provider_id: String,
}

impl CreateInput for CabinetCreate {
    fn validate(&self) -> Result<()> {
        non_empty("name", &self.name)?;
        non_empty("manufacturer", &self.manufacturer)
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", (&self.name).into()),
            ("model", self.model.clone().into()),
            ("manufacturer", (&self.manufacturer).into()),
            ("provider_id", (&self.provider_id).into()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CabinetUpdate {
    pub name: Option<String>,
    pub model: Option<Option<String>>,
    pub manufacturer: Option<String>,
    pub provider_id: Option<String>,
}

impl UpdateInput for CabinetUpdate {
    fn validate(&self) -> Result<()> {
        non_empty_opt("name", self.name.as_deref())?;
        non_empty_opt("manufacturer", self.manufacturer.as_deref())
    }

    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        set(&mut out, "name", self.name.as_ref());
        set(&mut out, "model", self.model.as_ref());
        set(&mut out, "manufacturer", self.manufacturer.as_ref());
        set(&mut out, "provider_id", self.provider_id.as_ref());
        out
    }
}

impl_entity!(Cabinet, Cabinet, CabinetKey, CabinetCreate, CabinetUpdate);

// ============================================================================
// GameMix
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GameMix {
    pub id: String,
    pub name: String,
    pub provider_id: String,
    /// JSON array of game titles.
    pub games: Option<String>,
    pub game_count: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameMix {
    pub const PROVIDER: BelongsTo<Self, Provider> =
        BelongsTo::new("provider_id", |g| Some(g.provider_id.as_str()));
    pub const SLOT_MACHINES: HasMany<Self, SlotMachine> = HasMany::new("game_mix_id");
    pub const METROLOGY_APPROVALS: HasMany<Self, MetrologyApproval> = HasMany::new("game_mix_id");
    pub const METROLOGY_SOFTWARE: HasMany<Self, MetrologySoftware> = HasMany::new("game_mix_id");

    /// Decoded game titles; empty when unset or not a JSON string array.
    pub fn game_list(&self) -> Vec<String> {
        self.games
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

fn encode_games(games: &[String]) -> Option<String> {
    serde_json::to_string(games).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameMixKey {
    Id(String),
    NameProvider { name: String, provider_id: String },
}

impl UniqueKey for GameMixKey {
    fn predicates(&self) -> Vec<(&'static str, Value)> {
        match self {
            Self::Id(id) => vec![("id", id.into())],
            Self::NameProvider { name, provider_id } => {
                vec![("name", name.into()), ("provider_id", provider_id.into())]
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMixCreate {
    pub name: String,
    pub provider_id: String,
    pub games: Option<Vec<String>>,
    /// Defaults to the number of `games` when those are given.
    pub game_count: Option<i64>,
}

impl CreateInput for GameMixCreate {
    fn validate(&self) -> Result<()> {
        non_empty("name", &self.name)?;
        at_least("game_count", self.game_count, 0)
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        let game_count = self.game_count.or_else(|| {
            self.games
                .as_ref()
                .and_then(|games| i64::try_from(games.len()).ok())
        });
        vec![
            ("name", (&self.name).into()),
            ("provider_id", (&self.provider_id).into()),
            ("games", self.games.as_deref().and_then(encode_games).into()),
            ("game_count", game_count.into()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameMixUpdate {
    pub name: Option<String>,
    pub provider_id: Option<String>,
    pub games: Option<Option<Vec<String>>>,
    pub game_count: Option<Option<i64>>,
}

impl UpdateInput for GameMixUpdate {
    fn validate(&self) -> Result<()> {
        non_empty_opt("name", self.name.as_deref())?;
        at_least("game_count", self.game_count.flatten(), 0)
    }

    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        set(&mut out, "name", self.name.as_ref());
        set(&mut out, "provider_id", self.provider_id.as_ref());
        if let Some(games) = &self.games {
            out.push(("games", games.as_deref().and_then(encode_games).into()));
        }
        match (&self.game_count, &self.games) {
            (Some(count), _) => out.push(("game_count", (*count).into())),
            // A replaced list without an explicit count carries its own length.
            (None, Some(games)) => {
                let count = games
                    .as_ref()
                    .and_then(|games| i64::try_from(games.len()).ok());
                out.push(("game_count", count.into()));
            }
            (None, None) => {}
        }
        out
    }
}

impl_entity!(GameMix, GameMix, GameMixKey, GameMixCreate, GameMixUpdate);

// ============================================================================
// SlotMachine
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SlotMachine {
    pub id: String,
    pub serial_number: String,
    pub manufacturer: String,
    pub provider_id: String,
    pub cabinet_id: String,
    pub game_mix_id: Option<String>,
    pub location_id: Option<String>,
    pub production_year: Option<i64>,
    pub denomination: Option<f64>,
    pub max_bet: Option<f64>,
    /// Return-to-player percentage.
    pub rtp: Option<f64>,
    pub gaming_places: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SlotMachine {
    pub const PROVIDER: BelongsTo<Self, Provider> =
        BelongsTo::new("provider_id", |s| Some(s.provider_id.as_str()));
    pub const CABINET: BelongsTo<Self, Cabinet> =
        BelongsTo::new("cabinet_id", |s| Some(s.cabinet_id.as_str()));
    pub const GAME_MIX: BelongsTo<Self, GameMix> =
        BelongsTo::new("game_mix_id", |s| s.game_mix_id.as_deref());
    pub const LOCATION: BelongsTo<Self, Location> =
        BelongsTo::new("location_id", |s| s.location_id.as_deref());
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotMachineKey {
    Id(String),
    SerialNumber(String),
}

impl UniqueKey for SlotMachineKey {
    fn predicates(&self) -> Vec<(&'static str, Value)> {
        match self {
            Self::Id(id) => vec![("id", id.into())],
            Self::SerialNumber(serial) => vec![("serial_number", serial.into())],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotMachineCreate {
    pub serial_number: String,
    pub manufacturer: String,
    pub provider_id: String,
    pub cabinet_id: String,
    pub game_mix_id: Option<String>,
    pub location_id: Option<String>,
    pub production_year: Option<i64>,
    pub denomination: Option<f64>,
    pub max_bet: Option<f64>,
    pub rtp: Option<f64>,
    /// `None` stores [`DEFAULT_GAMING_PLACES`].
    pub gaming_places: Option<i64>,
    /// `None` stores [`DEFAULT_SLOT_MACHINE_STATUS`].
    pub status: Option<String>,
}

fn check_slot_numbers(
    rtp: Option<f64>,
    denomination: Option<f64>,
    max_bet: Option<f64>,
    gaming_places: Option<i64>,
) -> Result<()> {
    in_range("rtp", rtp, 0.0, 100.0)?;
    non_negative("denomination", denomination)?;
    non_negative("max_bet", max_bet)?;
    at_least("gaming_places", gaming_places, 1)
}

impl CreateInput for SlotMachineCreate {
    fn validate(&self) -> Result<()> {
        non_empty("serial_number", &self.serial_number)?;
        non_empty("manufacturer", &self.manufacturer)?;
        non_empty_opt("status", self.status.as_deref())?;
        check_slot_numbers(self.rtp, self.denomination, self.max_bet, self.gaming_places)
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        let mut out = vec![
            ("serial_number", (&self.serial_number).into()),
            ("manufacturer", (&self.manufacturer).into()),
            ("provider_id", (&self.provider_id).into()),
            ("cabinet_id", (&self.cabinet_id).into()),
            ("game_mix_id", self.game_mix_id.clone().into()),
            ("location_id", self.location_id.clone().into()),
            ("production_year", self.production_year.into()),
            ("denomination", self.denomination.into()),
            ("max_bet", self.max_bet.into()),
            ("rtp", self.rtp.into()),
        ];
        set(&mut out, "gaming_places", self.gaming_places.as_ref());
        set(&mut out, "status", self.status.as_ref());
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotMachineUpdate {
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub provider_id: Option<String>,
    pub cabinet_id: Option<String>,
    pub game_mix_id: Option<Option<String>>,
    pub location_id: Option<Option<String>>,
    pub production_year: Option<Option<i64>>,
    pub denomination: Option<Option<f64>>,
    pub max_bet: Option<Option<f64>>,
    pub rtp: Option<Option<f64>>,
    pub gaming_places: Option<i64>,
    pub status: Option<String>,
}

impl UpdateInput for SlotMachineUpdate {
    fn validate(&self) -> Result<()> {
        non_empty_opt("serial_number", self.serial_number.as_deref())?;
        non_empty_opt("manufacturer", self.manufacturer.as_deref())?;
        non_empty_opt("status", self.status.as_deref())?;
        check_slot_numbers(
            self.rtp.flatten(),
            self.denomination.flatten(),
            self.max_bet.flatten(),
            self.gaming_places,
        )
    }

    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        set(&mut out, "serial_number", self.serial_number.as_ref());
        set(&mut out, "manufacturer", self.manufacturer.as_ref());
        set(&mut out, "provider_id", self.provider_id.as_ref());
        set(&mut out, "cabinet_id", self.cabinet_id.as_ref());
        set(&mut out, "game_mix_id", self.game_mix_id.as_ref());
        set(&mut out, "location_id", self.location_id.as_ref());
        set(&mut out, "production_year", self.production_year.as_ref());
        set(&mut out, "denomination", self.denomination.as_ref());
        set(&mut out, "max_bet", self.max_bet.as_ref());
        set(&mut out, "rtp", self.rtp.as_ref());
        set(&mut out, "gaming_places", self.gaming_places.as_ref());
        set(&mut out, "status", self.status.as_ref());
        out
    }
}

impl_entity!(
    SlotMachine,
    SlotMachine,
    SlotMachineKey,
    SlotMachineCreate,
    SlotMachineUpdate
);
