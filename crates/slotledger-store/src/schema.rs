//! Static schema catalog.
//!
//! Mirrors `migrations/`: one [`TableSchema`] per table with its columns,
//! unique constraints and foreign keys. Filters, ordering, aggregates,
//! relation traversal and delete checks are all validated against this
//! catalog, and a test keeps it in step with the migrated database.

use std::fmt;

/// Scalar type of a column as seen by filters and aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Int,
    Float,
    DateTime,
}

impl FieldKind {
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Int => "int",
            Self::Float => "float",
            Self::DateTime => "datetime",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    /// Filled by a SQL `DEFAULT` when omitted on insert.
    pub has_default: bool,
}

impl Column {
    const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            has_default: false,
        }
    }

    const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
            has_default: false,
        }
    }

    const fn defaulted(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            has_default: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniqueConstraint {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: EntityKind,
    pub required: bool,
}

#[derive(Debug)]
pub struct TableSchema {
    pub kind: EntityKind,
    pub table: &'static str,
    pub columns: &'static [Column],
    pub unique: &'static [UniqueConstraint],
    pub foreign_keys: &'static [ForeignKey],
}

/// A navigable relation from one table to another.
#[derive(Debug, Clone, Copy)]
pub enum Relation {
    /// Many-to-one: the local foreign key points at `target`.
    ToOne {
        name: &'static str,
        foreign_key: &'static ForeignKey,
        target: &'static TableSchema,
    },
    /// One-to-many: rows of `child` point back at this table.
    ToMany {
        name: &'static str,
        foreign_key: &'static ForeignKey,
        child: &'static TableSchema,
    },
}

impl Relation {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ToOne { name, .. } | Self::ToMany { name, .. } => name,
        }
    }
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        let columns: &'static [Column] = self.columns;
        columns.iter().find(|c| c.name == name)
    }

    pub fn foreign_key(&self, column: &str) -> Option<&'static ForeignKey> {
        let fks: &'static [ForeignKey] = self.foreign_keys;
        fks.iter().find(|fk| fk.column == column)
    }

    /// Unique constraint covering exactly `columns`, in any order.
    pub fn unique_constraint_for<S: AsRef<str>>(&self, columns: &[S]) -> Option<&'static UniqueConstraint> {
        let unique: &'static [UniqueConstraint] = self.unique;
        unique.iter().find(|c| {
            c.columns.len() == columns.len()
                && columns.iter().all(|col| c.columns.contains(&col.as_ref()))
        })
    }

    /// Foreign keys on other tables that reference this one.
    pub fn dependents(&self) -> impl Iterator<Item = (&'static TableSchema, &'static ForeignKey)> + '_ {
        EntityKind::ALL.into_iter().flat_map(move |kind| {
            let child = kind.schema();
            child
                .foreign_keys
                .iter()
                .filter(move |fk| fk.references == self.kind)
                .map(move |fk| (child, fk))
        })
    }

    /// Every relation reachable from this table.
    pub fn relations(&self) -> Vec<Relation> {
        let to_one = self.foreign_keys.iter().map(|fk| Relation::ToOne {
            name: relation_name(fk.column),
            foreign_key: fk,
            target: fk.references.schema(),
        });
        let to_many = self.dependents().map(|(child, fk)| Relation::ToMany {
            name: child.table,
            foreign_key: fk,
            child,
        });
        to_one.chain(to_many).collect()
    }

    pub fn relation(&self, name: &str) -> Option<Relation> {
        self.relations().into_iter().find(|r| r.name() == name)
    }
}

fn relation_name(column: &'static str) -> &'static str {
    column.strip_suffix("_id").unwrap_or(column)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Provider,
    Cabinet,
    GameMix,
    SlotMachine,
    Location,
    Invoice,
    Company,
    Platform,
    MetrologyCommission,
    MetrologyAuthority,
    Metrology,
    MetrologyApproval,
    MetrologySoftware,
    User,
}

impl EntityKind {
    pub const ALL: [Self; 14] = [
        Self::Provider,
        Self::Cabinet,
        Self::GameMix,
        Self::SlotMachine,
        Self::Location,
        Self::Invoice,
        Self::Company,
        Self::Platform,
        Self::MetrologyCommission,
        Self::MetrologyAuthority,
        Self::Metrology,
        Self::MetrologyApproval,
        Self::MetrologySoftware,
        Self::User,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Provider => "Provider",
            Self::Cabinet => "Cabinet",
            Self::GameMix => "GameMix",
            Self::SlotMachine => "SlotMachine",
            Self::Location => "Location",
            Self::Invoice => "Invoice",
            Self::Company => "Company",
            Self::Platform => "Platform",
            Self::MetrologyCommission => "MetrologyCommission",
            Self::MetrologyAuthority => "MetrologyAuthority",
            Self::Metrology => "Metrology",
            Self::MetrologyApproval => "MetrologyApproval",
            Self::MetrologySoftware => "MetrologySoftware",
            Self::User => "User",
        }
    }

    pub fn schema(self) -> &'static TableSchema {
        match self {
            Self::Provider => &PROVIDERS,
            Self::Cabinet => &CABINETS,
            Self::GameMix => &GAME_MIXES,
            Self::SlotMachine => &SLOT_MACHINES,
            Self::Location => &LOCATIONS,
            Self::Invoice => &INVOICES,
            Self::Company => &COMPANIES,
            Self::Platform => &PLATFORMS,
            Self::MetrologyCommission => &METROLOGY_COMMISSIONS,
            Self::MetrologyAuthority => &METROLOGY_AUTHORITIES,
            Self::Metrology => &METROLOGIES,
            Self::MetrologyApproval => &METROLOGY_APPROVALS,
            Self::MetrologySoftware => &METROLOGY_SOFTWARE,
            Self::User => &USERS,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

use FieldKind::{DateTime, Float, Int, Text};

const ID: Column = Column::required("id", Text);
const CREATED_AT: Column = Column::required("created_at", DateTime);
const UPDATED_AT: Column = Column::required("updated_at", DateTime);

const fn fk(column: &'static str, references: EntityKind, required: bool) -> ForeignKey {
    ForeignKey {
        column,
        references,
        required,
    }
}

static PROVIDERS: TableSchema = TableSchema {
    kind: EntityKind::Provider,
    table: "providers",
    columns: &[
        ID,
        Column::required("name", Text),
        Column::optional("avatar", Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    unique: &[UniqueConstraint {
        name: "providers_name_key",
        columns: &["name"],
    }],
    foreign_keys: &[],
};

static CABINETS: TableSchema = TableSchema {
    kind: EntityKind::Cabinet,
    table: "cabinets",
    columns: &[
        ID,
        Column::required("name", Text),
        Column::optional("model", Text),
        Column::required("manufacturer", Text),
        Column::required("provider_id", Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    unique: &[UniqueConstraint {
        name: "cabinets_name_manufacturer_key",
        columns: &["name", "manufacturer"],
    }],
    foreign_keys: &[fk("provider_id", EntityKind::Provider, true)],
};

static GAME_MIXES: TableSchema = TableSchema {
    kind: EntityKind::GameMix,
    table: "game_mixes",
    columns: &[
        ID,
        Column::required("name", Text),
        Column::required("provider_id", Text),
        Column::optional("games", Text),
        Column::optional("game_count", Int),
        CREATED_AT,
        UPDATED_AT,
    ],
    unique: &[UniqueConstraint {
        name: "game_mixes_name_provider_id_key",
        columns: &["name", "provider_id"],
    }],
    foreign_keys: &[fk("provider_id", EntityKind::Provider, true)],
};

static SLOT_MACHINES: TableSchema = TableSchema {
    kind: EntityKind::SlotMachine,
    table: "slot_machines",
    columns: &[
        ID,
        Column::required("serial_number", Text),
        Column::required("manufacturer", Text),
        Column::required("provider_id", Text),
        Column::required("cabinet_id", Text),
        Column::optional("game_mix_id", Text),
        Column::optional("location_id", Text),
        Column::optional("production_year", Int),
        Column::optional("denomination", Float),
        Column::optional("max_bet", Float),
        Column::optional("rtp", Float),
        Column::defaulted("gaming_places", Int),
        Column::defaulted("status", Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    unique: &[UniqueConstraint {
        name: "slot_machines_serial_number_key",
        columns: &["serial_number"],
    }],
    foreign_keys: &[
        fk("provider_id", EntityKind::Provider, true),
        fk("cabinet_id", EntityKind::Cabinet, true),
        fk("game_mix_id", EntityKind::GameMix, false),
        fk("location_id", EntityKind::Location, false),
    ],
};

static LOCATIONS: TableSchema = TableSchema {
    kind: EntityKind::Location,
    table: "locations",
    columns: &[
        ID,
        Column::required("name", Text),
        Column::optional("address", Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    unique: &[UniqueConstraint {
        name: "locations_name_key",
        columns: &["name"],
    }],
    foreign_keys: &[],
};

static INVOICES: TableSchema = TableSchema {
    kind: EntityKind::Invoice,
    table: "invoices",
    columns: &[
        ID,
        Column::required("invoice_number", Text),
        Column::required("amount", Float),
        Column::defaulted("currency", Text),
        Column::defaulted("status", Text),
        Column::optional("serial_number", Text),
        Column::optional("location_id", Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    unique: &[UniqueConstraint {
        name: "invoices_invoice_number_key",
        columns: &["invoice_number"],
    }],
    foreign_keys: &[fk("location_id", EntityKind::Location, false)],
};

static COMPANIES: TableSchema = TableSchema {
    kind: EntityKind::Company,
    table: "companies",
    columns: &[
        ID,
        Column::required("name", Text),
        Column::optional("registration_number", Text),
        Column::optional("address", Text),
        Column::optional("contact_email", Text),
        Column::optional("contact_phone", Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    unique: &[],
    foreign_keys: &[],
};

static PLATFORMS: TableSchema = TableSchema {
    kind: EntityKind::Platform,
    table: "platforms",
    columns: &[
        ID,
        Column::required("name", Text),
        Column::optional("url", Text),
        Column::optional("version", Text),
        Column::optional("serial_numbers", Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    unique: &[],
    foreign_keys: &[],
};

static METROLOGY_COMMISSIONS: TableSchema = TableSchema {
    kind: EntityKind::MetrologyCommission,
    table: "metrology_commissions",
    columns: &[
        ID,
        Column::required("name", Text),
        Column::optional("serial_numbers", Text),
        Column::optional("data_emitere", DateTime),
        Column::optional("data_expirare", DateTime),
        CREATED_AT,
        UPDATED_AT,
    ],
    unique: &[],
    foreign_keys: &[],
};

static METROLOGY_AUTHORITIES: TableSchema = TableSchema {
    kind: EntityKind::MetrologyAuthority,
    table: "metrology_authorities",
    columns: &[
        ID,
        Column::required("name", Text),
        Column::optional("address", Text),
        Column::optional("contact", Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    unique: &[],
    foreign_keys: &[],
};

static METROLOGIES: TableSchema = TableSchema {
    kind: EntityKind::Metrology,
    table: "metrologies",
    columns: &[
        ID,
        Column::required("serial_number", Text),
        Column::optional("certificate_type", Text),
        Column::optional("certificate_number", Text),
        Column::optional("data_emitere", DateTime),
        Column::optional("data_expirare", DateTime),
        Column::optional("authority", Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    unique: &[],
    foreign_keys: &[],
};

static METROLOGY_APPROVALS: TableSchema = TableSchema {
    kind: EntityKind::MetrologyApproval,
    table: "metrology_approvals",
    columns: &[
        ID,
        Column::required("name", Text),
        Column::optional("data_emitere", DateTime),
        Column::optional("data_expirare", DateTime),
        Column::optional("provider_id", Text),
        Column::optional("cabinet_id", Text),
        Column::optional("game_mix_id", Text),
        Column::optional("metrology_software_id", Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    unique: &[],
    foreign_keys: &[
        fk("provider_id", EntityKind::Provider, false),
        fk("cabinet_id", EntityKind::Cabinet, false),
        fk("game_mix_id", EntityKind::GameMix, false),
        fk("metrology_software_id", EntityKind::MetrologySoftware, false),
    ],
};

static METROLOGY_SOFTWARE: TableSchema = TableSchema {
    kind: EntityKind::MetrologySoftware,
    table: "metrology_software",
    columns: &[
        ID,
        Column::required("name", Text),
        Column::optional("version", Text),
        Column::optional("serial_numbers", Text),
        Column::optional("provider_id", Text),
        Column::optional("cabinet_id", Text),
        Column::optional("game_mix_id", Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    unique: &[],
    foreign_keys: &[
        fk("provider_id", EntityKind::Provider, false),
        fk("cabinet_id", EntityKind::Cabinet, false),
        fk("game_mix_id", EntityKind::GameMix, false),
    ],
};

static USERS: TableSchema = TableSchema {
    kind: EntityKind::User,
    table: "users",
    columns: &[
        ID,
        Column::required("username", Text),
        Column::optional("email", Text),
        Column::defaulted("role", Text),
        Column::optional("avatar", Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    unique: &[
        UniqueConstraint {
            name: "users_username_key",
            columns: &["username"],
        },
        UniqueConstraint {
            name: "users_email_key",
            columns: &["email"],
        },
    ],
    foreign_keys: &[],
};
