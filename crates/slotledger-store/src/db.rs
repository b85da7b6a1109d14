//! The registry database: pool, migrations and per-entity repositories.

pub use slotledger_core::db::DatabaseError;

use crate::entity::Entity;
use crate::error::Result;
use crate::models::{
    Cabinet, Company, GameMix, Invoice, Location, Metrology, MetrologyApproval,
    MetrologyAuthority, MetrologyCommission, MetrologySoftware, Platform, Provider, SlotMachine,
    User,
};
use crate::repository::Repository;
use crate::schema::EntityKind;

slotledger_core::define_database!(Database, "Registry database migrations complete");

impl Database {
    /// Repository for any entity type.
    pub const fn repo<E: Entity>(&self) -> Repository<'_, E> {
        Repository::new(self)
    }

    pub const fn providers(&self) -> Repository<'_, Provider> {
        self.repo()
    }

    pub const fn cabinets(&self) -> Repository<'_, Cabinet> {
        self.repo()
    }

    pub const fn game_mixes(&self) -> Repository<'_, GameMix> {
        self.repo()
    }

    pub const fn slot_machines(&self) -> Repository<'_, SlotMachine> {
        self.repo()
    }

    pub const fn locations(&self) -> Repository<'_, Location> {
        self.repo()
    }

    pub const fn invoices(&self) -> Repository<'_, Invoice> {
        self.repo()
    }

    pub const fn companies(&self) -> Repository<'_, Company> {
        self.repo()
    }

    pub const fn platforms(&self) -> Repository<'_, Platform> {
        self.repo()
    }

    pub const fn metrology_commissions(&self) -> Repository<'_, MetrologyCommission> {
        self.repo()
    }

    pub const fn metrology_authorities(&self) -> Repository<'_, MetrologyAuthority> {
        self.repo()
    }

    pub const fn metrologies(&self) -> Repository<'_, Metrology> {
        self.repo()
    }

    pub const fn metrology_approvals(&self) -> Repository<'_, MetrologyApproval> {
        self.repo()
    }

    pub const fn metrology_software(&self) -> Repository<'_, MetrologySoftware> {
        self.repo()
    }

    pub const fn users(&self) -> Repository<'_, User> {
        self.repo()
    }

    /// Row count of every table, in catalog order.
    pub async fn table_counts(&self) -> Result<Vec<(EntityKind, i64)>> {
        let mut counts = Vec::with_capacity(EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            let count: i64 =
                sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", kind.schema().table))
                    .fetch_one(self.pool())
                    .await?;
            counts.push((kind, count));
        }
        Ok(counts)
    }
}
