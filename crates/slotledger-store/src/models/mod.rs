//! Entity records and their request DTOs.
//!
//! Every record carries a server-generated `id` plus `created_at` /
//! `updated_at`. Create DTOs hold the caller-supplied fields; update DTOs
//! hold `Option`s where `None` leaves the column untouched and, for nullable
//! columns, `Some(None)` clears it.

mod directory;
mod equipment;
mod metrology;
mod venue;

pub use directory::*;
pub use equipment::*;
pub use metrology::*;
pub use venue::*;

/// Implements [`crate::Entity`] for a record with the standard id/timestamp fields.
///
/// An optional trailing `check(record) { .. }` becomes [`crate::Entity::check`].
macro_rules! impl_entity {
    (
        $record:ty, $kind:ident, $key:ty, $create:ty, $update:ty
        $(, check($this:ident) $check:block)?
    ) => {
        impl $crate::entity::Entity for $record {
            const KIND: $crate::schema::EntityKind = $crate::schema::EntityKind::$kind;
            type Key = $key;
            type Create = $create;
            type Update = $update;

            fn id(&self) -> &str {
                &self.id
            }

            fn created_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.created_at
            }

            fn updated_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.updated_at
            }

            $(
                fn check(&self) -> $crate::error::Result<()> {
                    let $this = self;
                    $check
                }
            )?
        }
    };
}

pub(crate) use impl_entity;
