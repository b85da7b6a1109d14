//! Storage scenario tests against an in-memory registry.

use chrono::{TimeDelta, Utc};

use crate::error::{Operation, classify};
use crate::*;

async fn test_db() -> Database {
    Database::open_in_memory().await.unwrap()
}

async fn provider(db: &Database, name: &str) -> Provider {
    db.providers()
        .create(&ProviderCreate::new(name))
        .await
        .unwrap()
}

async fn cabinet(db: &Database, provider: &Provider, name: &str) -> Cabinet {
    db.cabinets()
        .create(&CabinetCreate {
            name: name.into(),
            model: None,
            manufacturer: provider.name.clone(),
            provider_id: provider.id.clone(),
        })
        .await
        .unwrap()
}

async fn game_mix(db: &Database, provider: &Provider, name: &str) -> GameMix {
    db.game_mixes()
        .create(&GameMixCreate {
            name: name.into(),
            provider_id: provider.id.clone(),
            games: Some(vec!["Book of Ra".into(), "Lucky Lady's Charm".into()]),
            game_count: None,
        })
        .await
        .unwrap()
}

fn machine(provider: &Provider, cabinet: &Cabinet, serial: &str) -> SlotMachineCreate {
    SlotMachineCreate {
        serial_number: serial.into(),
        manufacturer: provider.name.clone(),
        provider_id: provider.id.clone(),
        cabinet_id: cabinet.id.clone(),
        ..SlotMachineCreate::default()
    }
}

async fn slot_machine(db: &Database, create: SlotMachineCreate) -> SlotMachine {
    db.slot_machines().create(&create).await.unwrap()
}

// === Create / find ===

#[tokio::test]
async fn create_then_find_unique_round_trips() {
    let db = test_db().await;
    let created = db
        .providers()
        .create(&ProviderCreate {
            name: "Novomatic".into(),
            avatar: Some("novomatic.png".into()),
        })
        .await
        .unwrap();

    assert!(!created.id.is_empty());
    assert_eq!(created.created_at, created.updated_at);

    let found = db
        .providers()
        .find_unique(&ProviderKey::Name("Novomatic".into()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found, created);
    assert_eq!(found.avatar.as_deref(), Some("novomatic.png"));

    let by_id = db.providers().find_by_id(&created.id).await.unwrap();
    assert_eq!(by_id, Some(created));
}

#[tokio::test]
async fn find_unique_without_match_is_none() {
    let db = test_db().await;
    let missing = db
        .providers()
        .find_unique(&ProviderKey::Name("EGT".into()))
        .await
        .unwrap();
    assert!(missing.is_none());

    let err = db
        .providers()
        .find_unique_or_throw(&ProviderKey::Name("EGT".into()))
        .await
        .unwrap_err();
    match err {
        StoreError::NotFound { entity, key } => {
            assert_eq!(entity, "Provider");
            assert_eq!(key, r#"name="EGT""#);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn novomatic_cabinet_scenario() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let gold = cabinet(&db, &novomatic, "Gold Series").await;

    let found = db
        .cabinets()
        .find_unique(&CabinetKey::NameManufacturer {
            name: "Gold Series".into(),
            manufacturer: "Novomatic".into(),
        })
        .await
        .unwrap();
    assert_eq!(found, Some(gold));

    let err = db
        .cabinets()
        .create(&CabinetCreate {
            name: "Gold Series".into(),
            model: Some("V2".into()),
            manufacturer: "Novomatic".into(),
            provider_id: novomatic.id.clone(),
        })
        .await
        .unwrap_err();
    match err {
        StoreError::ConstraintViolation {
            entity,
            constraint,
            fields,
        } => {
            assert_eq!(entity, "Cabinet");
            assert_eq!(constraint, "cabinets_name_manufacturer_key");
            assert_eq!(fields, vec!["name", "manufacturer"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(db.cabinets().count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn unique_violations_leave_store_unchanged() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let gold = cabinet(&db, &novomatic, "Gold Series").await;
    game_mix(&db, &novomatic, "Mix 1").await;
    slot_machine(&db, machine(&novomatic, &gold, "SN-001")).await;
    db.locations()
        .create(&LocationCreate::new("Casino Bucuresti"))
        .await
        .unwrap();
    db.invoices()
        .create(&InvoiceCreate::new("INV-1", 100.0))
        .await
        .unwrap();
    db.users()
        .create(&UserCreate {
            email: Some("ana@example.com".into()),
            ..UserCreate::new("ana")
        })
        .await
        .unwrap();

    let constraint = |err: StoreError| match err {
        StoreError::ConstraintViolation { constraint, .. } => constraint,
        other => panic!("unexpected error: {other}"),
    };

    let err = db
        .providers()
        .create(&ProviderCreate::new("Novomatic"))
        .await
        .unwrap_err();
    assert_eq!(constraint(err), "providers_name_key");

    let err = db
        .game_mixes()
        .create(&GameMixCreate {
            name: "Mix 1".into(),
            provider_id: novomatic.id.clone(),
            ..GameMixCreate::default()
        })
        .await
        .unwrap_err();
    assert_eq!(constraint(err), "game_mixes_name_provider_id_key");

    let err = db
        .slot_machines()
        .create(&machine(&novomatic, &gold, "SN-001"))
        .await
        .unwrap_err();
    assert_eq!(constraint(err), "slot_machines_serial_number_key");

    let err = db
        .locations()
        .create(&LocationCreate::new("Casino Bucuresti"))
        .await
        .unwrap_err();
    assert_eq!(constraint(err), "locations_name_key");

    let err = db
        .invoices()
        .create(&InvoiceCreate::new("INV-1", 5.0))
        .await
        .unwrap_err();
    assert_eq!(constraint(err), "invoices_invoice_number_key");

    let err = db
        .users()
        .create(&UserCreate::new("ana"))
        .await
        .unwrap_err();
    assert_eq!(constraint(err), "users_username_key");

    let err = db
        .users()
        .create(&UserCreate {
            email: Some("ana@example.com".into()),
            ..UserCreate::new("maria")
        })
        .await
        .unwrap_err();
    assert_eq!(constraint(err), "users_email_key");

    assert_eq!(db.providers().count(None).await.unwrap(), 1);
    assert_eq!(db.game_mixes().count(None).await.unwrap(), 1);
    assert_eq!(db.slot_machines().count(None).await.unwrap(), 1);
    assert_eq!(db.locations().count(None).await.unwrap(), 1);
    assert_eq!(db.invoices().count(None).await.unwrap(), 1);
    assert_eq!(db.users().count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn users_without_email_do_not_collide() {
    let db = test_db().await;
    db.users().create(&UserCreate::new("ana")).await.unwrap();
    db.users().create(&UserCreate::new("maria")).await.unwrap();
    assert_eq!(db.users().count(None).await.unwrap(), 2);
}

#[tokio::test]
async fn defaults_are_filled_on_insert() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let gold = cabinet(&db, &novomatic, "Gold Series").await;

    let sm = slot_machine(&db, machine(&novomatic, &gold, "SN-001")).await;
    assert_eq!(sm.gaming_places, DEFAULT_GAMING_PLACES);
    assert_eq!(sm.status, DEFAULT_SLOT_MACHINE_STATUS);
    assert!(sm.game_mix_id.is_none());
    assert!(sm.location_id.is_none());

    let invoice = db
        .invoices()
        .create(&InvoiceCreate::new("INV-1", 250.5))
        .await
        .unwrap();
    assert_eq!(invoice.currency, DEFAULT_CURRENCY);
    assert_eq!(invoice.status, DEFAULT_INVOICE_STATUS);

    let user = db.users().create(&UserCreate::new("ana")).await.unwrap();
    assert_eq!(user.role, DEFAULT_USER_ROLE);
}

#[tokio::test]
async fn game_mix_games_round_trip() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let mix = game_mix(&db, &novomatic, "Mix 1").await;

    assert_eq!(mix.game_list(), vec!["Book of Ra", "Lucky Lady's Charm"]);
    assert_eq!(mix.game_count, Some(2));
}

#[tokio::test]
async fn replacing_games_updates_game_count() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let mix = game_mix(&db, &novomatic, "Mix 1").await;
    let key = GameMixKey::Id(mix.id.clone());

    let updated = db
        .game_mixes()
        .update(
            &key,
            &GameMixUpdate {
                games: Some(Some(vec![
                    "Book of Ra".into(),
                    "Sizzling Hot".into(),
                    "Dolphin's Pearl".into(),
                ])),
                ..GameMixUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.game_list().len(), 3);
    assert_eq!(updated.game_count, Some(3));

    let cleared = db
        .game_mixes()
        .update(
            &key,
            &GameMixUpdate {
                games: Some(None),
                ..GameMixUpdate::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.games.is_none());
    assert!(cleared.game_count.is_none());
}

#[tokio::test]
async fn invalid_input_is_rejected_before_storage() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let gold = cabinet(&db, &novomatic, "Gold Series").await;

    let err = db
        .slot_machines()
        .create(&SlotMachineCreate {
            rtp: Some(150.0),
            ..machine(&novomatic, &gold, "SN-001")
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation { field: Some(ref f), .. } if f == "rtp"
    ));

    let err = db
        .providers()
        .create(&ProviderCreate::new("  "))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));
    assert_eq!(db.slot_machines().count(None).await.unwrap(), 0);
}

// === Foreign keys ===

#[tokio::test]
async fn missing_required_reference_is_foreign_key_violation() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let gold = cabinet(&db, &novomatic, "Gold Series").await;

    let err = db
        .slot_machines()
        .create(&SlotMachineCreate {
            provider_id: "no-such-provider".into(),
            ..machine(&novomatic, &gold, "SN-001")
        })
        .await
        .unwrap_err();
    match err {
        StoreError::ForeignKeyViolation {
            entity,
            field,
            references,
        } => {
            assert_eq!(entity, "SlotMachine");
            assert_eq!(field.as_deref(), Some("provider_id"));
            assert_eq!(references, Some("Provider"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(db.slot_machines().count(None).await.unwrap(), 0);
}

fn assert_foreign_key(err: StoreError, on: &str, column: &str, target: &str) {
    match err {
        StoreError::ForeignKeyViolation {
            entity,
            field,
            references,
        } => {
            assert_eq!(entity, on);
            assert_eq!(field.as_deref(), Some(column));
            assert_eq!(references, Some(target));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn every_required_reference_is_checked_on_create() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let gold = cabinet(&db, &novomatic, "Gold Series").await;

    let err = db
        .cabinets()
        .create(&CabinetCreate {
            name: "Dominator".into(),
            model: None,
            manufacturer: "Novomatic".into(),
            provider_id: "no-such-provider".into(),
        })
        .await
        .unwrap_err();
    assert_foreign_key(err, "Cabinet", "provider_id", "Provider");

    let err = db
        .game_mixes()
        .create(&GameMixCreate {
            name: "Mix 1".into(),
            provider_id: "no-such-provider".into(),
            ..GameMixCreate::default()
        })
        .await
        .unwrap_err();
    assert_foreign_key(err, "GameMix", "provider_id", "Provider");

    let err = db
        .slot_machines()
        .create(&SlotMachineCreate {
            cabinet_id: "no-such-cabinet".into(),
            ..machine(&novomatic, &gold, "SN-001")
        })
        .await
        .unwrap_err();
    assert_foreign_key(err, "SlotMachine", "cabinet_id", "Cabinet");

    assert_eq!(db.cabinets().count(None).await.unwrap(), 1);
    assert_eq!(db.game_mixes().count(None).await.unwrap(), 0);
    assert_eq!(db.slot_machines().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn missing_optional_reference_is_foreign_key_violation() {
    let db = test_db().await;
    let err = db
        .invoices()
        .create(&InvoiceCreate {
            location_id: Some("nowhere".into()),
            ..InvoiceCreate::new("INV-1", 10.0)
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::ForeignKeyViolation { field: Some(ref f), .. } if f == "location_id"
    ));
}

#[tokio::test]
async fn update_to_missing_reference_is_rejected() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let gold = cabinet(&db, &novomatic, "Gold Series").await;
    let sm = slot_machine(&db, machine(&novomatic, &gold, "SN-001")).await;

    let err = db
        .slot_machines()
        .update(
            &SlotMachineKey::Id(sm.id.clone()),
            &SlotMachineUpdate {
                cabinet_id: Some("gone".into()),
                ..SlotMachineUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation { .. }));

    let unchanged = db.slot_machines().find_by_id(&sm.id).await.unwrap();
    assert_eq!(unchanged, Some(sm));
}

#[tokio::test]
async fn sqlite_constraint_errors_are_classified() {
    let db = test_db().await;
    let schema = EntityKind::Cabinet.schema();
    let now = Utc::now();

    let err = sqlx::query(
        "INSERT INTO cabinets (id, name, manufacturer, provider_id, created_at, updated_at) VALUES ('c1', 'n', 'm', 'missing', ?, ?)",
    )
    .bind(now)
    .bind(now)
    .execute(db.pool())
    .await
    .unwrap_err();
    assert!(matches!(
        classify(err, schema, Operation::Write),
        StoreError::ForeignKeyViolation { field: None, .. }
    ));

    let novomatic = provider(&db, "Novomatic").await;
    cabinet(&db, &novomatic, "Gold Series").await;

    let err = sqlx::query(
        "INSERT INTO providers (id, name, created_at, updated_at) VALUES ('p2', 'Novomatic', ?, ?)",
    )
    .bind(now)
    .bind(now)
    .execute(db.pool())
    .await
    .unwrap_err();
    match classify(err, EntityKind::Provider.schema(), Operation::Write) {
        StoreError::ConstraintViolation { constraint, .. } => {
            assert_eq!(constraint, "providers_name_key");
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = sqlx::query("DELETE FROM providers WHERE id = ?")
        .bind(&novomatic.id)
        .execute(db.pool())
        .await
        .unwrap_err();
    assert!(matches!(
        classify(err, EntityKind::Provider.schema(), Operation::Delete),
        StoreError::ReferentialIntegrityViolation { .. }
    ));
}

#[tokio::test]
async fn cross_provider_game_mix_is_allowed() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let egt = provider(&db, "EGT").await;
    let gold = cabinet(&db, &novomatic, "Gold Series").await;
    let egt_mix = game_mix(&db, &egt, "Burning Hot").await;

    let sm = slot_machine(
        &db,
        SlotMachineCreate {
            game_mix_id: Some(egt_mix.id.clone()),
            ..machine(&novomatic, &gold, "SN-001")
        },
    )
    .await;
    assert_eq!(sm.provider_id, novomatic.id);
    assert_eq!(sm.game_mix_id.as_deref(), Some(egt_mix.id.as_str()));
}

#[tokio::test]
async fn approvals_attach_to_any_subset_of_equipment() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let egt = provider(&db, "EGT").await;
    let egt_cabinet = cabinet(&db, &egt, "Fusion").await;

    let detached = db
        .metrology_approvals()
        .create(&MetrologyApprovalCreate {
            name: "Aviz 1".into(),
            ..MetrologyApprovalCreate::default()
        })
        .await
        .unwrap();
    assert!(detached.provider_id.is_none());
    assert!(detached.cabinet_id.is_none());

    // Cabinet of another provider than the one referenced.
    let mixed = db
        .metrology_approvals()
        .create(&MetrologyApprovalCreate {
            name: "Aviz 2".into(),
            provider_id: Some(novomatic.id.clone()),
            cabinet_id: Some(egt_cabinet.id.clone()),
            ..MetrologyApprovalCreate::default()
        })
        .await
        .unwrap();
    assert_eq!(mixed.provider_id.as_deref(), Some(novomatic.id.as_str()));
    assert_eq!(mixed.cabinet_id.as_deref(), Some(egt_cabinet.id.as_str()));
}

// === Update / upsert ===

#[tokio::test]
async fn partial_updates_cannot_expire_before_issue() {
    let db = test_db().await;
    let issued = Utc::now();
    let approval = db
        .metrology_approvals()
        .create(&MetrologyApprovalCreate {
            name: "Aviz 1".into(),
            data_emitere: Some(issued),
            data_expirare: Some(issued + TimeDelta::days(365)),
            ..MetrologyApprovalCreate::default()
        })
        .await
        .unwrap();
    let key = IdKey(approval.id.clone());
    let backdated = MetrologyApprovalUpdate {
        data_expirare: Some(Some(issued - TimeDelta::days(30))),
        ..MetrologyApprovalUpdate::default()
    };

    let err = db
        .metrology_approvals()
        .update(&key, &backdated)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation { field: Some(ref f), .. } if f == "data_expirare"
    ));

    let err = db
        .metrology_approvals()
        .upsert(&key, &MetrologyApprovalCreate::default(), &backdated)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));

    let err = db
        .metrology_approvals()
        .update_many(None, &backdated)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));

    let stored = db
        .metrology_approvals()
        .find_by_id(&approval.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, approval);

    // Moving the issue date past the stored expiry is caught the same way.
    let certificate = db
        .metrologies()
        .create(&MetrologyCreate {
            serial_number: "SN-9".into(),
            data_emitere: Some(issued),
            data_expirare: Some(issued + TimeDelta::days(10)),
            ..MetrologyCreate::default()
        })
        .await
        .unwrap();
    let err = db
        .metrologies()
        .update(
            &IdKey(certificate.id.clone()),
            &MetrologyUpdate {
                data_emitere: Some(Some(issued + TimeDelta::days(20))),
                ..MetrologyUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));
}

#[tokio::test]
async fn repeated_update_only_moves_updated_at() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let key = ProviderKey::Id(novomatic.id.clone());
    let update = ProviderUpdate {
        avatar: Some(Some("logo.png".into())),
        ..ProviderUpdate::default()
    };

    let first = db.providers().update(&key, &update).await.unwrap();
    let second = db.providers().update(&key, &update).await.unwrap();

    assert!(first.updated_at > novomatic.updated_at);
    assert!(second.updated_at > first.updated_at);
    assert_eq!(second.created_at, novomatic.created_at);
    assert_eq!(second.name, first.name);
    assert_eq!(second.avatar, first.avatar);
    assert_eq!(second.id, first.id);
}

#[tokio::test]
async fn update_clears_nullable_fields() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let gold = cabinet(&db, &novomatic, "Gold Series").await;
    let hall = db
        .locations()
        .create(&LocationCreate::new("Hall"))
        .await
        .unwrap();
    let sm = slot_machine(
        &db,
        SlotMachineCreate {
            location_id: Some(hall.id.clone()),
            rtp: Some(96.0),
            ..machine(&novomatic, &gold, "SN-001")
        },
    )
    .await;

    let updated = db
        .slot_machines()
        .update(
            &SlotMachineKey::SerialNumber("SN-001".into()),
            &SlotMachineUpdate {
                location_id: Some(None),
                status: Some("retired".into()),
                ..SlotMachineUpdate::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.location_id.is_none());
    assert_eq!(updated.status, "retired");
    assert_eq!(updated.rtp, sm.rtp);
}

#[tokio::test]
async fn update_of_missing_record_is_not_found() {
    let db = test_db().await;
    let err = db
        .providers()
        .update(
            &ProviderKey::Name("ghost".into()),
            &ProviderUpdate::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { entity: "Provider", .. }));
}

#[tokio::test]
async fn update_into_existing_unique_value_is_rejected() {
    let db = test_db().await;
    provider(&db, "Novomatic").await;
    let egt = provider(&db, "EGT").await;

    let err = db
        .providers()
        .update(
            &ProviderKey::Id(egt.id.clone()),
            &ProviderUpdate {
                name: Some("Novomatic".into()),
                ..ProviderUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_constraint());
    let still = db.providers().find_by_id(&egt.id).await.unwrap().unwrap();
    assert_eq!(still.name, "EGT");
}

#[tokio::test]
async fn upsert_creates_then_updates() {
    let db = test_db().await;
    let key = LocationKey::Name("Hall".into());
    let create = LocationCreate {
        name: "Hall".into(),
        address: Some("Str. Unirii 1".into()),
    };
    let update = LocationUpdate {
        address: Some(Some("Str. Unirii 2".into())),
        ..LocationUpdate::default()
    };

    let created = db.locations().upsert(&key, &create, &update).await.unwrap();
    assert_eq!(created.address.as_deref(), Some("Str. Unirii 1"));

    let updated = db.locations().upsert(&key, &create, &update).await.unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.address.as_deref(), Some("Str. Unirii 2"));
    assert_eq!(db.locations().count(None).await.unwrap(), 1);
}

// === Delete ===

#[tokio::test]
async fn delete_is_restricted_by_dependents() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    cabinet(&db, &novomatic, "Gold Series").await;

    let err = db
        .providers()
        .delete(&ProviderKey::Id(novomatic.id.clone()))
        .await
        .unwrap_err();
    match err {
        StoreError::ReferentialIntegrityViolation { entity, dependents } => {
            assert_eq!(entity, "Provider");
            assert_eq!(
                dependents,
                vec![Dependent {
                    entity: "Cabinet",
                    field: "provider_id",
                    count: 1,
                }]
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(db.providers().count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn delete_without_dependents_returns_record() {
    let db = test_db().await;
    let egt = provider(&db, "EGT").await;

    let deleted = db
        .providers()
        .delete(&ProviderKey::Name("EGT".into()))
        .await
        .unwrap();
    assert_eq!(deleted, egt);
    assert!(db.providers().find_by_id(&egt.id).await.unwrap().is_none());

    let err = db
        .providers()
        .delete(&ProviderKey::Name("EGT".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn optional_references_also_restrict_delete() {
    let db = test_db().await;
    let hall = db
        .locations()
        .create(&LocationCreate::new("Hall"))
        .await
        .unwrap();
    db.invoices()
        .create(&InvoiceCreate {
            location_id: Some(hall.id.clone()),
            ..InvoiceCreate::new("INV-1", 10.0)
        })
        .await
        .unwrap();

    let err = db
        .locations()
        .delete(&LocationKey::Id(hall.id.clone()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::ReferentialIntegrityViolation { ref dependents, .. }
            if dependents[0].entity == "Invoice"
    ));
}

#[tokio::test]
async fn software_with_approvals_cannot_be_deleted() {
    let db = test_db().await;
    let software = db
        .metrology_software()
        .create(&MetrologySoftwareCreate {
            name: "NOVO LINE".into(),
            version: Some("1.2".into()),
            ..MetrologySoftwareCreate::default()
        })
        .await
        .unwrap();
    db.metrology_approvals()
        .create(&MetrologyApprovalCreate {
            name: "Aviz".into(),
            metrology_software_id: Some(software.id.clone()),
            ..MetrologyApprovalCreate::default()
        })
        .await
        .unwrap();

    let err = db
        .metrology_software()
        .delete(&IdKey(software.id.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ReferentialIntegrityViolation { .. }));
}

// === Listing and filters ===

#[tokio::test]
async fn find_many_filters_sorts_and_paginates() {
    let db = test_db().await;
    for name in ["Alpha Gaming", "beta slots", "Gamma", "Alphabet"] {
        provider(&db, name).await;
    }

    let all = db.providers().find_many(&FindMany::new()).await.unwrap();
    let names: Vec<_> = all.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha Gaming", "beta slots", "Gamma", "Alphabet"]);

    let alpha = db
        .providers()
        .find_many(
            &FindMany::filtered(Filter::starts_with("name", "alpha").insensitive())
                .order_by(OrderBy::desc("name")),
        )
        .await
        .unwrap();
    let names: Vec<_> = alpha.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Alphabet", "Alpha Gaming"]);

    let sensitive = db
        .providers()
        .count(Some(&Filter::contains("name", "ALPHA")))
        .await
        .unwrap();
    assert_eq!(sensitive, 0);

    let page = db
        .providers()
        .find_many(
            &FindMany::new()
                .order_by(OrderBy::asc("name"))
                .skip(1)
                .take(2),
        )
        .await
        .unwrap();
    let names: Vec<_> = page.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Alphabet", "Gamma"]);

    let first = db
        .providers()
        .find_first(&FindMany::filtered(Filter::ends_with("name", "slots")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.name, "beta slots");
}

#[tokio::test]
async fn numeric_and_null_filters() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let gold = cabinet(&db, &novomatic, "Gold Series").await;
    for (serial, rtp) in [("SN-1", Some(92.5)), ("SN-2", Some(96.0)), ("SN-3", None)] {
        slot_machine(
            &db,
            SlotMachineCreate {
                rtp,
                ..machine(&novomatic, &gold, serial)
            },
        )
        .await;
    }

    let repo = db.slot_machines();
    assert_eq!(repo.count(Some(&Filter::gte("rtp", 95))).await.unwrap(), 1);
    assert_eq!(repo.count(Some(&Filter::between("rtp", 90, 100))).await.unwrap(), 2);
    assert_eq!(repo.count(Some(&Filter::is_null("rtp"))).await.unwrap(), 1);
    assert_eq!(
        repo.count(Some(&Filter::in_list("serial_number", ["SN-1", "SN-3"])))
            .await
            .unwrap(),
        2
    );
    assert_eq!(
        repo.count(Some(&Filter::negate(Filter::eq("serial_number", "SN-1"))))
            .await
            .unwrap(),
        2
    );
    // Null rows never satisfy a comparison.
    assert_eq!(repo.count(Some(&Filter::ne("rtp", 92.5))).await.unwrap(), 1);
}

#[tokio::test]
async fn date_filters_find_expiring_certificates() {
    let db = test_db().await;
    let now = Utc::now();
    for (serial, days) in [("SN-1", 10), ("SN-2", 400)] {
        db.metrologies()
            .create(&MetrologyCreate {
                serial_number: serial.into(),
                certificate_type: Some("BMI".into()),
                data_emitere: Some(now - TimeDelta::days(30)),
                data_expirare: Some(now + TimeDelta::days(days)),
                ..MetrologyCreate::default()
            })
            .await
            .unwrap();
    }

    let expiring = db
        .metrologies()
        .find_many(&FindMany::filtered(Filter::lt(
            "data_expirare",
            now + TimeDelta::days(30),
        )))
        .await
        .unwrap();
    assert_eq!(expiring.len(), 1);
    assert_eq!(expiring[0].serial_number, "SN-1");
}

#[tokio::test]
async fn malformed_queries_are_validation_errors() {
    let db = test_db().await;
    let repo = db.slot_machines();

    let unknown = repo
        .find_many(&FindMany::filtered(Filter::eq("colour", "red")))
        .await
        .unwrap_err();
    assert!(matches!(
        unknown,
        StoreError::Validation { field: Some(ref f), .. } if f == "colour"
    ));

    let wrong_type = repo.count(Some(&Filter::gt("rtp", "high"))).await.unwrap_err();
    assert!(matches!(wrong_type, StoreError::Validation { .. }));

    let text_op_on_number = repo
        .count(Some(&Filter::contains("max_bet", "5")))
        .await
        .unwrap_err();
    assert!(matches!(text_op_on_number, StoreError::Validation { .. }));

    let null_check_on_required = repo
        .count(Some(&Filter::is_null("serial_number")))
        .await
        .unwrap_err();
    assert!(matches!(null_check_on_required, StoreError::Validation { .. }));

    let negative = repo.find_many(&FindMany::new().skip(-1)).await.unwrap_err();
    assert!(matches!(negative, StoreError::Validation { .. }));

    let bad_order = repo
        .find_many(&FindMany::new().order_by(OrderBy::asc("nope")))
        .await
        .unwrap_err();
    assert!(matches!(bad_order, StoreError::Validation { .. }));
}

// === Batches ===

#[tokio::test]
async fn create_many_skips_duplicates_when_asked() {
    let db = test_db().await;
    provider(&db, "Novomatic").await;

    let batch = [
        ProviderCreate::new("Novomatic"),
        ProviderCreate::new("EGT"),
        ProviderCreate::new("EGT"),
        ProviderCreate::new("Amatic"),
    ];
    let inserted = db.providers().create_many(&batch, true).await.unwrap();
    assert_eq!(inserted, 2);
    assert_eq!(db.providers().count(None).await.unwrap(), 3);
}

#[tokio::test]
async fn create_many_is_all_or_nothing() {
    let db = test_db().await;
    provider(&db, "Novomatic").await;

    let batch = [ProviderCreate::new("EGT"), ProviderCreate::new("Novomatic")];
    let err = db.providers().create_many(&batch, false).await.unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation { .. }));
    assert_eq!(db.providers().count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn create_many_still_aborts_on_missing_reference() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;

    let batch = [
        CabinetCreate {
            name: "Gold Series".into(),
            manufacturer: "Novomatic".into(),
            provider_id: novomatic.id.clone(),
            model: None,
        },
        CabinetCreate {
            name: "Orphan".into(),
            manufacturer: "Nobody".into(),
            provider_id: "missing".into(),
            model: None,
        },
    ];
    let err = db.cabinets().create_many(&batch, true).await.unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation { .. }));
    assert_eq!(db.cabinets().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn update_many_touches_only_matching_rows() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let gold = cabinet(&db, &novomatic, "Gold Series").await;
    let a = slot_machine(&db, machine(&novomatic, &gold, "SN-1")).await;
    slot_machine(&db, machine(&novomatic, &gold, "SN-2")).await;
    slot_machine(&db, machine(&novomatic, &gold, "SN-3")).await;

    let affected = db
        .slot_machines()
        .update_many(
            Some(&Filter::in_list("serial_number", ["SN-1", "SN-2"])),
            &SlotMachineUpdate {
                status: Some("retired".into()),
                ..SlotMachineUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(affected, 2);

    let retired = db
        .slot_machines()
        .count(Some(&Filter::eq("status", "retired")))
        .await
        .unwrap();
    assert_eq!(retired, 2);

    let updated = db.slot_machines().find_by_id(&a.id).await.unwrap().unwrap();
    assert!(updated.updated_at > a.updated_at);
    assert_eq!(updated.created_at, a.created_at);

    let none = db
        .slot_machines()
        .update_many(
            Some(&Filter::eq("serial_number", "SN-404")),
            &SlotMachineUpdate::default(),
        )
        .await
        .unwrap();
    assert_eq!(none, 0);
}

#[tokio::test]
async fn update_many_rolls_back_on_collision() {
    let db = test_db().await;
    provider(&db, "Novomatic").await;
    provider(&db, "EGT").await;

    let err = db
        .providers()
        .update_many(
            None,
            &ProviderUpdate {
                name: Some("Same".into()),
                ..ProviderUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation { .. }));
    assert_eq!(
        db.providers()
            .count(Some(&Filter::eq("name", "Same")))
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn delete_many_respects_dependents() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    cabinet(&db, &novomatic, "Gold Series").await;
    provider(&db, "EGT").await;
    provider(&db, "Amatic").await;

    let err = db.providers().delete_many(None).await.unwrap_err();
    assert!(matches!(err, StoreError::ReferentialIntegrityViolation { .. }));
    assert_eq!(db.providers().count(None).await.unwrap(), 3);

    let deleted = db
        .providers()
        .delete_many(Some(&Filter::ne("name", "Novomatic")))
        .await
        .unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(db.providers().count(None).await.unwrap(), 1);
}

// === Aggregates ===

#[tokio::test]
async fn aggregate_over_numeric_fields() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let gold = cabinet(&db, &novomatic, "Gold Series").await;
    for (serial, rtp, places) in [("SN-1", 90.0, 1), ("SN-2", 96.0, 2), ("SN-3", 93.0, 3)] {
        slot_machine(
            &db,
            SlotMachineCreate {
                rtp: Some(rtp),
                gaming_places: Some(places),
                ..machine(&novomatic, &gold, serial)
            },
        )
        .await;
    }

    let result = db
        .slot_machines()
        .aggregate(
            &AggregateQuery::new()
                .min("rtp")
                .max("rtp")
                .avg("rtp")
                .sum("gaming_places")
                .max("serial_number"),
        )
        .await
        .unwrap();
    assert_eq!(result.count, 3);
    assert_eq!(result.min("rtp"), Some(&Value::Float(90.0)));
    assert_eq!(result.max("rtp"), Some(&Value::Float(96.0)));
    assert_eq!(result.avg("rtp"), Some(&Value::Float(93.0)));
    assert_eq!(result.sum("gaming_places"), Some(&Value::Int(6)));
    assert_eq!(result.max("serial_number"), Some(&Value::Text("SN-3".into())));

    let empty = db
        .slot_machines()
        .aggregate(
            &AggregateQuery::new()
                .filter(Filter::eq("status", "retired"))
                .sum("rtp"),
        )
        .await
        .unwrap();
    assert_eq!(empty.count, 0);
    assert_eq!(empty.sum("rtp"), Some(&Value::Null));

    let err = db
        .slot_machines()
        .aggregate(&AggregateQuery::new().avg("serial_number"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));
}

#[tokio::test]
async fn group_by_provider() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let egt = provider(&db, "EGT").await;
    let gold = cabinet(&db, &novomatic, "Gold Series").await;
    let fusion = cabinet(&db, &egt, "Fusion").await;
    for (p, c, serial, rtp) in [
        (&novomatic, &gold, "SN-1", 90.0),
        (&novomatic, &gold, "SN-2", 94.0),
        (&egt, &fusion, "SN-3", 96.0),
    ] {
        slot_machine(
            &db,
            SlotMachineCreate {
                rtp: Some(rtp),
                ..machine(p, c, serial)
            },
        )
        .await;
    }

    let groups = db
        .slot_machines()
        .group_by(
            &GroupBy::new(["manufacturer"])
                .aggregate(AggregateFn::Avg, "rtp")
                .order_by(OrderBy::desc("manufacturer")),
        )
        .await
        .unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].key("manufacturer"), Some(&Value::Text("Novomatic".into())));
    assert_eq!(groups[0].count, 2);
    assert_eq!(groups[0].avg("rtp"), Some(&Value::Float(92.0)));
    assert_eq!(groups[1].key("manufacturer"), Some(&Value::Text("EGT".into())));
    assert_eq!(groups[1].count, 1);

    let limited = db
        .slot_machines()
        .group_by(&GroupBy::new(["provider_id", "cabinet_id"]).take(1))
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].group.len(), 2);

    let err = db
        .slot_machines()
        .group_by(&GroupBy::new(["manufacturer"]).order_by(OrderBy::asc("rtp")))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));
}

// === Relations ===

#[tokio::test]
async fn lazy_relations_follow_one_hop() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let gold = cabinet(&db, &novomatic, "Gold Series").await;
    let blue = cabinet(&db, &novomatic, "Blue Series").await;
    let mix = game_mix(&db, &novomatic, "Mix 1").await;
    let with_mix = slot_machine(
        &db,
        SlotMachineCreate {
            game_mix_id: Some(mix.id.clone()),
            ..machine(&novomatic, &gold, "SN-1")
        },
    )
    .await;
    let without_mix = slot_machine(&db, machine(&novomatic, &blue, "SN-2")).await;

    let cabinets = db
        .fetch_many(
            &novomatic,
            Provider::CABINETS,
            &FindMany::new().order_by(OrderBy::asc("name")).take(1),
        )
        .await
        .unwrap();
    assert_eq!(cabinets, vec![blue]);

    assert_eq!(
        db.fetch_one(&with_mix, SlotMachine::GAME_MIX).await.unwrap(),
        Some(mix)
    );
    assert_eq!(
        db.fetch_one(&without_mix, SlotMachine::GAME_MIX)
            .await
            .unwrap(),
        None
    );
    assert_eq!(
        db.fetch_one(&without_mix, SlotMachine::PROVIDER)
            .await
            .unwrap(),
        Some(novomatic)
    );
}

#[tokio::test]
async fn nested_includes_load_per_parent() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let egt = provider(&db, "EGT").await;
    let gold = cabinet(&db, &novomatic, "Gold Series").await;
    cabinet(&db, &novomatic, "Zeta").await;
    let fusion = cabinet(&db, &egt, "Fusion").await;
    let mix = game_mix(&db, &novomatic, "Mix 1").await;
    slot_machine(
        &db,
        SlotMachineCreate {
            game_mix_id: Some(mix.id.clone()),
            ..machine(&novomatic, &gold, "SN-1")
        },
    )
    .await;

    let includes = [Include::new("cabinets")
        .query(FindMany::new().order_by(OrderBy::asc("name")).take(1))
        .include(Include::new("slot_machines").include(Include::new("game_mix")))];
    let providers = db
        .providers()
        .find_many_with(&FindMany::new(), &includes)
        .await
        .unwrap();
    assert_eq!(providers.len(), 2);

    let first = &providers[0];
    assert_eq!(first.record, novomatic);
    let cabinets = first.many("cabinets");
    assert_eq!(cabinets.len(), 1);
    assert_eq!(cabinets[0].decode::<Cabinet>().unwrap(), gold);

    let machines = cabinets[0].many("slot_machines");
    assert_eq!(machines.len(), 1);
    let loaded_mix = machines[0].one("game_mix").unwrap();
    assert_eq!(loaded_mix.decode::<GameMix>().unwrap(), mix);

    let second = &providers[1];
    let cabinets = second.many("cabinets");
    assert_eq!(cabinets.len(), 1);
    assert_eq!(cabinets[0].id(), Some(fusion.id.as_str()));
    assert!(cabinets[0].many("slot_machines").is_empty());
}

#[tokio::test]
async fn load_resolves_to_one_relations() {
    let db = test_db().await;
    let novomatic = provider(&db, "Novomatic").await;
    let gold = cabinet(&db, &novomatic, "Gold Series").await;
    let sm = slot_machine(&db, machine(&novomatic, &gold, "SN-1")).await;

    let loaded = db
        .slot_machines()
        .load(
            &sm,
            &[
                Include::new("provider").include(Include::new("cabinets")),
                Include::new("location"),
            ],
        )
        .await
        .unwrap();
    let owner = loaded.one("provider").unwrap();
    assert_eq!(owner.get("name"), Some(&serde_json::json!("Novomatic")));
    assert_eq!(owner.many("cabinets").len(), 1);
    assert!(loaded.one("location").is_none());
    assert!(matches!(
        loaded.relations.get("location"),
        Some(Related::One(None))
    ));
}

#[tokio::test]
async fn bad_includes_are_validation_errors() {
    let db = test_db().await;
    provider(&db, "Novomatic").await;

    let err = db
        .providers()
        .find_many_with(&FindMany::new(), &[Include::new("invoices")])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));

    let egt = provider(&db, "EGT").await;
    let fusion = cabinet(&db, &egt, "Fusion").await;
    let err = db
        .cabinets()
        .load(
            &fusion,
            &[Include::new("provider").query(FindMany::new().take(1))],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));
}

// === Catalog and files ===

#[tokio::test]
async fn catalog_matches_migrated_tables() {
    let db = test_db().await;
    for kind in EntityKind::ALL {
        let schema = kind.schema();
        let info: Vec<(String, String, bool, Option<String>)> = sqlx::query_as(
            "SELECT name, type, \"notnull\", dflt_value FROM pragma_table_info(?) ORDER BY cid",
        )
        .bind(schema.table)
        .fetch_all(db.pool())
        .await
        .unwrap();

        let names: Vec<_> = info.iter().map(|(name, ..)| name.as_str()).collect();
        let expected: Vec<_> = schema.columns.iter().map(|c| c.name).collect();
        assert_eq!(names, expected, "{}", schema.table);

        for ((_, sql_type, not_null, default), column) in info.iter().zip(schema.columns) {
            let kind_type = match column.kind {
                FieldKind::Text | FieldKind::DateTime => "TEXT",
                FieldKind::Int => "INTEGER",
                FieldKind::Float => "REAL",
            };
            assert_eq!(sql_type, kind_type, "{}.{}", schema.table, column.name);
            assert_eq!(*not_null, !column.nullable, "{}.{}", schema.table, column.name);
            assert_eq!(
                default.is_some(),
                column.has_default,
                "{}.{}",
                schema.table,
                column.name
            );
        }
    }
}

#[tokio::test]
async fn table_counts_cover_every_table() {
    let db = test_db().await;
    provider(&db, "Novomatic").await;

    let counts = db.table_counts().await.unwrap();
    assert_eq!(counts.len(), EntityKind::ALL.len());
    assert!(counts.contains(&(EntityKind::Provider, 1)));
    assert!(counts.contains(&(EntityKind::User, 0)));
}

#[tokio::test]
async fn file_database_persists_across_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("registry.db");

    let db = Database::open(&path).await.unwrap();
    let novomatic = provider(&db, "Novomatic").await;
    db.pool().close().await;

    let reopened = Database::open(&path).await.unwrap();
    let found = reopened
        .providers()
        .find_unique(&ProviderKey::Name("Novomatic".into()))
        .await
        .unwrap();
    assert_eq!(found, Some(novomatic));
}
