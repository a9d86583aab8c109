mod common;

use std::collections::BTreeSet;

use client_manager::catalog::Field;
use client_manager::db::{CLIENTS_KEY, COLUMN_MAPPING_KEY};
use client_manager::models::ColumnTarget;
use client_manager::spreadsheet::{read_rows, write_export};
use client_manager::{Error, ImportOutcome};

use common::{client, memory_store, row, store_with, FlakyStorage};

#[tokio::test]
async fn known_headers_import_immediately() {
    let mut store = memory_store();
    let rows = vec![
        row(&[("Nombre", "Ana"), ("Correo", "ana@example.com"), ("Etiquetas", "Activo, VIP")]),
        row(&[("Nombre", "Luis"), ("Correo", ""), ("Etiquetas", "")]),
    ];

    let outcome = store.import_rows(rows).await.unwrap();
    assert_eq!(outcome, ImportOutcome::Imported { added: 2, skipped: 0 });

    let ana = &store.all()[0];
    assert_eq!(ana.first_name, "Ana");
    assert_eq!(ana.email, "ana@example.com");
    assert_eq!(ana.tags, vec!["Activo".to_string(), "VIP".to_string()]);
    // imported rows are not validated
    assert_eq!(store.all()[1].email, "");
    assert!(store.pending_import().is_none());
}

#[tokio::test]
async fn blank_rows_are_skipped() {
    let mut store = memory_store();
    let rows = vec![row(&[("Nombre", "Ana")]), row(&[("Nombre", "  ")])];
    let outcome = store.import_rows(rows).await.unwrap();
    assert_eq!(outcome, ImportOutcome::Imported { added: 1, skipped: 1 });
}

#[tokio::test]
async fn unknown_header_pauses_without_changes() {
    let mut store = memory_store();
    store.add(client("Ana", "ana@example.com")).await.unwrap();
    let before = store.storage().raw(CLIENTS_KEY);

    let rows = vec![
        row(&[("Nombre", "Luis"), ("Zona", "Norte"), ("Vendedor", "Juan")]),
        row(&[("Nombre", "Eva"), ("Zona", "Sur"), ("Vendedor", "Rosa")]),
    ];
    let outcome = store.import_rows(rows).await.unwrap();

    assert_eq!(
        outcome,
        ImportOutcome::NeedsMapping {
            unknown: vec!["Zona".to_string(), "Vendedor".to_string()]
        }
    );
    assert_eq!(store.all().len(), 1);
    assert_eq!(store.storage().raw(CLIENTS_KEY), before);
    assert_eq!(store.pending_import().unwrap().rows().len(), 2);
}

#[tokio::test]
async fn completing_appends_held_rows_and_remembers_mapping() {
    let mut store = memory_store();
    let rows = vec![
        row(&[("Nombre", "Luis"), ("Zona", "Norte"), ("Vendedor", "Juan")]),
        row(&[("Nombre", "Eva"), ("Zona", "Sur"), ("Vendedor", "Rosa")]),
    ];
    store.import_rows(rows.clone()).await.unwrap();

    let pending = store.pending_import_mut().unwrap();
    pending.select("Zona", ColumnTarget::Field(Field::Location)).unwrap();
    pending.select("Vendedor", ColumnTarget::Ignore).unwrap();

    let outcome = store.complete_import().await.unwrap();
    assert_eq!(outcome, ImportOutcome::Imported { added: 2, skipped: 0 });
    assert!(store.pending_import().is_none());

    let names: Vec<&str> = store.all().iter().map(|c| c.first_name.as_str()).collect();
    assert_eq!(names, ["Luis", "Eva"]);
    assert_eq!(store.all()[1].location, "Sur");
    assert!(store.all()[0].extra.is_empty());

    let saved = store.storage().raw(COLUMN_MAPPING_KEY).unwrap();
    assert_eq!(saved, r#"{"Vendedor":"","Zona":"location"}"#);

    // the same layout goes straight through next time
    let outcome = store.import_rows(rows).await.unwrap();
    assert_eq!(outcome, ImportOutcome::Imported { added: 2, skipped: 0 });
    assert_eq!(store.all()[3].location, "Sur");
}

#[tokio::test]
async fn unchosen_unknown_headers_land_in_extra_fields() {
    let mut store = memory_store();
    store
        .import_rows(vec![row(&[("Nombre", "Luis"), ("Zona", "Norte")])])
        .await
        .unwrap();

    store.complete_import().await.unwrap();
    let luis = &store.all()[0];
    assert_eq!(luis.first_name, "Luis");
    assert_eq!(luis.extra.get("Zona").map(String::as_str), Some("Norte"));
}

#[tokio::test]
async fn only_one_import_can_wait() {
    let mut store = memory_store();
    store.import_rows(vec![row(&[("Zona", "Norte")])]).await.unwrap();

    let second = store.import_rows(vec![row(&[("Nombre", "Ana")])]).await;
    assert!(matches!(second, Err(Error::ImportInProgress)));
    assert_eq!(store.pending_import().unwrap().headers(), ["Zona".to_string()]);
}

#[tokio::test]
async fn cancel_discards_the_batch() {
    let mut store = memory_store();
    store.import_rows(vec![row(&[("Zona", "Norte")])]).await.unwrap();

    store.cancel_import().unwrap();
    assert!(store.pending_import().is_none());
    assert!(store.all().is_empty());
    assert_eq!(store.storage().raw(COLUMN_MAPPING_KEY), None);
    assert!(matches!(store.cancel_import(), Err(Error::NoPendingImport)));
    assert!(matches!(store.complete_import().await, Err(Error::NoPendingImport)));
}

#[tokio::test]
async fn clear_mapping_brings_the_dialog_back() {
    let mut store = memory_store();
    let rows = vec![row(&[("Zona", "Norte")])];
    store.import_rows(rows.clone()).await.unwrap();
    store
        .pending_import_mut()
        .unwrap()
        .select("Zona", ColumnTarget::Field(Field::Location))
        .unwrap();
    store.complete_import().await.unwrap();

    store.clear_mapping().await.unwrap();
    assert!(store.mapping().is_empty());
    assert_eq!(store.storage().raw(COLUMN_MAPPING_KEY), None);

    let outcome = store.import_rows(rows).await.unwrap();
    assert!(matches!(outcome, ImportOutcome::NeedsMapping { .. }));
}

#[tokio::test]
async fn failed_completion_keeps_the_batch_pending() {
    let mut store = store_with(FlakyStorage::default());
    store.import_rows(vec![row(&[("Zona", "Norte")])]).await.unwrap();

    store.storage().fail_writes(true);
    assert!(matches!(store.complete_import().await, Err(Error::Storage(_))));
    assert!(store.pending_import().is_some());
    assert!(store.mapping().is_empty());
    assert!(store.all().is_empty());

    store.storage().fail_writes(false);
    store.complete_import().await.unwrap();
    assert_eq!(store.all().len(), 1);
}

#[tokio::test]
async fn csv_export_imports_back() {
    let mut source = memory_store();
    let ana = source.add(client("Ana", "ana@example.com")).await.unwrap();
    let mut edited = source.get(ana).unwrap().clone();
    edited.company = "ACME, S.A.".to_string();
    edited.tax_id = "20-123".to_string();
    edited.tags = vec!["Activo".to_string(), "VIP".to_string()];
    source.update(ana, edited).await.unwrap();
    source.add_note(ana, "Llamar el lunes").await.unwrap();
    source.add_note(ana, "Enviar presupuesto").await.unwrap();
    source.add(client("Luis", "luis@example.com")).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clientes.csv");
    write_export(&path, source.all()).unwrap();

    let mut target = memory_store();
    let outcome = target.import_rows(read_rows(&path).unwrap()).await.unwrap();
    assert_eq!(outcome, ImportOutcome::Imported { added: 2, skipped: 0 });

    let original = &source.all()[0];
    let copy = &target.all()[0];
    for field in Field::ALL {
        if matches!(field, Field::Tags | Field::Notes) {
            continue;
        }
        assert_eq!(copy.field(field), original.field(field), "{field}");
    }
    let tags = |c: &client_manager::models::Client| c.tags.iter().cloned().collect::<BTreeSet<_>>();
    assert_eq!(tags(copy), tags(original));
    let notes: Vec<&str> = copy.notes.iter().map(|n| n.content.as_str()).collect();
    assert_eq!(notes, ["Llamar el lunes", "Enviar presupuesto"]);
    assert!(copy.extra.is_empty());
}

#[tokio::test]
async fn workbook_export_imports_back() {
    let mut source = memory_store();
    let ana = source.add(client("Ana", "ana@example.com")).await.unwrap();
    source.add_note(ana, "Primera visita").await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clientes.xlsx");
    write_export(&path, source.all()).unwrap();

    let rows = read_rows(&path).unwrap();
    assert_eq!(rows.len(), 1);

    let mut target = memory_store();
    target.import_rows(rows).await.unwrap();
    let copy = &target.all()[0];
    assert_eq!(copy.first_name, "Ana");
    assert_eq!(copy.email, "ana@example.com");
    assert_eq!(copy.notes[0].content, "Primera visita");
}

#[tokio::test]
async fn near_miss_catalog_headers_pause_for_mapping() {
    let mut store = memory_store();
    let outcome = store
        .import_rows(vec![row(&[("Phone", "555"), ("Email", "a@b.c")])])
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ImportOutcome::NeedsMapping {
            unknown: vec!["Phone".to_string(), "Email".to_string()]
        }
    );
    assert!(store.all().is_empty());

    // kept as is, the normalizer still lands them on their fields
    store.complete_import().await.unwrap();
    assert_eq!(store.all()[0].phone, "555");
    assert_eq!(store.all()[0].email, "a@b.c");
}

#[tokio::test]
async fn failed_clients_write_rolls_back_the_saved_mapping() {
    let mut store = store_with(FlakyStorage::default());
    store.import_rows(vec![row(&[("Zona", "Norte")])]).await.unwrap();
    store
        .pending_import_mut()
        .unwrap()
        .select("Zona", ColumnTarget::Field(Field::Location))
        .unwrap();

    // first write is the mapping, second the clients
    store.storage().fail_nth_write(2);
    assert!(matches!(store.complete_import().await, Err(Error::Storage(_))));

    assert!(store.pending_import().is_some());
    assert!(store.all().is_empty());
    assert!(store.mapping().is_empty());
    assert_eq!(store.storage().inner.raw(COLUMN_MAPPING_KEY), None);

    store.cancel_import().unwrap();
    assert_eq!(store.storage().inner.raw(COLUMN_MAPPING_KEY), None);
}

#[tokio::test]
async fn rollback_restores_an_earlier_mapping_verbatim() {
    let mut store = store_with(FlakyStorage::default());
    store.import_rows(vec![row(&[("Vendedor", "Juan")])]).await.unwrap();
    store
        .pending_import_mut()
        .unwrap()
        .select("Vendedor", ColumnTarget::Ignore)
        .unwrap();
    store.complete_import().await.unwrap();
    let saved = store.storage().inner.raw(COLUMN_MAPPING_KEY);

    store.import_rows(vec![row(&[("Zona", "Norte")])]).await.unwrap();
    store
        .pending_import_mut()
        .unwrap()
        .select("Zona", ColumnTarget::Field(Field::Location))
        .unwrap();
    store.storage().fail_nth_write(2);
    assert!(store.complete_import().await.is_err());

    assert_eq!(store.storage().inner.raw(COLUMN_MAPPING_KEY), saved);
    assert_eq!(store.mapping().len(), 1);
}

#[tokio::test]
async fn keeping_a_column_as_is_forgets_its_saved_entry() {
    let mut store = memory_store();
    store.import_rows(vec![row(&[("Zona", "Norte")])]).await.unwrap();
    store
        .pending_import_mut()
        .unwrap()
        .select("Zona", ColumnTarget::Field(Field::Location))
        .unwrap();
    store.complete_import().await.unwrap();

    // a layout with one more unknown column reopens the dialog
    store
        .import_rows(vec![row(&[("Zona", "Sur"), ("Vendedor", "Rosa")])])
        .await
        .unwrap();
    let pending = store.pending_import_mut().unwrap();
    pending.unselect("Zona").unwrap();
    pending.select("Vendedor", ColumnTarget::Ignore).unwrap();
    store.complete_import().await.unwrap();

    assert_eq!(store.all()[1].extra.get("Zona").map(String::as_str), Some("Sur"));
    assert_eq!(store.mapping().get("Zona"), None);
    assert_eq!(
        store.storage().raw(COLUMN_MAPPING_KEY).as_deref(),
        Some(r#"{"Vendedor":""}"#)
    );
}
