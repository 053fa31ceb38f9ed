//! Integration tests for the auto-save synchronizer
//!
//! These tests verify that:
//! - Repeated edits of a line collapse into one upsert per pass
//! - The debounce window coalesces a burst of edits into a single pass
//! - A failed line stays pending and only that line is resent
//! - An edit made while its line is being written is resent after the write
//! - Lines missing a required field are held back, not sent

mod common;

use common::{code, date, flaky_ledgers, project, seed_inventory, test_config};
use packline::core::session::PackingSession;
use packline::core::store::{LineEdit, NewLine, StoreAction};
use packline::core::sync::SaveStatus;
use packline::domain::{GroupId, LineId, PackingGroup};
use std::time::Duration;
use tokio::sync::watch;

async fn group(session: &PackingSession, packing_code: Option<&str>, boxes: u32) -> GroupId {
    let mut group = PackingGroup::new(packing_code.map(code), boxes).with_project(project("P-1"));
    group.pl_date = Some(date(2));
    let id = group.id;
    session.edit(StoreAction::AddGroup(group), None).await.unwrap();
    id
}

async fn line(session: &PackingSession, group_id: GroupId, name: &str) -> LineId {
    let line = NewLine::new(name).with_packaging(5, 2);
    let id = line.id;
    session
        .edit(StoreAction::AddLine { group_id, line }, None)
        .await
        .unwrap();
    id
}

fn rename(line_id: LineId, name: &str) -> StoreAction {
    StoreAction::EditLine {
        line_id,
        edit: LineEdit::ProductName(name.to_string()),
    }
}

#[tokio::test]
async fn test_repeated_edits_upsert_once_per_pass() {
    let (store, packing, ledgers) = flaky_ledgers();
    let session = PackingSession::new(ledgers, &test_config());
    let group_id = group(&session, Some("PK-001"), 10).await;
    let line_id = line(&session, group_id, "Hinge").await;

    for name in ["Hinge A", "Hinge B", "Hinge C", "Hinge D"] {
        session.edit(rename(line_id, name), None).await.unwrap();
    }

    let report = session.synchronizer().flush(None).await;
    assert_eq!(report.attempted, 1);
    assert_eq!(report.inserted, 1);
    assert_eq!(packing.upsert_count(), 1);
    assert_eq!(store.line(&line_id).await.unwrap().product_name, "Hinge D");

    // Nothing dirty: a second pass sends nothing
    let report = session.synchronizer().flush(None).await;
    assert!(report.is_empty());
    assert_eq!(packing.upsert_count(), 1);
    assert_eq!(store.line_count().await, 1);
}

#[tokio::test]
async fn test_first_upsert_forces_insert_then_updates() {
    let (store, packing, ledgers) = flaky_ledgers();
    let session = PackingSession::new(ledgers, &test_config());
    let group_id = group(&session, Some("PK-001"), 10).await;
    let line_id = line(&session, group_id, "Hinge").await;

    session.synchronizer().flush(None).await;
    session.edit(rename(line_id, "Hinge XL"), None).await.unwrap();
    let report = session.synchronizer().flush(None).await;
    assert_eq!(report.updated, 1);

    let sent = packing.requests_for(line_id);
    assert_eq!(sent.len(), 2);
    assert!(sent[0].force_insert);
    assert!(!sent[1].force_insert);
    assert_eq!(store.line_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_coalesces_burst_into_one_pass() {
    let (_store, packing, ledgers) = flaky_ledgers();
    let session = PackingSession::new(ledgers, &test_config());
    let (stop_tx, stop_rx) = watch::channel(false);
    let worker = session.start_autosave(stop_rx);

    let group_id = group(&session, Some("PK-001"), 10).await;
    let line_id = line(&session, group_id, "Hinge").await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.edit(rename(line_id, "Hinge A"), None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.edit(rename(line_id, "Hinge B"), None).await.unwrap();

    // Quiet period restarts at 200 ms, so nothing is written at 650 ms
    tokio::time::sleep(Duration::from_millis(450)).await;
    assert_eq!(packing.upsert_count(), 0);
    assert!(session.synchronizer().is_pending(&line_id).await);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(packing.upsert_count(), 1);
    assert_eq!(packing.requests()[0].product_name, "Hinge B");
    assert!(!session.synchronizer().is_pending(&line_id).await);

    stop_tx.send(true).unwrap();
    worker.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_worker_flushes_pending_lines_on_shutdown() {
    let (store, packing, ledgers) = flaky_ledgers();
    let session = PackingSession::new(ledgers, &test_config());
    let (stop_tx, stop_rx) = watch::channel(false);
    let worker = session.start_autosave(stop_rx);

    let group_id = group(&session, Some("PK-001"), 10).await;
    let line_id = line(&session, group_id, "Hinge").await;

    // Shut down well inside the debounce window
    tokio::time::sleep(Duration::from_millis(50)).await;
    stop_tx.send(true).unwrap();
    worker.await.unwrap();

    assert_eq!(packing.upsert_count(), 1);
    assert!(store.line(&line_id).await.is_some());
    assert_eq!(session.synchronizer().pending_count().await, 0);
}

#[tokio::test]
async fn test_partial_failure_resends_only_failed_line() {
    let (store, packing, ledgers) = flaky_ledgers();
    let session = PackingSession::new(ledgers, &test_config());
    let group_id = group(&session, Some("PK-001"), 10).await;
    let ok_line = line(&session, group_id, "Hinge").await;
    let bad_line = line(&session, group_id, "Bracket").await;
    packing.fail_line(bad_line);

    let report = session.synchronizer().flush(None).await;
    assert_eq!(report.attempted, 2);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.failed, 1);
    assert!(report.failures[0].retryable);
    assert_eq!(report.failures[0].line_id, bad_line.to_string());
    assert_eq!(
        session.synchronizer().status(),
        SaveStatus::Error { failed: 1, total: 2 }
    );
    assert!(session.synchronizer().is_pending(&bad_line).await);
    assert!(!session.synchronizer().is_pending(&ok_line).await);
    assert!(store.line(&ok_line).await.is_some());
    assert!(store.line(&bad_line).await.is_none());

    packing.heal();
    let report = session.synchronizer().flush(None).await;
    assert_eq!(report.attempted, 1);
    assert_eq!(report.inserted, 1);
    assert_eq!(packing.requests_for(ok_line).len(), 1);
    // Never written, so the resend still forces an insert
    assert!(packing.requests_for(bad_line).last().unwrap().force_insert);
    assert_eq!(session.synchronizer().status(), SaveStatus::Success);
    assert_eq!(store.line_count().await, 2);
}

#[tokio::test]
async fn test_edit_during_in_flight_pass_is_resent() {
    let (store, packing, ledgers) = flaky_ledgers();
    let session = PackingSession::new(ledgers, &test_config());
    let sync = session.synchronizer().clone();
    let group_id = group(&session, Some("PK-001"), 10).await;
    let line_id = line(&session, group_id, "Hinge").await;

    packing.hold_upserts();
    let pass = tokio::spawn({
        let sync = sync.clone();
        async move { sync.flush(None).await }
    });
    packing.upsert_started().await;

    sync.submit(
        StoreAction::EditLine {
            line_id,
            edit: LineEdit::PackagingCount(3),
        },
        None,
    )
    .await
    .unwrap();
    assert!(sync.is_pending(&line_id).await);

    packing.release_upserts();
    let first = pass.await.unwrap();
    assert_eq!(first.inserted, 1);
    assert_eq!(store.line(&line_id).await.unwrap().export_quantity, 100);
    assert!(sync.is_pending(&line_id).await);

    let second = sync.flush(None).await;
    assert_eq!(second.attempted, 1);
    assert_eq!(second.updated, 1);
    let sent = packing.requests_for(line_id);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].packaging_count, 3);
    assert!(!sent[1].force_insert);
    assert_eq!(store.line(&line_id).await.unwrap().export_quantity, 150);
    assert_eq!(sync.pending_count().await, 0);
}

#[tokio::test]
async fn test_transient_failure_retried_within_pass() {
    let (store, packing, ledgers) = flaky_ledgers();
    let session = PackingSession::new(ledgers, &test_config());
    let group_id = group(&session, Some("PK-001"), 10).await;
    let line_id = line(&session, group_id, "Hinge").await;
    packing.fail_next(2);

    let report = session.synchronizer().flush(None).await;
    assert!(report.is_successful());
    assert_eq!(report.inserted, 1);
    assert_eq!(packing.upsert_count(), 3);
    assert!(store.line(&line_id).await.is_some());
}

#[tokio::test]
async fn test_box_count_change_resends_group_and_reconciles() {
    let (store, packing, ledgers) = flaky_ledgers();
    seed_inventory(&store, "P-1", 500).await;
    let session = PackingSession::new(ledgers, &test_config());
    let group_id = group(&session, Some("PK-001"), 10).await;
    let first = line(&session, group_id, "Hinge").await;
    let second = line(&session, group_id, "Bracket").await;

    let report = session.save_all(None).await;
    assert!(report.is_successful());
    assert_eq!(report.reconciled().next().unwrap().export_quantity, 200);

    session
        .edit(
            StoreAction::SetBoxCount {
                group_id,
                box_count: 12,
            },
            None,
        )
        .await
        .unwrap();
    let report = session.save_all(None).await;
    assert_eq!(report.sync.updated, 2);

    for line_id in [first, second] {
        let sent = packing.requests_for(line_id);
        assert_eq!(sent.last().unwrap().box_count, 12);
        assert_eq!(store.line(&line_id).await.unwrap().export_quantity, 120);
    }

    let inventory = report.reconciled().next().unwrap();
    assert_eq!(inventory.export_quantity, 240);
    assert_eq!(inventory.remain_quantity, 260);
}

#[tokio::test]
async fn test_lines_missing_required_fields_held_back() {
    let (store, packing, ledgers) = flaky_ledgers();
    let session = PackingSession::new(ledgers, &test_config());
    let uncoded = group(&session, None, 10).await;
    let line_id = line(&session, uncoded, "Hinge").await;

    let coded = group(&session, Some("PK-002"), 4).await;
    let unnamed = line(&session, coded, "   ").await;

    let report = session.synchronizer().flush(None).await;
    assert_eq!(report.attempted, 0);
    assert_eq!(report.skipped, 2);
    assert_eq!(packing.upsert_count(), 0);
    assert!(session.synchronizer().is_pending(&line_id).await);
    assert!(session.synchronizer().is_pending(&unnamed).await);

    session
        .edit(
            StoreAction::SetPackingCode {
                group_id: uncoded,
                packing_code: Some(code("PK-001")),
            },
            None,
        )
        .await
        .unwrap();
    let report = session.synchronizer().flush(None).await;
    assert_eq!(report.inserted, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(store.line(&line_id).await.unwrap().packing_code, code("PK-001"));
}

#[tokio::test]
async fn test_date_input_outranks_group_date() {
    let (store, _packing, ledgers) = flaky_ledgers();
    let session = PackingSession::new(ledgers, &test_config());
    let group_id = group(&session, Some("PK-001"), 10).await;
    let line_id = line(&session, group_id, "Hinge").await;

    session.synchronizer().flush(Some(date(9))).await;
    assert_eq!(store.line(&line_id).await.unwrap().pl_date, date(9));
}

#[tokio::test]
async fn test_default_date_used_without_any_date() {
    let (store, _packing, ledgers) = flaky_ledgers();
    let session = PackingSession::new(ledgers, &test_config());
    let group = PackingGroup::new(Some(code("PK-001")), 1);
    let group_id = group.id;
    session.edit(StoreAction::AddGroup(group), None).await.unwrap();
    let line_id = line(&session, group_id, "Hinge").await;

    session.synchronizer().flush(None).await;
    assert_eq!(store.line(&line_id).await.unwrap().pl_date, date(2));
}

#[tokio::test(start_paused = true)]
async fn test_success_status_reverts_to_idle() {
    let (_store, _packing, ledgers) = flaky_ledgers();
    let session = PackingSession::new(ledgers, &test_config());
    let group_id = group(&session, Some("PK-001"), 10).await;
    line(&session, group_id, "Hinge").await;

    session.synchronizer().flush(None).await;
    assert_eq!(session.synchronizer().status(), SaveStatus::Success);

    tokio::time::sleep(Duration::from_millis(2900)).await;
    assert_eq!(session.synchronizer().status(), SaveStatus::Success);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(session.synchronizer().status(), SaveStatus::Idle);
}
