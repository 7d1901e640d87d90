//! Integration tests for the stage graph and the interrupt/resume protocol.

mod common;

use std::sync::Arc;

use common::*;
use selection_engine::prelude::*;

// =============================================================================
// Helper Functions
// =============================================================================

fn instance(mode: Mode) -> WorkflowInstance {
    WorkflowInstance::new(SessionId::new_random(), request(mode))
}

fn fill_engine(items: &[(&str, &str)]) -> (WorkflowEngine, Arc<InMemoryCatalog>) {
    let catalog = Arc::new(kitchen_catalog());
    let engine = engine_with(ScriptedOracle::new(items), catalog.clone());
    (engine, catalog)
}

// =============================================================================
// Save mode
// =============================================================================

#[tokio::test]
async fn test_save_new_completes_without_suspension() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let engine = engine_with(
        ScriptedOracle::new(&[("Spülmaschine", "Geschirrspüler"), ("Fritteuse 2x8l", "Fritteuse")]),
        catalog.clone(),
    );
    let mut wf = instance(Mode::SaveNew);

    let status = engine.advance(&mut wf, None).await.unwrap();

    assert_eq!(status, RunStatus::Completed);
    assert_eq!(wf.cursor(), Stage::Completed);
    assert!(wf.record().selected_rows().is_empty());
    assert_eq!(wf.record().current_group_index(), 0);
    assert!(wf.record().candidates_for_current_group().is_empty());

    let rows = catalog.list().await.unwrap();
    let raws: Vec<_> = rows.iter().map(|r| r.device_raw.as_str()).collect();
    assert_eq!(raws, ["Spülmaschine", "Fritteuse 2x8l"]);
    assert_eq!(rows[1].device_matched.as_deref(), Some("Fritteuse"));
}

#[tokio::test]
async fn test_save_failure_leaves_instance_at_start() {
    let catalog = Arc::new(FlakyCatalog {
        inserts_before_failure: Some(1),
        ..FlakyCatalog::default()
    });
    let engine = engine_with(
        ScriptedOracle::new(&[("Herd", HERD), ("Kühltisch", KUEHLTISCH)]),
        catalog.clone(),
    );
    let mut wf = instance(Mode::SaveNew);

    let err = engine.advance(&mut wf, None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Store);
    assert_eq!(wf.cursor(), Stage::Start);
    assert!(wf.record().extracted_items().is_empty());
    // Inserts are at-least-once: the first row stays.
    assert_eq!(catalog.inner.len(), 1);
}

// =============================================================================
// Group resolution
// =============================================================================

#[tokio::test]
async fn test_fill_suspends_once_per_group() {
    let (engine, _catalog) = fill_engine(&[
        ("Kühltisch 3-türig", KUEHLTISCH),
        ("Elektroherd", HERD),
        ("Kühltisch 2-türig", KUEHLTISCH),
    ]);
    let mut wf = instance(Mode::FillFromCatalog);

    let mut suspensions = 0;
    let mut status = engine.advance(&mut wf, None).await.unwrap();
    let picks = [1, 11, 3];
    while status == RunStatus::Suspended {
        suspensions += 1;
        let before = wf.record().current_group_index();
        let record = wf.record();
        assert_eq!(record.selected_rows().len(), before);
        assert!(!record.candidates_for_current_group().is_empty());

        status = engine
            .advance(&mut wf, Some(Selection::new(picks[before])))
            .await
            .unwrap();
        assert_eq!(wf.record().current_group_index(), before + 1);
    }

    assert_eq!(suspensions, 3);
    assert_eq!(status, RunStatus::Completed);
    let ids: Vec<_> = wf.record().selected_rows().iter().map(|r| r.id).collect();
    assert_eq!(ids, [1, 11, 3]);
}

#[tokio::test]
async fn test_suspension_surfaces_group_progress() {
    let (engine, _catalog) = fill_engine(&[("Elektroherd", HERD), ("Kühltisch", KUEHLTISCH)]);
    let mut wf = instance(Mode::FillFromCatalog);
    engine.advance(&mut wf, None).await.unwrap();

    let pending = wf.snapshot().pending.unwrap();
    assert_eq!(pending.group_index, 0);
    assert_eq!(pending.total_groups, 2);
    assert_eq!(pending.group.group_key(), HERD);
    let ids: Vec<_> = pending.candidates.iter().map(|r| r.id).collect();
    assert_eq!(ids, [10, 11]);
}

#[tokio::test]
async fn test_duplicate_group_keys_are_resolved_separately() {
    // Two extracted items sharing one canonical group: matching keeps both,
    // so the operator decides twice.
    let (engine, _catalog) = fill_engine(&[
        ("Kühltisch links", KUEHLTISCH),
        ("Kühltisch rechts", KUEHLTISCH),
    ]);
    let mut wf = instance(Mode::FillFromCatalog);

    assert_eq!(engine.advance(&mut wf, None).await.unwrap(), RunStatus::Suspended);
    assert_eq!(wf.record().candidates_for_current_group().len(), 3);
    assert_eq!(
        engine.advance(&mut wf, Some(Selection::new(2))).await.unwrap(),
        RunStatus::Suspended
    );
    assert_eq!(
        engine.advance(&mut wf, Some(Selection::new(2))).await.unwrap(),
        RunStatus::Completed
    );

    let ids: Vec<_> = wf.record().selected_rows().iter().map(|r| r.id).collect();
    assert_eq!(ids, [2, 2]);
}

#[tokio::test]
async fn test_unknown_candidate_is_not_consumed() {
    let (engine, _catalog) = fill_engine(&[("Elektroherd", HERD)]);
    let mut wf = instance(Mode::FillFromCatalog);
    engine.advance(&mut wf, None).await.unwrap();

    // Row 1 exists, but belongs to another group.
    let err = engine
        .advance(&mut wf, Some(Selection::new(1)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
    assert_eq!(wf.cursor(), Stage::AwaitSelection);
    assert_eq!(wf.record().current_group_index(), 0);
    assert!(wf.record().selected_rows().is_empty());

    // Retry with a valid id succeeds.
    let status = engine.advance(&mut wf, Some(Selection::new(10))).await.unwrap();
    assert_eq!(status, RunStatus::Completed);
}

#[tokio::test]
async fn test_stale_selection_is_rejected() {
    let (engine, _catalog) = fill_engine(&[("Elektroherd", HERD), ("Gasherd", HERD)]);
    let mut wf = instance(Mode::FillFromCatalog);
    engine.advance(&mut wf, None).await.unwrap();
    engine
        .advance(&mut wf, Some(Selection::new(10).for_group(0)))
        .await
        .unwrap();

    let err = engine
        .advance(&mut wf, Some(Selection::new(11).for_group(0)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::StaleSelection {
            expected: 0,
            current: 1
        }
    ));
    assert_eq!(wf.record().selected_rows().len(), 1);
}

// =============================================================================
// Protocol errors
// =============================================================================

#[tokio::test]
async fn test_protocol_errors() {
    let (engine, _catalog) = fill_engine(&[("Elektroherd", HERD)]);
    let mut wf = instance(Mode::FillFromCatalog);

    let err = engine
        .advance(&mut wf, Some(Selection::new(10)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::NoPendingSelection {
            stage: Stage::Start
        }
    ));

    engine.advance(&mut wf, None).await.unwrap();
    let err = engine.advance(&mut wf, None).await.unwrap_err();
    assert!(matches!(err, WorkflowError::MissingSelection));

    engine.advance(&mut wf, Some(Selection::new(10))).await.unwrap();
    let err = engine
        .advance(&mut wf, Some(Selection::new(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyCompleted));
    assert_eq!(err.kind(), ErrorKind::Protocol);
}

// =============================================================================
// Oracle and store failures
// =============================================================================

#[tokio::test]
async fn test_empty_extraction_is_an_oracle_error() {
    let engine = engine_with(ScriptedOracle::new(&[]), Arc::new(kitchen_catalog()));
    let mut wf = instance(Mode::FillFromCatalog);

    let err = engine.advance(&mut wf, None).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Oracle(OracleError::Empty { stage: "extract" })
    ));
    assert_eq!(wf.cursor(), Stage::Start);
}

#[tokio::test]
async fn test_matching_that_drops_items_is_rejected() {
    let oracle = ScriptedOracle::new(&[("Elektroherd", HERD), ("Kühltisch", KUEHLTISCH)])
        .with_matching(vec![MatchedDevice {
            device: device("Elektroherd"),
            device_matched: HERD.to_string(),
        }]);
    let engine = engine_with(oracle, Arc::new(kitchen_catalog()));
    let mut wf = instance(Mode::FillFromCatalog);

    let err = engine.advance(&mut wf, None).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Oracle(OracleError::ArityMismatch {
            extracted: 2,
            matched: 1
        })
    ));
}

#[tokio::test]
async fn test_matching_that_reorders_items_is_rejected() {
    let oracle = ScriptedOracle::new(&[("Elektroherd", HERD), ("Kühltisch", KUEHLTISCH)])
        .with_matching(vec![
            MatchedDevice {
                device: device("Kühltisch"),
                device_matched: KUEHLTISCH.to_string(),
            },
            MatchedDevice {
                device: device("Elektroherd"),
                device_matched: HERD.to_string(),
            },
        ]);
    let engine = engine_with(oracle, Arc::new(kitchen_catalog()));
    let mut wf = instance(Mode::FillFromCatalog);

    let err = engine.advance(&mut wf, None).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Oracle(OracleError::Diverged { index: 0, .. })
    ));
}

#[tokio::test]
async fn test_group_without_candidates_never_suspends() {
    let (engine, _catalog) = fill_engine(&[("Pizzaofen", "Pizzaofen")]);
    let mut wf = instance(Mode::FillFromCatalog);

    let err = engine.advance(&mut wf, None).await.unwrap_err();
    assert!(matches!(err, WorkflowError::EmptyCandidates { ref group_key } if group_key == "Pizzaofen"));
    assert_eq!(wf.cursor(), Stage::Start);
}

#[tokio::test]
async fn test_lookup_failure_on_resume_keeps_last_checkpoint() {
    let catalog = Arc::new(FlakyCatalog {
        inner: kitchen_catalog(),
        ..FlakyCatalog::default()
    });
    let engine = engine_with(
        ScriptedOracle::new(&[("Elektroherd", HERD), ("Kühltisch", KUEHLTISCH)]),
        catalog.clone(),
    );
    let mut wf = instance(Mode::FillFromCatalog);
    engine.advance(&mut wf, None).await.unwrap();

    let failing = engine_with(
        ScriptedOracle::new(&[]),
        Arc::new(FlakyCatalog {
            fail_lookups: true,
            ..FlakyCatalog::default()
        }),
    );
    let err = failing
        .advance(&mut wf, Some(Selection::new(10)))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Store);
    assert_eq!(wf.cursor(), Stage::AwaitSelection);
    assert_eq!(wf.record().current_group_index(), 0);
    assert!(wf.record().selected_rows().is_empty());
    assert_eq!(wf.record().candidates_for_current_group().len(), 2);
}

#[tokio::test]
async fn test_live_oracle_requested_but_not_configured() {
    let (engine, _catalog) = fill_engine(&[("Elektroherd", HERD)]);
    let mut wf = WorkflowInstance::new(
        SessionId::new_random(),
        StartRequest {
            use_live_oracle: true,
            ..request(Mode::FillFromCatalog)
        },
    );

    let err = engine.advance(&mut wf, None).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Oracle(OracleError::Unavailable(_))));
}

#[tokio::test]
async fn test_log_follows_stage_order() {
    let (engine, _catalog) = fill_engine(&[("Elektroherd", HERD)]);
    let mut wf = instance(Mode::FillFromCatalog);
    engine.advance(&mut wf, None).await.unwrap();
    engine.advance(&mut wf, Some(Selection::new(11))).await.unwrap();

    let stages: Vec<_> = wf
        .record()
        .log()
        .iter()
        .map(|line| line.split(':').next().unwrap())
        .collect();
    assert_eq!(
        stages,
        ["start", "extract", "match", "prepare_group", "await_selection"]
    );
}
