// Metadata batches: per-item value rules and fail-fast reporting.
mod common;

use anyhow::Result;
use baton::ops;
use baton::{
    AvuDescriptor, BatonError, CatalogError, CatalogPath, ErrorKind, MetaOperation, PathKind,
    apply_mutations,
};
use common::{Call, RecordingClient, doc, session};
use serde_json::json;

fn object_path() -> CatalogPath {
    CatalogPath {
        path: "/z/home/u/f.txt".to_string(),
        kind: PathKind::DataObject,
    }
}

#[test]
fn add_without_value_is_missing_key_and_never_calls_add() {
    let mut client = RecordingClient::new();
    let avus = [AvuDescriptor::new("project", Some(""))];

    let err = apply_mutations(&mut client, MetaOperation::Add, &object_path(), &avus).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingKey);
    assert!(client.calls.is_empty());
}

#[test]
fn remove_without_value_deletes_by_attribute() -> Result<()> {
    let session = session(RecordingClient::new());
    let document = doc(json!({
        "collection": "/z/home/u",
        "data_object": "f.txt",
        "avus": [{"attribute": "project"}]
    }));

    let report = ops::metamod(&session, &document, MetaOperation::Rem)?;
    assert_eq!(report.applied, 1);
    assert_eq!(
        session.into_client().calls,
        vec![Call::DeleteMetadata {
            path: "/z/home/u/f.txt".to_string(),
            attribute: "project".to_string(),
        }]
    );
    Ok(())
}

#[test]
fn add_passes_units_through() -> Result<()> {
    let session = session(RecordingClient::new());
    let document = doc(json!({
        "coll": "/z/home/u",
        "avus": [{"a": "size", "v": 10, "u": "MB"}]
    }));

    ops::metamod(&session, &document, MetaOperation::Add)?;
    assert_eq!(
        session.into_client().calls,
        vec![Call::AddMetadata {
            path: "/z/home/u".to_string(),
            attribute: "size".to_string(),
            value: "10".to_string(),
            units: Some("MB".to_string()),
        }]
    );
    Ok(())
}

#[test]
fn mixed_batch_stops_at_first_item_without_value() {
    let mut client = RecordingClient::new();
    let avus = [
        AvuDescriptor::new("a", Some("1")),
        AvuDescriptor::new("b", None),
        AvuDescriptor::new("c", Some("3")),
    ];

    let err = apply_mutations(&mut client, MetaOperation::Add, &object_path(), &avus).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingKey);
    match &err {
        BatonError::PartialMutation {
            applied,
            total,
            last_applied,
            ..
        } => {
            assert_eq!(*applied, 1);
            assert_eq!(*total, 3);
            assert_eq!(last_applied.as_deref(), Some("a"));
        }
        other => panic!("expected a partial mutation, got {other:?}"),
    }
    assert_eq!(client.calls.len(), 1);
}

#[test]
fn collaborator_failure_after_progress_reports_last_applied() {
    let mut client = RecordingClient::new()
        .failing_mutation(2, CatalogError::new(Some(-818_000), "CAT_NO_ACCESS_PERMISSION"));
    let avus = [
        AvuDescriptor::new("a", None),
        AvuDescriptor::new("b", None),
        AvuDescriptor::new("c", None),
        AvuDescriptor::new("d", None),
    ];

    let err = apply_mutations(&mut client, MetaOperation::Rem, &object_path(), &avus).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CollaboratorFailure);
    let message = err.to_string();
    assert!(message.contains("stopped after 2 of 4"), "{message}");
    assert!(message.contains("last applied: b"), "{message}");
    assert_eq!(client.calls.len(), 2);
}

#[test]
fn first_item_failure_is_returned_unwrapped() {
    let mut client =
        RecordingClient::new().failing_mutation(0, CatalogError::new(None, "connection reset"));
    let avus = [AvuDescriptor::new("a", Some("1"))];

    let err = apply_mutations(&mut client, MetaOperation::Add, &object_path(), &avus).unwrap_err();
    assert!(matches!(err, BatonError::Catalog(_)));
}

#[test]
fn metamod_without_avus_is_missing_key() {
    let session = session(RecordingClient::new());
    let err = ops::metamod(&session, &doc(json!({"collection": "/z"})), MetaOperation::Add)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingKey);
}
