//! Unit tests for the reconciler

use super::*;
use crate::test_utils::*;
use ipam_client::{MockIpam, Operation};

#[tokio::test]
async fn test_create_then_delete_allocates_and_releases() {
    let h = create_test_harness();
    let ip = create_test_ip_address("default", "foo", "", "");

    h.reconciler.on_created_or_updated(&ip).await.unwrap();

    let updates = h.store.updates();
    assert_eq!(updates.len(), 1);
    let (key, status) = &updates[0];
    assert_eq!(key, "default/foo");
    assert_eq!(status.address, "10.0.0.5");
    assert_eq!(status.name, "prod-default-foo");
    assert_eq!(status.provider, "netbox");
    assert_eq!(h.ipam.name_of("10.0.0.5").as_deref(), Some("prod-default-foo"));
    assert_eq!(h.events.normals().len(), 1);
    assert!(h.events.warnings().is_empty());

    let assigned = with_status(ip, "10.0.0.5", "prod-default-foo", "netbox");
    h.reconciler.on_deleted(&assigned).await.unwrap();

    assert_eq!(h.ipam.released(), vec!["10.0.0.5".to_string()]);
}

#[tokio::test]
async fn test_assigned_resource_is_not_touched_again() {
    let h = create_test_harness();
    let ip = with_status(
        create_test_ip_address("default", "foo", "", ""),
        "10.0.0.5",
        "prod-default-foo",
        "netbox",
    );

    h.reconciler.on_created_or_updated(&ip).await.unwrap();
    h.reconciler.on_created_or_updated(&ip).await.unwrap();

    assert_eq!(h.ipam.calls(Operation::Assign), 0);
    assert_eq!(h.ipam.calls(Operation::Search), 0);
    assert!(h.store.updates().is_empty());
}

#[tokio::test]
async fn test_explicit_name_is_used_for_allocation() {
    let h = create_test_harness();
    let ip = create_test_ip_address("ns1", "a", "web1", "");

    h.reconciler.on_created_or_updated(&ip).await.unwrap();

    assert_eq!(h.store.updates()[0].1.name, "web1");
    assert_eq!(h.ipam.name_of("10.0.0.5").as_deref(), Some("web1"));
}

#[tokio::test]
async fn test_template_name_is_used_without_explicit_name() {
    let h = create_test_harness();
    let ip = create_test_ip_address("ns1", "a", "", "");

    h.reconciler.on_created_or_updated(&ip).await.unwrap();

    assert_eq!(h.store.updates()[0].1.name, "prod-ns1-a");
}

#[tokio::test]
async fn test_assign_failure_reports_and_leaves_status_untouched() {
    let h = create_test_harness();
    h.ipam.fail(Operation::Assign, "prefix full");
    let ip = create_test_ip_address("default", "foo", "", "");

    let err = h.reconciler.on_created_or_updated(&ip).await.unwrap_err();

    assert!(matches!(err, ControllerError::Allocation(_)));
    assert!(err.to_string().contains("could not assign new address for 'default-foo'"));
    assert!(h.store.updates().is_empty());
    assert_eq!(h.events.warnings().len(), 1);
    assert!(h.events.warnings()[0].contains("prefix full"));
}

#[tokio::test]
async fn test_reference_resolves_single_match() {
    let h = create_test_harness();
    h.ipam.add_record("10.0.0.20", "host=x");
    let ip = create_test_ip_address("default", "borrower", "", "host=x");

    h.reconciler.on_created_or_updated(&ip).await.unwrap();

    let (_, status) = &h.store.updates()[0];
    assert_eq!(status.address, "10.0.0.20");
    assert_eq!(status.name, "prod-default-borrower");
    assert_eq!(status.provider, "netbox");
    assert_eq!(h.ipam.calls(Operation::Assign), 0);
}

#[tokio::test]
async fn test_reference_without_match_fails() {
    let h = create_test_harness();
    let ip = create_test_ip_address("default", "borrower", "", "host=x");

    let err = h.reconciler.on_created_or_updated(&ip).await.unwrap_err();

    assert!(matches!(err, ControllerError::Reference(_)));
    assert_eq!(
        h.events.warnings(),
        vec!["did not find address matching 'host=x' for 'default-borrower'".to_string()]
    );
    assert!(h.store.updates().is_empty());
}

#[tokio::test]
async fn test_ambiguous_reference_fails() {
    let h = create_test_harness();
    h.ipam.add_record("10.0.0.20", "host=x");
    h.ipam.add_record("10.0.0.21", "host=x");
    let ip = create_test_ip_address("default", "borrower", "", "host=x");

    let err = h.reconciler.on_created_or_updated(&ip).await.unwrap_err();

    assert!(matches!(err, ControllerError::Reference(_)));
    assert_eq!(
        h.events.warnings(),
        vec!["found 2 addresses matching 'host=x' for 'default-borrower', need exactly one".to_string()]
    );
    assert!(h.store.updates().is_empty());
}

#[tokio::test]
async fn test_reference_search_is_exact() {
    let h = create_test_harness();
    h.ipam.add_record("10.0.0.20", "host=x");
    h.ipam.add_record("10.0.0.21", "host=xy");
    let ip = create_test_ip_address("default", "borrower", "", "host=x");

    h.reconciler.on_created_or_updated(&ip).await.unwrap();

    assert_eq!(h.store.updates()[0].1.address, "10.0.0.20");
}

#[tokio::test]
async fn test_search_failure_reports_once() {
    let h = create_test_harness();
    h.ipam.fail(Operation::Search, "backend down");
    let ip = create_test_ip_address("default", "borrower", "", "host=x");

    let err = h.reconciler.on_created_or_updated(&ip).await.unwrap_err();

    assert!(matches!(err, ControllerError::Allocation(_)));
    let warnings = h.events.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("error searching for address matching 'host=x' for 'default-borrower'"));
}

#[tokio::test]
async fn test_persist_failure_releases_fresh_allocation() {
    let h = create_test_harness();
    h.store.fail();
    let ip = create_test_ip_address("default", "foo", "", "");

    let err = h.reconciler.on_created_or_updated(&ip).await.unwrap_err();

    assert!(matches!(err, ControllerError::Persistence(_)));
    let warnings = h.events.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("assigned address 10.0.0.5 for 'default-foo', but could not update object"));
    assert_eq!(h.ipam.released(), vec!["10.0.0.5".to_string()]);
    assert_eq!(h.ipam.name_of("10.0.0.5"), None);
}

#[tokio::test]
async fn test_ambiguous_persist_failure_keeps_allocation() {
    let h = create_test_harness();
    h.store.lose_responses();
    let ip = create_test_ip_address("default", "foo", "", "");

    let err = h.reconciler.on_created_or_updated(&ip).await.unwrap_err();

    assert!(matches!(err, ControllerError::Persistence(_)));
    assert_eq!(h.events.warnings().len(), 1);
    assert_eq!(h.ipam.calls(Operation::Unassign), 0);
    assert_eq!(h.ipam.name_of("10.0.0.5").as_deref(), Some("prod-default-foo"));
}

#[tokio::test]
async fn test_persist_failure_keeps_allocation_when_release_disabled() {
    let mut h = create_test_harness();
    h.reconciler = h.reconciler.with_release_on_persist_failure(false);
    h.store.fail();
    let ip = create_test_ip_address("default", "foo", "", "");

    let err = h.reconciler.on_created_or_updated(&ip).await.unwrap_err();

    assert!(matches!(err, ControllerError::Persistence(_)));
    assert_eq!(h.ipam.calls(Operation::Unassign), 0);
    assert_eq!(h.ipam.name_of("10.0.0.5").as_deref(), Some("prod-default-foo"));
}

#[tokio::test]
async fn test_persist_failure_never_releases_reference() {
    let h = create_test_harness();
    h.ipam.add_record("10.0.0.20", "host=x");
    h.store.fail();
    let ip = create_test_ip_address("default", "borrower", "", "host=x");

    let err = h.reconciler.on_created_or_updated(&ip).await.unwrap_err();

    assert!(matches!(err, ControllerError::Persistence(_)));
    assert_eq!(h.ipam.calls(Operation::Unassign), 0);
    assert_eq!(h.ipam.name_of("10.0.0.20").as_deref(), Some("host=x"));
}

#[tokio::test]
async fn test_event_failure_does_not_change_outcome() {
    let h = create_test_harness();
    h.events.fail();

    let ok = create_test_ip_address("default", "foo", "", "");
    h.reconciler.on_created_or_updated(&ok).await.unwrap();
    assert_eq!(h.store.updates().len(), 1);

    let missing = create_test_ip_address("default", "borrower", "", "host=nothing");
    let err = h.reconciler.on_created_or_updated(&missing).await.unwrap_err();
    assert!(matches!(err, ControllerError::Reference(_)));
}

#[tokio::test]
async fn test_delete_skips_foreign_provider() {
    let h = create_test_harness();
    h.ipam.add_record("10.0.0.5", "prod-default-foo");
    let ip = with_status(
        create_test_ip_address("default", "foo", "", ""),
        "10.0.0.5",
        "prod-default-foo",
        "other",
    );

    h.reconciler.on_deleted(&ip).await.unwrap();

    assert_eq!(h.ipam.calls(Operation::Unassign), 0);
    assert!(h.events.warnings().is_empty());
}

#[tokio::test]
async fn test_delete_without_address_is_noop() {
    let h = create_test_harness();
    let ip = create_test_ip_address("default", "foo", "", "");

    h.reconciler.on_deleted(&ip).await.unwrap();

    assert_eq!(h.ipam.calls(Operation::Unassign), 0);
}

#[tokio::test]
async fn test_delete_never_releases_reference() {
    let h = create_test_harness();
    h.ipam.add_record("10.0.0.20", "host=x");
    let ip = with_status(
        create_test_ip_address("default", "borrower", "", "host=x"),
        "10.0.0.20",
        "prod-default-borrower",
        "netbox",
    );

    h.reconciler.on_deleted(&ip).await.unwrap();

    assert_eq!(h.ipam.calls(Operation::Unassign), 0);
    assert_eq!(h.ipam.name_of("10.0.0.20").as_deref(), Some("host=x"));
}

#[tokio::test]
async fn test_delete_without_recorded_provider_releases() {
    let h = create_test_harness();
    h.ipam.add_record("10.0.0.5", "legacy");
    let ip = with_status(create_test_ip_address("default", "foo", "", ""), "10.0.0.5", "legacy", "");

    h.reconciler.on_deleted(&ip).await.unwrap();

    assert_eq!(h.ipam.released(), vec!["10.0.0.5".to_string()]);
}

#[tokio::test]
async fn test_unassign_failure_reports_once() {
    let h = create_test_harness();
    h.ipam.add_record("10.0.0.5", "prod-default-foo");
    h.ipam.fail(Operation::Unassign, "backend down");
    let ip = with_status(
        create_test_ip_address("default", "foo", "", ""),
        "10.0.0.5",
        "prod-default-foo",
        "netbox",
    );

    let err = h.reconciler.on_deleted(&ip).await.unwrap_err();

    assert!(matches!(err, ControllerError::Allocation(_)));
    let warnings = h.events.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("could not unassign address 10.0.0.5 for 'default-foo' from IPAM"));
}

#[tokio::test]
async fn test_delete_of_already_released_address_succeeds() {
    let h = create_test_harness();
    let ip = with_status(
        create_test_ip_address("default", "foo", "", ""),
        "10.0.0.5",
        "prod-default-foo",
        "netbox",
    );

    h.reconciler.on_deleted(&ip).await.unwrap();

    assert_eq!(h.ipam.calls(Operation::Unassign), 1);
    assert!(h.events.warnings().is_empty());
}

#[tokio::test]
async fn test_deleting_owner_leaves_borrowers_alone() {
    let h = create_test_harness_with(MockIpam::new("10.0.0").starting_at(5), "netbox");
    let owner = create_test_ip_address("default", "owner", "host=x", "");
    h.reconciler.on_created_or_updated(&owner).await.unwrap();

    let borrower = create_test_ip_address("default", "borrower", "", "host=x");
    h.reconciler.on_created_or_updated(&borrower).await.unwrap();

    let updates = h.store.updates();
    assert_eq!(updates[0].1.address, "10.0.0.5");
    assert_eq!(updates[1].1.address, "10.0.0.5");

    let owner = with_status(owner, "10.0.0.5", "host=x", "netbox");
    h.reconciler.on_deleted(&owner).await.unwrap();

    assert_eq!(h.ipam.released(), vec!["10.0.0.5".to_string()]);
    assert_eq!(h.store.updates().len(), 2);
}
