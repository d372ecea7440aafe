use std::sync::Arc;

use tally_core::{AppError, RequestContext};

use super::{CheckerResolution, CheckerService};
use crate::AccessService;
use crate::test_support::{FakeStore, role_name, user, user_id};

fn service(store: &Arc<FakeStore>) -> CheckerService {
    CheckerService::new(AccessService::new(store.clone()), store.clone())
}

fn contact_ids(resolution: &CheckerResolution) -> Vec<&str> {
    resolution
        .contacts()
        .iter()
        .map(|contact| contact.user_id.as_str())
        .collect()
}

#[tokio::test]
async fn engineer_checkers_are_managers_and_owners_once_each() {
    let store = FakeStore::seeded().await;
    // Same user surfaced under a second checker role.
    store
        .list_user_under_role("owner", user("manager-1", Some("manager")))
        .await;

    let resolution = service(&store)
        .resolve_checkers(&RequestContext::anonymous(), &role_name("engineer"))
        .await;
    assert!(resolution.is_ok());
    let resolution = resolution.unwrap_or_else(|_| unreachable!());

    assert_eq!(
        contact_ids(&resolution),
        vec!["manager-1", "manager-2", "owner-1"]
    );
}

#[tokio::test]
async fn unlinked_roles_are_never_resolved() {
    let store = FakeStore::seeded().await;

    let resolution = service(&store)
        .resolve_checkers(&RequestContext::anonymous(), &role_name("product_manager"))
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(contact_ids(&resolution), vec!["owner-1"]);
    assert_eq!(resolution.addresses(), vec!["owner-1@tally.test".to_owned()]);
}

#[tokio::test]
async fn missing_chain_is_distinct_from_empty_membership() {
    let store = FakeStore::seeded().await;
    store.insert_role("intern").await;
    store.insert_role("mentor").await;
    store.insert_raw_edge("intern", "mentor").await;
    let service = service(&store);
    let context = RequestContext::anonymous();

    let owner = service.resolve_checkers(&context, &role_name("owner")).await;
    assert!(matches!(owner, Ok(CheckerResolution::NoEligibleCheckers)));

    let intern = service.resolve_checkers(&context, &role_name("intern")).await;
    assert!(matches!(intern, Ok(CheckerResolution::Eligible(ref contacts)) if contacts.is_empty()));
}

#[tokio::test]
async fn repository_failures_propagate() {
    let store = FakeStore::seeded().await;
    store.fail_role_member_lookups();

    let resolution = service(&store)
        .resolve_checkers(&RequestContext::anonymous(), &role_name("engineer"))
        .await;
    assert!(matches!(resolution, Err(AppError::DataAccess(_))));
}

#[tokio::test]
async fn get_checkers_drops_the_maker() {
    let store = FakeStore::seeded().await;
    store
        .list_user_under_role("manager", user("engineer-1", Some("engineer")))
        .await;

    let resolution = service(&store)
        .get_checkers(
            &RequestContext::for_caller("engineer-1"),
            &user_id("engineer-1"),
            None,
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(!contact_ids(&resolution).contains(&"engineer-1"));
    assert_eq!(
        contact_ids(&resolution),
        vec!["manager-1", "manager-2", "owner-1"]
    );
}

#[tokio::test]
async fn get_checkers_validates_the_maker() {
    let store = FakeStore::seeded().await;
    let service = service(&store);
    let context = RequestContext::anonymous();

    let missing = service
        .get_checkers(&context, &user_id("nobody"), None)
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let customer = service
        .get_checkers(&context, &user_id("customer-1"), None)
        .await;
    assert!(matches!(customer, Err(AppError::Validation(_))));

    let wrong_role = service
        .get_checkers(&context, &user_id("engineer-1"), Some(&role_name("owner")))
        .await;
    assert!(matches!(wrong_role, Err(AppError::Validation(_))));

    let matching_role = service
        .get_checkers(
            &context,
            &user_id("engineer-1"),
            Some(&role_name("engineer")),
        )
        .await;
    assert!(matching_role.is_ok());
}
