mod common;

use common::*;
use imagestream::{
    api::{LimitRange, LimitRangeItem, LimitRangeList, Secret, SecretList},
    client::{InMemoryProjectStore, ProjectObjectListStore},
    errors::{ApiError, StoreError},
    ErrorCode, RequestContext, ScopedImageStream,
};
use std::{sync::Arc, time::Duration};

fn limits() -> LimitRangeList {
    let mut range = LimitRange::default();
    range.metadata.name = "images".to_owned();
    range.spec.limits.push(LimitRangeItem {
        limit_type: "openshift.io/Image".to_owned(),
        max: vec![("storage".to_owned(), "1Gi".to_owned())]
            .into_iter()
            .collect(),
        ..Default::default()
    });
    LimitRangeList { items: vec![range] }
}

/// A store that never keeps anything
struct RefusingStore;

impl ProjectObjectListStore<LimitRangeList> for RefusingStore {
    fn add(&self, _namespace: &str, _obj: LimitRangeList) -> Result<(), StoreError> {
        Err(StoreError::Full(0))
    }

    fn get(&self, _namespace: &str) -> Option<LimitRangeList> {
        None
    }
}

#[tokio::test]
async fn secrets_are_listed() {
    init_logging();
    let mut secret = Secret::default();
    secret.metadata.name = "pull-secret".to_owned();
    secret.secret_type = "kubernetes.io/dockerconfigjson".to_owned();
    let fake = Arc::new(FakeControlPlane::new().with_secrets(Ok(SecretList {
        items: vec![secret.clone()],
    })));
    let is = ScopedImageStream::new("ns", "app", fake);
    let ctx = RequestContext::new();

    assert_eq!(is.secrets(&ctx).await.unwrap(), vec![secret]);
}

#[tokio::test]
async fn secrets_failure_is_unknown() {
    init_logging();
    let fake = Arc::new(
        FakeControlPlane::new().with_secrets(Err(ApiError::forbidden("cannot list secrets"))),
    );
    let is = ScopedImageStream::new("ns", "app", fake);
    let ctx = RequestContext::new();

    let err = is.secrets(&ctx).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unknown);
}

#[tokio::test]
async fn limit_ranges_without_store() {
    init_logging();
    let fake = Arc::new(FakeControlPlane::new().with_limit_ranges(Ok(limits())));
    let is = ScopedImageStream::new("ns", "app", fake.clone());
    let ctx = RequestContext::new();

    assert_eq!(is.limit_range_list(&ctx, None).await.unwrap(), limits());
    assert_eq!(is.limit_range_list(&ctx, None).await.unwrap(), limits());
    assert_eq!(fake.calls("list_limit_ranges"), 2);
}

#[tokio::test]
async fn limit_ranges_are_shared_through_the_store() {
    init_logging();
    let fake = Arc::new(FakeControlPlane::new().with_limit_ranges(Ok(limits())));
    let store: InMemoryProjectStore<LimitRangeList> = InMemoryProjectStore::new(Duration::from_secs(60), 16);
    let ctx = RequestContext::new();

    let first = ScopedImageStream::new("ns", "app", fake.clone());
    assert_eq!(first.limit_range_list(&ctx, Some(&store)).await.unwrap(), limits());

    // a later request for another stream in the namespace
    let second = ScopedImageStream::new("ns", "other", fake.clone());
    assert_eq!(second.limit_range_list(&ctx, Some(&store)).await.unwrap(), limits());

    assert_eq!(fake.calls("list_limit_ranges"), 1);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn busy_namespace_displaces_idle_one() {
    init_logging();
    let fake = Arc::new(FakeControlPlane::new().with_limit_ranges(Ok(limits())));
    let store: InMemoryProjectStore<LimitRangeList> = InMemoryProjectStore::new(Duration::from_secs(300), 1);
    let ctx = RequestContext::new();

    let idle = ScopedImageStream::new("idle", "app", fake.clone());
    idle.limit_range_list(&ctx, Some(&store)).await.unwrap();
    for _ in 0..3 {
        let busy = ScopedImageStream::new("busy", "app", fake.clone());
        busy.limit_range_list(&ctx, Some(&store)).await.unwrap();
    }

    assert_eq!(fake.calls("list_limit_ranges"), 2);
    assert!(store.get("busy").is_some());
    assert!(store.get("idle").is_none());
}

#[tokio::test]
async fn store_failures_are_not_fatal() {
    init_logging();
    let fake = Arc::new(FakeControlPlane::new().with_limit_ranges(Ok(limits())));
    let is = ScopedImageStream::new("ns", "app", fake.clone());
    let ctx = RequestContext::new();

    assert_eq!(
        is.limit_range_list(&ctx, Some(&RefusingStore)).await.unwrap(),
        limits()
    );
    assert_eq!(fake.calls("list_limit_ranges"), 1);
}

#[tokio::test]
async fn limit_range_failure_is_unknown() {
    init_logging();
    let fake = Arc::new(
        FakeControlPlane::new().with_limit_ranges(Err(ApiError::internal("etcd timeout"))),
    );
    let store: InMemoryProjectStore<LimitRangeList> = InMemoryProjectStore::new(Duration::from_secs(60), 16);
    let is = ScopedImageStream::new("ns", "app", fake);
    let ctx = RequestContext::new();

    let err = is.limit_range_list(&ctx, Some(&store)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unknown);
    assert!(store.is_empty());
}
