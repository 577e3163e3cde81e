//! Posts client against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port inside the test's runtime, then
//! drives every endpoint over real HTTP through `FetchTransport`. Validates
//! that request building, validation, caching and rollback work end-to-end
//! with the actual server.

use mock_server::MockConfig;
use posts_core::{
    CacheStore, CacheTag, FetchTransport, OperationError, PostDraft, PostPatch, PostsApi, QueryKey,
};
use tokio::net::TcpListener;

/// Serve the mock api on a random loopback port and return its base URL.
async fn spawn_server(config: MockConfig) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { mock_server::run_with(listener, config).await });
    format!("http://{addr}")
}

fn client(base_url: &str) -> PostsApi<FetchTransport> {
    PostsApi::new(FetchTransport::new(base_url), CacheStore::new())
}

#[tokio::test]
async fn crud_lifecycle() {
    let api = client(&spawn_server(MockConfig::instant()).await);

    // Step 1: list the seed rows; tags cover each id plus the collection.
    let posts = api.get_posts().await.unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(
        api.cache().provided_tags(&QueryKey::Posts),
        vec![
            CacheTag::post("1"),
            CacheTag::post("2"),
            CacheTag::post_list()
        ]
    );

    // Step 2: a short name never leaves the client.
    let err = api.add_post(&PostDraft::named("ab")).await.unwrap_err();
    assert_eq!(
        err.issue_messages().unwrap(),
        vec!["Name can't be shorter than 3 characters.".to_string()]
    );
    assert!(!api.cache().is_stale(&QueryKey::Posts));

    // Step 3: create stales the list.
    let created = api
        .add_post(&PostDraft::named("Integration test"))
        .await
        .unwrap();
    assert_eq!(created.name, "Integration test");
    assert!(api.cache().is_stale(&QueryKey::Posts));
    let id = created.id;

    // Step 4: the stale list refetches and includes the new post.
    let posts = api.get_posts().await.unwrap();
    assert_eq!(posts.len(), 3);
    assert!(api.cache().provided_tags(&QueryKey::Posts).contains(&CacheTag::post(&id)));

    // Step 5: get the created post.
    let fetched = api.get_post(&id).await.unwrap();
    assert_eq!(fetched.name, "Integration test");

    // Step 6: update commits the optimistic value.
    api.update_post(&id, &PostPatch::name("Updated title"))
        .await
        .unwrap();
    assert_eq!(api.cache().post(&id).unwrap().name, "Updated title");
    assert!(api.cache().is_stale(&QueryKey::Posts));

    // Step 7: the server agrees.
    let refetched = api.refetch_post(&id).await.unwrap();
    assert_eq!(refetched.name, "Updated title");

    // Step 8: delete.
    let deleted = api.delete_post(&id).await.unwrap();
    assert!(deleted.success);
    assert_eq!(deleted.id, id);
    assert!(api.cache().is_stale(&QueryKey::Post(id.clone())));

    // Step 9: get after delete is a 404.
    let err = api.get_post(&id).await.unwrap_err();
    assert!(err.is_not_found());

    // Step 10: delete again is a 404 too.
    let err = api.delete_post(&id).await.unwrap_err();
    assert!(err.is_not_found());

    // Step 11: list is back to the seed rows.
    let posts = api.refetch_posts().await.unwrap();
    assert_eq!(posts.len(), 2);
}

#[tokio::test]
async fn failed_update_rolls_back_cached_post() {
    let api = client(&spawn_server(MockConfig::failing_updates()).await);

    let before = api.get_post("2").await.unwrap();
    let err = api
        .update_post("2", &PostPatch::name("X"))
        .await
        .unwrap_err();

    assert!(matches!(err, OperationError::Transport { status: 500, .. }));
    assert_eq!(api.cache().post("2"), Some(before.clone()));
    assert!(!api.cache().is_stale(&QueryKey::Post("2".into())));

    let server_side = api.refetch_post("2").await.unwrap();
    assert_eq!(server_side, before);
}

#[tokio::test]
async fn unreachable_server_is_a_fetch_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let api = client(&format!("http://127.0.0.1:{port}"));

    let err = api.get_posts().await.unwrap_err();

    assert!(matches!(err, OperationError::Fetch(_)));
    assert!(!api.cache().contains(&QueryKey::Posts));
}
