use std::{collections::HashSet, time::Duration};

use ravendb_client::{
    raven_command::{GetDocumentCommand, PutDocumentCommand},
    topology::ETAG_FORCED,
    topology::Topology,
    topology_cache::TopologyCache,
    HttpClientOptions, NodeFailure, ReadBalanceBehavior, RequestExecutor, RequestExecutorError,
    RequestExecutorEvent, ServerNode,
};
use reqwest::StatusCode;
use serde_json::json;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use crate::helpers::{
    document_body, docs_path, init_tracing, mount_topology, spawn_cluster, spawn_executor,
    test_conventions, topology_body, unreachable_url, unreachable_urls, url_of, wait_for_event,
    DATABASE,
};

fn load_user() -> GetDocumentCommand<serde_json::Value> {
    GetDocumentCommand::new("users/1")
}

fn store_user() -> PutDocumentCommand {
    PutDocumentCommand::new("users/1", json!({"Name": "Han"}), None)
}

fn node_of(server: &MockServer) -> ServerNode {
    ServerNode::new(url_of(server), DATABASE.to_string())
}

#[tokio::test]
async fn execute_returns_the_document_from_the_preferred_node() {
    // Arrange
    let cluster = spawn_cluster(2).await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .and(query_param("id", "users/1"))
        .and(header("Topology-Etag", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document_body(json!({"Name": "Han"}))))
        .expect(1)
        .mount(&cluster[0])
        .await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&cluster[1])
        .await;
    let executor = spawn_executor(vec![url_of(&cluster[0])], test_conventions());

    // Act
    let document = executor.execute(&mut load_user()).await.unwrap();

    // Assert
    assert_eq!(document, Some(json!({"Name": "Han"})));
    assert_eq!(executor.topology_etag(), 1);
    assert_eq!(executor.topology_nodes().len(), 2);
}

#[tokio::test]
async fn missing_document_is_none_and_not_an_error() {
    // Arrange
    let cluster = spawn_cluster(1).await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&cluster[0])
        .await;
    let executor = spawn_executor(vec![url_of(&cluster[0])], test_conventions());

    // Act
    let document = executor.execute(&mut load_user()).await.unwrap();

    // Assert
    assert_eq!(document, None);
}

#[tokio::test]
async fn read_fails_over_when_the_preferred_node_is_unavailable() {
    // Arrange
    let cluster = spawn_cluster(2).await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&cluster[0])
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/databases/{}/stats", DATABASE)))
        .respond_with(ResponseTemplate::new(200))
        .expect(1..)
        .mount(&cluster[0])
        .await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(document_body(json!({"Name": "Leia"}))))
        .expect(1)
        .mount(&cluster[1])
        .await;
    let executor = spawn_executor(vec![url_of(&cluster[0])], test_conventions());
    executor.wait_for_topology().await.unwrap();
    let mut events = executor.subscribe();

    // Act
    let document = executor.execute(&mut load_user()).await.unwrap();

    // Assert
    assert_eq!(document, Some(json!({"Name": "Leia"})));
    let failed = wait_for_event(&mut events, |e| {
        matches!(e, RequestExecutorEvent::FailedRequest { .. })
    })
    .await;
    assert_eq!(
        failed,
        RequestExecutorEvent::FailedRequest {
            url: url_of(&cluster[0]),
            reason: NodeFailure::Status(StatusCode::SERVICE_UNAVAILABLE),
        }
    );
    // The failed node is health checked until it answers again.
    let restored = wait_for_event(&mut events, |e| {
        matches!(e, RequestExecutorEvent::NodeRestored { .. })
    })
    .await;
    assert_eq!(
        restored,
        RequestExecutorEvent::NodeRestored {
            url: url_of(&cluster[0])
        }
    );
}

#[tokio::test]
async fn every_node_down_reports_each_node_once() {
    // Arrange
    let seed = MockServer::start().await;
    let mut unreachable = unreachable_urls(2);
    let node_b = unreachable.remove(1);
    let node_a = unreachable.remove(0);
    mount_topology(&seed, 1, &[node_a.clone(), node_b.clone()]).await;
    let executor = spawn_executor(vec![url_of(&seed)], test_conventions());

    // Act
    let result = executor.execute(&mut load_user()).await;

    // Assert
    match result {
        Err(RequestExecutorError::AllTopologyNodesDown { errors }) => {
            let urls = errors.keys().map(|n| n.url.clone()).collect::<HashSet<_>>();
            assert_eq!(urls, HashSet::from([node_a, node_b]));
            assert!(errors
                .values()
                .all(|failure| matches!(failure, NodeFailure::Connect(_))));
        }
        other => panic!("Expected AllTopologyNodesDown, got {:?}", other),
    }
}

#[tokio::test]
async fn forbidden_is_returned_without_trying_another_node() {
    // Arrange
    let cluster = spawn_cluster(2).await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&cluster[0])
        .await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&cluster[1])
        .await;
    let executor = spawn_executor(vec![url_of(&cluster[0])], test_conventions());

    // Act
    let result = executor.execute(&mut load_user()).await;

    // Assert
    assert!(matches!(
        result,
        Err(RequestExecutorError::BadAuthorization { .. })
    ));
}

#[tokio::test]
async fn conflict_is_returned_without_trying_another_node() {
    // Arrange
    let cluster = spawn_cluster(2).await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(409).set_body_string("concurrency violation"))
        .expect(1)
        .mount(&cluster[0])
        .await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&cluster[1])
        .await;
    let executor = spawn_executor(vec![url_of(&cluster[0])], test_conventions());

    // Act
    let result = executor.execute(&mut load_user()).await;

    // Assert
    match result {
        Err(RequestExecutorError::Conflict { message, .. }) => {
            assert_eq!(message, "concurrency violation")
        }
        other => panic!("Expected Conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_database_is_not_treated_as_a_node_failure() {
    // Arrange
    let cluster = spawn_cluster(2).await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(503).insert_header("Database-Missing", DATABASE))
        .expect(1)
        .mount(&cluster[0])
        .await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&cluster[1])
        .await;
    let executor = spawn_executor(vec![url_of(&cluster[0])], test_conventions());

    // Act
    let result = executor.execute(&mut load_user()).await;

    // Assert
    match result {
        Err(RequestExecutorError::DatabaseDoesNotExist(database)) => {
            assert_eq!(database, DATABASE)
        }
        other => panic!("Expected DatabaseDoesNotExist, got {:?}", other),
    }
}

#[tokio::test]
async fn concurrent_topology_updates_run_only_once() {
    // Arrange
    let server = MockServer::start().await;
    let urls = vec![url_of(&server)];
    Mock::given(method("GET"))
        .and(path("/topology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topology_body(1, &urls)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/topology"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(topology_body(2, &urls))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let executor = spawn_executor(urls.clone(), test_conventions());
    executor.wait_for_topology().await.unwrap();
    let node = ServerNode::new(urls[0].clone(), DATABASE.to_string());

    // Act
    let (first, second) = tokio::join!(
        executor.update_topology(node.clone(), false),
        executor.update_topology(node, false)
    );

    // Assert
    let mut outcomes = vec![first.unwrap(), second.unwrap()];
    outcomes.sort();
    assert_eq!(outcomes, vec![false, true]);
    assert_eq!(executor.topology_etag(), 2);
}

#[tokio::test]
async fn older_topology_is_ignored_unless_forced() {
    // Arrange
    let server = MockServer::start().await;
    let urls = vec![url_of(&server)];
    Mock::given(method("GET"))
        .and(path("/topology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topology_body(5, &urls)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_topology(&server, 3, &urls).await;
    let executor = spawn_executor(urls.clone(), test_conventions());
    executor.wait_for_topology().await.unwrap();
    let node = ServerNode::new(urls[0].clone(), DATABASE.to_string());

    // Act
    executor.update_topology(node.clone(), false).await.unwrap();
    let etag_after_normal_update = executor.topology_etag();
    executor.update_topology(node, true).await.unwrap();

    // Assert
    assert_eq!(etag_after_normal_update, 5);
    assert_eq!(executor.topology_etag(), 3);
}

#[tokio::test]
async fn refresh_topology_header_triggers_an_update() {
    // Arrange
    let server = MockServer::start().await;
    let urls = vec![url_of(&server)];
    Mock::given(method("GET"))
        .and(path("/topology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topology_body(1, &urls)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/topology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topology_body(2, &urls)))
        .expect(1..)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(document_body(json!({"Name": "Chewie"})))
                .insert_header("Refresh-Topology", "true"),
        )
        .mount(&server)
        .await;
    let executor = spawn_executor(urls, test_conventions());
    executor.wait_for_topology().await.unwrap();
    let mut events = executor.subscribe();

    // Act
    executor.execute(&mut load_user()).await.unwrap();

    // Assert
    let updated = wait_for_event(&mut events, |e| {
        matches!(e, RequestExecutorEvent::TopologyUpdated { .. })
    })
    .await;
    assert_eq!(updated, RequestExecutorEvent::TopologyUpdated { etag: 2 });
}

#[tokio::test]
async fn first_topology_failure_is_reported_to_every_caller() {
    // Arrange
    let seed = unreachable_url();
    let executor = spawn_executor(vec![seed.clone()], test_conventions());

    // Act
    let first = executor.execute(&mut load_user()).await;
    let second = executor.execute(&mut load_user()).await;

    // Assert
    for result in [first, second] {
        match result {
            Err(RequestExecutorError::TopologyUnavailable { errors }) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].0, seed);
            }
            other => panic!("Expected TopologyUnavailable, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn cached_topology_is_used_when_no_seed_answers() {
    // Arrange
    let cache_dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(document_body(json!({"Name": "Lando"}))))
        .expect(1)
        .mount(&server)
        .await;
    let seed = unreachable_url();
    let cached = Topology::new(
        9,
        vec![ServerNode::new(url_of(&server), DATABASE.to_string()).with_cluster_tag("A")],
    );
    TopologyCache::new(cache_dir.path()).save(&seed, DATABASE, &cached);
    let conventions =
        test_conventions().set_topology_cache_location(Some(cache_dir.path().to_path_buf()));
    let executor = spawn_executor(vec![seed], conventions);

    // Act
    let document = executor.execute(&mut load_user()).await.unwrap();

    // Assert
    assert_eq!(document, Some(json!({"Name": "Lando"})));
    assert_eq!(executor.topology_etag(), ETAG_FORCED);
}

#[tokio::test]
async fn fetched_topology_is_written_to_the_cache() {
    // Arrange
    let cache_dir = tempfile::tempdir().unwrap();
    let cluster = spawn_cluster(2).await;
    let seed = url_of(&cluster[0]);
    let conventions =
        test_conventions().set_topology_cache_location(Some(cache_dir.path().to_path_buf()));
    let executor = spawn_executor(vec![seed.clone()], conventions);

    // Act
    executor.wait_for_topology().await.unwrap();

    // Assert
    let cached = TopologyCache::new(cache_dir.path())
        .load(&seed, DATABASE)
        .expect("Topology was not cached");
    assert_eq!(cached.nodes.len(), 2);
    assert_eq!(cached.etag, ETAG_FORCED);
}

#[tokio::test]
async fn single_node_executor_does_not_fail_over() {
    // Arrange
    init_tracing();
    let url = unreachable_url();
    let executor = RequestExecutor::new_for_single_node(
        url.clone(),
        DATABASE,
        test_conventions(),
        &HttpClientOptions::default(),
    )
    .unwrap();

    // Act
    let result = executor.execute(&mut load_user()).await;

    // Assert
    match result {
        Err(RequestExecutorError::NodeDown { url: failed, .. }) => assert_eq!(failed, url),
        other => panic!("Expected NodeDown, got {:?}", other),
    }
    assert!(executor.topology().is_some());
}

#[tokio::test]
async fn closed_executor_refuses_requests() {
    // Arrange
    let cluster = spawn_cluster(1).await;
    let executor = spawn_executor(vec![url_of(&cluster[0])], test_conventions());
    executor.wait_for_topology().await.unwrap();

    // Act
    executor.close();
    let result = executor.execute(&mut load_user()).await;

    // Assert
    assert!(executor.is_closed());
    assert!(matches!(result, Err(RequestExecutorError::Disposed)));
}

#[tokio::test]
async fn topology_refreshed_from_another_node_is_cached_for_the_seed() {
    // Arrange
    let cache_dir = tempfile::tempdir().unwrap();
    let seed = MockServer::start().await;
    let other = MockServer::start().await;
    let extra = unreachable_url();
    mount_topology(&seed, 1, &[url_of(&seed), url_of(&other)]).await;
    mount_topology(&other, 2, &[url_of(&seed), url_of(&other), extra]).await;
    let conventions =
        test_conventions().set_topology_cache_location(Some(cache_dir.path().to_path_buf()));
    let executor = spawn_executor(vec![url_of(&seed)], conventions);
    executor.wait_for_topology().await.unwrap();

    // Act
    let updated = executor.update_topology(node_of(&other), false).await.unwrap();

    // Assert
    assert!(updated);
    assert_eq!(executor.topology_nodes().len(), 3);
    let cached = TopologyCache::new(cache_dir.path())
        .try_load_from_cache(&[url_of(&seed)], DATABASE)
        .expect("Topology was not cached for the seed");
    assert_eq!(cached.nodes.len(), 3);
}

#[tokio::test]
async fn write_is_not_retried_once_it_may_have_reached_the_server() {
    // Arrange
    let cluster = spawn_cluster(2).await;
    Mock::given(method("PUT"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(1)))
        .mount(&cluster[0])
        .await;
    Mock::given(method("PUT"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&cluster[1])
        .await;
    let conventions = test_conventions().set_request_timeout(Duration::from_millis(200));
    let executor = spawn_executor(vec![url_of(&cluster[0])], conventions);
    executor.wait_for_topology().await.unwrap();

    // Act
    let result = executor.execute(&mut store_user()).await;

    // Assert
    match result {
        Err(RequestExecutorError::NodeDown { url, reason }) => {
            assert_eq!(url, url_of(&cluster[0]));
            assert_eq!(reason, NodeFailure::Timeout);
        }
        other => panic!("Expected NodeDown, got {:?}", other),
    }
}

#[tokio::test]
async fn write_fails_over_when_the_connection_was_refused() {
    // Arrange
    let seed = MockServer::start().await;
    let live = MockServer::start().await;
    let refused = unreachable_url();
    mount_topology(&seed, 1, &[refused, url_of(&live)]).await;
    Mock::given(method("PUT"))
        .and(path(docs_path()))
        .and(query_param("id", "users/1"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"Id": "users/1", "ChangeVector": "B:1"})),
        )
        .expect(1)
        .mount(&live)
        .await;
    let executor = spawn_executor(vec![url_of(&seed)], test_conventions());

    // Act
    let result = executor.execute(&mut store_user()).await.unwrap();

    // Assert
    assert_eq!(result.id, "users/1");
    assert_eq!(result.change_vector.as_deref(), Some("B:1"));
}

#[tokio::test]
async fn idle_executor_refreshes_topology_on_a_timer() {
    // Arrange
    let server = MockServer::start().await;
    let urls = vec![url_of(&server)];
    Mock::given(method("GET"))
        .and(path("/topology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topology_body(1, &urls)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_topology(&server, 2, &urls).await;
    let conventions = test_conventions().set_topology_refresh_interval(Duration::from_millis(200));
    let executor = spawn_executor(urls, conventions);
    let mut events = executor.subscribe();
    executor.wait_for_topology().await.unwrap();
    assert_eq!(executor.topology_etag(), 1);

    // Act
    wait_for_event(&mut events, |event| {
        matches!(event, RequestExecutorEvent::TopologyUpdated { etag: 2 })
    })
    .await;

    // Assert
    assert_eq!(executor.topology_etag(), 2);
}

#[tokio::test]
async fn timer_refresh_is_skipped_while_responses_keep_coming_back() {
    // Arrange
    let server = MockServer::start().await;
    let urls = vec![url_of(&server)];
    Mock::given(method("GET"))
        .and(path("/topology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topology_body(1, &urls)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/topology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topology_body(2, &urls)))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let conventions = test_conventions().set_topology_refresh_interval(Duration::from_millis(300));
    let executor = spawn_executor(urls, conventions);

    // Act
    for _ in 0..15 {
        executor.execute(&mut load_user()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // Assert
    assert_eq!(executor.topology_etag(), 1);
}

#[tokio::test]
async fn fastest_node_race_picks_the_quickest_node_for_reads() {
    // Arrange
    let cluster = spawn_cluster(2).await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(document_body(json!({"Name": "Slow"})))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&cluster[0])
        .await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(document_body(json!({"Name": "Fast"}))))
        .mount(&cluster[1])
        .await;
    let conventions =
        test_conventions().set_read_balance_behavior(ReadBalanceBehavior::FastestNode);
    let executor = spawn_executor(vec![url_of(&cluster[0])], conventions);

    // Act
    let first = executor.execute(&mut load_user()).await.unwrap();
    let second = executor.execute(&mut load_user()).await.unwrap();

    // Assert
    assert_eq!(first, Some(json!({"Name": "Slow"})));
    assert_eq!(second, Some(json!({"Name": "Fast"})));
}

#[tokio::test]
async fn callers_waiting_for_the_first_topology_share_one_fetch() {
    // Arrange
    let server = MockServer::start().await;
    let urls = vec![url_of(&server)];
    Mock::given(method("GET"))
        .and(path("/topology"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(topology_body(1, &urls))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(document_body(json!({"Name": "Han"}))))
        .expect(2)
        .mount(&server)
        .await;
    let executor = spawn_executor(urls, test_conventions());

    // Act
    let (mut first_command, mut second_command) = (load_user(), load_user());
    let (first, second) = tokio::join!(
        executor.execute(&mut first_command),
        executor.execute(&mut second_command)
    );

    // Assert
    assert_eq!(first.unwrap(), Some(json!({"Name": "Han"})));
    assert_eq!(second.unwrap(), Some(json!({"Name": "Han"})));
}

#[tokio::test]
async fn failed_node_is_health_checked_and_response_time_is_recorded() {
    // Arrange
    let cluster = spawn_cluster(2).await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(503))
        .mount(&cluster[0])
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/databases/{}/stats", DATABASE)))
        .respond_with(ResponseTemplate::new(503))
        .mount(&cluster[0])
        .await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(document_body(json!({"Name": "Han"}))))
        .mount(&cluster[1])
        .await;
    let executor = spawn_executor(vec![url_of(&cluster[0])], test_conventions());
    executor.wait_for_topology().await.unwrap();
    let before = executor.last_return_response();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Act
    executor.execute(&mut load_user()).await.unwrap();

    // Assert
    assert!(executor.last_return_response() > before);
    assert!(executor.is_health_checking(&node_of(&cluster[0])));
    assert!(!executor.is_health_checking(&node_of(&cluster[1])));
}

#[tokio::test]
async fn accepting_a_new_topology_cancels_running_health_checks() {
    // Arrange
    let seed = MockServer::start().await;
    let other = MockServer::start().await;
    let urls = vec![url_of(&seed), url_of(&other)];
    mount_topology(&seed, 1, &urls).await;
    mount_topology(&other, 2, &urls).await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(503))
        .mount(&seed)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/databases/{}/stats", DATABASE)))
        .respond_with(ResponseTemplate::new(503))
        .mount(&seed)
        .await;
    Mock::given(method("GET"))
        .and(path(docs_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(document_body(json!({"Name": "Han"}))))
        .mount(&other)
        .await;
    let executor = spawn_executor(vec![url_of(&seed)], test_conventions());
    executor.execute(&mut load_user()).await.unwrap();
    assert!(executor.is_health_checking(&node_of(&seed)));

    // Act
    let updated = executor.update_topology(node_of(&other), false).await.unwrap();

    // Assert
    assert!(updated);
    assert_eq!(executor.topology_etag(), 2);
    assert!(!executor.is_health_checking(&node_of(&seed)));
}
