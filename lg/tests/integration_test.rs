//! Integration tests for loadgen
//!
//! These tests run the harness end to end against a loopback HTTP responder.

use std::sync::Arc;
use std::time::Duration;

use loadgen::http::build_client;
use loadgen::scheduler::{Action, FnAction, WaitConfig, WaitPolicy, WeightedActionSet};
use loadgen::{ActionError, Harness, HarnessConfig, Scenario, ScenarioConfig, TaskConfig, scenario};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Minimal HTTP/1.1 responder: `p=500` paths fail, everything else succeeds
async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    let n = match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    buf.extend_from_slice(&chunk[..n]);
                    if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }

                let request = String::from_utf8_lossy(&buf);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = if path.contains("p=500") {
                    ("500 Internal Server Error", "boom")
                } else {
                    ("200 OK", "hello")
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

fn closed_port_host() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let port = listener.local_addr().expect("Failed to get local addr").port();
    format!("http://127.0.0.1:{}", port)
}

// =============================================================================
// HTTP scenarios
// =============================================================================

#[tokio::test]
async fn test_builtin_blog_scenario_against_server() {
    let host = spawn_server().await;
    let client = build_client(Duration::from_secs(5));
    let blog = scenario::find(&scenario::builtin(), "blog")
        .unwrap()
        .build(&host, &client)
        .unwrap();

    let config = HarnessConfig {
        users: 4,
        run_time: Some(Duration::from_millis(500)),
        seed: Some(1),
        ..Default::default()
    };
    let report = Harness::new(config, blog).unwrap().run(std::future::pending()).await;

    assert_eq!(report.scenario, "blog");
    assert_eq!(report.users.len(), 4);
    assert!(report.totals.requests > 20, "only {} requests", report.totals.requests);
    assert_eq!(report.totals.failures, 0);

    // page_128 (weight 5) is picked far more often than index (weight 1)
    let count = |name: &str| {
        report
            .stats
            .iter()
            .find(|s| s.action == name)
            .map(|s| s.requests)
            .unwrap_or(0)
    };
    assert!(count("page_128") > count("index"));
}

#[tokio::test]
async fn test_http_errors_are_counted_per_task() {
    let host = spawn_server().await;
    let client = build_client(Duration::from_secs(5));
    let config = ScenarioConfig {
        name: "mixed".to_string(),
        wait: WaitConfig::None,
        tasks: vec![TaskConfig::new("ok", "/", 1), TaskConfig::new("broken", "/?p=500", 1)],
    };
    let scenario = config.build(&host, &client).unwrap();

    let harness = Harness::new(
        HarnessConfig {
            users: 2,
            run_time: Some(Duration::from_millis(400)),
            seed: Some(5),
            ..Default::default()
        },
        scenario,
    )
    .unwrap();
    let report = harness.run(std::future::pending()).await;

    let ok = report.stats.iter().find(|s| s.action == "ok").expect("ok ran");
    let broken = report.stats.iter().find(|s| s.action == "broken").expect("broken ran");
    assert_eq!(ok.failures, 0);
    assert!(broken.failures > 0);
    assert_eq!(broken.failures, broken.requests);
    assert_eq!(broken.errors.get("http 500"), Some(&broken.failures));
    assert_eq!(report.totals.failures, broken.failures);
}

#[tokio::test]
async fn test_unreachable_host_keeps_generating_load() {
    let host = closed_port_host();
    let client = build_client(Duration::from_secs(2));
    let blog = scenario::find(&scenario::builtin(), "blog")
        .unwrap()
        .build(&host, &client)
        .unwrap();

    let report = Harness::new(
        HarnessConfig {
            users: 2,
            run_time: Some(Duration::from_millis(300)),
            ..Default::default()
        },
        blog,
    )
    .unwrap()
    .run(std::future::pending())
    .await;

    // Every request fails, yet each user keeps going
    assert!(report.totals.requests > 2);
    assert_eq!(report.totals.failures, report.totals.requests);
    for user in &report.users {
        assert!(user.iterations > 1, "user {} stopped early", user.user_id);
    }
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn test_shutdown_interrupts_long_waits() {
    let set = WeightedActionSet::new(vec![
        (Arc::new(FnAction::noop("index")) as Arc<dyn Action>, 1),
        (Arc::new(FnAction::noop("page_128")) as Arc<dyn Action>, 5),
    ])
    .unwrap();
    let scenario = Scenario {
        name: "paced".to_string(),
        actions: Arc::new(set),
        wait: WaitPolicy::uniform(Duration::from_secs(1), Duration::from_secs(5)).unwrap(),
    };
    let harness = Harness::new(
        HarnessConfig {
            users: 10,
            ..Default::default()
        },
        scenario,
    )
    .unwrap();

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let run = tokio::spawn(harness.run(async {
        let _ = rx.await;
    }));
    tokio::time::sleep(Duration::from_millis(200)).await;
    let _ = tx.send(());

    // Every user is mid-wait; stop must not wait out the 1-5s pause
    let report = tokio::time::timeout(Duration::from_millis(900), run)
        .await
        .expect("harness should stop promptly")
        .unwrap();
    assert_eq!(report.users.len(), 10);
    assert!(report.users.iter().all(|u| u.iterations == 1));
}

#[tokio::test]
async fn test_failing_custom_action_is_reported() {
    let set = WeightedActionSet::new(vec![(
        Arc::new(FnAction::new("flaky", || async { Err(ActionError::Failed("flaky".to_string())) })) as Arc<dyn Action>,
        1,
    )])
    .unwrap();
    let scenario = Scenario {
        name: "flaky".to_string(),
        actions: Arc::new(set),
        wait: WaitPolicy::Constant(Duration::from_millis(10)),
    };
    let harness = Harness::new(
        HarnessConfig {
            users: 1,
            run_time: Some(Duration::from_millis(150)),
            ..Default::default()
        },
        scenario,
    )
    .unwrap();
    let metrics = harness.metrics();

    let report = harness.run(std::future::pending()).await;
    assert!(report.totals.failures > 1);
    assert_eq!(metrics.get("flaky").unwrap().errors.get("failed"), Some(&report.totals.failures));
}
