// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use mockito::{Matcher, Server, ServerGuard};
use runner_logger::{
    init_subscriber, registry, Config, LogLevel, LogRecord, RemoteLogger, StartError, TokenError,
};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("exit status 128")]
struct CheckoutFailed;

fn config(server: &ServerGuard) -> Config {
    Config {
        manager_url: server.url(),
        account_id: "acct-1".to_string(),
        delegate_token: "delegate-secret".to_string(),
        logging_url: server.url(),
        level: LogLevel::Debug,
        ..Config::default()
    }
}

fn token_body(token: &str, valid_for: Duration) -> String {
    let expires = chrono::Utc::now().timestamp_millis() + valid_for.as_millis() as i64;
    format!(r#"{{"resource":{{"tokenValue":"{token}","projectId":"p1","expirationTimeMillis":{expires}}}}}"#)
}

#[tokio::test]
#[serial]
async fn tracing_events_reach_cloud_logging() {
    let mut server = Server::new_async().await;
    let issuer_mock = server
        .mock("GET", "/api/agent/delegates/logging-token")
        .match_query(Matcher::UrlEncoded("accountId".into(), "acct-1".into()))
        .match_header("Authorization", "Delegate delegate-secret")
        .with_status(200)
        .with_body(token_body("abc", Duration::from_secs(30 * 60)))
        .expect(1)
        .create_async()
        .await;
    let sink_mock = server
        .mock("POST", "/v2/entries:write")
        .match_header("Authorization", "Bearer abc")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(serde_json::json!({
                "logName": "projects/p1/logs/runner.log",
                "resource": {"type": "global"}
            })),
            Matcher::Regex("step checkout failed".to_string()),
        ]))
        .with_status(200)
        .with_body("{}")
        .expect_at_least(1)
        .create_async()
        .await;

    let remote = RemoteLogger::start_with_manager(&config(&server))
        .await
        .expect("start failed");
    assert!(Arc::ptr_eq(&registry::current(), &remote.logger()));

    init_subscriber("debug,mockito=off").expect("failed to install subscriber");
    let err = CheckoutFailed;
    tracing::warn!(attempt = 2u64, "retrying checkout");
    tracing::error!(
        error = &err as &dyn std::error::Error,
        ErrCode = 500u64,
        env = "prod",
        "step {} failed",
        "checkout"
    );

    remote.stop().await.expect("stop failed");

    issuer_mock.assert_async().await;
    sink_mock.assert_async().await;
    let stats = remote.stats();
    assert!(stats.queued >= 2);
    assert_eq!(stats.delivered, stats.queued);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.dropped, 0);

    registry::replace(runner_logger::Logger::default());
}

#[tokio::test]
#[serial]
async fn start_fails_when_manager_rejects_delegate() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/agent/delegates/logging-token")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body("unauthorized")
        .create_async()
        .await;

    let before = registry::current();
    let err = RemoteLogger::start_with_manager(&config(&server))
        .await
        .err()
        .expect("expected start to fail");
    assert!(matches!(err, StartError::Token(TokenError::Transport(_))));
    assert!(Arc::ptr_eq(&before, &registry::current()));
}

#[tokio::test]
#[serial]
async fn records_below_threshold_are_not_shipped() {
    let mut server = Server::new_async().await;
    let _issuer_mock = server
        .mock("GET", "/api/agent/delegates/logging-token")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(token_body("abc", Duration::from_secs(30 * 60)))
        .create_async()
        .await;
    let sink_mock = server
        .mock("POST", "/v2/entries:write")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let remote = RemoteLogger::start_with_manager(&Config {
        level: LogLevel::Warn,
        ..config(&server)
    })
    .await
    .expect("start failed");

    registry::log(LogRecord::new(LogLevel::Debug, "chatty"));
    registry::log(LogRecord::new(LogLevel::Info, "still chatty"));
    registry::log(LogRecord::new(LogLevel::Fatal, "disk full"));
    remote.stop().await.expect("stop failed");

    sink_mock.assert_async().await;
    assert_eq!(remote.stats().delivered, 1);

    registry::replace(runner_logger::Logger::default());
}
