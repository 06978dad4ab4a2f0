// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Credential issuer client.
//!
//! The manager exposes a logging-token endpoint that hands out short-lived
//! tokens for the log sink. [`TokenIssuer`] is the seam the token manager
//! depends on; [`ManagerClient`] is the HTTP implementation.

use crate::credential::IssuedToken;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const LOGGING_TOKEN_PATH: &str = "api/agent/delegates/logging-token";

#[derive(Debug, Error)]
pub enum IssuerError {
    #[error("request to credential issuer failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("credential issuer responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("could not decode credential issuer response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid credential issuer configuration: {0}")]
    Config(String),
}

#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn get_logging_token(&self) -> Result<IssuedToken, IssuerError>;
}

#[derive(Deserialize)]
struct ResourceEnvelope {
    resource: IssuedToken,
}

/// HTTP client for the manager's logging-token endpoint.
#[derive(Debug, Clone)]
pub struct ManagerClient {
    client: reqwest::Client,
    base_url: String,
    account_id: String,
    delegate_token: String,
    timeout: Duration,
}

impl ManagerClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        account_id: &str,
        delegate_token: &str,
        timeout: Duration,
    ) -> Result<Self, IssuerError> {
        if base_url.is_empty() {
            return Err(IssuerError::Config("manager url is empty".to_string()));
        }
        if account_id.is_empty() {
            return Err(IssuerError::Config("account id is empty".to_string()));
        }
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            account_id: account_id.to_string(),
            delegate_token: delegate_token.to_string(),
            timeout,
        })
    }

    fn token_url(&self) -> String {
        format!("{}/{LOGGING_TOKEN_PATH}", self.base_url)
    }
}

#[async_trait]
impl TokenIssuer for ManagerClient {
    async fn get_logging_token(&self) -> Result<IssuedToken, IssuerError> {
        let url = self.token_url();
        debug!("Requesting logging token from {url}");
        let resp = self
            .client
            .get(&url)
            .query(&[("accountId", self.account_id.as_str())])
            .header("Authorization", format!("Delegate {}", self.delegate_token))
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(IssuerError::Status { status, body });
        }
        let envelope: ResourceEnvelope = serde_json::from_str(&body)?;
        Ok(envelope.resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn manager(url: &str) -> ManagerClient {
        ManagerClient::new(
            reqwest::Client::new(),
            url,
            "acct-1",
            "delegate-secret",
            Duration::from_secs(5),
        )
        .expect("failed to build manager client")
    }

    #[tokio::test]
    async fn fetches_and_decodes_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/agent/delegates/logging-token")
            .match_query(Matcher::UrlEncoded("accountId".into(), "acct-1".into()))
            .match_header("Authorization", "Delegate delegate-secret")
            .with_status(200)
            .with_body(
                r#"{"resource":{"tokenValue":"abc","projectId":"p1","expirationTimeMillis":42}}"#,
            )
            .create_async()
            .await;

        let token = manager(&server.url())
            .get_logging_token()
            .await
            .expect("token request failed");

        mock.assert_async().await;
        assert_eq!(token.token_value, "abc");
        assert_eq!(token.project_id, "p1");
        assert_eq!(token.expiration_time_millis, 42);
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url_is_ignored() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/agent/delegates/logging-token")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"resource":{}}"#)
            .create_async()
            .await;

        let url = format!("{}/", server.url());
        let token = manager(&url)
            .get_logging_token()
            .await
            .expect("token request failed");

        mock.assert_async().await;
        assert!(token.token_value.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/agent/delegates/logging-token")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("denied")
            .create_async()
            .await;

        let err = manager(&server.url())
            .get_logging_token()
            .await
            .expect_err("expected status error");

        match err {
            IssuerError::Status { status, body } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, "denied");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/agent/delegates/logging-token")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = manager(&server.url())
            .get_logging_token()
            .await
            .expect_err("expected decode error");
        assert!(matches!(err, IssuerError::Decode(_)));
    }

    #[test]
    fn empty_account_is_rejected() {
        let err = ManagerClient::new(
            reqwest::Client::new(),
            "http://localhost",
            "",
            "t",
            Duration::from_secs(1),
        )
        .expect_err("expected config error");
        assert_eq!(
            err.to_string(),
            "invalid credential issuer configuration: account id is empty"
        );
    }
}
