// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use async_trait::async_trait;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::Request;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use url::Url;

use crate::error::{Error, Result};
use crate::strategies::SamplingStrategyResponse;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Capability for fetching the sampling strategy of a service from the
/// control plane. Production uses [`HttpStrategyFetcher`]; tests substitute
/// canned responses.
#[async_trait]
pub trait StrategyFetcher: Send + Sync + 'static {
    async fn fetch(&self, service_name: &str) -> Result<SamplingStrategyResponse>;
}

/// Fetches strategies with `GET http://{host_port}/?service={name}`.
#[derive(Debug, Clone)]
pub struct HttpStrategyFetcher {
    server_url: String,
}

impl HttpStrategyFetcher {
    pub fn new(host_port: impl Into<String>) -> Self {
        HttpStrategyFetcher {
            server_url: format!("http://{}/", host_port.into()),
        }
    }

    fn strategy_url(&self, service_name: &str) -> Result<hyper::Uri> {
        let mut url = Url::parse(&self.server_url)
            .map_err(|_| Error::InvalidServerAddress(self.server_url.clone()))?;
        url.query_pairs_mut().append_pair("service", service_name);
        hyper::Uri::from_maybe_shared(String::from(url))
            .map_err(|_| Error::InvalidServerAddress(self.server_url.clone()))
    }
}

#[async_trait]
impl StrategyFetcher for HttpStrategyFetcher {
    async fn fetch(&self, service_name: &str) -> Result<SamplingStrategyResponse> {
        let uri = self.strategy_url(service_name)?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(CONNECT_TIMEOUT));
        let client: Client<_, Empty<Bytes>> =
            Client::builder(TokioExecutor::new()).build(connector);

        let request = Request::get(uri)
            .header("accept", "application/json")
            .body(Empty::new())
            .map_err(|e| Error::StrategyRequest(Box::new(e)))?;

        let response = client
            .request(request)
            .await
            .map_err(|e| Error::StrategyRequest(Box::new(e)))?;

        if !response.status().is_success() {
            return Err(Error::StrategyStatus(response.status()));
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::StrategyRequest(Box::new(e)))?
            .to_bytes();

        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::HttpStrategyFetcher;

    #[test]
    fn test_strategy_url() {
        let fetcher = HttpStrategyFetcher::new("localhost:5778");
        let uri = fetcher.strategy_url("billing").unwrap();
        assert_eq!(uri.to_string(), "http://localhost:5778/?service=billing");
    }

    #[test]
    fn test_strategy_url_escapes_service_name() {
        let fetcher = HttpStrategyFetcher::new("localhost:5778");
        let uri = fetcher.strategy_url("front end/v2").unwrap();
        let rendered = uri.to_string();
        assert!(rendered.starts_with("http://localhost:5778/?service="));
        assert!(!rendered.contains(' '));
        assert!(!rendered.contains("end/v2"));
    }

    #[test]
    fn test_bad_host_port_rejected() {
        let fetcher = HttpStrategyFetcher::new("not a host");
        assert!(fetcher.strategy_url("svc").is_err());
    }
}
