// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("sampling rate must be between 0.0 and 1.0, received {0}")]
    InvalidSamplingRate(f64),

    #[error("invalid sampling server address {0:?}")]
    InvalidServerAddress(String),

    #[error("sampling strategy request failed: {0}")]
    StrategyRequest(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("sampling strategy endpoint returned status {0}")]
    StrategyStatus(hyper::StatusCode),

    #[error("malformed sampling strategy response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("sampling strategy response contains no supported strategy")]
    UnsupportedStrategy,

    #[error("sampling poller shutdown timed out")]
    ShutdownTimedOut,

    #[error("sampling poller panicked: {0}")]
    PollerPanicked(String),
}
