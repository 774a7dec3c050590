// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wire model of the strategy documents served by the control plane.

use serde::{Deserialize, Serialize};

/// Overall sampling strategy for a service. A union: exactly one of the
/// fields is populated, and `operation_sampling` takes precedence when a
/// server sends more than one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingStrategyResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_sampling: Option<PerOperationSamplingStrategies>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilistic_sampling: Option<ProbabilisticSamplingStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limiting_sampling: Option<RateLimitingSamplingStrategy>,
}

/// Samples each trace independently with a fixed probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbabilisticSamplingStrategy {
    /// Probability in the range [0.0, 1.0]
    pub sampling_rate: f64,
}

/// Samples a fixed number of traces per second via token bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitingSamplingStrategy {
    pub max_traces_per_second: i64,
}

/// Strategy for a single operation. Only probabilistic sampling can be
/// configured per operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSamplingStrategy {
    pub operation: String,
    pub probabilistic_sampling: ProbabilisticSamplingStrategy,
}

/// Per-operation strategies plus service-wide defaults. Useful for services
/// whose endpoints receive vastly different traffic, where any single rate
/// would oversample some endpoints and starve others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerOperationSamplingStrategies {
    /// Probability applied to operations not listed below
    pub default_sampling_probability: f64,
    /// Floor, in traces per second, guaranteed to every known operation.
    /// Local to a single service instance
    pub default_lower_bound_traces_per_second: f64,
    #[serde(default)]
    pub per_operation_strategies: Vec<OperationSamplingStrategy>,
}
