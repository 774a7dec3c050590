// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Trace-sampling core of a distributed-tracing client: decides, per newly
//! started trace, whether it should be recorded and exported, and tags the
//! decision so downstream collectors can reason about sampling bias.
//! Policies can be refetched periodically from a control plane and
//! hot-swapped without disturbing in-flight decisions.

pub(crate) mod adaptive_sampler;
pub mod constants;
mod error;
pub(crate) mod fetcher;
pub(crate) mod guaranteed_throughput_sampler;
pub mod log;
pub(crate) mod metrics;
pub(crate) mod probabilistic_sampler;
pub(crate) mod rate_limiter;
pub(crate) mod rate_limiting_sampler;
pub(crate) mod remote_sampler;
pub(crate) mod sampler;
pub(crate) mod strategies;

// Re-export key public types
pub use adaptive_sampler::AdaptiveSampler;
pub use error::{Error, Result};
pub use fetcher::{HttpStrategyFetcher, StrategyFetcher};
pub use guaranteed_throughput_sampler::GuaranteedThroughputSampler;
pub use metrics::{MetricsReporter, NoopMetricsReporter};
pub use probabilistic_sampler::ProbabilisticSampler;
pub use rate_limiter::RateLimiter;
pub use rate_limiting_sampler::RateLimitingSampler;
pub use remote_sampler::{RemotelyControlledSampler, RemotelyControlledSamplerBuilder};
pub use sampler::{ConstSampler, Sampler, SamplingDecision};
pub use strategies::{
    OperationSamplingStrategy, PerOperationSamplingStrategies, ProbabilisticSamplingStrategy,
    RateLimitingSamplingStrategy, SamplingStrategyResponse,
};
