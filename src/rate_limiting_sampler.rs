// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use opentelemetry::KeyValue;

use crate::constants::tag;
use crate::rate_limiter::RateLimiter;
use crate::sampler::{sampler_tags, Sampler, SamplingDecision};

/// Samples at most `max_traces_per_second`, which may be fractional.
///
/// The distribution of sampled traces follows the burstiness of the callers:
/// uniformly spaced requests are sampled uniformly, while sub-second bursts
/// can be sampled back to back up to the burst cap of
/// `max(max_traces_per_second, 1.0)`.
#[derive(Debug, Clone)]
pub struct RateLimitingSampler {
    max_traces_per_second: f64,
    limiter: RateLimiter,
    tags: Arc<[KeyValue]>,
}

impl RateLimitingSampler {
    pub fn new(max_traces_per_second: f64) -> Self {
        RateLimitingSampler {
            max_traces_per_second,
            limiter: RateLimiter::new(max_traces_per_second, max_traces_per_second.max(1.0)),
            tags: sampler_tags(tag::TYPE_RATE_LIMITING, max_traces_per_second),
        }
    }

    pub fn max_traces_per_second(&self) -> f64 {
        self.max_traces_per_second
    }
}

impl Sampler for RateLimitingSampler {
    fn is_sampled(&self, _trace_id: u64, _operation: &str) -> SamplingDecision {
        SamplingDecision::with_tags(self.limiter.check_credit(1.0), self.tags.clone())
    }
}
