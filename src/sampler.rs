// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::sync::Arc;

use opentelemetry::{KeyValue, Value};

use crate::constants::tag;

/// Outcome of a sampling decision: whether to record the trace, plus the
/// tags identifying the policy that decided. The tags are shared immutable
/// slices precomputed at sampler construction, so handing them out costs no
/// allocation on the hot path.
#[derive(Debug, Clone)]
pub struct SamplingDecision {
    pub sampled: bool,
    pub tags: Arc<[KeyValue]>,
}

impl SamplingDecision {
    pub(crate) fn with_tags(sampled: bool, tags: Arc<[KeyValue]>) -> Self {
        SamplingDecision { sampled, tags }
    }

    pub(crate) fn not_sampled() -> Self {
        SamplingDecision {
            sampled: false,
            tags: Vec::new().into(),
        }
    }
}

/// Builds the two-tag slice every policy attaches to its decisions.
pub(crate) fn sampler_tags(sampler_type: &'static str, param: impl Into<Value>) -> Arc<[KeyValue]> {
    vec![
        KeyValue::new(tag::SAMPLER_TYPE, sampler_type),
        KeyValue::new(tag::SAMPLER_PARAM, param.into()),
    ]
    .into()
}

/// Decides whether a newly started trace should be recorded and exported.
///
/// `is_sampled` runs on request-serving threads: implementations must be
/// thread safe, must not block on I/O, and must not fail. `close` shuts down
/// any background work a sampler owns; most policies have none.
pub trait Sampler: Send + Sync + fmt::Debug {
    /// Decides for the trace `trace_id`, a uniform random value in
    /// [0, 2^63), started by `operation`.
    fn is_sampled(&self, trace_id: u64, operation: &str) -> SamplingDecision;

    /// Does a clean shutdown of the sampler.
    fn close(&self) {}
}

/// Sampler that always makes the same decision.
#[derive(Debug, Clone)]
pub struct ConstSampler {
    decision: bool,
    tags: Arc<[KeyValue]>,
}

impl ConstSampler {
    pub fn new(decision: bool) -> Self {
        ConstSampler {
            decision,
            tags: sampler_tags(tag::TYPE_CONST, decision),
        }
    }

    pub fn decision(&self) -> bool {
        self.decision
    }
}

impl Sampler for ConstSampler {
    fn is_sampled(&self, _trace_id: u64, _operation: &str) -> SamplingDecision {
        SamplingDecision::with_tags(self.decision, self.tags.clone())
    }
}
