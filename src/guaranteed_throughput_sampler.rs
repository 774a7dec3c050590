// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use opentelemetry::KeyValue;

use crate::constants::tag;
use crate::error::Result;
use crate::probabilistic_sampler::ProbabilisticSampler;
use crate::rate_limiting_sampler::RateLimitingSampler;
use crate::sampler::{sampler_tags, Sampler, SamplingDecision};

/// Combines a probabilistic sampler with a lower-bound rate limiter so that
/// an operation is sampled proportionally but at least once per interval: a
/// lower bound of 1.0 / 600 samples the operation at least once every ten
/// minutes.
///
/// The probabilistic sampler wins ties. When both would accept, the emitted
/// tags carry the probabilistic rate, keeping downstream bias correction
/// accurate for the common case; the lower bound exists only to put a floor
/// under rarely-taken operations.
#[derive(Debug)]
pub struct GuaranteedThroughputSampler {
    probabilistic: ProbabilisticSampler,
    lower_bound_sampler: RateLimitingSampler,
    operation: String,
    // lowerbound tags advertise the probabilistic rate, not the floor
    tags: Arc<[KeyValue]>,
    sampling_rate: f64,
    lower_bound: f64,
}

impl GuaranteedThroughputSampler {
    pub fn new(
        operation: impl Into<String>,
        lower_bound: f64,
        sampling_rate: f64,
    ) -> Result<Self> {
        Ok(GuaranteedThroughputSampler {
            probabilistic: ProbabilisticSampler::new(sampling_rate)?,
            lower_bound_sampler: RateLimitingSampler::new(lower_bound),
            operation: operation.into(),
            tags: sampler_tags(tag::TYPE_LOWER_BOUND, sampling_rate),
            sampling_rate,
            lower_bound,
        })
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    /// Replaces only the sub-samplers whose parameter changed. The two
    /// replacements are not atomic; callers serialize updates through the
    /// enclosing write lock.
    pub(crate) fn update(&mut self, lower_bound: f64, sampling_rate: f64) -> Result<()> {
        if self.sampling_rate != sampling_rate {
            self.probabilistic = ProbabilisticSampler::new(sampling_rate)?;
            self.tags = sampler_tags(tag::TYPE_LOWER_BOUND, sampling_rate);
            self.sampling_rate = sampling_rate;
        }
        if self.lower_bound != lower_bound {
            self.lower_bound_sampler = RateLimitingSampler::new(lower_bound);
            self.lower_bound = lower_bound;
        }
        Ok(())
    }
}

impl Sampler for GuaranteedThroughputSampler {
    fn is_sampled(&self, trace_id: u64, operation: &str) -> SamplingDecision {
        let decision = self.probabilistic.is_sampled(trace_id, operation);
        if decision.sampled {
            // A probabilistic hit still spends lower-bound credit, so the
            // floor quota accounts for traces sampled either way
            self.lower_bound_sampler.is_sampled(trace_id, operation);
            return decision;
        }
        if self.lower_bound_sampler.is_sampled(trace_id, operation).sampled {
            return SamplingDecision::with_tags(true, self.tags.clone());
        }
        SamplingDecision::not_sampled()
    }
}

#[cfg(test)]
mod tests {
    use opentelemetry::Value;

    use super::{GuaranteedThroughputSampler, Sampler};
    use crate::constants::tag;

    #[test]
    fn test_lower_bound_floor_with_zero_rate() {
        let sampler = GuaranteedThroughputSampler::new("o", 1.0, 0.0).unwrap();

        // The probabilistic half never accepts; the floor grants its single
        // burst credit and then rejects
        let decision = sampler.is_sampled(0, "o");
        assert!(decision.sampled);
        assert_eq!(decision.tags[0].value, Value::from(tag::TYPE_LOWER_BOUND));
        assert_eq!(decision.tags[1].value, Value::F64(0.0));

        let decision = sampler.is_sampled(1, "o");
        assert!(!decision.sampled);
        assert!(decision.tags.is_empty());
    }

    #[test]
    fn test_probabilistic_branch_wins_ties() {
        let sampler = GuaranteedThroughputSampler::new("o", 1.0, 1.0).unwrap();

        // Rate 1.0 accepts everything, so the lowerbound tags never appear
        for trace_id in 0..5u64 {
            let decision = sampler.is_sampled(trace_id, "o");
            assert!(decision.sampled);
            assert_eq!(
                decision.tags[0].value,
                Value::from(tag::TYPE_PROBABILISTIC)
            );
            assert_eq!(decision.tags[1].value, Value::F64(1.0));
        }
    }

    #[test]
    fn test_probabilistic_hit_consumes_floor_credit() {
        let mut sampler = GuaranteedThroughputSampler::new("o", 1.0, 1.0).unwrap();

        // A probabilistic accept drains the single floor credit
        assert!(sampler.is_sampled(0, "o").sampled);

        // Dropping the rate to zero keeps the drained limiter (unchanged
        // lower bound), so the floor has nothing left to grant
        sampler.update(1.0, 0.0).unwrap();
        assert!(!sampler.is_sampled(1, "o").sampled);
    }

    #[test]
    fn test_construction_rejects_bad_rate() {
        assert!(GuaranteedThroughputSampler::new("o", 1.0, 1.5).is_err());
        assert!(GuaranteedThroughputSampler::new("o", 1.0, -0.5).is_err());
    }

    #[test]
    fn test_update_replaces_only_changed_parts() {
        let mut sampler = GuaranteedThroughputSampler::new("o", 2.0, 0.0).unwrap();

        // Burn the floor's burst allowance
        assert!(sampler.is_sampled(0, "o").sampled);
        assert!(sampler.is_sampled(1, "o").sampled);
        assert!(!sampler.is_sampled(2, "o").sampled);

        // Same lower bound: the drained limiter must survive the update
        sampler.update(2.0, 1.0).unwrap();
        assert_eq!(sampler.sampling_rate(), 1.0);
        assert_eq!(sampler.lower_bound(), 2.0);
        let decision = sampler.is_sampled(3, "o");
        assert!(decision.sampled);
        assert_eq!(decision.tags[1].value, Value::F64(1.0));

        // Changed lower bound: a fresh limiter with a fresh burst appears
        sampler.update(1.0, 0.0).unwrap();
        assert!(sampler.is_sampled(4, "o").sampled);
        assert_eq!(sampler.lower_bound(), 1.0);
    }

    #[test]
    fn test_update_rejects_bad_rate() {
        let mut sampler = GuaranteedThroughputSampler::new("o", 1.0, 0.5).unwrap();
        assert!(sampler.update(1.0, 2.0).is_err());
        // The probabilistic half is untouched by the failed update
        assert_eq!(sampler.sampling_rate(), 0.5);
    }
}
