// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use opentelemetry::KeyValue;

use crate::constants::{defaults, numeric::MAX_RANDOM_NUMBER, tag};
use crate::error::{Error, Result};
use crate::sampler::{sampler_tags, Sampler, SamplingDecision};

/// Keeps (100 * `sampling_rate`)% of the traces.
///
/// Trace IDs are already uniformly random 63 bit integers, so the sampler
/// compares the ID against a precomputed boundary instead of drawing a fresh
/// random number per decision. Decisions are reproducible for a given ID.
#[derive(Debug, Clone)]
pub struct ProbabilisticSampler {
    sampling_rate: f64,
    sampling_boundary: u64,
    tags: Arc<[KeyValue]>,
}

impl ProbabilisticSampler {
    /// Creates a sampler at the given rate. Fails when the rate is outside
    /// [0.0, 1.0].
    pub fn new(sampling_rate: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&sampling_rate) {
            return Err(Error::InvalidSamplingRate(sampling_rate));
        }
        Ok(Self::with_valid_rate(sampling_rate))
    }

    fn with_valid_rate(sampling_rate: f64) -> Self {
        ProbabilisticSampler {
            sampling_rate,
            sampling_boundary: (MAX_RANDOM_NUMBER as f64 * sampling_rate) as u64,
            tags: sampler_tags(tag::TYPE_PROBABILISTIC, sampling_rate),
        }
    }

    /// Returns the rate this sampler was built with
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Returns the trace ID boundary, `floor(rate * (2^63 - 1))`
    pub fn sampling_boundary(&self) -> u64 {
        self.sampling_boundary
    }
}

impl Default for ProbabilisticSampler {
    /// The rate applied before the first strategy has been fetched.
    fn default() -> Self {
        Self::with_valid_rate(defaults::INITIAL_SAMPLING_RATE)
    }
}

impl Sampler for ProbabilisticSampler {
    fn is_sampled(&self, trace_id: u64, _operation: &str) -> SamplingDecision {
        // Fast paths for rate 0.0 (always drop) and 1.0 (always sample)
        let sampled = if self.sampling_rate <= 0.0 {
            false
        } else if self.sampling_rate >= 1.0 {
            true
        } else {
            trace_id <= self.sampling_boundary
        };
        SamplingDecision::with_tags(sampled, self.tags.clone())
    }
}

#[cfg(test)]
mod tests {
    use opentelemetry::Value;

    use super::{ProbabilisticSampler, Sampler, MAX_RANDOM_NUMBER};
    use crate::constants::tag;
    use crate::error::Error;

    #[test]
    fn test_boundary_computation() {
        for rate in [0.0, 0.1, 0.25, 0.5, 0.999, 1.0] {
            let sampler = ProbabilisticSampler::new(rate).unwrap();
            assert_eq!(
                sampler.sampling_boundary(),
                (MAX_RANDOM_NUMBER as f64 * rate) as u64
            );
        }
    }

    #[test]
    fn test_out_of_range_rates_rejected() {
        assert!(matches!(
            ProbabilisticSampler::new(-0.01),
            Err(Error::InvalidSamplingRate(_))
        ));
        assert!(matches!(
            ProbabilisticSampler::new(1.01),
            Err(Error::InvalidSamplingRate(_))
        ));
    }

    #[test]
    fn test_rate_zero_never_samples() {
        let sampler = ProbabilisticSampler::new(0.0).unwrap();
        for trace_id in [0u64, 1, MAX_RANDOM_NUMBER / 2, MAX_RANDOM_NUMBER] {
            assert!(!sampler.is_sampled(trace_id, "op").sampled);
        }
    }

    #[test]
    fn test_rate_one_always_samples() {
        let sampler = ProbabilisticSampler::new(1.0).unwrap();
        for trace_id in [0u64, 1, MAX_RANDOM_NUMBER / 2, MAX_RANDOM_NUMBER] {
            assert!(sampler.is_sampled(trace_id, "op").sampled);
        }
    }

    #[test]
    fn test_half_rate_boundary() {
        let sampler = ProbabilisticSampler::new(0.5).unwrap();

        // Just below the boundary
        let decision = sampler.is_sampled(0x3FFF_FFFF_FFFF_FFFF, "op");
        assert!(decision.sampled);
        assert_eq!(decision.tags[0].value, Value::from(tag::TYPE_PROBABILISTIC));
        assert_eq!(decision.tags[1].value, Value::F64(0.5));

        // Above the boundary
        let decision = sampler.is_sampled(0x7FFF_FFFF_FFFF_FFFF, "op");
        assert!(!decision.sampled);
    }

    #[test]
    fn test_default_is_initial_rate() {
        let sampler = ProbabilisticSampler::default();
        assert_eq!(
            sampler.sampling_rate(),
            crate::constants::defaults::INITIAL_SAMPLING_RATE
        );
    }
}
