// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;
use crate::guaranteed_throughput_sampler::GuaranteedThroughputSampler;
use crate::probabilistic_sampler::ProbabilisticSampler;
use crate::sampler::{Sampler, SamplingDecision};
use crate::strategies::PerOperationSamplingStrategies;

/// Per-operation sampler with bounded memory and lazy admission.
///
/// Each known operation gets its own guaranteed-throughput composite; new
/// operations are admitted on first sight until `max_operations` composites
/// exist, after which unknown operations fall through to the default
/// probabilistic sampler. Nothing is ever evicted: the cap, not an eviction
/// policy, is what bounds memory against callers emitting unique operation
/// names.
///
/// The sampler does its own internal locking so the enclosing controller can
/// stay on its cheap read lock for every decision.
#[derive(Debug)]
pub struct AdaptiveSampler {
    inner: RwLock<AdaptiveState>,
    max_operations: usize,
}

#[derive(Debug)]
struct AdaptiveState {
    samplers: HashMap<String, GuaranteedThroughputSampler>,
    default_sampler: ProbabilisticSampler,
    default_sampling_probability: f64,
    lower_bound: f64,
}

impl AdaptiveSampler {
    /// Builds one composite per listed operation, up to `max_operations`,
    /// all sharing the strategy's default lower bound.
    pub fn new(
        strategies: &PerOperationSamplingStrategies,
        max_operations: usize,
    ) -> Result<Self> {
        let lower_bound = strategies.default_lower_bound_traces_per_second;
        let mut samplers = HashMap::new();
        for strategy in &strategies.per_operation_strategies {
            if samplers.len() >= max_operations {
                break;
            }
            let sampler = GuaranteedThroughputSampler::new(
                &strategy.operation,
                lower_bound,
                strategy.probabilistic_sampling.sampling_rate,
            )?;
            samplers.insert(strategy.operation.clone(), sampler);
        }
        Ok(AdaptiveSampler {
            inner: RwLock::new(AdaptiveState {
                samplers,
                default_sampler: ProbabilisticSampler::new(
                    strategies.default_sampling_probability,
                )?,
                default_sampling_probability: strategies.default_sampling_probability,
                lower_bound,
            }),
            max_operations,
        })
    }

    /// Number of per-operation composites currently held
    pub fn operation_count(&self) -> usize {
        self.inner.read().unwrap().samplers.len()
    }

    /// Applies freshly fetched strategies: existing composites are updated
    /// in place, new ones are created up to the operation cap, and
    /// operations absent from the response keep their current policy. A
    /// failed per-operation update leaves the updates that already ran in
    /// place.
    pub(crate) fn update(&self, strategies: &PerOperationSamplingStrategies) -> Result<()> {
        let mut guard = self.inner.write().unwrap();
        let state = &mut *guard;
        let lower_bound = strategies.default_lower_bound_traces_per_second;
        for strategy in &strategies.per_operation_strategies {
            let sampling_rate = strategy.probabilistic_sampling.sampling_rate;
            if let Some(sampler) = state.samplers.get_mut(&strategy.operation) {
                sampler.update(lower_bound, sampling_rate)?;
            } else if state.samplers.len() < self.max_operations {
                let sampler = GuaranteedThroughputSampler::new(
                    &strategy.operation,
                    lower_bound,
                    sampling_rate,
                )?;
                state.samplers.insert(strategy.operation.clone(), sampler);
            }
        }
        state.lower_bound = lower_bound;
        if state.default_sampling_probability != strategies.default_sampling_probability {
            state.default_sampler =
                ProbabilisticSampler::new(strategies.default_sampling_probability)?;
            state.default_sampling_probability = strategies.default_sampling_probability;
        }
        Ok(())
    }

    #[cfg(test)]
    fn sampling_rate_of(&self, operation: &str) -> Option<f64> {
        self.inner
            .read()
            .unwrap()
            .samplers
            .get(operation)
            .map(|sampler| sampler.sampling_rate())
    }
}

impl Sampler for AdaptiveSampler {
    fn is_sampled(&self, trace_id: u64, operation: &str) -> SamplingDecision {
        {
            let state = self.inner.read().unwrap();
            if let Some(sampler) = state.samplers.get(operation) {
                return sampler.is_sampled(trace_id, operation);
            }
            if state.samplers.len() >= self.max_operations {
                // At capacity: unknown operations use the default sampler
                // instead of growing the map
                return state.default_sampler.is_sampled(trace_id, operation);
            }
        }

        // First sighting of this operation. Upgrade to the write lock and
        // admit it, rechecking both conditions since another thread may have
        // won the race in between.
        let mut guard = self.inner.write().unwrap();
        let state = &mut *guard;
        if state.samplers.len() >= self.max_operations && !state.samplers.contains_key(operation) {
            return state.default_sampler.is_sampled(trace_id, operation);
        }
        let sampler = match state.samplers.entry(operation.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                match GuaranteedThroughputSampler::new(
                    operation,
                    state.lower_bound,
                    state.default_sampling_probability,
                ) {
                    Ok(sampler) => entry.insert(sampler),
                    Err(_) => return SamplingDecision::not_sampled(),
                }
            }
        };
        sampler.is_sampled(trace_id, operation)
    }
}
