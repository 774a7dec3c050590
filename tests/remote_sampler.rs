// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! End-to-end tests of the poll loop: a scripted fetcher stands in for the
//! control plane and a recording reporter observes the controller's
//! counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dd_remote_sampling::constants::metric;
use dd_remote_sampling::{
    ConstSampler, Error, MetricsReporter, OperationSamplingStrategy,
    PerOperationSamplingStrategies, ProbabilisticSamplingStrategy, RemotelyControlledSampler,
    Result, Sampler, SamplingStrategyResponse, StrategyFetcher,
};

#[derive(Default)]
struct RecordingReporter {
    counts: Mutex<HashMap<&'static str, u64>>,
}

impl RecordingReporter {
    fn get(&self, name: &'static str) -> u64 {
        *self.counts.lock().unwrap().get(name).unwrap_or(&0)
    }
}

impl MetricsReporter for RecordingReporter {
    fn count(&self, name: &'static str, value: u64) {
        *self.counts.lock().unwrap().entry(name).or_insert(0) += value;
    }
}

/// Serves the same strategy on every poll and counts the polls.
struct FixedFetcher {
    response: SamplingStrategyResponse,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl StrategyFetcher for FixedFetcher {
    async fn fetch(&self, _service_name: &str) -> Result<SamplingStrategyResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

/// Control plane that is never reachable.
struct FailingFetcher {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl StrategyFetcher for FailingFetcher {
    async fn fetch(&self, _service_name: &str) -> Result<SamplingStrategyResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::StrategyRequest(Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ))))
    }
}

fn probabilistic_response(sampling_rate: f64) -> SamplingStrategyResponse {
    SamplingStrategyResponse {
        operation_sampling: None,
        probabilistic_sampling: Some(ProbabilisticSamplingStrategy { sampling_rate }),
        rate_limiting_sampling: None,
    }
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

#[test]
fn test_poll_installs_fetched_strategy() {
    let reporter = Arc::new(RecordingReporter::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let sampler = RemotelyControlledSampler::builder("billing")
        .with_poll_interval(Duration::from_millis(25))
        .with_metrics_reporter(reporter.clone())
        .with_strategy_fetcher(Box::new(FixedFetcher {
            response: probabilistic_response(1.0),
            calls: calls.clone(),
        }))
        .build();

    assert!(wait_until(Duration::from_secs(5), || {
        reporter.get(metric::SAMPLER_UPDATED) >= 1
    }));

    // The fetched rate 1.0 policy is now answering decisions
    assert!(sampler.is_sampled(u64::MAX >> 1, "op").sampled);

    // Identical strategies on later ticks are recognized and skipped
    let retrieved = reporter.get(metric::SAMPLER_RETRIEVED);
    assert!(wait_until(Duration::from_secs(5), || {
        reporter.get(metric::SAMPLER_RETRIEVED) > retrieved
    }));
    assert_eq!(reporter.get(metric::SAMPLER_UPDATED), 1);

    sampler.close();

    // The poll loop has exited: no more fetches happen
    let calls_after_close = calls.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(120));
    assert_eq!(calls.load(Ordering::SeqCst), calls_after_close);
}

#[test]
fn test_fetch_failures_keep_last_policy() {
    let reporter = Arc::new(RecordingReporter::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let sampler = RemotelyControlledSampler::builder("billing")
        .with_poll_interval(Duration::from_millis(25))
        .with_metrics_reporter(reporter.clone())
        .with_initial_sampler(Box::new(ConstSampler::new(true)))
        .with_strategy_fetcher(Box::new(FailingFetcher {
            calls: calls.clone(),
        }))
        .build();

    assert!(wait_until(Duration::from_secs(5), || {
        reporter.get(metric::SAMPLER_QUERY_FAILURE) >= 2
    }));

    // Every decision still comes from the initial sampler
    assert!(sampler.is_sampled(1, "op").sampled);
    assert_eq!(reporter.get(metric::SAMPLER_UPDATED), 0);

    sampler.close();
}

#[test]
fn test_close_immediately_after_build() {
    let sampler = RemotelyControlledSampler::builder("billing")
        .with_poll_interval(Duration::from_secs(3600))
        .with_strategy_fetcher(Box::new(FixedFetcher {
            response: probabilistic_response(0.5),
            calls: Arc::new(AtomicUsize::new(0)),
        }))
        .build();

    let started = Instant::now();
    sampler.close();
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_per_operation_strategy_end_to_end() {
    let reporter = Arc::new(RecordingReporter::default());
    let response = SamplingStrategyResponse {
        operation_sampling: Some(PerOperationSamplingStrategies {
            default_sampling_probability: 1.0,
            default_lower_bound_traces_per_second: 1.0,
            per_operation_strategies: vec![OperationSamplingStrategy {
                operation: "quiet".to_string(),
                probabilistic_sampling: ProbabilisticSamplingStrategy { sampling_rate: 0.0 },
            }],
        }),
        probabilistic_sampling: None,
        rate_limiting_sampling: None,
    };
    let sampler = RemotelyControlledSampler::builder("billing")
        .with_poll_interval(Duration::from_millis(25))
        .with_metrics_reporter(reporter.clone())
        .with_strategy_fetcher(Box::new(FixedFetcher {
            response,
            calls: Arc::new(AtomicUsize::new(0)),
        }))
        .build();

    assert!(wait_until(Duration::from_secs(5), || {
        reporter.get(metric::SAMPLER_UPDATED) >= 1
    }));

    // "quiet" is pinned at rate 0.0: its lower-bound burst grants one
    // decision, then the floor is dry
    assert!(sampler.is_sampled(u64::MAX >> 1, "quiet").sampled);
    assert!(!sampler.is_sampled(1, "quiet").sampled);

    // Unknown operations are admitted lazily at the default probability 1.0
    assert!(sampler.is_sampled(u64::MAX >> 1, "chatty").sampled);

    sampler.close();
}
