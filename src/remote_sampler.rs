// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::adaptive_sampler::AdaptiveSampler;
use crate::constants::defaults;
use crate::error::{Error, Result};
use crate::fetcher::{HttpStrategyFetcher, StrategyFetcher};
use crate::metrics::{MetricsReporter, NoopMetricsReporter, SamplerMetrics};
use crate::probabilistic_sampler::ProbabilisticSampler;
use crate::rate_limiting_sampler::RateLimitingSampler;
use crate::sampler::{Sampler, SamplingDecision};
use crate::strategies::{PerOperationSamplingStrategies, SamplingStrategyResponse};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Structural identity of a fetched strategy, compared before a candidate
/// sampler is ever constructed. Two polls carrying the same descriptor skip
/// the rebuild and swap entirely; per-operation strategies always go through
/// the in-place reconcile instead.
#[derive(Debug, Clone, Copy, PartialEq)]
enum StrategyDescriptor {
    Probabilistic { sampling_rate: f64 },
    RateLimiting { max_traces_per_second: f64 },
    PerOperation,
}

/// The policy currently answering decisions. Adaptive samplers keep their
/// concrete type so the poll loop can reconcile them in place.
#[derive(Debug)]
enum ControlledSampler {
    Adaptive(AdaptiveSampler),
    Static(Box<dyn Sampler>),
}

impl ControlledSampler {
    fn is_sampled(&self, trace_id: u64, operation: &str) -> SamplingDecision {
        match self {
            ControlledSampler::Adaptive(sampler) => sampler.is_sampled(trace_id, operation),
            ControlledSampler::Static(sampler) => sampler.is_sampled(trace_id, operation),
        }
    }

    fn close(&self) {
        match self {
            ControlledSampler::Adaptive(sampler) => sampler.close(),
            ControlledSampler::Static(sampler) => sampler.close(),
        }
    }
}

#[derive(Debug)]
struct ActiveSampler {
    sampler: ControlledSampler,
    /// None when the caller supplied the initial sampler, so the first
    /// fetched strategy always installs
    descriptor: Option<StrategyDescriptor>,
}

struct SamplerState {
    service_name: String,
    max_operations: usize,
    metrics: SamplerMetrics,
    active: RwLock<ActiveSampler>,
}

impl SamplerState {
    /// Maps a fetched response onto the active sampler. Faults are swallowed
    /// here: the previous policy stays in force and only metrics and logs
    /// record what went wrong.
    fn apply_strategy(&self, response: &SamplingStrategyResponse) {
        if let Some(strategies) = &response.operation_sampling {
            self.apply_per_operation(strategies);
            return;
        }
        let descriptor = match Self::classify(response) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                self.metrics.sampler_parsing_failure();
                crate::sampling_info!(
                    "Unable to handle sampling strategy response {response:?}: {err}"
                );
                return;
            }
        };
        self.metrics.sampler_retrieved();

        let mut guard = self.active.write().unwrap();
        if guard.descriptor == Some(descriptor) {
            return;
        }
        match Self::build_sampler(descriptor) {
            Ok(sampler) => {
                guard.sampler = ControlledSampler::Static(sampler);
                guard.descriptor = Some(descriptor);
                self.metrics.sampler_updated();
            }
            Err(err) => {
                self.metrics.sampler_parsing_failure();
                crate::sampling_info!("Unable to materialize sampling strategy: {err}");
            }
        }
    }

    fn apply_per_operation(&self, strategies: &PerOperationSamplingStrategies) {
        let mut guard = self.active.write().unwrap();
        let active = &mut *guard;
        match &mut active.sampler {
            ControlledSampler::Adaptive(adaptive) => {
                self.metrics.sampler_retrieved();
                if let Err(err) = adaptive.update(strategies) {
                    self.metrics.sampler_update_failure();
                    crate::sampling_info!(
                        "Unable to apply per-operation sampling strategies: {err}"
                    );
                    return;
                }
                active.descriptor = Some(StrategyDescriptor::PerOperation);
                self.metrics.sampler_updated();
            }
            ControlledSampler::Static(_) => {
                match AdaptiveSampler::new(strategies, self.max_operations) {
                    Ok(adaptive) => {
                        self.metrics.sampler_retrieved();
                        active.sampler = ControlledSampler::Adaptive(adaptive);
                        active.descriptor = Some(StrategyDescriptor::PerOperation);
                        self.metrics.sampler_updated();
                    }
                    Err(err) => {
                        self.metrics.sampler_parsing_failure();
                        crate::sampling_info!(
                            "Unable to handle per-operation sampling strategies: {err}"
                        );
                    }
                }
            }
        }
    }

    /// Validates the response ahead of construction so an unusable strategy
    /// never counts as retrieved.
    fn classify(response: &SamplingStrategyResponse) -> Result<StrategyDescriptor> {
        if let Some(probabilistic) = &response.probabilistic_sampling {
            let sampling_rate = probabilistic.sampling_rate;
            if !(0.0..=1.0).contains(&sampling_rate) {
                return Err(Error::InvalidSamplingRate(sampling_rate));
            }
            return Ok(StrategyDescriptor::Probabilistic { sampling_rate });
        }
        if let Some(rate_limiting) = &response.rate_limiting_sampling {
            return Ok(StrategyDescriptor::RateLimiting {
                max_traces_per_second: rate_limiting.max_traces_per_second as f64,
            });
        }
        Err(Error::UnsupportedStrategy)
    }

    fn build_sampler(descriptor: StrategyDescriptor) -> Result<Box<dyn Sampler>> {
        match descriptor {
            StrategyDescriptor::Probabilistic { sampling_rate } => {
                Ok(Box::new(ProbabilisticSampler::new(sampling_rate)?))
            }
            StrategyDescriptor::RateLimiting {
                max_traces_per_second,
            } => Ok(Box::new(RateLimitingSampler::new(max_traces_per_second))),
            // Per-operation strategies never reach this path
            StrategyDescriptor::PerOperation => Err(Error::UnsupportedStrategy),
        }
    }
}

#[derive(Default)]
struct ShutdownSignaler {
    finished: Mutex<bool>,
    condvar: Condvar,
}

impl ShutdownSignaler {
    fn signal(&self) {
        let mut finished = self.finished.lock().unwrap();
        *finished = true;
        self.condvar.notify_all();
    }

    fn wait(&self, timeout: Duration) -> Result<()> {
        let finished = self.finished.lock().unwrap();
        let (_finished, wait_result) = self
            .condvar
            .wait_timeout_while(finished, timeout, |finished| !*finished)
            .unwrap();
        if wait_result.timed_out() {
            return Err(Error::ShutdownTimedOut);
        }
        Ok(())
    }
}

/// Signals shutdown completion when the poll worker unwinds, whether it
/// exited cleanly or panicked.
struct PollShutdownReceiver {
    cancel_token: CancellationToken,
    shutdown: Arc<ShutdownSignaler>,
}

impl Drop for PollShutdownReceiver {
    fn drop(&mut self) {
        self.shutdown.signal();
    }
}

struct PollerHandle {
    join_handle: Mutex<Option<thread::JoinHandle<()>>>,
    cancel_token: CancellationToken,
    shutdown: Arc<ShutdownSignaler>,
}

impl PollerHandle {
    fn trigger_shutdown(&self) {
        self.cancel_token.cancel();
    }

    fn wait_for_shutdown(&self, timeout: Duration) -> Result<()> {
        let Some(handle) = self.join_handle.lock().unwrap().take() else {
            return Ok(());
        };
        self.shutdown.wait(timeout)?;
        handle.join().map_err(|payload| {
            let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
                message
            } else if let Some(message) = payload.downcast_ref::<String>() {
                message
            } else {
                "unknown panic type"
            };
            Error::PollerPanicked(message.to_string())
        })?;
        Ok(())
    }
}

struct PollWorker {
    state: Arc<SamplerState>,
    fetcher: Box<dyn StrategyFetcher>,
    poll_interval: Duration,
    shutdown_receiver: PollShutdownReceiver,
}

impl PollWorker {
    /// Spawns the poll thread. The returned handle owns the cancellation
    /// token and the shutdown barrier before the thread exists, so a close
    /// racing construction still joins correctly.
    fn start(
        state: Arc<SamplerState>,
        fetcher: Box<dyn StrategyFetcher>,
        poll_interval: Duration,
    ) -> PollerHandle {
        let cancel_token = CancellationToken::new();
        let shutdown = Arc::new(ShutdownSignaler::default());
        let worker = PollWorker {
            state,
            fetcher,
            poll_interval,
            shutdown_receiver: PollShutdownReceiver {
                cancel_token: cancel_token.clone(),
                shutdown: shutdown.clone(),
            },
        };
        let join_handle = thread::spawn(move || worker.run());
        PollerHandle {
            join_handle: Mutex::new(Some(join_handle)),
            cancel_token,
            shutdown,
        }
    }

    fn run(self) {
        crate::sampling_debug!(
            "sampling poller: started for service {}",
            self.state.service_name
        );

        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(err) => {
                crate::sampling_error!("sampling poller: failed to create runtime: {err}");
                return;
            }
        };

        let poll_loop = async {
            let mut last_poll = Instant::now();
            loop {
                self.poll_once().await;

                let elapsed = last_poll.elapsed();
                if elapsed < self.poll_interval {
                    tokio::time::sleep(self.poll_interval - elapsed).await;
                }
                last_poll = Instant::now();
            }
        };

        rt.block_on(async {
            tokio::select! {
                _ = self.shutdown_receiver.cancel_token.cancelled() => {}
                _ = poll_loop => {}
            }
        });
    }

    async fn poll_once(&self) {
        match self.fetcher.fetch(&self.state.service_name).await {
            Ok(response) => self.state.apply_strategy(&response),
            Err(err) => {
                self.state.metrics.sampler_query_failure();
                crate::sampling_debug!("sampling poller: strategy query failed: {err}");
            }
        }
    }
}

/// Delegating sampler that periodically fetches the sampling strategy for a
/// service from an HTTP control plane and hot-swaps the active policy
/// without disturbing in-flight decisions.
///
/// Until the first successful poll, decisions come from the initial sampler
/// (by default probabilistic at 0.001, bounding the damage for services
/// whose configuration has not been fetched yet).
pub struct RemotelyControlledSampler {
    state: Arc<SamplerState>,
    poller: PollerHandle,
}

impl fmt::Debug for RemotelyControlledSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemotelyControlledSampler")
            .field("service_name", &self.state.service_name)
            .field("max_operations", &self.state.max_operations)
            .finish()
    }
}

impl RemotelyControlledSampler {
    pub fn builder(service_name: impl Into<String>) -> RemotelyControlledSamplerBuilder {
        RemotelyControlledSamplerBuilder::new(service_name.into())
    }

    /// Stops the poll loop and joins it. Decisions must not be requested
    /// after this returns.
    pub fn close(&self) {
        self.poller.trigger_shutdown();
        if let Err(err) = self.poller.wait_for_shutdown(SHUTDOWN_TIMEOUT) {
            crate::sampling_error!("sampling poller: shutdown failed: {err}");
        }
        self.state.active.read().unwrap().sampler.close();
    }
}

impl Sampler for RemotelyControlledSampler {
    fn is_sampled(&self, trace_id: u64, operation: &str) -> SamplingDecision {
        // The read lock spans the whole delegated decision so the active
        // sampler cannot be swapped out from under it
        let active = self.state.active.read().unwrap();
        active.sampler.is_sampled(trace_id, operation)
    }

    fn close(&self) {
        RemotelyControlledSampler::close(self);
    }
}

impl Drop for RemotelyControlledSampler {
    fn drop(&mut self) {
        self.poller.trigger_shutdown();
    }
}

/// Builder for [`RemotelyControlledSampler`]; every knob has a production
/// default.
pub struct RemotelyControlledSamplerBuilder {
    service_name: String,
    host_port: String,
    poll_interval: Duration,
    max_operations: usize,
    initial_sampler: Option<Box<dyn Sampler>>,
    metrics: Arc<dyn MetricsReporter>,
    fetcher: Option<Box<dyn StrategyFetcher>>,
}

impl RemotelyControlledSamplerBuilder {
    fn new(service_name: String) -> Self {
        RemotelyControlledSamplerBuilder {
            service_name,
            host_port: defaults::SAMPLING_SERVER_HOST_PORT.to_string(),
            poll_interval: defaults::POLL_INTERVAL,
            max_operations: defaults::MAX_OPERATIONS,
            initial_sampler: None,
            metrics: Arc::new(NoopMetricsReporter),
            fetcher: None,
        }
    }

    /// Address of the strategy endpoint, `host:port`
    pub fn with_host_port(mut self, host_port: impl Into<String>) -> Self {
        self.host_port = host_port.into();
        self
    }

    /// How often the strategy is refetched
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Cap on per-operation composites held by an adaptive sampler
    pub fn with_max_operations(mut self, max_operations: usize) -> Self {
        self.max_operations = max_operations;
        self
    }

    /// Sampler answering decisions until the first successful poll
    pub fn with_initial_sampler(mut self, sampler: Box<dyn Sampler>) -> Self {
        self.initial_sampler = Some(sampler);
        self
    }

    pub fn with_metrics_reporter(mut self, reporter: Arc<dyn MetricsReporter>) -> Self {
        self.metrics = reporter;
        self
    }

    /// Replaces the HTTP fetcher, e.g. with a canned one in tests
    pub fn with_strategy_fetcher(mut self, fetcher: Box<dyn StrategyFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn build(self) -> RemotelyControlledSampler {
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Box::new(HttpStrategyFetcher::new(self.host_port)),
        };
        let (sampler, descriptor) = match self.initial_sampler {
            Some(sampler) => (ControlledSampler::Static(sampler), None),
            None => {
                let initial = ProbabilisticSampler::default();
                let descriptor = StrategyDescriptor::Probabilistic {
                    sampling_rate: initial.sampling_rate(),
                };
                (
                    ControlledSampler::Static(Box::new(initial)),
                    Some(descriptor),
                )
            }
        };
        let state = Arc::new(SamplerState {
            service_name: self.service_name,
            max_operations: self.max_operations,
            metrics: SamplerMetrics::new(self.metrics),
            active: RwLock::new(ActiveSampler {
                sampler,
                descriptor,
            }),
        });
        let poller = PollWorker::start(Arc::clone(&state), fetcher, self.poll_interval);
        RemotelyControlledSampler { state, poller }
    }
}
