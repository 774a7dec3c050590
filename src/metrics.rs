// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::sync::Arc;

use crate::constants::metric;

/// Sink for the sampler's operational counters.
///
/// The controller reports how strategy polls went through this trait; the
/// hot sampling path never reports anything. Implementations must be cheap
/// and non-blocking.
pub trait MetricsReporter: Send + Sync + 'static {
    /// Records `value` occurrences of the counter `name`.
    fn count(&self, name: &'static str, value: u64);
}

/// Reporter that drops every measurement.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsReporter;

impl MetricsReporter for NoopMetricsReporter {
    fn count(&self, _name: &'static str, _value: u64) {}
}

/// The controller's counters, named once here so call sites stay terse.
#[derive(Clone)]
pub(crate) struct SamplerMetrics {
    reporter: Arc<dyn MetricsReporter>,
}

impl fmt::Debug for SamplerMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplerMetrics").finish()
    }
}

impl SamplerMetrics {
    pub(crate) fn new(reporter: Arc<dyn MetricsReporter>) -> Self {
        SamplerMetrics { reporter }
    }

    pub(crate) fn sampler_retrieved(&self) {
        self.reporter.count(metric::SAMPLER_RETRIEVED, 1);
    }

    pub(crate) fn sampler_updated(&self) {
        self.reporter.count(metric::SAMPLER_UPDATED, 1);
    }

    pub(crate) fn sampler_update_failure(&self) {
        self.reporter.count(metric::SAMPLER_UPDATE_FAILURE, 1);
    }

    pub(crate) fn sampler_query_failure(&self) {
        self.reporter.count(metric::SAMPLER_QUERY_FAILURE, 1);
    }

    pub(crate) fn sampler_parsing_failure(&self) {
        self.reporter.count(metric::SAMPLER_PARSING_FAILURE, 1);
    }
}
