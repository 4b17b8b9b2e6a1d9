//! Network condition simulation for web API tests
//!
//! [`NetworkConditionSimulator`] wraps the transport currently installed in a
//! [`SharedTransport`] handle. Every request it intercepts is delayed by the
//! configured latency and then dropped with the configured probability,
//! failing with the same [`TransportError::Connection`] a real connection
//! failure produces. The simulation is scoped: installing it yields a
//! [`NetworkConditionGuard`] whose drop puts the previous transport back.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::distributions::{Bernoulli, Distribution};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};
use webtest_core::http::{HttpRequest, HttpResponse, SharedTransport, Transport, TransportError};
use webtest_core::{Error, Result};

/// Latency and packet loss applied to intercepted requests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkConditionSpec {
    latency: Duration,
    packet_loss: f64,
}

impl NetworkConditionSpec {
    /// Create a spec; `packet_loss` must lie in `[0, 1]`
    pub fn new(latency: Duration, packet_loss: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&packet_loss) {
            return Err(Error::configuration(format!(
                "packet_loss must be within [0, 1], got {packet_loss}"
            )));
        }
        Ok(Self { latency, packet_loss })
    }

    /// Create a spec with the latency given in (fractional) seconds
    pub fn from_secs_f64(latency_secs: f64, packet_loss: f64) -> Result<Self> {
        if !latency_secs.is_finite() || latency_secs < 0.0 {
            return Err(Error::configuration(format!(
                "latency must be a non-negative number of seconds, got {latency_secs}"
            )));
        }
        let latency = Duration::try_from_secs_f64(latency_secs)
            .map_err(|e| Error::configuration(format!("latency out of range: {e}")))?;
        Self::new(latency, packet_loss)
    }

    /// No added latency and no loss
    pub fn none() -> Self {
        Self { latency: Duration::ZERO, packet_loss: 0.0 }
    }

    /// Added latency only
    pub fn slow(latency: Duration) -> Self {
        Self { latency, packet_loss: 0.0 }
    }

    /// Packet loss only
    pub fn lossy(packet_loss: f64) -> Result<Self> {
        Self::new(Duration::ZERO, packet_loss)
    }

    /// Every request fails
    pub fn disconnected() -> Self {
        Self { latency: Duration::ZERO, packet_loss: 1.0 }
    }

    /// Delay added before each request
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Probability that a request is dropped
    pub fn packet_loss(&self) -> f64 {
        self.packet_loss
    }
}

impl Default for NetworkConditionSpec {
    fn default() -> Self {
        Self::none()
    }
}

/// What a simulator did to the requests it intercepted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationStats {
    /// Requests that reached the simulator
    pub intercepted: u64,
    /// Requests failed by simulated packet loss
    pub dropped: u64,
    /// Requests passed on to the wrapped transport
    pub forwarded: u64,
    /// Sum of injected delays
    pub injected_delay: Duration,
}

impl SimulationStats {
    /// Fraction of intercepted requests that were dropped
    pub fn drop_rate(&self) -> f64 {
        if self.intercepted == 0 {
            0.0
        } else {
            self.dropped as f64 / self.intercepted as f64
        }
    }
}

/// Transport that injects latency and packet loss in front of another one
pub struct NetworkConditionSimulator {
    /// Transport requests are forwarded to
    inner: Arc<dyn Transport>,
    /// Active conditions
    spec: NetworkConditionSpec,
    /// Packet loss model
    loss: Bernoulli,
    /// Random number generator
    rng: Mutex<StdRng>,
    /// Outcome counters
    stats: Mutex<SimulationStats>,
}

impl NetworkConditionSimulator {
    /// Wrap `inner` with the given conditions, seeding the RNG from entropy
    pub fn new(inner: Arc<dyn Transport>, spec: NetworkConditionSpec) -> Result<Self> {
        let loss = Bernoulli::new(spec.packet_loss)
            .map_err(|e| Error::configuration(format!("invalid packet_loss: {e}")))?;

        Ok(Self {
            inner,
            spec,
            loss,
            rng: Mutex::new(StdRng::from_entropy()),
            stats: Mutex::new(SimulationStats::default()),
        })
    }

    /// Use a fixed seed so the drop pattern is reproducible
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    /// Active conditions
    pub fn spec(&self) -> NetworkConditionSpec {
        self.spec
    }

    /// Snapshot of the outcome counters
    pub fn stats(&self) -> SimulationStats {
        self.stats.lock().clone()
    }

    /// Start simulating `spec` on every request sent through `handle`
    pub fn install(handle: &SharedTransport, spec: NetworkConditionSpec) -> Result<NetworkConditionGuard> {
        let simulator = Self::new(handle.current(), spec)?;
        Ok(NetworkConditionGuard::activate(handle, simulator))
    }

    /// Like [`install`](Self::install) with a reproducible drop pattern
    pub fn install_seeded(
        handle: &SharedTransport,
        spec: NetworkConditionSpec,
        seed: u64,
    ) -> Result<NetworkConditionGuard> {
        let simulator = Self::new(handle.current(), spec)?.with_seed(seed);
        Ok(NetworkConditionGuard::activate(handle, simulator))
    }

    fn record(&self, dropped: bool) {
        let mut stats = self.stats.lock();
        stats.intercepted += 1;
        stats.injected_delay += self.spec.latency;
        if dropped {
            stats.dropped += 1;
        } else {
            stats.forwarded += 1;
        }
    }
}

impl std::fmt::Debug for NetworkConditionSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkConditionSimulator")
            .field("inner", &self.inner.name())
            .field("spec", &self.spec)
            .field("stats", &*self.stats.lock())
            .finish()
    }
}

#[async_trait]
impl Transport for NetworkConditionSimulator {
    async fn execute(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        if !self.spec.latency.is_zero() {
            tokio::time::sleep(self.spec.latency).await;
        }

        let dropped = self.loss.sample(&mut *self.rng.lock());
        self.record(dropped);

        if dropped {
            debug!(method = %request.method, url = %request.url, "dropping request");
            return Err(TransportError::connection(format!(
                "connection lost during {} {}",
                request.method, request.url
            )));
        }

        self.inner.execute(request).await
    }

    fn name(&self) -> &str {
        "network-condition-simulator"
    }
}

/// Active simulation scope.
///
/// Dropping the guard, on any exit path including a panic unwinding through
/// the scope, reinstalls the transport that was current when the
/// simulation started.
#[must_use = "the simulation ends as soon as the guard is dropped"]
pub struct NetworkConditionGuard {
    handle: SharedTransport,
    original: Option<Arc<dyn Transport>>,
    simulator: Arc<NetworkConditionSimulator>,
}

impl NetworkConditionGuard {
    fn activate(handle: &SharedTransport, simulator: NetworkConditionSimulator) -> Self {
        let simulator = Arc::new(simulator);
        let installed: Arc<dyn Transport> = simulator.clone();
        let original = handle.replace(installed);

        info!(
            "Simulating network conditions: latency={:?}, packet_loss={}",
            simulator.spec.latency, simulator.spec.packet_loss
        );

        Self { handle: handle.clone(), original: Some(original), simulator }
    }

    /// The installed simulator
    pub fn simulator(&self) -> &NetworkConditionSimulator {
        &self.simulator
    }

    /// Snapshot of the outcome counters so far
    pub fn stats(&self) -> SimulationStats {
        self.simulator.stats()
    }

    /// End the simulation now and return its final counters
    pub fn restore(mut self) -> SimulationStats {
        self.restore_original();
        self.simulator.stats()
    }

    fn restore_original(&mut self) {
        if let Some(original) = self.original.take() {
            self.handle.replace(original);
            let stats = self.simulator.stats();
            info!(
                "Network simulation ended: {} intercepted, {} dropped, {} forwarded",
                stats.intercepted, stats.dropped, stats.forwarded
            );
        }
    }
}

impl Drop for NetworkConditionGuard {
    fn drop(&mut self) {
        self.restore_original();
    }
}

impl std::fmt::Debug for NetworkConditionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkConditionGuard")
            .field("active", &self.original.is_some())
            .field("simulator", &self.simulator)
            .finish()
    }
}

/// Run `body` with `spec` simulated on `handle`.
///
/// The previous transport is back in place once this returns, and also if
/// `body` panics. Only an invalid `spec` produces an error here; whatever
/// `body` yields is returned unchanged.
pub async fn simulate_network_condition<F, T>(
    handle: &SharedTransport,
    spec: NetworkConditionSpec,
    body: F,
) -> Result<T>
where
    F: Future<Output = T>,
{
    let _guard = NetworkConditionSimulator::install(handle, spec)?;
    Ok(body.await)
}
