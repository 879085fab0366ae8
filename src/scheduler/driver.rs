//! Scheduler loop
//!
//! Each cycle runs three phases:
//!
//! ```text
//! poll   for every subsession, pull up to N raw samples from the source
//!        and push each one through Subsession::add_media_sample
//! sweep  release subsessions whose last client left and deregister them
//! yield  run the external event step, then give the runtime a turn
//! ```
//!
//! Client statistics run on their own interval, checked once per cycle.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::config::SchedulerConfig;
use super::registry::SubsessionRegistry;
use crate::channel::RawPayloadSource;
use crate::stats::SchedulerStats;

/// One non-blocking step of an external event loop
///
/// Runs once per cycle in the yield phase, for integrations that own a
/// socket or timer loop of their own.
pub trait EventStep: Send {
    fn single_step(&mut self, max_delay: Duration);
}

/// Drives raw samples from a source into the registered subsessions
pub struct Scheduler {
    source: Arc<dyn RawPayloadSource>,
    registry: Arc<SubsessionRegistry>,
    config: SchedulerConfig,
    event_step: Option<Box<dyn EventStep>>,
    stats: SchedulerStats,
    last_statistics_pass: Instant,
}

impl Scheduler {
    pub fn new(
        source: Arc<dyn RawPayloadSource>,
        registry: Arc<SubsessionRegistry>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            source,
            registry,
            config,
            event_step: None,
            stats: SchedulerStats::new(),
            last_statistics_pass: Instant::now(),
        }
    }

    /// Run `step` in every yield phase
    pub fn with_event_step(mut self, step: Box<dyn EventStep>) -> Self {
        self.event_step = Some(step);
        self
    }

    pub fn registry(&self) -> &Arc<SubsessionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Pull raw samples into every live subsession
    ///
    /// Returns the number of samples pulled. Stops early once a revolution
    /// finds nothing.
    pub async fn poll_sources(&mut self) -> usize {
        let subsessions = self.registry.snapshot().await;
        let mut total = 0;

        for _ in 0..self.config.max_revolutions {
            let mut polled = 0;

            for handle in &subsessions {
                let mut subsession = handle.lock().await;
                if subsession.is_marked_for_teardown() {
                    continue;
                }

                let key = subsession.key().clone();
                let source_id = subsession.source_id();

                for _ in 0..self.config.max_samples_per_poll {
                    let Some(sample) = self.source.get_raw_payload(&key, source_id) else {
                        break;
                    };
                    let sample = sample.with_origin(key.id, source_id);
                    subsession.add_media_sample(&sample);
                    polled += 1;
                }
            }

            if polled == 0 {
                break;
            }
            total += polled;
        }

        self.stats.samples_polled += total as u64;
        total
    }

    /// Mark exhausted subsessions for teardown and drop them from the registry
    ///
    /// Returns the number released in this pass. A client joining the
    /// sub-stream afterwards needs a freshly registered subsession.
    pub async fn sweep(&mut self) -> usize {
        let mut released = Vec::new();

        for handle in self.registry.snapshot().await {
            let mut subsession = handle.lock().await;
            if subsession.is_exhausted() && subsession.mark_for_teardown() {
                released.push((
                    subsession.key().clone(),
                    subsession.source_id(),
                    Arc::clone(&handle),
                ));
            }
        }

        for (key, source_id, handle) in &released {
            self.registry.remove_released(key, *source_id, handle).await;
        }

        self.stats.subsessions_torn_down += released.len() as u64;
        released.len()
    }

    /// Run receiver report processing for every subscriber of every subsession
    ///
    /// Returns the number of switch directives produced.
    pub async fn process_client_statistics(&mut self) -> usize {
        let mut directives = 0;

        for handle in self.registry.snapshot().await {
            let mut subsession = handle.lock().await;
            for (client_id, direction) in subsession.process_client_statistics() {
                tracing::debug!(
                    channel = %subsession.key(),
                    source_id = subsession.source_id(),
                    client_id = client_id,
                    direction = %direction,
                    "Rate switch advised"
                );
                directives += 1;
            }
        }

        self.stats.statistics_passes += 1;
        self.last_statistics_pass = Instant::now();
        directives
    }

    /// Run one poll, sweep and yield cycle
    ///
    /// Returns the number of samples pulled.
    pub async fn run_cycle(&mut self) -> usize {
        let polled = self.poll_sources().await;
        self.sweep().await;

        if self.last_statistics_pass.elapsed() >= self.config.stats_interval {
            self.process_client_statistics().await;
        }

        if let Some(step) = self.event_step.as_mut() {
            step.single_step(self.config.max_delay);
        }

        if polled == 0 {
            tokio::time::sleep(self.config.max_delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.stats.cycles += 1;
        polled
    }

    /// Run cycles until `shutdown` resolves
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            max_samples_per_poll = self.config.max_samples_per_poll,
            max_revolutions = self.config.max_revolutions,
            "Scheduler started"
        );

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
            }
            _ = self.event_loop() => {}
        }

        tracing::info!(
            cycles = self.stats.cycles,
            samples_polled = self.stats.samples_polled,
            "Scheduler stopped"
        );
    }

    async fn event_loop(&mut self) {
        loop {
            self.run_cycle().await;
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .field("has_event_step", &self.event_step.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::channel::{ChannelConfig, ChannelKey, ChannelManager};
    use crate::error::{Error, RegistryError};
    use crate::media::Codec;
    use crate::rate::TransmissionStats;
    use crate::session::test_support::RecordingSink;
    use crate::session::{event_channel, SessionEvent, Subsession, SubsessionConfig};

    const IDR: &[u8] = &[0, 0, 0, 1, 0x65, 0x88, 0x84];
    const NON_IDR: &[u8] = &[0, 0, 0, 1, 0x41, 0x9a, 0x02];

    fn key() -> ChannelKey {
        ChannelKey::new(3, "lobby")
    }

    async fn setup(config: SchedulerConfig) -> (Arc<ChannelManager>, Scheduler) {
        let manager = Arc::new(ChannelManager::new());
        manager
            .create_channel(key(), &ChannelConfig::new().video_source_id(0).audio_source_id(1))
            .unwrap();

        let registry = Arc::new(SubsessionRegistry::new());
        registry
            .register(Subsession::new(key(), 0, SubsessionConfig::new(Codec::H264)).unwrap())
            .await;

        let scheduler = Scheduler::new(manager.clone(), registry, config);
        (manager, scheduler)
    }

    fn push(manager: &ChannelManager, chunks: &[&'static [u8]]) {
        let samples = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (Bytes::from_static(chunk), i as f64 * 0.04));
        manager.add_video_samples(&key(), samples);
    }

    #[tokio::test]
    async fn test_cycle_delivers_to_subscriber() {
        let (manager, mut scheduler) = setup(SchedulerConfig::default()).await;
        let sink = RecordingSink::awaiting();
        scheduler
            .registry()
            .attach_subscriber(&key(), 0, 7, "10.0.0.7", Box::new(sink.clone()))
            .await
            .unwrap();

        push(&manager, &[NON_IDR, IDR, NON_IDR]);
        assert_eq!(scheduler.run_cycle().await, 3);

        let frames = sink.frames();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].is_key_frame);
        assert!(!frames[1].is_key_frame);
        assert_eq!(scheduler.stats().samples_polled, 3);
        assert_eq!(scheduler.stats().cycles, 1);
    }

    #[tokio::test]
    async fn test_poll_budget_per_revolution() {
        let config = SchedulerConfig::new()
            .max_samples_per_poll(2)
            .max_revolutions(2);
        let (manager, mut scheduler) = setup(config).await;

        push(&manager, &[IDR, IDR, IDR, IDR, IDR, IDR]);
        assert_eq!(scheduler.poll_sources().await, 4);
        assert_eq!(scheduler.poll_sources().await, 2);
        assert_eq!(scheduler.poll_sources().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_releases_abandoned_subsession() {
        let (manager, mut scheduler) = setup(SchedulerConfig::default()).await;
        let (tx, mut rx) = event_channel();
        scheduler
            .registry()
            .register(
                Subsession::new(key(), 0, SubsessionConfig::new(Codec::H264))
                    .unwrap()
                    .with_events(tx),
            )
            .await;

        // never served, nothing to release
        assert_eq!(scheduler.sweep().await, 0);

        let registry = Arc::clone(scheduler.registry());
        registry
            .attach_subscriber(&key(), 0, 1, "peer", Box::new(RecordingSink::awaiting()))
            .await
            .unwrap();
        push(&manager, &[IDR]);
        scheduler.run_cycle().await;
        registry.detach_subscriber(&key(), 0, 1).await.unwrap();

        assert_eq!(scheduler.sweep().await, 1);
        assert_eq!(scheduler.sweep().await, 0);
        assert_eq!(scheduler.stats().subsessions_torn_down, 1);

        let events: Vec<SessionEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(events.contains(&SessionEvent::ChannelExhausted {
            channel: key(),
            source_id: 0
        }));

        // released subsessions are deregistered and no longer fed
        assert!(registry.is_empty().await);
        push(&manager, &[IDR]);
        assert_eq!(scheduler.poll_sources().await, 0);
    }

    #[tokio::test]
    async fn test_rejoin_after_release() {
        let (manager, mut scheduler) = setup(SchedulerConfig::default()).await;
        let registry = Arc::clone(scheduler.registry());

        registry
            .attach_subscriber(&key(), 0, 1, "peer", Box::new(RecordingSink::awaiting()))
            .await
            .unwrap();
        push(&manager, &[IDR]);
        scheduler.run_cycle().await;
        registry.detach_subscriber(&key(), 0, 1).await.unwrap();
        scheduler.run_cycle().await;
        assert_eq!(scheduler.stats().subsessions_torn_down, 1);

        // the released subsession does not take new clients
        let err = registry
            .attach_subscriber(&key(), 0, 2, "peer", Box::new(RecordingSink::awaiting()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Registry(RegistryError::SubsessionNotFound(_))
        ));

        registry
            .register(Subsession::new(key(), 0, SubsessionConfig::new(Codec::H264)).unwrap())
            .await;
        let sink = RecordingSink::awaiting();
        registry
            .attach_subscriber(&key(), 0, 2, "peer", Box::new(sink.clone()))
            .await
            .unwrap();
        push(&manager, &[IDR]);
        scheduler.run_cycle().await;

        assert_eq!(sink.frames().len(), 1);
        assert!(sink.frames()[0].is_key_frame);
    }

    #[tokio::test]
    async fn test_statistics_pass_on_interval() {
        let config = SchedulerConfig::new().stats_interval(Duration::ZERO);
        let (_manager, mut scheduler) = setup(config).await;
        let sink = RecordingSink::awaiting();
        sink.set_stats(TransmissionStats {
            last_packet_num_received: 10,
            ..Default::default()
        });
        scheduler
            .registry()
            .attach_subscriber(&key(), 0, 1, "peer", Box::new(sink))
            .await
            .unwrap();

        scheduler.run_cycle().await;
        scheduler.run_cycle().await;
        assert_eq!(scheduler.stats().statistics_passes, 2);
    }

    struct CountingStep(Arc<AtomicUsize>);

    impl EventStep for CountingStep {
        fn single_step(&mut self, _max_delay: Duration) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let (_manager, scheduler) = setup(SchedulerConfig::default()).await;
        let steps = Arc::new(AtomicUsize::new(0));
        let mut scheduler = scheduler.with_event_step(Box::new(CountingStep(steps.clone())));

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            scheduler
                .run_until(async {
                    let _ = rx.await;
                })
                .await;
            scheduler
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(()).unwrap();
        let scheduler = handle.await.unwrap();

        assert!(scheduler.stats().cycles > 0);
        assert!(steps.load(Ordering::SeqCst) > 0);
    }
}
