//! Subsession: fan-out unit for one sub-stream of one channel

use std::sync::Arc;

use bytes::Bytes;

use super::config::SubsessionConfig;
use super::event::{EventSender, SessionEvent};
use super::sink::AccessUnitSink;
use super::subscriber::Subscriber;
use crate::channel::ChannelKey;
use crate::error::{ConfigError, RegistryError};
use crate::media::{AccessUnit, Codec};
use crate::rate::{RateAdaptationFactory, RateController, SwitchDirection};
use crate::stats::SubscriberStats;
use crate::store::{MultiplexedSampleStore, SampleStore, SingleSampleStore};

/// Serves every client of one channel's video or audio sub-stream
pub struct Subsession {
    key: ChannelKey,
    source_id: u32,
    config: SubsessionConfig,
    store: Box<dyn SampleStore>,
    subscribers: Vec<Subscriber>,
    has_served_any_subscriber: bool,
    marked_for_teardown: bool,
    events: Option<EventSender>,
    rate_factory: Option<Arc<dyn RateAdaptationFactory>>,
    rate_controller: Option<Arc<dyn RateController>>,
}

impl Subsession {
    /// Create a subsession, failing if the configuration is invalid
    pub fn new(
        key: ChannelKey,
        source_id: u32,
        config: SubsessionConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let store: Box<dyn SampleStore> = if config.is_multiplexed() {
            Box::new(MultiplexedSampleStore::with_capacity(
                config.total_channels,
                config.initial_buffer_size,
            ))
        } else {
            let store = SingleSampleStore::with_capacity(config.initial_buffer_size);
            if config.prepend_start_code {
                Box::new(store.with_start_code())
            } else {
                Box::new(store)
            }
        };

        Ok(Self {
            key,
            source_id,
            config,
            store,
            subscribers: Vec::new(),
            has_served_any_subscriber: false,
            marked_for_teardown: false,
            events: None,
            rate_factory: None,
            rate_controller: None,
        })
    }

    /// Emit lifecycle events on `events`
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Give every new video subscriber its own rate adaptation policy
    pub fn with_rate_adaptation(
        mut self,
        factory: Arc<dyn RateAdaptationFactory>,
        controller: Option<Arc<dyn RateController>>,
    ) -> Self {
        self.rate_factory = Some(factory);
        self.rate_controller = controller;
        self
    }

    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    pub fn source_id(&self) -> u32 {
        self.source_id
    }

    pub fn codec(&self) -> Codec {
        self.config.codec
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn has_served_any_subscriber(&self) -> bool {
        self.has_served_any_subscriber
    }

    pub fn is_marked_for_teardown(&self) -> bool {
        self.marked_for_teardown
    }

    /// Whether the scheduler should tear this subsession down
    pub fn is_exhausted(&self) -> bool {
        self.subscribers.is_empty() && self.has_served_any_subscriber && !self.marked_for_teardown
    }

    pub fn connected_client_ids(&self) -> Vec<u64> {
        self.subscribers.iter().map(Subscriber::client_id).collect()
    }

    pub fn subscriber_stats(&self, client_id: u64) -> Option<SubscriberStats> {
        self.subscriber(client_id).map(|sub| sub.stats().clone())
    }

    pub fn subscriber(&self, client_id: u64) -> Option<&Subscriber> {
        self.subscribers.iter().find(|sub| sub.client_id() == client_id)
    }

    fn subscriber_mut(&mut self, client_id: u64) -> Option<&mut Subscriber> {
        self.subscribers
            .iter_mut()
            .find(|sub| sub.client_id() == client_id)
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            // receiver gone means nobody is listening
            let _ = events.send(event);
        }
    }

    /// Store a raw sample and let every subscriber pull from it
    pub fn add_media_sample(&mut self, sample: &AccessUnit) {
        if let Err(e) = self.store.ingest(&sample.payload, sample.start_time) {
            tracing::error!(
                channel = %self.key,
                source_id = self.source_id,
                error = %e,
                "Raw sample rejected"
            );
            return;
        }

        if self.subscribers.is_empty() {
            return;
        }
        self.has_served_any_subscriber = true;

        let Some(snapshot) = self.store.current_unit() else {
            return;
        };
        let payload = Bytes::copy_from_slice(snapshot.data);
        let start_time = snapshot.start_time;

        for subscriber in &mut self.subscribers {
            if subscriber.retrieve(&payload, start_time) {
                subscriber.deliver_pending();
            }
        }
    }

    /// Attach a client
    ///
    /// This is the framer source for the client: it frames this
    /// subsession's payloads with the configured codec.
    pub fn attach(
        &mut self,
        client_id: u64,
        client_addr: impl Into<String>,
        sink: Box<dyn AccessUnitSink>,
    ) -> Result<(), RegistryError> {
        if self.marked_for_teardown {
            return Err(RegistryError::SubsessionReleased(format!(
                "{}#{}",
                self.key, self.source_id
            )));
        }
        if self.subscriber(client_id).is_some() {
            return Err(RegistryError::DuplicateClient(client_id));
        }

        let codec = self.config.codec;
        let mut subscriber = Subscriber::new(
            client_id,
            codec,
            self.config.effective_sync_policy(),
            self.config.max_backlog,
            sink,
        )
        .with_origin(self.key.id, self.source_id);

        if codec.is_video() {
            if let Some(factory) = &self.rate_factory {
                subscriber =
                    subscriber.with_rate_adaptation(factory.create(), self.rate_controller.clone());
            }
        }

        self.subscribers.push(subscriber);

        let client_addr = client_addr.into();
        tracing::info!(
            channel = %self.key,
            source_id = self.source_id,
            client_id = client_id,
            client_addr = %client_addr,
            subscribers = self.subscribers.len(),
            "Subscriber attached"
        );
        self.emit(SessionEvent::ClientJoined {
            channel: self.key.clone(),
            source_id: self.source_id,
            client_id,
            client_addr,
        });

        Ok(())
    }

    /// Detach a client, discarding its backlog
    ///
    /// Detaching the last client does not tear the subsession down; that is
    /// left to the scheduler's sweep.
    pub fn detach(&mut self, client_id: u64) -> Result<(), RegistryError> {
        let index = self
            .subscribers
            .iter()
            .position(|sub| sub.client_id() == client_id)
            .ok_or(RegistryError::ClientNotFound(client_id))?;
        let subscriber = self.subscribers.remove(index);

        tracing::info!(
            channel = %self.key,
            source_id = self.source_id,
            client_id = client_id,
            discarded = subscriber.backlog_len(),
            subscribers = self.subscribers.len(),
            "Subscriber detached"
        );
        self.emit(SessionEvent::ClientLeft {
            channel: self.key.clone(),
            source_id: self.source_id,
            client_id,
        });

        Ok(())
    }

    /// Switch the multiplexed stream served by this subsession
    pub fn update_client(
        &mut self,
        client_id: u64,
        stream_index: usize,
    ) -> Result<bool, RegistryError> {
        if self.subscriber(client_id).is_none() {
            return Err(RegistryError::ClientNotFound(client_id));
        }

        let switched = self.store.select_stream(stream_index);
        tracing::info!(
            channel = %self.key,
            client_id = client_id,
            stream_index = stream_index,
            switched = switched,
            "Client update"
        );
        self.emit(SessionEvent::ClientUpdated {
            channel: self.key.clone(),
            source_id: self.source_id,
            client_id,
            stream_index,
        });

        Ok(switched)
    }

    /// Deliver queued units to a client whose transport is ready
    pub fn request_frames(&mut self, client_id: u64) -> Result<usize, RegistryError> {
        self.subscriber_mut(client_id)
            .map(Subscriber::deliver_pending)
            .ok_or(RegistryError::ClientNotFound(client_id))
    }

    /// Run receiver report processing for every subscriber
    ///
    /// Returns the directives produced, in subscriber order.
    pub fn process_client_statistics(&mut self) -> Vec<(u64, SwitchDirection)> {
        self.subscribers
            .iter_mut()
            .filter_map(|sub| {
                sub.process_receiver_reports()
                    .map(|direction| (sub.client_id(), direction))
            })
            .collect()
    }

    /// Release the channel; only the first call has any effect
    ///
    /// Returns true if this call performed the teardown.
    pub fn mark_for_teardown(&mut self) -> bool {
        if self.marked_for_teardown {
            return false;
        }
        self.marked_for_teardown = true;

        tracing::info!(
            channel = %self.key,
            source_id = self.source_id,
            "Subsession exhausted, releasing channel"
        );
        self.emit(SessionEvent::ChannelExhausted {
            channel: self.key.clone(),
            source_id: self.source_id,
        });
        true
    }
}

impl std::fmt::Debug for Subsession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subsession")
            .field("key", &self.key)
            .field("source_id", &self.source_id)
            .field("codec", &self.config.codec)
            .field("subscribers", &self.subscribers.len())
            .field("has_served_any_subscriber", &self.has_served_any_subscriber)
            .field("marked_for_teardown", &self.marked_for_teardown)
            .finish()
    }
}
