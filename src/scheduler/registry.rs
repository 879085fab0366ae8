//! Subsession registry
//!
//! Subsessions are registered per `(channel, source id)` so a channel's
//! video and audio subsessions never shadow each other. Iteration works on
//! a snapshot, so registering or removing a subsession while the scheduler
//! is mid-pass is safe.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::channel::ChannelKey;
use crate::error::{RegistryError, Result};
use crate::session::{AccessUnitSink, Subsession};

/// Shared handle to a registered subsession
pub type SubsessionHandle = Arc<Mutex<Subsession>>;

fn subsession_name(key: &ChannelKey, source_id: u32) -> String {
    format!("{}#{}", key, source_id)
}

/// All subsessions driven by one scheduler
#[derive(Debug, Default)]
pub struct SubsessionRegistry {
    subsessions: RwLock<HashMap<(ChannelKey, u32), SubsessionHandle>>,
}

impl SubsessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subsession, replacing any previous one for the same sub-stream
    pub async fn register(&self, subsession: Subsession) -> SubsessionHandle {
        let key = (subsession.key().clone(), subsession.source_id());
        let codec = subsession.codec();
        let handle = Arc::new(Mutex::new(subsession));

        let mut subsessions = self.subsessions.write().await;
        let replaced = subsessions.insert(key.clone(), Arc::clone(&handle)).is_some();

        tracing::info!(
            channel = %key.0,
            source_id = key.1,
            codec = %codec,
            replaced = replaced,
            "Subsession registered"
        );

        handle
    }

    /// Remove a subsession; a pass already in progress may still visit it
    pub async fn deregister(&self, key: &ChannelKey, source_id: u32) -> Option<SubsessionHandle> {
        let removed = self
            .subsessions
            .write()
            .await
            .remove(&(key.clone(), source_id));

        if removed.is_some() {
            tracing::info!(channel = %key, source_id = source_id, "Subsession deregistered");
        }
        removed
    }

    /// Remove a released subsession
    ///
    /// Does nothing if the sub-stream has been registered again since
    /// `handle` was taken.
    pub async fn remove_released(
        &self,
        key: &ChannelKey,
        source_id: u32,
        handle: &SubsessionHandle,
    ) -> bool {
        let id = (key.clone(), source_id);
        let mut subsessions = self.subsessions.write().await;
        let is_current = subsessions
            .get(&id)
            .is_some_and(|current| Arc::ptr_eq(current, handle));
        if !is_current {
            return false;
        }
        subsessions.remove(&id);

        tracing::info!(
            channel = %key,
            source_id = source_id,
            "Released subsession deregistered"
        );
        true
    }

    pub async fn get(&self, key: &ChannelKey, source_id: u32) -> Option<SubsessionHandle> {
        self.subsessions
            .read()
            .await
            .get(&(key.clone(), source_id))
            .cloned()
    }

    /// Handles to every registered subsession at this instant
    pub async fn snapshot(&self) -> Vec<SubsessionHandle> {
        self.subsessions.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.subsessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subsessions.read().await.is_empty()
    }

    async fn require(&self, key: &ChannelKey, source_id: u32) -> Result<SubsessionHandle> {
        self.get(key, source_id).await.ok_or_else(|| {
            RegistryError::SubsessionNotFound(subsession_name(key, source_id)).into()
        })
    }

    /// Attach a client to a sub-stream
    pub async fn attach_subscriber(
        &self,
        key: &ChannelKey,
        source_id: u32,
        client_id: u64,
        client_addr: impl Into<String>,
        sink: Box<dyn AccessUnitSink>,
    ) -> Result<()> {
        let handle = self.require(key, source_id).await?;
        let mut subsession = handle.lock().await;
        subsession.attach(client_id, client_addr, sink)?;
        Ok(())
    }

    /// Detach a client from a sub-stream
    pub async fn detach_subscriber(
        &self,
        key: &ChannelKey,
        source_id: u32,
        client_id: u64,
    ) -> Result<()> {
        let handle = self.require(key, source_id).await?;
        let mut subsession = handle.lock().await;
        subsession.detach(client_id)?;
        Ok(())
    }

    /// Switch the multiplexed stream a client is served
    pub async fn update_subscriber(
        &self,
        key: &ChannelKey,
        source_id: u32,
        client_id: u64,
        stream_index: usize,
    ) -> Result<bool> {
        let handle = self.require(key, source_id).await?;
        let mut subsession = handle.lock().await;
        Ok(subsession.update_client(client_id, stream_index)?)
    }
}
