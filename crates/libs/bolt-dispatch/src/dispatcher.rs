//! Composition of registry, encoder and queue for the outgoing message flow:
//! register schemas, `prepare` each message (encode + enqueue), transmit the
//! envelope elsewhere, then `record_response`.

use serde::Serialize;

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::packet::{PacketEncoder, PacketId};
use crate::queue::{DispatchQueue, DispatchStatus};
use crate::schema::SchemaRegistry;
use crate::MessageId;

/// Owns one registry, encoder and queue.
///
/// Age-based retention only runs when [`Dispatcher::sweep`] is called; the
/// dispatcher starts no background task. Use a
/// [`SharedDispatchQueue`](crate::SharedDispatchQueue) sweeper for that.
#[derive(Debug, Default)]
pub struct Dispatcher {
    registry: SchemaRegistry,
    encoder: PacketEncoder,
    queue: DispatchQueue,
}

impl Dispatcher {
    pub fn new(config: &DispatchConfig) -> Self {
        Self::from_parts(
            SchemaRegistry::new(),
            PacketEncoder::new(config.packet.identifier),
            DispatchQueue::with_retention(config.queue.retention()),
        )
    }

    pub fn from_parts(
        registry: SchemaRegistry,
        encoder: PacketEncoder,
        queue: DispatchQueue,
    ) -> Self {
        Self { registry, encoder, queue }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SchemaRegistry {
        &mut self.registry
    }

    pub fn encoder(&self) -> &PacketEncoder {
        &self.encoder
    }

    pub fn queue(&self) -> &DispatchQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut DispatchQueue {
        &mut self.queue
    }

    /// Encode `payload` for the registered `schema` and start tracking it.
    ///
    /// The schema name only has to be registered; the payload is not checked
    /// against its structure. Returns the identifier and the envelope to send.
    pub fn prepare<T: Serialize + ?Sized>(
        &mut self,
        schema: &str,
        payload: &T,
    ) -> Result<(PacketId, String), DispatchError> {
        self.registry.get(schema)?;

        let (id, envelope) = self.encoder.encode(payload)?;
        self.queue.enqueue(id.to_hex());
        log::debug!("dispatch: prepared {} packet {}", schema, id);
        Ok((id, envelope))
    }

    /// Record the outcome reported for a prepared packet.
    pub fn record_response(
        &mut self,
        id: &str,
        status: impl Into<DispatchStatus>,
    ) -> Result<(), DispatchError> {
        self.queue.update(id, status)
    }

    /// Evict queue entries older than the configured `max_age`.
    pub fn sweep(&mut self) -> Vec<MessageId> {
        self.queue.evict_expired()
    }

    pub fn into_parts(self) -> (SchemaRegistry, PacketEncoder, DispatchQueue) {
        (self.registry, self.encoder, self.queue)
    }
}
