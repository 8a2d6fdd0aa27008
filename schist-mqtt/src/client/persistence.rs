/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Durable storage for outbound QoS 1 and QoS 2 exchanges, keyed by packet id.

The client records each outbound PUBLISH before writing it and, for QoS 2, overwrites the record
with the PUBREL once the PUBREC arrives.  Records are deleted when the exchange completes.  Whatever
remains after a session is lost is replayed when a later connection resumes the session.
 */

use crate::error::{MqttError, MqttResult};
use crate::mqtt::MqttPacket;

use std::collections::HashMap;
use std::sync::RwLock;

/// Pluggable packet store used to recover in-flight exchanges across connections
pub trait Persistence : Send + Sync {

    /// Prepares the store for use.  Opening an already-open store does nothing.
    fn open(&self) -> MqttResult<()>;

    /// Records (or overwrites) the packet stored under a packet id
    fn put(&self, packet_id: u16, packet: &MqttPacket) -> MqttResult<()>;

    /// Returns the packet stored under a packet id, if any
    fn get(&self, packet_id: u16) -> Option<MqttPacket>;

    /// Returns every stored record, ordered by packet id
    fn all(&self) -> Vec<(u16, MqttPacket)>;

    /// Removes the record for a packet id.  Deleting an absent record does nothing.
    fn delete(&self, packet_id: u16);

    /// Removes every record
    fn reset(&self);

    /// Releases the store's resources
    fn close(&self);
}

/// A store that keeps nothing; sessions using it cannot recover in-flight exchanges
#[derive(Default)]
pub struct NoopPersistence {}

impl NoopPersistence {

    /// Creates a new no-op store
    pub fn new() -> Self {
        NoopPersistence {}
    }
}

impl Persistence for NoopPersistence {
    fn open(&self) -> MqttResult<()> { Ok(()) }

    fn put(&self, _: u16, _: &MqttPacket) -> MqttResult<()> { Ok(()) }

    fn get(&self, _: u16) -> Option<MqttPacket> { None }

    fn all(&self) -> Vec<(u16, MqttPacket)> { Vec::new() }

    fn delete(&self, _: u16) {}

    fn reset(&self) {}

    fn close(&self) {}
}

#[derive(Default)]
struct MemoryPersistenceState {
    records: HashMap<u16, MqttPacket>,
    closed: bool,
}

/// An in-process store.  Records survive a lost connection but not the process.
#[derive(Default)]
pub struct MemoryPersistence {
    state: RwLock<MemoryPersistenceState>,
}

impl MemoryPersistence {

    /// Creates a new, empty in-memory store
    pub fn new() -> Self {
        MemoryPersistence {
            state: RwLock::new(MemoryPersistenceState::default()),
        }
    }
}

impl Persistence for MemoryPersistence {
    fn open(&self) -> MqttResult<()> {
        self.state.write().unwrap().closed = false;
        Ok(())
    }

    fn put(&self, packet_id: u16, packet: &MqttPacket) -> MqttResult<()> {
        let mut state = self.state.write().unwrap();
        if state.closed {
            return Err(MqttError::new_persistence_failure("memory persistence store is closed"));
        }

        state.records.insert(packet_id, packet.clone());
        Ok(())
    }

    fn get(&self, packet_id: u16) -> Option<MqttPacket> {
        self.state.read().unwrap().records.get(&packet_id).cloned()
    }

    fn all(&self) -> Vec<(u16, MqttPacket)> {
        let state = self.state.read().unwrap();
        let mut records : Vec<(u16, MqttPacket)> = Vec::with_capacity(state.records.len());
        records.extend(state.records.iter().map(|(packet_id, packet)| (*packet_id, packet.clone())));
        records.sort_by_key(|(packet_id, _)| *packet_id);
        records
    }

    fn delete(&self, packet_id: u16) {
        self.state.write().unwrap().records.remove(&packet_id);
    }

    fn reset(&self) {
        self.state.write().unwrap().records.clear();
    }

    fn close(&self) {
        self.state.write().unwrap().closed = true;
    }
}
