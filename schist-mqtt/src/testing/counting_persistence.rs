/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::client::persistence::{MemoryPersistence, Persistence};
use crate::error::MqttResult;
use crate::mqtt::MqttPacket;

use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory store that counts the writes and deletes it receives
#[derive(Default)]
pub(crate) struct CountingPersistence {
    store: MemoryPersistence,
    puts: AtomicUsize,
    deletes: AtomicUsize,
}

impl CountingPersistence {
    pub(crate) fn new() -> Self {
        CountingPersistence::default()
    }

    pub(crate) fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub(crate) fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

impl Persistence for CountingPersistence {
    fn open(&self) -> MqttResult<()> {
        self.store.open()
    }

    fn put(&self, packet_id: u16, packet: &MqttPacket) -> MqttResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.store.put(packet_id, packet)
    }

    fn get(&self, packet_id: u16) -> Option<MqttPacket> {
        self.store.get(packet_id)
    }

    fn all(&self) -> Vec<(u16, MqttPacket)> {
        self.store.all()
    }

    fn delete(&self, packet_id: u16) {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.store.delete(packet_id)
    }

    fn reset(&self) {
        self.store.reset()
    }

    fn close(&self) {
        self.store.close()
    }
}
