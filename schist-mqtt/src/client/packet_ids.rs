/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::error::{MqttError, MqttResult};
use crate::mqtt::MqttPacket;

use log::*;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::{oneshot, OwnedSemaphorePermit};

pub(crate) type ResponseSender = oneshot::Sender<MqttResult<MqttPacket>>;

enum PacketIdEntry {

    // An operation task is awaiting the correlated response.  The sender is taken on first use.
    Waiting(Option<ResponseSender>),

    // An exchange restored from persistence; the read loop drives it to completion itself.
    Recovered(Option<OwnedSemaphorePermit>),
}

/// Outcome of handing an inbound acknowledgement to the table
#[derive(Debug, Eq, PartialEq)]
pub(crate) enum Resolution {

    /// The response was passed on to the waiting operation
    Delivered,

    /// The identifier belongs to a recovered exchange owned by the read loop
    Recovered,
}

struct PacketIdTableState {
    last_id: u16,
    entries: HashMap<u16, PacketIdEntry>,
    closed: bool,
}

/// Allocates 16-bit packet identifiers and correlates each one with the operation awaiting it
pub(crate) struct PacketIdTable {
    state: Mutex<PacketIdTableState>,
}

impl PacketIdTable {
    pub(crate) fn new() -> Self {
        PacketIdTable {
            state: Mutex::new(PacketIdTableState {
                last_id: 0,
                entries: HashMap::new(),
                closed: false,
            })
        }
    }

    /// Reserves an unused non-zero identifier and binds the sender to it.  Allocation proceeds
    /// forward from the most recently allocated identifier, wrapping from 65535 to 1.
    pub(crate) fn allocate(&self, sender: ResponseSender) -> MqttResult<u16> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(MqttError::new_client_closed());
        }

        if state.entries.len() >= u16::MAX as usize {
            warn!("PacketIdTable - all packet ids are in use");
            return Err(MqttError::new_packet_id_space_exhausted());
        }

        let mut candidate = state.last_id;
        loop {
            candidate = if candidate == u16::MAX { 1 } else { candidate + 1 };
            if !state.entries.contains_key(&candidate) {
                break;
            }
        }

        state.last_id = candidate;
        state.entries.insert(candidate, PacketIdEntry::Waiting(Some(sender)));

        Ok(candidate)
    }

    /// Binds a specific identifier to an exchange recovered from persistence
    pub(crate) fn reserve(&self, packet_id: u16, permit: Option<OwnedSemaphorePermit>) -> MqttResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(MqttError::new_client_closed());
        }

        if packet_id == 0 || state.entries.contains_key(&packet_id) {
            return Err(MqttError::new_internal_state_error(format!("packet id {} cannot be reserved", packet_id)));
        }

        state.entries.insert(packet_id, PacketIdEntry::Recovered(permit));
        Ok(())
    }

    /// Installs a fresh sender on an identifier whose previous response has already been delivered
    pub(crate) fn rearm(&self, packet_id: u16, sender: ResponseSender) -> MqttResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(MqttError::new_client_closed());
        }

        match state.entries.get_mut(&packet_id) {
            Some(PacketIdEntry::Waiting(slot)) => {
                *slot = Some(sender);
                Ok(())
            }
            _ => {
                Err(MqttError::new_internal_state_error(format!("packet id {} is not allocated to an operation", packet_id)))
            }
        }
    }

    /// Delivers an inbound acknowledgement to whoever owns its identifier
    pub(crate) fn resolve(&self, packet_id: u16, packet: MqttPacket) -> MqttResult<Resolution> {
        let sender = {
            let mut state = self.state.lock().unwrap();
            match state.entries.get_mut(&packet_id) {
                Some(PacketIdEntry::Waiting(slot)) => { slot.take() }
                Some(PacketIdEntry::Recovered(_)) => { return Ok(Resolution::Recovered); }
                None => { None }
            }
        };

        match sender {
            Some(sender) => {
                if sender.send(Ok(packet)).is_err() {
                    debug!("PacketIdTable - operation for packet id {} is no longer waiting", packet_id);
                }
                Ok(Resolution::Delivered)
            }
            None => {
                Err(MqttError::new_protocol_error(format!("unexpected packet id {}", packet_id)))
            }
        }
    }

    /// Releases an identifier; releasing an unknown identifier does nothing
    pub(crate) fn free(&self, packet_id: u16) {
        let mut state = self.state.lock().unwrap();
        state.entries.remove(&packet_id);
    }

    /// Completes every outstanding operation with an error and refuses further allocation
    pub(crate) fn fail_all<F>(&self, error_factory: F) where F : Fn() -> MqttError {
        let senders : Vec<ResponseSender> = {
            let mut state = self.state.lock().unwrap();
            state.closed = true;
            state.entries.drain().filter_map(|(_, entry)| {
                match entry {
                    PacketIdEntry::Waiting(slot) => { slot }
                    PacketIdEntry::Recovered(_) => { None }
                }
            }).collect()
        };

        for sender in senders {
            let _ = sender.send(Err(error_factory()));
        }
    }

    #[cfg(test)]
    pub(crate) fn outstanding(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }
}

/// Frees its packet identifier when dropped, whether the owning operation finished, failed or was cancelled
pub(crate) struct PacketIdGuard<'a> {
    table: &'a PacketIdTable,
    packet_id: u16,
}

impl<'a> PacketIdGuard<'a> {
    pub(crate) fn new(table: &'a PacketIdTable, packet_id: u16) -> Self {
        PacketIdGuard {
            table,
            packet_id,
        }
    }

    pub(crate) fn packet_id(&self) -> u16 {
        self.packet_id
    }
}

impl Drop for PacketIdGuard<'_> {
    fn drop(&mut self) {
        self.table.free(self.packet_id);
    }
}
