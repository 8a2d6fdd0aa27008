/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::encode::encode_packet;
use crate::error::{MqttError, MqttResult};
use crate::logging::log_packet;
use crate::mqtt::MqttPacket;

use log::*;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

pub(crate) type PacketSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Serializes whole packets onto the write half of the connection
pub(crate) struct PacketWriter {
    sink: tokio::sync::Mutex<Option<PacketSink>>,
    last_write: std::sync::Mutex<Instant>,

    // zero means unbounded
    maximum_packet_size: AtomicU32,
}

impl PacketWriter {
    pub(crate) fn new(sink: PacketSink) -> Self {
        PacketWriter {
            sink: tokio::sync::Mutex::new(Some(sink)),
            last_write: std::sync::Mutex::new(Instant::now()),
            maximum_packet_size: AtomicU32::new(0),
        }
    }

    pub(crate) fn set_maximum_packet_size(&self, maximum_packet_size: u32) {
        self.maximum_packet_size.store(maximum_packet_size, Ordering::Relaxed);
    }

    pub(crate) fn maximum_packet_size(&self) -> u32 {
        self.maximum_packet_size.load(Ordering::Relaxed)
    }

    /// Time of the most recent successful write
    pub(crate) fn last_write(&self) -> Instant {
        *self.last_write.lock().unwrap()
    }

    /// Encodes and writes a packet.  Io failures (and writes after close) are reported as
    /// `ConnectionClosed`; a packet larger than the peer accepts fails validation without touching
    /// the connection.
    pub(crate) async fn write(&self, packet: &MqttPacket) -> MqttResult<()> {
        let encoded = encode_packet(packet)?;

        let maximum_packet_size = self.maximum_packet_size();
        if maximum_packet_size > 0 && encoded.len() > maximum_packet_size as usize {
            error!("PacketWriter - {} packet size ({}) exceeds server maximum ({})", packet.packet_type(), encoded.len(), maximum_packet_size);
            return Err(MqttError::new_packet_validation(packet.packet_type(), "packet exceeds server maximum packet size"));
        }

        let mut sink_guard = self.sink.lock().await;
        let sink = sink_guard.as_mut().ok_or_else(|| MqttError::new_connection_closed("connection has been shut down"))?;

        sink.write_all(&encoded).await.map_err(MqttError::new_connection_closed)?;
        sink.flush().await.map_err(MqttError::new_connection_closed)?;

        *self.last_write.lock().unwrap() = Instant::now();
        log_packet("Sent packet: ", packet);

        Ok(())
    }

    /// Shuts down the write half.  Later writes fail with `ConnectionClosed`.
    pub(crate) async fn close(&self) {
        let sink = self.sink.lock().await.take();
        if let Some(mut sink) = sink {
            if let Err(error) = sink.shutdown().await {
                debug!("PacketWriter - shutdown of write half failed: {}", error);
            }
        }
    }
}
