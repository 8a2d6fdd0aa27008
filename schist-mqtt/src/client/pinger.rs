/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::client::writer::PacketWriter;
use crate::error::{MqttError, MqttResult};
use crate::mqtt::{MqttPacket, PingreqPacket};

use log::*;
use std::cmp::{max, min};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::{sleep_until, timeout, Instant};

/// Resolves once the session's stop signal has been raised (or its sender is gone)
pub(crate) async fn wait_for_stop(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

/// How long to wait for a PINGRESP: the configured ping timeout, but never more than half the
/// keep alive and never less than a second
pub(crate) fn compute_pingresp_timeout(keep_alive: Duration, ping_timeout: Duration) -> Duration {
    max(min(ping_timeout, keep_alive / 2), Duration::from_secs(1))
}

/// Pairs each PINGREQ with the PINGRESP that answers it.  A PINGRESP that arrives while no
/// PINGREQ is outstanding is dropped rather than credited to the next one.
pub(crate) struct PingTracker {
    outstanding: AtomicBool,
    pingresp: Notify,
}

impl PingTracker {
    pub(crate) fn new() -> Self {
        PingTracker {
            outstanding: AtomicBool::new(false),
            pingresp: Notify::new(),
        }
    }

    fn begin(&self) {
        self.outstanding.store(true, Ordering::SeqCst);
    }

    /// Records an inbound PINGRESP.  Returns false if no PINGREQ was waiting on it.
    pub(crate) fn on_pingresp(&self) -> bool {
        if self.outstanding.swap(false, Ordering::SeqCst) {
            self.pingresp.notify_one();
            true
        } else {
            false
        }
    }

    async fn answered(&self) {
        self.pingresp.notified().await
    }
}

/// Keeps the connection alive by sending PINGREQ whenever nothing has been written for a full
/// keep alive interval.
///
/// Returns `Ok` when stopped and `ConnectionClosed` when the peer fails to answer a PINGREQ in time.
pub(crate) async fn run_pinger(writer: &PacketWriter, tracker: &PingTracker, keep_alive: Duration, ping_timeout: Duration, mut stop: watch::Receiver<bool>) -> MqttResult<()> {
    let pingresp_timeout = compute_pingresp_timeout(keep_alive, ping_timeout);
    debug!("Pinger - starting with keep alive {:?} and ping timeout {:?}", keep_alive, pingresp_timeout);

    loop {
        let deadline = writer.last_write() + keep_alive;
        tokio::select! {
            _ = wait_for_stop(&mut stop) => { return Ok(()); }
            _ = sleep_until(deadline) => {}
        }

        if writer.last_write() + keep_alive > Instant::now() {
            continue;
        }

        tracker.begin();
        writer.write(&MqttPacket::Pingreq(PingreqPacket {})).await?;

        tokio::select! {
            _ = wait_for_stop(&mut stop) => { return Ok(()); }
            result = timeout(pingresp_timeout, tracker.answered()) => {
                if result.is_err() {
                    error!("Pinger - no PINGRESP received within {:?}", pingresp_timeout);
                    return Err(MqttError::new_connection_closed("ping timeout"));
                }
            }
        }
    }
}
