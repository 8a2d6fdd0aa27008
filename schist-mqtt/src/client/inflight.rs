/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::error::{MqttError, MqttResult};
use crate::mqtt::utils::DEFAULT_RECEIVE_MAXIMUM;

use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting permits bounding QoS 1+ publishes that are unacknowledged in each direction.
///
/// The outbound gate follows the receive maximum the server advertised in CONNACK; the inbound
/// gate follows the receive maximum this client advertised in CONNECT.
pub(crate) struct InflightGates {
    outbound: Mutex<Arc<Semaphore>>,
    inbound: Mutex<Arc<Semaphore>>,
}

impl InflightGates {
    pub(crate) fn new() -> Self {
        InflightGates {
            outbound: Mutex::new(Arc::new(Semaphore::new(DEFAULT_RECEIVE_MAXIMUM as usize))),
            inbound: Mutex::new(Arc::new(Semaphore::new(DEFAULT_RECEIVE_MAXIMUM as usize))),
        }
    }

    /// Re-sizes both gates.  Permits handed out before the call stay bound to the old semaphores.
    pub(crate) fn configure(&self, outbound_limit: u16, inbound_limit: u16) {
        *self.outbound.lock().unwrap() = Arc::new(Semaphore::new(outbound_limit as usize));
        *self.inbound.lock().unwrap() = Arc::new(Semaphore::new(inbound_limit as usize));
    }

    /// Waits for an outbound permit.  Fails once the gates have been closed.
    pub(crate) async fn acquire_outbound(&self) -> MqttResult<OwnedSemaphorePermit> {
        let semaphore = self.outbound.lock().unwrap().clone();
        semaphore.acquire_owned().await.map_err(|_| MqttError::new_client_closed())
    }

    pub(crate) fn try_acquire_outbound(&self) -> Option<OwnedSemaphorePermit> {
        let semaphore = self.outbound.lock().unwrap().clone();
        semaphore.try_acquire_owned().ok()
    }

    /// Takes an inbound permit if one is free; `None` means the peer exceeded our receive maximum
    pub(crate) fn try_acquire_inbound(&self) -> Option<OwnedSemaphorePermit> {
        let semaphore = self.inbound.lock().unwrap().clone();
        semaphore.try_acquire_owned().ok()
    }

    /// Wakes every waiter with an error and refuses further acquisition
    pub(crate) fn close(&self) {
        self.outbound.lock().unwrap().close();
        self.inbound.lock().unwrap().close();
    }

    #[cfg(test)]
    pub(crate) fn available_outbound(&self) -> usize {
        self.outbound.lock().unwrap().available_permits()
    }

    #[cfg(test)]
    pub(crate) fn available_inbound(&self) -> usize {
        self.inbound.lock().unwrap().available_permits()
    }
}
