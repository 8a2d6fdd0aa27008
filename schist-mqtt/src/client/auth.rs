/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::error::MqttResult;
use crate::mqtt::AuthPacket;

/// Participates in MQTT5 enhanced authentication exchanges.
///
/// The client consults the handler whenever the server sends an AUTH packet with reason
/// `ContinueAuthentication`, both during the CONNECT handshake and during re-authentication.
pub trait AuthHandler : Send + Sync {

    /// Produces the AUTH packet to send in reply to a server challenge
    fn authenticate(&self, challenge: &AuthPacket) -> MqttResult<AuthPacket>;

    /// Invoked after a re-authentication exchange completes successfully
    fn authenticated(&self) {}
}
