/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Module containing the MQTT5 session engine.

A [`Client`] wraps an already-established byte stream.  [`Client::connect`] performs the
CONNECT/CONNACK handshake and starts two background tasks: a read loop that correlates inbound
packets with the operations waiting on them, and a keep alive pinger.  Every other operation runs on
the caller's task and suspends only while waiting for flow control or for its response.
 */

pub mod auth;
pub mod config;
pub(crate) mod inflight;
pub(crate) mod packet_ids;
pub mod persistence;
pub(crate) mod pinger;
pub mod router;
pub(crate) mod writer;

use crate::client::config::*;
use crate::client::inflight::InflightGates;
use crate::client::packet_ids::{PacketIdGuard, PacketIdTable, Resolution};
use crate::client::pinger::{run_pinger, wait_for_stop, PingTracker};
use crate::client::writer::PacketWriter;
use crate::decode::read_packet;
use crate::encode::compute_publish_packet_length;
use crate::error::{MqttError, MqttResult};
use crate::logging::log_packet;
use crate::mqtt::*;
use crate::mqtt::utils::{is_shared_topic_filter, is_valid_topic, is_valid_topic_filter, is_wildcard_topic_filter};

use log::*;
use std::collections::HashMap;
use std::error::Error;
use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{oneshot, watch, OwnedSemaphorePermit};
use tokio::time::{timeout, timeout_at, Instant};

type PacketSource = Box<dyn AsyncRead + Send + Unpin>;

/// Result of a successful QoS 2 publish: the PUBREC when the server refused the message, otherwise
/// the PUBCOMP that completed the exchange
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Qos2Response {

    /// The server answered the PUBLISH with an error-classed PUBREC; no PUBREL was sent
    Pubrec(PubrecPacket),

    /// The exchange completed with a PUBCOMP
    Pubcomp(PubcompPacket),
}

/// Result of a successful publish operation
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PublishResponse {

    /// QoS 0 publishes complete as soon as they are written
    Qos0,

    /// The server's acknowledgement of a QoS 1 publish
    Qos1(PubackPacket),

    /// The server's final answer to a QoS 2 publish
    Qos2(Qos2Response),
}

/// Result of a successful authenticate operation
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuthResponse {

    /// True if the exchange ended with reason code `Success`
    pub success: bool,

    /// The final AUTH packet received from the server
    pub packet: AuthPacket,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SessionState {
    Created,
    Connecting,
    Connected,
    Stopped,
}

// Why a session ended.  Converted into the error handed to each waiter and the connection lost callback.
enum SessionEnd {
    UserDisconnect,
    ConnectFailed,
    ServerDisconnect(DisconnectPacket),
    ConnectionClosed(String),
    DecodeFailure(String),
    ProtocolViolation(String),
}

fn describe_error(error: &MqttError) -> String {
    match error.source() {
        Some(source) => source.to_string(),
        None => error.to_string(),
    }
}

impl SessionEnd {
    fn from_error(error: &MqttError) -> Self {
        let detail = describe_error(error);
        match error {
            MqttError::DecodingFailure(_) => { SessionEnd::DecodeFailure(detail) }
            MqttError::ProtocolError(_) => { SessionEnd::ProtocolViolation(detail) }
            _ => { SessionEnd::ConnectionClosed(detail) }
        }
    }

    fn to_error(&self) -> MqttError {
        match self {
            SessionEnd::UserDisconnect => { MqttError::new_user_initiated_disconnect() }
            SessionEnd::ConnectFailed => { MqttError::new_client_closed() }
            SessionEnd::ServerDisconnect(disconnect) => { MqttError::new_server_disconnect(disconnect.clone()) }
            SessionEnd::ConnectionClosed(detail) => { MqttError::new_connection_closed(detail.clone()) }
            SessionEnd::DecodeFailure(detail) => { MqttError::new_decoding_failure(detail.clone()) }
            SessionEnd::ProtocolViolation(detail) => { MqttError::new_protocol_error(detail.clone()) }
        }
    }

    fn notifies_connection_lost(&self) -> bool {
        !matches!(self, SessionEnd::UserDisconnect | SessionEnd::ConnectFailed)
    }
}

// An inbound QoS 2 publish that has been PUBREC'd and is waiting for its PUBREL
struct InboundExchange {
    publish: PublishPacket,
    _permit: OwnedSemaphorePermit,
}

async fn wait_until<T, F>(deadline: Option<Instant>, future: F) -> MqttResult<T> where F : Future<Output = MqttResult<T>> {
    match deadline {
        Some(deadline) => {
            match timeout_at(deadline, future).await {
                Ok(result) => { result }
                Err(_) => { Err(MqttError::new_operation_cancelled()) }
            }
        }
        None => { future.await }
    }
}

fn unexpected_response(expected: PacketType, received: &MqttPacket) -> MqttError {
    error!("Client - expected {} but received {}", expected, received.packet_type());
    MqttError::new_protocol_error(format!("expected {} but received {}", expected, received.packet_type()))
}

struct ClientShared {
    options: ClientOptions,
    state: Mutex<SessionState>,
    source: Mutex<Option<PacketSource>>,
    writer: PacketWriter,
    packet_ids: PacketIdTable,
    gates: InflightGates,
    stop: watch::Sender<bool>,
    ping_tracker: PingTracker,
    auth_waiter: Mutex<Option<oneshot::Sender<MqttResult<AuthPacket>>>>,
    server_capabilities: RwLock<Capabilities>,
    client_capabilities: RwLock<Capabilities>,
}

impl ClientShared {

    fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    fn check_connected(&self) -> MqttResult<()> {
        match self.state() {
            SessionState::Connected => { Ok(()) }
            SessionState::Stopped => { Err(MqttError::new_client_closed()) }
            state => { Err(MqttError::new_invalid_client_state(format!("operation requires a connected client; client is {:?}", state))) }
        }
    }

    fn deadline(&self, options: &Option<OperationOptions>) -> Option<Instant> {
        options.as_ref()
            .and_then(|options| options.timeout)
            .or(self.options.default_operation_timeout)
            .map(|duration| Instant::now() + duration)
    }

    // Raises the stop signal.  Only the first caller gets `true` and must finish the shutdown.
    fn begin_shutdown(&self) -> bool {
        !self.stop.send_replace(true)
    }

    async fn finish_shutdown(&self, end: SessionEnd) {
        *self.state.lock().unwrap() = SessionState::Stopped;

        match &end {
            SessionEnd::UserDisconnect => { info!("Client - session ended by user disconnect"); }
            SessionEnd::ConnectFailed => { info!("Client - connection attempt failed"); }
            SessionEnd::ServerDisconnect(disconnect) => { info!("Client - server ended the session: {}", disconnect); }
            SessionEnd::ConnectionClosed(detail) => { warn!("Client - connection lost: {}", detail); }
            SessionEnd::DecodeFailure(detail) => { error!("Client - session ended on malformed inbound data: {}", detail); }
            SessionEnd::ProtocolViolation(detail) => { error!("Client - session ended on protocol violation: {}", detail); }
        }

        self.packet_ids.fail_all(|| end.to_error());

        let auth_waiter = self.auth_waiter.lock().unwrap().take();
        if let Some(auth_waiter) = auth_waiter {
            let _ = auth_waiter.send(Err(end.to_error()));
        }

        self.gates.close();
        self.writer.close().await;
        self.options.persistence.close();

        if end.notifies_connection_lost() {
            if let Some(callback) = &self.options.connection_lost_callback {
                (callback)(end.to_error());
            }
        }
    }

    async fn terminate(&self, end: SessionEnd) {
        if self.begin_shutdown() {
            self.finish_shutdown(end).await;
        }
    }

    async fn write_packet(&self, packet: &MqttPacket) -> MqttResult<()> {
        let result = self.writer.write(packet).await;
        if let Err(error @ MqttError::ConnectionClosed(_)) = &result {
            self.terminate(SessionEnd::ConnectionClosed(describe_error(error))).await;
        }

        result
    }

    // Writes from the read loop; any failure ends the session
    async fn send(&self, packet: &MqttPacket) -> Result<(), SessionEnd> {
        self.writer.write(packet).await.map_err(|error| SessionEnd::from_error(&error))
    }

    fn answer_auth_challenge(&self, challenge: &AuthPacket) -> MqttResult<AuthPacket> {
        match &self.options.auth_handler {
            Some(handler) => { handler.authenticate(challenge) }
            None => {
                error!("Client - server requested continued authentication but no auth handler is configured");
                Err(MqttError::new_protocol_error("authentication challenge received without an auth handler"))
            }
        }
    }

    async fn await_connack(&self, source: &mut PacketSource, maximum_packet_size: u32) -> MqttResult<ConnackPacket> {
        loop {
            let packet = read_packet(source, maximum_packet_size).await?;
            log_packet("Received packet: ", &packet);

            match packet {
                MqttPacket::Connack(connack) => { return Ok(connack); }
                MqttPacket::Auth(auth) if auth.reason_code == AuthenticateReasonCode::ContinueAuthentication => {
                    let reply = self.answer_auth_challenge(&auth)?;
                    self.writer.write(&MqttPacket::Auth(reply)).await?;
                }
                packet => {
                    error!("Client - received {} while waiting for CONNACK", packet.packet_type());
                    return Err(MqttError::new_protocol_error(format!("{} received before CONNACK", packet.packet_type())));
                }
            }
        }
    }

    // A disconnect may have raised the stop signal without yet marking the client stopped
    fn mark_connected(&self) -> MqttResult<()> {
        let mut state = self.state.lock().unwrap();
        if *state != SessionState::Connecting || *self.stop.borrow() {
            return Err(MqttError::new_client_closed());
        }

        *state = SessionState::Connected;
        Ok(())
    }

    async fn establish(self: &Arc<Self>, connect: ConnectPacket) -> MqttResult<ConnackPacket> {
        let mut source = self.source.lock().unwrap().take()
            .ok_or_else(|| MqttError::new_internal_state_error("connection read half has already been taken"))?;

        self.options.persistence.open()?;

        let client_capabilities = Capabilities::from_connect(&connect);
        let inbound_maximum_packet_size = client_capabilities.maximum_packet_size.unwrap_or(0);

        self.writer.write(&MqttPacket::Connect(connect.clone())).await?;

        let mut stop = self.stop.subscribe();
        let connack = tokio::select! {
            _ = wait_for_stop(&mut stop) => { return Err(MqttError::new_client_closed()); }
            result = timeout(self.options.connack_timeout, self.await_connack(&mut source, inbound_maximum_packet_size)) => {
                match result {
                    Ok(connack) => { connack? }
                    Err(_) => {
                        error!("Client - no CONNACK received within {:?}", self.options.connack_timeout);
                        return Err(MqttError::new_operation_cancelled());
                    }
                }
            }
        };

        if connack.reason_code.is_error() {
            error!("Client - connection rejected: {}", connack.reason_code);
            return Err(MqttError::new_connection_rejected(connack));
        }

        let server_capabilities = {
            let mut capabilities = self.server_capabilities.write().unwrap();
            capabilities.keep_alive_seconds = Some(connect.keep_alive_interval_seconds);
            capabilities.merge_connack(&connack);
            capabilities.clone()
        };

        self.gates.configure(server_capabilities.effective_receive_maximum(), client_capabilities.effective_receive_maximum());
        self.writer.set_maximum_packet_size(server_capabilities.maximum_packet_size.unwrap_or(0));
        *self.client_capabilities.write().unwrap() = client_capabilities;

        let replays = self.recover_session(connack.session_present)?;

        self.mark_connected()?;

        info!("Client - session established (session present: {})", connack.session_present);

        tokio::spawn(run_read_loop(self.clone(), source, inbound_maximum_packet_size));

        let keep_alive_seconds = server_capabilities.keep_alive_seconds.unwrap_or(0);
        if keep_alive_seconds > 0 {
            let shared = self.clone();
            let stop = self.stop.subscribe();
            tokio::spawn(async move {
                let keep_alive = Duration::from_secs(keep_alive_seconds as u64);
                if let Err(error) = run_pinger(&shared.writer, &shared.ping_tracker, keep_alive, shared.options.ping_timeout, stop).await {
                    shared.terminate(SessionEnd::from_error(&error)).await;
                }
            });
        }

        for replay in &replays {
            self.write_packet(replay).await?;
        }

        Ok(connack)
    }

    // Re-registers every persisted exchange and returns the packets to re-send
    fn recover_session(&self, session_present: bool) -> MqttResult<Vec<MqttPacket>> {
        let persistence = &self.options.persistence;
        if !session_present {
            persistence.reset();
            return Ok(Vec::new());
        }

        let records = persistence.all();
        if !records.is_empty() {
            info!("Client - recovering {} in-flight exchange(s)", records.len());
        }

        let mut replays = Vec::with_capacity(records.len());
        for (packet_id, packet) in records {
            let replay = match packet {
                MqttPacket::Publish(mut publish) => {
                    publish.packet_id = packet_id;
                    publish.duplicate = true;
                    MqttPacket::Publish(publish)
                }
                MqttPacket::Pubrel(pubrel) => { MqttPacket::Pubrel(pubrel) }
                packet => {
                    warn!("Client - discarding persisted {} for packet id {}", packet.packet_type(), packet_id);
                    persistence.delete(packet_id);
                    continue;
                }
            };

            self.packet_ids.reserve(packet_id, self.gates.try_acquire_outbound())?;
            replays.push(replay);
        }

        Ok(replays)
    }

    async fn exchange<F>(&self, build: F, deadline: Option<Instant>) -> MqttResult<MqttPacket> where F : FnOnce(u16) -> MqttPacket {
        let (sender, receiver) = oneshot::channel();
        let packet_id = self.packet_ids.allocate(sender)?;
        let _guard = PacketIdGuard::new(&self.packet_ids, packet_id);

        self.write_packet(&build(packet_id)).await?;

        wait_until(deadline, async { receiver.await? }).await
    }

    fn validate_publish(&self, publish: &PublishPacket) -> MqttResult<()> {
        if !is_valid_topic(&publish.topic) {
            error!("Client - invalid publish topic \"{}\"", publish.topic);
            return Err(MqttError::new_packet_validation(PacketType::Publish, "topic is empty, too long or contains wildcards"));
        }

        let capabilities = self.server_capabilities.read().unwrap();
        if publish.qos > capabilities.effective_maximum_qos() {
            error!("Client - publish qos {} exceeds server maximum {}", publish.qos, capabilities.effective_maximum_qos());
            return Err(MqttError::new_packet_validation(PacketType::Publish, "qos exceeds the server's maximum qos"));
        }

        if publish.retain && !Capabilities::is_available(capabilities.retain_available) {
            error!("Client - retained publish sent to a server that does not support retain");
            return Err(MqttError::new_packet_validation(PacketType::Publish, "server does not support retained messages"));
        }

        if let Some(maximum_packet_size) = capabilities.maximum_packet_size {
            let length = compute_publish_packet_length(publish)?;
            if length > maximum_packet_size as usize {
                error!("Client - publish size ({}) exceeds server maximum ({})", length, maximum_packet_size);
                return Err(MqttError::new_packet_validation(PacketType::Publish, "packet exceeds the server's maximum packet size"));
            }
        }

        Ok(())
    }

    fn validate_subscribe(&self, subscribe: &SubscribePacket) -> MqttResult<()> {
        if subscribe.subscriptions.is_empty() {
            return Err(MqttError::new_packet_validation(PacketType::Subscribe, "subscribe contains no subscriptions"));
        }

        let capabilities = self.server_capabilities.read().unwrap();
        if subscribe.subscription_identifier.is_some() && !Capabilities::is_available(capabilities.subscription_identifiers_available) {
            return Err(MqttError::new_packet_validation(PacketType::Subscribe, "server does not support subscription identifiers"));
        }

        for subscription in &subscribe.subscriptions {
            let topic_filter = subscription.topic_filter.as_str();
            if !is_valid_topic_filter(topic_filter) {
                error!("Client - invalid topic filter \"{}\"", topic_filter);
                return Err(MqttError::new_packet_validation(PacketType::Subscribe, format!("invalid topic filter \"{}\"", topic_filter)));
            }

            if is_wildcard_topic_filter(topic_filter) && !Capabilities::is_available(capabilities.wildcard_subscriptions_available) {
                return Err(MqttError::new_packet_validation(PacketType::Subscribe, "server does not support wildcard subscriptions"));
            }

            if is_shared_topic_filter(topic_filter) && !Capabilities::is_available(capabilities.shared_subscriptions_available) {
                return Err(MqttError::new_packet_validation(PacketType::Subscribe, "server does not support shared subscriptions"));
            }
        }

        Ok(())
    }

    async fn publish_qos1(&self, mut publish: PublishPacket, deadline: Option<Instant>) -> MqttResult<PublishResponse> {
        let _permit = wait_until(deadline, self.gates.acquire_outbound()).await?;

        let (sender, receiver) = oneshot::channel();
        let packet_id = self.packet_ids.allocate(sender)?;
        let _guard = PacketIdGuard::new(&self.packet_ids, packet_id);

        publish.packet_id = packet_id;
        publish.duplicate = false;
        let packet = MqttPacket::Publish(publish);

        self.options.persistence.put(packet_id, &packet)?;
        self.write_packet(&packet).await?;

        let response = wait_until(deadline, async { receiver.await? }).await?;
        self.options.persistence.delete(packet_id);

        match response {
            MqttPacket::Puback(puback) => { Ok(PublishResponse::Qos1(puback)) }
            response => { Err(unexpected_response(PacketType::Puback, &response)) }
        }
    }

    async fn publish_qos2(&self, mut publish: PublishPacket, deadline: Option<Instant>) -> MqttResult<PublishResponse> {
        let _permit = wait_until(deadline, self.gates.acquire_outbound()).await?;

        let (sender, receiver) = oneshot::channel();
        let packet_id = self.packet_ids.allocate(sender)?;
        let guard = PacketIdGuard::new(&self.packet_ids, packet_id);

        publish.packet_id = packet_id;
        publish.duplicate = false;
        let packet = MqttPacket::Publish(publish);

        self.options.persistence.put(packet_id, &packet)?;
        self.write_packet(&packet).await?;

        let pubrec = match wait_until(deadline, async { receiver.await? }).await? {
            MqttPacket::Pubrec(pubrec) => { pubrec }
            response => { return Err(unexpected_response(PacketType::Pubrec, &response)); }
        };

        if !pubrec.reason_code.is_success() {
            self.options.persistence.delete(packet_id);
            return Ok(PublishResponse::Qos2(Qos2Response::Pubrec(pubrec)));
        }

        let pubrel = MqttPacket::Pubrel(PubrelPacket {
            packet_id: guard.packet_id(),
            ..Default::default()
        });

        self.options.persistence.put(packet_id, &pubrel)?;

        let (sender, receiver) = oneshot::channel();
        self.packet_ids.rearm(packet_id, sender)?;
        self.write_packet(&pubrel).await?;

        let response = wait_until(deadline, async { receiver.await? }).await?;
        self.options.persistence.delete(packet_id);

        match response {
            MqttPacket::Pubcomp(pubcomp) => { Ok(PublishResponse::Qos2(Qos2Response::Pubcomp(pubcomp))) }
            response => { Err(unexpected_response(PacketType::Pubcomp, &response)) }
        }
    }

    async fn handle_inbound(&self, packet: MqttPacket, inbound: &mut HashMap<u16, InboundExchange>) -> Result<(), SessionEnd> {
        match &packet {
            MqttPacket::Publish(publish) => { return self.handle_inbound_publish(publish, inbound).await; }
            MqttPacket::Pubrel(pubrel) => { return self.handle_inbound_pubrel(pubrel.packet_id, inbound).await; }
            MqttPacket::Auth(auth) => { return self.handle_inbound_auth(auth).await; }
            MqttPacket::Disconnect(disconnect) => { return Err(SessionEnd::ServerDisconnect(disconnect.clone())); }
            MqttPacket::Pingresp(_) => {
                if !self.ping_tracker.on_pingresp() {
                    warn!("Client - dropping PINGRESP with no outstanding PINGREQ");
                }
                return Ok(());
            }
            MqttPacket::Connack(_) => {
                error!("Client - received CONNACK on an established session; ignoring");
                return Ok(());
            }
            MqttPacket::Connect(_) | MqttPacket::Subscribe(_) | MqttPacket::Unsubscribe(_) | MqttPacket::Pingreq(_) => {
                return Err(SessionEnd::ProtocolViolation(format!("server sent a {}", packet.packet_type())));
            }
            _ => {}
        }

        let (packet_id, pubrec_failed) = match &packet {
            MqttPacket::Puback(puback) => { (puback.packet_id, false) }
            MqttPacket::Pubrec(pubrec) => { (pubrec.packet_id, !pubrec.reason_code.is_success()) }
            MqttPacket::Pubcomp(pubcomp) => { (pubcomp.packet_id, false) }
            MqttPacket::Suback(suback) => { (suback.packet_id, false) }
            MqttPacket::Unsuback(unsuback) => { (unsuback.packet_id, false) }
            _ => { return Ok(()); }
        };

        let packet_type = packet.packet_type();
        match self.packet_ids.resolve(packet_id, packet) {
            Ok(Resolution::Delivered) => { Ok(()) }
            Ok(Resolution::Recovered) => { self.complete_recovered(packet_type, packet_id, pubrec_failed).await }
            Err(error) => {
                warn!("Client - dropping {}: {}", packet_type, describe_error(&error));
                if packet_type == PacketType::Pubrec {
                    return self.send(&MqttPacket::Pubrel(PubrelPacket {
                        packet_id,
                        reason_code: PubrelReasonCode::PacketIdentifierNotFound,
                        ..Default::default()
                    })).await;
                }

                Ok(())
            }
        }
    }

    // Drives an exchange restored from persistence; there is no caller waiting on it
    async fn complete_recovered(&self, packet_type: PacketType, packet_id: u16, pubrec_failed: bool) -> Result<(), SessionEnd> {
        match packet_type {
            PacketType::Pubrec if !pubrec_failed => {
                let pubrel = MqttPacket::Pubrel(PubrelPacket {
                    packet_id,
                    ..Default::default()
                });

                if let Err(error) = self.options.persistence.put(packet_id, &pubrel) {
                    warn!("Client - failed to persist recovered PUBREL for packet id {}: {}", packet_id, describe_error(&error));
                }

                self.send(&pubrel).await
            }
            PacketType::Puback | PacketType::Pubrec | PacketType::Pubcomp => {
                debug!("Client - recovered exchange for packet id {} completed with {}", packet_id, packet_type);
                self.options.persistence.delete(packet_id);
                self.packet_ids.free(packet_id);
                Ok(())
            }
            _ => {
                warn!("Client - unexpected {} for recovered packet id {}", packet_type, packet_id);
                Ok(())
            }
        }
    }

    async fn acquire_inbound_permit(&self) -> Result<OwnedSemaphorePermit, SessionEnd> {
        match self.gates.try_acquire_inbound() {
            Some(permit) => { Ok(permit) }
            None => {
                error!("Client - server exceeded the receive maximum advertised in CONNECT");
                let disconnect = DisconnectPacket::builder()
                    .with_reason_code(DisconnectReasonCode::ReceiveMaximumExceeded)
                    .build();
                if let Err(error) = self.writer.write(&MqttPacket::Disconnect(disconnect)).await {
                    debug!("Client - failed to send DISCONNECT: {}", describe_error(&error));
                }

                Err(SessionEnd::ProtocolViolation("server exceeded the receive maximum".to_string()))
            }
        }
    }

    async fn handle_inbound_publish(&self, publish: &PublishPacket, inbound: &mut HashMap<u16, InboundExchange>) -> Result<(), SessionEnd> {
        match publish.qos {
            QualityOfService::AtMostOnce => {
                self.options.router.route(publish);
            }
            QualityOfService::AtLeastOnce => {
                let permit = self.acquire_inbound_permit().await?;
                self.send(&MqttPacket::Puback(PubackPacket {
                    packet_id: publish.packet_id,
                    ..Default::default()
                })).await?;
                drop(permit);

                self.options.router.route(publish);
            }
            QualityOfService::ExactlyOnce => {
                let pubrec = MqttPacket::Pubrec(PubrecPacket {
                    packet_id: publish.packet_id,
                    ..Default::default()
                });

                if inbound.contains_key(&publish.packet_id) {
                    debug!("Client - duplicate QoS 2 publish for packet id {}; acknowledging again", publish.packet_id);
                    return self.send(&pubrec).await;
                }

                let permit = self.acquire_inbound_permit().await?;
                inbound.insert(publish.packet_id, InboundExchange {
                    publish: publish.clone(),
                    _permit: permit,
                });

                self.send(&pubrec).await?;
            }
        }

        Ok(())
    }

    async fn handle_inbound_pubrel(&self, packet_id: u16, inbound: &mut HashMap<u16, InboundExchange>) -> Result<(), SessionEnd> {
        match inbound.remove(&packet_id) {
            Some(exchange) => {
                self.options.router.route(&exchange.publish);
                self.send(&MqttPacket::Pubcomp(PubcompPacket {
                    packet_id,
                    ..Default::default()
                })).await
            }
            None => {
                warn!("Client - PUBREL for unknown packet id {}", packet_id);
                self.send(&MqttPacket::Pubcomp(PubcompPacket {
                    packet_id,
                    reason_code: PubcompReasonCode::PacketIdentifierNotFound,
                    ..Default::default()
                })).await
            }
        }
    }

    async fn handle_inbound_auth(&self, auth: &AuthPacket) -> Result<(), SessionEnd> {
        if auth.reason_code == AuthenticateReasonCode::ContinueAuthentication && self.options.auth_handler.is_some() {
            match self.answer_auth_challenge(auth) {
                Ok(reply) => { return self.send(&MqttPacket::Auth(reply)).await; }
                Err(error) => {
                    error!("Client - auth handler failed: {}", describe_error(&error));
                    let auth_waiter = self.auth_waiter.lock().unwrap().take();
                    if let Some(auth_waiter) = auth_waiter {
                        let _ = auth_waiter.send(Err(error));
                    }
                    return Ok(());
                }
            }
        }

        let auth_waiter = self.auth_waiter.lock().unwrap().take();
        match auth_waiter {
            Some(auth_waiter) => {
                if auth_waiter.send(Ok(auth.clone())).is_err() {
                    debug!("Client - authenticate operation is no longer waiting");
                }
            }
            None => {
                if auth.reason_code == AuthenticateReasonCode::Success {
                    if let Some(handler) = &self.options.auth_handler {
                        handler.authenticated();
                    }
                } else {
                    warn!("Client - unsolicited AUTH with reason {}", auth.reason_code);
                }
            }
        }

        Ok(())
    }
}

async fn run_read_loop(shared: Arc<ClientShared>, mut source: PacketSource, maximum_packet_size: u32) {
    let mut stop = shared.stop.subscribe();
    let mut inbound : HashMap<u16, InboundExchange> = HashMap::new();

    loop {
        let result = tokio::select! {
            _ = wait_for_stop(&mut stop) => {
                debug!("Client - read loop stopping");
                return;
            }
            result = read_packet(&mut source, maximum_packet_size) => { result }
        };

        let outcome = match result {
            Ok(packet) => {
                log_packet("Received packet: ", &packet);
                shared.handle_inbound(packet, &mut inbound).await
            }
            Err(error) => { Err(SessionEnd::from_error(&error)) }
        };

        if let Err(end) = outcome {
            shared.terminate(end).await;
            return;
        }
    }
}

/// An MQTT5 client session over a single, already-established connection.
///
/// Handles are cheap to clone and may be used concurrently from any number of tasks.
#[derive(Clone)]
pub struct Client {
    shared: Arc<ClientShared>,
}

impl Client {

    /// Creates a new client over an established stream.  Nothing is written until
    /// [`connect`](Client::connect) is called.
    pub fn new<S>(stream: S, options: ClientOptions) -> Self where S : AsyncRead + AsyncWrite + Send + Unpin + 'static {
        let (reader, writer) = tokio::io::split(stream);
        let source : PacketSource = Box::new(reader);
        let (stop, _) = watch::channel(false);

        Client {
            shared: Arc::new(ClientShared {
                options,
                state: Mutex::new(SessionState::Created),
                source: Mutex::new(Some(source)),
                writer: PacketWriter::new(Box::new(writer)),
                packet_ids: PacketIdTable::new(),
                gates: InflightGates::new(),
                stop,
                ping_tracker: PingTracker::new(),
                auth_waiter: Mutex::new(None),
                server_capabilities: RwLock::new(Capabilities::default()),
                client_capabilities: RwLock::new(Capabilities::default()),
            })
        }
    }

    /// Performs the CONNECT/CONNACK handshake and starts the session.
    ///
    /// A CONNACK with an error-classed reason code fails with `ConnectionRejected` and stops the
    /// client.  A client may only be connected once.
    pub async fn connect(&self, connect: ConnectPacket) -> MqttResult<ConnackPacket> {
        {
            let mut state = self.shared.state.lock().unwrap();
            if *state != SessionState::Created {
                return Err(MqttError::new_invalid_client_state(format!("connect called on a client that is {:?}", *state)));
            }
            *state = SessionState::Connecting;
        }

        match self.shared.establish(connect).await {
            Ok(connack) => { Ok(connack) }
            Err(error) => {
                self.shared.terminate(SessionEnd::ConnectFailed).await;
                Err(error)
            }
        }
    }

    /// Subscribes to one or more topic filters.  Reason codes in the SUBACK are in request order;
    /// refusals are reported there rather than as errors.
    pub async fn subscribe(&self, subscribe: SubscribePacket, options: Option<OperationOptions>) -> MqttResult<SubackPacket> {
        self.shared.check_connected()?;
        self.shared.validate_subscribe(&subscribe)?;

        let deadline = self.shared.deadline(&options);
        let response = self.shared.exchange(move |packet_id| {
            let mut subscribe = subscribe;
            subscribe.packet_id = packet_id;
            MqttPacket::Subscribe(subscribe)
        }, deadline).await?;

        match response {
            MqttPacket::Suback(suback) => { Ok(suback) }
            response => { Err(unexpected_response(PacketType::Suback, &response)) }
        }
    }

    /// Removes one or more subscriptions
    pub async fn unsubscribe(&self, unsubscribe: UnsubscribePacket, options: Option<OperationOptions>) -> MqttResult<UnsubackPacket> {
        self.shared.check_connected()?;
        if unsubscribe.topic_filters.is_empty() {
            return Err(MqttError::new_packet_validation(PacketType::Unsubscribe, "unsubscribe contains no topic filters"));
        }

        let deadline = self.shared.deadline(&options);
        let response = self.shared.exchange(move |packet_id| {
            let mut unsubscribe = unsubscribe;
            unsubscribe.packet_id = packet_id;
            MqttPacket::Unsubscribe(unsubscribe)
        }, deadline).await?;

        match response {
            MqttPacket::Unsuback(unsuback) => { Ok(unsuback) }
            response => { Err(unexpected_response(PacketType::Unsuback, &response)) }
        }
    }

    /// Publishes a message.
    ///
    /// QoS 1 and QoS 2 publishes wait for a free slot under the server's receive maximum, are
    /// recorded in the persistence store until acknowledged, and complete with the server's
    /// acknowledgement.
    pub async fn publish(&self, publish: PublishPacket, options: Option<OperationOptions>) -> MqttResult<PublishResponse> {
        self.shared.check_connected()?;
        self.shared.validate_publish(&publish)?;

        let deadline = self.shared.deadline(&options);
        match publish.qos {
            QualityOfService::AtMostOnce => {
                let mut publish = publish;
                publish.packet_id = 0;
                self.shared.write_packet(&MqttPacket::Publish(publish)).await?;
                Ok(PublishResponse::Qos0)
            }
            QualityOfService::AtLeastOnce => { self.shared.publish_qos1(publish, deadline).await }
            QualityOfService::ExactlyOnce => { self.shared.publish_qos2(publish, deadline).await }
        }
    }

    /// Starts a re-authentication exchange and waits for its outcome.  Intermediate
    /// `ContinueAuthentication` challenges are answered by the configured auth handler.
    pub async fn authenticate(&self, auth: AuthPacket, options: Option<OperationOptions>) -> MqttResult<AuthResponse> {
        let (sender, receiver) = oneshot::channel();
        {
            let mut auth_waiter = self.shared.auth_waiter.lock().unwrap();
            self.shared.check_connected()?;

            if auth_waiter.as_ref().is_some_and(|waiter| !waiter.is_closed()) {
                return Err(MqttError::new_invalid_client_state("an authentication exchange is already in progress"));
            }

            *auth_waiter = Some(sender);
        }

        let deadline = self.shared.deadline(&options);
        self.shared.write_packet(&MqttPacket::Auth(auth)).await?;

        let packet = wait_until(deadline, async { receiver.await? }).await?;
        let success = packet.reason_code == AuthenticateReasonCode::Success;
        if success {
            if let Some(handler) = &self.shared.options.auth_handler {
                handler.authenticated();
            }
        }

        Ok(AuthResponse {
            success,
            packet
        })
    }

    /// Sends DISCONNECT and ends the session.  Unfinished operations fail with
    /// `UserInitiatedDisconnect`.  Calling this on a session that has already ended does nothing.
    pub async fn disconnect(&self, disconnect: DisconnectPacket) -> MqttResult<()> {
        if !self.shared.begin_shutdown() {
            return Ok(());
        }

        if self.shared.state() == SessionState::Connected {
            if let Err(error) = self.shared.writer.write(&MqttPacket::Disconnect(disconnect)).await {
                warn!("Client - failed to send DISCONNECT: {}", describe_error(&error));
            }
        }

        self.shared.finish_shutdown(SessionEnd::UserDisconnect).await;
        Ok(())
    }

    /// Returns true while the session is established
    pub fn is_connected(&self) -> bool {
        self.shared.state() == SessionState::Connected
    }

    /// Capabilities negotiated with the server
    pub fn server_capabilities(&self) -> Capabilities {
        self.shared.server_capabilities.read().unwrap().clone()
    }

    /// Capabilities this client advertised in its CONNECT
    pub fn client_capabilities(&self) -> Capabilities {
        self.shared.client_capabilities.read().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::persistence::{MemoryPersistence, Persistence};
    use crate::client::router::{HandlerResult, PublishHandler};
    use crate::testing::counting_persistence::CountingPersistence;
    use crate::testing::mock_broker::*;
    use assert_matches::assert_matches;
    use std::collections::VecDeque;
    use uuid::Uuid;

    fn default_connect() -> ConnectPacket {
        ConnectPacket::builder()
            .with_client_id(&Uuid::new_v4().to_string())
            .build()
    }

    async fn connected_client(handlers: PacketHandlerSet, options: ClientOptions) -> (Client, MockBroker) {
        let (broker, stream) = MockBroker::new(handlers);
        let client = Client::new(stream, options);
        client.connect(default_connect()).await.unwrap();
        (client, broker)
    }

    fn recording_publish_handler(received: &Arc<Mutex<Vec<PublishPacket>>>) -> PublishHandler {
        let received = received.clone();
        Arc::new(move |publish: &PublishPacket| -> HandlerResult {
            received.lock().unwrap().push(publish.clone());
            Ok(())
        })
    }

    fn recording_connection_lost_callback(errors: &Arc<Mutex<Vec<MqttError>>>) -> ConnectionLostCallback {
        let errors = errors.clone();
        Arc::new(move |error: MqttError| {
            errors.lock().unwrap().push(error);
        })
    }

    fn qos1_publish(topic: &str) -> PublishPacket {
        PublishPacket::builder(topic, QualityOfService::AtLeastOnce)
            .with_payload("hello".as_bytes())
            .build()
    }

    #[test]
    fn connect_reflects_connack_overrides() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Connect, handle_connect_with_connack(ConnackPacket {
                receive_maximum: Some(12345),
                maximum_packet_size: Some(128 * 1024),
                ..Default::default()
            }));

            let (broker, stream) = MockBroker::new(handlers);
            let client = Client::new(stream, ClientOptionsBuilder::new().build());

            let connect = ConnectPacket::builder()
                .with_client_id("override")
                .with_receive_maximum(50)
                .build();
            let connack = client.connect(connect).await.unwrap();

            assert!(connack.reason_code.is_success());
            assert!(client.is_connected());
            assert_eq!(Some(12345), client.server_capabilities().receive_maximum);
            assert_eq!(Some(128 * 1024), client.server_capabilities().maximum_packet_size);
            assert_eq!(Some(50), client.client_capabilities().receive_maximum);
            assert_eq!(12345, client.shared.gates.available_outbound());
            assert_eq!(50, client.shared.gates.available_inbound());

            let received = broker.received();
            assert_matches!(&received[0], MqttPacket::Connect(connect) if connect.client_id.as_deref() == Some("override"));
        });
    }

    #[test]
    fn connect_twice_fails() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let (client, broker) = connected_client(create_default_packet_handlers(), ClientOptionsBuilder::new().build()).await;

            assert_matches!(client.connect(default_connect()).await, Err(MqttError::InvalidClientState(_)));
            assert!(client.is_connected());
            assert_eq!(1, broker.connect_count());
        });
    }

    #[test]
    fn connect_rejected_stops_client() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Connect, handle_connect_with_connack(ConnackPacket {
                reason_code: ConnectReasonCode::NotAuthorized,
                ..Default::default()
            }));

            let errors = Arc::new(Mutex::new(Vec::new()));
            let options = ClientOptionsBuilder::new()
                .with_connection_lost_callback(recording_connection_lost_callback(&errors))
                .build();

            let (_broker, stream) = MockBroker::new(handlers);
            let client = Client::new(stream, options);

            let result = client.connect(default_connect()).await;
            assert_matches!(result, Err(MqttError::ConnectionRejected(context)) if context.connack.reason_code == ConnectReasonCode::NotAuthorized);
            assert!(!client.is_connected());

            let subscribe = SubscribePacket::builder().with_simple_subscription("a/b", QualityOfService::AtMostOnce).build();
            assert_matches!(client.subscribe(subscribe, None).await, Err(MqttError::ClientClosed(_)));
            assert!(errors.lock().unwrap().is_empty());
        });
    }

    #[test]
    fn connack_timeout_cancels_connect() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Connect, Box::new(handle_with_nothing));

            let (_broker, stream) = MockBroker::new(handlers);
            let options = ClientOptionsBuilder::new()
                .with_connack_timeout(Duration::from_millis(50))
                .build();
            let client = Client::new(stream, options);

            assert_matches!(client.connect(default_connect()).await, Err(MqttError::OperationCancelled(_)));
            assert!(!client.is_connected());
        });
    }

    #[test]
    fn operations_before_connect_fail() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let (_broker, stream) = MockBroker::new(create_default_packet_handlers());
            let client = Client::new(stream, ClientOptionsBuilder::new().build());

            assert_matches!(client.publish(qos1_publish("a/b"), None).await, Err(MqttError::InvalidClientState(_)));
        });
    }

    #[test]
    fn subscribe_preserves_reason_code_order() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let (client, broker) = connected_client(create_default_packet_handlers(), ClientOptionsBuilder::new().build()).await;

            let subscribe = SubscribePacket::builder()
                .with_simple_subscription("a/qos1", QualityOfService::AtLeastOnce)
                .with_simple_subscription("a/qos2", QualityOfService::ExactlyOnce)
                .with_simple_subscription("a/qos0", QualityOfService::AtMostOnce)
                .build();

            let suback = client.subscribe(subscribe, None).await.unwrap();
            assert_eq!(vec!(SubackReasonCode::GrantedQos1, SubackReasonCode::GrantedQos2, SubackReasonCode::GrantedQos0), suback.reason_codes);
            assert_ne!(0, suback.packet_id);
            assert_eq!(0, client.shared.packet_ids.outstanding());

            let received = broker.wait_for_packets(PacketType::Subscribe, 1).await;
            assert_matches!(&received[0], MqttPacket::Subscribe(subscribe) if subscribe.packet_id == suback.packet_id);
        });
    }

    #[test]
    fn unsubscribe_returns_unsuback() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let (client, _broker) = connected_client(create_default_packet_handlers(), ClientOptionsBuilder::new().build()).await;

            let unsubscribe = UnsubscribePacket::builder()
                .with_topic_filter("a/b")
                .with_topic_filter("c/#")
                .build();

            let unsuback = client.unsubscribe(unsubscribe, None).await.unwrap();
            assert_eq!(vec!(UnsubackReasonCode::Success, UnsubackReasonCode::Success), unsuback.reason_codes);

            assert_matches!(client.unsubscribe(UnsubscribePacket::builder().build(), None).await, Err(MqttError::PacketValidation(_)));
        });
    }

    #[test]
    fn subscribe_respects_server_capabilities() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Connect, handle_connect_with_connack(ConnackPacket {
                wildcard_subscriptions_available: Some(false),
                shared_subscriptions_available: Some(false),
                ..Default::default()
            }));

            let (client, broker) = connected_client(handlers, ClientOptionsBuilder::new().build()).await;

            let wildcard = SubscribePacket::builder().with_simple_subscription("a/+", QualityOfService::AtMostOnce).build();
            assert_matches!(client.subscribe(wildcard, None).await, Err(MqttError::PacketValidation(context)) if context.packet_type == PacketType::Subscribe);

            let shared = SubscribePacket::builder().with_simple_subscription("$share/group/a/b", QualityOfService::AtMostOnce).build();
            assert_matches!(client.subscribe(shared, None).await, Err(MqttError::PacketValidation(_)));

            let malformed = SubscribePacket::builder().with_simple_subscription("a/#/b", QualityOfService::AtMostOnce).build();
            assert_matches!(client.subscribe(malformed, None).await, Err(MqttError::PacketValidation(_)));

            assert!(broker.received().iter().all(|packet| packet.packet_type() != PacketType::Subscribe));
        });
    }

    #[test]
    fn publish_qos0_uses_no_resources() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let persistence = Arc::new(CountingPersistence::new());
            let options = ClientOptionsBuilder::new().with_persistence(persistence.clone()).build();
            let (client, broker) = connected_client(create_default_packet_handlers(), options).await;

            let publish = PublishPacket::builder("qos0/topic", QualityOfService::AtMostOnce).build();
            assert_eq!(PublishResponse::Qos0, client.publish(publish, None).await.unwrap());

            let received = broker.wait_for_packets(PacketType::Publish, 1).await;
            assert_matches!(&received[0], MqttPacket::Publish(publish) if publish.packet_id == 0);
            assert_eq!(0, persistence.put_count());
            assert_eq!(0, client.shared.packet_ids.outstanding());
            assert_eq!(65535, client.shared.gates.available_outbound());
        });
    }

    #[test]
    fn publish_qos1_puts_and_deletes_once() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let persistence = Arc::new(CountingPersistence::new());
            let options = ClientOptionsBuilder::new().with_persistence(persistence.clone()).build();
            let (client, broker) = connected_client(create_default_packet_handlers(), options).await;

            let response = client.publish(qos1_publish("qos1/topic"), None).await.unwrap();
            assert_matches!(response, PublishResponse::Qos1(puback) if puback.reason_code == PubackReasonCode::Success);

            assert_eq!(1, persistence.put_count());
            assert_eq!(1, persistence.delete_count());
            assert!(persistence.all().is_empty());
            assert_eq!(0, client.shared.packet_ids.outstanding());
            assert_eq!(65535, client.shared.gates.available_outbound());

            let received = broker.wait_for_packets(PacketType::Publish, 1).await;
            assert_matches!(&received[0], MqttPacket::Publish(publish) if publish.packet_id != 0 && !publish.duplicate);
        });
    }

    #[test]
    fn publish_qos2_completes_exchange() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let persistence = Arc::new(CountingPersistence::new());
            let options = ClientOptionsBuilder::new().with_persistence(persistence.clone()).build();
            let (client, broker) = connected_client(create_default_packet_handlers(), options).await;

            let publish = PublishPacket::builder("qos2/topic", QualityOfService::ExactlyOnce)
                .with_payload("exactly once".as_bytes())
                .build();

            let response = client.publish(publish, None).await.unwrap();
            assert_matches!(response, PublishResponse::Qos2(Qos2Response::Pubcomp(pubcomp)) if pubcomp.reason_code == PubcompReasonCode::Success);

            assert_eq!(2, persistence.put_count());
            assert_eq!(1, persistence.delete_count());
            assert!(persistence.all().is_empty());
            assert_eq!(0, client.shared.packet_ids.outstanding());

            let received = broker.wait_for_packets(PacketType::Pubrel, 1).await;
            let publish_id = received.iter().find_map(|packet| match packet {
                MqttPacket::Publish(publish) => Some(publish.packet_id),
                _ => None,
            }).unwrap();
            assert!(received.iter().any(|packet| matches!(packet, MqttPacket::Pubrel(pubrel) if pubrel.packet_id == publish_id)));
        });
    }

    #[test]
    fn publish_qos2_failing_pubrec_ends_exchange() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Publish, Box::new(handle_publish_with_failure));

            let persistence = Arc::new(CountingPersistence::new());
            let options = ClientOptionsBuilder::new().with_persistence(persistence.clone()).build();
            let (client, broker) = connected_client(handlers, options).await;

            let publish = PublishPacket::builder("qos2/refused", QualityOfService::ExactlyOnce).build();
            let response = client.publish(publish, None).await.unwrap();
            assert_matches!(response, PublishResponse::Qos2(Qos2Response::Pubrec(pubrec)) if pubrec.reason_code == PubrecReasonCode::QuotaExceeded);

            assert_eq!(1, persistence.put_count());
            assert_eq!(1, persistence.delete_count());
            assert_eq!(65535, client.shared.gates.available_outbound());
            assert!(broker.received().iter().all(|packet| packet.packet_type() != PacketType::Pubrel));
        });
    }

    #[test]
    fn publish_validation_uses_server_capabilities() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Connect, handle_connect_with_connack(ConnackPacket {
                maximum_qos: Some(QualityOfService::AtLeastOnce),
                retain_available: Some(false),
                maximum_packet_size: Some(64),
                ..Default::default()
            }));

            let persistence = Arc::new(CountingPersistence::new());
            let options = ClientOptionsBuilder::new().with_persistence(persistence.clone()).build();
            let (client, broker) = connected_client(handlers, options).await;

            let qos2 = PublishPacket::builder("a/b", QualityOfService::ExactlyOnce).build();
            assert_matches!(client.publish(qos2, None).await, Err(MqttError::PacketValidation(_)));

            let retained = PublishPacket::builder("a/b", QualityOfService::AtMostOnce).with_retain(true).build();
            assert_matches!(client.publish(retained, None).await, Err(MqttError::PacketValidation(_)));

            let oversized = PublishPacket::builder("a/b", QualityOfService::AtLeastOnce).with_payload(&[0u8; 128]).build();
            assert_matches!(client.publish(oversized, None).await, Err(MqttError::PacketValidation(_)));

            let wildcard = PublishPacket::builder("a/+", QualityOfService::AtMostOnce).build();
            assert_matches!(client.publish(wildcard, None).await, Err(MqttError::PacketValidation(_)));

            let empty = PublishPacket::builder("", QualityOfService::AtMostOnce).build();
            assert_matches!(client.publish(empty, None).await, Err(MqttError::PacketValidation(_)));

            assert_eq!(0, persistence.put_count());
            assert_eq!(0, client.shared.packet_ids.outstanding());
            assert!(broker.received().iter().all(|packet| packet.packet_type() != PacketType::Publish));
            assert!(client.is_connected());
        });
    }

    #[test]
    fn outbound_gate_blocks_publish_beyond_receive_maximum() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Connect, handle_connect_with_connack(ConnackPacket {
                receive_maximum: Some(1),
                ..Default::default()
            }));
            handlers.insert(PacketType::Publish, Box::new(handle_with_nothing));

            let (client, broker) = connected_client(handlers, ClientOptionsBuilder::new().build()).await;

            let first_client = client.clone();
            let first = tokio::spawn(async move {
                first_client.publish(qos1_publish("gate/first"), None).await
            });

            let received = broker.wait_for_packets(PacketType::Publish, 1).await;
            let first_id = match &received[received.len() - 1] {
                MqttPacket::Publish(publish) => { publish.packet_id }
                _ => { panic!("expected publish") }
            };

            let blocked = OperationOptions::builder().with_timeout(Duration::from_millis(100)).build();
            assert_matches!(client.publish(qos1_publish("gate/second"), Some(blocked)).await, Err(MqttError::OperationCancelled(_)));
            assert_eq!(1, broker.received().iter().filter(|packet| packet.packet_type() == PacketType::Publish).count());

            broker.send_to_client(MqttPacket::Puback(PubackPacket {
                packet_id: first_id,
                ..Default::default()
            }));

            assert_matches!(first.await.unwrap(), Ok(PublishResponse::Qos1(_)));
            assert_eq!(1, client.shared.gates.available_outbound());
        });
    }

    #[test]
    fn operation_timeout_releases_resources() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Publish, Box::new(handle_with_nothing));

            let persistence = Arc::new(MemoryPersistence::new());
            let options = ClientOptionsBuilder::new()
                .with_persistence(persistence.clone())
                .with_default_operation_timeout(Duration::from_millis(50))
                .build();
            let (client, _broker) = connected_client(handlers, options).await;

            assert_matches!(client.publish(qos1_publish("slow/topic"), None).await, Err(MqttError::OperationCancelled(_)));

            assert_eq!(0, client.shared.packet_ids.outstanding());
            assert_eq!(65535, client.shared.gates.available_outbound());
            assert_eq!(1, persistence.all().len());
            assert!(client.is_connected());
        });
    }

    #[test]
    fn inbound_qos1_publish_is_acknowledged_and_routed() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let routed = Arc::new(Mutex::new(Vec::new()));
            let options = ClientOptionsBuilder::new()
                .with_publish_handler(recording_publish_handler(&routed))
                .build();
            let (client, broker) = connected_client(create_default_packet_handlers(), options).await;

            broker.send_to_client(MqttPacket::Publish(PublishPacket {
                packet_id: 7,
                topic: "test/1".to_string(),
                qos: QualityOfService::AtLeastOnce,
                payload: Some("test payload".as_bytes().to_vec()),
                ..Default::default()
            }));

            let received = broker.wait_for_packets(PacketType::Puback, 1).await;
            assert!(received.iter().any(|packet| matches!(packet, MqttPacket::Puback(puback) if puback.packet_id == 7)));

            wait_for(|| routed.lock().unwrap().len() == 1).await;
            {
                let routed = routed.lock().unwrap();
                assert_eq!("test/1", routed[0].topic);
                assert_eq!(Some("test payload".as_bytes().to_vec()), routed[0].payload);
                assert_eq!(QualityOfService::AtLeastOnce, routed[0].qos);
            }
            assert_eq!(65535, client.shared.gates.available_inbound());
        });
    }

    #[test]
    fn inbound_qos0_publish_is_routed_without_acknowledgement() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let routed = Arc::new(Mutex::new(Vec::new()));
            let options = ClientOptionsBuilder::new()
                .with_publish_handler(recording_publish_handler(&routed))
                .build();
            let (client, broker) = connected_client(create_default_packet_handlers(), options).await;

            broker.send_to_client(MqttPacket::Publish(PublishPacket {
                topic: "test/0".to_string(),
                qos: QualityOfService::AtMostOnce,
                payload: Some("fire and forget".as_bytes().to_vec()),
                ..Default::default()
            }));

            wait_for(|| routed.lock().unwrap().len() == 1).await;
            {
                let routed = routed.lock().unwrap();
                assert_eq!("test/0", routed[0].topic);
                assert_eq!(Some("fire and forget".as_bytes().to_vec()), routed[0].payload);
                assert_eq!(QualityOfService::AtMostOnce, routed[0].qos);
            }

            let subscribe = SubscribePacket::builder().with_simple_subscription("after/qos0", QualityOfService::AtMostOnce).build();
            client.subscribe(subscribe, None).await.unwrap();

            assert!(broker.received().iter().all(|packet| !matches!(packet.packet_type(), PacketType::Puback | PacketType::Pubrec)));
            assert_eq!(65535, client.shared.gates.available_inbound());
            assert!(client.is_connected());
        });
    }

    #[test]
    fn inbound_qos2_publish_is_routed_on_pubrel() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Pubrec, Box::new(handle_with_nothing));

            let routed = Arc::new(Mutex::new(Vec::new()));
            let options = ClientOptionsBuilder::new()
                .with_publish_handler(recording_publish_handler(&routed))
                .build();
            let (client, broker) = connected_client(handlers, options).await;

            let publish = PublishPacket {
                packet_id: 9,
                topic: "inbound/qos2".to_string(),
                qos: QualityOfService::ExactlyOnce,
                ..Default::default()
            };

            broker.send_to_client(MqttPacket::Publish(publish.clone()));
            broker.wait_for_packets(PacketType::Pubrec, 1).await;

            let mut duplicate = publish.clone();
            duplicate.duplicate = true;
            broker.send_to_client(MqttPacket::Publish(duplicate));
            broker.wait_for_packets(PacketType::Pubrec, 2).await;

            assert!(routed.lock().unwrap().is_empty());
            assert_eq!(65534, client.shared.gates.available_inbound());

            broker.send_to_client(MqttPacket::Pubrel(PubrelPacket {
                packet_id: 9,
                ..Default::default()
            }));

            let received = broker.wait_for_packets(PacketType::Pubcomp, 1).await;
            assert!(received.iter().any(|packet| matches!(packet, MqttPacket::Pubcomp(pubcomp) if pubcomp.packet_id == 9 && pubcomp.reason_code == PubcompReasonCode::Success)));

            wait_for(|| routed.lock().unwrap().len() == 1).await;
            wait_for(|| client.shared.gates.available_inbound() == 65535).await;
        });
    }

    #[test]
    fn unknown_packet_ids_are_answered_with_not_found() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let (client, broker) = connected_client(create_default_packet_handlers(), ClientOptionsBuilder::new().build()).await;

            broker.send_to_client(MqttPacket::Pubrec(PubrecPacket {
                packet_id: 77,
                ..Default::default()
            }));
            broker.send_to_client(MqttPacket::Pubrel(PubrelPacket {
                packet_id: 78,
                ..Default::default()
            }));
            broker.send_to_client(MqttPacket::Puback(PubackPacket {
                packet_id: 79,
                ..Default::default()
            }));

            let received = broker.wait_for_packets(PacketType::Pubcomp, 1).await;
            assert!(received.iter().any(|packet| matches!(packet, MqttPacket::Pubrel(pubrel) if pubrel.packet_id == 77 && pubrel.reason_code == PubrelReasonCode::PacketIdentifierNotFound)));
            assert!(received.iter().any(|packet| matches!(packet, MqttPacket::Pubcomp(pubcomp) if pubcomp.packet_id == 78 && pubcomp.reason_code == PubcompReasonCode::PacketIdentifierNotFound)));
            assert!(client.is_connected());
        });
    }

    #[test]
    fn inbound_receive_maximum_violation_ends_session() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Pubrec, Box::new(handle_with_nothing));

            let errors = Arc::new(Mutex::new(Vec::new()));
            let options = ClientOptionsBuilder::new()
                .with_connection_lost_callback(recording_connection_lost_callback(&errors))
                .build();

            let (broker, stream) = MockBroker::new(handlers);
            let client = Client::new(stream, options);
            client.connect(ConnectPacket::builder().with_receive_maximum(1).build()).await.unwrap();

            for packet_id in 1..3 {
                broker.send_to_client(MqttPacket::Publish(PublishPacket {
                    packet_id,
                    topic: "flood".to_string(),
                    qos: QualityOfService::ExactlyOnce,
                    ..Default::default()
                }));
            }

            let received = broker.wait_for_packets(PacketType::Disconnect, 1).await;
            assert!(received.iter().any(|packet| matches!(packet, MqttPacket::Disconnect(disconnect) if disconnect.reason_code == DisconnectReasonCode::ReceiveMaximumExceeded)));

            wait_for(|| errors.lock().unwrap().len() == 1).await;
            assert_matches!(errors.lock().unwrap()[0], MqttError::ProtocolError(_));
            assert!(!client.is_connected());
        });
    }

    #[test]
    fn server_disconnect_reaches_waiters_and_callback() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Subscribe, Box::new(handle_with_nothing));

            let errors = Arc::new(Mutex::new(Vec::new()));
            let options = ClientOptionsBuilder::new()
                .with_connection_lost_callback(recording_connection_lost_callback(&errors))
                .build();
            let (client, broker) = connected_client(handlers, options).await;

            let pending_client = client.clone();
            let pending = tokio::spawn(async move {
                let subscribe = SubscribePacket::builder().with_simple_subscription("never/acked", QualityOfService::AtLeastOnce).build();
                pending_client.subscribe(subscribe, None).await
            });

            broker.wait_for_packets(PacketType::Subscribe, 1).await;
            broker.send_to_client(MqttPacket::Disconnect(DisconnectPacket::builder()
                .with_reason_code(DisconnectReasonCode::ServerShuttingDown)
                .with_reason_string("GONE!")
                .build()));

            let result = pending.await.unwrap();
            assert_matches!(result, Err(MqttError::ServerDisconnect(context)) if context.reason_code() == DisconnectReasonCode::ServerShuttingDown);

            wait_for(|| errors.lock().unwrap().len() == 1).await;
            {
                let errors = errors.lock().unwrap();
                assert_matches!(&errors[0], MqttError::ServerDisconnect(context) if context.reason_string() == Some("GONE!"));
            }

            assert!(!client.is_connected());
            assert_matches!(client.publish(qos1_publish("a/b"), None).await, Err(MqttError::ClientClosed(_)));
            assert!(client.disconnect(DisconnectPacket::default()).await.is_ok());
            assert_eq!(1, errors.lock().unwrap().len());
        });
    }

    #[test]
    fn connection_loss_fails_pending_operations() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Publish, Box::new(handle_with_nothing));

            let errors = Arc::new(Mutex::new(Vec::new()));
            let options = ClientOptionsBuilder::new()
                .with_connection_lost_callback(recording_connection_lost_callback(&errors))
                .build();
            let (client, broker) = connected_client(handlers, options).await;

            let pending_client = client.clone();
            let pending = tokio::spawn(async move {
                pending_client.publish(qos1_publish("lost/topic"), None).await
            });

            broker.wait_for_packets(PacketType::Publish, 1).await;
            broker.close();

            assert_matches!(pending.await.unwrap(), Err(MqttError::ConnectionClosed(_)));
            wait_for(|| errors.lock().unwrap().len() == 1).await;
            assert_matches!(errors.lock().unwrap()[0], MqttError::ConnectionClosed(_));
        });
    }

    #[test]
    fn disconnect_is_idempotent() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Publish, Box::new(handle_with_nothing));

            let errors = Arc::new(Mutex::new(Vec::new()));
            let options = ClientOptionsBuilder::new()
                .with_connection_lost_callback(recording_connection_lost_callback(&errors))
                .build();
            let (client, broker) = connected_client(handlers, options).await;

            let pending_client = client.clone();
            let pending = tokio::spawn(async move {
                pending_client.publish(qos1_publish("pending/topic"), None).await
            });
            broker.wait_for_packets(PacketType::Publish, 1).await;

            let (first, second) = tokio::join!(
                client.disconnect(DisconnectPacket::default()),
                client.disconnect(DisconnectPacket::default())
            );
            assert!(first.is_ok());
            assert!(second.is_ok());
            assert!(client.disconnect(DisconnectPacket::default()).await.is_ok());

            assert_matches!(pending.await.unwrap(), Err(MqttError::UserInitiatedDisconnect(_)));

            let received = broker.wait_for_packets(PacketType::Disconnect, 1).await;
            assert_eq!(1, received.iter().filter(|packet| packet.packet_type() == PacketType::Disconnect).count());

            assert!(!client.is_connected());
            assert!(errors.lock().unwrap().is_empty());
            assert_matches!(client.publish(qos1_publish("a/b"), None).await, Err(MqttError::ClientClosed(_)));
        });
    }

    #[test]
    fn server_and_user_disconnect_race_ends_session_once() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Publish, Box::new(handle_with_nothing));

            let errors = Arc::new(Mutex::new(Vec::new()));
            let options = ClientOptionsBuilder::new()
                .with_connection_lost_callback(recording_connection_lost_callback(&errors))
                .build();
            let (client, broker) = connected_client(handlers, options).await;

            let pending_client = client.clone();
            let pending = tokio::spawn(async move {
                pending_client.publish(qos1_publish("racing/topic"), None).await
            });
            broker.wait_for_packets(PacketType::Publish, 1).await;

            let server_disconnect = DisconnectPacket::builder()
                .with_reason_code(DisconnectReasonCode::ServerShuttingDown)
                .build();
            let (_, result) = tokio::join!(
                async { broker.send_to_client(MqttPacket::Disconnect(server_disconnect)) },
                client.disconnect(DisconnectPacket::default())
            );
            assert!(result.is_ok());

            let pending_result = pending.await.unwrap();
            assert_matches!(pending_result, Err(MqttError::ServerDisconnect(_)) | Err(MqttError::UserInitiatedDisconnect(_)));

            tokio::time::sleep(Duration::from_millis(100)).await;
            assert!(errors.lock().unwrap().len() <= 1);
            assert!(!client.is_connected());
            assert_eq!(0, client.shared.packet_ids.outstanding());
        });
    }

    #[test]
    fn raised_stop_signal_prevents_connected_state() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let (_broker, stream) = MockBroker::new(create_default_packet_handlers());
            let client = Client::new(stream, ClientOptionsBuilder::new().build());

            *client.shared.state.lock().unwrap() = SessionState::Connecting;
            assert!(client.shared.begin_shutdown());

            assert_matches!(client.shared.mark_connected(), Err(MqttError::ClientClosed(_)));
            assert!(!client.is_connected());
        });
    }

    #[test]
    fn resumed_session_replays_persisted_exchanges() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let persistence = Arc::new(CountingPersistence::new());
            persistence.put(5, &MqttPacket::Publish(PublishPacket {
                packet_id: 5,
                topic: "recovered/qos1".to_string(),
                qos: QualityOfService::AtLeastOnce,
                ..Default::default()
            })).unwrap();
            persistence.put(6, &MqttPacket::Publish(PublishPacket {
                packet_id: 6,
                topic: "recovered/qos2".to_string(),
                qos: QualityOfService::ExactlyOnce,
                ..Default::default()
            })).unwrap();
            persistence.put(7, &MqttPacket::Pubrel(PubrelPacket {
                packet_id: 7,
                ..Default::default()
            })).unwrap();

            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Connect, handle_connect_with_connack(ConnackPacket {
                session_present: true,
                ..Default::default()
            }));

            let options = ClientOptionsBuilder::new().with_persistence(persistence.clone()).build();
            let (client, broker) = connected_client(handlers, options).await;

            let received = broker.wait_for_packets(PacketType::Pubrel, 2).await;
            assert!(received.iter().any(|packet| matches!(packet, MqttPacket::Publish(publish) if publish.packet_id == 5 && publish.duplicate)));
            assert!(received.iter().any(|packet| matches!(packet, MqttPacket::Publish(publish) if publish.packet_id == 6 && publish.duplicate)));
            assert!(received.iter().any(|packet| matches!(packet, MqttPacket::Pubrel(pubrel) if pubrel.packet_id == 7)));

            wait_for(|| persistence.all().is_empty()).await;
            wait_for(|| client.shared.packet_ids.outstanding() == 0).await;
            assert_eq!(65535, client.shared.gates.available_outbound());

            let response = client.publish(qos1_publish("after/recovery"), None).await.unwrap();
            assert_matches!(response, PublishResponse::Qos1(_));
        });
    }

    #[test]
    fn fresh_session_discards_persisted_exchanges() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let persistence = Arc::new(MemoryPersistence::new());
            persistence.put(5, &MqttPacket::Publish(qos1_publish("stale/topic"))).unwrap();

            let options = ClientOptionsBuilder::new().with_persistence(persistence.clone()).build();
            let (_client, broker) = connected_client(create_default_packet_handlers(), options).await;

            assert!(persistence.all().is_empty());
            assert!(broker.received().iter().all(|packet| packet.packet_type() != PacketType::Publish));
        });
    }

    #[test]
    fn ping_timeout_ends_session() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Pingreq, Box::new(handle_with_nothing));

            let errors = Arc::new(Mutex::new(Vec::new()));
            let options = ClientOptionsBuilder::new()
                .with_connection_lost_callback(recording_connection_lost_callback(&errors))
                .with_ping_timeout(Duration::from_secs(1))
                .build();

            let (broker, stream) = MockBroker::new(handlers);
            let client = Client::new(stream, options);
            client.connect(ConnectPacket::builder().with_keep_alive_interval_seconds(1).build()).await.unwrap();

            broker.wait_for_packets(PacketType::Pingreq, 1).await;
            wait_for(|| errors.lock().unwrap().len() == 1).await;

            assert_matches!(errors.lock().unwrap()[0], MqttError::ConnectionClosed(_));
            assert!(!client.is_connected());
        });
    }

    #[test]
    fn unsolicited_pingresp_does_not_mask_ping_timeout() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Pingreq, Box::new(handle_with_nothing));

            let errors = Arc::new(Mutex::new(Vec::new()));
            let options = ClientOptionsBuilder::new()
                .with_connection_lost_callback(recording_connection_lost_callback(&errors))
                .with_ping_timeout(Duration::from_secs(1))
                .build();

            let (broker, stream) = MockBroker::new(handlers);
            let client = Client::new(stream, options);
            client.connect(ConnectPacket::builder().with_keep_alive_interval_seconds(1).build()).await.unwrap();

            broker.send_to_client(MqttPacket::Pingresp(PingrespPacket {}));

            broker.wait_for_packets(PacketType::Pingreq, 1).await;
            wait_for(|| errors.lock().unwrap().len() == 1).await;

            assert_matches!(errors.lock().unwrap()[0], MqttError::ConnectionClosed(_));
            assert!(!client.is_connected());
            assert_eq!(1, broker.received().iter().filter(|packet| packet.packet_type() == PacketType::Pingreq).count());
        });
    }

    #[test]
    fn keep_alive_is_answered() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let (broker, stream) = MockBroker::new(create_default_packet_handlers());
            let client = Client::new(stream, ClientOptionsBuilder::new().build());
            client.connect(ConnectPacket::builder().with_keep_alive_interval_seconds(1).build()).await.unwrap();

            broker.wait_for_packets(PacketType::Pingreq, 2).await;
            assert!(client.is_connected());
        });
    }

    struct ChallengeAnswerer {
        completed: Mutex<usize>,
    }

    impl auth::AuthHandler for ChallengeAnswerer {
        fn authenticate(&self, challenge: &AuthPacket) -> MqttResult<AuthPacket> {
            Ok(AuthPacket {
                reason_code: AuthenticateReasonCode::ContinueAuthentication,
                authentication_method: challenge.authentication_method.clone(),
                authentication_data: Some("answer".as_bytes().to_vec()),
                ..Default::default()
            })
        }

        fn authenticated(&self) {
            *self.completed.lock().unwrap() += 1;
        }
    }

    fn handle_auth_with_challenge(packet: &MqttPacket, response_packets: &mut VecDeque<MqttPacket>, _: &mut BrokerTestContext) -> MqttResult<()> {
        if let MqttPacket::Auth(auth) = packet {
            let reason_code = match auth.reason_code {
                AuthenticateReasonCode::ReAuthenticate => { AuthenticateReasonCode::ContinueAuthentication }
                _ => { AuthenticateReasonCode::Success }
            };

            response_packets.push_back(MqttPacket::Auth(AuthPacket {
                reason_code,
                authentication_method: auth.authentication_method.clone(),
                ..Default::default()
            }));
        }

        Ok(())
    }

    #[test]
    fn authenticate_runs_challenge_exchange() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let mut handlers = create_default_packet_handlers();
            handlers.insert(PacketType::Auth, Box::new(handle_auth_with_challenge));

            let answerer = Arc::new(ChallengeAnswerer { completed: Mutex::new(0) });
            let options = ClientOptionsBuilder::new().with_auth_handler(answerer.clone()).build();
            let (client, broker) = connected_client(handlers, options).await;

            let response = client.authenticate(AuthPacket {
                reason_code: AuthenticateReasonCode::ReAuthenticate,
                authentication_method: Some("SCRAM".to_string()),
                ..Default::default()
            }, None).await.unwrap();

            assert!(response.success);
            assert_eq!(AuthenticateReasonCode::Success, response.packet.reason_code);
            assert_eq!(1, *answerer.completed.lock().unwrap());

            let received = broker.wait_for_packets(PacketType::Auth, 2).await;
            assert!(received.iter().any(|packet| matches!(packet, MqttPacket::Auth(auth) if auth.reason_code == AuthenticateReasonCode::ContinueAuthentication)));
        });
    }

    #[test]
    fn concurrent_authenticate_is_rejected() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let (client, broker) = connected_client(create_default_packet_handlers(), ClientOptionsBuilder::new().build()).await;

            let pending_client = client.clone();
            let pending = tokio::spawn(async move {
                pending_client.authenticate(AuthPacket {
                    reason_code: AuthenticateReasonCode::ReAuthenticate,
                    ..Default::default()
                }, None).await
            });

            broker.wait_for_packets(PacketType::Auth, 1).await;
            let second = client.authenticate(AuthPacket::default(), None).await;
            assert_matches!(second, Err(MqttError::InvalidClientState(_)));

            broker.send_to_client(MqttPacket::Disconnect(DisconnectPacket::builder()
                .with_reason_code(DisconnectReasonCode::NotAuthorized)
                .build()));

            assert_matches!(pending.await.unwrap(), Err(MqttError::ServerDisconnect(_)));
        });
    }
}
