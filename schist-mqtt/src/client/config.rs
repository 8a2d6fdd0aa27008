/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Module containing configuration types for the client and its operations.
 */

use crate::client::auth::AuthHandler;
use crate::client::persistence::{MemoryPersistence, Persistence};
use crate::client::router::{PublishHandler, Router, SingleHandlerRouter, StandardRouter};
use crate::error::MqttError;
use crate::mqtt::{ConnackPacket, ConnectPacket, QualityOfService};
use crate::mqtt::utils::DEFAULT_RECEIVE_MAXIMUM;

use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked once when a session ends for any reason other than a local disconnect
pub type ConnectionLostCallback = Arc<dyn Fn(MqttError) + Send + Sync>;

const DEFAULT_CONNACK_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(20);

/// A structure that holds client-level behavioral configuration
#[derive(Clone)]
pub struct ClientOptions {
    pub(crate) persistence: Arc<dyn Persistence>,
    pub(crate) router: Arc<dyn Router>,
    pub(crate) connection_lost_callback: Option<ConnectionLostCallback>,
    pub(crate) auth_handler: Option<Arc<dyn AuthHandler>>,

    pub(crate) connack_timeout: Duration,
    pub(crate) ping_timeout: Duration,
    pub(crate) default_operation_timeout: Option<Duration>,
}

impl Debug for ClientOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ClientOptions {{ ")?;
        write!(f, "connection_lost_callback: {}, ", if self.connection_lost_callback.is_some() { "Some(...)" } else { "None" })?;
        write!(f, "auth_handler: {}, ", if self.auth_handler.is_some() { "Some(...)" } else { "None" })?;
        write!(f, "connack_timeout: {:?}, ", self.connack_timeout)?;
        write!(f, "ping_timeout: {:?}, ", self.ping_timeout)?;
        write!(f, "default_operation_timeout: {:?} ", self.default_operation_timeout)?;
        write!(f, "}}")
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            persistence: Arc::new(MemoryPersistence::new()),
            router: Arc::new(StandardRouter::new()),
            connection_lost_callback: None,
            auth_handler: None,
            connack_timeout: DEFAULT_CONNACK_TIMEOUT,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            default_operation_timeout: None,
        }
    }
}

/// A builder for client-level behavior configuration options
#[derive(Debug, Default)]
pub struct ClientOptionsBuilder {
    options: ClientOptions
}

impl ClientOptionsBuilder {

    /// Creates a new builder object for ClientOptions
    pub fn new() -> Self {
        ClientOptionsBuilder {
            options: ClientOptions::default()
        }
    }

    /// Configures the store used to record outbound QoS 1 and QoS 2 exchanges.  Defaults to an
    /// in-memory store.
    pub fn with_persistence(&mut self, persistence: Arc<dyn Persistence>) -> &mut Self {
        self.options.persistence = persistence;
        self
    }

    /// Configures the router that dispatches inbound publishes.  Defaults to an empty
    /// [`StandardRouter`].
    pub fn with_router(&mut self, router: Arc<dyn Router>) -> &mut Self {
        self.options.router = router;
        self
    }

    /// Routes every inbound publish to a single callback
    pub fn with_publish_handler(&mut self, handler: PublishHandler) -> &mut Self {
        self.options.router = Arc::new(SingleHandlerRouter::new(handler));
        self
    }

    /// Configures a callback invoked when the session ends for any reason other than a call to
    /// `disconnect`
    pub fn with_connection_lost_callback(&mut self, callback: ConnectionLostCallback) -> &mut Self {
        self.options.connection_lost_callback = Some(callback);
        self
    }

    /// Configures a handler for enhanced authentication challenges
    pub fn with_auth_handler(&mut self, auth_handler: Arc<dyn AuthHandler>) -> &mut Self {
        self.options.auth_handler = Some(auth_handler);
        self
    }

    /// Configures how long `connect` waits for the server's CONNACK
    pub fn with_connack_timeout(&mut self, connack_timeout: Duration) -> &mut Self {
        self.options.connack_timeout = connack_timeout;
        self
    }

    /// Configures how long, after sending a PINGREQ, the client will wait for a PINGRESP from the
    /// server before giving up and shutting down the connection.
    pub fn with_ping_timeout(&mut self, ping_timeout: Duration) -> &mut Self {
        self.options.ping_timeout = ping_timeout;
        self
    }

    /// Configures a timeout applied to every operation that does not supply its own
    pub fn with_default_operation_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.options.default_operation_timeout = Some(timeout);
        self
    }

    /// Builds a new set of client options
    pub fn build(&self) -> ClientOptions {
        self.options.clone()
    }
}

/// Per-operation configuration
#[derive(Clone, Debug, Default)]
pub struct OperationOptions {
    pub(crate) timeout: Option<Duration>,
}

impl OperationOptions {

    /// Creates a new builder for OperationOptions
    pub fn builder() -> OperationOptionsBuilder {
        OperationOptionsBuilder::new()
    }
}

/// A builder for per-operation configuration
#[derive(Debug, Default)]
pub struct OperationOptionsBuilder {
    options: OperationOptions
}

impl OperationOptionsBuilder {

    /// Creates a new builder object for OperationOptions
    pub fn new() -> Self {
        OperationOptionsBuilder {
            options: OperationOptions::default()
        }
    }

    /// Bounds how long the operation may wait for flow control and for its response
    pub fn with_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Builds a new set of operation options
    pub fn build(&self) -> OperationOptions {
        self.options.clone()
    }
}

/// Session properties exchanged in CONNECT and CONNACK.  `None` means the peer did not advertise
/// the property and the protocol default applies.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Capabilities {

    /// Highest QoS the peer accepts
    pub maximum_qos: Option<QualityOfService>,

    /// How many unacknowledged QoS 1+ publishes the peer accepts at once
    pub receive_maximum: Option<u16>,

    /// Largest packet the peer accepts, in bytes
    pub maximum_packet_size: Option<u32>,

    /// Highest topic alias the peer accepts
    pub topic_alias_maximum: Option<u16>,

    /// Whether the peer supports retained messages
    pub retain_available: Option<bool>,

    /// Whether the peer supports wildcard subscriptions
    pub wildcard_subscriptions_available: Option<bool>,

    /// Whether the peer supports shared subscriptions
    pub shared_subscriptions_available: Option<bool>,

    /// Whether the peer supports subscription identifiers
    pub subscription_identifiers_available: Option<bool>,

    /// Keep alive interval the session runs with
    pub keep_alive_seconds: Option<u16>,
}

impl Capabilities {

    pub(crate) fn from_connect(connect: &ConnectPacket) -> Self {
        Capabilities {
            receive_maximum: connect.receive_maximum,
            maximum_packet_size: connect.maximum_packet_size_bytes,
            topic_alias_maximum: connect.topic_alias_maximum,
            keep_alive_seconds: Some(connect.keep_alive_interval_seconds),
            ..Default::default()
        }
    }

    /// Overrides each property the CONNACK supplies and keeps the rest
    pub(crate) fn merge_connack(&mut self, connack: &ConnackPacket) {
        if connack.maximum_qos.is_some() {
            self.maximum_qos = connack.maximum_qos;
        }
        if connack.receive_maximum.is_some() {
            self.receive_maximum = connack.receive_maximum;
        }
        if connack.maximum_packet_size.is_some() {
            self.maximum_packet_size = connack.maximum_packet_size;
        }
        if connack.topic_alias_maximum.is_some() {
            self.topic_alias_maximum = connack.topic_alias_maximum;
        }
        if connack.retain_available.is_some() {
            self.retain_available = connack.retain_available;
        }
        if connack.wildcard_subscriptions_available.is_some() {
            self.wildcard_subscriptions_available = connack.wildcard_subscriptions_available;
        }
        if connack.shared_subscriptions_available.is_some() {
            self.shared_subscriptions_available = connack.shared_subscriptions_available;
        }
        if connack.subscription_identifiers_available.is_some() {
            self.subscription_identifiers_available = connack.subscription_identifiers_available;
        }
        if connack.server_keep_alive.is_some() {
            self.keep_alive_seconds = connack.server_keep_alive;
        }
    }

    /// Highest QoS the peer accepts, defaulting to QoS 2
    pub fn effective_maximum_qos(&self) -> QualityOfService {
        self.maximum_qos.unwrap_or(QualityOfService::ExactlyOnce)
    }

    /// Receive maximum, defaulting to 65535
    pub fn effective_receive_maximum(&self) -> u16 {
        match self.receive_maximum {
            Some(0) | None => DEFAULT_RECEIVE_MAXIMUM,
            Some(value) => value,
        }
    }

    /// Whether a boolean capability is available, defaulting to true when unadvertised
    pub(crate) fn is_available(capability: Option<bool>) -> bool {
        capability.unwrap_or(true)
    }
}
