/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
A module containing the core crate error enumeration, context structures, and conversion
definitions.
 */

use crate::mqtt::{ConnackPacket, DisconnectPacket, DisconnectReasonCode, PacketType};

use std::error::Error;
use std::fmt;

/// Additional details about an OperationChannelFailure error variant
#[derive(Debug)]
pub struct OperationChannelFailureContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about an EncodingFailure error variant
#[derive(Debug)]
pub struct EncodingFailureContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about a DecodingFailure error variant
#[derive(Debug)]
pub struct DecodingFailureContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about a ProtocolError error variant
#[derive(Debug)]
pub struct ProtocolErrorContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about a PacketValidation error variant
#[derive(Debug)]
pub struct PacketValidationContext {

    /// type of packet that failed validation
    pub packet_type: PacketType,

    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about a PacketIdSpaceExhausted error variant
#[derive(Debug)]
pub struct PacketIdSpaceExhaustedContext {
}

/// Additional details about a ServerDisconnect error variant
#[derive(Debug)]
pub struct ServerDisconnectContext {

    /// the DISCONNECT packet the server sent before closing the connection
    pub disconnect: DisconnectPacket,
}

impl ServerDisconnectContext {

    /// Returns the reason code of the server's DISCONNECT packet
    pub fn reason_code(&self) -> DisconnectReasonCode { self.disconnect.reason_code }

    /// Returns the reason string of the server's DISCONNECT packet, if one was included
    pub fn reason_string(&self) -> Option<&str> { self.disconnect.reason_string.as_deref() }
}

/// Additional details about a ConnectionRejected error variant
#[derive(Debug)]
pub struct ConnectionRejectedContext {

    /// the CONNACK packet whose reason code rejected the connection attempt
    pub connack: ConnackPacket,
}

/// Additional details about a ConnectionClosed error variant
#[derive(Debug)]
pub struct ConnectionClosedContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about an OperationCancelled error variant
#[derive(Debug)]
pub struct OperationCancelledContext {
}

/// Additional details about a UserInitiatedDisconnect error variant
#[derive(Debug)]
pub struct UserInitiatedDisconnectContext {
}

/// Additional details about a ClientClosed error variant
#[derive(Debug)]
pub struct ClientClosedContext {
}

/// Additional details about an InvalidClientState error variant
#[derive(Debug)]
pub struct InvalidClientStateContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about a PersistenceFailure error variant
#[derive(Debug)]
pub struct PersistenceFailureContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about an InternalStateError error variant
#[derive(Debug)]
pub struct InternalStateErrorContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Additional details about a StdIoError error variant
#[derive(Debug)]
pub struct StdIoErrorContext {
    source: Box<dyn Error + Send + Sync + 'static>
}

/// Basic error type for the entire schist-mqtt crate.
#[derive(Debug)]
#[non_exhaustive]
pub enum MqttError {

    /// Failure encountered while sending/receiving on an operation's completion channel
    OperationChannelFailure(OperationChannelFailureContext),

    /// Error encountered while attempting to encode an MQTT packet
    EncodingFailure(EncodingFailureContext),

    /// Error encountered while attempting to decode an MQTT packet.  Examples include bad header
    /// flags, mismatches between remaining length fields and overall packet length, invalid
    /// utf-8, duplicate properties, etc...
    DecodingFailure(DecodingFailureContext),

    /// Generic error emitted when the client encounters peer behavior that violates the MQTT
    /// specification: an unknown packet identifier, a response of the wrong type, or a peer
    /// that exceeds the receive maximum we advertised.
    ProtocolError(ProtocolErrorContext),

    /// Error emitted when an outbound packet violates the MQTT specification or the capabilities
    /// the server advertised in its CONNACK.
    PacketValidation(PacketValidationContext),

    /// Every one of the 65535 packet identifiers is currently bound to an unfinished exchange.
    /// The session remains usable; the operation may be retried once others complete.
    PacketIdSpaceExhausted(PacketIdSpaceExhaustedContext),

    /// The server sent a DISCONNECT packet.  This is the error delivered to every unfinished
    /// operation and to the connection lost callback when the server ends the session.
    ServerDisconnect(ServerDisconnectContext),

    /// The server answered the CONNECT with an error-classed reason code.
    ConnectionRejected(ConnectionRejectedContext),

    /// The connection failed at the transport level: a read or write failed, the peer closed
    /// the stream, or a keep alive ping went unanswered.
    ConnectionClosed(ConnectionClosedContext),

    /// The operation's timeout elapsed before it could finish.  Any packet id and inflight
    /// permit held by the operation have been released.
    OperationCancelled(OperationCancelledContext),

    /// Error applied to all unfinished operations when the user disconnects the client.
    UserInitiatedDisconnect(UserInitiatedDisconnectContext),

    /// The operation was submitted after the session had already ended.
    ClientClosed(ClientClosedContext),

    /// The operation is not valid in the client's current lifecycle state.
    InvalidClientState(InvalidClientStateContext),

    /// The configured persistence implementation failed to record packet state.
    PersistenceFailure(PersistenceFailureContext),

    /// Error emitted by the client when something happens that should never happen.  Always indicates
    /// a bug in the client.
    InternalStateError(InternalStateErrorContext),

    /// Generic error wrapping std::io::Error
    StdIoError(StdIoErrorContext),
}

impl MqttError {

    pub(crate) fn new_operation_channel_failure(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        MqttError::OperationChannelFailure(
            OperationChannelFailureContext {
                source : source.into()
            }
        )
    }

    pub(crate) fn new_encoding_failure(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        MqttError::EncodingFailure(
            EncodingFailureContext {
                source : source.into()
            }
        )
    }

    pub(crate) fn new_decoding_failure(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        MqttError::DecodingFailure(
            DecodingFailureContext {
                source : source.into()
            }
        )
    }

    pub(crate) fn new_protocol_error(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        MqttError::ProtocolError(
            ProtocolErrorContext {
                source : source.into()
            }
        )
    }

    pub(crate) fn new_packet_validation(packet_type: PacketType, source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        MqttError::PacketValidation(
            PacketValidationContext {
                packet_type,
                source : source.into()
            }
        )
    }

    pub(crate) fn new_packet_id_space_exhausted() -> Self {
        MqttError::PacketIdSpaceExhausted(
            PacketIdSpaceExhaustedContext {
            }
        )
    }

    pub(crate) fn new_server_disconnect(disconnect: DisconnectPacket) -> Self {
        MqttError::ServerDisconnect(
            ServerDisconnectContext {
                disconnect
            }
        )
    }

    pub(crate) fn new_connection_rejected(connack: ConnackPacket) -> Self {
        MqttError::ConnectionRejected(
            ConnectionRejectedContext {
                connack
            }
        )
    }

    pub(crate) fn new_connection_closed(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        MqttError::ConnectionClosed(
            ConnectionClosedContext {
                source : source.into()
            }
        )
    }

    pub(crate) fn new_operation_cancelled() -> Self {
        MqttError::OperationCancelled(
            OperationCancelledContext {
            }
        )
    }

    pub(crate) fn new_user_initiated_disconnect() -> Self {
        MqttError::UserInitiatedDisconnect(
            UserInitiatedDisconnectContext {
            }
        )
    }

    pub(crate) fn new_client_closed() -> Self {
        MqttError::ClientClosed(
            ClientClosedContext {
            }
        )
    }

    pub(crate) fn new_invalid_client_state(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        MqttError::InvalidClientState(
            InvalidClientStateContext {
                source : source.into()
            }
        )
    }

    /// Constructs a PersistenceFailure variant from an existing error.  Intended for use by
    /// custom [`Persistence`](crate::client::persistence::Persistence) implementations.
    pub fn new_persistence_failure(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        MqttError::PersistenceFailure(
            PersistenceFailureContext {
                source : source.into()
            }
        )
    }

    pub(crate) fn new_internal_state_error(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        MqttError::InternalStateError(
            InternalStateErrorContext {
                source : source.into()
            }
        )
    }

    /// Constructs a StdIoError variant from an existing error.  Typically this should be a
    /// std::io::Error
    #[doc(hidden)]
    pub fn new_std_io_error(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        MqttError::StdIoError(
            StdIoErrorContext {
                source : source.into()
            }
        )
    }
}

impl Error for MqttError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MqttError::OperationChannelFailure(context) => {
                Some(context.source.as_ref())
            }
            MqttError::EncodingFailure(context) => {
                Some(context.source.as_ref())
            }
            MqttError::DecodingFailure(context) => {
                Some(context.source.as_ref())
            }
            MqttError::ProtocolError(context) => {
                Some(context.source.as_ref())
            }
            MqttError::PacketValidation(context) => {
                Some(context.source.as_ref())
            }
            MqttError::ConnectionClosed(context) => {
                Some(context.source.as_ref())
            }
            MqttError::InvalidClientState(context) => {
                Some(context.source.as_ref())
            }
            MqttError::PersistenceFailure(context) => {
                Some(context.source.as_ref())
            }
            MqttError::InternalStateError(context) => {
                Some(context.source.as_ref())
            }
            MqttError::StdIoError(context) => {
                Some(context.source.as_ref())
            }
            _ => { None }
        }
    }
}

impl fmt::Display for MqttError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MqttError::OperationChannelFailure(_) => {
                write!(f, "failure encountered while sending/receiving on an MQTT operation-related channel")
            }
            MqttError::EncodingFailure(context) => {
                write!(f, "failure encountered while encoding an outbound MQTT packet: {}", context.source)
            }
            MqttError::DecodingFailure(context) => {
                write!(f, "failure encountered while decoding an incoming MQTT packet: {}", context.source)
            }
            MqttError::ProtocolError(context) => {
                write!(f, "peer behavior disallowed by the mqtt spec: {}", context.source)
            }
            MqttError::PacketValidation(context) => {
                write!(f, "{} violates the mqtt spec or negotiated settings: {}", context.packet_type, context.source)
            }
            MqttError::PacketIdSpaceExhausted(_) => {
                write!(f, "all packet identifiers are bound to unfinished operations")
            }
            MqttError::ServerDisconnect(context) => {
                write!(f, "server sent DISCONNECT - {}: {}", context.disconnect.reason_code as u8, context.reason_string().unwrap_or(""))
            }
            MqttError::ConnectionRejected(context) => {
                write!(f, "server rejected the connection attempt - {}", context.connack.reason_code as u8)
            }
            MqttError::ConnectionClosed(context) => {
                write!(f, "client connection was closed: {}", context.source)
            }
            MqttError::OperationCancelled(_) => {
                write!(f, "the operation's timeout triggered prior to its completion")
            }
            MqttError::UserInitiatedDisconnect(_) => {
                write!(f, "connection was shut down by user action")
            }
            MqttError::ClientClosed(_) => {
                write!(f, "the client session has already ended")
            }
            MqttError::InvalidClientState(context) => {
                write!(f, "operation not valid in the client's current state: {}", context.source)
            }
            MqttError::PersistenceFailure(context) => {
                write!(f, "persistence failure: {}", context.source)
            }
            MqttError::InternalStateError(_) => {
                write!(f, "client reached an invalid internal state; almost certainly a client bug")
            }
            MqttError::StdIoError(_) => {
                write!(f, "generic error wrapper for std::io::Error when no more specialized error is appropriate; source contains further details")
            }
        }
    }
}

impl From<std::io::Error> for MqttError {
    fn from(error: std::io::Error) -> Self {
        MqttError::new_std_io_error(error)
    }
}

impl From<core::str::Utf8Error> for MqttError {
    fn from(err: core::str::Utf8Error) -> Self {
        MqttError::new_decoding_failure(err)
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for MqttError {
    fn from(err: tokio::sync::oneshot::error::RecvError) -> Self {
        MqttError::new_operation_channel_failure(err)
    }
}

/// Crate-wide result type for functions that can fail
pub type MqttResult<T> = Result<T, MqttError>;
