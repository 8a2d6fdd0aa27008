/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Module containing a set of structured data types that model the MQTT5 specification.
 */

pub mod utils;

use crate::error::MqttError;

use std::fmt;

/// MQTT message delivery quality of service.
///
/// Enum values match [MQTT5 spec](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901234) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub enum QualityOfService {

    /// The message is delivered according to the capabilities of the underlying network. No response is sent by the
    /// receiver and no retry is performed by the sender.
    #[default]
    AtMostOnce = 0,

    /// A level of service that ensures that the message arrives at the receiver at least once.
    AtLeastOnce = 1,

    /// A level of service that ensures that the message arrives at the receiver exactly once.
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QualityOfService {
    type Error = MqttError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        utils::convert_u8_to_quality_of_service(value)
    }
}

/// Optional property describing a PUBLISH payload's format.
///
/// Enum values match [MQTT5 spec](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901111) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PayloadFormatIndicator {

    /// The payload is arbitrary binary data
    #[default]
    Bytes = 0,

    /// The payload is a well-formed utf-8 string value.
    Utf8 = 1,
}

/// Configures how retained messages should be handled when subscribing with a topic filter that matches topics with
/// associated retained messages.
///
/// Enum values match [MQTT5 spec](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901169) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RetainHandlingType {

    /// The server should always send all retained messages on topics that match a subscription's filter.
    #[default]
    SendOnSubscribe = 0,

    /// The server should send retained messages only for the first matching subscription, per session.
    SendOnSubscribeIfNew = 1,

    /// Subscriptions must not trigger any retained message publishes from the server.
    DontSend = 2,
}

/// Server return code for connection attempts.
///
/// Enum values match [MQTT5 spec](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901079) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ConnectReasonCode {

    /// Returned when the connection is accepted.
    #[default]
    Success = 0,

    /// Returned when the server has a failure but does not want to specify a reason or none
    /// of the other reason codes apply.
    UnspecifiedError = 128,

    /// Returned when data in the CONNECT packet could not be correctly parsed by the server.
    MalformedPacket = 129,

    /// Returned when data in the CONNECT packet does not conform to the MQTT5 specification requirements.
    ProtocolError = 130,

    /// Returned when the CONNECT packet is valid but was not accepted by the server.
    ImplementationSpecificError = 131,

    /// Returned when the server does not support MQTT5 protocol version specified in the connection.
    UnsupportedProtocolVersion = 132,

    /// Returned when the client identifier in the CONNECT packet is a valid string but not one that
    /// is allowed on the server.
    ClientIdentifierNotValid = 133,

    /// Returned when the server does not accept the username and/or password specified by the client
    /// in the connection packet.
    BadUsernameOrPassword = 134,

    /// Returned when the client is not authorized to connect to the server.
    NotAuthorized = 135,

    /// Returned when the MQTT5 server is not available.
    ServerUnavailable = 136,

    /// Returned when the server is too busy to make a connection. It is recommended that the client try again later.
    ServerBusy = 137,

    /// Returned when the client has been banned by the server.
    Banned = 138,

    /// Returned when the authentication method used in the connection is either not supported on the server or it does
    /// not match the authentication method currently in use in the CONNECT packet.
    BadAuthenticationMethod = 140,

    /// Returned when the Will topic name sent in the CONNECT packet is correctly formed, but is not accepted by
    /// the server.
    TopicNameInvalid = 144,

    /// Returned when the CONNECT packet exceeded the maximum permissible size on the server.
    PacketTooLarge = 149,

    /// Returned when the quota limits set on the server have been met and/or exceeded.
    QuotaExceeded = 151,

    /// Returned when the Will payload in the CONNECT packet does not match the specified payload format indicator.
    PayloadFormatInvalid = 153,

    /// Returned when the server does not retain messages but the CONNECT packet on the client had Will retain enabled.
    RetainNotSupported = 154,

    /// Returned when the server does not support the QOS setting set in the Will QOS in the CONNECT packet.
    QosNotSupported = 155,

    /// Returned when the server is telling the client to temporarily use another server instead of the one they
    /// are trying to connect to.
    UseAnotherServer = 156,

    /// Returned when the server is telling the client to permanently use another server instead of the one they
    /// are trying to connect to.
    ServerMoved = 157,

    /// Returned when the server connection rate limit has been exceeded.
    ConnectionRateExceeded = 159,
}

impl ConnectReasonCode {
    /// Returns whether or not the reason code represents a successful connect
    pub fn is_success(&self) -> bool {
        matches!(self, ConnectReasonCode::Success)
    }

    /// Returns whether or not the reason code is error-classed (0x80 or higher)
    pub fn is_error(&self) -> bool {
        (*self as u8) >= 0x80
    }
}

/// Reason code inside PUBACK packets that indicates the result of the associated PUBLISH request.
///
/// Enum values match [MQTT5 spec](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901124) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PubackReasonCode {

    /// Returned when the (QoS 1) publish was accepted by the recipient.
    #[default]
    Success = 0,

    /// Returned when the (QoS 1) publish was accepted but there were no matching subscribers.
    NoMatchingSubscribers = 16,

    /// Returned when the (QoS 1) publish was not accepted and the receiver does not want to specify a reason or none
    /// of the other reason codes apply.
    UnspecifiedError = 128,

    /// Returned when the (QoS 1) publish was valid but the receiver was not willing to accept it.
    ImplementationSpecificError = 131,

    /// Returned when the (QoS 1) publish was not authorized by the receiver.
    NotAuthorized = 135,

    /// Returned when the topic name was valid but the receiver was not willing to accept it.
    TopicNameInvalid = 144,

    /// Returned when the packet identifier used in the associated PUBLISH was already in use.
    PacketIdentifierInUse = 145,

    /// Returned when the associated PUBLISH failed because an internal quota on the recipient was exceeded.
    QuotaExceeded = 151,

    /// Returned when the PUBLISH packet's payload format did not match its payload format indicator property.
    PayloadFormatInvalid = 153,
}

impl PubackReasonCode {
    /// Returns whether or not the reason code represents a successful publish
    pub fn is_success(&self) -> bool {
        matches!(self, PubackReasonCode::Success | PubackReasonCode::NoMatchingSubscribers)
    }
}

/// Reason code inside PUBREC packets that indicates the result of the associated QoS 2 PUBLISH request.
///
/// Enum values match [MQTT5 spec](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901134) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PubrecReasonCode {

    /// Returned when the (QoS 2) publish was accepted by the recipient.
    #[default]
    Success = 0,

    /// Returned when the (QoS 2) publish was accepted but there were no matching subscribers.
    NoMatchingSubscribers = 16,

    /// Returned when the (QoS 2) publish was not accepted and the receiver does not want to specify a reason or none
    /// of the other reason codes apply.
    UnspecifiedError = 128,

    /// Returned when the (QoS 2) publish was valid but the receiver was not willing to accept it.
    ImplementationSpecificError = 131,

    /// Returned when the (QoS 2) publish was not authorized by the receiver.
    NotAuthorized = 135,

    /// Returned when the topic name was valid but the receiver was not willing to accept it.
    TopicNameInvalid = 144,

    /// Returned when the packet identifier used in the associated PUBLISH was already in use.
    PacketIdentifierInUse = 145,

    /// Returned when the associated PUBLISH failed because an internal quota on the recipient was exceeded.
    QuotaExceeded = 151,

    /// Returned when the PUBLISH packet's payload format did not match its payload format indicator property.
    PayloadFormatInvalid = 153,
}

impl PubrecReasonCode {
    /// Returns whether or not the reason code represents a successful publish
    pub fn is_success(&self) -> bool {
        matches!(self, PubrecReasonCode::Success | PubrecReasonCode::NoMatchingSubscribers)
    }
}

/// Reason code inside PUBREL packets that indicates the result of receiving a PUBREC packet as part of the QoS 2 PUBLISH delivery process.
///
/// Enum values match [MQTT5 spec](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901144) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PubrelReasonCode {

    /// Returned when the associated PUBREC was successfully accepted by the recipient.
    #[default]
    Success = 0,

    /// Returned when the associated PUBREC's packet id was not being tracked by the recipient as an in-progress QoS 2 delivery.
    PacketIdentifierNotFound = 146,
}

impl PubrelReasonCode {
    /// Returns whether or not the reason code represents a successful release
    pub fn is_success(&self) -> bool {
        matches!(self, PubrelReasonCode::Success)
    }
}

/// Reason code inside PUBCOMP packets that indicates the result of receiving a PUBREL packet as part of the QoS 2 PUBLISH delivery process.
///
/// Enum values match [MQTT5 spec](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901154) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PubcompReasonCode {

    /// Returned when the associated PUBREL was successfully accepted by the recipient.
    #[default]
    Success = 0,

    /// Returned when the associated PUBREL's packet id was not being tracked by the recipient as an in-progress QoS 2 delivery.
    PacketIdentifierNotFound = 146,
}

impl PubcompReasonCode {
    /// Returns whether or not the reason code represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, PubcompReasonCode::Success)
    }
}

/// Reason code inside DISCONNECT packets.  Helps determine why a connection was terminated.
///
/// Enum values match [MQTT5 spec](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901208) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DisconnectReasonCode {

    /// Returned when the remote endpoint wishes to disconnect normally.
    #[default]
    NormalDisconnection = 0,

    /// Returns that the client wants to disconnect but requires that the server publish the Will message configured
    /// on the connection.
    DisconnectWithWillMessage = 4,

    /// Returned when the connection was closed but the sender does not want to specify a reason or none
    /// of the other reason codes apply.
    UnspecifiedError = 128,

    /// Indicates the remote endpoint received a packet that does not conform to the MQTT specification.
    MalformedPacket = 129,

    /// Returned when an unexpected or out-of-order packet was received by the remote endpoint.
    ProtocolError = 130,

    /// Returned when a valid packet was received by the remote endpoint, but could not be processed by the current implementation.
    ImplementationSpecificError = 131,

    /// Returned when the remote endpoint received a packet that represented an operation that was not authorized within
    /// the current connection.
    NotAuthorized = 135,

    /// Returned when the server is busy and cannot continue processing packets from the client.
    ServerBusy = 137,

    /// Returned when the server is shutting down.
    ServerShuttingDown = 139,

    /// Returned when the server closes the connection because no packet from the client has been received in
    /// 1.5 times the KeepAlive time set when the connection was established.
    KeepAliveTimeout = 141,

    /// Returned when the server has established another connection with the same client ID as a client's current
    /// connection, causing the current client to become disconnected.
    SessionTakenOver = 142,

    /// Returned when the topic filter name is correctly formed but not accepted by the server.
    TopicFilterInvalid = 143,

    /// Returned when topic name is correctly formed, but is not accepted.
    TopicNameInvalid = 144,

    /// Returned when the remote endpoint reached a state where there were more in-progress QoS1+ publishes then the
    /// limit it established for itself when the connection was opened.
    ReceiveMaximumExceeded = 147,

    /// Returned when the remote endpoint receives a PUBLISH packet that contained a topic alias greater than the
    /// maximum topic alias limit that it established for itself when the connection was opened.
    TopicAliasInvalid = 148,

    /// Returned when the remote endpoint received a packet whose size was greater than the maximum packet size limit
    /// it established for itself when the connection was opened.
    PacketTooLarge = 149,

    /// Returned when the remote endpoint's incoming data rate was too high.
    MessageRateTooHigh = 150,

    /// Returned when an internal quota of the remote endpoint was exceeded.
    QuotaExceeded = 151,

    /// Returned when the connection was closed due to an administrative action.
    AdministrativeAction = 152,

    /// Returned when the remote endpoint received a packet where payload format did not match the format specified
    /// by the payload format indicator.
    PayloadFormatInvalid = 153,

    /// Returned when the server does not support retained messages.
    RetainNotSupported = 154,

    /// Returned when the client sends a QoS that is greater than the maximum QoS established when the connection was
    /// opened.
    QosNotSupported = 155,

    /// Returned by the server to tell the client to temporarily use a different server.
    UseAnotherServer = 156,

    /// Returned by the server to tell the client to permanently use a different server.
    ServerMoved = 157,

    /// Returned by the server to tell the client that shared subscriptions are not supported on the server.
    SharedSubscriptionsNotSupported = 158,

    /// Returned when the server disconnects the client due to the connection rate being too high.
    ConnectionRateExceeded = 159,

    /// Returned by the server when the maximum connection time authorized for the connection was exceeded.
    MaximumConnectTime = 160,

    /// Returned by the server when it received a SUBSCRIBE packet with a subscription identifier, but the server does
    /// not support subscription identifiers.
    SubscriptionIdentifiersNotSupported = 161,

    /// Returned by the server when it received a SUBSCRIBE packet with a wildcard topic filter, but the server does
    /// not support wildcard topic filters.
    WildcardSubscriptionsNotSupported = 162,
}

impl DisconnectReasonCode {
    /// Returns whether or not the reason code represents a normal disconnection
    pub fn is_success(&self) -> bool {
        matches!(self, DisconnectReasonCode::NormalDisconnection | DisconnectReasonCode::DisconnectWithWillMessage)
    }
}

impl TryFrom<u8> for DisconnectReasonCode {
    type Error = MqttError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        utils::convert_u8_to_disconnect_reason_code(value)
    }
}

/// Reason codes inside SUBACK packet payloads that specify the results for each subscription in the associated
/// SUBSCRIBE packet.
///
/// Enum values match [MQTT5 spec](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901178) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SubackReasonCode {

    /// Returned when the subscription was accepted and the maximum QoS sent will be QoS 0.
    #[default]
    GrantedQos0 = 0,

    /// Returned when the subscription was accepted and the maximum QoS sent will be QoS 1.
    GrantedQos1 = 1,

    /// Returned when the subscription was accepted and the maximum QoS sent will be QoS 2.
    GrantedQos2 = 2,

    /// Returned when the connection was closed but the sender does not want to specify a reason or none
    /// of the other reason codes apply.
    UnspecifiedError = 128,

    /// Returned when the subscription was valid but the server did not accept it.
    ImplementationSpecificError = 131,

    /// Returned when the client was not authorized to make the subscription on the server.
    NotAuthorized = 135,

    /// Returned when the subscription topic filter was correctly formed but not allowed for the client.
    TopicFilterInvalid = 143,

    /// Returned when the packet identifier was already in use on the server.
    PacketIdentifierInUse = 145,

    /// Returned when a subscribe-related quota set on the server was exceeded.
    QuotaExceeded = 151,

    /// Returned when the subscription's topic filter was a shared subscription and the server does not support
    /// shared subscriptions.
    SharedSubscriptionsNotSupported = 158,

    /// Returned when the SUBSCRIBE packet contained a subscription identifier and the server does not support
    /// subscription identifiers.
    SubscriptionIdentifiersNotSupported = 161,

    /// Returned when the subscription's topic filter contains a wildcard but the server does not support
    /// wildcard subscriptions.
    WildcardSubscriptionsNotSupported = 162,
}

impl SubackReasonCode {
    /// Returns whether or not the reason code represents a successful subscription
    pub fn is_success(&self) -> bool {
        matches!(self, SubackReasonCode::GrantedQos0 | SubackReasonCode::GrantedQos1 | SubackReasonCode::GrantedQos2)
    }
}

/// Reason codes inside UNSUBACK packet payloads that specify the results for each topic filter in the associated
/// UNSUBSCRIBE packet.
///
/// Enum values match [MQTT5 spec](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901194) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum UnsubackReasonCode {

    /// Returned when the unsubscribe was successful and the subscription for the topic filter was removed.
    #[default]
    Success = 0,

    /// Returned when the topic filter did not match one of the client's existing topic filters on the server.
    NoSubscriptionExisted = 17,

    /// Returned when the unsubscribe of the topic filter was not accepted and the server does not want to specify a
    /// reason or none of the other reason codes apply.
    UnspecifiedError = 128,

    /// Returned when the topic filter was valid but the server does not accept an unsubscribe for it.
    ImplementationSpecificError = 131,

    /// Returned when the client was not authorized to unsubscribe from that topic filter on the server.
    NotAuthorized = 135,

    /// Returned when the topic filter was correctly formed but is not allowed for the client on the server.
    TopicFilterInvalid = 143,

    /// Returned when the packet identifier was already in use on the server.
    PacketIdentifierInUse = 145,
}

impl UnsubackReasonCode {
    /// Returns whether or not the reason code represents a successful unsubscribe
    pub fn is_success(&self) -> bool {
        matches!(self, UnsubackReasonCode::Success | UnsubackReasonCode::NoSubscriptionExisted)
    }
}

/// Reason code that specifies the response to a received AUTH packet.
///
/// Enum values match [MQTT5 spec](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901220) encoding values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AuthenticateReasonCode {

    /// Notification that the authentication exchange is both complete and considered successful.
    #[default]
    Success = 0,

    /// A request that the recipient should continue the authentication exchange.
    ContinueAuthentication = 24,

    /// The associated packet represents an attempt to reauthenticate an established connection.
    ReAuthenticate = 25,
}

/// Data model for MQTT5 user properties.
///
/// A user property is a name-value pair of utf-8 strings that can be added to mqtt5 packets. Names are
/// not unique; a given name value can appear more than once in a packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UserProperty {

    /// User property name
    pub name: String,

    /// User property value
    pub value: String,
}

/// Specifies a single subscription within a Subscribe operation
///
/// See [MQTT5 Subscription Options](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901169)
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Subscription {

    /// Topic filter to subscribe to
    pub topic_filter: String,

    /// Maximum QoS on which the subscriber will accept publish messages.  Negotiated QoS may be different.
    pub qos: QualityOfService,

    /// Should the server not send publishes to a client when that client was the one who sent the publish?
    pub no_local: bool,

    /// Should messages sent due to this subscription keep the retain flag preserved on the message?
    pub retain_as_published: bool,

    /// Should retained messages on matching topics be sent in reaction to this subscription?
    pub retain_handling_type: RetainHandlingType,
}

impl Subscription {

    /// Creates a subscription to a topic filter with default options
    pub fn new(topic_filter: &str, qos: QualityOfService) -> Self {
        Subscription {
            topic_filter: topic_filter.to_string(),
            qos,
            ..Default::default()
        }
    }
}

/// Data model of an [MQTT5 AUTH](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901217) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AuthPacket {

    /// Specifies an endpoint's response to a previously-received AUTH packet as part of an authentication exchange.
    pub reason_code: AuthenticateReasonCode,

    /// Authentication method this packet corresponds to.  The authentication method must remain the
    /// same for the entirety of an authentication exchange.
    pub authentication_method: Option<String>,

    /// Method-specific binary data included in this step of an authentication exchange.
    pub authentication_data: Option<Vec<u8>>,

    /// Additional diagnostic information or context.
    pub reason_string: Option<String>,

    /// Set of MQTT5 user properties included with the packet.
    pub user_properties: Option<Vec<UserProperty>>,
}

/// Data model of an [MQTT5 CONNACK](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901074) packet.
///
/// Every optional property distinguishes "not sent" from an explicit value; the client only overrides
/// its negotiated settings for properties the server actually included.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConnackPacket {

    /// True if the client rejoined an existing session on the server, false otherwise.
    pub session_present: bool,

    /// Indicates either success or the reason for failure for the connection attempt.
    pub reason_code: ConnectReasonCode,

    /// A time interval, in seconds, that the server will persist this connection's MQTT session state
    /// for.  If present, this value overrides any session expiry specified in the preceding CONNECT packet.
    pub session_expiry_interval: Option<u32>,

    /// The maximum amount of in-flight QoS 1 or 2 messages that the server is willing to handle at once.  If omitted,
    /// the limit is based on the valid MQTT packet id space (65535).
    pub receive_maximum: Option<u16>,

    /// The maximum message delivery quality of service that the server will allow on this connection.
    pub maximum_qos: Option<QualityOfService>,

    /// Indicates whether the server supports retained messages.  If undefined, retained messages are
    /// supported.
    pub retain_available: Option<bool>,

    /// Specifies the maximum packet size, in bytes, that the server is willing to accept.  If undefined, there
    /// is no limit beyond what is imposed by the MQTT spec itself.
    pub maximum_packet_size: Option<u32>,

    /// Specifies a client identifier assigned to this connection by the server.  Only valid when the client id of
    /// the preceding CONNECT packet was left empty.
    pub assigned_client_identifier: Option<String>,

    /// The maximum topic alias value that the server will accept from the client.
    pub topic_alias_maximum: Option<u16>,

    /// Additional diagnostic information about the result of the connection attempt.
    pub reason_string: Option<String>,

    /// Set of MQTT5 user properties included with the packet.
    pub user_properties: Option<Vec<UserProperty>>,

    /// Indicates whether the server supports wildcard subscriptions.  If undefined, wildcard subscriptions
    /// are supported.
    pub wildcard_subscriptions_available: Option<bool>,

    /// Indicates whether the server supports subscription identifiers.  If undefined, subscription identifiers
    /// are supported.
    pub subscription_identifiers_available: Option<bool>,

    /// Indicates whether the server supports shared subscription topic filters.  If undefined, shared subscriptions
    /// are supported.
    pub shared_subscriptions_available: Option<bool>,

    /// Server-requested override of the keep alive interval, in seconds.  If undefined, the keep alive value sent
    /// by the client should be used.
    pub server_keep_alive: Option<u16>,

    /// A value that can be used in the creation of a response topic associated with this connection.
    pub response_information: Option<String>,

    /// Property indicating an alternate server that the client may temporarily or permanently attempt
    /// to connect to instead of the configured endpoint.
    pub server_reference: Option<String>,

    /// Authentication method used in the authentication exchange that led to this CONNACK packet being sent.
    pub authentication_method: Option<String>,

    /// Authentication method specific binary data associated with the authentication exchange that led to this
    /// CONNACK packet being sent.
    pub authentication_data: Option<Vec<u8>>,
}

/// Data model of an [MQTT5 CONNECT](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901033) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConnectPacket {

    /// The maximum time interval, in seconds, that is permitted to elapse between the point at which the client
    /// finishes transmitting one MQTT packet and the point it starts sending the next.  Zero disables keep alive.
    pub keep_alive_interval_seconds: u16,

    /// Clean start is a boolean flag that indicates whether the server should discard any existing session state.
    pub clean_start: bool,

    /// A unique string identifying the client to the server.
    pub client_id: Option<String>,

    /// A string value that the server may use for client authentication and authorization.
    pub username: Option<String>,

    /// Opaque binary data that the server may use for client authentication and authorization.
    pub password: Option<Vec<u8>>,

    /// A time interval, in seconds, that the client requests the server to persist this connection's MQTT session state
    /// for.
    pub session_expiry_interval_seconds: Option<u32>,

    /// If true, requests that the server send response information in the subsequent CONNACK.
    pub request_response_information: Option<bool>,

    /// If true, requests that the server send additional diagnostic information (via response string or
    /// user properties) in DISCONNECT or CONNACK packets from the server.
    pub request_problem_information: Option<bool>,

    /// Notifies the server of the maximum number of in-flight QoS 1 and 2 messages the client is willing to handle.  If
    /// omitted, then no limit is requested.
    pub receive_maximum: Option<u16>,

    /// Maximum number of topic aliases that the client will accept for incoming publishes.
    pub topic_alias_maximum: Option<u16>,

    /// Notifies the server of the maximum packet size the client is willing to handle.  If
    /// omitted, then no limit beyond the natural limits of MQTT packet size is requested.
    pub maximum_packet_size_bytes: Option<u32>,

    /// Notifies the server that the client wishes to use a specific authentication method as part of the connection
    /// process.
    pub authentication_method: Option<String>,

    /// Additional authentication method specific binary data supplied as part of kicking off an authentication
    /// exchange.
    pub authentication_data: Option<Vec<u8>>,

    /// A time interval, in seconds, that the server should wait (for a session reconnection) before sending the
    /// will message associated with the connection's session.
    pub will_delay_interval_seconds: Option<u32>,

    /// The definition of a message to be published when the connection's session is destroyed by the server or when
    /// the will delay interval has elapsed, whichever comes first.
    pub will: Option<PublishPacket>,

    /// Set of MQTT5 user properties included with the packet.
    pub user_properties: Option<Vec<UserProperty>>,
}

impl ConnectPacket {

    /// Creates a new builder for a ConnectPacket.
    pub fn builder() -> ConnectPacketBuilder {
        ConnectPacketBuilder::new()
    }
}

/// Builder type for ConnectPacket instances
pub struct ConnectPacketBuilder {
    packet: ConnectPacket
}

impl ConnectPacketBuilder {
    pub(crate) fn new() -> Self {
        ConnectPacketBuilder {
            packet: ConnectPacket {
                ..Default::default()
            }
        }
    }

    /// Sets the keep alive interval, in seconds.  Zero disables keep alive.
    pub fn with_keep_alive_interval_seconds(mut self, keep_alive: u16) -> Self {
        self.packet.keep_alive_interval_seconds = keep_alive;
        self
    }

    /// Sets whether the server should discard any existing session state.
    pub fn with_clean_start(mut self, clean_start: bool) -> Self {
        self.packet.clean_start = clean_start;
        self
    }

    /// Sets the client identifier.
    pub fn with_client_id(mut self, client_id: &str) -> Self {
        self.packet.client_id = Some(client_id.to_string());
        self
    }

    /// Sets the username used for authentication.
    pub fn with_username(mut self, username: &str) -> Self {
        self.packet.username = Some(username.to_string());
        self
    }

    /// Sets the password used for authentication.
    pub fn with_password(mut self, password: &[u8]) -> Self {
        self.packet.password = Some(password.to_vec());
        self
    }

    /// Sets the session expiry interval, in seconds.
    pub fn with_session_expiry_interval_seconds(mut self, session_expiry_interval_seconds: u32) -> Self {
        self.packet.session_expiry_interval_seconds = Some(session_expiry_interval_seconds);
        self
    }

    /// Sets the maximum number of in-flight QoS 1 and 2 publishes the server may send us at once.
    pub fn with_receive_maximum(mut self, receive_maximum: u16) -> Self {
        self.packet.receive_maximum = Some(receive_maximum);
        self
    }

    /// Sets the largest packet, in bytes, the client is willing to accept.
    pub fn with_maximum_packet_size_bytes(mut self, maximum_packet_size_bytes: u32) -> Self {
        self.packet.maximum_packet_size_bytes = Some(maximum_packet_size_bytes);
        self
    }

    /// Sets the extended authentication method and the data that starts the exchange.
    pub fn with_authentication(mut self, method: &str, data: Option<Vec<u8>>) -> Self {
        self.packet.authentication_method = Some(method.to_string());
        self.packet.authentication_data = data;
        self
    }

    /// Sets the will message and the delay before the server publishes it.
    pub fn with_will(mut self, will: PublishPacket, will_delay_interval_seconds: Option<u32>) -> Self {
        self.packet.will = Some(will);
        self.packet.will_delay_interval_seconds = will_delay_interval_seconds;
        self
    }

    /// Adds a user property to the set of MQTT5 user properties included with the packet.
    pub fn with_user_property(mut self, property: UserProperty) -> Self {
        self.packet.user_properties.get_or_insert_with(Vec::new).push(property);
        self
    }

    /// Builds a new ConnectPacket.  Consumes the builder in the process.
    pub fn build(self) -> ConnectPacket {
        self.packet
    }
}

/// Data model of an [MQTT5 DISCONNECT](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901205) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DisconnectPacket {

    /// Value indicating the reason that the sender is closing the connection
    pub reason_code: DisconnectReasonCode,

    /// Requests a change to the session expiry interval negotiated at connection time as part of the disconnect.  Only
    /// valid for DISCONNECT packets sent from client to server.
    pub session_expiry_interval_seconds: Option<u32>,

    /// Additional diagnostic information about the reason that the sender is closing the connection
    pub reason_string: Option<String>,

    /// Set of MQTT5 user properties included with the packet.
    pub user_properties: Option<Vec<UserProperty>>,

    /// Property indicating an alternate server that the client may temporarily or permanently attempt
    /// to connect to instead of the configured endpoint.
    pub server_reference: Option<String>,
}

impl DisconnectPacket {

    /// Creates a new builder for a DisconnectPacket.
    pub fn builder() -> DisconnectPacketBuilder {
        DisconnectPacketBuilder::new()
    }
}

/// Builder type for DisconnectPacket instances
pub struct DisconnectPacketBuilder {
    packet: DisconnectPacket
}

impl DisconnectPacketBuilder {
    pub(crate) fn new() -> Self {
        DisconnectPacketBuilder {
            packet: DisconnectPacket {
                ..Default::default()
            }
        }
    }

    /// Sets a value indicating the reason that the sender is closing the connection
    pub fn with_reason_code(mut self, reason_code: DisconnectReasonCode) -> Self {
        self.packet.reason_code = reason_code;
        self
    }

    /// Requests a change to the session expiry interval negotiated at connection time.
    pub fn with_session_expiry_interval_seconds(mut self, session_expiry_interval_seconds: u32) -> Self {
        self.packet.session_expiry_interval_seconds = Some(session_expiry_interval_seconds);
        self
    }

    /// Sets additional diagnostic information about the reason that the sender is closing the connection
    pub fn with_reason_string(mut self, reason_string: &str) -> Self {
        self.packet.reason_string = Some(reason_string.to_string());
        self
    }

    /// Adds a user property to the set of MQTT5 user properties included with the packet.
    pub fn with_user_property(mut self, property: UserProperty) -> Self {
        self.packet.user_properties.get_or_insert_with(Vec::new).push(property);
        self
    }

    /// Builds a new DisconnectPacket.  Consumes the builder in the process.
    pub fn build(self) -> DisconnectPacket {
        self.packet
    }
}

/// Data model of an [MQTT5 PINGREQ](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901195) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PingreqPacket {}

/// Data model of an [MQTT5 PINGRESP](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901200) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PingrespPacket {}

/// Data model of an [MQTT5 PUBACK](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901121) packet
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PubackPacket {

    /// Id of the QoS 1 publish this packet is acknowledging
    pub packet_id: u16,

    /// Success indicator or failure reason for the associated PUBLISH packet.
    pub reason_code: PubackReasonCode,

    /// Additional diagnostic information about the result of the PUBLISH attempt.
    pub reason_string: Option<String>,

    /// Set of MQTT5 user properties included with the packet.
    pub user_properties: Option<Vec<UserProperty>>,
}

/// Data model of an [MQTT5 PUBCOMP](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901151) packet
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PubcompPacket {

    /// Id of the QoS 2 publish this packet corresponds to
    pub packet_id: u16,

    /// Success indicator or failure reason for the final step of a QoS 2 PUBLISH delivery.
    pub reason_code: PubcompReasonCode,

    /// Additional diagnostic information about the final step of a QoS 2 PUBLISH delivery.
    pub reason_string: Option<String>,

    /// Set of MQTT5 user properties included with the packet.
    pub user_properties: Option<Vec<UserProperty>>,
}

/// Data model of an [MQTT5 PUBLISH](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901100) packet
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PublishPacket {

    /// Packet Id of the publish.  Set by the client on outbound QoS 1 and 2 publishes; any value supplied by
    /// the user is overwritten.
    pub packet_id: u16,

    /// Sent publishes - the topic this message should be published to.
    ///
    /// Received publishes - the topic this message was published to.
    pub topic: String,

    /// Sent publishes - the MQTT quality of service level this message should be delivered with.
    ///
    /// Received publishes - the MQTT quality of service level this message was delivered at.
    pub qos: QualityOfService,

    /// True if this is a retransmission of a previously-sent PUBLISH packet
    pub duplicate: bool,

    /// True if this is a retained message, false otherwise.
    pub retain: bool,

    /// The payload of the publish message.
    pub payload: Option<Vec<u8>>,

    /// Property specifying the format of the payload data.
    pub payload_format: Option<PayloadFormatIndicator>,

    /// Maximum amount of time allowed to elapse for message delivery before the server
    /// should instead delete the message (relative to a recipient).
    pub message_expiry_interval_seconds: Option<u32>,

    /// Topic alias to use, if possible, when encoding this packet.
    pub topic_alias: Option<u16>,

    /// Opaque topic string intended to assist with request/response implementations.
    pub response_topic: Option<String>,

    /// Opaque binary data used to correlate between publish messages.
    pub correlation_data: Option<Vec<u8>>,

    /// The subscription identifiers of all the subscriptions this message matched (inbound publishes only).
    pub subscription_identifiers: Option<Vec<u32>>,

    /// Property specifying the content type of the payload.
    pub content_type: Option<String>,

    /// Set of MQTT5 user properties included with the packet.
    pub user_properties: Option<Vec<UserProperty>>,
}

impl PublishPacket {

    /// Creates a new builder for a PublishPacket.
    pub fn builder(topic: &str, qos: QualityOfService) -> PublishPacketBuilder {
        PublishPacketBuilder::new(topic, qos)
    }
}

/// Builder type for PublishPacket instances
pub struct PublishPacketBuilder {
    packet: PublishPacket
}

impl PublishPacketBuilder {
    pub(crate) fn new(topic: &str, qos: QualityOfService) -> Self {
        PublishPacketBuilder {
            packet: PublishPacket {
                topic: topic.to_string(),
                qos,
                ..Default::default()
            }
        }
    }

    /// Sets if this should be a retained message
    pub fn with_retain(mut self, retain: bool) -> Self {
        self.packet.retain = retain;
        self
    }

    /// Sets the payload of the publish message.
    pub fn with_payload(mut self, payload: &[u8]) -> Self {
        self.packet.payload = Some(payload.to_vec());
        self
    }

    /// Sets a property specifying the format of the payload data.
    pub fn with_payload_format(mut self, payload_format: PayloadFormatIndicator) -> Self {
        self.packet.payload_format = Some(payload_format);
        self
    }

    /// Sets the maximum amount of time allowed to elapse for message delivery.
    pub fn with_message_expiry_interval_seconds(mut self, message_expiry_interval_seconds: u32) -> Self {
        self.packet.message_expiry_interval_seconds = Some(message_expiry_interval_seconds);
        self
    }

    /// Sets an opaque topic string intended to assist with request/response implementations.
    pub fn with_response_topic(mut self, response_topic: &str) -> Self {
        self.packet.response_topic = Some(response_topic.to_string());
        self
    }

    /// Sets opaque binary data used to correlate between publish messages.
    pub fn with_correlation_data(mut self, correlation_data: &[u8]) -> Self {
        self.packet.correlation_data = Some(correlation_data.to_vec());
        self
    }

    /// Sets a property specifying the content type of the payload.
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.packet.content_type = Some(content_type.to_string());
        self
    }

    /// Adds a user property to the set of MQTT5 user properties included with the packet.
    pub fn with_user_property(mut self, property: UserProperty) -> Self {
        self.packet.user_properties.get_or_insert_with(Vec::new).push(property);
        self
    }

    /// Builds a new PublishPacket.  Consumes the builder in the process.
    pub fn build(self) -> PublishPacket {
        self.packet
    }
}

/// Data model of an [MQTT5 PUBREC](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901131) packet
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PubrecPacket {

    /// Id of the QoS 2 publish this packet corresponds to
    pub packet_id: u16,

    /// Success indicator or failure reason for the initial step of the QoS 2 PUBLISH delivery process.
    pub reason_code: PubrecReasonCode,

    /// Additional diagnostic information about the result of the PUBLISH attempt.
    pub reason_string: Option<String>,

    /// Set of MQTT5 user properties included with the packet.
    pub user_properties: Option<Vec<UserProperty>>,
}

/// Data model of an [MQTT5 PUBREL](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901141) packet
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PubrelPacket {

    /// Id of the QoS 2 publish this packet corresponds to
    pub packet_id: u16,

    /// Success indicator or failure reason for the middle step of the QoS 2 PUBLISH delivery process.
    pub reason_code: PubrelReasonCode,

    /// Additional diagnostic information about the ongoing QoS 2 PUBLISH delivery process.
    pub reason_string: Option<String>,

    /// Set of MQTT5 user properties included with the packet.
    pub user_properties: Option<Vec<UserProperty>>,
}

/// Data model of an [MQTT5 SUBACK](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901171) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubackPacket {

    /// Id of the subscribe this packet is acknowledging
    pub packet_id: u16,

    /// Additional diagnostic information about the result of the SUBSCRIBE attempt.
    pub reason_string: Option<String>,

    /// Set of MQTT5 user properties included with the packet.
    pub user_properties: Option<Vec<UserProperty>>,

    /// A list of reason codes indicating the result of each individual subscription entry in the
    /// associated SUBSCRIBE packet, in request order.
    pub reason_codes: Vec<SubackReasonCode>,
}

/// Data model of an [MQTT5 SUBSCRIBE](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901161) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubscribePacket {

    /// Packet Id of the subscribe.  Always set by the client; any value supplied by the user is overwritten.
    pub packet_id: u16,

    /// List of topic filter subscriptions that the client wishes to listen to
    pub subscriptions: Vec<Subscription>,

    /// A positive integer to associate with all subscriptions in this request.  Publish packets that match
    /// a subscription in this request should include this identifier in the resulting message.
    pub subscription_identifier: Option<u32>,

    /// Set of MQTT5 user properties included with the packet.
    pub user_properties: Option<Vec<UserProperty>>,
}

impl SubscribePacket {

    /// Creates a new builder for a SubscribePacket.
    pub fn builder() -> SubscribePacketBuilder {
        SubscribePacketBuilder::new()
    }
}

/// Builder type for SubscribePacket instances
pub struct SubscribePacketBuilder {
    packet: SubscribePacket
}

impl SubscribePacketBuilder {
    pub(crate) fn new() -> Self {
        SubscribePacketBuilder {
            packet: SubscribePacket {
                ..Default::default()
            }
        }
    }

    /// Adds a subscription to the list of subscriptions within the packet.
    pub fn with_subscription(mut self, subscription: Subscription) -> Self {
        self.packet.subscriptions.push(subscription);
        self
    }

    /// Adds a subscription to a topic filter with default options.
    pub fn with_simple_subscription(mut self, topic_filter: &str, qos: QualityOfService) -> Self {
        self.packet.subscriptions.push(Subscription::new(topic_filter, qos));
        self
    }

    /// Sets the subscription identifier to associate with all subscriptions in this request.
    pub fn with_subscription_identifier(mut self, subscription_identifier: u32) -> Self {
        self.packet.subscription_identifier = Some(subscription_identifier);
        self
    }

    /// Adds a user property to the set of MQTT5 user properties included with the packet.
    pub fn with_user_property(mut self, property: UserProperty) -> Self {
        self.packet.user_properties.get_or_insert_with(Vec::new).push(property);
        self
    }

    /// Builds a new SubscribePacket.  Consumes the builder in the process.
    pub fn build(self) -> SubscribePacket {
        self.packet
    }
}

/// Data model of an [MQTT5 UNSUBACK](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901187) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UnsubackPacket {

    /// Id of the unsubscribe this packet is acknowledging
    pub packet_id: u16,

    /// Additional diagnostic information about the result of the UNSUBSCRIBE attempt.
    pub reason_string: Option<String>,

    /// Set of MQTT5 user properties included with the packet.
    pub user_properties: Option<Vec<UserProperty>>,

    /// A list of reason codes indicating the result of unsubscribing from each individual topic filter entry in the
    /// associated UNSUBSCRIBE packet, in request order.
    pub reason_codes: Vec<UnsubackReasonCode>,
}

/// Data model of an [MQTT5 UNSUBSCRIBE](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901179) packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UnsubscribePacket {

    /// Packet Id of the unsubscribe.  Always set by the client; any value supplied by the user is overwritten.
    pub packet_id: u16,

    /// List of topic filters that the client wishes to unsubscribe from.
    pub topic_filters: Vec<String>,

    /// Set of MQTT5 user properties included with the packet.
    pub user_properties: Option<Vec<UserProperty>>,
}

impl UnsubscribePacket {

    /// Creates a new builder for an UnsubscribePacket.
    pub fn builder() -> UnsubscribePacketBuilder {
        UnsubscribePacketBuilder::new()
    }
}

/// Builder type for UnsubscribePacket instances
pub struct UnsubscribePacketBuilder {
    packet: UnsubscribePacket
}

impl UnsubscribePacketBuilder {
    pub(crate) fn new() -> Self {
        UnsubscribePacketBuilder {
            packet: UnsubscribePacket {
                ..Default::default()
            }
        }
    }

    /// Adds a topic filter to the list of topic filters to unsubscribe from.
    pub fn with_topic_filter(mut self, topic_filter: &str) -> Self {
        self.packet.topic_filters.push(topic_filter.to_string());
        self
    }

    /// Adds a user property to the set of MQTT5 user properties included with the packet.
    pub fn with_user_property(mut self, property: UserProperty) -> Self {
        self.packet.user_properties.get_or_insert_with(Vec::new).push(property);
        self
    }

    /// Builds a new UnsubscribePacket.  Consumes the builder in the process.
    pub fn build(self) -> UnsubscribePacket {
        self.packet
    }
}

/// Algebraic union of all MQTT5 packet types.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MqttPacket {
    /// A CONNECT packet
    Connect(ConnectPacket),
    /// A CONNACK packet
    Connack(ConnackPacket),
    /// A PUBLISH packet
    Publish(PublishPacket),
    /// A PUBACK packet
    Puback(PubackPacket),
    /// A PUBREC packet
    Pubrec(PubrecPacket),
    /// A PUBREL packet
    Pubrel(PubrelPacket),
    /// A PUBCOMP packet
    Pubcomp(PubcompPacket),
    /// A SUBSCRIBE packet
    Subscribe(SubscribePacket),
    /// A SUBACK packet
    Suback(SubackPacket),
    /// An UNSUBSCRIBE packet
    Unsubscribe(UnsubscribePacket),
    /// An UNSUBACK packet
    Unsuback(UnsubackPacket),
    /// A PINGREQ packet
    Pingreq(PingreqPacket),
    /// A PINGRESP packet
    Pingresp(PingrespPacket),
    /// A DISCONNECT packet
    Disconnect(DisconnectPacket),
    /// An AUTH packet
    Auth(AuthPacket),
}

impl MqttPacket {

    /// Returns the kind of this packet
    pub fn packet_type(&self) -> PacketType {
        utils::mqtt_packet_to_packet_type(self)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// An enum indicating the kind of MQTT packet
pub enum PacketType {
    /// A [Connect](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901033) packet
    Connect,

    /// A [Connack](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901074) packet
    Connack,

    /// A [Publish](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901100) packet
    Publish,

    /// A [Puback](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901121) packet
    Puback,

    /// A [Pubrec](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901131) packet
    Pubrec,

    /// A [Pubrel](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901141) packet
    Pubrel,

    /// A [Pubcomp](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901151) packet
    Pubcomp,

    /// A [Subscribe](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901161) packet
    Subscribe,

    /// A [Suback](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901171) packet
    Suback,

    /// An [Unsubscribe](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901179) packet
    Unsubscribe,

    /// An [Unsuback](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901187) packet
    Unsuback,

    /// A [Pingreq](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901195) packet
    Pingreq,

    /// A [Pingresp](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901200) packet
    Pingresp,

    /// A [Disconnect](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901205) packet
    Disconnect,

    /// An [Auth](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901217) packet
    Auth,
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketType::Connect => { write!(f, "ConnectPacket") }
            PacketType::Connack => { write!(f, "ConnackPacket") }
            PacketType::Publish => { write!(f, "PublishPacket") }
            PacketType::Puback => { write!(f, "PubackPacket") }
            PacketType::Pubrec => { write!(f, "PubrecPacket") }
            PacketType::Pubrel => { write!(f, "PubrelPacket") }
            PacketType::Pubcomp => { write!(f, "PubcompPacket") }
            PacketType::Subscribe => { write!(f, "SubscribePacket") }
            PacketType::Suback => { write!(f, "SubackPacket") }
            PacketType::Unsubscribe => { write!(f, "UnsubscribePacket") }
            PacketType::Unsuback => { write!(f, "UnsubackPacket") }
            PacketType::Pingreq => { write!(f, "PingreqPacket") }
            PacketType::Pingresp => { write!(f, "PingrespPacket") }
            PacketType::Disconnect => { write!(f, "DisconnectPacket") }
            PacketType::Auth => { write!(f, "AuthPacket") }
        }
    }
}
