/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::mqtt::*;
use crate::mqtt::utils::*;

use log::*;
use std::fmt;
use std::fmt::Write;

impl fmt::Display for UserProperty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {}) ", self.name, self.value)
    }
}

fn create_user_properties_log_string(properties: &[UserProperty]) -> String {
    let mut val : String = "[ ".to_string();
    for property in properties {
        write!(&mut val, " (\"{}\",\"{}\")", property.name, property.value).ok();
    }
    write!(&mut val, " ]").ok();
    val
}

macro_rules! define_enum_display_trait {
    ($enum_type: ident) => {
        impl fmt::Display for $enum_type {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{:?} ({})", self, *self as u8)
            }
        }
    };
}

define_enum_display_trait!(PayloadFormatIndicator);
define_enum_display_trait!(RetainHandlingType);
define_enum_display_trait!(ConnectReasonCode);
define_enum_display_trait!(PubackReasonCode);
define_enum_display_trait!(PubrecReasonCode);
define_enum_display_trait!(PubrelReasonCode);
define_enum_display_trait!(PubcompReasonCode);
define_enum_display_trait!(DisconnectReasonCode);
define_enum_display_trait!(SubackReasonCode);
define_enum_display_trait!(UnsubackReasonCode);
define_enum_display_trait!(AuthenticateReasonCode);

impl fmt::Display for QualityOfService {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", quality_of_service_to_str(*self))
    }
}

macro_rules! log_primitive_value {
    ($integral_value: expr, $formatter: expr, $log_field: expr) => {
        write!($formatter, " {}:{}", $log_field, $integral_value)?;
    };
}

macro_rules! log_optional_primitive_value {
    ($optional_integral_value: expr, $formatter: expr, $log_field: expr) => {
        if let Some(value) = &$optional_integral_value {
            write!($formatter, " {}:{}", $log_field, value)?;
        }
    };
}

macro_rules! log_string {
    ($value: expr, $formatter: expr, $log_field: expr) => {
        write!($formatter, " {}:\"{}\"", $log_field, $value)?;
    };
}

macro_rules! log_optional_string {
    ($optional_string: expr, $formatter: expr, $log_field: expr) => {
        if let Some(value) = &$optional_string {
            write!($formatter, " {}:\"{}\"", $log_field, value)?;
        }
    };
}

macro_rules! log_optional_binary_data {
    ($optional_data: expr, $formatter: expr, $log_field: expr) => {
        if let Some(value) = &$optional_data {
            write!($formatter, " {}:<{} Bytes>", $log_field, value.len())?;
        }
    };
}

macro_rules! log_optional_sensitive {
    ($optional_data: expr, $formatter: expr, $log_field: expr) => {
        if $optional_data.is_some() {
            write!($formatter, " {}:<...redacted>", $log_field)?;
        }
    };
}

macro_rules! log_user_properties {
    ($user_properties: expr, $formatter: expr, $log_field: expr) => {
        if let Some(value) = &$user_properties {
            write!($formatter, " {}:{}", $log_field, create_user_properties_log_string(value))?;
        }
    };
}

macro_rules! define_ack_packet_display_trait {
    ($packet_type: ident, $packet_name: expr) => {
        impl fmt::Display for $packet_type {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{} {{", $packet_name)?;
                log_primitive_value!(self.packet_id, f, "packet_id");
                log_primitive_value!(self.reason_code, f, "reason_code");
                log_optional_string!(self.reason_string, f, "reason_string");
                log_user_properties!(self.user_properties, f, "user_properties");
                write!(f, " }}")
            }
        }
    };
}

define_ack_packet_display_trait!(PubackPacket, "PubackPacket");
define_ack_packet_display_trait!(PubrecPacket, "PubrecPacket");
define_ack_packet_display_trait!(PubrelPacket, "PubrelPacket");
define_ack_packet_display_trait!(PubcompPacket, "PubcompPacket");

impl fmt::Display for AuthPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AuthPacket {{")?;
        log_primitive_value!(self.reason_code, f, "reason_code");
        log_optional_string!(self.authentication_method, f, "authentication_method");
        log_optional_sensitive!(self.authentication_data, f, "authentication_data");
        log_optional_string!(self.reason_string, f, "reason_string");
        log_user_properties!(self.user_properties, f, "user_properties");
        write!(f, " }}")
    }
}

impl fmt::Display for ConnackPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ConnackPacket {{")?;
        log_primitive_value!(self.session_present, f, "session_present");
        log_primitive_value!(self.reason_code, f, "reason_code");
        log_optional_primitive_value!(self.session_expiry_interval, f, "session_expiry_interval");
        log_optional_primitive_value!(self.receive_maximum, f, "receive_maximum");
        log_optional_primitive_value!(self.maximum_qos, f, "maximum_qos");
        log_optional_primitive_value!(self.retain_available, f, "retain_available");
        log_optional_primitive_value!(self.maximum_packet_size, f, "maximum_packet_size");
        log_optional_string!(self.assigned_client_identifier, f, "assigned_client_identifier");
        log_optional_primitive_value!(self.topic_alias_maximum, f, "topic_alias_maximum");
        log_optional_string!(self.reason_string, f, "reason_string");
        log_user_properties!(self.user_properties, f, "user_properties");
        log_optional_primitive_value!(self.wildcard_subscriptions_available, f, "wildcard_subscriptions_available");
        log_optional_primitive_value!(self.subscription_identifiers_available, f, "subscription_identifiers_available");
        log_optional_primitive_value!(self.shared_subscriptions_available, f, "shared_subscriptions_available");
        log_optional_primitive_value!(self.server_keep_alive, f, "server_keep_alive");
        log_optional_string!(self.response_information, f, "response_information");
        log_optional_string!(self.server_reference, f, "server_reference");
        log_optional_string!(self.authentication_method, f, "authentication_method");
        log_optional_sensitive!(self.authentication_data, f, "authentication_data");
        write!(f, " }}")
    }
}

impl fmt::Display for ConnectPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ConnectPacket {{")?;
        log_primitive_value!(self.keep_alive_interval_seconds, f, "keep_alive_interval_seconds");
        log_primitive_value!(self.clean_start, f, "clean_start");
        log_optional_string!(self.client_id, f, "client_id");
        log_optional_string!(self.username, f, "username");
        log_optional_sensitive!(self.password, f, "password");
        log_optional_primitive_value!(self.session_expiry_interval_seconds, f, "session_expiry_interval_seconds");
        log_optional_primitive_value!(self.request_response_information, f, "request_response_information");
        log_optional_primitive_value!(self.request_problem_information, f, "request_problem_information");
        log_optional_primitive_value!(self.receive_maximum, f, "receive_maximum");
        log_optional_primitive_value!(self.topic_alias_maximum, f, "topic_alias_maximum");
        log_optional_primitive_value!(self.maximum_packet_size_bytes, f, "maximum_packet_size_bytes");
        log_optional_string!(self.authentication_method, f, "authentication_method");
        log_optional_sensitive!(self.authentication_data, f, "authentication_data");
        log_optional_primitive_value!(self.will_delay_interval_seconds, f, "will_delay_interval_seconds");
        if let Some(will) = &self.will {
            write!(f, " will:{}", will)?;
        }
        log_user_properties!(self.user_properties, f, "user_properties");
        write!(f, " }}")
    }
}

impl fmt::Display for DisconnectPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DisconnectPacket {{")?;
        log_primitive_value!(self.reason_code, f, "reason_code");
        log_optional_primitive_value!(self.session_expiry_interval_seconds, f, "session_expiry_interval_seconds");
        log_optional_string!(self.reason_string, f, "reason_string");
        log_user_properties!(self.user_properties, f, "user_properties");
        log_optional_string!(self.server_reference, f, "server_reference");
        write!(f, " }}")
    }
}

impl fmt::Display for PingreqPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PingreqPacket {{}}")
    }
}

impl fmt::Display for PingrespPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PingrespPacket {{}}")
    }
}

impl fmt::Display for PublishPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PublishPacket {{")?;
        if self.qos != QualityOfService::AtMostOnce {
            log_primitive_value!(self.packet_id, f, "packet_id");
        }
        log_string!(self.topic, f, "topic");
        log_primitive_value!(self.qos, f, "qos");
        log_primitive_value!(self.duplicate, f, "duplicate");
        log_primitive_value!(self.retain, f, "retain");
        log_optional_binary_data!(self.payload, f, "payload");
        log_optional_primitive_value!(self.payload_format, f, "payload_format");
        log_optional_primitive_value!(self.message_expiry_interval_seconds, f, "message_expiry_interval_seconds");
        log_optional_primitive_value!(self.topic_alias, f, "topic_alias");
        log_optional_string!(self.response_topic, f, "response_topic");
        log_optional_binary_data!(self.correlation_data, f, "correlation_data");
        if let Some(subscription_identifiers) = &self.subscription_identifiers {
            write!(f, " subscription_identifiers:{:?}", subscription_identifiers)?;
        }
        log_optional_string!(self.content_type, f, "content_type");
        log_user_properties!(self.user_properties, f, "user_properties");
        write!(f, " }}")
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        log_string!(self.topic_filter, f, "topic_filter");
        log_primitive_value!(self.qos, f, "qos");
        log_primitive_value!(self.no_local, f, "no_local");
        log_primitive_value!(self.retain_as_published, f, "retain_as_published");
        log_primitive_value!(self.retain_handling_type, f, "retain_handling_type");
        write!(f, " )")
    }
}

impl fmt::Display for SubscribePacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SubscribePacket {{")?;
        log_primitive_value!(self.packet_id, f, "packet_id");
        write!(f, " subscriptions: [")?;
        for subscription in &self.subscriptions {
            write!(f, " {}", subscription)?;
        }
        write!(f, " ]")?;
        log_optional_primitive_value!(self.subscription_identifier, f, "subscription_identifier");
        log_user_properties!(self.user_properties, f, "user_properties");
        write!(f, " }}")
    }
}

impl fmt::Display for SubackPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SubackPacket {{")?;
        log_primitive_value!(self.packet_id, f, "packet_id");
        log_optional_string!(self.reason_string, f, "reason_string");
        log_user_properties!(self.user_properties, f, "user_properties");
        write!(f, " reason_codes: [")?;
        for reason_code in &self.reason_codes {
            write!(f, " {}", reason_code)?;
        }
        write!(f, " ] }}")
    }
}

impl fmt::Display for UnsubscribePacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UnsubscribePacket {{")?;
        log_primitive_value!(self.packet_id, f, "packet_id");
        write!(f, " topic_filters: [")?;
        for topic_filter in &self.topic_filters {
            write!(f, " \"{}\"", topic_filter)?;
        }
        write!(f, " ]")?;
        log_user_properties!(self.user_properties, f, "user_properties");
        write!(f, " }}")
    }
}

impl fmt::Display for UnsubackPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UnsubackPacket {{")?;
        log_primitive_value!(self.packet_id, f, "packet_id");
        log_optional_string!(self.reason_string, f, "reason_string");
        log_user_properties!(self.user_properties, f, "user_properties");
        write!(f, " reason_codes: [")?;
        for reason_code in &self.reason_codes {
            write!(f, " {}", reason_code)?;
        }
        write!(f, " ] }}")
    }
}

impl fmt::Display for MqttPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MqttPacket::Connect(packet) => { packet.fmt(f) }
            MqttPacket::Connack(packet) => { packet.fmt(f) }
            MqttPacket::Publish(packet) => { packet.fmt(f) }
            MqttPacket::Puback(packet) => { packet.fmt(f) }
            MqttPacket::Pubrec(packet) => { packet.fmt(f) }
            MqttPacket::Pubrel(packet) => { packet.fmt(f) }
            MqttPacket::Pubcomp(packet) => { packet.fmt(f) }
            MqttPacket::Subscribe(packet) => { packet.fmt(f) }
            MqttPacket::Suback(packet) => { packet.fmt(f) }
            MqttPacket::Unsubscribe(packet) => { packet.fmt(f) }
            MqttPacket::Unsuback(packet) => { packet.fmt(f) }
            MqttPacket::Pingreq(packet) => { packet.fmt(f) }
            MqttPacket::Pingresp(packet) => { packet.fmt(f) }
            MqttPacket::Disconnect(packet) => { packet.fmt(f) }
            MqttPacket::Auth(packet) => { packet.fmt(f) }
        }
    }
}

/// Logs a packet at a verbosity that tracks the configured log level: just the packet kind at info,
/// the complete (sensitive-field redacted) packet at debug and below
pub(crate) fn log_packet(prefix: &str, packet: &MqttPacket) {
    match log::max_level() {
        LevelFilter::Info => {
            info!("{}{}", prefix, mqtt_packet_to_str(packet));
        }
        LevelFilter::Debug | LevelFilter::Trace => {
            debug!("{}{}", prefix, packet);
        }
        _ => {}
    }
}
