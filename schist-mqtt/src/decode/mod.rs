/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Internal module that reads framed MQTT5 packets off of an async byte stream and turns them into
modeled packets.
 */

pub(crate) mod utils;

use crate::decode::utils::*;
use crate::error::{MqttError, MqttResult};
use crate::mqtt::*;
use crate::mqtt::utils::*;

use log::*;
use tokio::io::{AsyncRead, AsyncReadExt};

fn decode_u8_as_enum<'a, T>(bytes: &'a[u8], value: &mut T, converter: fn(u8) -> MqttResult<T>) -> MqttResult<&'a[u8]> {
    let mut raw = 0;
    let remaining = decode_u8(bytes, &mut raw)?;
    *value = converter(raw)?;
    Ok(remaining)
}

fn decode_optional_u8_as_enum<'a, T>(bytes: &'a[u8], value: &mut Option<T>, converter: fn(u8) -> MqttResult<T>) -> MqttResult<&'a[u8]> {
    if value.is_some() {
        error!("Packet Decode - Invalid duplicate optional enum property");
        return Err(MqttError::new_decoding_failure("duplicate optional enum property"));
    }

    let mut raw = 0;
    let remaining = decode_u8(bytes, &mut raw)?;
    *value = Some(converter(raw)?);
    Ok(remaining)
}

// Splits a property section off the front of a packet body, returning (properties, remainder)
fn split_property_section<'a>(bytes: &'a[u8], packet_name: &str) -> MqttResult<(&'a[u8], &'a[u8])> {
    let mut properties_length = 0;
    let remaining = decode_vli_into_mutable(bytes, &mut properties_length)?;
    if properties_length > remaining.len() {
        error!("{}Packet Decode - property length exceeds remaining packet length", packet_name);
        return Err(MqttError::new_decoding_failure("property length exceeds remaining packet length"));
    }

    Ok((&remaining[..properties_length], &remaining[properties_length..]))
}

fn invalid_property(packet_name: &str, property_key: u8) -> MqttError {
    error!("{}Packet Decode - Invalid property type ({})", packet_name, property_key);
    MqttError::new_decoding_failure(format!("invalid {} property type ({})", packet_name, property_key))
}

fn check_fixed_header_flags(first_byte: u8, expected_flags: u8, packet_name: &str) -> MqttResult<()> {
    if (first_byte & 0x0F) != expected_flags {
        error!("{}Packet Decode - invalid fixed header flags ({})", packet_name, first_byte & 0x0F);
        return Err(MqttError::new_decoding_failure(format!("invalid fixed header flags for {} packet", packet_name)));
    }

    Ok(())
}

fn check_fully_consumed(remaining: &[u8], packet_name: &str) -> MqttResult<()> {
    if !remaining.is_empty() {
        error!("{}Packet Decode - {} unexpected trailing bytes", packet_name, remaining.len());
        return Err(MqttError::new_decoding_failure(format!("unexpected trailing bytes in {} packet", packet_name)));
    }

    Ok(())
}

macro_rules! define_ack_packet_decode_function {
    ($function_name: ident, $mqtt_packet_type: ident, $packet_type: ident, $packet_type_as_string: expr, $expected_flags: expr, $reason_code_converter_function_name: ident) => {
        fn $function_name(first_byte: u8, packet_body: &[u8]) -> MqttResult<MqttPacket> {
            check_fixed_header_flags(first_byte, $expected_flags, $packet_type_as_string)?;

            let mut packet = $packet_type { ..Default::default() };

            let mut mutable_body = packet_body;
            mutable_body = decode_u16(mutable_body, &mut packet.packet_id)?;
            if mutable_body.is_empty() {
                /* Success is the default, so nothing to do */
                return Ok(MqttPacket::$mqtt_packet_type(packet));
            }

            mutable_body = decode_u8_as_enum(mutable_body, &mut packet.reason_code, $reason_code_converter_function_name)?;
            if mutable_body.is_empty() {
                return Ok(MqttPacket::$mqtt_packet_type(packet));
            }

            let (mut properties, remaining) = split_property_section(mutable_body, $packet_type_as_string)?;
            check_fully_consumed(remaining, $packet_type_as_string)?;

            while !properties.is_empty() {
                let property_key = properties[0];
                properties = &properties[1..];

                match property_key {
                    PROPERTY_KEY_USER_PROPERTY => { properties = decode_user_property(properties, &mut packet.user_properties)?; }
                    PROPERTY_KEY_REASON_STRING => { properties = decode_optional_length_prefixed_string(properties, &mut packet.reason_string)?; }
                    _ => { return Err(invalid_property($packet_type_as_string, property_key)); }
                }
            }

            Ok(MqttPacket::$mqtt_packet_type(packet))
        }
    };
}

define_ack_packet_decode_function!(decode_puback_packet, Puback, PubackPacket, "Puback", 0, convert_u8_to_puback_reason_code);
define_ack_packet_decode_function!(decode_pubrec_packet, Pubrec, PubrecPacket, "Pubrec", 0, convert_u8_to_pubrec_reason_code);
define_ack_packet_decode_function!(decode_pubrel_packet, Pubrel, PubrelPacket, "Pubrel", 2, convert_u8_to_pubrel_reason_code);
define_ack_packet_decode_function!(decode_pubcomp_packet, Pubcomp, PubcompPacket, "Pubcomp", 0, convert_u8_to_pubcomp_reason_code);

fn decode_connect_packet(first_byte: u8, packet_body: &[u8]) -> MqttResult<MqttPacket> {
    check_fixed_header_flags(first_byte, 0, "Connect")?;

    let mut packet = ConnectPacket::default();
    let mut mutable_body = packet_body;

    let mut protocol_name = String::new();
    mutable_body = decode_length_prefixed_string(mutable_body, &mut protocol_name)?;
    let mut protocol_version = 0;
    mutable_body = decode_u8(mutable_body, &mut protocol_version)?;
    if protocol_name != "MQTT" || protocol_version != 5 {
        error!("ConnectPacket Decode - unsupported protocol ({} v{})", protocol_name, protocol_version);
        return Err(MqttError::new_decoding_failure("unsupported protocol name or version"));
    }

    let mut flags = 0;
    mutable_body = decode_u8(mutable_body, &mut flags)?;
    if (flags & 0x01) != 0 {
        return Err(MqttError::new_decoding_failure("connect flags reserved bit set"));
    }
    packet.clean_start = (flags & CONNECT_PACKET_CLEAN_START_FLAG_MASK) != 0;
    mutable_body = decode_u16(mutable_body, &mut packet.keep_alive_interval_seconds)?;

    let (mut properties, remaining) = split_property_section(mutable_body, "Connect")?;
    mutable_body = remaining;
    while !properties.is_empty() {
        let property_key = properties[0];
        properties = &properties[1..];

        match property_key {
            PROPERTY_KEY_SESSION_EXPIRY_INTERVAL => { properties = decode_optional_u32(properties, &mut packet.session_expiry_interval_seconds)?; }
            PROPERTY_KEY_RECEIVE_MAXIMUM => { properties = decode_optional_u16(properties, &mut packet.receive_maximum)?; }
            PROPERTY_KEY_MAXIMUM_PACKET_SIZE => { properties = decode_optional_u32(properties, &mut packet.maximum_packet_size_bytes)?; }
            PROPERTY_KEY_TOPIC_ALIAS_MAXIMUM => { properties = decode_optional_u16(properties, &mut packet.topic_alias_maximum)?; }
            PROPERTY_KEY_REQUEST_RESPONSE_INFORMATION => { properties = decode_optional_u8_as_bool(properties, &mut packet.request_response_information)?; }
            PROPERTY_KEY_REQUEST_PROBLEM_INFORMATION => { properties = decode_optional_u8_as_bool(properties, &mut packet.request_problem_information)?; }
            PROPERTY_KEY_USER_PROPERTY => { properties = decode_user_property(properties, &mut packet.user_properties)?; }
            PROPERTY_KEY_AUTHENTICATION_METHOD => { properties = decode_optional_length_prefixed_string(properties, &mut packet.authentication_method)?; }
            PROPERTY_KEY_AUTHENTICATION_DATA => { properties = decode_optional_length_prefixed_bytes(properties, &mut packet.authentication_data)?; }
            _ => { return Err(invalid_property("Connect", property_key)); }
        }
    }

    let mut client_id = String::new();
    mutable_body = decode_length_prefixed_string(mutable_body, &mut client_id)?;
    if !client_id.is_empty() {
        packet.client_id = Some(client_id);
    }

    if (flags & CONNECT_PACKET_HAS_WILL_FLAG_MASK) != 0 {
        let mut will = PublishPacket {
            qos: convert_u8_to_quality_of_service((flags >> CONNECT_PACKET_WILL_QOS_FLAG_SHIFT) & QOS_MASK)?,
            retain: (flags & CONNECT_PACKET_WILL_RETAIN_FLAG_MASK) != 0,
            ..Default::default()
        };

        let (mut will_properties, remaining) = split_property_section(mutable_body, "Connect")?;
        mutable_body = remaining;
        while !will_properties.is_empty() {
            let property_key = will_properties[0];
            will_properties = &will_properties[1..];

            match property_key {
                PROPERTY_KEY_WILL_DELAY_INTERVAL => { will_properties = decode_optional_u32(will_properties, &mut packet.will_delay_interval_seconds)?; }
                PROPERTY_KEY_PAYLOAD_FORMAT_INDICATOR => { will_properties = decode_optional_u8_as_enum(will_properties, &mut will.payload_format, convert_u8_to_payload_format_indicator)?; }
                PROPERTY_KEY_MESSAGE_EXPIRY_INTERVAL => { will_properties = decode_optional_u32(will_properties, &mut will.message_expiry_interval_seconds)?; }
                PROPERTY_KEY_CONTENT_TYPE => { will_properties = decode_optional_length_prefixed_string(will_properties, &mut will.content_type)?; }
                PROPERTY_KEY_RESPONSE_TOPIC => { will_properties = decode_optional_length_prefixed_string(will_properties, &mut will.response_topic)?; }
                PROPERTY_KEY_CORRELATION_DATA => { will_properties = decode_optional_length_prefixed_bytes(will_properties, &mut will.correlation_data)?; }
                PROPERTY_KEY_USER_PROPERTY => { will_properties = decode_user_property(will_properties, &mut will.user_properties)?; }
                _ => { return Err(invalid_property("Connect", property_key)); }
            }
        }

        mutable_body = decode_length_prefixed_string(mutable_body, &mut will.topic)?;
        let mut payload = Vec::new();
        mutable_body = decode_length_prefixed_bytes(mutable_body, &mut payload)?;
        if !payload.is_empty() {
            will.payload = Some(payload);
        }

        packet.will = Some(will);
    }

    if (flags & CONNECT_PACKET_HAS_USERNAME_FLAG_MASK) != 0 {
        mutable_body = decode_optional_length_prefixed_string(mutable_body, &mut packet.username)?;
    }

    if (flags & CONNECT_PACKET_HAS_PASSWORD_FLAG_MASK) != 0 {
        mutable_body = decode_optional_length_prefixed_bytes(mutable_body, &mut packet.password)?;
    }

    check_fully_consumed(mutable_body, "Connect")?;

    Ok(MqttPacket::Connect(packet))
}

fn decode_connack_packet(first_byte: u8, packet_body: &[u8]) -> MqttResult<MqttPacket> {
    check_fixed_header_flags(first_byte, 0, "Connack")?;

    let mut packet = ConnackPacket::default();
    let mut mutable_body = packet_body;

    let mut flags = 0;
    mutable_body = decode_u8(mutable_body, &mut flags)?;
    if (flags & !0x01) != 0 {
        error!("ConnackPacket Decode - invalid acknowledge flags ({})", flags);
        return Err(MqttError::new_decoding_failure("invalid connack acknowledge flags"));
    }
    packet.session_present = flags == 1;

    mutable_body = decode_u8_as_enum(mutable_body, &mut packet.reason_code, convert_u8_to_connect_reason_code)?;

    let (mut properties, remaining) = split_property_section(mutable_body, "Connack")?;
    check_fully_consumed(remaining, "Connack")?;

    while !properties.is_empty() {
        let property_key = properties[0];
        properties = &properties[1..];

        match property_key {
            PROPERTY_KEY_SESSION_EXPIRY_INTERVAL => { properties = decode_optional_u32(properties, &mut packet.session_expiry_interval)?; }
            PROPERTY_KEY_RECEIVE_MAXIMUM => { properties = decode_optional_u16(properties, &mut packet.receive_maximum)?; }
            PROPERTY_KEY_MAXIMUM_QOS => { properties = decode_optional_u8_as_enum(properties, &mut packet.maximum_qos, convert_u8_to_quality_of_service)?; }
            PROPERTY_KEY_RETAIN_AVAILABLE => { properties = decode_optional_u8_as_bool(properties, &mut packet.retain_available)?; }
            PROPERTY_KEY_MAXIMUM_PACKET_SIZE => { properties = decode_optional_u32(properties, &mut packet.maximum_packet_size)?; }
            PROPERTY_KEY_ASSIGNED_CLIENT_IDENTIFIER => { properties = decode_optional_length_prefixed_string(properties, &mut packet.assigned_client_identifier)?; }
            PROPERTY_KEY_TOPIC_ALIAS_MAXIMUM => { properties = decode_optional_u16(properties, &mut packet.topic_alias_maximum)?; }
            PROPERTY_KEY_REASON_STRING => { properties = decode_optional_length_prefixed_string(properties, &mut packet.reason_string)?; }
            PROPERTY_KEY_USER_PROPERTY => { properties = decode_user_property(properties, &mut packet.user_properties)?; }
            PROPERTY_KEY_WILDCARD_SUBSCRIPTIONS_AVAILABLE => { properties = decode_optional_u8_as_bool(properties, &mut packet.wildcard_subscriptions_available)?; }
            PROPERTY_KEY_SUBSCRIPTION_IDENTIFIERS_AVAILABLE => { properties = decode_optional_u8_as_bool(properties, &mut packet.subscription_identifiers_available)?; }
            PROPERTY_KEY_SHARED_SUBSCRIPTIONS_AVAILABLE => { properties = decode_optional_u8_as_bool(properties, &mut packet.shared_subscriptions_available)?; }
            PROPERTY_KEY_SERVER_KEEP_ALIVE => { properties = decode_optional_u16(properties, &mut packet.server_keep_alive)?; }
            PROPERTY_KEY_RESPONSE_INFORMATION => { properties = decode_optional_length_prefixed_string(properties, &mut packet.response_information)?; }
            PROPERTY_KEY_SERVER_REFERENCE => { properties = decode_optional_length_prefixed_string(properties, &mut packet.server_reference)?; }
            PROPERTY_KEY_AUTHENTICATION_METHOD => { properties = decode_optional_length_prefixed_string(properties, &mut packet.authentication_method)?; }
            PROPERTY_KEY_AUTHENTICATION_DATA => { properties = decode_optional_length_prefixed_bytes(properties, &mut packet.authentication_data)?; }
            _ => { return Err(invalid_property("Connack", property_key)); }
        }
    }

    Ok(MqttPacket::Connack(packet))
}

fn decode_publish_packet(first_byte: u8, packet_body: &[u8]) -> MqttResult<MqttPacket> {
    let mut packet = PublishPacket {
        qos: convert_u8_to_quality_of_service((first_byte >> 1) & QOS_MASK)?,
        duplicate: (first_byte & PUBLISH_PACKET_FIXED_HEADER_DUPLICATE_FLAG) != 0,
        retain: (first_byte & PUBLISH_PACKET_FIXED_HEADER_RETAIN_FLAG) != 0,
        ..Default::default()
    };

    let mut mutable_body = packet_body;
    mutable_body = decode_length_prefixed_string(mutable_body, &mut packet.topic)?;
    if packet.qos != QualityOfService::AtMostOnce {
        mutable_body = decode_u16(mutable_body, &mut packet.packet_id)?;
        if packet.packet_id == 0 {
            error!("PublishPacket Decode - QoS {} publish with zero packet id", packet.qos as u8);
            return Err(MqttError::new_decoding_failure("qos 1+ publish packet with zero packet id"));
        }
    }

    let (mut properties, remaining) = split_property_section(mutable_body, "Publish")?;
    while !properties.is_empty() {
        let property_key = properties[0];
        properties = &properties[1..];

        match property_key {
            PROPERTY_KEY_PAYLOAD_FORMAT_INDICATOR => { properties = decode_optional_u8_as_enum(properties, &mut packet.payload_format, convert_u8_to_payload_format_indicator)?; }
            PROPERTY_KEY_MESSAGE_EXPIRY_INTERVAL => { properties = decode_optional_u32(properties, &mut packet.message_expiry_interval_seconds)?; }
            PROPERTY_KEY_TOPIC_ALIAS => { properties = decode_optional_u16(properties, &mut packet.topic_alias)?; }
            PROPERTY_KEY_RESPONSE_TOPIC => { properties = decode_optional_length_prefixed_string(properties, &mut packet.response_topic)?; }
            PROPERTY_KEY_CORRELATION_DATA => { properties = decode_optional_length_prefixed_bytes(properties, &mut packet.correlation_data)?; }
            PROPERTY_KEY_USER_PROPERTY => { properties = decode_user_property(properties, &mut packet.user_properties)?; }
            PROPERTY_KEY_SUBSCRIPTION_IDENTIFIER => {
                let mut subscription_identifier = 0;
                properties = decode_vli_into_mutable(properties, &mut subscription_identifier)?;
                packet.subscription_identifiers.get_or_insert_with(Vec::new).push(subscription_identifier as u32);
            }
            PROPERTY_KEY_CONTENT_TYPE => { properties = decode_optional_length_prefixed_string(properties, &mut packet.content_type)?; }
            _ => { return Err(invalid_property("Publish", property_key)); }
        }
    }

    if !remaining.is_empty() {
        packet.payload = Some(remaining.to_vec());
    }

    Ok(MqttPacket::Publish(packet))
}

fn decode_subscribe_packet(first_byte: u8, packet_body: &[u8]) -> MqttResult<MqttPacket> {
    check_fixed_header_flags(first_byte, 2, "Subscribe")?;

    let mut packet = SubscribePacket::default();
    let mut mutable_body = decode_u16(packet_body, &mut packet.packet_id)?;

    let (mut properties, remaining) = split_property_section(mutable_body, "Subscribe")?;
    mutable_body = remaining;
    while !properties.is_empty() {
        let property_key = properties[0];
        properties = &properties[1..];

        match property_key {
            PROPERTY_KEY_SUBSCRIPTION_IDENTIFIER => { properties = decode_optional_vli(properties, &mut packet.subscription_identifier)?; }
            PROPERTY_KEY_USER_PROPERTY => { properties = decode_user_property(properties, &mut packet.user_properties)?; }
            _ => { return Err(invalid_property("Subscribe", property_key)); }
        }
    }

    while !mutable_body.is_empty() {
        let mut subscription = Subscription::default();
        mutable_body = decode_length_prefixed_string(mutable_body, &mut subscription.topic_filter)?;

        let mut options = 0;
        mutable_body = decode_u8(mutable_body, &mut options)?;
        if (options & 0xC0) != 0 {
            return Err(MqttError::new_decoding_failure("subscription options reserved bits set"));
        }

        subscription.qos = convert_u8_to_quality_of_service(options & QOS_MASK)?;
        subscription.no_local = (options & SUBSCRIPTION_OPTIONS_NO_LOCAL_MASK) != 0;
        subscription.retain_as_published = (options & SUBSCRIPTION_OPTIONS_RETAIN_AS_PUBLISHED_MASK) != 0;
        subscription.retain_handling_type = convert_u8_to_retain_handling_type((options >> SUBSCRIPTION_OPTIONS_RETAIN_HANDLING_SHIFT) & 0x03)?;

        packet.subscriptions.push(subscription);
    }

    Ok(MqttPacket::Subscribe(packet))
}

fn decode_suback_packet(first_byte: u8, packet_body: &[u8]) -> MqttResult<MqttPacket> {
    check_fixed_header_flags(first_byte, 0, "Suback")?;

    let mut packet = SubackPacket::default();
    let mutable_body = decode_u16(packet_body, &mut packet.packet_id)?;

    let (mut properties, mut reason_codes) = split_property_section(mutable_body, "Suback")?;
    while !properties.is_empty() {
        let property_key = properties[0];
        properties = &properties[1..];

        match property_key {
            PROPERTY_KEY_REASON_STRING => { properties = decode_optional_length_prefixed_string(properties, &mut packet.reason_string)?; }
            PROPERTY_KEY_USER_PROPERTY => { properties = decode_user_property(properties, &mut packet.user_properties)?; }
            _ => { return Err(invalid_property("Suback", property_key)); }
        }
    }

    while !reason_codes.is_empty() {
        let mut reason_code = SubackReasonCode::default();
        reason_codes = decode_u8_as_enum(reason_codes, &mut reason_code, convert_u8_to_suback_reason_code)?;
        packet.reason_codes.push(reason_code);
    }

    Ok(MqttPacket::Suback(packet))
}

fn decode_unsubscribe_packet(first_byte: u8, packet_body: &[u8]) -> MqttResult<MqttPacket> {
    check_fixed_header_flags(first_byte, 2, "Unsubscribe")?;

    let mut packet = UnsubscribePacket::default();
    let mutable_body = decode_u16(packet_body, &mut packet.packet_id)?;

    let (mut properties, mut topic_filters) = split_property_section(mutable_body, "Unsubscribe")?;
    while !properties.is_empty() {
        let property_key = properties[0];
        properties = &properties[1..];

        match property_key {
            PROPERTY_KEY_USER_PROPERTY => { properties = decode_user_property(properties, &mut packet.user_properties)?; }
            _ => { return Err(invalid_property("Unsubscribe", property_key)); }
        }
    }

    while !topic_filters.is_empty() {
        let mut topic_filter = String::new();
        topic_filters = decode_length_prefixed_string(topic_filters, &mut topic_filter)?;
        packet.topic_filters.push(topic_filter);
    }

    Ok(MqttPacket::Unsubscribe(packet))
}

fn decode_unsuback_packet(first_byte: u8, packet_body: &[u8]) -> MqttResult<MqttPacket> {
    check_fixed_header_flags(first_byte, 0, "Unsuback")?;

    let mut packet = UnsubackPacket::default();
    let mutable_body = decode_u16(packet_body, &mut packet.packet_id)?;

    let (mut properties, mut reason_codes) = split_property_section(mutable_body, "Unsuback")?;
    while !properties.is_empty() {
        let property_key = properties[0];
        properties = &properties[1..];

        match property_key {
            PROPERTY_KEY_REASON_STRING => { properties = decode_optional_length_prefixed_string(properties, &mut packet.reason_string)?; }
            PROPERTY_KEY_USER_PROPERTY => { properties = decode_user_property(properties, &mut packet.user_properties)?; }
            _ => { return Err(invalid_property("Unsuback", property_key)); }
        }
    }

    while !reason_codes.is_empty() {
        let mut reason_code = UnsubackReasonCode::default();
        reason_codes = decode_u8_as_enum(reason_codes, &mut reason_code, convert_u8_to_unsuback_reason_code)?;
        packet.reason_codes.push(reason_code);
    }

    Ok(MqttPacket::Unsuback(packet))
}

fn decode_empty_packet(first_byte: u8, packet_body: &[u8], packet_name: &str) -> MqttResult<()> {
    check_fixed_header_flags(first_byte, 0, packet_name)?;
    check_fully_consumed(packet_body, packet_name)
}

fn decode_disconnect_packet(first_byte: u8, packet_body: &[u8]) -> MqttResult<MqttPacket> {
    check_fixed_header_flags(first_byte, 0, "Disconnect")?;

    let mut packet = DisconnectPacket::default();
    if packet_body.is_empty() {
        return Ok(MqttPacket::Disconnect(packet));
    }

    let mutable_body = decode_u8_as_enum(packet_body, &mut packet.reason_code, convert_u8_to_disconnect_reason_code)?;
    if mutable_body.is_empty() {
        return Ok(MqttPacket::Disconnect(packet));
    }

    let (mut properties, remaining) = split_property_section(mutable_body, "Disconnect")?;
    check_fully_consumed(remaining, "Disconnect")?;

    while !properties.is_empty() {
        let property_key = properties[0];
        properties = &properties[1..];

        match property_key {
            PROPERTY_KEY_SESSION_EXPIRY_INTERVAL => { properties = decode_optional_u32(properties, &mut packet.session_expiry_interval_seconds)?; }
            PROPERTY_KEY_REASON_STRING => { properties = decode_optional_length_prefixed_string(properties, &mut packet.reason_string)?; }
            PROPERTY_KEY_USER_PROPERTY => { properties = decode_user_property(properties, &mut packet.user_properties)?; }
            PROPERTY_KEY_SERVER_REFERENCE => { properties = decode_optional_length_prefixed_string(properties, &mut packet.server_reference)?; }
            _ => { return Err(invalid_property("Disconnect", property_key)); }
        }
    }

    Ok(MqttPacket::Disconnect(packet))
}

fn decode_auth_packet(first_byte: u8, packet_body: &[u8]) -> MqttResult<MqttPacket> {
    check_fixed_header_flags(first_byte, 0, "Auth")?;

    let mut packet = AuthPacket::default();
    if packet_body.is_empty() {
        return Ok(MqttPacket::Auth(packet));
    }

    let mutable_body = decode_u8_as_enum(packet_body, &mut packet.reason_code, convert_u8_to_authenticate_reason_code)?;
    if mutable_body.is_empty() {
        return Ok(MqttPacket::Auth(packet));
    }

    let (mut properties, remaining) = split_property_section(mutable_body, "Auth")?;
    check_fully_consumed(remaining, "Auth")?;

    while !properties.is_empty() {
        let property_key = properties[0];
        properties = &properties[1..];

        match property_key {
            PROPERTY_KEY_AUTHENTICATION_METHOD => { properties = decode_optional_length_prefixed_string(properties, &mut packet.authentication_method)?; }
            PROPERTY_KEY_AUTHENTICATION_DATA => { properties = decode_optional_length_prefixed_bytes(properties, &mut packet.authentication_data)?; }
            PROPERTY_KEY_REASON_STRING => { properties = decode_optional_length_prefixed_string(properties, &mut packet.reason_string)?; }
            PROPERTY_KEY_USER_PROPERTY => { properties = decode_user_property(properties, &mut packet.user_properties)?; }
            _ => { return Err(invalid_property("Auth", property_key)); }
        }
    }

    Ok(MqttPacket::Auth(packet))
}

/// Decodes a single packet from its fixed header first byte and its complete body
pub(crate) fn decode_packet(first_byte: u8, packet_body: &[u8]) -> MqttResult<MqttPacket> {
    let packet_type = first_byte >> 4;

    match packet_type {
        PACKET_TYPE_CONNECT => { decode_connect_packet(first_byte, packet_body) }
        PACKET_TYPE_CONNACK => { decode_connack_packet(first_byte, packet_body) }
        PACKET_TYPE_PUBLISH => { decode_publish_packet(first_byte, packet_body) }
        PACKET_TYPE_PUBACK => { decode_puback_packet(first_byte, packet_body) }
        PACKET_TYPE_PUBREC => { decode_pubrec_packet(first_byte, packet_body) }
        PACKET_TYPE_PUBREL => { decode_pubrel_packet(first_byte, packet_body) }
        PACKET_TYPE_PUBCOMP => { decode_pubcomp_packet(first_byte, packet_body) }
        PACKET_TYPE_SUBSCRIBE => { decode_subscribe_packet(first_byte, packet_body) }
        PACKET_TYPE_SUBACK => { decode_suback_packet(first_byte, packet_body) }
        PACKET_TYPE_UNSUBSCRIBE => { decode_unsubscribe_packet(first_byte, packet_body) }
        PACKET_TYPE_UNSUBACK => { decode_unsuback_packet(first_byte, packet_body) }
        PACKET_TYPE_PINGREQ => {
            decode_empty_packet(first_byte, packet_body, "Pingreq")?;
            Ok(MqttPacket::Pingreq(PingreqPacket {}))
        }
        PACKET_TYPE_PINGRESP => {
            decode_empty_packet(first_byte, packet_body, "Pingresp")?;
            Ok(MqttPacket::Pingresp(PingrespPacket {}))
        }
        PACKET_TYPE_DISCONNECT => { decode_disconnect_packet(first_byte, packet_body) }
        PACKET_TYPE_AUTH => { decode_auth_packet(first_byte, packet_body) }
        _ => {
            error!("Packet Decode - invalid packet type ({})", packet_type);
            Err(MqttError::new_decoding_failure("invalid packet type value"))
        }
    }
}

fn map_read_error(error: std::io::Error) -> MqttError {
    MqttError::new_connection_closed(error)
}

/// Reads the next complete packet from a stream.
///
/// End-of-stream and io failures surface as `ConnectionClosed`; malformed or oversized packets
/// surface as `DecodingFailure`.  A `maximum_packet_size` of zero disables the size check.
pub(crate) async fn read_packet<R>(reader: &mut R, maximum_packet_size: u32) -> MqttResult<MqttPacket> where R : AsyncRead + Unpin + ?Sized {
    let first_byte = reader.read_u8().await.map_err(map_read_error)?;

    let mut vli_bytes = Vec::with_capacity(4);
    let remaining_length = loop {
        vli_bytes.push(reader.read_u8().await.map_err(map_read_error)?);
        match decode_vli(&vli_bytes)? {
            DecodeVliResult::Value(value, _) => { break value as usize; }
            DecodeVliResult::InsufficientData => {}
        }
    };

    let total_length = 1 + vli_bytes.len() + remaining_length;
    if maximum_packet_size > 0 && total_length > maximum_packet_size as usize {
        error!("Packet Decode - packet size ({}) exceeds negotiated maximum ({})", total_length, maximum_packet_size);
        return Err(MqttError::new_decoding_failure("inbound packet exceeds maximum packet size"));
    }

    let mut body = Vec::new();
    (&mut *reader).take(remaining_length as u64).read_to_end(&mut body).await.map_err(map_read_error)?;
    if body.len() < remaining_length {
        return Err(MqttError::new_connection_closed("stream ended inside a packet body"));
    }

    decode_packet(first_byte, &body)
}
