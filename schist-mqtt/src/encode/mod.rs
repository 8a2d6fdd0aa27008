/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Internal module that turns modeled MQTT5 packets into their wire representation.

Each packet is encoded as a variable header + payload body first, then framed with the fixed header
byte and the remaining length.
 */

pub(crate) mod utils;

use crate::encode::utils::*;
use crate::error::MqttResult;
use crate::mqtt::*;
use crate::mqtt::utils::*;

const MQTT5_PROTOCOL_NAME: &str = "MQTT";
const MQTT5_PROTOCOL_VERSION: u8 = 5;

const PUBLISH_FIRST_BYTE: u8 = PACKET_TYPE_PUBLISH << 4;
const PUBREL_FIRST_BYTE: u8 = (PACKET_TYPE_PUBREL << 4) | 0x02;
const SUBSCRIBE_FIRST_BYTE: u8 = (PACKET_TYPE_SUBSCRIBE << 4) | 0x02;
const UNSUBSCRIBE_FIRST_BYTE: u8 = (PACKET_TYPE_UNSUBSCRIBE << 4) | 0x02;

/// Encodes a packet into a freshly allocated buffer containing the complete framed packet
pub(crate) fn encode_packet(packet: &MqttPacket) -> MqttResult<Vec<u8>> {
    let mut body = Vec::new();
    let first_byte = match packet {
        MqttPacket::Connect(connect) => { encode_connect_body(connect, &mut body)?; PACKET_TYPE_CONNECT << 4 }
        MqttPacket::Connack(connack) => { encode_connack_body(connack, &mut body)?; PACKET_TYPE_CONNACK << 4 }
        MqttPacket::Publish(publish) => { encode_publish_body(publish, &mut body)?; compute_publish_first_byte(publish) }
        MqttPacket::Puback(puback) => {
            encode_ack_body(puback.packet_id, puback.reason_code as u8, &puback.reason_string, &puback.user_properties, &mut body)?;
            PACKET_TYPE_PUBACK << 4
        }
        MqttPacket::Pubrec(pubrec) => {
            encode_ack_body(pubrec.packet_id, pubrec.reason_code as u8, &pubrec.reason_string, &pubrec.user_properties, &mut body)?;
            PACKET_TYPE_PUBREC << 4
        }
        MqttPacket::Pubrel(pubrel) => {
            encode_ack_body(pubrel.packet_id, pubrel.reason_code as u8, &pubrel.reason_string, &pubrel.user_properties, &mut body)?;
            PUBREL_FIRST_BYTE
        }
        MqttPacket::Pubcomp(pubcomp) => {
            encode_ack_body(pubcomp.packet_id, pubcomp.reason_code as u8, &pubcomp.reason_string, &pubcomp.user_properties, &mut body)?;
            PACKET_TYPE_PUBCOMP << 4
        }
        MqttPacket::Subscribe(subscribe) => { encode_subscribe_body(subscribe, &mut body)?; SUBSCRIBE_FIRST_BYTE }
        MqttPacket::Suback(suback) => {
            let reason_codes : Vec<u8> = suback.reason_codes.iter().map(|code| *code as u8).collect();
            encode_multi_ack_body(suback.packet_id, &suback.reason_string, &suback.user_properties, &reason_codes, &mut body)?;
            PACKET_TYPE_SUBACK << 4
        }
        MqttPacket::Unsubscribe(unsubscribe) => { encode_unsubscribe_body(unsubscribe, &mut body)?; UNSUBSCRIBE_FIRST_BYTE }
        MqttPacket::Unsuback(unsuback) => {
            let reason_codes : Vec<u8> = unsuback.reason_codes.iter().map(|code| *code as u8).collect();
            encode_multi_ack_body(unsuback.packet_id, &unsuback.reason_string, &unsuback.user_properties, &reason_codes, &mut body)?;
            PACKET_TYPE_UNSUBACK << 4
        }
        MqttPacket::Pingreq(_) => { PACKET_TYPE_PINGREQ << 4 }
        MqttPacket::Pingresp(_) => { PACKET_TYPE_PINGRESP << 4 }
        MqttPacket::Disconnect(disconnect) => { encode_disconnect_body(disconnect, &mut body)?; PACKET_TYPE_DISCONNECT << 4 }
        MqttPacket::Auth(auth) => { encode_auth_body(auth, &mut body)?; PACKET_TYPE_AUTH << 4 }
    };

    let mut encoded = Vec::with_capacity(body.len() + 5);
    encode_u8(first_byte, &mut encoded);
    encode_vli(body.len() as u32, &mut encoded)?;
    encoded.append(&mut body);

    Ok(encoded)
}

/// Computes the total framed size of a publish packet without regard to the value of its packet id
pub(crate) fn compute_publish_packet_length(publish: &PublishPacket) -> MqttResult<usize> {
    let mut body = Vec::new();
    encode_publish_body(publish, &mut body)?;

    Ok(1 + compute_variable_length_integer_encode_size(body.len())? + body.len())
}

fn compute_publish_first_byte(publish: &PublishPacket) -> u8 {
    let mut first_byte = PUBLISH_FIRST_BYTE | ((publish.qos as u8) << 1);
    if publish.duplicate {
        first_byte |= PUBLISH_PACKET_FIXED_HEADER_DUPLICATE_FLAG;
    }

    if publish.retain {
        first_byte |= PUBLISH_PACKET_FIXED_HEADER_RETAIN_FLAG;
    }

    first_byte
}

fn encode_publish_properties(publish: &PublishPacket, properties: &mut Vec<u8>) -> MqttResult<()> {
    encode_optional_u8_property(PROPERTY_KEY_PAYLOAD_FORMAT_INDICATOR, publish.payload_format.map(|format| format as u8), properties);
    encode_optional_u32_property(PROPERTY_KEY_MESSAGE_EXPIRY_INTERVAL, publish.message_expiry_interval_seconds, properties);
    encode_optional_u16_property(PROPERTY_KEY_TOPIC_ALIAS, publish.topic_alias, properties);
    encode_optional_string_property(PROPERTY_KEY_RESPONSE_TOPIC, &publish.response_topic, properties)?;
    encode_optional_bytes_property(PROPERTY_KEY_CORRELATION_DATA, &publish.correlation_data, properties)?;
    encode_user_properties(&publish.user_properties, properties)?;
    if let Some(subscription_identifiers) = &publish.subscription_identifiers {
        for subscription_identifier in subscription_identifiers {
            encode_optional_vli_property(PROPERTY_KEY_SUBSCRIPTION_IDENTIFIER, Some(*subscription_identifier), properties)?;
        }
    }
    encode_optional_string_property(PROPERTY_KEY_CONTENT_TYPE, &publish.content_type, properties)?;

    Ok(())
}

fn encode_publish_body(publish: &PublishPacket, body: &mut Vec<u8>) -> MqttResult<()> {
    encode_length_prefixed_string(&publish.topic, body)?;
    if publish.qos != QualityOfService::AtMostOnce {
        encode_u16(publish.packet_id, body);
    }

    let mut properties = Vec::new();
    encode_publish_properties(publish, &mut properties)?;
    encode_property_section(&properties, body)?;

    if let Some(payload) = &publish.payload {
        body.extend_from_slice(payload);
    }

    Ok(())
}

fn encode_connect_body(connect: &ConnectPacket, body: &mut Vec<u8>) -> MqttResult<()> {
    encode_length_prefixed_string(MQTT5_PROTOCOL_NAME, body)?;
    encode_u8(MQTT5_PROTOCOL_VERSION, body);

    let mut flags: u8 = 0;
    if connect.clean_start {
        flags |= CONNECT_PACKET_CLEAN_START_FLAG_MASK;
    }

    if let Some(will) = &connect.will {
        flags |= CONNECT_PACKET_HAS_WILL_FLAG_MASK;
        flags |= (will.qos as u8) << CONNECT_PACKET_WILL_QOS_FLAG_SHIFT;
        if will.retain {
            flags |= CONNECT_PACKET_WILL_RETAIN_FLAG_MASK;
        }
    }

    if connect.password.is_some() {
        flags |= CONNECT_PACKET_HAS_PASSWORD_FLAG_MASK;
    }

    if connect.username.is_some() {
        flags |= CONNECT_PACKET_HAS_USERNAME_FLAG_MASK;
    }

    encode_u8(flags, body);
    encode_u16(connect.keep_alive_interval_seconds, body);

    let mut properties = Vec::new();
    encode_optional_u32_property(PROPERTY_KEY_SESSION_EXPIRY_INTERVAL, connect.session_expiry_interval_seconds, &mut properties);
    encode_optional_u16_property(PROPERTY_KEY_RECEIVE_MAXIMUM, connect.receive_maximum, &mut properties);
    encode_optional_u32_property(PROPERTY_KEY_MAXIMUM_PACKET_SIZE, connect.maximum_packet_size_bytes, &mut properties);
    encode_optional_u16_property(PROPERTY_KEY_TOPIC_ALIAS_MAXIMUM, connect.topic_alias_maximum, &mut properties);
    encode_optional_bool_property(PROPERTY_KEY_REQUEST_RESPONSE_INFORMATION, connect.request_response_information, &mut properties);
    encode_optional_bool_property(PROPERTY_KEY_REQUEST_PROBLEM_INFORMATION, connect.request_problem_information, &mut properties);
    encode_user_properties(&connect.user_properties, &mut properties)?;
    encode_optional_string_property(PROPERTY_KEY_AUTHENTICATION_METHOD, &connect.authentication_method, &mut properties)?;
    encode_optional_bytes_property(PROPERTY_KEY_AUTHENTICATION_DATA, &connect.authentication_data, &mut properties)?;
    encode_property_section(&properties, body)?;

    encode_length_prefixed_string(connect.client_id.as_deref().unwrap_or(""), body)?;

    if let Some(will) = &connect.will {
        let mut will_properties = Vec::new();
        encode_optional_u32_property(PROPERTY_KEY_WILL_DELAY_INTERVAL, connect.will_delay_interval_seconds, &mut will_properties);
        encode_optional_u8_property(PROPERTY_KEY_PAYLOAD_FORMAT_INDICATOR, will.payload_format.map(|format| format as u8), &mut will_properties);
        encode_optional_u32_property(PROPERTY_KEY_MESSAGE_EXPIRY_INTERVAL, will.message_expiry_interval_seconds, &mut will_properties);
        encode_optional_string_property(PROPERTY_KEY_CONTENT_TYPE, &will.content_type, &mut will_properties)?;
        encode_optional_string_property(PROPERTY_KEY_RESPONSE_TOPIC, &will.response_topic, &mut will_properties)?;
        encode_optional_bytes_property(PROPERTY_KEY_CORRELATION_DATA, &will.correlation_data, &mut will_properties)?;
        encode_user_properties(&will.user_properties, &mut will_properties)?;
        encode_property_section(&will_properties, body)?;

        encode_length_prefixed_string(&will.topic, body)?;
        encode_length_prefixed_bytes(will.payload.as_deref().unwrap_or(&[]), body)?;
    }

    if let Some(username) = &connect.username {
        encode_length_prefixed_string(username, body)?;
    }

    if let Some(password) = &connect.password {
        encode_length_prefixed_bytes(password, body)?;
    }

    Ok(())
}

fn encode_connack_body(connack: &ConnackPacket, body: &mut Vec<u8>) -> MqttResult<()> {
    encode_u8(connack.session_present as u8, body);
    encode_u8(connack.reason_code as u8, body);

    let mut properties = Vec::new();
    encode_optional_u32_property(PROPERTY_KEY_SESSION_EXPIRY_INTERVAL, connack.session_expiry_interval, &mut properties);
    encode_optional_u16_property(PROPERTY_KEY_RECEIVE_MAXIMUM, connack.receive_maximum, &mut properties);
    encode_optional_u8_property(PROPERTY_KEY_MAXIMUM_QOS, connack.maximum_qos.map(|qos| qos as u8), &mut properties);
    encode_optional_bool_property(PROPERTY_KEY_RETAIN_AVAILABLE, connack.retain_available, &mut properties);
    encode_optional_u32_property(PROPERTY_KEY_MAXIMUM_PACKET_SIZE, connack.maximum_packet_size, &mut properties);
    encode_optional_string_property(PROPERTY_KEY_ASSIGNED_CLIENT_IDENTIFIER, &connack.assigned_client_identifier, &mut properties)?;
    encode_optional_u16_property(PROPERTY_KEY_TOPIC_ALIAS_MAXIMUM, connack.topic_alias_maximum, &mut properties);
    encode_optional_string_property(PROPERTY_KEY_REASON_STRING, &connack.reason_string, &mut properties)?;
    encode_user_properties(&connack.user_properties, &mut properties)?;
    encode_optional_bool_property(PROPERTY_KEY_WILDCARD_SUBSCRIPTIONS_AVAILABLE, connack.wildcard_subscriptions_available, &mut properties);
    encode_optional_bool_property(PROPERTY_KEY_SUBSCRIPTION_IDENTIFIERS_AVAILABLE, connack.subscription_identifiers_available, &mut properties);
    encode_optional_bool_property(PROPERTY_KEY_SHARED_SUBSCRIPTIONS_AVAILABLE, connack.shared_subscriptions_available, &mut properties);
    encode_optional_u16_property(PROPERTY_KEY_SERVER_KEEP_ALIVE, connack.server_keep_alive, &mut properties);
    encode_optional_string_property(PROPERTY_KEY_RESPONSE_INFORMATION, &connack.response_information, &mut properties)?;
    encode_optional_string_property(PROPERTY_KEY_SERVER_REFERENCE, &connack.server_reference, &mut properties)?;
    encode_optional_string_property(PROPERTY_KEY_AUTHENTICATION_METHOD, &connack.authentication_method, &mut properties)?;
    encode_optional_bytes_property(PROPERTY_KEY_AUTHENTICATION_DATA, &connack.authentication_data, &mut properties)?;
    encode_property_section(&properties, body)
}

// PUBACK, PUBREC, PUBREL and PUBCOMP share a layout; a success ack without properties uses the short form
fn encode_ack_body(packet_id: u16, reason_code: u8, reason_string: &Option<String>, user_properties: &Option<Vec<UserProperty>>, body: &mut Vec<u8>) -> MqttResult<()> {
    encode_u16(packet_id, body);

    let mut properties = Vec::new();
    encode_optional_string_property(PROPERTY_KEY_REASON_STRING, reason_string, &mut properties)?;
    encode_user_properties(user_properties, &mut properties)?;

    if reason_code == 0 && properties.is_empty() {
        return Ok(());
    }

    encode_u8(reason_code, body);
    encode_property_section(&properties, body)
}

fn encode_multi_ack_body(packet_id: u16, reason_string: &Option<String>, user_properties: &Option<Vec<UserProperty>>, reason_codes: &[u8], body: &mut Vec<u8>) -> MqttResult<()> {
    encode_u16(packet_id, body);

    let mut properties = Vec::new();
    encode_optional_string_property(PROPERTY_KEY_REASON_STRING, reason_string, &mut properties)?;
    encode_user_properties(user_properties, &mut properties)?;
    encode_property_section(&properties, body)?;

    body.extend_from_slice(reason_codes);
    Ok(())
}

fn encode_subscribe_body(subscribe: &SubscribePacket, body: &mut Vec<u8>) -> MqttResult<()> {
    encode_u16(subscribe.packet_id, body);

    let mut properties = Vec::new();
    encode_optional_vli_property(PROPERTY_KEY_SUBSCRIPTION_IDENTIFIER, subscribe.subscription_identifier, &mut properties)?;
    encode_user_properties(&subscribe.user_properties, &mut properties)?;
    encode_property_section(&properties, body)?;

    for subscription in &subscribe.subscriptions {
        encode_length_prefixed_string(&subscription.topic_filter, body)?;

        let mut options = subscription.qos as u8;
        if subscription.no_local {
            options |= SUBSCRIPTION_OPTIONS_NO_LOCAL_MASK;
        }
        if subscription.retain_as_published {
            options |= SUBSCRIPTION_OPTIONS_RETAIN_AS_PUBLISHED_MASK;
        }
        options |= (subscription.retain_handling_type as u8) << SUBSCRIPTION_OPTIONS_RETAIN_HANDLING_SHIFT;

        encode_u8(options, body);
    }

    Ok(())
}

fn encode_unsubscribe_body(unsubscribe: &UnsubscribePacket, body: &mut Vec<u8>) -> MqttResult<()> {
    encode_u16(unsubscribe.packet_id, body);

    let mut properties = Vec::new();
    encode_user_properties(&unsubscribe.user_properties, &mut properties)?;
    encode_property_section(&properties, body)?;

    for topic_filter in &unsubscribe.topic_filters {
        encode_length_prefixed_string(topic_filter, body)?;
    }

    Ok(())
}

fn encode_disconnect_body(disconnect: &DisconnectPacket, body: &mut Vec<u8>) -> MqttResult<()> {
    let mut properties = Vec::new();
    encode_optional_u32_property(PROPERTY_KEY_SESSION_EXPIRY_INTERVAL, disconnect.session_expiry_interval_seconds, &mut properties);
    encode_optional_string_property(PROPERTY_KEY_REASON_STRING, &disconnect.reason_string, &mut properties)?;
    encode_user_properties(&disconnect.user_properties, &mut properties)?;
    encode_optional_string_property(PROPERTY_KEY_SERVER_REFERENCE, &disconnect.server_reference, &mut properties)?;

    if disconnect.reason_code == DisconnectReasonCode::NormalDisconnection && properties.is_empty() {
        return Ok(());
    }

    encode_u8(disconnect.reason_code as u8, body);
    encode_property_section(&properties, body)
}

fn encode_auth_body(auth: &AuthPacket, body: &mut Vec<u8>) -> MqttResult<()> {
    let mut properties = Vec::new();
    encode_optional_string_property(PROPERTY_KEY_AUTHENTICATION_METHOD, &auth.authentication_method, &mut properties)?;
    encode_optional_bytes_property(PROPERTY_KEY_AUTHENTICATION_DATA, &auth.authentication_data, &mut properties)?;
    encode_optional_string_property(PROPERTY_KEY_REASON_STRING, &auth.reason_string, &mut properties)?;
    encode_user_properties(&auth.user_properties, &mut properties)?;

    if auth.reason_code == AuthenticateReasonCode::Success && properties.is_empty() {
        return Ok(());
    }

    encode_u8(auth.reason_code as u8, body);
    encode_property_section(&properties, body)
}
