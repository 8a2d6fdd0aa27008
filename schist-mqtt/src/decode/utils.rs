/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Internal utilities to decode MQTT5 packet fields.  Each helper consumes a field from the front
//! of a byte slice and returns the unconsumed remainder.

use crate::error::{MqttError, MqttResult};
use crate::mqtt::UserProperty;

use log::*;

#[derive(Eq, PartialEq, Debug)]
pub(crate) enum DecodeVliResult<'a> {
    InsufficientData,
    Value(u32, &'a[u8]), /* (decoded value, remaining bytes) */
}

pub(crate) fn decode_vli(buffer: &[u8]) -> MqttResult<DecodeVliResult> {
    let mut value: u32 = 0;
    let mut shift: u32 = 0;

    for i in 0..4 {
        if i >= buffer.len() {
            return Ok(DecodeVliResult::InsufficientData);
        }

        let byte = buffer[i];
        value |= ((byte & 0x7F) as u32) << shift;
        shift += 7;

        if (byte & 0x80) == 0 {
            return Ok(DecodeVliResult::Value(value, &buffer[(i + 1)..]));
        }
    }

    error!("Packet Decode - invalid variable length integer");
    Err(MqttError::new_decoding_failure("invalid variable length integer"))
}

pub(crate) fn decode_vli_into_mutable<'a>(bytes: &'a[u8], value: &mut usize) -> MqttResult<&'a[u8]> {
    match decode_vli(bytes)? {
        DecodeVliResult::InsufficientData => {
            error!("Packet Decode - truncated variable length integer");
            Err(MqttError::new_decoding_failure("truncated variable length integer"))
        }
        DecodeVliResult::Value(vli, remaining_slice) => {
            *value = vli as usize;
            Ok(remaining_slice)
        }
    }
}

pub(crate) fn decode_u8<'a>(bytes: &'a[u8], value: &mut u8) -> MqttResult<&'a[u8]> {
    if bytes.is_empty() {
        error!("Packet Decode - u8 value extends past end of packet");
        return Err(MqttError::new_decoding_failure("u8 value extends past end of packet"));
    }

    *value = bytes[0];
    Ok(&bytes[1..])
}

pub(crate) fn decode_u16<'a>(bytes: &'a[u8], value: &mut u16) -> MqttResult<&'a[u8]> {
    if bytes.len() < 2 {
        error!("Packet Decode - u16 value extends past end of packet");
        return Err(MqttError::new_decoding_failure("u16 value extends past end of packet"));
    }

    *value = u16::from_be_bytes([bytes[0], bytes[1]]);
    Ok(&bytes[2..])
}

pub(crate) fn decode_u32<'a>(bytes: &'a[u8], value: &mut u32) -> MqttResult<&'a[u8]> {
    if bytes.len() < 4 {
        error!("Packet Decode - u32 value extends past end of packet");
        return Err(MqttError::new_decoding_failure("u32 value extends past end of packet"));
    }

    *value = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    Ok(&bytes[4..])
}

fn split_length_prefixed(bytes: &[u8]) -> MqttResult<(&[u8], &[u8])> {
    if bytes.len() < 2 {
        error!("Packet Decode - length prefixed value does not have a full length prefix");
        return Err(MqttError::new_decoding_failure("length prefixed value does not have a full length prefix"));
    }

    let value_length = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
    let remaining = &bytes[2..];
    if value_length > remaining.len() {
        error!("Packet Decode - length prefixed value has length larger than remaining packet bytes");
        return Err(MqttError::new_decoding_failure("length prefixed value has length larger than remaining packet bytes"));
    }

    Ok((&remaining[..value_length], &remaining[value_length..]))
}

pub(crate) fn decode_length_prefixed_string<'a>(bytes: &'a[u8], value: &mut String) -> MqttResult<&'a[u8]> {
    let (string_bytes, remaining) = split_length_prefixed(bytes)?;
    *value = std::str::from_utf8(string_bytes)?.to_string();
    Ok(remaining)
}

pub(crate) fn decode_length_prefixed_bytes<'a>(bytes: &'a[u8], value: &mut Vec<u8>) -> MqttResult<&'a[u8]> {
    let (value_bytes, remaining) = split_length_prefixed(bytes)?;
    *value = value_bytes.to_vec();
    Ok(remaining)
}

pub(crate) fn decode_optional_length_prefixed_string<'a>(bytes: &'a[u8], value: &mut Option<String>) -> MqttResult<&'a[u8]> {
    if value.is_some() {
        error!("Packet Decode - Invalid duplicate optional string property");
        return Err(MqttError::new_decoding_failure("duplicate optional string property"));
    }

    let mut decoded = String::new();
    let remaining = decode_length_prefixed_string(bytes, &mut decoded)?;
    *value = Some(decoded);
    Ok(remaining)
}

pub(crate) fn decode_optional_length_prefixed_bytes<'a>(bytes: &'a[u8], value: &mut Option<Vec<u8>>) -> MqttResult<&'a[u8]> {
    if value.is_some() {
        error!("Packet Decode - Invalid duplicate optional binary data property");
        return Err(MqttError::new_decoding_failure("duplicate optional binary data property"));
    }

    let mut decoded = Vec::new();
    let remaining = decode_length_prefixed_bytes(bytes, &mut decoded)?;
    *value = Some(decoded);
    Ok(remaining)
}

pub(crate) fn decode_user_property<'a>(bytes: &'a[u8], properties: &mut Option<Vec<UserProperty>>) -> MqttResult<&'a[u8]> {
    let mut property = UserProperty::default();

    let mut mutable_bytes = bytes;
    mutable_bytes = decode_length_prefixed_string(mutable_bytes, &mut property.name)?;
    mutable_bytes = decode_length_prefixed_string(mutable_bytes, &mut property.value)?;

    properties.get_or_insert_with(Vec::new).push(property);

    Ok(mutable_bytes)
}

pub(crate) fn decode_optional_u8_as_bool<'a>(bytes: &'a[u8], value: &mut Option<bool>) -> MqttResult<&'a[u8]> {
    if value.is_some() {
        error!("Packet Decode - Invalid duplicate optional boolean property");
        return Err(MqttError::new_decoding_failure("duplicate optional boolean property"));
    }

    let mut decoded = 0;
    let remaining = decode_u8(bytes, &mut decoded)?;
    match decoded {
        0 => { *value = Some(false); }
        1 => { *value = Some(true); }
        _ => {
            error!("Packet Decode - Invalid boolean property value ({})", decoded);
            return Err(MqttError::new_decoding_failure("invalid boolean property value"));
        }
    }

    Ok(remaining)
}

pub(crate) fn decode_optional_u16<'a>(bytes: &'a[u8], value: &mut Option<u16>) -> MqttResult<&'a[u8]> {
    if value.is_some() {
        error!("Packet Decode - Invalid duplicate optional u16 property");
        return Err(MqttError::new_decoding_failure("duplicate optional u16 property"));
    }

    let mut decoded = 0;
    let remaining = decode_u16(bytes, &mut decoded)?;
    *value = Some(decoded);
    Ok(remaining)
}

pub(crate) fn decode_optional_u32<'a>(bytes: &'a[u8], value: &mut Option<u32>) -> MqttResult<&'a[u8]> {
    if value.is_some() {
        error!("Packet Decode - Invalid duplicate optional u32 property");
        return Err(MqttError::new_decoding_failure("duplicate optional u32 property"));
    }

    let mut decoded = 0;
    let remaining = decode_u32(bytes, &mut decoded)?;
    *value = Some(decoded);
    Ok(remaining)
}

pub(crate) fn decode_optional_vli<'a>(bytes: &'a[u8], value: &mut Option<u32>) -> MqttResult<&'a[u8]> {
    if value.is_some() {
        error!("Packet Decode - Invalid duplicate optional variable length integer property");
        return Err(MqttError::new_decoding_failure("duplicate optional variable length integer property"));
    }

    let mut decoded = 0;
    let remaining = decode_vli_into_mutable(bytes, &mut decoded)?;
    *value = Some(decoded as u32);
    Ok(remaining)
}
