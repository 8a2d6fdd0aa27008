/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Internal utilities to encode MQTT5 packet fields, based on the MQTT5 spec

use crate::error::{MqttError, MqttResult};
use crate::mqtt::UserProperty;
use crate::mqtt::utils::*;

use log::*;

pub(crate) fn encode_u8(value: u8, dest: &mut Vec<u8>) {
    dest.push(value);
}

pub(crate) fn encode_u16(value: u16, dest: &mut Vec<u8>) {
    dest.extend_from_slice(&value.to_be_bytes());
}

pub(crate) fn encode_u32(value: u32, dest: &mut Vec<u8>) {
    dest.extend_from_slice(&value.to_be_bytes());
}

pub(crate) fn encode_vli(value: u32, dest: &mut Vec<u8>) -> MqttResult<()> {
    if value as usize > MAXIMUM_VARIABLE_LENGTH_INTEGER {
        error!("Packet Encode - variable length integer value ({}) exceeds maximum", value);
        return Err(MqttError::new_encoding_failure("variable length integer maximum exceeded"));
    }

    let mut done = false;
    let mut val = value;
    while !done {
        let mut byte: u8 = (val & 0x7F) as u8;
        val /= 128;

        if val != 0 {
            byte |= 128;
        }

        dest.push(byte);

        done = val == 0;
    }

    Ok(())
}

pub(crate) fn compute_variable_length_integer_encode_size(value: usize) -> MqttResult<usize> {
    if value < 1usize << 7 {
        Ok(1)
    } else if value < 1usize << 14 {
        Ok(2)
    } else if value < 1usize << 21 {
        Ok(3)
    } else if value < 1usize << 28 {
        Ok(4)
    } else {
        Err(MqttError::new_encoding_failure("variable length integer maximum exceeded"))
    }
}

pub(crate) fn encode_length_prefixed_bytes(value: &[u8], dest: &mut Vec<u8>) -> MqttResult<()> {
    if value.len() > u16::MAX as usize {
        error!("Packet Encode - length prefixed field too long ({} bytes)", value.len());
        return Err(MqttError::new_encoding_failure("length prefixed field exceeds 65535 bytes"));
    }

    encode_u16(value.len() as u16, dest);
    dest.extend_from_slice(value);
    Ok(())
}

pub(crate) fn encode_length_prefixed_string(value: &str, dest: &mut Vec<u8>) -> MqttResult<()> {
    encode_length_prefixed_bytes(value.as_bytes(), dest)
}

pub(crate) fn encode_optional_u8_property(key: u8, value: Option<u8>, dest: &mut Vec<u8>) {
    if let Some(val) = value {
        encode_u8(key, dest);
        encode_u8(val, dest);
    }
}

pub(crate) fn encode_optional_bool_property(key: u8, value: Option<bool>, dest: &mut Vec<u8>) {
    encode_optional_u8_property(key, value.map(|val| val as u8), dest);
}

pub(crate) fn encode_optional_u16_property(key: u8, value: Option<u16>, dest: &mut Vec<u8>) {
    if let Some(val) = value {
        encode_u8(key, dest);
        encode_u16(val, dest);
    }
}

pub(crate) fn encode_optional_u32_property(key: u8, value: Option<u32>, dest: &mut Vec<u8>) {
    if let Some(val) = value {
        encode_u8(key, dest);
        encode_u32(val, dest);
    }
}

pub(crate) fn encode_optional_vli_property(key: u8, value: Option<u32>, dest: &mut Vec<u8>) -> MqttResult<()> {
    if let Some(val) = value {
        encode_u8(key, dest);
        encode_vli(val, dest)?;
    }

    Ok(())
}

pub(crate) fn encode_optional_string_property(key: u8, value: &Option<String>, dest: &mut Vec<u8>) -> MqttResult<()> {
    if let Some(val) = value {
        encode_u8(key, dest);
        encode_length_prefixed_string(val, dest)?;
    }

    Ok(())
}

pub(crate) fn encode_optional_bytes_property(key: u8, value: &Option<Vec<u8>>, dest: &mut Vec<u8>) -> MqttResult<()> {
    if let Some(val) = value {
        encode_u8(key, dest);
        encode_length_prefixed_bytes(val, dest)?;
    }

    Ok(())
}

pub(crate) fn encode_user_properties(properties: &Option<Vec<UserProperty>>, dest: &mut Vec<u8>) -> MqttResult<()> {
    if let Some(properties) = properties {
        for property in properties {
            encode_u8(PROPERTY_KEY_USER_PROPERTY, dest);
            encode_length_prefixed_string(&property.name, dest)?;
            encode_length_prefixed_string(&property.value, dest)?;
        }
    }

    Ok(())
}

/// Appends a property section (length prefix followed by the already-encoded properties)
pub(crate) fn encode_property_section(properties: &[u8], dest: &mut Vec<u8>) -> MqttResult<()> {
    encode_vli(properties.len() as u32, dest)?;
    dest.extend_from_slice(properties);
    Ok(())
}
