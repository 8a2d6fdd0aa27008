/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
An MQTT5 client session engine built on tokio.

The crate drives a single MQTT5 session over any established byte stream (`AsyncRead + AsyncWrite`):
the CONNECT handshake, subscribe and unsubscribe, QoS 0/1/2 publishing with receive-maximum flow
control, keep alive, re-authentication, and a clean shutdown that completes every outstanding
operation.  Outbound QoS 1 and QoS 2 exchanges are recorded in a pluggable [`Persistence`](client::persistence::Persistence)
store and replayed when a later connection resumes the session.  Inbound publishes are dispatched
through a pluggable [`Router`](client::router::Router).

Establishing the transport (TCP, TLS, websockets) and reconnecting are left to the caller.

# Example

```no_run
use schist_mqtt::*;
use schist_mqtt::client::config::ClientOptionsBuilder;
use schist_mqtt::client::router::HandlerResult;
use std::sync::Arc;

# async fn run() -> Result<(), Box<dyn std::error::Error>> {
let stream = tokio::net::TcpStream::connect("127.0.0.1:1883").await?;

let options = ClientOptionsBuilder::new()
    .with_publish_handler(Arc::new(|publish: &PublishPacket| -> HandlerResult {
        println!("Received a message on \"{}\"", publish.topic);
        Ok(())
    }))
    .build();

let client = Client::new(stream, options);
client.connect(ConnectPacket::builder().with_client_id("example").with_keep_alive_interval_seconds(30).build()).await?;

let subscribe = SubscribePacket::builder().with_simple_subscription("hello/world", QualityOfService::AtLeastOnce).build();
client.subscribe(subscribe, None).await?;

let publish = PublishPacket::builder("hello/world", QualityOfService::AtLeastOnce)
    .with_payload("Hello!".as_bytes())
    .build();
client.publish(publish, None).await?;

client.disconnect(DisconnectPacket::default()).await?;
# Ok(())
# }
```
 */

pub mod client;
mod decode;
mod encode;
pub mod error;
mod logging;
pub mod mqtt;

#[cfg(test)]
mod testing;

/* Re-export all packet types at the root level */
pub use mqtt::QualityOfService;
pub use mqtt::PayloadFormatIndicator;
pub use mqtt::RetainHandlingType;
pub use mqtt::ConnectReasonCode;
pub use mqtt::PubackReasonCode;
pub use mqtt::PubrecReasonCode;
pub use mqtt::PubrelReasonCode;
pub use mqtt::PubcompReasonCode;
pub use mqtt::DisconnectReasonCode;
pub use mqtt::SubackReasonCode;
pub use mqtt::UnsubackReasonCode;
pub use mqtt::AuthenticateReasonCode;
pub use mqtt::UserProperty;
pub use mqtt::Subscription;

pub use mqtt::AuthPacket;
pub use mqtt::ConnackPacket;
pub use mqtt::ConnectPacket;
pub use mqtt::DisconnectPacket;
pub use mqtt::PingreqPacket;
pub use mqtt::PingrespPacket;
pub use mqtt::PubackPacket;
pub use mqtt::PubcompPacket;
pub use mqtt::PublishPacket;
pub use mqtt::PubrecPacket;
pub use mqtt::PubrelPacket;
pub use mqtt::SubackPacket;
pub use mqtt::SubscribePacket;
pub use mqtt::UnsubackPacket;
pub use mqtt::UnsubscribePacket;
pub use mqtt::MqttPacket;
pub use mqtt::PacketType;

pub use client::{AuthResponse, Client, PublishResponse, Qos2Response};
pub use error::{MqttError, MqttResult};
