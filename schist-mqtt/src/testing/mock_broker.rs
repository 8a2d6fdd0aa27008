/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::decode::read_packet;
use crate::encode::encode_packet;
use crate::error::MqttResult;
use crate::mqtt::*;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream, WriteHalf};
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Default)]
pub(crate) struct BrokerTestContext {
    pub(crate) connect_count: usize,
    pub(crate) received: Vec<MqttPacket>,
}

pub(crate) type PacketHandler = Box<dyn Fn(&MqttPacket, &mut VecDeque<MqttPacket>, &mut BrokerTestContext) -> MqttResult<()> + Send + Sync + 'static>;
pub(crate) type PacketHandlerSet = HashMap<PacketType, PacketHandler>;

fn handle_connect_with_successful_connack(packet: &MqttPacket, response_packets: &mut VecDeque<MqttPacket>, context: &mut BrokerTestContext) -> MqttResult<()> {
    if let MqttPacket::Connect(connect) = packet {
        context.connect_count += 1;

        let mut assigned_client_identifier = None;
        if connect.client_id.is_none() {
            assigned_client_identifier = Some("auto-assigned-client-id".to_string());
        }

        response_packets.push_back(MqttPacket::Connack(ConnackPacket {
            assigned_client_identifier,
            ..Default::default()
        }));

        return Ok(());
    }

    panic!("Invalid packet handler state")
}

/// Answers every CONNECT with a copy of the supplied CONNACK
pub(crate) fn handle_connect_with_connack(connack: ConnackPacket) -> PacketHandler {
    Box::new(move |packet: &MqttPacket, response_packets: &mut VecDeque<MqttPacket>, context: &mut BrokerTestContext| -> MqttResult<()> {
        if let MqttPacket::Connect(_) = packet {
            context.connect_count += 1;
            response_packets.push_back(MqttPacket::Connack(connack.clone()));
            return Ok(());
        }

        panic!("Invalid packet handler state")
    })
}

fn handle_pingreq_with_pingresp(_: &MqttPacket, response_packets: &mut VecDeque<MqttPacket>, _: &mut BrokerTestContext) -> MqttResult<()> {
    response_packets.push_back(MqttPacket::Pingresp(PingrespPacket{}));

    Ok(())
}

fn handle_publish_with_success_no_relay(packet: &MqttPacket, response_packets: &mut VecDeque<MqttPacket>, _: &mut BrokerTestContext) -> MqttResult<()> {
    if let MqttPacket::Publish(publish) = packet {
        match publish.qos {
            QualityOfService::AtMostOnce => {}
            QualityOfService::AtLeastOnce => {
                response_packets.push_back(MqttPacket::Puback(PubackPacket{
                    packet_id : publish.packet_id,
                    ..Default::default()
                }));
            }
            QualityOfService::ExactlyOnce => {
                response_packets.push_back(MqttPacket::Pubrec(PubrecPacket{
                    packet_id : publish.packet_id,
                    ..Default::default()
                }));
            }
        }

        return Ok(());
    }

    panic!("Invalid packet handler state")
}

pub(crate) fn handle_publish_with_failure(packet: &MqttPacket, response_packets: &mut VecDeque<MqttPacket>, _: &mut BrokerTestContext) -> MqttResult<()> {
    if let MqttPacket::Publish(publish) = packet {
        match publish.qos {
            QualityOfService::AtMostOnce => {}
            QualityOfService::AtLeastOnce => {
                response_packets.push_back(MqttPacket::Puback(PubackPacket{
                    packet_id : publish.packet_id,
                    reason_code : PubackReasonCode::QuotaExceeded,
                    ..Default::default()
                }));
            }
            QualityOfService::ExactlyOnce => {
                response_packets.push_back(MqttPacket::Pubrec(PubrecPacket{
                    packet_id : publish.packet_id,
                    reason_code : PubrecReasonCode::QuotaExceeded,
                    ..Default::default()
                }));
            }
        }

        return Ok(());
    }

    panic!("Invalid packet handler state")
}

fn handle_pubrec_with_success(packet: &MqttPacket, response_packets: &mut VecDeque<MqttPacket>, _: &mut BrokerTestContext) -> MqttResult<()> {
    if let MqttPacket::Pubrec(pubrec) = packet {
        response_packets.push_back(MqttPacket::Pubrel(PubrelPacket{
            packet_id : pubrec.packet_id,
            ..Default::default()
        }));

        return Ok(());
    }

    panic!("Invalid packet handler state")
}

fn handle_pubrel_with_success(packet: &MqttPacket, response_packets: &mut VecDeque<MqttPacket>, _: &mut BrokerTestContext) -> MqttResult<()> {
    if let MqttPacket::Pubrel(pubrel) = packet {
        response_packets.push_back(MqttPacket::Pubcomp(PubcompPacket{
            packet_id : pubrel.packet_id,
            ..Default::default()
        }));

        return Ok(());
    }

    panic!("Invalid packet handler state")
}

fn handle_subscribe_with_success(packet: &MqttPacket, response_packets: &mut VecDeque<MqttPacket>, _: &mut BrokerTestContext) -> MqttResult<()> {
    if let MqttPacket::Subscribe(subscribe) = packet {
        let mut reason_codes = Vec::new();
        for subscription in &subscribe.subscriptions {
            match subscription.qos {
                QualityOfService::AtMostOnce => { reason_codes.push(SubackReasonCode::GrantedQos0); }
                QualityOfService::AtLeastOnce => { reason_codes.push(SubackReasonCode::GrantedQos1); }
                QualityOfService::ExactlyOnce => { reason_codes.push(SubackReasonCode::GrantedQos2); }
            }
        }

        response_packets.push_back(MqttPacket::Suback(SubackPacket{
            packet_id : subscribe.packet_id,
            reason_codes,
            ..Default::default()
        }));

        return Ok(());
    }

    panic!("Invalid packet handler state")
}

fn handle_unsubscribe_with_success(packet: &MqttPacket, response_packets: &mut VecDeque<MqttPacket>, _: &mut BrokerTestContext) -> MqttResult<()> {
    if let MqttPacket::Unsubscribe(unsubscribe) = packet {
        let mut reason_codes = Vec::new();
        for _ in &unsubscribe.topic_filters {
            reason_codes.push(UnsubackReasonCode::Success);
        }

        response_packets.push_back(MqttPacket::Unsuback(UnsubackPacket{
            packet_id : unsubscribe.packet_id,
            reason_codes,
            ..Default::default()
        }));

        return Ok(());
    }

    panic!("Invalid packet handler state")
}

pub(crate) fn handle_with_nothing(_: &MqttPacket, _: &mut VecDeque<MqttPacket>, _: &mut BrokerTestContext) -> MqttResult<()> {
    Ok(())
}

fn handle_with_panic(_: &MqttPacket, _: &mut VecDeque<MqttPacket>, _: &mut BrokerTestContext) -> MqttResult<()> {
    panic!("Invalid packet handler state")
}

pub(crate) fn create_default_packet_handlers() -> PacketHandlerSet {
    let mut handlers : HashMap<PacketType, PacketHandler> = HashMap::new();

    handlers.insert(PacketType::Connect, Box::new(handle_connect_with_successful_connack));
    handlers.insert(PacketType::Pingreq, Box::new(handle_pingreq_with_pingresp));
    handlers.insert(PacketType::Publish, Box::new(handle_publish_with_success_no_relay));
    handlers.insert(PacketType::Pubrec, Box::new(handle_pubrec_with_success));
    handlers.insert(PacketType::Pubrel, Box::new(handle_pubrel_with_success));
    handlers.insert(PacketType::Subscribe, Box::new(handle_subscribe_with_success));
    handlers.insert(PacketType::Unsubscribe, Box::new(handle_unsubscribe_with_success));

    handlers.insert(PacketType::Disconnect, Box::new(handle_with_nothing));
    handlers.insert(PacketType::Auth, Box::new(handle_with_nothing));
    handlers.insert(PacketType::Puback, Box::new(handle_with_nothing));
    handlers.insert(PacketType::Pubcomp, Box::new(handle_with_nothing));

    handlers.insert(PacketType::Connack, Box::new(handle_with_panic));
    handlers.insert(PacketType::Suback, Box::new(handle_with_panic));
    handlers.insert(PacketType::Unsuback, Box::new(handle_with_panic));
    handlers.insert(PacketType::Pingresp, Box::new(handle_with_panic));

    handlers
}

enum BrokerCommand {
    Send(MqttPacket),
    Close,
}

type BrokerSink = Arc<tokio::sync::Mutex<WriteHalf<DuplexStream>>>;

async fn write_to_client(sink: &BrokerSink, packet: &MqttPacket) {
    let bytes = encode_packet(packet).unwrap();
    let mut sink = sink.lock().await;
    let _ = sink.write_all(&bytes).await;
}

/// An in-process broker on the far side of a duplex pipe.  Each packet the client sends is
/// recorded and handed to the handler registered for its type; whatever the handler queues is
/// written back.
pub(crate) struct MockBroker {
    context: Arc<Mutex<BrokerTestContext>>,
    commands: mpsc::UnboundedSender<BrokerCommand>,
}

impl MockBroker {

    /// Must be called from within a tokio runtime.  Returns the client's end of the pipe.
    pub(crate) fn new(handlers: PacketHandlerSet) -> (MockBroker, DuplexStream) {
        let (client_stream, broker_stream) = tokio::io::duplex(64 * 1024);
        let (mut reader, writer) = tokio::io::split(broker_stream);
        let sink : BrokerSink = Arc::new(tokio::sync::Mutex::new(writer));
        let context = Arc::new(Mutex::new(BrokerTestContext::default()));

        let reader_sink = sink.clone();
        let reader_context = context.clone();
        tokio::spawn(async move {
            while let Ok(packet) = read_packet(&mut reader, 0).await {
                let mut responses = VecDeque::new();
                {
                    let mut context = reader_context.lock().unwrap();
                    context.received.push(packet.clone());
                    if let Some(handler) = handlers.get(&packet.packet_type()) {
                        if (handler)(&packet, &mut responses, &mut context).is_err() {
                            panic!("Test triggered broker packet handling failure");
                        }
                    }
                }

                for response in &responses {
                    write_to_client(&reader_sink, response).await;
                }
            }
        });

        let (commands, mut command_receiver) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(command) = command_receiver.recv().await {
                match command {
                    BrokerCommand::Send(packet) => {
                        write_to_client(&sink, &packet).await;
                    }
                    BrokerCommand::Close => {
                        let _ = sink.lock().await.shutdown().await;
                        return;
                    }
                }
            }
        });

        (MockBroker { context, commands }, client_stream)
    }

    /// Writes an unsolicited packet to the client
    pub(crate) fn send_to_client(&self, packet: MqttPacket) {
        let _ = self.commands.send(BrokerCommand::Send(packet));
    }

    /// Closes the broker-to-client direction; the client sees end of stream
    pub(crate) fn close(&self) {
        let _ = self.commands.send(BrokerCommand::Close);
    }

    pub(crate) fn received(&self) -> Vec<MqttPacket> {
        self.context.lock().unwrap().received.clone()
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.context.lock().unwrap().connect_count
    }

    fn count(&self, packet_type: PacketType) -> usize {
        self.context.lock().unwrap().received.iter().filter(|packet| packet.packet_type() == packet_type).count()
    }

    /// Waits until at least `count` packets of a type have arrived, then returns everything received
    pub(crate) async fn wait_for_packets(&self, packet_type: PacketType, count: usize) -> Vec<MqttPacket> {
        wait_for(|| self.count(packet_type) >= count).await;
        self.received()
    }
}

pub(crate) async fn wait_for<F>(condition: F) where F : Fn() -> bool {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while !condition() {
        if Instant::now() >= deadline {
            panic!("Timed out waiting for test condition");
        }

        sleep(Duration::from_millis(5)).await;
    }
}
