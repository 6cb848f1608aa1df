//! Canned packet sources for tests.
use std::collections::VecDeque;
use crate::error::{Error, Result};
use super::containers::{LayerRecord, NetworkLayer, PacketRecord};
use super::utils::PacketSource;

fn packet(network: Option<(&str, &str, &str)>, layers: &[&str]) -> PacketRecord {
    PacketRecord {
        network: network.map(|(src, dst, transport)| NetworkLayer {
            src: src.to_string(),
            dst: dst.to_string(),
            transport: Some(transport.to_string()),
        }),
        layers: layers.iter().map(|name| LayerRecord::new(name)).collect(),
    }
}

/// TCP and UDP from 10.0.0.1, followed by an ARP packet with no network layer.
pub fn scenario_packets() -> Vec<PacketRecord> {
    vec![
        packet(Some(("10.0.0.1", "10.0.0.2", "TCP")), &["eth", "ip", "tcp"]),
        packet(Some(("10.0.0.1", "10.0.0.3", "UDP")), &["eth", "ip", "udp"]),
        packet(None, &["eth", "arp"]),
    ]
}

/// Hands out a fixed list of packets and remembers how many were asked for.
pub struct VecSource {
    packets: VecDeque<PacketRecord>,
    pulled: usize,
}

impl VecSource {
    pub fn new(packets: Vec<PacketRecord>) -> Self {
        Self {
            packets: packets.into(),
            pulled: 0,
        }
    }

    pub fn pulled(&self) -> usize {
        self.pulled
    }
}

impl PacketSource for VecSource {
    fn next_packet(&mut self) -> Result<Option<PacketRecord>> {
        let packet = self.packets.pop_front();
        if packet.is_some() {
            self.pulled += 1;
        }
        Ok(packet)
    }
}

/// Like [VecSource], but the decoder "dies" after `good` packets.
pub struct FailingSource {
    inner: VecSource,
    good: usize,
}

impl FailingSource {
    pub fn after(packets: Vec<PacketRecord>, good: usize) -> Self {
        Self {
            inner: VecSource::new(packets),
            good,
        }
    }
}

impl PacketSource for FailingSource {
    fn next_packet(&mut self) -> Result<Option<PacketRecord>> {
        if self.inner.pulled() >= self.good {
            return Err(Error::Decode("tshark exited unexpectedly".to_string()));
        }
        self.inner.next_packet()
    }
}
