// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests of the device layer against an in-process fake box.

use std::sync::Arc;
use std::time::Duration;

use bwise_lib::protocol::ConnectionPool;
use bwise_lib::types::{DeviceAddress, DeviceDescriptor, OutputIndex, PulseTicks, Threshold};
use bwise_lib::{Device, DoorState, Error};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// An in-process stand-in for a box: answers every TCP command with a
/// fixed reply, records the command lines it receives and captures UDP
/// datagrams sent to its trigger port.
struct FakeBox {
    address: DeviceAddress,
    udp: UdpSocket,
    commands: mpsc::UnboundedReceiver<String>,
}

impl FakeBox {
    async fn start(reply: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = DeviceAddress::new(
            "127.0.0.1",
            listener.local_addr().unwrap().port(),
            udp.local_addr().unwrap().port(),
        );

        let (tx, commands) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            loop {
                let (socket, _) = listener.accept().await.unwrap();
                tokio::spawn(serve(socket, reply, tx.clone()));
            }
        });

        Self {
            address,
            udp,
            commands,
        }
    }

    /// Returns the next datagram received on the trigger port.
    async fn recv_datagram(&self) -> Vec<u8> {
        let mut buf = [0u8; 128];
        let (n, _) = self.udp.recv_from(&mut buf).await.unwrap();
        buf[..n].to_vec()
    }

    /// Asserts that no datagram arrives within the given window.
    async fn expect_no_datagram(&self, window: Duration) {
        let mut buf = [0u8; 128];
        let result = timeout(window, self.udp.recv_from(&mut buf)).await;
        assert!(result.is_err(), "unexpected datagram on the trigger port");
    }
}

async fn serve(mut socket: TcpStream, reply: &'static str, seen: mpsc::UnboundedSender<String>) {
    let mut pending = Vec::new();
    let mut buf = [0u8; 256];
    loop {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = pending.drain(..=pos).collect();
                    let _ = seen.send(String::from_utf8_lossy(&line).trim_end().to_string());
                    if socket.write_all(reply.as_bytes()).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// A door on output 3 that reads as open from 150 upward.
fn garage_door(address: DeviceAddress) -> DeviceDescriptor {
    DeviceDescriptor::new("Garage Door", address, OutputIndex::new(3))
        .with_open_threshold(Threshold::new(150))
}

// ============================================================================
// Door State Tests
// ============================================================================

mod door_state {
    use super::*;

    #[tokio::test]
    async fn open_above_threshold() {
        let fake = FakeBox::start("bwr:ad:3:0:10:0:160:\r\n").await;
        let pool = Arc::new(ConnectionPool::new());
        let device = Device::tcp(&pool, garage_door(fake.address.clone())).build();

        assert_eq!(device.door_state().await.unwrap(), DoorState::Open);

        let reading = device.sensor_reading().await.unwrap();
        assert_eq!(reading.current, 10);
        assert_eq!(reading.min, 0);
        assert_eq!(reading.max, 160);
    }

    #[tokio::test]
    async fn closed_below_threshold() {
        let fake = FakeBox::start("bwr:ad:3:0:10:0:140:\r\n").await;
        let pool = Arc::new(ConnectionPool::new());
        let device = Device::tcp(&pool, garage_door(fake.address.clone())).build();

        assert_eq!(device.door_state().await.unwrap(), DoorState::Closed);
    }

    #[tokio::test]
    async fn default_threshold_is_stricter() {
        let fake = FakeBox::start("bwr:ad:3:0:10:0:160:\r\n").await;
        let pool = Arc::new(ConnectionPool::new());
        // No explicit threshold: 160 is below the default of 200.
        let descriptor =
            DeviceDescriptor::new("Garage Door", fake.address.clone(), OutputIndex::new(3));
        let device = Device::tcp(&pool, descriptor).build();

        assert_eq!(device.door_state().await.unwrap(), DoorState::Closed);
    }

    #[tokio::test]
    async fn every_state_query_hits_the_box() {
        let mut fake = FakeBox::start("bwr:ad:3:0:10:0:160:\r\n").await;
        let pool = Arc::new(ConnectionPool::new());
        let device = Device::tcp(&pool, garage_door(fake.address.clone())).build();

        device.door_state().await.unwrap();
        device.door_state().await.unwrap();

        assert_eq!(fake.commands.recv().await.unwrap(), "bwc:get:ad:3:");
        assert_eq!(fake.commands.recv().await.unwrap(), "bwc:get:ad:3:");
    }
}

// ============================================================================
// Trigger Tests
// ============================================================================

mod triggers {
    use super::*;

    #[tokio::test]
    async fn pulse_defaults_to_udp() {
        let fake = FakeBox::start("bwr:ad:3:0:10:0:160:\r\n").await;
        let pool = Arc::new(ConnectionPool::new());
        let device = Device::tcp(&pool, garage_door(fake.address.clone())).build();

        device.pulse().await.unwrap();

        assert_eq!(fake.recv_datagram().await, b"bwc:set:pulse:2:3:50:\r\n");
    }

    #[tokio::test]
    async fn pulse_ticks_are_configurable() {
        let fake = FakeBox::start("bwr:ad:3:0:10:0:160:\r\n").await;
        let pool = Arc::new(ConnectionPool::new());
        let device = Device::tcp(&pool, garage_door(fake.address.clone()))
            .with_pulse_ticks(PulseTicks::new(120))
            .build();

        device.pulse().await.unwrap();

        assert_eq!(fake.recv_datagram().await, b"bwc:set:pulse:2:3:120:\r\n");
    }

    #[tokio::test]
    async fn acknowledged_trigger_uses_the_query_transport() {
        let mut fake = FakeBox::start("bwr:ok:\r\n").await;
        let pool = Arc::new(ConnectionPool::new());
        let device = Device::tcp(&pool, garage_door(fake.address.clone()))
            .with_acknowledged_trigger()
            .build();

        device.pulse().await.unwrap();

        assert_eq!(fake.commands.recv().await.unwrap(), "bwc:set:pulse:2:3:50:");
        fake.expect_no_datagram(Duration::from_millis(200)).await;
    }
}

// ============================================================================
// Target State Tests
// ============================================================================

mod target_state {
    use super::*;

    #[tokio::test]
    async fn pulses_only_on_difference() {
        let fake = FakeBox::start("bwr:ad:3:0:10:0:160:\r\n").await;
        let pool = Arc::new(ConnectionPool::new());
        let device = Device::tcp(&pool, garage_door(fake.address.clone())).build();

        // The box reports open; asking for open must not toggle the
        // relay.
        device.set_target_state(DoorState::Open).await.unwrap();
        assert_eq!(device.target_state(), DoorState::Open);
        fake.expect_no_datagram(Duration::from_millis(200)).await;

        // Asking for closed is a real difference and pulses once.
        device.set_target_state(DoorState::Closed).await.unwrap();
        assert_eq!(device.target_state(), DoorState::Closed);
        assert_eq!(fake.recv_datagram().await, b"bwc:set:pulse:2:3:50:\r\n");
    }

    #[tokio::test]
    async fn startup_reconciles_target_with_observed() {
        let fake = FakeBox::start("bwr:ad:3:0:10:0:160:\r\n").await;
        let pool = Arc::new(ConnectionPool::new());
        let device = Device::tcp(&pool, garage_door(fake.address.clone())).build();

        // Before the settle window the default stands.
        assert_eq!(device.target_state(), DoorState::Closed);

        // Reconciliation observes the open door without pulsing it.
        fake.expect_no_datagram(Duration::from_millis(600)).await;
        assert_eq!(device.target_state(), DoorState::Open);
    }

    #[tokio::test]
    async fn failed_query_leaves_target_unchanged() {
        // No box listening on this address.
        let address = DeviceAddress::new("127.0.0.1", 59999, 59998);
        let pool = Arc::new(ConnectionPool::new());
        let device = Device::tcp(&pool, garage_door(address)).build();

        let result = device.set_target_state(DoorState::Open).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
        assert_eq!(device.target_state(), DoorState::Closed);
    }
}
