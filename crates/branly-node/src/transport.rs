//! Radio and power contracts the node runs on
//!
//! The node never touches hardware directly. A board crate implements
//! [`Transport`] for its radio driver and [`PowerControl`] for its sleep
//! controller; tests plug in simulated versions.

use std::time::Duration;

use branly_core::BranlyResult;
use branly_wire::{PacketType, ProtocolCodec};
use tracing::{debug, error};

/// Uplink radio
pub trait Transport {
    /// Send `data`, retrying up to `attempts` times. True once acknowledged.
    fn transmit_with_retry(&mut self, attempts: u8, data: &[u8]) -> bool;

    /// Put the radio into its low-power state
    fn sleep(&mut self);

    /// Radio register dump as (address, value) pairs
    fn dump_registers(&mut self) -> Vec<(u8, u8)> {
        Vec::new()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn transmit_with_retry(&mut self, attempts: u8, data: &[u8]) -> bool {
        (**self).transmit_with_retry(attempts, data)
    }

    fn sleep(&mut self) {
        (**self).sleep()
    }

    fn dump_registers(&mut self) -> Vec<(u8, u8)> {
        (**self).dump_registers()
    }
}

/// Low-power wait controller
pub trait PowerControl {
    /// Wait for up to `duration` in the lowest power mode available.
    /// Returns the time that actually passed.
    fn low_power_wait(&mut self, duration: Duration) -> Duration;
}

impl<P: PowerControl + ?Sized> PowerControl for Box<P> {
    fn low_power_wait(&mut self, duration: Duration) -> Duration {
        (**self).low_power_wait(duration)
    }
}

/// Result of one uplink send
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Built, transmitted and acknowledged
    Delivered,
    /// Built and transmitted, but never acknowledged
    Lost,
    /// The packet could not be encoded; nothing was transmitted
    Unbuildable,
}

impl SendOutcome {
    #[inline]
    pub fn is_delivered(self) -> bool {
        self == SendOutcome::Delivered
    }
}

/// Counters kept by the uplink
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UplinkStats {
    /// Packets acknowledged by the collector
    pub packets_sent: u64,
    /// Packets the radio gave up on
    pub send_failures: u64,
    /// Packets that could not be encoded
    pub build_failures: u64,
}

/// Codec and radio paired together
///
/// Every packet goes out the same way: build into the codec buffer,
/// transmit, then put the radio back to sleep whatever the result.
#[derive(Debug)]
pub struct Uplink<T> {
    codec: ProtocolCodec,
    transport: T,
    attempts: u8,
    stats: UplinkStats,
}

impl<T: Transport> Uplink<T> {
    pub fn new(transport: T, attempts: u8) -> Self {
        Uplink {
            codec: ProtocolCodec::new(),
            transport,
            attempts: attempts.max(1),
            stats: UplinkStats::default(),
        }
    }

    /// Build one packet and transmit it
    ///
    /// A build error is reported as [`SendOutcome::Unbuildable`] so callers
    /// can tell it apart from a lossy link; retrying it cannot help.
    pub fn send<F>(&mut self, packet_type: PacketType, build: F) -> SendOutcome
    where
        F: FnOnce(&mut ProtocolCodec) -> BranlyResult<&[u8]>,
    {
        let outcome = match build(&mut self.codec) {
            Ok(packet) => {
                if self.transport.transmit_with_retry(self.attempts, packet) {
                    self.stats.packets_sent += 1;
                    SendOutcome::Delivered
                } else {
                    self.stats.send_failures += 1;
                    debug!(?packet_type, "no acknowledgement");
                    SendOutcome::Lost
                }
            }
            Err(e) => {
                self.stats.build_failures += 1;
                error!(?packet_type, error = %e, "packet build failed");
                SendOutcome::Unbuildable
            }
        };
        self.transport.sleep();
        outcome
    }

    #[inline]
    pub fn codec(&self) -> &ProtocolCodec {
        &self.codec
    }

    #[inline]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[inline]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    #[inline]
    pub fn stats(&self) -> &UplinkStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use branly_core::{ContactId, ContactKind};
    use branly_wire::ContactListEntry;

    #[derive(Default)]
    struct Recorder {
        ack: bool,
        sent: Vec<Vec<u8>>,
        attempts: Vec<u8>,
        sleeps: usize,
    }

    impl Transport for Recorder {
        fn transmit_with_retry(&mut self, attempts: u8, data: &[u8]) -> bool {
            self.attempts.push(attempts);
            self.sent.push(data.to_vec());
            self.ack
        }

        fn sleep(&mut self) {
            self.sleeps += 1;
        }
    }

    #[test]
    fn test_send_sleeps_after_every_packet() {
        let mut uplink = Uplink::new(
            Recorder {
                ack: true,
                ..Default::default()
            },
            1,
        );
        assert_eq!(
            uplink.send(PacketType::Ping, |codec| codec.build_ping()),
            SendOutcome::Delivered
        );
        uplink.transport_mut().ack = false;
        assert_eq!(
            uplink.send(PacketType::Ping, |codec| codec.build_ping()),
            SendOutcome::Lost
        );

        let radio = uplink.transport();
        assert_eq!(radio.sent, vec![vec![0x01, 0x00], vec![0x01, 0x01]]);
        assert_eq!(radio.attempts, vec![1, 1]);
        assert_eq!(radio.sleeps, 2);
        assert_eq!(uplink.stats().packets_sent, 1);
        assert_eq!(uplink.stats().send_failures, 1);
    }

    #[test]
    fn test_build_failure_is_not_transmitted() {
        let mut uplink = Uplink::new(Recorder::default(), 3);
        let wide = ContactListEntry::new(
            ContactId::new(12).unwrap(),
            ContactKind::Temperature,
            false,
        );
        let outcome = uplink.send(PacketType::ContactList, |codec| {
            codec.build_contact_list([wide])
        });
        assert_eq!(outcome, SendOutcome::Unbuildable);
        assert!(!outcome.is_delivered());
        assert!(uplink.transport().sent.is_empty());
        assert_eq!(uplink.transport().sleeps, 1);
        assert_eq!(uplink.stats().build_failures, 1);
        assert_eq!(uplink.stats().send_failures, 0);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let mut uplink = Uplink::new(Recorder::default(), 0);
        uplink.send(PacketType::Ping, |codec| codec.build_ping());
        assert_eq!(uplink.transport().attempts, vec![1]);
    }

    #[test]
    fn test_dump_registers_default_empty() {
        let mut radio = Recorder::default();
        assert!(radio.dump_registers().is_empty());
    }
}
