//! End-to-end scenarios: node -> simulated radio -> modem line -> collector

use std::fmt::Write as _;

use branly_core::{
    BranlyResult, ContactId, ContactKind, NodeAddress, NodeIdentity, ReportInterval,
};
use branly_gateway::{Collector, Handled};
use branly_node::{Contact, Node, NodeConfig, ReadFn, SharedValue};
use tracing::debug;

use crate::{RadioConfig, SimulatedRadio, VirtualClock};

/// Gateway address nodes send to
pub const GATEWAY_ADDRESS: NodeAddress = NodeAddress(0x01);

/// Format a packet the way the gateway modem prints it
pub fn modem_line(from: NodeAddress, to: NodeAddress, rssi: i16, data: &[u8]) -> String {
    let mut line = format!(":P:{:x}:{:x}:{}:", from.0, to.0, rssi);
    for (i, b) in data.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        let _ = write!(line, "{b:02x}");
    }
    line.push(';');
    line
}

/// Provisioned identity for simulated node `address`
pub fn test_identity(address: u8) -> NodeIdentity {
    NodeIdentity::new(0x42, NodeAddress::new(address), [0x5A; 16])
}

/// Contact id that is known to be in range
pub fn contact_id(n: u8) -> ContactId {
    ContactId::from_nibble(n)
}

/// A typical mains-powered sensor node
///
/// - 1: supply voltage, every minute
/// - 2: temperature, every fifteen minutes, violated at or below 0
/// - 3: button, on demand
/// - 4: writeable power switch backed by `switch`
pub fn standard_contacts(switch: &SharedValue) -> Vec<Contact> {
    let mut millivolts = 3300;
    let mut relay = Contact::new(contact_id(4), ContactKind::PowerSwitch)
        .with_source(switch.clone());
    relay.make_writeable();

    vec![
        Contact::new(contact_id(1), ContactKind::Voltage)
            .with_source(ReadFn(move || {
                millivolts -= 1;
                millivolts
            }))
            .with_interval(ReportInterval::ONE_MINUTE),
        Contact::new(contact_id(2), ContactKind::Temperature)
            .with_source(ReadFn(|| 21))
            .with_interval(ReportInterval::FIFTEEN_MINUTES)
            .with_lower_threshold(0),
        Contact::new(contact_id(3), ContactKind::Button),
        relay,
    ]
}

/// One node talking to one collector over a simulated radio
pub struct Scenario {
    node: Node<SimulatedRadio, VirtualClock>,
    collector: Collector,
    address: NodeAddress,
    rssi: i16,
    handled: Vec<Handled>,
}

impl Scenario {
    pub fn new(address: u8, radio: RadioConfig, config: NodeConfig) -> BranlyResult<Self> {
        let node = Node::with_config(
            test_identity(address),
            0x10,
            0x25,
            SimulatedRadio::new(radio),
            VirtualClock::new(),
            config,
        )?;

        Ok(Scenario {
            node,
            collector: Collector::new(),
            address: NodeAddress::new(address),
            rssi: -42,
            handled: Vec::new(),
        })
    }

    /// Register contacts; ones the node refuses are dropped
    pub fn with_contacts(mut self, contacts: impl IntoIterator<Item = Contact>) -> Self {
        for contact in contacts {
            self.node.add_contact(contact);
        }
        self
    }

    pub fn node(&self) -> &Node<SimulatedRadio, VirtualClock> {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut Node<SimulatedRadio, VirtualClock> {
        &mut self.node
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    pub fn address(&self) -> NodeAddress {
        self.address
    }

    /// Everything the collector did so far
    pub fn handled(&self) -> &[Handled] {
        &self.handled
    }

    /// Step the node once and deliver what the modem heard
    pub fn step(&mut self) -> BranlyResult<()> {
        self.node.step();
        self.deliver()
    }

    pub fn run(&mut self, steps: usize) -> BranlyResult<()> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }

    /// Step until `done` holds. Returns the steps taken, or `None` if it
    /// never held within `max_steps`.
    pub fn run_until<F>(&mut self, max_steps: usize, mut done: F) -> BranlyResult<Option<usize>>
    where
        F: FnMut(&Self) -> bool,
    {
        for n in 0..max_steps {
            if done(self) {
                return Ok(Some(n));
            }
            self.step()?;
        }
        Ok(done(self).then_some(max_steps))
    }

    fn deliver(&mut self) -> BranlyResult<()> {
        for frame in self.node.transport_mut().drain() {
            let line = modem_line(self.address, GATEWAY_ADDRESS, self.rssi, &frame);
            debug!(%line, "modem");
            if let Some(handled) = self.collector.handle_line(&line)? {
                self.handled.push(handled);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use branly_gateway::ModemLine;

    #[test]
    fn test_modem_line_format() {
        let hello = [0x00, 0x00, 0x10, 0x25, 0x00];
        let line = modem_line(NodeAddress::new(0x10), GATEWAY_ADDRESS, -42, &hello);
        assert_eq!(line, ":P:10:1:-42:00 00 10 25 00;");
        assert!(matches!(ModemLine::parse(&line), Ok(ModemLine::Packet(_))));
    }

    #[test]
    fn test_standard_contacts() {
        let switch = SharedValue::new(0);
        let contacts = standard_contacts(&switch);
        assert_eq!(contacts.len(), 4);
        assert!(contacts[3].is_writeable());
        assert!(contacts.iter().all(|c| c.id().fits_contact_list()));
    }
}
