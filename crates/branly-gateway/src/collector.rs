//! Collector - learns nodes and their contacts, then tracks reported values
//!
//! A node becomes known through its contact list. Values are accepted only
//! for known contacts of known nodes.

use std::collections::BTreeMap;

use branly_core::{BranlyResult, ContactId, ContactKind, NodeAddress};
use branly_wire::{ContactListEntry, Packet, Payload, ValueEntry, ValueFlags};
use tracing::{debug, error, info, warn};

use crate::{ModemLine, RadioFrame};

/// Boot announcement from a node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HelloInfo {
    pub hw_version: u8,
    pub sw_version: u8,
    pub status: u8,
}

/// Collector view of one contact
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactRecord {
    pub id: ContactId,
    /// Low nibble of the kind tag, as carried by the contact list
    pub kind_tag: u8,
    pub writeable: bool,
    /// Last reported value; `None` until the first report
    pub value: Option<i32>,
    pub flags: ValueFlags,
}

impl ContactRecord {
    fn learn(entry: &ContactListEntry) -> Self {
        ContactRecord {
            id: entry.id,
            kind_tag: entry.kind_tag,
            writeable: entry.writeable,
            value: None,
            flags: ValueFlags::NONE,
        }
    }

    pub fn kind(&self) -> Option<ContactKind> {
        ContactKind::from_byte(self.kind_tag)
    }

    #[inline]
    pub fn is_violated(&self) -> bool {
        self.flags.is_violated()
    }
}

/// Collector view of one node
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeRecord {
    pub hello: Option<HelloInfo>,
    pub last_seq: Option<u8>,
    pub rssi: Option<i16>,
    pub packets: u64,
    /// Set once a contact list arrived
    pub known: bool,
    pub contacts: Vec<ContactRecord>,
}

impl NodeRecord {
    pub fn contact(&self, id: ContactId) -> Option<&ContactRecord> {
        self.contacts.iter().find(|c| c.id == id)
    }

    fn contact_mut(&mut self, id: ContactId) -> Option<&mut ContactRecord> {
        self.contacts.iter_mut().find(|c| c.id == id)
    }
}

/// What the collector did with a packet
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Handled {
    /// Same sequence number as the previous packet from this node
    Duplicate,
    Hello(HelloInfo),
    Ping,
    /// Contact list processed; number of contacts not seen before
    ContactsLearned(usize),
    /// Values stored for known contacts; unknown ids were ignored
    Values {
        updated: usize,
        unknown: Vec<ContactId>,
    },
    /// Values from a node that never sent its contact list
    UnknownNode,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectorStats {
    pub lines: u64,
    pub debug_lines: u64,
    pub malformed: u64,
    pub packets: u64,
    pub duplicates: u64,
    pub rejected: u64,
}

/// Node and contact registry fed by received packets
#[derive(Debug, Default)]
pub struct Collector {
    nodes: BTreeMap<NodeAddress, NodeRecord>,
    stats: CollectorStats,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and handle one modem line. Debug lines are logged and yield
    /// `None`.
    pub fn handle_line(&mut self, line: &str) -> BranlyResult<Option<Handled>> {
        self.stats.lines += 1;
        let parsed = ModemLine::parse(line).map_err(|e| {
            self.stats.malformed += 1;
            error!(error = %e, "invalid modem line");
            e
        })?;

        match parsed {
            ModemLine::Debug(text) => {
                self.stats.debug_lines += 1;
                debug!("MODEM: {text}");
                Ok(None)
            }
            ModemLine::Packet(frame) => self.handle_frame(&frame).map(Some),
        }
    }

    /// Decode and handle one radio frame
    pub fn handle_frame(&mut self, frame: &RadioFrame) -> BranlyResult<Handled> {
        let packet = Packet::parse(&frame.data).map_err(|e| {
            self.stats.malformed += 1;
            error!(from = %frame.from, error = %e, "illegal packet");
            e
        })?;

        let handled = self.handle(frame.from, &packet);
        if let Some(node) = self.nodes.get_mut(&frame.from) {
            node.rssi = Some(frame.rssi);
        }
        Ok(handled)
    }

    /// Handle a decoded packet from `from`
    pub fn handle(&mut self, from: NodeAddress, packet: &Packet) -> Handled {
        self.stats.packets += 1;
        let node = self.nodes.entry(from).or_default();

        if node.last_seq == Some(packet.seq) {
            self.stats.duplicates += 1;
            info!(%from, seq = packet.seq, "skipping duplicate packet");
            return Handled::Duplicate;
        }
        node.last_seq = Some(packet.seq);
        node.packets += 1;

        let handled = match &packet.payload {
            Payload::Hello {
                hw_version,
                sw_version,
                status,
            } => {
                let hello = HelloInfo {
                    hw_version: *hw_version,
                    sw_version: *sw_version,
                    status: *status,
                };
                info!(
                    %from,
                    hw_version = *hw_version,
                    sw_version = *sw_version,
                    status = *status,
                    "node hello"
                );
                node.hello = Some(hello);
                Handled::Hello(hello)
            }
            Payload::Ping => {
                debug!(%from, "ping");
                Handled::Ping
            }
            Payload::ContactList(entries) => {
                Handled::ContactsLearned(learn_contacts(from, node, entries))
            }
            Payload::ContactReport(_) | Payload::ContactValue(_) => {
                store_values(from, node, packet.values())
            }
        };

        if matches!(handled, Handled::UnknownNode)
            || matches!(&handled, Handled::Values { unknown, .. } if !unknown.is_empty())
        {
            self.stats.rejected += 1;
        }
        handled
    }

    /// Nodes that sent a contact list
    pub fn known_nodes(&self) -> impl Iterator<Item = (NodeAddress, &NodeRecord)> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.known)
            .map(|(addr, n)| (*addr, n))
    }

    /// Any node heard from, known or not
    pub fn node(&self, addr: NodeAddress) -> Option<&NodeRecord> {
        self.nodes.get(&addr)
    }

    pub fn contact(&self, addr: NodeAddress, id: ContactId) -> Option<&ContactRecord> {
        self.nodes.get(&addr).filter(|n| n.known)?.contact(id)
    }

    pub fn stats(&self) -> &CollectorStats {
        &self.stats
    }
}

fn learn_contacts(from: NodeAddress, node: &mut NodeRecord, entries: &[ContactListEntry]) -> usize {
    if !node.known {
        info!(%from, "new node");
        node.known = true;
    }

    let mut learned = 0;
    for entry in entries {
        // Changed kinds are not picked up; first description wins
        if node.contact(entry.id).is_some() {
            continue;
        }
        debug!(
            %from,
            contact = %entry.id,
            kind = entry.kind_tag,
            writeable = entry.writeable,
            "new contact"
        );
        node.contacts.push(ContactRecord::learn(entry));
        learned += 1;
    }
    learned
}

fn store_values(from: NodeAddress, node: &mut NodeRecord, values: &[ValueEntry]) -> Handled {
    if !node.known {
        error!(%from, "contact values from unknown node");
        return Handled::UnknownNode;
    }

    let mut updated = 0;
    let mut unknown = Vec::new();
    for entry in values {
        match node.contact_mut(entry.id) {
            Some(contact) => {
                contact.value = Some(entry.value);
                contact.flags = entry.flags;
                debug!(%from, contact = %entry.id, value = entry.value, "value");
                updated += 1;
            }
            None => {
                warn!(%from, contact = %entry.id, "value for unknown contact");
                unknown.push(entry.id);
            }
        }
    }
    Handled::Values { updated, unknown }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> NodeAddress {
        NodeAddress::new(0x10)
    }

    fn id(n: u8) -> ContactId {
        ContactId::new(n).unwrap()
    }

    fn feed(collector: &mut Collector, line: &str) -> Option<Handled> {
        collector.handle_line(line).unwrap()
    }

    #[test]
    fn test_gateway_session() {
        let mut collector = Collector::new();

        let hello = feed(&mut collector, ":P:10:1:-42:00 00 10 25 00;");
        assert_eq!(
            hello,
            Some(Handled::Hello(HelloInfo {
                hw_version: 0x10,
                sw_version: 0x25,
                status: 0
            }))
        );
        // Hello alone does not make the node known
        assert_eq!(collector.known_nodes().count(), 0);

        let list = feed(&mut collector, ":P:10:1:-42:02 01 12 21 37 ca;");
        assert_eq!(list, Some(Handled::ContactsLearned(4)));

        let report = feed(
            &mut collector,
            ":P:10:1:-42:03 02 31 7c 0b 00 00 32 f5 00 00 00 03 00;",
        );
        assert_eq!(
            report,
            Some(Handled::Values {
                updated: 3,
                unknown: vec![]
            })
        );

        feed(&mut collector, ":P:10:1:-42:04 03 32 f5 00 00 00;");
        feed(&mut collector, ":P:10:1:-42:04 04 03 0a;");

        assert_eq!(collector.contact(addr(), id(1)).unwrap().value, Some(2940));
        assert_eq!(collector.contact(addr(), id(2)).unwrap().value, Some(245));
        assert_eq!(collector.contact(addr(), id(3)).unwrap().value, Some(10));
        assert_eq!(collector.contact(addr(), id(4)).unwrap().value, None);
        assert!(collector.contact(addr(), id(4)).unwrap().writeable);

        let node = collector.node(addr()).unwrap();
        assert_eq!(node.rssi, Some(-42));
        assert_eq!(node.packets, 5);
        assert_eq!(node.last_seq, Some(4));
    }

    #[test]
    fn test_duplicate_sequence_skipped() {
        let mut collector = Collector::new();
        feed(&mut collector, ":P:10:1:-42:02 01 12;");
        feed(&mut collector, ":P:10:1:-42:04 05 31 7c 0b 00 00;");
        let dup = feed(&mut collector, ":P:10:1:-42:04 05 31 00 00 00 00;");
        assert_eq!(dup, Some(Handled::Duplicate));
        assert_eq!(collector.contact(addr(), id(1)).unwrap().value, Some(2940));
        assert_eq!(collector.stats().duplicates, 1);
    }

    #[test]
    fn test_sequence_is_tracked_per_node() {
        let mut collector = Collector::new();
        feed(&mut collector, ":P:10:1:-42:01 07;");
        assert_eq!(
            feed(&mut collector, ":P:11:1:-42:01 07;"),
            Some(Handled::Ping)
        );
    }

    #[test]
    fn test_values_from_unknown_node_rejected() {
        let mut collector = Collector::new();
        let handled = feed(&mut collector, ":P:20:1:-60:04 00 03 0a;");
        assert_eq!(handled, Some(Handled::UnknownNode));
        assert_eq!(collector.stats().rejected, 1);
        assert!(collector.contact(NodeAddress::new(0x20), id(3)).is_none());
    }

    #[test]
    fn test_values_for_unknown_contact_rejected() {
        let mut collector = Collector::new();
        feed(&mut collector, ":P:10:1:-42:02 00 12;");
        let handled = feed(&mut collector, ":P:10:1:-42:03 01 01 05 0f 06;");
        assert_eq!(
            handled,
            Some(Handled::Values {
                updated: 1,
                unknown: vec![id(15)]
            })
        );
        assert_eq!(collector.contact(addr(), id(1)).unwrap().value, Some(5));
    }

    #[test]
    fn test_contacts_not_relearned() {
        let mut collector = Collector::new();
        feed(&mut collector, ":P:10:1:-42:02 00 12 21;");
        let again = feed(&mut collector, ":P:10:1:-42:02 01 12 21 37;");
        assert_eq!(again, Some(Handled::ContactsLearned(1)));
        assert_eq!(collector.node(addr()).unwrap().contacts.len(), 3);
    }

    #[test]
    fn test_violation_flag_stored() {
        let mut collector = Collector::new();
        feed(&mut collector, ":P:10:1:-42:02 00 51;");
        feed(&mut collector, ":P:10:1:-42:04 01 45 f6;");
        let contact = collector.contact(addr(), id(5)).unwrap();
        assert_eq!(contact.value, Some(-10));
        assert!(contact.is_violated());
        assert_eq!(contact.kind(), Some(ContactKind::Temperature));
    }

    #[test]
    fn test_debug_and_bad_lines() {
        let mut collector = Collector::new();
        assert_eq!(feed(&mut collector, "# Hello world"), None);
        assert!(collector.handle_line(":P:10:1:-42:00 00 10 25 00").is_err());
        assert!(collector.handle_line(":P:10:1:-42:09 00;").is_err());
        let stats = collector.stats();
        assert_eq!(stats.lines, 3);
        assert_eq!(stats.debug_lines, 1);
        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.packets, 0);
    }
}
