//! Branly Node - bring-up state machine and report scheduling

use std::time::Duration;

use branly_core::{BranlyResult, ContactId, NodeIdentity};
use branly_wire::{report_chunks, PacketType, ValueEntry};
use tracing::{debug, error, info, warn};

use crate::{
    Contact, PowerControl, RetryPolicy, SendOutcome, TickOutcome, Transport, Uplink,
};

/// Node configuration
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Contacts kept; later registrations are dropped
    pub max_contacts: usize,
    /// Radio attempts per packet
    pub send_attempts: u8,
    /// Wait used when no contact reports on a timer
    pub idle_wait: Duration,
    pub retry: RetryPolicy,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            max_contacts: 16,
            send_attempts: 1,
            idle_wait: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

impl NodeConfig {
    /// No backoff and no degraded mode: bring-up retries every step
    pub fn legacy() -> Self {
        NodeConfig {
            retry: RetryPolicy::immediate(),
            ..Default::default()
        }
    }
}

/// Bring-up and steady-state phases
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    SendHello,
    SendContactList,
    SendContactReport,
    Running,
    /// Uplink unreachable after repeated bring-up failures
    Degraded,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeStats {
    pub steps: u64,
    pub packets_sent: u64,
    pub send_failures: u64,
    pub reports_sent: u64,
    pub reports_dropped: u64,
    pub bringup_failures: u64,
}

impl NodeStats {
    fn record(&mut self, contact: ContactId, outcome: TickOutcome) {
        match outcome {
            TickOutcome::Idle => {}
            TickOutcome::Sent => self.reports_sent += 1,
            TickOutcome::Dropped => {
                self.reports_dropped += 1;
                warn!(%contact, "contact report lost");
            }
        }
    }
}

/// A sensor node: contacts, uplink and scheduler
pub struct Node<T, P> {
    identity: NodeIdentity,
    hw_version: u8,
    sw_version: u8,
    contacts: Vec<Contact>,
    uplink: Uplink<T>,
    power: P,
    state: NodeState,
    config: NodeConfig,
    /// Consecutive bring-up failures
    failures: u32,
    stats: NodeStats,
}

impl<T: Transport, P: PowerControl> Node<T, P> {
    /// Create a node with default configuration
    pub fn new(
        identity: NodeIdentity,
        hw_version: u8,
        sw_version: u8,
        transport: T,
        power: P,
    ) -> BranlyResult<Self> {
        Self::with_config(
            identity,
            hw_version,
            sw_version,
            transport,
            power,
            NodeConfig::default(),
        )
    }

    /// Create a node with custom configuration. Factory-fresh identities
    /// are refused.
    pub fn with_config(
        identity: NodeIdentity,
        hw_version: u8,
        sw_version: u8,
        transport: T,
        power: P,
        config: NodeConfig,
    ) -> BranlyResult<Self> {
        identity.require_provisioned()?;
        info!(
            node = %identity.node,
            network = identity.network_id,
            hw_version,
            sw_version,
            "node starting"
        );

        Ok(Node {
            identity,
            hw_version,
            sw_version,
            contacts: Vec::with_capacity(config.max_contacts),
            uplink: Uplink::new(transport, config.send_attempts),
            power,
            state: NodeState::SendHello,
            config,
            failures: 0,
            stats: NodeStats::default(),
        })
    }

    /// Register a contact. Returns false when it was dropped because the
    /// node is full or the id is taken.
    pub fn add_contact(&mut self, contact: Contact) -> bool {
        if self.contacts.len() >= self.config.max_contacts {
            warn!(
                contact = %contact.id(),
                capacity = self.config.max_contacts,
                "contact dropped, node full"
            );
            return false;
        }
        if self.contact(contact.id()).is_some() {
            warn!(contact = %contact.id(), "contact dropped, id already registered");
            return false;
        }
        debug!(contact = %contact.id(), kind = ?contact.kind(), "contact registered");
        self.contacts.push(contact);
        true
    }

    pub fn contact(&self, id: ContactId) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id() == id)
    }

    pub fn contact_mut(&mut self, id: ContactId) -> Option<&mut Contact> {
        self.contacts.iter_mut().find(|c| c.id() == id)
    }

    /// Contacts in registration order
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    #[inline]
    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    #[inline]
    pub fn state(&self) -> NodeState {
        self.state
    }

    #[inline]
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn stats(&self) -> NodeStats {
        let uplink = self.uplink.stats();
        NodeStats {
            packets_sent: uplink.packets_sent,
            send_failures: uplink.send_failures + uplink.build_failures,
            ..self.stats.clone()
        }
    }

    /// Sequence number the next packet will carry
    pub fn next_sequence(&self) -> u8 {
        self.uplink.codec().next_sequence()
    }

    pub fn transport(&self) -> &T {
        self.uplink.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.uplink.transport_mut()
    }

    pub fn power(&self) -> &P {
        &self.power
    }

    /// Run one bounded unit of work: a bring-up attempt, a scheduling
    /// round, or a degraded-mode probe
    pub fn step(&mut self) {
        self.stats.steps += 1;
        match self.state {
            NodeState::SendHello => {
                let outcome = self.hello();
                self.bringup_result(outcome, NodeState::SendContactList);
            }
            NodeState::SendContactList => {
                let outcome = self.contact_list();
                self.bringup_result(outcome, NodeState::SendContactReport);
            }
            NodeState::SendContactReport => {
                let outcome = self.contact_report();
                self.bringup_result(outcome, NodeState::Running);
            }
            NodeState::Running => self.run_contacts(),
            NodeState::Degraded => self.probe_uplink(),
        }
    }

    /// Call `step` `n` times
    pub fn run_steps(&mut self, n: usize) {
        for _ in 0..n {
            self.step();
        }
    }

    pub fn send_hello(&mut self) -> bool {
        self.hello().is_delivered()
    }

    pub fn send_ping(&mut self) -> bool {
        self.uplink
            .send(PacketType::Ping, |codec| codec.build_ping())
            .is_delivered()
    }

    /// Contacts whose id fits three bits, in one packet. The rest are
    /// left out and can only be learned from their values.
    pub fn send_contact_list(&mut self) -> bool {
        self.contact_list().is_delivered()
    }

    /// Every contact's fresh value, split over as many packets as needed.
    /// True only if every part was acknowledged.
    pub fn send_contact_report(&mut self) -> bool {
        self.contact_report().is_delivered()
    }

    /// Radio registers, logged at debug level
    pub fn dump_registers(&mut self) -> Vec<(u8, u8)> {
        let registers = self.uplink.transport_mut().dump_registers();
        for (addr, value) in &registers {
            debug!("REG 0x{addr:02X} = 0x{value:02X}");
        }
        registers
    }

    fn hello(&mut self) -> SendOutcome {
        let (hw, sw) = (self.hw_version, self.sw_version);
        self.uplink
            .send(PacketType::Hello, |codec| codec.build_hello(hw, sw))
    }

    fn contact_list(&mut self) -> SendOutcome {
        let contacts = &self.contacts;
        for contact in contacts.iter().filter(|c| !c.id().fits_contact_list()) {
            warn!(contact = %contact.id(), "id does not fit a contact list entry, left out");
        }
        self.uplink.send(PacketType::ContactList, |codec| {
            codec.build_contact_list(
                contacts
                    .iter()
                    .filter(|c| c.id().fits_contact_list())
                    .map(Contact::list_entry),
            )
        })
    }

    fn contact_report(&mut self) -> SendOutcome {
        let entries: Vec<ValueEntry> = self.contacts.iter_mut().map(Contact::value_entry).collect();
        let mut chunks = report_chunks(&entries);
        if chunks.is_empty() {
            chunks.push(&[]);
        }
        if chunks.len() > 1 {
            debug!(parts = chunks.len(), "contact report split");
        }

        for chunk in chunks {
            let outcome = self.uplink.send(PacketType::ContactReport, |codec| {
                codec.build_contact_report(chunk.iter().copied())
            });
            if !outcome.is_delivered() {
                return outcome;
            }
        }
        SendOutcome::Delivered
    }

    fn bringup_result(&mut self, outcome: SendOutcome, next: NodeState) {
        match outcome {
            SendOutcome::Delivered => {
                info!(from = ?self.state, to = ?next, "bring-up advanced");
                self.state = next;
                self.failures = 0;
                return;
            }
            SendOutcome::Unbuildable => {
                // A rebuild fails the same way
                error!(state = ?self.state, to = ?next, "bring-up packet cannot be built, skipped");
                self.state = next;
                self.failures = 0;
                return;
            }
            SendOutcome::Lost => {}
        }

        self.failures += 1;
        self.stats.bringup_failures += 1;
        if self.config.retry.exhausted(self.failures) {
            warn!(
                state = ?self.state,
                failures = self.failures,
                "uplink unreachable, degrading"
            );
            self.state = NodeState::Degraded;
            self.failures = 0;
            return;
        }

        let wait = self.config.retry.backoff(self.failures);
        debug!(state = ?self.state, failures = self.failures, ?wait, "bring-up send failed");
        if !wait.is_zero() {
            self.power.low_power_wait(wait);
        }
    }

    fn run_contacts(&mut self) {
        for contact in self.contacts.iter_mut() {
            let outcome = contact.send_enqueued(&mut self.uplink);
            self.stats.record(contact.id(), outcome);
        }

        let wait = self
            .contacts
            .iter()
            .filter_map(Contact::next_report_in)
            .min()
            .unwrap_or(self.config.idle_wait);
        debug!(?wait, "sleeping until next report");
        let elapsed = self.power.low_power_wait(wait);

        for contact in self.contacts.iter_mut() {
            let outcome = contact.interval_tick(elapsed, &mut self.uplink);
            self.stats.record(contact.id(), outcome);
        }
    }

    fn probe_uplink(&mut self) {
        self.power
            .low_power_wait(self.config.retry.degraded_probe_interval);
        for contact in self.contacts.iter_mut() {
            contact.refresh_value();
        }

        if self.hello().is_delivered() {
            info!("uplink back, resuming bring-up");
            self.state = NodeState::SendContactList;
            self.failures = 0;
        } else {
            debug!("uplink probe failed");
        }
    }
}
