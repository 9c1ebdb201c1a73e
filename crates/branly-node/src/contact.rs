//! Contacts - one sensor or actuator channel each
//!
//! A contact owns its current value, an optional lower threshold and its
//! reporting cadence, and decides on every scheduler tick whether it has
//! to send.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use branly_core::{ContactId, ContactKind, ReportInterval};
use branly_wire::{ContactListEntry, PacketType, ValueEntry, ValueSize};
use tracing::debug;

use crate::{SendOutcome, Transport, Uplink, ValueSource};

/// Pending out-of-cycle report, shared with interrupt handlers
#[derive(Debug, Default)]
struct PendingReport {
    value: AtomicI32,
    flag: AtomicBool,
}

/// Handle for requesting an immediate report from outside the scheduler
///
/// `enqueue` only stores the value and raises a flag, so it is safe to call
/// from an interrupt handler or another thread while a step is running.
#[derive(Clone, Debug)]
pub struct ReportTrigger {
    pending: Arc<PendingReport>,
}

impl ReportTrigger {
    pub fn enqueue(&self, value: i32) {
        self.pending.value.store(value, Ordering::Relaxed);
        self.pending.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.flag.load(Ordering::Acquire)
    }
}

/// What a contact did during one scheduler tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing due
    Idle,
    /// Report sent and acknowledged
    Sent,
    /// Report was due but the send failed; it is not retried
    Dropped,
}

impl TickOutcome {
    fn from_send(outcome: SendOutcome) -> Self {
        if outcome.is_delivered() {
            TickOutcome::Sent
        } else {
            TickOutcome::Dropped
        }
    }
}

/// A sensor or actuator endpoint
pub struct Contact {
    id: ContactId,
    kind: ContactKind,
    value: i32,
    writeable: bool,
    lower_threshold: Option<i32>,
    interval: ReportInterval,
    next_report: Duration,
    source: Option<Box<dyn ValueSource + Send>>,
    pending: Arc<PendingReport>,
}

impl Contact {
    /// Demand-driven contact with no value source
    pub fn new(id: ContactId, kind: ContactKind) -> Self {
        Contact {
            id,
            kind,
            value: 0,
            writeable: false,
            lower_threshold: None,
            interval: ReportInterval::OnDemand,
            next_report: Duration::ZERO,
            source: None,
            pending: Arc::new(PendingReport::default()),
        }
    }

    /// Read values from `source`
    pub fn with_source<S>(mut self, source: S) -> Self
    where
        S: ValueSource + Send + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Report on a timer. The countdown starts full.
    pub fn with_interval(mut self, interval: ReportInterval) -> Self {
        self.interval = interval;
        self.interval_reset();
        self
    }

    pub fn with_lower_threshold(mut self, threshold: i32) -> Self {
        self.lower_threshold = Some(threshold);
        self
    }

    #[inline]
    pub fn id(&self) -> ContactId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> ContactKind {
        self.kind
    }

    /// Stored value; may be stale until the next refresh
    #[inline]
    pub fn value(&self) -> i32 {
        self.value
    }

    #[inline]
    pub fn interval(&self) -> ReportInterval {
        self.interval
    }

    #[inline]
    pub fn lower_threshold(&self) -> Option<i32> {
        self.lower_threshold
    }

    pub fn set_lower_threshold(&mut self, threshold: i32) {
        self.lower_threshold = Some(threshold);
    }

    /// Accept set-value requests from the collector
    pub fn make_writeable(&mut self) {
        self.writeable = true;
    }

    #[inline]
    pub fn is_writeable(&self) -> bool {
        self.writeable
    }

    /// Store `value` and, for writeable contacts, commit it to the source
    pub fn set_value(&mut self, value: i32) {
        self.value = value;
        if self.writeable {
            if let Some(source) = self.source.as_mut() {
                source.write(value);
            }
        }
    }

    /// Pull a fresh reading from the source, if there is one
    pub fn refresh_value(&mut self) {
        if let Some(source) = self.source.as_mut() {
            self.value = source.read();
        }
    }

    /// Value at or below the lower threshold
    pub fn is_violated(&self) -> bool {
        self.lower_threshold.is_some_and(|t| self.value <= t)
    }

    #[inline]
    pub fn value_size(&self) -> ValueSize {
        ValueSize::for_value(self.value)
    }

    /// Request an immediate report carrying `value`
    pub fn enqueue_report(&self, value: i32) {
        self.report_trigger().enqueue(value);
    }

    /// Handle that can enqueue reports from another context
    pub fn report_trigger(&self) -> ReportTrigger {
        ReportTrigger {
            pending: Arc::clone(&self.pending),
        }
    }

    #[inline]
    pub fn is_enqueued(&self) -> bool {
        self.pending.flag.load(Ordering::Acquire)
    }

    /// Clear the enqueued flag, adopting the enqueued value
    fn take_enqueued(&mut self) -> bool {
        if self.pending.flag.swap(false, Ordering::Acquire) {
            self.value = self.pending.value.load(Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Time left until the next timer report; `None` for on-demand contacts
    pub fn next_report_in(&self) -> Option<Duration> {
        self.interval.period().map(|_| self.next_report)
    }

    pub fn interval_reset(&mut self) {
        self.next_report = self.interval.period().unwrap_or(Duration::ZERO);
    }

    /// Refresh the value and wrap it for the wire
    pub fn value_entry(&mut self) -> ValueEntry {
        self.refresh_value();
        ValueEntry::new(self.id, self.value, self.is_violated())
    }

    pub fn list_entry(&self) -> ContactListEntry {
        ContactListEntry::new(self.id, self.kind, self.writeable)
    }

    /// Send a single-contact value packet
    pub fn send_report<T: Transport>(&mut self, uplink: &mut Uplink<T>) -> SendOutcome {
        let entry = self.value_entry();
        debug!(
            contact = %self.id,
            value = entry.value,
            violated = entry.flags.is_violated(),
            "sending contact report"
        );
        uplink.send(PacketType::ContactValue, |codec| {
            codec.build_contact_value(entry)
        })
    }

    /// Send now if enqueued, restarting the timer for periodic contacts
    pub fn send_enqueued<T: Transport>(&mut self, uplink: &mut Uplink<T>) -> TickOutcome {
        if !self.take_enqueued() {
            return TickOutcome::Idle;
        }
        let outcome = self.send_report(uplink);
        self.interval_reset();
        TickOutcome::from_send(outcome)
    }

    /// Advance the countdown by `elapsed` and send if due
    ///
    /// The countdown never goes negative: an overshoot counts as exactly
    /// zero and produces a single report. On-demand contacts send only when
    /// enqueued, whatever `elapsed` is.
    pub fn interval_tick<T: Transport>(
        &mut self,
        elapsed: Duration,
        uplink: &mut Uplink<T>,
    ) -> TickOutcome {
        if self.interval.period().is_none() {
            return self.send_enqueued(uplink);
        }

        self.next_report = self.next_report.saturating_sub(elapsed);
        if !self.next_report.is_zero() {
            return TickOutcome::Idle;
        }

        let outcome = self.send_report(uplink);
        self.interval_reset();
        TickOutcome::from_send(outcome)
    }
}

impl fmt::Debug for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contact")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("writeable", &self.writeable)
            .field("lower_threshold", &self.lower_threshold)
            .field("interval", &self.interval)
            .field("next_report", &self.next_report)
            .field("enqueued", &self.is_enqueued())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ReadFn, SharedValue};
    use proptest::prelude::*;

    #[derive(Default)]
    struct CountingRadio {
        sent: Vec<Vec<u8>>,
        fail: bool,
    }

    impl Transport for CountingRadio {
        fn transmit_with_retry(&mut self, _attempts: u8, data: &[u8]) -> bool {
            self.sent.push(data.to_vec());
            !self.fail
        }

        fn sleep(&mut self) {}
    }

    fn uplink() -> Uplink<CountingRadio> {
        Uplink::new(CountingRadio::default(), 1)
    }

    fn id(n: u8) -> ContactId {
        ContactId::new(n).unwrap()
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_violation_threshold() {
        let mut contact = Contact::new(id(1), ContactKind::Voltage);
        contact.set_value(5);
        assert!(!contact.is_violated());

        contact.set_lower_threshold(10);
        contact.set_value(10);
        assert!(contact.is_violated());
        contact.set_value(5);
        assert!(contact.is_violated());
        contact.set_value(11);
        assert!(!contact.is_violated());
    }

    #[test]
    fn test_value_size_boundaries() {
        let mut contact = Contact::new(id(1), ContactKind::Temperature);
        for (value, size) in [
            (-128, ValueSize::Size8),
            (127, ValueSize::Size8),
            (-129, ValueSize::Size32),
            (128, ValueSize::Size32),
        ] {
            contact.set_value(value);
            assert_eq!(contact.value_size(), size, "value {value}");
        }
    }

    #[test]
    fn test_refresh_reads_source() {
        let mut reading = 20;
        let mut contact = Contact::new(id(2), ContactKind::Temperature).with_source(ReadFn(
            move || {
                reading += 1;
                reading
            },
        ));
        assert_eq!(contact.value(), 0);
        contact.refresh_value();
        assert_eq!(contact.value(), 21);
        assert_eq!(contact.value_entry().value, 22);
    }

    #[test]
    fn test_set_value_commits_only_when_writeable() {
        let hardware = SharedValue::new(0);
        let mut contact =
            Contact::new(id(3), ContactKind::PowerSwitch).with_source(hardware.clone());

        contact.set_value(1);
        assert_eq!(contact.value(), 1);
        assert_eq!(hardware.get(), 0);

        contact.make_writeable();
        assert!(contact.is_writeable());
        contact.set_value(1);
        assert_eq!(hardware.get(), 1);
        assert!(contact.list_entry().writeable);
    }

    #[test]
    fn test_overshoot_sends_once_and_resets() {
        let mut radio = uplink();
        let mut contact =
            Contact::new(id(1), ContactKind::Voltage).with_interval(ReportInterval::ONE_MINUTE);
        assert_eq!(contact.next_report_in(), Some(secs(60)));

        assert_eq!(contact.interval_tick(secs(70), &mut radio), TickOutcome::Sent);
        assert_eq!(radio.transport().sent.len(), 1);
        assert_eq!(contact.next_report_in(), Some(secs(60)));
    }

    #[test]
    fn test_accumulated_ticks_send_once() {
        let mut radio = uplink();
        let mut contact =
            Contact::new(id(1), ContactKind::Voltage).with_interval(ReportInterval::ONE_MINUTE);

        assert_eq!(contact.interval_tick(secs(30), &mut radio), TickOutcome::Idle);
        assert_eq!(contact.next_report_in(), Some(secs(30)));
        assert_eq!(contact.interval_tick(secs(31), &mut radio), TickOutcome::Sent);
        assert_eq!(radio.transport().sent.len(), 1);
        assert_eq!(contact.next_report_in(), Some(secs(60)));
    }

    #[test]
    fn test_on_demand_needs_enqueue() {
        let mut radio = uplink();
        let mut contact = Contact::new(id(7), ContactKind::Button);
        assert_eq!(contact.next_report_in(), None);

        for elapsed in [0, 1, 3600, 86_400] {
            assert_eq!(
                contact.interval_tick(secs(elapsed), &mut radio),
                TickOutcome::Idle
            );
        }
        assert!(radio.transport().sent.is_empty());

        contact.enqueue_report(1);
        assert!(contact.is_enqueued());
        assert_eq!(contact.interval_tick(Duration::ZERO, &mut radio), TickOutcome::Sent);
        assert!(!contact.is_enqueued());
        assert_eq!(contact.value(), 1);
        // Contact value packet: id 7, one-byte value 1
        assert_eq!(radio.transport().sent[0][2..], [0x07u8, 0x01]);

        assert_eq!(contact.interval_tick(secs(10), &mut radio), TickOutcome::Idle);
        assert_eq!(radio.transport().sent.len(), 1);
    }

    #[test]
    fn test_trigger_from_other_thread() {
        let mut radio = uplink();
        let mut contact = Contact::new(id(4), ContactKind::Motion);
        let trigger = contact.report_trigger();

        std::thread::spawn(move || trigger.enqueue(1))
            .join()
            .unwrap();

        assert!(contact.is_enqueued());
        assert_eq!(contact.send_enqueued(&mut radio), TickOutcome::Sent);
        assert_eq!(contact.send_enqueued(&mut radio), TickOutcome::Idle);
    }

    #[test]
    fn test_enqueued_periodic_restarts_countdown() {
        let mut radio = uplink();
        let mut contact =
            Contact::new(id(1), ContactKind::Voltage).with_interval(ReportInterval::ONE_MINUTE);
        contact.interval_tick(secs(50), &mut radio);
        contact.enqueue_report(3);

        assert_eq!(contact.send_enqueued(&mut radio), TickOutcome::Sent);
        assert_eq!(contact.next_report_in(), Some(secs(60)));
    }

    #[test]
    fn test_failed_send_is_dropped() {
        let mut radio = Uplink::new(
            CountingRadio {
                fail: true,
                ..Default::default()
            },
            1,
        );
        let mut contact =
            Contact::new(id(1), ContactKind::Voltage).with_interval(ReportInterval::ONE_MINUTE);
        assert_eq!(contact.interval_tick(secs(60), &mut radio), TickOutcome::Dropped);
        // Not retried on the next tick
        assert_eq!(contact.interval_tick(secs(1), &mut radio), TickOutcome::Idle);
        assert_eq!(radio.transport().sent.len(), 1);
    }

    #[test]
    fn test_report_carries_violation_flag() {
        let mut radio = uplink();
        let mut contact = Contact::new(id(5), ContactKind::Temperature)
            .with_source(ReadFn(|| -10))
            .with_lower_threshold(0);
        assert!(contact.send_report(&mut radio).is_delivered());
        assert_eq!(radio.transport().sent[0], vec![0x04, 0x00, 0x45, 0xF6]);
    }

    proptest! {
        #[test]
        fn prop_sends_match_elapsed_total(ticks in prop::collection::vec(0u64..200, 1..50)) {
            let mut radio = uplink();
            let mut contact = Contact::new(id(1), ContactKind::Voltage)
                .with_interval(ReportInterval::ONE_MINUTE);

            let mut carried = 0u64;
            let mut expected = 0usize;
            for &t in &ticks {
                let outcome = contact.interval_tick(secs(t), &mut radio);
                carried += t;
                if carried >= 60 {
                    expected += 1;
                    carried = 0;
                    prop_assert_eq!(outcome, TickOutcome::Sent);
                } else {
                    prop_assert_eq!(outcome, TickOutcome::Idle);
                }
                prop_assert_eq!(contact.next_report_in(), Some(secs(60 - carried)));
            }
            prop_assert_eq!(radio.transport().sent.len(), expected);
        }
    }
}
