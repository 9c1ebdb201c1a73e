//! Reporting cadence for contacts

use std::time::Duration;

/// How often a contact reports on its own
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ReportInterval {
    /// Never on a timer, only when a report is enqueued
    #[default]
    OnDemand,
    /// Report every period
    Every(Duration),
}

impl ReportInterval {
    pub const ONE_MINUTE: ReportInterval = ReportInterval::Every(Duration::from_secs(60));
    pub const FIFTEEN_MINUTES: ReportInterval = ReportInterval::Every(Duration::from_secs(900));
    pub const ONE_HOUR: ReportInterval = ReportInterval::Every(Duration::from_secs(3600));
    pub const ONE_DAY: ReportInterval = ReportInterval::Every(Duration::from_secs(86_400));

    /// Periodic interval in whole seconds. Zero means on demand.
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            ReportInterval::OnDemand
        } else {
            ReportInterval::Every(Duration::from_secs(secs))
        }
    }

    /// Period, if the contact reports on a timer
    #[inline]
    pub fn period(self) -> Option<Duration> {
        match self {
            ReportInterval::OnDemand => None,
            ReportInterval::Every(d) if d.is_zero() => None,
            ReportInterval::Every(d) => Some(d),
        }
    }

    #[inline]
    pub fn is_periodic(self) -> bool {
        self.period().is_some()
    }
}
