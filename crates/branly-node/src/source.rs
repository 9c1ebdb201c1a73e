//! Value access for contacts
//!
//! A contact reads fresh values from, and for writeable contacts pushes
//! commanded values to, a [`ValueSource`].

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// Read/write capability behind a contact
pub trait ValueSource {
    /// Current reading
    fn read(&mut self) -> i32;

    /// Commit a commanded value (actuators). Sensors ignore it.
    fn write(&mut self, _value: i32) {}
}

impl<S: ValueSource + ?Sized> ValueSource for Box<S> {
    fn read(&mut self) -> i32 {
        (**self).read()
    }

    fn write(&mut self, value: i32) {
        (**self).write(value)
    }
}

/// Read-only source backed by a closure
pub struct ReadFn<F>(pub F);

impl<F: FnMut() -> i32> ValueSource for ReadFn<F> {
    fn read(&mut self) -> i32 {
        (self.0)()
    }
}

/// Value cell shared between a contact and the code that owns the hardware
///
/// Writes from the collector land in the cell; the hardware side polls it
/// with [`SharedValue::get`].
#[derive(Clone, Debug, Default)]
pub struct SharedValue(Arc<AtomicI32>);

impl SharedValue {
    pub fn new(value: i32) -> Self {
        SharedValue(Arc::new(AtomicI32::new(value)))
    }

    #[inline]
    pub fn get(&self) -> i32 {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: i32) {
        self.0.store(value, Ordering::Release)
    }
}

impl ValueSource for SharedValue {
    fn read(&mut self) -> i32 {
        self.get()
    }

    fn write(&mut self, value: i32) {
        self.set(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_fn() {
        let mut counter = 0;
        let mut source = ReadFn(move || {
            counter += 1;
            counter
        });
        assert_eq!(source.read(), 1);
        assert_eq!(source.read(), 2);
        // Writes are ignored by read-only sources
        source.write(100);
        assert_eq!(source.read(), 3);
    }

    #[test]
    fn test_shared_value_both_sides() {
        let hardware = SharedValue::new(0);
        let mut source: Box<dyn ValueSource> = Box::new(hardware.clone());

        source.write(1);
        assert_eq!(hardware.get(), 1);

        hardware.set(-5);
        assert_eq!(source.read(), -5);
    }
}
