//! Power control collaborators

/// Switchable supply rail feeding the external sensors
pub trait SensorPower {
    /// Switch the rail on
    fn enable(&mut self);

    /// Switch the rail off
    fn disable(&mut self);
}

/// Low-power suspension that ends a cycle
///
/// Implementations copy `retained` into the memory region that survives
/// suspension, arm a wake-up timer for `sleep_ms` and suspend. Execution
/// resumes at the next boot's entry point, never at the call site.
pub trait Hibernate {
    fn hibernate(&mut self, retained: &[u8], sleep_ms: u64) -> !;
}
