//! How the driver waits for a write cycle to complete.

/// Write cycle time of the ST M95 family, in milliseconds.
pub const WRITE_CYCLE_MS: u32 = 5;

/// Strategy used after every write to wait until the device accepts the next
/// instruction.
///
/// The device ignores or misinterprets instructions sent during a write
/// cycle, so every write is followed by one of these waits before the driver
/// returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Sleep for a fixed time, typically the datasheet's write cycle time.
    FixedDelay { ms: u32 },

    /// Poll the status register until the write-in-progress bit clears.
    ///
    /// At most `max_retries` polls are issued (at least one), with
    /// `interval_ms` of sleep between them. If the bit is still set after
    /// that, the device is considered faulty and
    /// [`Error::DeviceNotReady`](crate::Error::DeviceNotReady) is returned.
    PollStatus { max_retries: u32, interval_ms: u32 },
}

impl Readiness {
    /// Polling budget that covers twice the nominal write cycle time at a
    /// 1 ms interval.
    pub const fn poll_default() -> Self {
        Readiness::PollStatus {
            max_retries: 2 * WRITE_CYCLE_MS + 1,
            interval_ms: 1,
        }
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Readiness::FixedDelay { ms: WRITE_CYCLE_MS }
    }
}
