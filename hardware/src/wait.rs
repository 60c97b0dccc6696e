//! Polled level waits shared by the ranger and the acknowledgement button.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::{DigitalInput, HardwareError, HardwareResult};

/// Poll `input` until it reads `level`.
///
/// Returns the time spent waiting. `timeout` of `None` waits forever; a set
/// `cancel` flag aborts with [`HardwareError::Cancelled`]. A zero `poll`
/// interval busy-polls, which the echo ranger needs for microsecond timing.
pub fn wait_for_level(
    input: &mut dyn DigitalInput,
    level: bool,
    poll: Duration,
    timeout: Option<Duration>,
    cancel: Option<&AtomicBool>,
    what: &'static str,
) -> HardwareResult<Duration> {
    let start = Instant::now();
    loop {
        if input.read_level()? == level {
            return Ok(start.elapsed());
        }

        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            tracing::info!("Wait for {what} cancelled");
            return Err(HardwareError::Cancelled);
        }

        let waited = start.elapsed();
        if let Some(limit) = timeout {
            if waited >= limit {
                return Err(HardwareError::Timeout { what, waited });
            }
        }

        if poll.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(poll);
        }
    }
}
