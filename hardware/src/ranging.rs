//! Ultrasonic echo ranger (HC-SR04 style trigger/echo pair).

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::wait::wait_for_level;
use crate::{DigitalInput, DigitalOutput, HardwareError, HardwareResult, RangingInterface};

/// Speed of sound in cm/s at room temperature.
pub const SPEED_OF_SOUND_CM_PER_S: f64 = 34300.0;

/// Width of the trigger pulse.
const TRIGGER_PULSE: Duration = Duration::from_micros(10);

/// Readings beyond this are treated as missed echoes.
pub const DEFAULT_MAX_RANGE_CM: f64 = 400.0;

/// Convert an echo pulse width into a one-way distance in centimeters.
pub fn echo_to_distance_cm(echo: Duration) -> f64 {
    echo.as_secs_f64() * SPEED_OF_SOUND_CM_PER_S / 2.0
}

/// Ranger that times the echo pulse on a digital input.
pub struct EchoRanger<T: DigitalOutput, E: DigitalInput> {
    trigger: T,
    echo: E,
    max_range_cm: f64,
}

impl<T: DigitalOutput, E: DigitalInput> EchoRanger<T, E> {
    pub fn new(trigger: T, echo: E) -> Self {
        Self {
            trigger,
            echo,
            max_range_cm: DEFAULT_MAX_RANGE_CM,
        }
    }

    pub fn with_max_range(mut self, max_range_cm: f64) -> Self {
        self.max_range_cm = max_range_cm;
        self
    }

    fn fire_trigger(&mut self) -> HardwareResult<()> {
        self.trigger.set_level(true)?;
        std::thread::sleep(TRIGGER_PULSE);
        self.trigger.set_level(false)
    }
}

impl<T: DigitalOutput, E: DigitalInput> RangingInterface for EchoRanger<T, E> {
    /// Fire one ping and time the echo.
    ///
    /// The timeout applies to each edge separately; `cancel` aborts either wait.
    fn sample_distance(
        &mut self,
        timeout: Option<Duration>,
        cancel: Option<&AtomicBool>,
    ) -> HardwareResult<f64> {
        self.fire_trigger()?;

        wait_for_level(
            &mut self.echo,
            true,
            Duration::ZERO,
            timeout,
            cancel,
            "echo rising edge",
        )?;
        let pulse = wait_for_level(
            &mut self.echo,
            false,
            Duration::ZERO,
            timeout,
            cancel,
            "echo falling edge",
        )?;

        let distance = echo_to_distance_cm(pulse);
        if !distance.is_finite() || distance > self.max_range_cm {
            tracing::warn!("Discarding echo of {pulse:?} ({distance:.1} cm)");
            return Err(HardwareError::InvalidSample(distance));
        }

        tracing::debug!("Echo {pulse:?} -> {distance:.2} cm");
        Ok(distance)
    }
}
