//! Hobby servo control through the Linux sysfs PWM interface.
//!
//! Each channel lives under `/sys/class/pwm/pwmchipN/pwmM` and is driven by
//! writing nanosecond values to its `period` and `duty_cycle` files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{ActuatorAxis, ActuatorInterface, HardwareError, HardwareResult};

pub const SYSFS_PWM_ROOT: &str = "/sys/class/pwm";

/// Standard 50 Hz servo frame.
pub const SERVO_PERIOD: Duration = Duration::from_millis(20);

/// One exported PWM channel.
#[derive(Debug)]
pub struct SysfsPwmChannel {
    dir: PathBuf,
}

impl SysfsPwmChannel {
    /// Open channel `channel` of the chip directory `chip_dir`, exporting it if needed.
    pub fn open(chip_dir: &Path, channel: u32) -> Result<Self> {
        let dir = chip_dir.join(format!("pwm{channel}"));
        if !dir.exists() {
            fs::write(chip_dir.join("export"), channel.to_string())
                .with_context(|| format!("Failed to export PWM channel {channel} on {}", chip_dir.display()))?;
            if !dir.exists() {
                bail!("PWM channel {} did not appear after export", dir.display());
            }
        }
        tracing::debug!("Opened PWM channel {}", dir.display());
        Ok(Self { dir })
    }

    /// Open a channel by chip number under [`SYSFS_PWM_ROOT`].
    pub fn open_chip(chip: u32, channel: u32) -> Result<Self> {
        Self::open(&Path::new(SYSFS_PWM_ROOT).join(format!("pwmchip{chip}")), channel)
    }

    fn write_attr(&self, name: &str, value: impl ToString) -> HardwareResult<()> {
        let path = self.dir.join(name);
        fs::write(&path, value.to_string())
            .map_err(|e| HardwareError::Io(format!("{}: {e}", path.display())))
    }

    pub fn set_period(&self, period: Duration) -> HardwareResult<()> {
        self.write_attr("period", period.as_nanos())
    }

    pub fn set_duty_cycle(&self, duty: Duration) -> HardwareResult<()> {
        self.write_attr("duty_cycle", duty.as_nanos())
    }

    pub fn enable(&self, on: bool) -> HardwareResult<()> {
        self.write_attr("enable", u8::from(on))
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

/// Linear map from servo angle to pulse width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServoPulseMap {
    pub min_pulse_us: f64,
    pub max_pulse_us: f64,
    pub min_angle_deg: f64,
    pub max_angle_deg: f64,
}

impl Default for ServoPulseMap {
    fn default() -> Self {
        Self {
            min_pulse_us: 500.0,
            max_pulse_us: 2500.0,
            min_angle_deg: -90.0,
            max_angle_deg: 90.0,
        }
    }
}

impl ServoPulseMap {
    /// Pulse width for `degrees`, saturating at the mapped range.
    pub fn pulse_for(&self, degrees: f64) -> Duration {
        let span = self.max_angle_deg - self.min_angle_deg;
        let t = ((degrees - self.min_angle_deg) / span).clamp(0.0, 1.0);
        let us = self.min_pulse_us + t * (self.max_pulse_us - self.min_pulse_us);
        Duration::from_nanos((us * 1000.0).round() as u64)
    }
}

/// Pan and tilt servos on two PWM channels.
pub struct PwmServoPair {
    pan: SysfsPwmChannel,
    tilt: SysfsPwmChannel,
    map: ServoPulseMap,
}

impl PwmServoPair {
    /// Configure both channels for 50 Hz, center them and enable output.
    pub fn new(pan: SysfsPwmChannel, tilt: SysfsPwmChannel, map: ServoPulseMap) -> HardwareResult<Self> {
        let center = map.pulse_for(0.0);
        for channel in [&pan, &tilt] {
            channel.set_period(SERVO_PERIOD)?;
            channel.set_duty_cycle(center)?;
            channel.enable(true)?;
        }
        tracing::info!("Servos centered ({center:?} pulse)");
        Ok(Self { pan, tilt, map })
    }

    fn channel(&self, axis: ActuatorAxis) -> &SysfsPwmChannel {
        match axis {
            ActuatorAxis::Pan => &self.pan,
            ActuatorAxis::Tilt => &self.tilt,
        }
    }
}

impl ActuatorInterface for PwmServoPair {
    fn set_angle(&mut self, axis: ActuatorAxis, degrees: f64) -> HardwareResult<()> {
        let pulse = self.map.pulse_for(degrees);
        tracing::debug!("{axis} -> {degrees:.2}° ({pulse:?})");
        self.channel(axis).set_duty_cycle(pulse)
    }
}

impl Drop for PwmServoPair {
    fn drop(&mut self) {
        for channel in [&self.pan, &self.tilt] {
            if let Err(e) = channel.enable(false) {
                tracing::warn!("Failed to disable PWM {}: {e}", channel.path().display());
            }
        }
    }
}
