//! Bench tool for the turret's I/O.
//!
//! Subcommands:
//! - `pins`: Print the i96 header map
//! - `range`: Take ultrasonic range samples
//! - `servo`: Command pan/tilt servo angles
//! - `button`: Wait for the acknowledgement button
//! - `laser`: Pulse the laser enable line

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use hardware::gpio::{i96_chip_line, GpioInput, GpioOutput, I96_PINS};
use hardware::pwm::{PwmServoPair, ServoPulseMap, SysfsPwmChannel};
use hardware::ranging::EchoRanger;
use hardware::{
    wait_for_level, ActuatorAxis, DigitalOutput, LimitedActuator, RangingInterface, ServoLimits,
};
use tracing::info;

const CONSUMER: &str = "turret_io";

/// Laser turret I/O bench tool
#[derive(Parser, Debug)]
#[command(name = "turret_io")]
#[command(about = "Exercise the turret's GPIO, PWM and ranging hardware")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the i96 header pin map
    Pins,

    /// Sample the ultrasonic ranger
    Range {
        /// Physical header pin wired to the trigger input
        #[arg(long, default_value = "23")]
        trigger_pin: usize,

        /// Physical header pin wired to the echo output
        #[arg(long, default_value = "24")]
        echo_pin: usize,

        /// Number of samples to take
        #[arg(short, long, default_value = "10")]
        count: usize,

        /// Per-edge timeout in milliseconds
        #[arg(long, default_value = "100")]
        timeout_ms: u64,
    },

    /// Move the servos to an absolute pan/tilt
    Servo {
        /// PWM chip number under /sys/class/pwm
        #[arg(long, default_value = "0")]
        chip: u32,

        #[arg(long, default_value = "0")]
        pan_channel: u32,

        #[arg(long, default_value = "1")]
        tilt_channel: u32,

        /// Pan angle in degrees
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        pan: f64,

        /// Tilt angle in degrees
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        tilt: f64,

        /// Seconds to hold the position before releasing the servos
        #[arg(long, default_value = "2")]
        hold_s: u64,
    },

    /// Block until the acknowledgement button is pressed
    Button {
        #[arg(long, default_value = "25")]
        pin: usize,

        /// Give up after this many milliseconds (waits forever if omitted)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Switch the laser on for a fixed time
    Laser {
        #[arg(long, default_value = "26")]
        pin: usize,

        #[arg(long, default_value = "500")]
        on_ms: u64,
    },
}

fn header_line(physical: usize) -> Result<(String, u32)> {
    i96_chip_line(physical).ok_or_else(|| anyhow!("header pin {physical} is not a GPIO"))
}

fn open_output(physical: usize) -> Result<GpioOutput> {
    let (chip, line) = header_line(physical)?;
    GpioOutput::open(&chip, line, CONSUMER, false)
}

fn open_input(physical: usize) -> Result<GpioInput> {
    let (chip, line) = header_line(physical)?;
    GpioInput::open(&chip, line, CONSUMER)
}

fn cmd_pins() -> Result<()> {
    println!("{:>4}  {:<10} {:<5} {:>5}", "pin", "label", "port", "gpio");
    for (i, pin) in I96_PINS.iter().enumerate() {
        let gpio = pin.gpio.map(|g| g.to_string()).unwrap_or_default();
        println!("{:>4}  {:<10} {:<5} {:>5}", i + 1, pin.label, pin.port, gpio);
    }
    Ok(())
}

fn cmd_range(trigger_pin: usize, echo_pin: usize, count: usize, timeout_ms: u64) -> Result<()> {
    let mut ranger = EchoRanger::new(open_output(trigger_pin)?, open_input(echo_pin)?);
    let timeout = Some(Duration::from_millis(timeout_ms));

    for i in 0..count {
        match ranger.sample_distance(timeout, None) {
            Ok(d) => info!("Sample {i}: {d:.1} cm"),
            Err(e) => tracing::warn!("Sample {i}: {e}"),
        }
        std::thread::sleep(Duration::from_millis(60));
    }
    Ok(())
}

fn cmd_servo(chip: u32, pan_channel: u32, tilt_channel: u32, pan: f64, tilt: f64, hold_s: u64) -> Result<()> {
    let pan_pwm = SysfsPwmChannel::open_chip(chip, pan_channel)?;
    let tilt_pwm = SysfsPwmChannel::open_chip(chip, tilt_channel)?;
    let servos = PwmServoPair::new(pan_pwm, tilt_pwm, ServoPulseMap::default())
        .context("Failed to configure servo PWM")?;
    let mut actuator = LimitedActuator::new(servos, ServoLimits::default());

    for (axis, deg) in [(ActuatorAxis::Pan, pan), (ActuatorAxis::Tilt, tilt)] {
        let result = actuator.move_clamped(axis, deg)?;
        info!("{axis}: {:.2}°", result.degrees());
    }

    std::thread::sleep(Duration::from_secs(hold_s));
    Ok(())
}

fn cmd_button(pin: usize, timeout_ms: Option<u64>) -> Result<()> {
    let mut button = open_input(pin)?;
    info!("Waiting for button on pin {pin}...");
    let waited = wait_for_level(
        &mut button,
        true,
        Duration::from_millis(10),
        timeout_ms.map(Duration::from_millis),
        None,
        "button press",
    )?;
    info!("Button pressed after {waited:?}");
    Ok(())
}

fn cmd_laser(pin: usize, on_ms: u64) -> Result<()> {
    let mut laser = open_output(pin)?;
    info!("Laser on for {on_ms} ms");
    laser.set_level(true)?;
    std::thread::sleep(Duration::from_millis(on_ms));
    laser.set_level(false)?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    match args.command {
        Command::Pins => cmd_pins(),
        Command::Range {
            trigger_pin,
            echo_pin,
            count,
            timeout_ms,
        } => cmd_range(trigger_pin, echo_pin, count, timeout_ms),
        Command::Servo {
            chip,
            pan_channel,
            tilt_channel,
            pan,
            tilt,
            hold_s,
        } => cmd_servo(chip, pan_channel, tilt_channel, pan, tilt, hold_s),
        Command::Button { pin, timeout_ms } => cmd_button(pin, timeout_ms),
        Command::Laser { pin, on_ms } => cmd_laser(pin, on_ms),
    }
}
