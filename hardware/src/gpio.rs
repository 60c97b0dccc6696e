//! GPIO lines on the Linux character device, plus the OrangePi i96 header map.

use anyhow::{Context, Result};
use gpiod::{Chip, Input, Lines, Options, Output};

use crate::{DigitalInput, DigitalOutput, HardwareError, HardwareResult};

/// Lines per RDA8810 port bank.
pub const GPIO_PER_PORT: u32 = 32;

/// A single line requested as input.
pub struct GpioInput {
    lines: Lines<Input>,
    offset: u32,
}

impl GpioInput {
    pub fn open(chip_name: &str, line_offset: u32, consumer: &str) -> Result<Self> {
        let chip = Chip::new(chip_name)
            .with_context(|| format!("Failed to open GPIO chip '{chip_name}'"))?;
        let lines = chip
            .request_lines(Options::input([line_offset]).consumer(consumer))
            .with_context(|| format!("Failed to request GPIO line {line_offset} as input"))?;
        Ok(Self {
            lines,
            offset: line_offset,
        })
    }
}

impl DigitalInput for GpioInput {
    fn read_level(&mut self) -> HardwareResult<bool> {
        let [level] = self
            .lines
            .get_values([false; 1])
            .map_err(|e| HardwareError::Io(format!("GPIO line {} read failed: {e}", self.offset)))?;
        Ok(level)
    }
}

/// A single line requested as output.
pub struct GpioOutput {
    lines: Lines<Output>,
    offset: u32,
}

impl GpioOutput {
    pub fn open(chip_name: &str, line_offset: u32, consumer: &str, initial: bool) -> Result<Self> {
        let chip = Chip::new(chip_name)
            .with_context(|| format!("Failed to open GPIO chip '{chip_name}'"))?;
        let lines = chip
            .request_lines(
                Options::output([line_offset])
                    .values([initial])
                    .consumer(consumer),
            )
            .with_context(|| format!("Failed to request GPIO line {line_offset} as output"))?;
        Ok(Self {
            lines,
            offset: line_offset,
        })
    }
}

impl DigitalOutput for GpioOutput {
    fn set_level(&mut self, level: bool) -> HardwareResult<()> {
        self.lines
            .set_values([level])
            .map_err(|e| HardwareError::Io(format!("GPIO line {} write failed: {e}", self.offset)))
    }
}

impl Drop for GpioOutput {
    fn drop(&mut self) {
        if let Err(e) = self.lines.set_values([false]) {
            tracing::warn!("Failed to drive GPIO line {} low on release: {e}", self.offset);
        }
    }
}

/// One pin of the 40-pin i96 low-speed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I96Pin {
    pub label: &'static str,
    /// RDA port name, empty for power pins
    pub port: &'static str,
    pub gpio: Option<u32>,
}

const fn pin(label: &'static str, port: &'static str, gpio: u32) -> I96Pin {
    I96Pin {
        label,
        port,
        gpio: Some(gpio),
    }
}

const fn power(label: &'static str) -> I96Pin {
    I96Pin {
        label,
        port: "",
        gpio: None,
    }
}

/// Header pins in physical order (index 0 is pin 1).
pub static I96_PINS: [I96Pin; 40] = [
    power("GND"),
    power("GND"),
    pin("UART2.CTS", "B8", 40),
    power("PWR_BTN_N"),
    pin("UART2.TX", "C8", 104),
    power("RST_BTN_N"),
    pin("UART2.RX", "C7", 103),
    pin("SPI2.CLK", "A2", 2),
    pin("UART2.RTS", "B9", 41),
    pin("SPI2.DI", "A4", 4),
    pin("UART1.TX", "A14", 14),
    pin("SPI2.CS", "A6", 6),
    pin("UART1.RX", "C6", 102),
    pin("SPI2.DO", "A3", 3),
    pin("I2C2.SCL", "A0", 0),
    pin("I2S.LRCK", "A10", 10),
    pin("I2C2.SDA", "A1", 1),
    pin("I2S.BCK", "A9", 9),
    pin("I2C3.SCL", "B6", 38),
    pin("I2S.DO", "A13", 13),
    pin("I2C3.SDA", "B7", 39),
    pin("I2S.DI", "A11", 11),
    pin("GPIO.A", "A15", 15),
    pin("GPIO.B", "A20", 20),
    pin("GPIO.C", "B24", 56),
    pin("GPIO.D", "D2", 66),
    pin("GPIO.E", "D3", 67),
    pin("GPIO.F", "A22", 22),
    pin("GPIO.G", "A30", 30),
    pin("GPIO.H", "A29", 29),
    pin("GPIO.I", "A28", 28),
    pin("GPIO.J", "A27", 27),
    pin("GPIO.K", "A26", 26),
    pin("GPIO.L", "A25", 25),
    power("V_PAD"),
    power("SYS_DCIN"),
    power("VDD_IN"),
    power("SYS_DCIN"),
    power("GND"),
    power("GND"),
];

/// Header pin by physical number (1-based).
pub fn i96_pin(physical: usize) -> Option<&'static I96Pin> {
    physical.checked_sub(1).and_then(|i| I96_PINS.get(i))
}

/// Chip name and line offset for a global GPIO number.
///
/// Assumes one 32-line gpiochip per port bank, numbered in GPIO order.
pub fn chip_line_for_gpio(gpio: u32) -> (String, u32) {
    (
        format!("gpiochip{}", gpio / GPIO_PER_PORT),
        gpio % GPIO_PER_PORT,
    )
}

/// Chip name and line offset for a physical header pin.
pub fn i96_chip_line(physical: usize) -> Option<(String, u32)> {
    i96_pin(physical)?.gpio.map(chip_line_for_gpio)
}
