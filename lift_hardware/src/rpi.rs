//! Raspberry Pi backend: DRV8871-style driver on GPIO + hardware PWM,
//! NPN proximity switches (active low), and the distance sensor through an
//! MCP3208 on SPI0.
use rppal::gpio::{Gpio, InputPin, OutputPin};
use rppal::pwm::{Channel, Polarity, Pwm};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use tracing::trace;

use lift_config::Pins;
use lift_traits::{Actuator, BoxError, Direction, LimitSwitches, RangeSensor};

use crate::error::{HwError, Result};

const PWM_FREQUENCY_HZ: f64 = 20_000.0;
const SPI_CLOCK_HZ: u32 = 1_000_000;

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

fn pwm_err(e: rppal::pwm::Error) -> HwError {
    HwError::Pwm(e.to_string())
}

pub struct PwmActuator {
    dir: OutputPin,
    sleep: OutputPin,
    pwm: Pwm,
    full_duty: u16,
}

impl PwmActuator {
    pub fn new(pins: &Pins, full_duty: u16) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let dir = gpio.get(pins.motor_dir).map_err(gpio_err)?.into_output_low();
        // nSLEEP is active low: start asleep.
        let sleep = gpio.get(pins.motor_sleep).map_err(gpio_err)?.into_output_low();
        let channel = match pins.motor_pwm_channel {
            0 => Channel::Pwm0,
            1 => Channel::Pwm1,
            other => return Err(HwError::Pwm(format!("no PWM channel {other}"))),
        };
        let pwm = Pwm::with_frequency(channel, PWM_FREQUENCY_HZ, 0.0, Polarity::Normal, true)
            .map_err(pwm_err)?;
        Ok(Self {
            dir,
            sleep,
            pwm,
            full_duty: full_duty.max(1),
        })
    }
}

impl Actuator for PwmActuator {
    fn set_direction(&mut self, dir: Direction) -> std::result::Result<(), BoxError> {
        match dir {
            Direction::Forward => self.dir.set_high(),
            Direction::Backward => self.dir.set_low(),
        }
        Ok(())
    }

    fn set_duty_cycle(&mut self, duty: u16) -> std::result::Result<(), BoxError> {
        let fraction = f64::from(duty.min(self.full_duty)) / f64::from(self.full_duty);
        self.pwm.set_duty_cycle(fraction).map_err(pwm_err)?;
        Ok(())
    }

    fn set_sleep(&mut self, asleep: bool) -> std::result::Result<(), BoxError> {
        if asleep {
            self.sleep.set_low();
        } else {
            self.sleep.set_high();
        }
        Ok(())
    }
}

pub struct ProximitySwitches {
    top: InputPin,
    bottom: InputPin,
}

impl ProximitySwitches {
    pub fn new(pins: &Pins) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        Ok(Self {
            top: gpio.get(pins.proximity_top).map_err(gpio_err)?.into_input_pullup(),
            bottom: gpio.get(pins.proximity_bottom).map_err(gpio_err)?.into_input_pullup(),
        })
    }
}

impl LimitSwitches for ProximitySwitches {
    fn top(&self) -> bool {
        self.top.is_low()
    }

    fn bottom(&self) -> bool {
        self.bottom.is_low()
    }
}

/// 12-bit single-ended conversion from an MCP3208.
pub struct Mcp3208 {
    spi: Spi,
    channel: u8,
}

impl Mcp3208 {
    pub fn new(channel: u8) -> Result<Self> {
        if channel > 7 {
            return Err(HwError::Adc(format!("no ADC channel {channel}")));
        }
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, SPI_CLOCK_HZ, Mode::Mode0)
            .map_err(|e| HwError::Adc(e.to_string()))?;
        Ok(Self { spi, channel })
    }
}

impl RangeSensor for Mcp3208 {
    fn read_raw(&mut self) -> std::result::Result<u16, BoxError> {
        // start bit, single-ended, channel D2..D0
        let tx = [0x06 | (self.channel >> 2), (self.channel & 0x03) << 6, 0x00];
        let mut rx = [0u8; 3];
        self.spi
            .transfer(&mut rx, &tx)
            .map_err(|e| HwError::Adc(e.to_string()))?;
        let raw = (u16::from(rx[1] & 0x0F) << 8) | u16::from(rx[2]);
        trace!(raw, channel = self.channel, "mcp3208 conversion");
        Ok(raw)
    }
}
