//! HX711 load-cell amplifier driver.
//!
//! Bit-banged two-wire interface: DOUT (data, input) and PD_SCK (clock,
//! output).  Channel A, gain 128.
//!
//! ```text
//!   DOUT  ‾‾‾‾\____ ready ___[b23][b22] ... [b0]‾‾‾‾‾‾‾
//!   SCK   ________/‾\_/‾\_ ... _/‾\_/‾\__________________
//!                  1   2        24  25 (gain 128, ch A)
//! ```
//!
//! Conversion from raw counts to grams follows the usual
//! `(average - offset) / scale` rule.  `offset` is set by [`LoadCell::tare`],
//! `scale` is the calibration factor in counts per gram.
//!
//! Generic over `embedded-hal` 1.0 pins and delay so the same code runs on
//! the ESP32 and against simulated pins in tests.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, info};

use crate::app::ports::WeightSensorPort;
use crate::error::SensorError;

/// Extra clock pulses after the 24 data bits.  1 = channel A, gain 128.
const GAIN_128_PULSES: u8 = 1;

/// PD_SCK high/low time.  Datasheet minimum is 0.2 µs, maximum high 50 µs.
const SCK_HALF_PERIOD_US: u32 = 1;

pub struct LoadCell<DOUT, SCK, D> {
    dout: DOUT,
    sck: SCK,
    delay: D,
    /// Raw counts at zero load.
    offset: f32,
    /// Counts per gram.
    scale: f32,
    ready_timeout_ms: u32,
}

impl<DOUT, SCK, D> LoadCell<DOUT, SCK, D>
where
    DOUT: InputPin,
    SCK: OutputPin,
    D: DelayNs,
{
    pub fn new(dout: DOUT, mut sck: SCK, delay: D, scale: f32, ready_timeout_ms: u32) -> Self {
        // SCK held high for > 60 µs powers the chip down.
        let _ = sck.set_low();
        Self {
            dout,
            sck,
            delay,
            offset: 0.0,
            scale,
            ready_timeout_ms,
        }
    }

    /// Block until DOUT goes low or the timeout runs out.
    fn wait_ready(&mut self) -> Result<(), SensorError> {
        for _ in 0..=self.ready_timeout_ms {
            if self.dout.is_low().map_err(|_| SensorError::PinFault)? {
                return Ok(());
            }
            self.delay.delay_ms(1);
        }
        Err(SensorError::NotReady)
    }

    fn pulse(&mut self) -> Result<(), SensorError> {
        self.sck.set_high().map_err(|_| SensorError::PinFault)?;
        self.delay.delay_us(SCK_HALF_PERIOD_US);
        Ok(())
    }

    fn release(&mut self) -> Result<(), SensorError> {
        self.sck.set_low().map_err(|_| SensorError::PinFault)?;
        self.delay.delay_us(SCK_HALF_PERIOD_US);
        Ok(())
    }

    /// One signed 24-bit conversion.
    pub fn read_raw(&mut self) -> Result<i32, SensorError> {
        self.wait_ready()?;

        let mut value: u32 = 0;
        for _ in 0..24 {
            self.pulse()?;
            let bit = self.dout.is_high().map_err(|_| SensorError::PinFault)?;
            self.release()?;
            value = (value << 1) | u32::from(bit);
        }

        for _ in 0..GAIN_128_PULSES {
            self.pulse()?;
            self.release()?;
        }

        Ok(sign_extend_24(value))
    }

    /// Mean of `samples` raw conversions.
    pub fn read_average(&mut self, samples: u8) -> Result<f32, SensorError> {
        let n = samples.max(1);
        let mut sum: i64 = 0;
        for _ in 0..n {
            sum += i64::from(self.read_raw()?);
        }
        Ok(sum as f32 / f32::from(n))
    }

    /// Calibrated weight in grams.
    pub fn get_units(&mut self, samples: u8) -> Result<f32, SensorError> {
        let avg = self.read_average(samples)?;
        Ok((avg - self.offset) / self.scale)
    }

    /// Take the current load as zero.
    pub fn tare(&mut self, samples: u8) -> Result<(), SensorError> {
        self.offset = self.read_average(samples)?;
        info!("Load cell tared, offset {:.0} counts", self.offset);
        Ok(())
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }
}

impl<DOUT, SCK, D> WeightSensorPort for LoadCell<DOUT, SCK, D>
where
    DOUT: InputPin,
    SCK: OutputPin,
    D: DelayNs,
{
    fn is_ready(&mut self) -> bool {
        self.dout.is_low().unwrap_or(false)
    }

    fn read_grams(&mut self, samples: u8) -> Result<f32, SensorError> {
        let grams = self.get_units(samples)?;
        debug!("Load cell: {:.1} g over {} samples", grams, samples);
        Ok(grams)
    }
}

fn sign_extend_24(raw: u32) -> i32 {
    ((raw << 8) as i32) >> 8
}
