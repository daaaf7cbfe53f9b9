//! Piezo buzzer driver.
//!
//! Active buzzer on a single GPIO: high = sounding.  The driver tracks the
//! commanded level so the domain can query it without reading the pin back.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::BuzzerPort;

pub struct Buzzer<P> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> Buzzer<P> {
    /// Takes the pin and drives it low.
    pub fn new(pin: P) -> Self {
        let mut b = Self { pin, on: true };
        b.set(false);
        b
    }

    fn set(&mut self, on: bool) {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match result {
            Ok(()) => self.on = on,
            Err(_) => warn!("Buzzer GPIO write failed (wanted {})", if on { "on" } else { "off" }),
        }
    }

    /// Sound for `ms` then go quiet.  Used once at power-on.
    pub fn chirp(&mut self, ms: u32, delay: &mut impl DelayNs) {
        if ms == 0 {
            return;
        }
        self.set(true);
        delay.delay_ms(ms);
        self.set(false);
    }
}

impl<P: OutputPin> BuzzerPort for Buzzer<P> {
    fn set_alarm(&mut self, on: bool) {
        self.set(on);
    }

    fn is_on(&self) -> bool {
        self.on
    }
}
