//! Drives the three indicator LEDs so that exactly one is lit.

use crate::config::IndicatorPins;
use crate::hal::{DigitalOutputs, PinId};
use crate::tuning::IndicatorState;

#[derive(Debug)]
pub struct IndicatorDriver<O> {
    outputs: O,
    pins: IndicatorPins,
}

impl<O: DigitalOutputs> IndicatorDriver<O> {
    pub fn new(outputs: O, pins: IndicatorPins) -> Self {
        Self { outputs, pins }
    }

    /// Lights the LED for `state`. The other two are cleared first, so no
    /// write sequence ever shows two LEDs on.
    pub fn apply(&mut self, state: IndicatorState) {
        let lit = self.pin_for(state);
        for pin in [self.pins.flat, self.pins.in_tune, self.pins.sharp] {
            if pin != lit {
                self.outputs.write_pin(pin, false);
            }
        }
        self.outputs.write_pin(lit, true);
    }

    pub fn pin_for(&self, state: IndicatorState) -> PinId {
        match state {
            IndicatorState::Flat => self.pins.flat,
            IndicatorState::InTune => self.pins.in_tune,
            IndicatorState::Sharp => self.pins.sharp,
        }
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// Records pin levels and checks the one-hot invariant after every write.
    #[derive(Default)]
    struct Leds {
        levels: BTreeMap<PinId, bool>,
        writes: usize,
    }

    impl DigitalOutputs for Leds {
        fn write_pin(&mut self, pin: PinId, level: bool) {
            self.levels.insert(pin, level);
            self.writes += 1;
            let lit = self.levels.values().filter(|&&on| on).count();
            assert!(lit <= 1, "{lit} indicators lit at once");
        }
    }

    #[test]
    fn exactly_one_led_after_each_apply() {
        let pins = IndicatorPins::default();
        let mut driver = IndicatorDriver::new(Leds::default(), pins);

        for state in [
            IndicatorState::Flat,
            IndicatorState::Sharp,
            IndicatorState::InTune,
            IndicatorState::InTune,
            IndicatorState::Flat,
        ] {
            driver.apply(state);
            let levels = &driver.outputs().levels;
            assert_eq!(levels.get(&driver.pin_for(state)), Some(&true));
            assert_eq!(levels.values().filter(|&&on| on).count(), 1);
        }
        assert_eq!(driver.outputs().writes, 15);
    }
}
