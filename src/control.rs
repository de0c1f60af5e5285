//! Records of the temperature control algorithm and the interface the manager uses to move them
//! between the algorithm and the EEPROM.

use crate::error::Error;
use crate::layout::{Reader, Record, Writer};

/// Signed fixed point value with 7 integer and 9 fractional bits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Temperature(pub i16);

impl Temperature {
    const ONE: i32 = 1 << 9;

    /// `Temperature::from_hundredths(-150)` is -1.5. Values outside the range of roughly ±64
    /// saturate.
    pub const fn from_hundredths(hundredths: i32) -> Self {
        let raw = hundredths as i64 * Self::ONE as i64 / 100;
        if raw > i16::MAX as i64 {
            Self(i16::MAX)
        } else if raw < i16::MIN as i64 {
            Self(i16::MIN)
        } else {
            Self(raw as i16)
        }
    }

    pub const fn to_hundredths(self) -> i32 {
        self.0 as i32 * 100 / Self::ONE
    }
}

#[derive(strum::FromRepr, strum::Display, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TempFormat {
    Celsius = b'C',
    Fahrenheit = b'F',
}

#[derive(strum::FromRepr, strum::Display, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ControlMode {
    Off = b'o',
    FridgeConstant = b'f',
    BeerConstant = b'b',
    BeerProfile = b'p',
    Test = b't',
}

/// Tuning of the control algorithm, stored once per chamber.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlConstants {
    pub temp_format: TempFormat,
    pub temp_setting_min: Temperature,
    pub temp_setting_max: Temperature,
    pub kp: Temperature,
    pub ki: Temperature,
    pub kd: Temperature,
    pub i_max_error: Temperature,
    pub idle_range_high: Temperature,
    pub idle_range_low: Temperature,
    pub heating_target_upper: Temperature,
    pub heating_target_lower: Temperature,
    pub cooling_target_upper: Temperature,
    pub cooling_target_lower: Temperature,
    /// seconds
    pub max_heat_time_for_estimate: u16,
    /// seconds
    pub max_cool_time_for_estimate: u16,
    pub fridge_fast_filter: u8,
    pub fridge_slow_filter: u8,
    pub fridge_slope_filter: u8,
    pub beer_fast_filter: u8,
    pub beer_slow_filter: u8,
    pub beer_slope_filter: u8,
    pub light_as_heater: bool,
    pub rotary_half_steps: bool,
    pub pid_max: Temperature,
}

impl Default for ControlConstants {
    fn default() -> Self {
        Self {
            temp_format: TempFormat::Celsius,
            temp_setting_min: Temperature::from_hundredths(100),
            temp_setting_max: Temperature::from_hundredths(3000),
            kp: Temperature::from_hundredths(500),
            ki: Temperature::from_hundredths(25),
            kd: Temperature::from_hundredths(-150),
            i_max_error: Temperature::from_hundredths(50),
            idle_range_high: Temperature::from_hundredths(100),
            idle_range_low: Temperature::from_hundredths(-100),
            heating_target_upper: Temperature::from_hundredths(30),
            heating_target_lower: Temperature::from_hundredths(-20),
            cooling_target_upper: Temperature::from_hundredths(20),
            cooling_target_lower: Temperature::from_hundredths(-30),
            max_heat_time_for_estimate: 600,
            max_cool_time_for_estimate: 1200,
            fridge_fast_filter: 1,
            fridge_slow_filter: 4,
            fridge_slope_filter: 3,
            beer_fast_filter: 3,
            beer_slow_filter: 4,
            beer_slope_filter: 4,
            light_as_heater: false,
            rotary_half_steps: false,
            pid_max: Temperature::from_hundredths(1000),
        }
    }
}

impl Record for ControlConstants {
    const SIZE: usize = 39;

    fn encode(&self, buf: &mut [u8]) {
        let mut w = Writer::new(buf);
        w.u8(self.temp_format as u8);
        for value in [
            self.temp_setting_min,
            self.temp_setting_max,
            self.kp,
            self.ki,
            self.kd,
            self.i_max_error,
            self.idle_range_high,
            self.idle_range_low,
            self.heating_target_upper,
            self.heating_target_lower,
            self.cooling_target_upper,
            self.cooling_target_lower,
        ] {
            w.i16(value.0);
        }
        w.u16(self.max_heat_time_for_estimate);
        w.u16(self.max_cool_time_for_estimate);
        w.bytes(&[
            self.fridge_fast_filter,
            self.fridge_slow_filter,
            self.fridge_slope_filter,
            self.beer_fast_filter,
            self.beer_slow_filter,
            self.beer_slope_filter,
        ]);
        w.bool(self.light_as_heater);
        w.bool(self.rotary_half_steps);
        w.i16(self.pid_max.0);
    }

    fn decode(buf: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(buf);
        let temp_format = TempFormat::from_repr(r.u8()).ok_or(Error::InvalidRecord)?;
        let mut temperature = || Temperature(r.i16());
        let temp_setting_min = temperature();
        let temp_setting_max = temperature();
        let kp = temperature();
        let ki = temperature();
        let kd = temperature();
        let i_max_error = temperature();
        let idle_range_high = temperature();
        let idle_range_low = temperature();
        let heating_target_upper = temperature();
        let heating_target_lower = temperature();
        let cooling_target_upper = temperature();
        let cooling_target_lower = temperature();

        Ok(Self {
            temp_format,
            temp_setting_min,
            temp_setting_max,
            kp,
            ki,
            kd,
            i_max_error,
            idle_range_high,
            idle_range_low,
            heating_target_upper,
            heating_target_lower,
            cooling_target_upper,
            cooling_target_lower,
            max_heat_time_for_estimate: r.u16(),
            max_cool_time_for_estimate: r.u16(),
            fridge_fast_filter: r.u8(),
            fridge_slow_filter: r.u8(),
            fridge_slope_filter: r.u8(),
            beer_fast_filter: r.u8(),
            beer_slow_filter: r.u8(),
            beer_slope_filter: r.u8(),
            light_as_heater: r.bool(),
            rotary_half_steps: r.bool(),
            pid_max: Temperature(r.i16()),
        })
    }
}

/// Setpoints of one beer, stored once per beer slot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlSettings {
    pub mode: ControlMode,
    pub beer_setting: Temperature,
    pub fridge_setting: Temperature,
    /// updated automatically by the self learning algorithm
    pub heat_estimator: Temperature,
    /// updated automatically by the self learning algorithm
    pub cool_estimator: Temperature,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            mode: ControlMode::Off,
            beer_setting: Temperature::from_hundredths(2000),
            fridge_setting: Temperature::from_hundredths(2000),
            heat_estimator: Temperature::from_hundredths(20),
            cool_estimator: Temperature::from_hundredths(500),
        }
    }
}

impl Record for ControlSettings {
    const SIZE: usize = 9;

    fn encode(&self, buf: &mut [u8]) {
        let mut w = Writer::new(buf);
        w.u8(self.mode as u8);
        w.i16(self.beer_setting.0);
        w.i16(self.fridge_setting.0);
        w.i16(self.heat_estimator.0);
        w.i16(self.cool_estimator.0);
    }

    fn decode(buf: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(buf);
        let mode = ControlMode::from_repr(r.u8()).ok_or(Error::InvalidRecord)?;
        Ok(Self {
            mode,
            beer_setting: Temperature(r.i16()),
            fridge_setting: Temperature(r.i16()),
            heat_estimator: Temperature(r.i16()),
            cool_estimator: Temperature(r.i16()),
        })
    }
}

/// The temperature control algorithm as seen by the manager. The manager decides where the
/// records live, the algorithm only hands out and takes over its live values.
pub trait TempControl {
    /// Replaces the live constants with the factory defaults.
    fn load_default_constants(&mut self);

    /// Replaces the live settings with the factory defaults.
    fn load_default_settings(&mut self);

    fn constants(&self) -> &ControlConstants;

    fn settings(&self) -> &ControlSettings;

    fn set_constants(&mut self, constants: ControlConstants);

    fn set_settings(&mut self, settings: ControlSettings);

    /// Resets the control state machine to its startup state.
    fn init(&mut self);
}

impl<T: TempControl> TempControl for &mut T {
    fn load_default_constants(&mut self) {
        (*self).load_default_constants()
    }

    fn load_default_settings(&mut self) {
        (*self).load_default_settings()
    }

    fn constants(&self) -> &ControlConstants {
        (**self).constants()
    }

    fn settings(&self) -> &ControlSettings {
        (**self).settings()
    }

    fn set_constants(&mut self, constants: ControlConstants) {
        (*self).set_constants(constants)
    }

    fn set_settings(&mut self, settings: ControlSettings) {
        (*self).set_settings(settings)
    }

    fn init(&mut self) {
        (*self).init()
    }
}
