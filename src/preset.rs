//! Factory device presets. A preset lists the devices that are stored right after the layout is
//! initialized; boards without fixed wiring start with an empty table and are configured
//! through the host.

use crate::device::{DeviceConfig, DeviceFunction, DeviceHardware};

/// Known controller boards, parsed from their kebab-case name: `"shield-rev-a".parse()`.
#[derive(strum::EnumString, strum::Display, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[strum(serialize_all = "kebab-case")]
pub enum HardwareVariant {
    ShieldRevA,
    ShieldRevC,
    Dynamic,
}

/// Pin assignment of the rev A shield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ShieldPins {
    pub door: u8,
    pub heating: u8,
    pub cooling: u8,
    pub fridge_sensor: u8,
    pub beer_sensor: u8,
}

impl Default for ShieldPins {
    fn default() -> Self {
        Self {
            door: 4,
            heating: 5,
            cooling: 6,
            fridge_sensor: 11,
            beer_sensor: 10,
        }
    }
}

const REV_A_DEVICES: usize = 5;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FactoryPreset {
    /// Single chamber, single beer. Door, heater and cooler on pins, chamber and beer sensor on
    /// their own one-wire pins. Every pin device is inverted.
    ShieldRevA(ShieldPins),
    /// All devices are configured dynamically.
    ShieldRevC,
    #[default]
    Dynamic,
    /// Stores the given records as they are.
    Custom(&'static [DeviceConfig]),
}

impl FactoryPreset {
    /// The preset entries in table order, starting at index 0.
    pub fn devices(&self) -> impl Iterator<Item = DeviceConfig> + '_ {
        let fixed = match self {
            FactoryPreset::ShieldRevA(pins) => Some(shield_rev_a(pins)),
            _ => None,
        };
        let custom: &[DeviceConfig] = match self {
            FactoryPreset::Custom(devices) => *devices,
            _ => &[],
        };

        fixed.into_iter().flatten().chain(custom.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.devices().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<HardwareVariant> for FactoryPreset {
    fn from(variant: HardwareVariant) -> Self {
        match variant {
            HardwareVariant::ShieldRevA => FactoryPreset::ShieldRevA(ShieldPins::default()),
            HardwareVariant::ShieldRevC => FactoryPreset::ShieldRevC,
            HardwareVariant::Dynamic => FactoryPreset::Dynamic,
        }
    }
}

fn shield_rev_a(pins: &ShieldPins) -> [DeviceConfig; REV_A_DEVICES] {
    let mut config = DeviceConfig::EMPTY;
    config.chamber = 1;
    config.hw.invert = true;
    config.hardware = DeviceHardware::Pin;

    let mut door = config;
    door.function = DeviceFunction::ChamberDoor;
    door.hw.pin_nr = pins.door;

    let mut heat = config;
    heat.function = DeviceFunction::ChamberHeat;
    heat.hw.pin_nr = pins.heating;

    let mut cool = config;
    cool.function = DeviceFunction::ChamberCool;
    cool.hw.pin_nr = pins.cooling;

    config.hardware = DeviceHardware::OneWireTemp;

    let mut chamber_temp = config;
    chamber_temp.function = DeviceFunction::ChamberTemp;
    chamber_temp.hw.pin_nr = pins.fridge_sensor;

    let mut beer_temp = config;
    beer_temp.beer = 1;
    beer_temp.function = DeviceFunction::BeerTemp;
    beer_temp.hw.pin_nr = pins.beer_sensor;

    [door, heat, cool, chamber_temp, beer_temp]
}
