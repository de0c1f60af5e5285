//! Device records bind a logical function of a chamber or beer to a piece of hardware.

use crate::error::Error;
use crate::layout::{Reader, Record, Writer};
use core::fmt;

#[derive(strum::FromRepr, strum::Display, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DeviceFunction {
    #[default]
    None = 0,
    ChamberDoor = 1,
    ChamberHeat = 2,
    ChamberCool = 3,
    ChamberLight = 4,
    ChamberTemp = 5,
    ChamberRoomTemp = 6,
    ChamberFan = 7,
    ChamberReserved1 = 8,
    BeerTemp = 9,
    BeerTemp2 = 10,
    BeerHeat = 11,
    BeerCool = 12,
    BeerSg = 13,
    BeerReserved1 = 14,
    BeerReserved2 = 15,
}

impl DeviceFunction {
    const BEER_FIRST: u8 = DeviceFunction::BeerTemp as u8;

    pub fn is_chamber(self) -> bool {
        self != DeviceFunction::None && (self as u8) < Self::BEER_FIRST
    }

    pub fn is_beer(self) -> bool {
        self as u8 >= Self::BEER_FIRST
    }
}

#[derive(strum::FromRepr, strum::Display, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DeviceHardware {
    #[default]
    None = 0,
    /// digital pin, actuator or switch
    Pin = 1,
    /// DS2413 dual channel switch
    OneWire2413 = 2,
    /// DS18B20 temperature sensor
    OneWireTemp = 3,
}

/// 64 bit one-wire ROM code. A leading zero byte selects the first matching device on the bus.
#[derive(Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceAddress(pub [u8; 8]);

impl fmt::Debug for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceAddress(")?;
        for byte in self.0 {
            write!(f, "{byte:02X}")?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hardware {
    pub pin_nr: u8,
    /// inverts the signal of actuators and switches
    pub invert: bool,
    /// keeps the record (and the one-wire address) while the device is not used
    pub deactivate: bool,
    pub address: DeviceAddress,
    /// PIO channel of a DS2413, calibration offset (fixed 4.4) of a temperature sensor
    pub aux: u8,
}

impl Hardware {
    /// Calibration offset of a temperature sensor in sixteenths of a degree.
    pub fn calibration(&self) -> i8 {
        self.aux as i8
    }
}

/// A fixed size entry of the device table.
///
/// Chamber and beer are 1-based, 0 means the device does not belong to one.
/// The all zero record ([`DeviceConfig::EMPTY`]) marks an unused slot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    pub chamber: u8,
    pub beer: u8,
    pub function: DeviceFunction,
    pub hardware: DeviceHardware,
    pub hw: Hardware,
}

impl DeviceConfig {
    pub const EMPTY: DeviceConfig = DeviceConfig {
        chamber: 0,
        beer: 0,
        function: DeviceFunction::None,
        hardware: DeviceHardware::None,
        hw: Hardware {
            pin_nr: 0,
            invert: false,
            deactivate: false,
            address: DeviceAddress([0; 8]),
            aux: 0,
        },
    };

    const RESERVED: usize = 3;

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl Record for DeviceConfig {
    const SIZE: usize = 16 + Self::RESERVED;

    fn encode(&self, buf: &mut [u8]) {
        let mut w = Writer::new(buf);
        w.u8(self.chamber);
        w.u8(self.beer);
        w.u8(self.function as u8);
        w.u8(self.hardware as u8);
        w.u8(self.hw.pin_nr);
        w.bool(self.hw.invert);
        w.bool(self.hw.deactivate);
        w.bytes(&self.hw.address.0);
        w.u8(self.hw.aux);
        w.zeros(Self::RESERVED);
    }

    fn decode(buf: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(buf);
        let chamber = r.u8();
        let beer = r.u8();
        let function = DeviceFunction::from_repr(r.u8()).ok_or(Error::InvalidRecord)?;
        let hardware = DeviceHardware::from_repr(r.u8()).ok_or(Error::InvalidRecord)?;
        let hw = Hardware {
            pin_nr: r.u8(),
            invert: r.bool(),
            deactivate: r.bool(),
            address: DeviceAddress(r.array()),
            aux: r.u8(),
        };
        r.skip(Self::RESERVED);

        Ok(Self {
            chamber,
            beer,
            function,
            hardware,
            hw,
        })
    }
}

/// Owner of the live device bindings. The manager hands it every stored record on startup.
pub trait DeviceManager {
    /// Drops all installed devices, every function falls back to its unconfigured default.
    fn setup_unconfigured_devices(&mut self);

    /// Checks `candidate` against the available hardware. The manager may resolve details
    /// (e.g. the address of the first matching one-wire device) into `resolved`, which starts
    /// out as a copy of `candidate` and is what gets installed.
    fn is_device_valid(
        &mut self,
        candidate: &DeviceConfig,
        resolved: &mut DeviceConfig,
        index: u8,
    ) -> bool;

    fn install_device(&mut self, config: &DeviceConfig);
}

impl<T: DeviceManager> DeviceManager for &mut T {
    fn setup_unconfigured_devices(&mut self) {
        (*self).setup_unconfigured_devices()
    }

    fn is_device_valid(
        &mut self,
        candidate: &DeviceConfig,
        resolved: &mut DeviceConfig,
        index: u8,
    ) -> bool {
        (*self).is_device_valid(candidate, resolved, index)
    }

    fn install_device(&mut self, config: &DeviceConfig) {
        (*self).install_device(config)
    }
}

/// Set of device table indices.
#[derive(Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceIndices(u64);

impl DeviceIndices {
    pub const CAPACITY: usize = u64::BITS as usize;

    pub const fn new() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, index: u8) {
        debug_assert!((index as usize) < Self::CAPACITY);
        self.0 |= 1u64 << index;
    }

    pub fn contains(&self, index: u8) -> bool {
        (index as usize) < Self::CAPACITY && self.0 & (1u64 << index) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..Self::CAPACITY as u8).filter(|&index| self.contains(index))
    }
}

impl fmt::Debug for DeviceIndices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<u8> for DeviceIndices {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut indices = Self::new();
        for index in iter {
            indices.insert(index);
        }
        indices
    }
}
