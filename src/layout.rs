//! The persisted layout: a version tag, an array of chamber blocks and the device table.
//!
//! Offsets are derived from the record sizes in this module, nothing else in the crate computes
//! an address by hand.

use crate::control::{ControlConstants, ControlSettings};
use crate::device::{DeviceConfig, DeviceIndices};
use crate::error::Error;

/// Bump whenever the layout or one of the records changes. Stores with another tag are treated
/// as blank and get reinitialized, there is no migration.
pub const EEPROM_FORMAT_VERSION: u8 = 1;

/// EEPROM size of an ATmega328.
pub const MAX_EEPROM_SIZE: usize = 1024;

pub const MAX_CHAMBERS: u8 = 2;
pub const MAX_BEERS: u8 = 2;
pub const MAX_DEVICES: u8 = 16;

/// Chamber settings carry two reserved bytes behind the control constants.
const CHAMBER_SETTINGS_RESERVED: usize = 2;
pub(crate) const CHAMBER_SETTINGS_SIZE: usize =
    ControlConstants::SIZE + CHAMBER_SETTINGS_RESERVED;
pub(crate) const BEER_BLOCK_SIZE: usize = ControlSettings::SIZE;

/// Size of the stack scratch buffer records are staged in.
pub(crate) const MAX_RECORD_SIZE: usize = 64;

const _: () = assert!(
    ControlConstants::SIZE <= MAX_RECORD_SIZE
        && ControlSettings::SIZE <= MAX_RECORD_SIZE
        && DeviceConfig::SIZE <= MAX_RECORD_SIZE,
    "Every record must fit the scratch buffer"
);

const _: () = assert!(
    Layout::DEFAULT.size() <= MAX_EEPROM_SIZE,
    "Default layout must fit the EEPROM"
);

/// A fixed size value with a little-endian byte representation.
pub trait Record: Sized {
    const SIZE: usize;

    /// `buf` is exactly `SIZE` bytes long.
    fn encode(&self, buf: &mut [u8]);

    /// `buf` is exactly `SIZE` bytes long.
    fn decode(buf: &[u8]) -> Result<Self, Error>;
}

/// Dimensions of the persisted layout.
///
/// ```text
/// version                  @ 0
/// chambers[c]              @ 1 + c * chamber_block_size
///   control constants      @ chamber + 0
///   beers[b].settings      @ chamber + CHAMBER_SETTINGS_SIZE + b * BEER_BLOCK_SIZE
/// devices[i]               @ devices_offset + i * DeviceConfig::SIZE
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Layout {
    chambers: u8,
    beers: u8,
    devices: u8,
    capacity: usize,
}

impl Layout {
    pub const DEFAULT: Layout = Layout::new(MAX_CHAMBERS, MAX_BEERS, MAX_DEVICES, MAX_EEPROM_SIZE);

    /// Panics if the layout does not fit into `capacity` bytes. Use a const context to turn
    /// that into a build error:
    ///   `const LAYOUT: Layout = Layout::new(1, 1, 8, 512);`
    pub const fn new(chambers: u8, beers: u8, devices: u8, capacity: usize) -> Self {
        assert!(chambers > 0 && beers > 0 && devices > 0);
        assert!(devices as usize <= DeviceIndices::CAPACITY);

        let layout = Self {
            chambers,
            beers,
            devices,
            capacity,
        };
        assert!(layout.size() <= capacity, "EEPROM layout exceeds capacity");
        layout
    }

    pub const fn chambers(&self) -> u8 {
        self.chambers
    }

    pub const fn beers(&self) -> u8 {
        self.beers
    }

    pub const fn devices(&self) -> u8 {
        self.devices
    }

    /// Bytes of the medium owned by this layout. Wipe and initialize cover all of them.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub const fn version_offset(&self) -> usize {
        0
    }

    pub const fn chamber_block_size(&self) -> usize {
        CHAMBER_SETTINGS_SIZE + self.beers as usize * BEER_BLOCK_SIZE
    }

    pub const fn chamber_offset(&self, chamber: u8) -> Option<usize> {
        if chamber >= self.chambers {
            return None;
        }
        Some(self.version_offset() + 1 + chamber as usize * self.chamber_block_size())
    }

    pub const fn constants_offset(&self, chamber: u8) -> Option<usize> {
        self.chamber_offset(chamber)
    }

    pub const fn settings_offset(&self, chamber: u8, beer: u8) -> Option<usize> {
        if beer >= self.beers {
            return None;
        }
        match self.chamber_offset(chamber) {
            Some(offset) => Some(offset + CHAMBER_SETTINGS_SIZE + beer as usize * BEER_BLOCK_SIZE),
            None => None,
        }
    }

    pub const fn devices_offset(&self) -> usize {
        self.version_offset() + 1 + self.chambers as usize * self.chamber_block_size()
    }

    pub const fn device_offset(&self, index: u8) -> Option<usize> {
        if index >= self.devices {
            return None;
        }
        Some(self.devices_offset() + index as usize * DeviceConfig::SIZE)
    }

    /// Bytes actually used by the layout, always `<= capacity`.
    pub const fn size(&self) -> usize {
        self.devices_offset() + self.devices as usize * DeviceConfig::SIZE
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

pub(crate) struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn bytes(&mut self, value: &[u8]) {
        self.buf[self.pos..self.pos + value.len()].copy_from_slice(value);
        self.pos += value.len();
    }

    pub(crate) fn u8(&mut self, value: u8) {
        self.bytes(&[value]);
    }

    pub(crate) fn bool(&mut self, value: bool) {
        self.u8(value as u8);
    }

    pub(crate) fn u16(&mut self, value: u16) {
        self.bytes(&value.to_le_bytes());
    }

    pub(crate) fn i16(&mut self, value: i16) {
        self.bytes(&value.to_le_bytes());
    }

    /// reserved bytes are always written as zero
    pub(crate) fn zeros(&mut self, len: usize) {
        self.buf[self.pos..self.pos + len].fill(0);
        self.pos += len;
    }
}

pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    pub(crate) fn u8(&mut self) -> u8 {
        self.array::<1>()[0]
    }

    pub(crate) fn bool(&mut self) -> bool {
        self.u8() != 0
    }

    pub(crate) fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.array())
    }

    pub(crate) fn i16(&mut self) -> i16 {
        i16::from_le_bytes(self.array())
    }

    pub(crate) fn skip(&mut self, len: usize) {
        self.pos += len;
    }
}
