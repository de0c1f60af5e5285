#![doc = include_str ! ("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

pub mod control;
pub mod device;
pub mod error;
pub mod layout;
pub mod platform;
pub mod preset;

pub use control::{ControlConstants, ControlSettings, TempControl};
pub use device::{DeviceConfig, DeviceIndices, DeviceManager};
pub use layout::{EEPROM_FORMAT_VERSION, Layout, Record};
pub use preset::{FactoryPreset, HardwareVariant};

use crate::error::Error;
use crate::layout::MAX_RECORD_SIZE;
use crate::platform::ByteStore;
use core::ops::Range;
#[cfg(feature = "defmt")]
use defmt::{debug, trace, warn};
use embedded_storage::Storage;

/// Startup configuration of the [`EepromManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub layout: Layout,
    /// Devices stored by [`EepromManager::initialize`].
    pub preset: FactoryPreset,
    /// Without hardware the device table is kept but never installed.
    pub simulate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout: Layout::DEFAULT,
            preset: FactoryPreset::default(),
            simulate: cfg!(feature = "simulate"),
        }
    }
}

impl Config {
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_preset(mut self, preset: FactoryPreset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }
}

/// Outcome of [`EepromManager::apply_settings`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ApplyReport {
    /// Slots handed to `DeviceManager::install_device`.
    pub installed: DeviceIndices,
    /// Slots the device manager rejected (or that could not be decoded). They have been
    /// overwritten with [`DeviceConfig::EMPTY`].
    pub erased: DeviceIndices,
    /// The stored constants or settings did not decode and were replaced with the defaults.
    pub restored_defaults: bool,
}

/// The EepromManager maps the control constants and settings of every chamber and beer as well
/// as the device table onto a fixed layout in the EEPROM.
///
/// Byte 0 holds the format version. Anything but [`EEPROM_FORMAT_VERSION`] means there are no
/// settings and every operation except [`EepromManager::wipe`] and
/// [`EepromManager::initialize`] reports [`Error::NoSettings`].
pub struct EepromManager<S: Storage> {
    pub(crate) storage: S,
    pub(crate) config: Config,
    pub(crate) faulted: bool,
}

impl<S: Storage> EepromManager<S> {
    /// Takes over the medium. Fails if the medium is smaller than the layout capacity.
    pub fn new(storage: S, config: Config) -> Result<EepromManager<S>, Error> {
        if storage.capacity() < config.layout.capacity() {
            return Err(Error::StorageTooSmall);
        }

        Ok(Self {
            storage,
            config,
            faulted: false,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.config.layout
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Returns the medium.
    pub fn release(self) -> S {
        self.storage
    }

    /// Set once the medium failed. A faulted manager refuses all further writes.
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Checks the version tag.
    pub fn has_settings(&mut self) -> Result<bool, Error> {
        let result = self.storage.read_byte(self.config.layout.version_offset());
        let version = self.latch(result)?;
        Ok(version == EEPROM_FORMAT_VERSION)
    }

    /// Erases the whole capacity to 0xFF, leaving the medium as it comes from the factory.
    ///
    /// A wipe is attempted even after a storage error. When it succeeds the medium is in a known
    /// state again and the manager accepts writes.
    pub fn wipe(&mut self) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        debug!("wipe: {} bytes", self.config.layout.capacity());

        let result = self.storage.fill(0..self.config.layout.capacity(), 0xFF);
        self.latch(result)?;

        self.faulted = false;
        Ok(())
    }

    /// Writes a consistent baseline:
    /// 1. Clears the whole capacity to zero, every device slot becomes [`DeviceConfig::EMPTY`]
    /// 2. Stores the default constants in every chamber and the default settings in every beer
    /// 3. Writes the version tag
    /// 4. Stores the devices of the configured [`FactoryPreset`]
    ///
    /// Returns the number of preset devices stored. The device manager is reset and the control
    /// algorithm restarted with its defaults.
    pub fn initialize<C, D>(&mut self, control: &mut C, devices: &mut D) -> Result<u8, Error>
    where
        C: TempControl,
        D: DeviceManager,
    {
        #[cfg(feature = "defmt")]
        debug!("initialize");

        #[cfg(feature = "debug-logs")]
        println!("EepromManager: initialize");

        let layout = self.config.layout;
        self.fill(0..layout.capacity(), 0)?;

        devices.setup_unconfigured_devices();

        control.load_default_constants();
        control.load_default_settings();

        for chamber in 0..layout.chambers() {
            let offset = layout
                .constants_offset(chamber)
                .ok_or(Error::ChamberOutOfRange)?;
            self.write_record(offset, control.constants())?;

            for beer in 0..layout.beers() {
                let offset = layout
                    .settings_offset(chamber, beer)
                    .ok_or(Error::BeerOutOfRange)?;

                #[cfg(feature = "defmt")]
                trace!("initialize: settings of beer {} @{:#x}", beer, offset);

                self.write_record(offset, control.settings())?;
            }
        }

        // the tag goes last, storing devices requires it
        self.write_byte(layout.version_offset(), EEPROM_FORMAT_VERSION)?;

        let stored = self.save_default_devices()?;

        control.init();

        Ok(stored)
    }

    /// Loads the stored settings into the live state:
    /// 1. Resets the device manager
    /// 2. Hands the constants of chamber 0 and the settings of its beer 0 to the control algorithm
    /// 3. Walks the device table in slot order. Every slot is checked by the device manager and
    ///    installed if valid, otherwise it is erased from the EEPROM
    ///
    /// Step 3 is skipped in simulation. Without stored settings nothing is touched and
    /// [`Error::NoSettings`] is returned. Constants or settings that do not decode are replaced
    /// with the defaults of the control algorithm, in the EEPROM as well.
    pub fn apply_settings<C, D>(
        &mut self,
        control: &mut C,
        devices: &mut D,
    ) -> Result<ApplyReport, Error>
    where
        C: TempControl,
        D: DeviceManager,
    {
        if !self.has_settings()? {
            return Err(Error::NoSettings);
        }

        #[cfg(feature = "defmt")]
        debug!("apply_settings");

        // only one chamber with one beer is active for now
        let layout = self.config.layout;
        let constants_offset = layout.constants_offset(0).ok_or(Error::ChamberOutOfRange)?;
        let settings_offset = layout.settings_offset(0, 0).ok_or(Error::BeerOutOfRange)?;

        // both records are read before any live state changes
        let constants = self.read_optional_record::<ControlConstants>(constants_offset)?;
        let settings = self.read_optional_record::<ControlSettings>(settings_offset)?;

        // start from a clean state
        devices.setup_unconfigured_devices();

        let mut report = ApplyReport::default();

        match constants {
            Some(constants) => control.set_constants(constants),
            None => {
                #[cfg(feature = "defmt")]
                warn!("apply_settings: restoring default constants");

                control.load_default_constants();
                self.write_record(constants_offset, control.constants())?;
                report.restored_defaults = true;
            }
        }

        match settings {
            Some(settings) => control.set_settings(settings),
            None => {
                #[cfg(feature = "defmt")]
                warn!("apply_settings: restoring default settings");

                control.load_default_settings();
                self.write_record(settings_offset, control.settings())?;
                report.restored_defaults = true;
            }
        }

        if self.config.simulate {
            return Ok(report);
        }

        let mut index = 0u8;
        loop {
            let candidate = match self.fetch_device(index) {
                Ok(config) => Some(config),
                Err(Error::InvalidRecord) => None,
                Err(Error::DeviceIndexOutOfRange) | Err(Error::NoSettings) => break,
                Err(e) => return Err(e),
            };

            let valid = candidate.is_some_and(|candidate| {
                let mut resolved = candidate;
                if devices.is_device_valid(&candidate, &mut resolved, index) {
                    devices.install_device(&resolved);
                    true
                } else {
                    false
                }
            });

            if valid {
                report.installed.insert(index);
            } else {
                #[cfg(feature = "defmt")]
                warn!("apply_settings: erasing invalid device {}", index);

                #[cfg(feature = "debug-logs")]
                println!("EepromManager: erasing invalid device {index}");

                self.store_device(&DeviceConfig::EMPTY, index)?;
                report.erased.insert(index);
            }

            index += 1;
        }

        Ok(report)
    }

    /// Overwrites the constants of chamber 0 and the settings of its beer 0 with the live values.
    pub fn store_temp_constants_and_settings<C: TempControl>(
        &mut self,
        control: &C,
    ) -> Result<(), Error> {
        self.require_settings()?;

        let offset = self
            .config
            .layout
            .constants_offset(0)
            .ok_or(Error::ChamberOutOfRange)?;
        self.write_record(offset, control.constants())?;

        self.write_settings(control)
    }

    /// Overwrites the settings of chamber 0, beer 0 with the live values.
    pub fn store_temp_settings<C: TempControl>(&mut self, control: &C) -> Result<(), Error> {
        self.require_settings()?;
        self.write_settings(control)
    }

    pub fn fetch_temp_constants(&mut self, chamber: u8) -> Result<ControlConstants, Error> {
        let offset = self
            .config
            .layout
            .constants_offset(chamber)
            .ok_or(Error::ChamberOutOfRange)?;
        self.require_settings()?;

        self.read_record(offset)
    }

    pub fn fetch_temp_settings(&mut self, chamber: u8, beer: u8) -> Result<ControlSettings, Error> {
        let layout = self.config.layout;
        if layout.chamber_offset(chamber).is_none() {
            return Err(Error::ChamberOutOfRange);
        }
        let offset = layout
            .settings_offset(chamber, beer)
            .ok_or(Error::BeerOutOfRange)?;
        self.require_settings()?;

        self.read_record(offset)
    }

    /// Reads the device slot `index`. The index is checked before the medium is accessed.
    pub fn fetch_device(&mut self, index: u8) -> Result<DeviceConfig, Error> {
        let offset = self
            .config
            .layout
            .device_offset(index)
            .ok_or(Error::DeviceIndexOutOfRange)?;
        self.require_settings()?;

        self.read_record(offset)
    }

    /// Overwrites the device slot `index`. The index is checked before the medium is accessed.
    pub fn store_device(&mut self, config: &DeviceConfig, index: u8) -> Result<(), Error> {
        let offset = self
            .config
            .layout
            .device_offset(index)
            .ok_or(Error::DeviceIndexOutOfRange)?;
        self.require_settings()?;

        #[cfg(feature = "defmt")]
        trace!("store_device: {} @{:#x}", index, offset);

        self.write_record(offset, config)
    }

    fn save_default_devices(&mut self) -> Result<u8, Error> {
        let preset = self.config.preset;
        let mut stored = 0u8;

        for config in preset.devices() {
            match self.store_device(&config, stored) {
                Ok(()) => stored += 1,
                Err(Error::DeviceIndexOutOfRange) => {
                    #[cfg(feature = "defmt")]
                    warn!("preset exceeds device table, kept {} devices", stored);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(stored)
    }

    fn write_settings<C: TempControl>(&mut self, control: &C) -> Result<(), Error> {
        let offset = self
            .config
            .layout
            .settings_offset(0, 0)
            .ok_or(Error::BeerOutOfRange)?;
        self.write_record(offset, control.settings())
    }

    fn require_settings(&mut self) -> Result<(), Error> {
        if self.has_settings()? {
            Ok(())
        } else {
            Err(Error::NoSettings)
        }
    }

    fn read_record<R: Record>(&mut self, offset: usize) -> Result<R, Error> {
        let mut scratch = [0u8; MAX_RECORD_SIZE];
        let buf = &mut scratch[..R::SIZE];

        let result = self.storage.read_block(offset, buf);
        self.latch(result)?;

        R::decode(buf)
    }

    /// Like `read_record`, but a record that does not decode is `None`.
    fn read_optional_record<R: Record>(&mut self, offset: usize) -> Result<Option<R>, Error> {
        match self.read_record(offset) {
            Ok(record) => Ok(Some(record)),
            Err(Error::InvalidRecord) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write_record<R: Record>(&mut self, offset: usize, record: &R) -> Result<(), Error> {
        self.ensure_writable()?;

        let mut scratch = [0u8; MAX_RECORD_SIZE];
        let buf = &mut scratch[..R::SIZE];
        record.encode(buf);

        let result = self.storage.write_block(offset, buf);
        self.latch(result)
    }

    fn write_byte(&mut self, offset: usize, value: u8) -> Result<(), Error> {
        self.ensure_writable()?;

        let result = self.storage.write_byte(offset, value);
        self.latch(result)
    }

    fn fill(&mut self, range: Range<usize>, value: u8) -> Result<(), Error> {
        self.ensure_writable()?;

        let result = self.storage.fill(range, value);
        self.latch(result)
    }

    fn ensure_writable(&self) -> Result<(), Error> {
        if self.faulted {
            return Err(Error::StorageError);
        }
        Ok(())
    }

    fn latch<R>(&mut self, result: Result<R, Error>) -> Result<R, Error> {
        if let Err(Error::StorageError) = result {
            #[cfg(feature = "defmt")]
            warn!("storage error, refusing further writes");

            self.faulted = true;
        }
        result
    }
}
