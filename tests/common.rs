#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use brew_eeprom::control::{ControlMode, Temperature};
use brew_eeprom::device::DeviceHardware;
use brew_eeprom::{ControlConstants, ControlSettings, DeviceConfig, DeviceManager, TempControl};
use embedded_storage::{ReadStorage, Storage};

pub const EEPROM_SIZE: usize = 1024;

#[derive(Default)]
pub struct Eeprom {
    pub buf: Vec<u8>,
    pub fail_after_operation: usize,
    pub operations: Vec<Operation>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
}

impl Eeprom {
    /// A blank medium reads 0xFF everywhere.
    pub fn new(size: usize) -> Self {
        Self {
            buf: vec![0xffu8; size],
            fail_after_operation: usize::MAX,
            ..Default::default()
        }
    }

    pub fn new_with_fault(size: usize, fail_after_operation: usize) -> Self {
        Self {
            buf: vec![0xffu8; size],
            fail_after_operation,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
    }

    pub fn writes(&self) -> Vec<(u32, usize)> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                Operation::Write { offset, len } => Some((*offset, *len)),
                _ => None,
            })
            .collect()
    }

    pub fn dump_operations(&self) {
        println!("Operations:");
        for op in &self.operations {
            println!("  {:?}", op);
        }
    }
}

#[derive(Debug)]
pub struct EepromError;

impl ReadStorage for Eeprom {
    type Error = EepromError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        println!(
            "    eeprom: read:  0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );
        if self.operations.len() >= self.fail_after_operation {
            println!("    eeprom: FAULT");
            return Err(EepromError);
        }
        self.operations.push(Operation::Read {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl Storage for Eeprom {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        println!(
            "    eeprom: write: 0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );

        if self.operations.len() >= self.fail_after_operation {
            println!("    eeprom: FAULT");
            return Err(EepromError);
        }
        assert!(!bytes.is_empty());

        self.operations.push(Operation::Write {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

/// Control algorithm double. Starts out with live values that differ from the defaults.
pub struct Control {
    pub constants: ControlConstants,
    pub settings: ControlSettings,
    pub inits: usize,
}

impl Control {
    pub fn new() -> Self {
        let mut constants = ControlConstants::default();
        constants.kp = Temperature::from_hundredths(1200);
        constants.max_cool_time_for_estimate = 42;

        let mut settings = ControlSettings::default();
        settings.mode = ControlMode::BeerConstant;
        settings.beer_setting = Temperature::from_hundredths(1850);

        Self {
            constants,
            settings,
            inits: 0,
        }
    }
}

impl TempControl for Control {
    fn load_default_constants(&mut self) {
        self.constants = ControlConstants::default();
    }

    fn load_default_settings(&mut self) {
        self.settings = ControlSettings::default();
    }

    fn constants(&self) -> &ControlConstants {
        &self.constants
    }

    fn settings(&self) -> &ControlSettings {
        &self.settings
    }

    fn set_constants(&mut self, constants: ControlConstants) {
        self.constants = constants;
    }

    fn set_settings(&mut self, settings: ControlSettings) {
        self.settings = settings;
    }

    fn init(&mut self) {
        self.inits += 1;
    }
}

pub const RESOLVED_ADDRESS: [u8; 8] = [0x28, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01, 0x5C];

/// Device manager double. Rejects one hardware kind and resolves one-wire sensors without an
/// address to `RESOLVED_ADDRESS`.
#[derive(Default)]
pub struct Devices {
    pub rejected: Option<DeviceHardware>,
    pub resets: usize,
    pub validated: Vec<u8>,
    pub installed: Vec<(u8, DeviceConfig)>,
}

impl Devices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(hardware: DeviceHardware) -> Self {
        Self {
            rejected: Some(hardware),
            ..Default::default()
        }
    }

    pub fn installed_indices(&self) -> Vec<u8> {
        self.installed.iter().map(|(index, _)| *index).collect()
    }
}

impl DeviceManager for Devices {
    fn setup_unconfigured_devices(&mut self) {
        self.resets += 1;
        self.installed.clear();
    }

    fn is_device_valid(
        &mut self,
        candidate: &DeviceConfig,
        resolved: &mut DeviceConfig,
        index: u8,
    ) -> bool {
        self.validated.push(index);

        if self.rejected == Some(candidate.hardware) {
            return false;
        }
        if candidate.hardware == DeviceHardware::OneWireTemp && candidate.hw.address.0[0] == 0 {
            resolved.hw.address.0 = RESOLVED_ADDRESS;
        }
        true
    }

    fn install_device(&mut self, config: &DeviceConfig) {
        let index = *self.validated.last().expect("install without validation");
        self.installed.push((index, *config));
    }
}
