mod common;

use brew_eeprom::control::{ControlMode, Temperature};
use brew_eeprom::device::{DeviceFunction, DeviceHardware};
use brew_eeprom::error::Error;
use brew_eeprom::layout::MAX_DEVICES;
use brew_eeprom::{
    ApplyReport, Config, ControlConstants, ControlSettings, DeviceConfig, DeviceIndices,
    EepromManager, HardwareVariant,
};
use pretty_assertions::assert_eq;

fn initialized(config: Config) -> EepromManager<common::Eeprom> {
    let eeprom = common::Eeprom::new(common::EEPROM_SIZE);
    let mut eeprom = EepromManager::new(eeprom, config).unwrap();
    eeprom
        .initialize(&mut common::Control::new(), &mut common::Devices::new())
        .unwrap();
    eeprom.storage_mut().operations.clear();
    eeprom
}

fn rev_a() -> Config {
    Config::default().with_preset(HardwareVariant::ShieldRevA.into())
}

fn switch() -> DeviceConfig {
    let mut config = DeviceConfig::EMPTY;
    config.chamber = 1;
    config.function = DeviceFunction::ChamberFan;
    config.hardware = DeviceHardware::OneWire2413;
    config.hw.address.0 = [0x3A, 1, 2, 3, 4, 5, 6, 7];
    config.hw.aux = 1;
    config
}

#[test]
fn without_settings() {
    let eeprom = common::Eeprom::new(common::EEPROM_SIZE);
    let mut eeprom = EepromManager::new(eeprom, rev_a()).unwrap();
    let mut control = common::Control::new();
    let mut devices = common::Devices::new();

    assert_eq!(
        eeprom.apply_settings(&mut control, &mut devices),
        Err(Error::NoSettings)
    );

    assert_eq!(devices.resets, 0);
    assert!(devices.validated.is_empty());
    assert!(devices.installed.is_empty());
    assert_eq!(control.constants, common::Control::new().constants);
    assert!(eeprom.storage().writes().is_empty());
}

#[test]
fn loads_first_chamber_and_beer() {
    let mut eeprom = initialized(Config::default());

    let mut stored = common::Control::new();
    stored.constants.kd = Temperature::from_hundredths(-300);
    stored.settings.mode = ControlMode::FridgeConstant;
    eeprom.store_temp_constants_and_settings(&stored).unwrap();

    let mut control = common::Control::new();
    let mut devices = common::Devices::new();
    eeprom.apply_settings(&mut control, &mut devices).unwrap();

    assert_eq!(control.constants, stored.constants);
    assert_eq!(control.settings, stored.settings);
    assert_eq!(devices.resets, 1);
}

#[test]
fn visits_every_slot_in_order() {
    let mut eeprom = initialized(rev_a());
    let mut devices = common::Devices::new();

    let report = eeprom
        .apply_settings(&mut common::Control::new(), &mut devices)
        .unwrap();

    assert_eq!(devices.validated, (0..MAX_DEVICES).collect::<Vec<_>>());
    assert_eq!(devices.installed_indices(), (0..MAX_DEVICES).collect::<Vec<_>>());
    assert_eq!(
        report,
        ApplyReport {
            installed: (0..MAX_DEVICES).collect(),
            erased: DeviceIndices::new(),
            restored_defaults: false,
        }
    );
    // nothing to correct, nothing written
    assert!(eeprom.storage().writes().is_empty());
}

#[test]
fn rejected_device_is_erased() {
    let mut eeprom = initialized(rev_a());
    eeprom.store_device(&switch(), 2).unwrap();
    let mut devices = common::Devices::rejecting(DeviceHardware::OneWire2413);

    let report = eeprom
        .apply_settings(&mut common::Control::new(), &mut devices)
        .unwrap();

    assert_eq!(eeprom.fetch_device(2), Ok(DeviceConfig::EMPTY));
    assert!(!devices.installed_indices().contains(&2));
    assert_eq!(report.erased, [2].into_iter().collect::<DeviceIndices>());
    assert_eq!(report.installed.len(), MAX_DEVICES as usize - 1);

    // the walk does not stop at the rejected slot
    assert_eq!(devices.validated, (0..MAX_DEVICES).collect::<Vec<_>>());
    assert_eq!(eeprom.fetch_device(3).unwrap().function, DeviceFunction::ChamberTemp);
}

#[test]
fn undecodable_device_is_erased() {
    let mut eeprom = initialized(rev_a());
    let offset = eeprom.layout().device_offset(3).unwrap();
    // hardware byte
    eeprom.storage_mut().buf[offset + 3] = 0x42;
    let mut devices = common::Devices::new();

    let report = eeprom
        .apply_settings(&mut common::Control::new(), &mut devices)
        .unwrap();

    assert_eq!(report.erased.iter().collect::<Vec<_>>(), vec![3]);
    assert!(!devices.validated.contains(&3));
    assert_eq!(eeprom.fetch_device(3), Ok(DeviceConfig::EMPTY));
    assert_eq!(
        devices.installed_indices(),
        vec![0, 1, 2, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]
    );
}

#[test]
fn resolved_device_is_installed() {
    let mut eeprom = initialized(rev_a());
    let mut devices = common::Devices::new();

    eeprom
        .apply_settings(&mut common::Control::new(), &mut devices)
        .unwrap();

    let (index, chamber_sensor) = devices.installed[3];
    assert_eq!(index, 3);
    assert_eq!(chamber_sensor.hw.address.0, common::RESOLVED_ADDRESS);

    // the stored record is left as it is
    assert_eq!(eeprom.fetch_device(3).unwrap().hw.address.0, [0; 8]);
}

#[test]
fn simulation_skips_devices() {
    let mut eeprom = initialized(rev_a().with_simulate(true));
    let mut control = common::Control::new();
    let mut devices = common::Devices::new();

    let report = eeprom.apply_settings(&mut control, &mut devices).unwrap();

    assert_eq!(report, ApplyReport::default());
    assert_eq!(devices.resets, 1);
    assert!(devices.validated.is_empty());
    assert_eq!(control.constants, ControlConstants::default());
    assert_eq!(control.settings, ControlSettings::default());
}

#[test]
fn erased_slot_stays_erased() {
    let mut eeprom = initialized(rev_a());
    eeprom.store_device(&switch(), 7).unwrap();

    let mut devices = common::Devices::rejecting(DeviceHardware::OneWire2413);
    let first = eeprom
        .apply_settings(&mut common::Control::new(), &mut devices)
        .unwrap();
    assert!(first.erased.contains(7));

    let mut devices = common::Devices::rejecting(DeviceHardware::OneWire2413);
    let second = eeprom
        .apply_settings(&mut common::Control::new(), &mut devices)
        .unwrap();
    assert!(second.erased.is_empty());
    assert_eq!(devices.installed[7], (7, DeviceConfig::EMPTY));
}

#[test]
fn undecodable_settings_fall_back_to_defaults() {
    let mut eeprom = initialized(rev_a());
    let mut stored = common::Control::new();
    eeprom.store_temp_constants_and_settings(&stored).unwrap();

    let offset = eeprom.layout().settings_offset(0, 0).unwrap();
    // control mode
    eeprom.storage_mut().buf[offset] = b'x';
    let mut control = common::Control::new();
    control.constants.kp = Temperature::from_hundredths(-100);
    let mut devices = common::Devices::new();

    let report = eeprom.apply_settings(&mut control, &mut devices).unwrap();

    assert!(report.restored_defaults);
    stored.settings = ControlSettings::default();
    assert_eq!(control.constants, stored.constants);
    assert_eq!(control.settings, stored.settings);
    assert_eq!(eeprom.fetch_temp_settings(0, 0), Ok(ControlSettings::default()));

    // the device table is still walked
    assert_eq!(devices.resets, 1);
    assert_eq!(devices.validated, (0..MAX_DEVICES).collect::<Vec<_>>());
    assert_eq!(report.installed.len(), MAX_DEVICES as usize);
}

#[test]
fn unreadable_settings_change_nothing() {
    let mut eeprom = initialized(rev_a());
    // fail on the settings read: tag and constants succeed
    eeprom.storage_mut().fail_after_operation = 2;
    let mut control = common::Control::new();
    let mut devices = common::Devices::new();

    assert_eq!(
        eeprom.apply_settings(&mut control, &mut devices),
        Err(Error::StorageError)
    );
    assert_eq!(devices.resets, 0);
    assert_eq!(control.constants, common::Control::new().constants);
    assert_eq!(control.settings, common::Control::new().settings);
}
