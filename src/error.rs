use thiserror::Error;

/// Errors that can occur during EEPROM operations. Marked as non-exhaustive to allow for future
/// additions without breaking the API. A caller would usually only need to handle NoSettings
/// and the index errors, as the others are static or point at broken hardware.
#[derive(Error, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The version tag does not match `EEPROM_FORMAT_VERSION`. Either the medium is blank,
    /// was wiped, or was written by a firmware with a different layout.
    #[error("no settings stored")]
    NoSettings,

    /// Device slots are limited to the device table of the layout.
    #[error("device index out of range")]
    DeviceIndexOutOfRange,

    #[error("chamber index out of range")]
    ChamberOutOfRange,

    #[error("beer index out of range")]
    BeerOutOfRange,

    /// A stored record holds a value none of the known kinds map to.
    #[error("invalid record")]
    InvalidRecord,

    /// The medium reports less capacity than the layout reserves.
    #[error("storage too small for layout")]
    StorageTooSmall,

    /// The internal error value is returned from the provided `impl Storage`
    #[error("internal storage error")]
    StorageError,
}
