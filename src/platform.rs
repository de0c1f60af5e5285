use crate::error::Error;
use core::cmp;
use core::ops::Range;
use embedded_storage::Storage;

/// Size of the stack buffer used to fill a range with a single value.
const FILL_CHUNK_SIZE: usize = 32;

/// Byte addressed access to the EEPROM. Implemented for every [`Storage`], so any
/// `embedded-storage` driver can back the manager. See README.md for an example implementation.
///
/// Offsets must stay inside `[0, capacity)`; range checks are the medium's concern. Errors of the
/// medium are reduced to [`Error::StorageError`].
pub trait ByteStore: Storage {
    fn read_byte(&mut self, offset: usize) -> Result<u8, Error> {
        let mut byte = [0u8; 1];
        self.read_block(offset, &mut byte)?;
        Ok(byte[0])
    }

    fn write_byte(&mut self, offset: usize, value: u8) -> Result<(), Error> {
        self.write_block(offset, &[value])
    }

    fn read_block(&mut self, offset: usize, bytes: &mut [u8]) -> Result<(), Error> {
        self.read(offset as u32, bytes)
            .map_err(|_| Error::StorageError)
    }

    fn write_block(&mut self, offset: usize, bytes: &[u8]) -> Result<(), Error> {
        self.write(offset as u32, bytes)
            .map_err(|_| Error::StorageError)
    }

    /// Sets every byte in `range` to `value`, in chunks of `FILL_CHUNK_SIZE` bytes.
    fn fill(&mut self, range: Range<usize>, value: u8) -> Result<(), Error> {
        let chunk = [value; FILL_CHUNK_SIZE];
        let mut offset = range.start;
        while offset < range.end {
            let len = cmp::min(FILL_CHUNK_SIZE, range.end - offset);
            self.write_block(offset, &chunk[..len])?;
            offset += len;
        }
        Ok(())
    }
}

impl<T: Storage> ByteStore for T {}
