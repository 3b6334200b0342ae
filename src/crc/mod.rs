use crc::{Crc, CRC_16_XMODEM, CRC_32_ISCSI};

/// CRC16 (XMODEM) used by user-friendly address checksums
pub const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// CRC32C used by the optional Bag of Cells trailer
pub const CRC32C: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);
