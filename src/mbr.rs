use crate::error::{Error, Result};
use crate::image::Image;

const MBR_SIZE: usize = 512;
const PARTITION_TABLE_OFFSET: usize = 446;
const PARTITION_ENTRY_SIZE: usize = 16;
const PARTITION_ENTRY_COUNT: usize = 4;
const SIGNATURE_OFFSET: usize = 510;
const SIGNATURE: u16 = 0xAA55;

/// FAT16 partition type bytes recognized by `select_fat16_partition`.
const FAT16_PARTITION_TYPES: [u8; 3] = [0x04, 0x06, 0x0E];

/// A single 16-byte MBR partition table entry.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct PartitionEntry {
    pub boot_indicator: u8,
    pub chs_start: [u8; 3],
    pub part_type: u8,
    pub chs_end: [u8; 3],
    pub lba_start: u32,
    pub lba_count: u32,
}

impl PartitionEntry {
    fn deserialize(image: &Image, offset: usize) -> Result<PartitionEntry> {
        let raw = image.slice(offset, PARTITION_ENTRY_SIZE)?;
        let mut chs_start = [0u8; 3];
        chs_start.copy_from_slice(&raw[1..4]);
        let mut chs_end = [0u8; 3];
        chs_end.copy_from_slice(&raw[5..8]);
        Ok(PartitionEntry {
            boot_indicator: raw[0],
            chs_start,
            part_type: raw[4],
            chs_end,
            lba_start: image.read_u32_le(offset + 8)?,
            lba_count: image.read_u32_le(offset + 12)?,
        })
    }

    fn is_fat16(&self) -> bool {
        FAT16_PARTITION_TYPES.contains(&self.part_type)
    }
}

/// The 512-byte Master Boot Record at the start of the image.
#[derive(Debug, Clone)]
pub struct Mbr {
    pub partitions: [PartitionEntry; PARTITION_ENTRY_COUNT],
}

impl Mbr {
    /// Parses the MBR at offset 0. Fails with `Error::MbrInvalid` if the
    /// trailing `0x55 0xAA` signature does not match, or `Error::OutOfBounds`
    /// if the image is shorter than a full MBR.
    pub fn parse(image: Image) -> Result<Mbr> {
        if image.len() < MBR_SIZE {
            return Err(Error::OutOfBounds);
        }
        let sig = image.read_u16_le(SIGNATURE_OFFSET)?;
        // Stored little-endian as bytes [0x55, 0xAA]; read_u16_le yields 0xAA55.
        if sig != SIGNATURE {
            warn!("MBR signature mismatch: found 0x{sig:04x}");
            return Err(Error::MbrInvalid);
        }
        let mut partitions = [PartitionEntry {
            boot_indicator: 0,
            chs_start: [0; 3],
            part_type: 0,
            chs_end: [0; 3],
            lba_start: 0,
            lba_count: 0,
        }; PARTITION_ENTRY_COUNT];
        for (i, slot) in partitions.iter_mut().enumerate() {
            let offset = PARTITION_TABLE_OFFSET + i * PARTITION_ENTRY_SIZE;
            *slot = PartitionEntry::deserialize(&image, offset)?;
        }
        Ok(Mbr { partitions })
    }
}

/// The first FAT16 partition entry found, in table order.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Fat16Partition {
    pub index: usize,
    pub part_type: u8,
    pub lba_start: u32,
    pub lba_count: u32,
}

/// Scans entries 0..=3 in order and returns the first whose type byte is a
/// FAT16 type and whose `lba_start`/`lba_count` are both nonzero.
pub fn select_fat16_partition(mbr: &Mbr) -> Result<Fat16Partition> {
    for (index, entry) in mbr.partitions.iter().enumerate() {
        if entry.is_fat16() && entry.lba_start != 0 && entry.lba_count != 0 {
            return Ok(Fat16Partition {
                index,
                part_type: entry.part_type,
                lba_start: entry.lba_start,
                lba_count: entry.lba_count,
            });
        }
    }
    Err(Error::NoFat16)
}
