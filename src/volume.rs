use crate::error::{Error, Result};
use crate::image::Image;
use crate::mbr::Fat16Partition;

/// Byte offset of the BPB fields, relative to the start of a partition's first sector.
mod bpb_offset {
    pub const BYTES_PER_SEC: usize = 11;
    pub const SEC_PER_CLUS: usize = 13;
    pub const RSVD_SEC_CNT: usize = 14;
    pub const NUM_FATS: usize = 16;
    pub const ROOT_ENT_CNT: usize = 17;
    pub const TOT_SEC_16: usize = 19;
    pub const FAT_SZ_16: usize = 22;
    pub const TOT_SEC_32: usize = 32;
}

/// Bytes in a sector at the fixed LBA size used to address the MBR and the
/// partition's first sector; *not* the BPB's own `bytes_per_sec`. See
/// `Volume::root_start_offset` for why both exist.
const MBR_SECTOR_SIZE: u64 = 512;

const VALID_SECTOR_SIZES: [u16; 4] = [512, 1024, 2048, 4096];
const DIR_ENTRY_SIZE: u32 = 32;

/// The FAT16 subset of the BIOS Parameter Block.
#[derive(Debug, Clone, Copy)]
struct Bpb {
    bytes_per_sec: u16,
    sec_per_clus: u8,
    rsvd_sec_cnt: u16,
    num_fats: u8,
    root_ent_cnt: u16,
    tot_sec_16: u16,
    fat_sz_16: u16,
    tot_sec_32: u32,
}

impl Bpb {
    fn deserialize(image: &Image, partition_offset: u64) -> Result<Bpb> {
        let base = usize::try_from(partition_offset).map_err(|_| Error::OutOfBounds)?;
        let bpb = Bpb {
            bytes_per_sec: image.read_u16_le(base + bpb_offset::BYTES_PER_SEC)?,
            sec_per_clus: image.read_u8(base + bpb_offset::SEC_PER_CLUS)?,
            rsvd_sec_cnt: image.read_u16_le(base + bpb_offset::RSVD_SEC_CNT)?,
            num_fats: image.read_u8(base + bpb_offset::NUM_FATS)?,
            root_ent_cnt: image.read_u16_le(base + bpb_offset::ROOT_ENT_CNT)?,
            tot_sec_16: image.read_u16_le(base + bpb_offset::TOT_SEC_16)?,
            fat_sz_16: image.read_u16_le(base + bpb_offset::FAT_SZ_16)?,
            tot_sec_32: image.read_u32_le(base + bpb_offset::TOT_SEC_32)?,
        };
        if !VALID_SECTOR_SIZES.contains(&bpb.bytes_per_sec) {
            return Err(Error::BpbInvalid);
        }
        if bpb.sec_per_clus == 0 {
            return Err(Error::BpbInvalid);
        }
        Ok(bpb)
    }

    fn total_sectors(&self) -> u32 {
        if self.tot_sec_16 != 0 {
            self.tot_sec_16 as u32
        } else {
            self.tot_sec_32
        }
    }
}

/// The derived, read-only layout of a FAT16 volume: partition bounds plus
/// every sector-relative region start needed by the FAT accessor and the
/// directory walkers. Constructed once by `Volume::build` and never mutated.
#[derive(Debug, Clone, Copy)]
pub struct Volume {
    pub part_lba_start: u32,
    pub part_lba_count: u32,
    pub part_index: usize,
    pub part_type: u8,

    pub bytes_per_sec: u16,
    pub sec_per_clus: u8,
    pub rsvd_sec_cnt: u16,
    pub num_fats: u8,
    pub root_ent_cnt: u16,
    pub fat_sz_16: u16,
    pub tot_sec: u32,

    /// Sector offset of the first FAT, relative to the partition start.
    pub fat_start: u32,
    /// Sector offset of the root directory region, relative to the partition start.
    pub root_start: u32,
    /// Sector offset of the data region (cluster 2), relative to the partition start.
    pub data_start: u32,
    pub root_dir_sectors: u32,
    pub data_sectors: u32,
    pub clusters: u32,
}

impl Volume {
    /// Reads the BPB at the partition's first sector and derives the full
    /// volume layout. Fails with `Error::BpbInvalid` if the partition header
    /// would extend past the image or the BPB fields are impossible to honor.
    pub fn build(image: Image, partition: Fat16Partition) -> Result<Volume> {
        // The MBR always addresses partitions in 512-byte LBAs regardless of
        // the BPB's own logical sector size; this asymmetry is intentional.
        let partition_offset = (partition.lba_start as u64) * MBR_SECTOR_SIZE;
        if partition_offset + MBR_SECTOR_SIZE > image.len() as u64 {
            return Err(Error::BpbInvalid);
        }
        let bpb = Bpb::deserialize(&image, partition_offset)?;

        let root_dir_sectors =
            ceil_div_u32(bpb.root_ent_cnt as u32 * DIR_ENTRY_SIZE, bpb.bytes_per_sec as u32);
        let fat_start = bpb.rsvd_sec_cnt as u32;
        let root_start = fat_start + bpb.num_fats as u32 * bpb.fat_sz_16 as u32;
        let data_start = root_start + root_dir_sectors;

        let tot_sec = bpb.total_sectors();
        let reserved_sectors = bpb.rsvd_sec_cnt as u32 + bpb.num_fats as u32 * bpb.fat_sz_16 as u32 + root_dir_sectors;
        let data_sectors = tot_sec.saturating_sub(reserved_sectors);
        let clusters = data_sectors / bpb.sec_per_clus as u32;

        debug!(
            "volume layout: fat_start={fat_start} root_start={root_start} data_start={data_start} clusters={clusters}"
        );

        Ok(Volume {
            part_lba_start: partition.lba_start,
            part_lba_count: partition.lba_count,
            part_index: partition.index,
            part_type: partition.part_type,
            bytes_per_sec: bpb.bytes_per_sec,
            sec_per_clus: bpb.sec_per_clus,
            rsvd_sec_cnt: bpb.rsvd_sec_cnt,
            num_fats: bpb.num_fats,
            root_ent_cnt: bpb.root_ent_cnt,
            fat_sz_16: bpb.fat_sz_16,
            tot_sec,
            fat_start,
            root_start,
            data_start,
            root_dir_sectors,
            data_sectors,
            clusters,
        })
    }

    /// Byte offset of the FAT's first byte within the image.
    pub fn fat_byte_offset(&self) -> u64 {
        (self.part_lba_start as u64 + self.fat_start as u64) * self.bytes_per_sec as u64
    }

    /// Byte offset of the root directory region within the image.
    ///
    /// Preserves the source's hard-coded 512-byte LBA here too: an
    /// implementation that used `bytes_per_sec` for root addressing would
    /// disagree with this one whenever `bytes_per_sec != 512`. See DESIGN.md.
    pub fn root_byte_offset(&self) -> u64 {
        (self.part_lba_start as u64 + self.root_start as u64) * MBR_SECTOR_SIZE
    }

    /// Byte offset of data cluster `c` (`c >= 2`) within the image.
    pub fn cluster_byte_offset(&self, cluster: u32) -> Result<u64> {
        if cluster < 2 {
            return Err(Error::InvalidCluster);
        }
        let cluster_sectors = (cluster - 2) as u64 * self.sec_per_clus as u64;
        let sector = self.part_lba_start as u64 + self.data_start as u64 + cluster_sectors;
        Ok(sector * self.bytes_per_sec as u64)
    }

    /// Number of bytes in one cluster.
    pub fn cluster_size(&self) -> u32 {
        self.bytes_per_sec as u32 * self.sec_per_clus as u32
    }

    /// Number of 32-byte directory records that fit in one cluster.
    pub fn dir_entries_per_cluster(&self) -> u32 {
        self.cluster_size() / DIR_ENTRY_SIZE
    }
}

fn ceil_div_u32(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}
