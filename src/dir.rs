use crate::dir_entry::{decode_records, format_83, DecodedEntry, DIR_ENTRY_SIZE};
use crate::error::{Error, Result};
use crate::image::Image;
use crate::table;
use crate::volume::Volume;

const DOT_ATTR_DIRECTORY: u8 = 0x10;

/// Returns true iff the cluster lies within the image and the first or
/// second 32-byte record at its byte offset has `name[0] == '.'` with the
/// directory attribute bit set.
///
/// Every FAT16 subdirectory cluster opens with the `.` and `..` entries;
/// detecting them disambiguates files from directories without any
/// additional schema.
pub fn looks_like_directory(image: Image, volume: &Volume, cluster: u32) -> bool {
    let offset = match volume.cluster_byte_offset(cluster) {
        Ok(o) => o,
        Err(_) => return false,
    };
    let offset = match usize::try_from(offset) {
        Ok(o) => o,
        Err(_) => return false,
    };
    for i in 0..2usize {
        let record_offset = offset + i * DIR_ENTRY_SIZE;
        let record = match image.slice(record_offset, DIR_ENTRY_SIZE) {
            Ok(r) => r,
            Err(_) => continue,
        };
        if record[0] == b'.' && record[11] & DOT_ATTR_DIRECTORY != 0 {
            return true;
        }
    }
    false
}

fn format_entry_summary(entry: &DecodedEntry) -> String {
    format!(
        "{:<12} clus={} size={} attr={:02x}",
        entry.short_name, entry.first_cluster, entry.file_size, entry.attr.bits()
    )
}

/// Prints a summary line for each entry, then follows its FAT chain (the
/// chain walker's directory guard suppresses that trace for subdirectory
/// entries, so only file chains are listed).
fn report_entries(image: Image, volume: &Volume, entries: &[DecodedEntry], lines: &mut Vec<String>) {
    for entry in entries {
        lines.push(format_entry_summary(entry));
        let report = table::walk(image, volume, entry.first_cluster);
        lines.extend(report.lines);
    }
}

/// Walks the root directory: a single contiguous region of `root_ent_cnt`
/// records, addressed with the hard-coded 512-byte LBA the source uses for
/// the partition start (not `bytes_per_sec`).
pub fn walk_root(image: Image, volume: &Volume) -> Result<Vec<String>> {
    let offset = volume.root_byte_offset();
    let offset = usize::try_from(offset).map_err(|_| Error::OutOfBounds)?;
    let len = volume.root_ent_cnt as usize * DIR_ENTRY_SIZE;
    let data = image.slice(offset, len)?;
    let (entries, _reached_end) = decode_records(data);
    let mut lines = Vec::new();
    report_entries(image, volume, &entries, &mut lines);
    Ok(lines)
}

/// Walks a subdirectory spanning a cluster chain starting at `start_cluster`.
/// Bounded independently of the chain walker's Floyd detection: aborts with
/// `Error::ChainTooLong` if more clusters are visited than `clusters + 1`,
/// since this walker does not dedupe visited clusters.
pub fn walk_subdirectory(image: Image, volume: &Volume, start_cluster: u16) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    let mut cluster = start_cluster as u32;
    let safety_bound = volume.clusters as u64 + 1;
    let mut visited: u64 = 0;

    loop {
        if visited >= safety_bound {
            warn!("subdirectory chain from cluster {start_cluster} exceeded {safety_bound} clusters");
            return Err(Error::ChainTooLong);
        }
        let offset = volume.cluster_byte_offset(cluster)?;
        let offset = usize::try_from(offset).map_err(|_| Error::OutOfBounds)?;
        let data = image.slice(offset, volume.cluster_size() as usize)?;
        let (entries, reached_end) = decode_records(data);
        report_entries(image, volume, &entries, &mut lines);
        visited += 1;
        if reached_end {
            break;
        }

        let next = table::fat_entry(image, volume, cluster)?;
        if next >= table::FAT16_EOC_MIN || next == table::FAT16_BAD_CLUSTER || next < 2 {
            break;
        }
        cluster = next as u32;
    }
    Ok(lines)
}

/// Re-derives the 8.3 presentation name for an arbitrary raw 11-byte field,
/// exposed for callers (e.g. `dump`) that need the name without a full
/// directory decode.
pub fn short_name(raw_name: &[u8; 11], is_dir: bool) -> String {
    format_83(raw_name, is_dir)
}
