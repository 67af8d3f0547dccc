use crate::dir::looks_like_directory;
use crate::error::{Error, Result};
use crate::image::Image;
use crate::volume::Volume;

/// First value in the FAT16 end-of-chain range.
pub const FAT16_EOC_MIN: u16 = 0xFFF8;
/// The single bad-cluster marker value.
pub const FAT16_BAD_CLUSTER: u16 = 0xFFF7;

fn is_terminal(value: u16) -> bool {
    value < 2 || value >= FAT16_BAD_CLUSTER
}

/// Reads the FAT16 entry for `cluster`. Does not validate that `cluster`
/// addresses an allocated data cluster; callers may inspect any FAT slot.
pub fn fat_entry(image: Image, volume: &Volume, cluster: u32) -> Result<u16> {
    let offset = volume.fat_byte_offset() + 2 * cluster as u64;
    let offset = usize::try_from(offset).map_err(|_| Error::OutOfBounds)?;
    let value = image.read_u16_le(offset)?;
    trace!("FAT[{cluster}] = 0x{value:04x}");
    Ok(value)
}

/// How a chain walk concluded.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum WalkOutcome {
    /// `start < 2`, or the cluster looked like a directory; no output was produced.
    Suppressed,
    /// Chain ran to an end-of-chain marker without incident.
    Clean,
    Error(Error),
}

/// The human-readable trace of a chain walk plus how it concluded.
#[derive(Debug, Clone)]
pub struct WalkReport {
    pub lines: Vec<String>,
    pub outcome: WalkOutcome,
}

impl WalkReport {
    fn suppressed() -> WalkReport {
        WalkReport { lines: Vec::new(), outcome: WalkOutcome::Suppressed }
    }
}

/// Follows the FAT16 cluster chain starting at `start`, printing a trace in
/// `lines` and classifying how it ended in `outcome`.
///
/// Uses Floyd's tortoise-and-hare to guarantee termination even over a
/// cyclic (adversarial) FAT. The hare refuses to advance past a terminal
/// value so it never wraps into a false cycle against the tortoise.
pub fn walk(image: Image, volume: &Volume, start: u16) -> WalkReport {
    if start < 2 {
        return WalkReport::suppressed();
    }
    if looks_like_directory(image, volume, start as u32) {
        return WalkReport::suppressed();
    }

    let mut lines = Vec::new();
    let mut hare = start;
    let mut cur = start;
    let mut n: u32 = 0;

    loop {
        let next = match fat_entry(image, volume, cur as u32) {
            Ok(v) => v,
            Err(e) => {
                lines.push(format!("  FAT[{cur} | 0x{cur:x}] = <out of bounds>"));
                return WalkReport { lines, outcome: WalkOutcome::Error(e) };
            }
        };

        if n == 0 && next < FAT16_EOC_MIN {
            lines.push(format!("  FAT[{cur} | 0x{cur:x}] = [{next} | 0x{next:04x}]"));
        }

        if next >= FAT16_EOC_MIN {
            if n > 2 {
                lines.push("  ...".into());
                lines.push(format!("  FAT[{cur} | 0x{cur:x}] = [EOC]"));
            }
            return WalkReport { lines, outcome: WalkOutcome::Clean };
        }
        if next == FAT16_BAD_CLUSTER {
            warn!("cluster chain from {start} hit the bad-cluster marker at {cur}");
            lines.push(format!("  FAT[{cur} | 0x{cur:x}] = [bad cluster]"));
            return WalkReport { lines, outcome: WalkOutcome::Error(Error::BadCluster) };
        }
        if next < 2 {
            lines.push(format!("  FAT[{cur} | 0x{cur:x}] = [invalid cluster 0x{next:04x}]"));
            return WalkReport { lines, outcome: WalkOutcome::Error(Error::InvalidCluster) };
        }

        let tortoise = next;

        for _ in 0..2 {
            if is_terminal(hare) {
                break;
            }
            hare = match fat_entry(image, volume, hare as u32) {
                Ok(v) => v,
                Err(_) => break,
            };
        }

        if hare == tortoise && !is_terminal(hare) {
            warn!("cycle detected in cluster chain from {start} at cluster {tortoise}");
            lines.push(format!("  FAT[{cur} | 0x{cur:x}] = [cycle detected at {tortoise}]"));
            return WalkReport { lines, outcome: WalkOutcome::Error(Error::CycleDetected) };
        }

        n += 1;
        cur = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mbr::Fat16Partition;
    use crate::volume::Volume;

    fn volume_with_fat(fat_entries: &[(u32, u16)]) -> (Vec<u8>, Volume) {
        // Minimal FAT16 layout: partition at LBA 0, 512B sectors, 1 FAT, small image.
        let mut buf = vec![0u8; 4096];
        buf[11..13].copy_from_slice(&512u16.to_le_bytes());
        buf[13] = 1; // sec_per_clus
        buf[14..16].copy_from_slice(&1u16.to_le_bytes()); // rsvd_sec_cnt
        buf[16] = 1; // num_fats
        buf[17..19].copy_from_slice(&16u16.to_le_bytes()); // root_ent_cnt
        buf[19..21].copy_from_slice(&8u16.to_le_bytes()); // tot_sec_16
        buf[22..24].copy_from_slice(&1u16.to_le_bytes()); // fat_sz_16

        let partition = Fat16Partition { index: 0, part_type: 0x06, lba_start: 0, lba_count: 8 };
        let image = Image::new(&buf);
        let volume = Volume::build(image, partition).unwrap();
        let fat_base = volume.fat_byte_offset() as usize;
        for (cluster, value) in fat_entries {
            let off = fat_base + 2 * *cluster as usize;
            buf[off..off + 2].copy_from_slice(&value.to_le_bytes());
        }
        (buf, volume)
    }

    #[test]
    fn immediate_eoc_emits_nothing() {
        let (buf, volume) = volume_with_fat(&[(2, 0xFFFF)]);
        let image = Image::new(&buf);
        let report = walk(image, &volume, 2);
        assert!(report.lines.is_empty());
        assert_eq!(report.outcome, WalkOutcome::Clean);
    }

    #[test]
    fn short_chain_omits_summary_line() {
        let (buf, volume) = volume_with_fat(&[(2, 3), (3, 0xFFFF)]);
        let image = Image::new(&buf);
        let report = walk(image, &volume, 2);
        assert_eq!(report.lines.len(), 1);
        assert!(report.lines[0].contains("[3 | 0x0003]"));
        assert_eq!(report.outcome, WalkOutcome::Clean);
    }

    #[test]
    fn long_chain_emits_first_pair_then_ellipsis_and_summary() {
        let (buf, volume) = volume_with_fat(&[(2, 3), (3, 4), (4, 5), (5, 0xFFFF)]);
        let image = Image::new(&buf);
        let report = walk(image, &volume, 2);
        assert_eq!(report.lines.len(), 3);
        assert!(report.lines[0].contains("[3 | 0x0003]"));
        assert_eq!(report.lines[1], "  ...");
        assert!(report.lines[2].contains("[EOC]"));
        assert_eq!(report.outcome, WalkOutcome::Clean);
    }

    #[test]
    fn cyclic_chain_is_detected_and_terminates() {
        let (buf, volume) = volume_with_fat(&[(2, 3), (3, 4), (4, 2)]);
        let image = Image::new(&buf);
        let report = walk(image, &volume, 2);
        assert_eq!(report.outcome, WalkOutcome::Error(Error::CycleDetected));
    }

    #[test]
    fn bad_cluster_marker_is_reported() {
        let (buf, volume) = volume_with_fat(&[(2, 0xFFF7)]);
        let image = Image::new(&buf);
        let report = walk(image, &volume, 2);
        assert_eq!(report.outcome, WalkOutcome::Error(Error::BadCluster));
    }

    #[test]
    fn invalid_next_cluster_is_reported() {
        let (buf, volume) = volume_with_fat(&[(2, 1)]);
        let image = Image::new(&buf);
        let report = walk(image, &volume, 2);
        assert_eq!(report.outcome, WalkOutcome::Error(Error::InvalidCluster));
    }

    #[test]
    fn start_below_two_is_suppressed() {
        let (buf, volume) = volume_with_fat(&[]);
        let image = Image::new(&buf);
        let report = walk(image, &volume, 0);
        assert_eq!(report.outcome, WalkOutcome::Suppressed);
        assert!(report.lines.is_empty());
    }
}
