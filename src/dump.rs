use std::fmt::Write as _;

use crate::dir::looks_like_directory;
use crate::error::{Error, Result};
use crate::image::Image;
use crate::volume::Volume;

const BYTES_PER_ROW: usize = 16;

/// Renders one cluster's bytes as 16-byte-wide hex+ASCII rows, refusing
/// clusters that look like directories (scenario 6 in the testable
/// properties): dumping a directory cluster is a confusing no-op, so the
/// caller gets a recoverable error instead of raw bytes.
pub fn dump_cluster(image: Image, volume: &Volume, cluster: u16) -> Result<String> {
    if looks_like_directory(image, volume, cluster as u32) {
        return Err(Error::RefusedDirectory);
    }
    let offset = volume.cluster_byte_offset(cluster as u32)?;
    let offset = usize::try_from(offset).map_err(|_| Error::OutOfBounds)?;
    let data = image.slice(offset, volume.cluster_size() as usize)?;

    let mut out = String::new();
    for (row_index, row) in data.chunks(BYTES_PER_ROW).enumerate() {
        let _ = write!(out, "{:08x}  ", row_index * BYTES_PER_ROW);
        for (i, byte) in row.iter().enumerate() {
            let _ = write!(out, "{byte:02x} ");
            if i == 7 {
                out.push(' ');
            }
        }
        for _ in row.len()..BYTES_PER_ROW {
            out.push_str("   ");
        }
        out.push(' ');
        out.push('|');
        for &byte in row {
            let ch = if (0x20..0x7f).contains(&byte) { byte as char } else { '.' };
            out.push(ch);
        }
        out.push('|');
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mbr::Fat16Partition;

    fn volume_for(buf: &mut Vec<u8>) -> Volume {
        buf[11..13].copy_from_slice(&512u16.to_le_bytes());
        buf[13] = 1;
        buf[14..16].copy_from_slice(&1u16.to_le_bytes());
        buf[16] = 1;
        buf[17..19].copy_from_slice(&16u16.to_le_bytes());
        buf[19..21].copy_from_slice(&8u16.to_le_bytes());
        buf[22..24].copy_from_slice(&1u16.to_le_bytes());
        let partition = Fat16Partition { index: 0, part_type: 0x06, lba_start: 0, lba_count: 8 };
        let image = Image::new(buf);
        Volume::build(image, partition).unwrap()
    }

    #[test]
    fn dumps_cluster_as_hex_and_ascii() {
        let mut buf = vec![0u8; 4096];
        let volume = volume_for(&mut buf);
        let off = volume.cluster_byte_offset(2).unwrap() as usize;
        buf[off..off + 5].copy_from_slice(b"Rust!");
        let image = Image::new(&buf);
        let out = dump_cluster(image, &volume, 2).unwrap();
        assert!(out.contains("52 75 73 74 21"));
        assert!(out.contains("|Rust!"));
    }

    #[test]
    fn refuses_directory_like_cluster() {
        let mut buf = vec![0u8; 4096];
        let volume = volume_for(&mut buf);
        let off = volume.cluster_byte_offset(2).unwrap() as usize;
        buf[off] = b'.';
        buf[off + 11] = 0x10;
        let image = Image::new(&buf);
        assert!(dump_cluster(image, &volume, 2).is_err());
    }
}
