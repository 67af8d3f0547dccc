bitflags::bitflags! {
    /// FAT directory entry attribute bits.
    #[derive(Default, Clone, Copy, Eq, PartialEq, Debug)]
    pub struct FileAttributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE   = 0x20;
        const LFN       = Self::READ_ONLY.bits() | Self::HIDDEN.bits()
                         | Self::SYSTEM.bits() | Self::VOLUME_ID.bits();
    }
}

/// Size in bytes of a single directory record.
pub const DIR_ENTRY_SIZE: usize = 32;

const NAME_DELETED: u8 = 0xE5;
const NAME_END: u8 = 0x00;
const NAME_REALLY_E5: u8 = 0x05;

const OFF_NAME: usize = 0;
const OFF_ATTR: usize = 11;
const OFF_FST_CLUS_LO: usize = 26;
const OFF_FILE_SIZE: usize = 28;

/// One decoded, non-skipped directory record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DecodedEntry {
    pub short_name: String,
    pub raw_name: [u8; 11],
    pub attr: FileAttributes,
    pub first_cluster: u16,
    pub file_size: u32,
}

impl DecodedEntry {
    pub fn is_dir(&self) -> bool {
        self.attr.contains(FileAttributes::DIRECTORY)
    }
}

/// What a raw 32-byte record turned out to be, per the classification table:
/// the end sentinel terminates iteration for the whole directory (not just
/// the current cluster); deleted/LFN/volume-label are skipped; anything else
/// is a regular file or subdirectory entry.
pub(crate) enum RecordOutcome {
    End,
    Skip,
    Entry(DecodedEntry),
}

pub(crate) fn decode_record(record: &[u8; DIR_ENTRY_SIZE]) -> RecordOutcome {
    let first = record[OFF_NAME];
    if first == NAME_END {
        return RecordOutcome::End;
    }
    if first == NAME_DELETED {
        return RecordOutcome::Skip;
    }
    let attr = FileAttributes::from_bits_truncate(record[OFF_ATTR]);
    if record[OFF_ATTR] == 0x0F {
        return RecordOutcome::Skip;
    }
    if attr.contains(FileAttributes::VOLUME_ID) {
        return RecordOutcome::Skip;
    }
    let mut raw_name = [0u8; 11];
    raw_name.copy_from_slice(&record[OFF_NAME..OFF_NAME + 11]);
    let first_cluster = u16::from_le_bytes([record[OFF_FST_CLUS_LO], record[OFF_FST_CLUS_LO + 1]]);
    let file_size = u32::from_le_bytes([
        record[OFF_FILE_SIZE],
        record[OFF_FILE_SIZE + 1],
        record[OFF_FILE_SIZE + 2],
        record[OFF_FILE_SIZE + 3],
    ]);
    let short_name = format_83(&raw_name, attr.contains(FileAttributes::DIRECTORY));
    RecordOutcome::Entry(DecodedEntry { short_name, raw_name, attr, first_cluster, file_size })
}

/// Decodes a raw byte slice as the OEM charset FAT short names are stored
/// in: one byte per character, code point equal to byte value (the Latin-1
/// subset of this charset). `from_utf8_lossy` is wrong here — `0xE5`, the
/// restored "really E5" byte, is not a valid lone UTF-8 lead byte and would
/// be replaced with U+FFFD rather than decoded to the character it denotes.
fn decode_oem_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Decodes the 8.3 short name from the raw 11-byte field.
///
/// The first 8 bytes are the space-padded stem, the last 3 the extension.
/// A stored first byte of `0x05` denotes a real `0xE5` in the stem (FAT
/// reserves `0xE5` itself to mark deleted entries). If the extension is
/// empty, the caller says this is a directory, and the name doesn't start
/// with `.`, the name is suffixed with " (DIR)".
pub fn format_83(raw_name: &[u8; 11], is_dir: bool) -> String {
    let mut stem = raw_name[0..8].to_vec();
    if stem[0] == NAME_REALLY_E5 {
        stem[0] = NAME_DELETED;
    }
    let stem_len = stem.iter().rposition(|&b| b != b' ').map(|p| p + 1).unwrap_or(0);
    let stem = &stem[..stem_len];

    let ext = &raw_name[8..11];
    let ext_len = ext.iter().rposition(|&b| b != b' ').map(|p| p + 1).unwrap_or(0);
    let ext = &ext[..ext_len];

    let stem_str = decode_oem_bytes(stem);
    if ext.is_empty() {
        if is_dir && !stem_str.starts_with('.') {
            format!("{stem_str} (DIR)")
        } else {
            stem_str
        }
    } else {
        let ext_str = decode_oem_bytes(ext);
        format!("{stem_str}.{ext_str}")
    }
}

/// Iterates the classification of every 32-byte record in `data`, yielding
/// decoded entries and stopping at the end-of-directory sentinel.
pub fn iter_directory(data: &[u8]) -> impl Iterator<Item = DecodedEntry> + '_ {
    decode_records(data).0.into_iter()
}

/// Decodes every 32-byte record in `data`, returning the yielded entries and
/// whether the end-of-directory sentinel was reached within `data` (as
/// opposed to running out of records because `data` was exhausted first).
pub(crate) fn decode_records(data: &[u8]) -> (Vec<DecodedEntry>, bool) {
    let mut entries = Vec::new();
    for chunk in data.chunks_exact(DIR_ENTRY_SIZE) {
        let mut record = [0u8; DIR_ENTRY_SIZE];
        record.copy_from_slice(chunk);
        match decode_record(&record) {
            RecordOutcome::End => return (entries, true),
            RecordOutcome::Skip => {}
            RecordOutcome::Entry(e) => entries.push(e),
        }
    }
    (entries, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_name(s: &str) -> [u8; 11] {
        let mut buf = [b' '; 11];
        let bytes = s.as_bytes();
        buf[..bytes.len()].copy_from_slice(bytes);
        buf
    }

    #[test]
    fn formats_stem_and_extension() {
        assert_eq!(format_83(&raw_name("README  TXT"), false), "README.TXT");
    }

    #[test]
    fn directory_without_extension_gets_dir_suffix() {
        assert_eq!(format_83(&raw_name("SUBDIR     "), true), "SUBDIR (DIR)");
    }

    #[test]
    fn dot_entries_are_not_suffixed() {
        assert_eq!(format_83(&raw_name(".          "), true), ".");
        assert_eq!(format_83(&raw_name("..         "), true), "..");
    }

    #[test]
    fn file_without_extension_has_no_suffix() {
        assert_eq!(format_83(&raw_name("README     "), false), "README");
    }

    #[test]
    fn really_e5_first_byte_is_restored() {
        let mut name = raw_name("AFILE   TXT");
        name[0] = 0x05;
        assert_eq!(format_83(&name, false), "\u{e5}FILE.TXT");
    }

    fn record(name: &str, attr: u8, cluster: u16, size: u32) -> [u8; DIR_ENTRY_SIZE] {
        let mut buf = [0u8; DIR_ENTRY_SIZE];
        buf[OFF_NAME..OFF_NAME + 11].copy_from_slice(&raw_name(name));
        buf[OFF_ATTR] = attr;
        buf[OFF_FST_CLUS_LO..OFF_FST_CLUS_LO + 2].copy_from_slice(&cluster.to_le_bytes());
        buf[OFF_FILE_SIZE..OFF_FILE_SIZE + 4].copy_from_slice(&size.to_le_bytes());
        buf
    }

    #[test]
    fn iteration_stops_at_end_sentinel_and_skips_noise() {
        let mut data = Vec::new();
        data.extend_from_slice(&record("DELETED TXT", 0x20, 5, 1)[..]);
        data[0] = 0xE5;
        data.extend_from_slice(&record("LONGNAME1  ", 0x0F, 0, 0)[..]);
        data.extend_from_slice(&record("VOLLABEL   ", 0x08, 0, 0)[..]);
        data.extend_from_slice(&record("README  TXT", 0x20, 10, 123)[..]);
        let mut end = [0u8; DIR_ENTRY_SIZE];
        end[OFF_NAME] = 0x00;
        data.extend_from_slice(&end);
        data.extend_from_slice(&record("NEVER   TXT", 0x20, 1, 1)[..]);

        let entries: Vec<_> = iter_directory(&data).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].short_name, "README.TXT");
        assert_eq!(entries[0].first_cluster, 10);
        assert_eq!(entries[0].file_size, 123);
    }
}
