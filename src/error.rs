use core::fmt;

/// Error enum with all errors that can be returned by functions from this crate.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The MBR signature at offset 510 was not `0x55 0xAA`.
    MbrInvalid,
    /// No partition entry in the MBR has a FAT16 type byte with a nonzero LBA and sector count.
    NoFat16,
    /// The BPB is impossible to honor: partition header past the end of the image,
    /// an unsupported `bytes_per_sec`, or a zero `sec_per_clus`.
    BpbInvalid,
    /// A computed byte offset falls outside the mapped image.
    OutOfBounds,
    /// A FAT16 entry held the bad-cluster marker (`0xFFF7`).
    BadCluster,
    /// A FAT16 entry held a reserved value (`< 2`) where a chain continuation was expected.
    InvalidCluster,
    /// Floyd's cycle detector found the hare and tortoise on the same live cluster.
    CycleDetected,
    /// A directory walk visited more clusters than the volume's cluster count allows.
    ChainTooLong,
    /// A hex dump was requested on a cluster that looks like a directory.
    RefusedDirectory,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MbrInvalid => write!(f, "invalid MBR signature"),
            Error::NoFat16 => write!(f, "no FAT16 partition entry found in MBR"),
            Error::BpbInvalid => write!(f, "invalid or unreadable BPB"),
            Error::OutOfBounds => write!(f, "computed offset is out of bounds of the image"),
            Error::BadCluster => write!(f, "FAT entry marks a bad cluster"),
            Error::InvalidCluster => write!(f, "FAT entry is an invalid cluster number"),
            Error::CycleDetected => write!(f, "cluster chain contains a cycle"),
            Error::ChainTooLong => write!(f, "directory chain exceeded the volume's cluster count"),
            Error::RefusedDirectory => write!(f, "refusing to dump a cluster that looks like a directory"),
        }
    }
}

impl std::error::Error for Error {}

/// Shorthand used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
