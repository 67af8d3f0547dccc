//! Read-only inspector for MBR/FAT16 disk images.
//!
//! The crate never writes to the mapped image: every accessor takes a
//! borrowed [`image::Image`] and returns decoded values or bounds-checked
//! errors. Callers drive the [`command`] dispatch table from a thin REPL
//! binary; the table itself, and everything it calls, lives here so it can
//! be exercised without a terminal.

#[macro_use]
extern crate log;

pub mod command;
pub mod dir;
pub mod dir_entry;
pub mod dump;
pub mod error;
pub mod image;
pub mod mbr;
pub mod table;
pub mod volume;

pub use command::{Command, Session, COMMANDS};
pub use error::{Error, Result};
pub use image::Image;
pub use mbr::{select_fat16_partition, Fat16Partition, Mbr, PartitionEntry};
pub use volume::Volume;
