use crate::dir;
use crate::dump::dump_cluster;
use crate::error::{Error, Result};
use crate::image::Image;
use crate::mbr::Mbr;
use crate::table;
use crate::volume::Volume;

/// Everything a command handler needs: the mapped image, the parsed MBR,
/// and the resolved FAT16 volume. Built once at startup and handed to every
/// command by reference.
pub struct Session<'a> {
    pub image: Image<'a>,
    pub mbr: Mbr,
    pub volume: Volume,
}

type Handler = fn(&Session, &[&str]) -> Result<Vec<String>>;

/// One row of the command table: its name, one-line help text, and handler.
pub struct Command {
    pub name: &'static str,
    pub help: &'static str,
    pub handler: Handler,
}

/// The fixed dispatch table driving the front end. A plain lookup table
/// rather than trait objects: the command set is closed and known at
/// compile time, so there is nothing dynamic dispatch would buy here.
pub const COMMANDS: &[Command] = &[
    Command { name: "mbr", help: "show the MBR partition table", handler: cmd_mbr },
    Command { name: "root", help: "list the root directory", handler: cmd_root },
    Command { name: "dir", help: "dir <cluster>: list a subdirectory's cluster chain", handler: cmd_dir },
    Command { name: "clus", help: "clus <cluster>: trace a cluster's FAT chain", handler: cmd_clus },
    Command { name: "dump", help: "dump <cluster>: hex-dump a data cluster", handler: cmd_dump },
    Command { name: "help", help: "list available commands", handler: cmd_help },
    Command { name: "quit", help: "exit the inspector", handler: cmd_quit },
    Command { name: "exit", help: "exit the inspector", handler: cmd_quit },
];

/// Looks up a command by name, case-sensitively, in table order.
pub fn lookup(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|c| c.name == name)
}

fn parse_cluster(args: &[&str]) -> Result<u16> {
    let raw = args.first().ok_or(Error::OutOfBounds)?;
    raw.parse::<u16>().map_err(|_| Error::OutOfBounds)
}

fn cmd_mbr(session: &Session, _args: &[&str]) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for (i, entry) in session.mbr.partitions.iter().enumerate() {
        lines.push(format!(
            "{i}: type=0x{:02x} lba_start={} lba_count={}",
            entry.part_type, entry.lba_start, entry.lba_count
        ));
    }
    Ok(lines)
}

fn cmd_root(session: &Session, _args: &[&str]) -> Result<Vec<String>> {
    dir::walk_root(session.image, &session.volume)
}

fn cmd_dir(session: &Session, args: &[&str]) -> Result<Vec<String>> {
    let cluster = parse_cluster(args)?;
    dir::walk_subdirectory(session.image, &session.volume, cluster)
}

fn cmd_clus(session: &Session, args: &[&str]) -> Result<Vec<String>> {
    let cluster = parse_cluster(args)?;
    let report = table::walk(session.image, &session.volume, cluster);
    match report.outcome {
        table::WalkOutcome::Error(e) => Err(e),
        _ => Ok(report.lines),
    }
}

fn cmd_dump(session: &Session, args: &[&str]) -> Result<Vec<String>> {
    let cluster = parse_cluster(args)?;
    let text = dump_cluster(session.image, &session.volume, cluster)?;
    Ok(text.lines().map(str::to_owned).collect())
}

fn cmd_help(_session: &Session, _args: &[&str]) -> Result<Vec<String>> {
    Ok(COMMANDS.iter().map(|c| format!("{:<6} {}", c.name, c.help)).collect())
}

fn cmd_quit(_session: &Session, _args: &[&str]) -> Result<Vec<String>> {
    Ok(Vec::new())
}

/// True for command names the REPL should treat as a request to stop, rather
/// than dispatch through the table and print a result.
pub fn is_quit(name: &str) -> bool {
    name == "quit" || name == "exit"
}
