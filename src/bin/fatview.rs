use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::process::ExitCode;

use fatview::command::{self, Session};
use fatview::image::Image;
use fatview::mbr::{select_fat16_partition, Mbr};
use fatview::volume::Volume;
use log::debug;

fn run(path: &str) -> fatview::Result<()> {
    let file = File::open(path).map_err(|_| fatview::Error::OutOfBounds)?;
    // Safety: the mapped region is only read through `Image`, which never
    // writes back, and the file is not modified by any other party for the
    // lifetime of this process.
    let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|_| fatview::Error::OutOfBounds)?;
    let image = Image::new(&mmap);

    let mbr = Mbr::parse(image)?;
    let partition = select_fat16_partition(&mbr)?;
    debug!("selected FAT16 partition at lba_start={}", partition.lba_start);
    let volume = Volume::build(image, partition)?;
    let session = Session { image, mbr, volume };

    let stdin = io::stdin();
    loop {
        print!("fatview> ");
        io::stdout().flush().ok();
        let mut line = String::new();
        if stdin.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else { continue };
        let args: Vec<&str> = parts.collect();

        if command::is_quit(name) {
            break;
        }
        match command::lookup(name) {
            Some(cmd) => match (cmd.handler)(&session, &args) {
                Ok(lines) => lines.iter().for_each(|l| println!("{l}")),
                Err(e) => eprintln!("error: {e}"),
            },
            None => eprintln!("unknown command {name:?}, try 'help'"),
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: fatview <image-path>");
        return ExitCode::FAILURE;
    };
    match run(&path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
