mod block_file;
mod cli;


use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use block_dev::BLOCK_SIZE;
use clap::Parser;
use sfs::FileSystem;
use typed_bytesize::ByteSizeIec;

use self::{
    block_file::{FileDriver, IMAGE_SIZE},
    cli::{Cli, Command},
};

type Sfs = FileSystem<FileDriver>;

type CliResult<T = ()> = Result<T, Box<dyn Error>>;

fn main() -> CliResult {
    env_logger::init();

    let cli = Cli::parse();
    let name = cli.image.to_str().ok_or("image path is not valid UTF-8")?;
    let mut fs = FileSystem::new(FileDriver::default());

    match cli.command {
        Command::Mkfs => {
            fs.make_fs(name)?;
            println!("{name}: {}", ByteSizeIec(IMAGE_SIZE));
            Ok(())
        }
        Command::Put { files } => with_mounted(&mut fs, name, |fs| {
            files.iter().try_for_each(|file| put(fs, file))
        }),
        Command::Cat { name: file } => with_mounted(&mut fs, name, |fs| cat(fs, &file)),
        Command::Cp { from, to } => with_mounted(&mut fs, name, |fs| cp(fs, &from, &to)),
        Command::Ls => with_mounted(&mut fs, name, ls),
        Command::Rm { names } => with_mounted(&mut fs, name, |fs| {
            names.iter().try_for_each(|file| Ok(fs.delete(file)?))
        }),
        Command::Truncate { name: file, length } => with_mounted(&mut fs, name, |fs| {
            let fd = fs.open(&file)?;
            fs.truncate(fd, length)?;
            fs.close(fd)?;
            Ok(())
        }),
    }
}

/// Mounts `name` around `f`, unmounting even when `f` fails.
fn with_mounted<T>(
    fs: &mut Sfs,
    name: &str,
    f: impl FnOnce(&mut Sfs) -> CliResult<T>,
) -> CliResult<T> {
    fs.mount(name)?;
    let result = f(fs);
    let unmounted = fs.unmount(name);
    let value = result?;
    unmounted?;
    Ok(value)
}

fn put(fs: &mut Sfs, host: &Path) -> CliResult {
    let data = fs::read(host)?;
    let name = host
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("{} has no usable file name", host.display()))?;

    match fs.create(name) {
        Err(sfs::Error::AlreadyExists) => {
            fs.delete(name)?;
            fs.create(name)?;
        }
        created => created?,
    }

    let fd = fs.open(name)?;
    let written = fs.write(fd, &data)?;
    fs.close(fd)?;

    if written < data.len() {
        log::warn!("{name}: only {written} of {} bytes fit", data.len());
    }
    println!("{name}: {}", ByteSizeIec(written as u64));
    Ok(())
}

fn cat(fs: &mut Sfs, name: &str) -> CliResult {
    let fd = fs.open(name)?;
    let mut stdout = io::stdout().lock();
    let mut buf = [0; BLOCK_SIZE];
    loop {
        let n = fs.read(fd, &mut buf)?;
        if n == 0 {
            break;
        }
        stdout.write_all(&buf[..n])?;
    }
    fs.close(fd)?;
    Ok(())
}

fn cp(fs: &mut Sfs, from: &str, to: &str) -> CliResult {
    let src = fs.open(from)?;
    fs.create(to)?;
    let dst = fs.open(to)?;

    let mut buf = [0; BLOCK_SIZE];
    loop {
        let n = fs.read(src, &mut buf)?;
        if n == 0 {
            break;
        }
        if fs.write(dst, &buf[..n])? < n {
            log::warn!("{to}: disk full, copy is incomplete");
            break;
        }
    }

    fs.close(src)?;
    fs.close(dst)?;
    Ok(())
}

fn ls(fs: &mut Sfs) -> CliResult {
    for stat in fs.list()? {
        println!(
            "{:<15} {:>12} {:>5} {} {}",
            stat.name,
            ByteSizeIec(stat.size as u64).to_string(),
            stat.blocks,
            stat.date_created,
            stat.time_created,
        );
    }
    println!(
        "{} files, {} free",
        fs.file_count()?,
        ByteSizeIec((fs.free_blocks()? * BLOCK_SIZE) as u64)
    );
    Ok(())
}
