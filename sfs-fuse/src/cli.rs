use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about = "Inspect and fill sfs disk images")]
pub struct Cli {
    /// Disk image on the host
    #[arg(long, short, default_value = "sfs.img")]
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty file system, replacing the image
    Mkfs,

    /// Copy host files into the image, replacing files of the same name
    Put {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Write a file to stdout
    Cat { name: String },

    /// Copy a file inside the image
    Cp { from: String, to: String },

    /// List files
    Ls,

    /// Delete files
    Rm {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Shrink a file to `length` bytes
    Truncate { name: String, length: i64 },
}
