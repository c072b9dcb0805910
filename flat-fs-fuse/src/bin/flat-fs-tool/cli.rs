use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use flat_fs::Geometry;

#[derive(Parser)]
pub struct Cli {
    /// Disk image file
    #[arg(long, short, default_value = "fs.img")]
    pub image: PathBuf,

    #[command(flatten)]
    pub geometry: GeometryArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// The image stores no geometry, so every run must repeat it
#[derive(Args)]
pub struct GeometryArgs {
    /// Inode table capacity
    #[arg(long, default_value_t = Geometry::default().inodes)]
    pub inodes: usize,

    /// Number of data blocks
    #[arg(long, default_value_t = Geometry::default().blocks)]
    pub blocks: usize,

    /// Bytes per data block
    #[arg(long, default_value_t = Geometry::default().block_size)]
    pub block_size: usize,

    /// Block pointers per inode
    #[arg(long, default_value_t = Geometry::default().pointers)]
    pub pointers: usize,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a fresh, empty image
    Format,
    /// Format the image and copy every regular file of a host directory into it
    Pack {
        /// Host source directory
        #[arg(long, short)]
        source: PathBuf,
    },
    /// Copy one host file into the image
    Put {
        host: PathBuf,
        /// Name inside the image, defaults to the host file name
        #[arg(long, short)]
        name: Option<String>,
    },
    /// Print a file
    Cat { name: String },
    /// Delete a file
    Rm { name: String },
    /// List files
    Ls,
    /// Show geometry and free space
    Info,
}

impl From<&GeometryArgs> for Geometry {
    fn from(args: &GeometryArgs) -> Self {
        Self {
            inodes: args.inodes,
            blocks: args.blocks,
            block_size: args.block_size,
            pointers: args.pointers,
        }
    }
}
