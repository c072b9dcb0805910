mod cli;

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use flat_fs::{FileSystem, Geometry};
use flat_fs_fuse::BlockFile;
use typed_bytesize::ByteSizeIec;

use cli::{Cli, Command};

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let geometry = Geometry::from(&cli.geometry);
    geometry.validate()?;

    match cli.command {
        Command::Format => {
            format(&cli.image, geometry)?;
        }
        Command::Pack { source } => {
            let mut fs = format(&cli.image, geometry)?;
            pack(&mut fs, &source)?;
        }
        Command::Put { host, name } => {
            let mut fs = mount(&cli.image, geometry)?;
            let name = match name {
                Some(name) => name,
                None => host_name(&host)?,
            };
            put(&mut fs, &host, &name)?;
        }
        Command::Cat { name } => {
            let mut fs = mount(&cli.image, geometry)?;
            let fd = fs.open(&name)?;
            let content = fs.read(fd)?;
            fs.close(fd)?;
            io::stdout().write_all(&content)?;
        }
        Command::Rm { name } => {
            let mut fs = mount(&cli.image, geometry)?;
            fs.delete(&name)?;
        }
        Command::Ls => {
            let fs = mount(&cli.image, geometry)?;
            for (fd, name, size) in fs.entries()? {
                println!("{fd:>4} {size:>10} {name}");
            }
        }
        Command::Info => {
            let fs = mount(&cli.image, geometry)?;
            let free = fs.free_block_count()?;
            let total_len = geometry.total_len().unwrap_or_default();
            println!("image       {}", cli.image.display());
            println!("size        {}", ByteSizeIec(total_len as u64));
            println!("inodes      {}", geometry.inodes);
            println!("blocks      {} x {} bytes", geometry.blocks, geometry.block_size);
            println!("free blocks {free}");
            println!("free space  {}", ByteSizeIec((free * geometry.block_size) as u64));
            println!(
                "max file    {} (direct write {})",
                ByteSizeIec(geometry.max_file_size() as u64),
                ByteSizeIec((geometry.pointers * geometry.block_size) as u64)
            );
        }
    }

    Ok(())
}

fn format(image: &Path, geometry: Geometry) -> Result<FileSystem> {
    let total_len = geometry.total_len().unwrap_or_default();
    let block_file = BlockFile::create(image, total_len)
        .with_context(|| format!("cannot create image {}", image.display()))?;
    let fs = FileSystem::format(Arc::new(block_file), geometry)?;
    println!("formatted {} ({})", image.display(), ByteSizeIec(total_len as u64));
    Ok(fs)
}

fn mount(image: &Path, geometry: Geometry) -> Result<FileSystem> {
    let block_file = BlockFile::open(image)
        .with_context(|| format!("cannot open image {}", image.display()))?;
    Ok(FileSystem::mount(Arc::new(block_file), geometry)?)
}

fn pack(fs: &mut FileSystem, source: &Path) -> Result<()> {
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let host = entry.path();
        let name = host_name(&host)?;
        log::info!("pack {name:?}");
        put(fs, &host, &name)?;
    }
    Ok(())
}

fn put(fs: &mut FileSystem, host: &Path, name: &str) -> Result<()> {
    let data = fs::read(host).with_context(|| format!("cannot read {}", host.display()))?;
    let fd = fs.create(name)?;
    fs.write(fd, &data)
        .with_context(|| format!("cannot store {name:?}"))?;
    fs.close(fd)?;
    println!("{name}: {} bytes", data.len());
    Ok(())
}

fn host_name(host: &Path) -> Result<String> {
    host.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("{} has no usable file name", host.display()))
}
