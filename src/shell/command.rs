use std::io::{self, Write};

use colored::*;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    content::{DumpFlags, DumpFormat},
    disk::BlockIndex,
    error::{DiskError, Result},
    manager::DiskManager,
    utils::{display_timestamp, human_bytes},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    CreateDisk {
        name: String,
        blocks: u64,
        block_size: u64,
    },
    FormatDisk(String),
    ListDisks,
    CatDisk {
        name: String,
        format: DumpFormat,
        flags: DumpFlags,
    },
    StatDisk(String),
    ReadBlock {
        name: String,
        index: BlockIndex,
    },
    Exit,
}

/// Names offered for tab completion.
pub const COMMAND_NAMES: &[&str] = &[
    "help",
    "createdisk",
    "formatdisk",
    "lsdisk",
    "catdisk",
    "statdisk",
    "readblock",
    "exit",
];

/// How commands talk to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Prompt-driven: progress bars and confirmation before destructive steps.
    Interactive,
    /// One command from argv: no prompts.
    OneShot,
}

pub fn execute_command(cmd: &Command, manager: &DiskManager, mode: Mode) -> Result<()> {
    match cmd {
        Command::Help => print_help(),
        Command::CreateDisk {
            name,
            blocks,
            block_size,
        } => {
            let pb = progress_bar(mode, "#>-");
            let entry = manager.create_disk_with_progress(name, *blocks, *block_size, |done, total| {
                pb.set_length(total);
                pb.set_position(done);
            });
            pb.finish_and_clear();
            let entry = entry?;
            println!(
                "✅ Virtual disk {} with size {} created",
                entry.name.green().bold(),
                human_bytes(entry.geometry.total_bytes()).cyan()
            );
        }
        Command::FormatDisk(name) => {
            if mode == Mode::Interactive && !confirm_format(name)? {
                println!("{}", "Format cancelled.".yellow());
                return Ok(());
            }
            let pb = progress_bar(mode, "=> ");
            let result = manager.format_disk_with_progress(name, |done, total| {
                pb.set_length(total);
                pb.set_position(done);
            });
            pb.finish_and_clear();
            result?;
            println!("💾 Virtual disk {} was formatted", name.green().bold());
        }
        Command::ListDisks => list_disks(manager)?,
        Command::CatDisk {
            name,
            format,
            flags,
        } => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let summary = manager.cat_disk(name, &mut out, *format, *flags)?;
            if summary.is_blank() && *format != DumpFormat::Raw {
                println!("{}", format!("Virtual disk {name} has no content").bright_black());
            }
        }
        Command::StatDisk(name) => {
            let entry = manager.stat_disk(name)?;
            println!(
                "{}\n{}: {}\n{}: {}\n{}: {} bytes\n{}: {}\n{}: {}\n{}: {}\n",
                "📊 Disk Info".bright_yellow().bold(),
                "Name".blue(),
                entry.name,
                "Blocks".blue(),
                entry.geometry.block_count(),
                "Block size".blue(),
                entry.geometry.block_size(),
                "Size".blue(),
                human_bytes(entry.geometry.total_bytes()),
                "Created".blue(),
                display_timestamp(&entry.created_at),
                "Path".blue(),
                entry.storage_path.display()
            );
        }
        Command::ReadBlock { name, index } => {
            let bytes = manager.read_block(name, *index)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            crate::content::write_dump(
                &mut out,
                std::iter::once(Ok((*index, bytes))),
                DumpFormat::Hex,
                DumpFlags::NO_HEADER,
            )?;
        }
        // The shell loop owns the farewell.
        Command::Exit => {}
    }

    Ok(())
}

fn list_disks(manager: &DiskManager) -> Result<()> {
    let entries = manager.list_disks()?;
    if entries.is_empty() {
        println!("{}", "No virtual disks registered.".bright_black());
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "{:<24} {:>12} {:>10} {:>14}  {}",
            "NAME", "BLOCKS", "BLOCKSIZE", "BYTES", "CREATED"
        )
        .bright_cyan()
        .bold()
    );
    for entry in entries {
        println!(
            "{:<24} {:>12} {:>10} {:>14}  {}",
            entry.name.green(),
            entry.geometry.block_count(),
            entry.geometry.block_size(),
            entry.geometry.total_bytes(),
            display_timestamp(&entry.created_at)
        );
    }
    Ok(())
}

fn progress_bar(mode: Mode, chars: &str) -> ProgressBar {
    if mode == Mode::OneShot {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template("[{bar:40.green/black}] {percent:>3}% {msg}") {
        pb.set_style(style.progress_chars(chars));
    }
    pb
}

fn confirm_format(name: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(format!("Zero every block of '{name}'?"))
        .default(false)
        .interact()
        .map_err(|e| DiskError::Io {
            context: "reading confirmation".to_string(),
            source: io::Error::new(io::ErrorKind::Other, e),
        })
}

pub fn print_help() {
    println!("{}", "📘 vdisk Commands".bright_cyan().bold());
    println!(
        "{}",
        "
  createdisk <name> [blocks] [blocksize]   Create a zero-filled disk (default 1000 x 32)
  formatdisk <name>                        Zero every block of a disk
  lsdisk                                   List registered disks
  catdisk <name> [--hex|--text|--raw] [--squeeze] [--no-header]
                                           Display disk content
  statdisk <name>                          Show disk info and check its backing file
  readblock <name> <index>                 Show one block
  help                                     Show this help message
  exit                                     Quit the shell
"
        .bright_black()
    );
    let _ = io::stdout().flush();
}
