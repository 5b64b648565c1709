use thiserror::Error;

use crate::{
    content::{DumpFlags, DumpFormat},
    disk::{DEFAULT_BLOCK_COUNT, DEFAULT_BLOCK_SIZE},
    shell::command::Command,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("'{command}' needs <{argument}>")]
    Missing {
        command: &'static str,
        argument: &'static str,
    },
    #[error("'{value}' is not a valid {argument}")]
    InvalidNumber {
        argument: &'static str,
        value: String,
    },
    #[error("unexpected argument '{0}'")]
    Unexpected(String),
}

pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let tokens: Vec<&str> = input.split_ascii_whitespace().collect();
    parse_args(&tokens)
}

pub fn parse_args<S: AsRef<str>>(tokens: &[S]) -> Result<Command, ParseError> {
    let Some((cmd, args)) = tokens.split_first() else {
        return Err(ParseError::Unknown(String::new()));
    };
    let args: Vec<&str> = args.iter().map(|s| s.as_ref()).collect();

    let command = match cmd.as_ref() {
        "help" => Command::Help,
        "createdisk" => {
            let name = required(&args, 0, "createdisk", "name")?;
            let blocks = optional_number(&args, 1, "blocks")?.unwrap_or(DEFAULT_BLOCK_COUNT);
            let block_size =
                optional_number(&args, 2, "blocksize")?.unwrap_or(DEFAULT_BLOCK_SIZE);
            no_more(&args, 3)?;
            Command::CreateDisk {
                name,
                blocks,
                block_size,
            }
        }
        "formatdisk" => {
            let name = required(&args, 0, "formatdisk", "name")?;
            no_more(&args, 1)?;
            Command::FormatDisk(name)
        }
        "lsdisk" | "lsvd" => {
            no_more(&args, 0)?;
            Command::ListDisks
        }
        "catdisk" | "typedisk" => parse_cat(&args)?,
        "statdisk" => {
            let name = required(&args, 0, "statdisk", "name")?;
            no_more(&args, 1)?;
            Command::StatDisk(name)
        }
        "readblock" => {
            let name = required(&args, 0, "readblock", "name")?;
            let index = optional_number(&args, 1, "block index")?.ok_or(ParseError::Missing {
                command: "readblock",
                argument: "index",
            })?;
            no_more(&args, 2)?;
            Command::ReadBlock { name, index }
        }
        "exit" | "quit" => Command::Exit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(command)
}

fn parse_cat(args: &[&str]) -> Result<Command, ParseError> {
    let mut name = None;
    let mut format = DumpFormat::default();
    let mut flags = DumpFlags::empty();

    for &arg in args {
        match arg {
            "--hex" => format = DumpFormat::Hex,
            "--text" => format = DumpFormat::Text,
            "--raw" => format = DumpFormat::Raw,
            "--squeeze" | "-s" => flags |= DumpFlags::SQUEEZE,
            "--no-header" => flags |= DumpFlags::NO_HEADER,
            flag if flag.starts_with('-') => return Err(ParseError::Unexpected(flag.to_string())),
            value if name.is_none() => name = Some(value.to_string()),
            value => return Err(ParseError::Unexpected(value.to_string())),
        }
    }

    Ok(Command::CatDisk {
        name: name.ok_or(ParseError::Missing {
            command: "catdisk",
            argument: "name",
        })?,
        format,
        flags,
    })
}

fn required(
    args: &[&str],
    at: usize,
    command: &'static str,
    argument: &'static str,
) -> Result<String, ParseError> {
    args.get(at)
        .map(|s| s.to_string())
        .ok_or(ParseError::Missing { command, argument })
}

fn optional_number(
    args: &[&str],
    at: usize,
    argument: &'static str,
) -> Result<Option<u64>, ParseError> {
    args.get(at)
        .map(|s| {
            s.parse().map_err(|_| ParseError::InvalidNumber {
                argument,
                value: s.to_string(),
            })
        })
        .transpose()
}

fn no_more(args: &[&str], expected: usize) -> Result<(), ParseError> {
    match args.get(expected) {
        Some(extra) => Err(ParseError::Unexpected(extra.to_string())),
        None => Ok(()),
    }
}
