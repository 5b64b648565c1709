use std::io::Write;

use bitflags::bitflags;

use crate::{
    disk::BlockIndex,
    error::{IoResultExt, Result},
};

const HEX_WIDTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DumpFormat {
    /// `hexdump -C` style lines.
    #[default]
    Hex,
    /// Printable bytes as text, everything else as `.`.
    Text,
    /// Block bytes copied to the output unchanged.
    Raw,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DumpFlags: u8 {
        /// Collapse runs of all-zero blocks into a single `*` line.
        const SQUEEZE = 1 << 0;
        /// Omit the per-block `block N` header.
        const NO_HEADER = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DumpSummary {
    pub blocks: u64,
    pub zero_blocks: u64,
}

impl DumpSummary {
    /// True when the disk holds nothing but zeros.
    pub fn is_blank(&self) -> bool {
        self.blocks == self.zero_blocks
    }
}

/// Writes `blocks` to `out` and reports how many were all zero.
///
/// `Raw` output ignores `flags`; every byte is written as is.
pub fn write_dump<W, I>(
    out: &mut W,
    blocks: I,
    format: DumpFormat,
    flags: DumpFlags,
) -> Result<DumpSummary>
where
    W: Write,
    I: IntoIterator<Item = Result<(BlockIndex, Vec<u8>)>>,
{
    let mut summary = DumpSummary::default();
    let mut in_zero_run = false;

    for block in blocks {
        let (index, bytes) = block?;
        let zero = bytes.iter().all(|b| *b == 0);
        summary.blocks += 1;
        if zero {
            summary.zero_blocks += 1;
        }

        if format == DumpFormat::Raw {
            out.write_all(&bytes).context("writing raw dump")?;
            continue;
        }

        if flags.contains(DumpFlags::SQUEEZE) && zero {
            if in_zero_run {
                continue;
            }
            in_zero_run = true;
        } else if in_zero_run {
            writeln!(out, "*").context("writing dump")?;
            in_zero_run = false;
        }

        if !flags.contains(DumpFlags::NO_HEADER) {
            writeln!(out, "block {index}").context("writing dump")?;
        }
        let base = index * bytes.len() as u64;
        let written = match format {
            DumpFormat::Hex => write_hex(out, base, &bytes),
            DumpFormat::Text => writeln!(out, "{}", printable(&bytes)),
            DumpFormat::Raw => Ok(()),
        };
        written.context("writing dump")?;
    }

    if in_zero_run {
        writeln!(out, "*").context("writing dump")?;
    }
    out.flush().context("flushing dump")?;
    Ok(summary)
}

fn write_hex<W: Write>(out: &mut W, base: u64, bytes: &[u8]) -> std::io::Result<()> {
    for (i, line) in bytes.chunks(HEX_WIDTH).enumerate() {
        write!(out, "{:08x} ", base + (i * HEX_WIDTH) as u64)?;
        for col in 0..HEX_WIDTH {
            if col == HEX_WIDTH / 2 {
                write!(out, " ")?;
            }
            match line.get(col) {
                Some(b) => write!(out, " {b:02x}")?,
                None => write!(out, "   ")?,
            }
        }
        writeln!(out, "  |{}|", printable(line))?;
    }
    Ok(())
}

fn printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}
