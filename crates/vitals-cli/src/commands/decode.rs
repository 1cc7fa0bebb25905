//! Decode command implementation.
//!
//! Runs the heart rate decoder on values given on the command line, without
//! connecting to anything.

use std::io::Write;

use anyhow::Result;
use vitals_types::decode::decode_heart_rate;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_decode_text};

pub fn cmd_decode(
    out: &mut dyn Write,
    packed_ibi: u16,
    status: i32,
    heart_rate: i32,
    format: OutputFormat,
    opts: &FormatOptions,
) -> Result<()> {
    let sample = decode_heart_rate(status, heart_rate, packed_ibi);
    let content = match format {
        OutputFormat::Json => opts.as_json(&sample)?,
        OutputFormat::Text => format_decode_text(&sample, opts),
    };
    out.write_all(content.as_bytes())?;
    Ok(())
}
