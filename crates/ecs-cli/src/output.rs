//! Output formatting helpers.

use std::io::{self, Write};

use anyhow::Result;
use colored::Colorize;

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a response body: pretty JSON when it parses, raw bytes otherwise.
pub fn body(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Ok(());
    }

    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(value) => {
            let json = serde_json::to_string_pretty(&value)?;
            println!("{}", json);
        }
        Err(_) => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes)?;
            if !bytes.ends_with(b"\n") {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}
