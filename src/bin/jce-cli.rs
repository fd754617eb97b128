//! `jce-cli`: decodes a hex-encoded JCE payload and prints the raw
//! `field_id -> Value` mapping.
//!
//! Exit codes: 0 on success, 2 on a malformed hex argument, 1 on a decode
//! error.

use std::process::ExitCode;

use clap::Parser;
use jcewire::value::Value;
use jcewire::{decode_raw, FieldBag};

/// Decode a hex-encoded JCE payload and print its raw tag-indexed fields.
#[derive(Parser)]
#[command(name = "jce-cli", version, about = "Decode a hex JCE payload")]
struct Cli {
    /// The payload as a hex string, e.g. `16 04 72 63 6E 62`.
    encoded: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let bytes = match parse_hex(&cli.encoded) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error: invalid hex input: {e}");
            return ExitCode::from(2);
        }
    };

    match decode_raw(&bytes) {
        Ok(bag) => {
            print_bag(&bag);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("decode failed: {e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_bag(bag: &FieldBag) {
    println!("{{");
    for (field_id, value) in bag {
        println!("    {field_id}: {},", format_value(value));
    }
    println!("}}");
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Byte(b) => format!("{b}"),
        Value::Bool(b) => format!("{b}"),
        Value::Int(i) => format!("{i}"),
        Value::Float(f) => format!("{f}"),
        Value::Double(d) => format!("{d}"),
        Value::Str(s) => format!("{s:?}"),
        Value::Bytes(b) => format!("{b:?}"),
        Value::Map(entries) => {
            let rendered: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", format_value(k), format_value(v)))
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
        Value::List(items) => {
            let rendered: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", rendered.join(", "))
        }
        Value::Struct(fields) => {
            let rendered: Vec<String> = fields
                .iter()
                .map(|(id, v)| format!("{id}: {}", format_value(v)))
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
    }
}

/// Parses a hex string, tolerating whitespace between byte pairs (the
/// space-separated format is a common way to paste wire dumps).
fn parse_hex(s: &str) -> Result<Vec<u8>, String> {
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.len() % 2 != 0 {
        return Err("odd number of hex digits".to_string());
    }
    (0..cleaned.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&cleaned[i..i + 2], 16)
                .map_err(|e| format!("{e} at position {i}"))
        })
        .collect()
}
