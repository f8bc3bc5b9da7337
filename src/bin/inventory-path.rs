// Copyright (c) 2025 - Cowboy AI, Inc.
//! Inventory Path Tool
//!
//! Normalizes inventory paths from the command line. Absolute paths are
//! parsed as given; relative paths are resolved against `--origin`.
//!
//! ```text
//! inventory-path [--origin PATH] [--expect TAG] [--relative-to PATH] PATH...
//! ```
//!
//! For every input one line is printed: the canonical form, or the path
//! relative to `--relative-to` when given. Inputs that fail to parse are
//! reported on stderr and make the tool exit non-zero.
//!
//! Run with: cargo run --bin inventory-path -- --origin /t;acme/e;prod r;web01
//!
//! Log output is controlled by `RUST_LOG` (default: info).

use anyhow::{bail, Context, Result};
use cim_inventory::path::{CanonicalPath, ParseContext, SegmentType};
use tracing::{debug, warn};

/// Parsed command line
#[derive(Debug, Default)]
struct Options {
    /// Origin relative inputs are resolved against
    origin: Option<CanonicalPath>,
    /// Type of bare ids
    expect: Option<SegmentType>,
    /// Print results relative to this path
    relative_to: Option<CanonicalPath>,
    inputs: Vec<String>,
}

impl Options {
    fn from_args(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Options::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--origin" => {
                    let raw = args.next().context("--origin needs a path")?;
                    options.origin = Some(
                        CanonicalPath::parse(&raw).with_context(|| format!("invalid origin {raw}"))?,
                    );
                }
                "--relative-to" => {
                    let raw = args.next().context("--relative-to needs a path")?;
                    options.relative_to = Some(
                        CanonicalPath::parse(&raw)
                            .with_context(|| format!("invalid --relative-to {raw}"))?,
                    );
                }
                "--expect" => {
                    let tag = args.next().context("--expect needs a segment tag")?;
                    options.expect = Some(SegmentType::from_tag(&tag)?);
                }
                flag if flag.starts_with("--") => bail!("unknown option {flag}"),
                _ => options.inputs.push(arg),
            }
        }
        if options.inputs.is_empty() {
            bail!("usage: inventory-path [--origin PATH] [--expect TAG] [--relative-to PATH] PATH...");
        }
        Ok(options)
    }

    fn context(&self) -> ParseContext {
        ParseContext {
            origin: self.origin.clone(),
            target_type: self.expect,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let options = Options::from_args(std::env::args().skip(1))?;
    let context = options.context();
    debug!(?options, "Normalizing paths");

    let mut failures = 0usize;
    for input in &options.inputs {
        match CanonicalPath::parse_in(input, &context) {
            Ok(path) => match &options.relative_to {
                Some(base) => println!("{}", path.relative_to(base)),
                None => println!("{path}"),
            },
            Err(err) => {
                warn!(input = %input, error = %err, "Path rejected");
                eprintln!("{input}: {err}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} paths rejected", options.inputs.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_options_parse_flags_and_inputs() {
        let options =
            Options::from_args(args(&["--origin", "/t;acme", "--expect", "e", "prod"])).unwrap();
        assert_eq!(options.origin, Some(CanonicalPath::tenant("acme")));
        assert_eq!(options.expect, Some(SegmentType::Environment));
        assert_eq!(options.inputs, vec!["prod".to_string()]);

        let resolved = CanonicalPath::parse_in("prod", &options.context()).unwrap();
        assert_eq!(resolved.to_string(), "/t;acme/e;prod");
    }

    #[test]
    fn test_options_reject_missing_inputs_and_unknown_flags() {
        assert!(Options::from_args(args(&["--origin", "/t;acme"])).is_err());
        assert!(Options::from_args(args(&["--verbose", "/t;acme"])).is_err());
        assert!(Options::from_args(args(&["--origin"])).is_err());
    }
}
