// Licensed under the Apache-2.0 license

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, LevelFilter};
use regmap_gen::{generate, GeneratorConfig, LayoutPolicy};
use simple_logger::SimpleLogger;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy {
    /// Refine access widths only for fields matching the register's base atom
    BaseAtom,
    /// Also refine for Array-flagged fields; emit const and volatile qualifiers
    ArrayFlag,
}

impl From<Policy> for LayoutPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::BaseAtom => LayoutPolicy::BaseAtom,
            Policy::ArrayFlag => LayoutPolicy::ArrayFlag,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "regmap-gen",
    author,
    version,
    about = "Generate a C header and assembler tables from a register map"
)]
struct Cli {
    /// Register map source
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Directory for the generated files (defaults to the input's directory)
    #[arg(short = 'o', long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Atom refinement and rendering policy
    #[arg(long, value_enum, default_value = "base-atom", env = "REGMAP_POLICY")]
    policy: Policy,

    /// Pad every bit-field layer up to the full register width
    #[arg(long)]
    pad_to_width: bool,

    /// Diagnostic verbosity
    #[arg(long, default_value = "info", env = "REGMAP_LOG")]
    log_level: LevelFilter,
}

/// `<dir>/<stem>.<extension>`, where `<dir>` is `output_dir` or the input's
/// own directory.
fn output_path(input: &Path, output_dir: Option<&Path>, extension: &str) -> PathBuf {
    match output_dir {
        Some(dir) => {
            let mut name = input
                .file_stem()
                .map(|stem| stem.to_os_string())
                .unwrap_or_else(|| OsString::from("regmap"));
            name.push(".");
            name.push(extension);
            dir.join(name)
        }
        None => input.with_extension(extension),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    SimpleLogger::new()
        .with_level(cli.log_level)
        .without_timestamps()
        .init()?;

    let source = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;

    let config = GeneratorConfig::new()
        .policy(cli.policy.into())
        .pad_to_width(cli.pad_to_width);
    let files = generate(&source, &config)
        .with_context(|| format!("Failed to process {}", cli.input.display()))?;

    let output_dir = cli.output_dir.as_deref();
    for (extension, contents) in [
        ("h", &files.c_header),
        ("inc", &files.offset_table),
        ("S", &files.symbol_resolver),
    ] {
        let path = output_path(&cli.input, output_dir, extension);
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
    }

    Ok(())
}
