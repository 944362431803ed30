//! Command-line converter
//!
//! ```text
//! bambu2prusa input.3mf                  # writes <default dir>/input_prusa.3mf
//! bambu2prusa input.3mf output.3mf
//! bambu2prusa -v --summary input.3mf output.3mf
//! ```
//!
//! Without an explicit output the file goes to the remembered output
//! directory, a detected cloud storage folder, or next to the input, in
//! that order.

#![forbid(unsafe_code)]

use anyhow::bail;
use bambu2prusa::frontend::{SettingKey, SettingsStore, detect_cloud_storage_root, first_existing_dir};
use bambu2prusa::{Converter, model_documents};
use clap::Parser;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Suffix appended to the input stem when no output path is given
const OUTPUT_SUFFIX: &str = "_prusa";

/// Convert Bambu Studio 3mf files to PrusaSlicer compatible 3mf files
#[derive(Parser, Debug)]
#[command(name = "bambu2prusa", version, long_about = None)]
struct Args {
    /// Bambu Studio .3mf input file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output .3mf file [default: <dir>/<input>_prusa.3mf]
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Do not store the input and output directories for next time
    #[arg(long)]
    no_remember: bool,

    /// Print object and build item counts of the converted model parts
    #[arg(long)]
    summary: bool,

    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn run(args: Args) -> anyhow::Result<()> {
    if !args.input.is_file() {
        bail!("Input file not found: {}", args.input.display());
    }
    if !has_3mf_extension(&args.input) {
        bail!("Input file must be a .3mf file: {}", args.input.display());
    }
    if let Some(output) = &args.output {
        if !has_3mf_extension(output) {
            bail!("Output file must have .3mf extension: {}", output.display());
        }
    }

    let mut settings = match SettingsStore::open_default() {
        Ok(store) => Some(store),
        Err(err) => {
            warn!("{}", err);
            None
        }
    };

    let output = match args.output {
        Some(output) => output,
        None => default_output_path(&args.input, settings.as_ref()),
    };

    let summary = Converter::new().convert_file(&args.input, &output)?;
    println!("Success! Created {}", output.display());

    if args.summary {
        println!(
            "{} entries, {} model parts rewritten, {} attributes stripped, {} transforms added",
            summary.parts,
            summary.model_parts,
            summary.stats.attributes_stripped,
            summary.stats.transforms_added
        );
        for (part, doc) in model_documents(BufReader::new(File::open(&output)?))? {
            println!(
                "  {}: {} objects, {} build items, {} triangles",
                part,
                doc.objects.len(),
                doc.build_items.len(),
                doc.triangle_count()
            );
        }
    }

    if !args.no_remember {
        if let Some(store) = settings.as_mut() {
            remember_directories(store, &args.input, &output);
        }
    }

    Ok(())
}

fn has_3mf_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("3mf"))
}

fn default_output_path(input: &Path, settings: Option<&SettingsStore>) -> PathBuf {
    let remembered = settings
        .map(|s| s.get(SettingKey::LastOutputDir))
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from);
    let input_dir = input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let dir = first_existing_dir(
        remembered
            .into_iter()
            .chain(detect_cloud_storage_root())
            .chain(std::iter::once(input_dir.clone())),
    )
    .unwrap_or(input_dir);

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    dir.join(format!("{stem}{OUTPUT_SUFFIX}.3mf"))
}

fn remember_directories(store: &mut SettingsStore, input: &Path, output: &Path) {
    let dir_of = |path: &Path| {
        path.canonicalize()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .map(|p| p.display().to_string())
    };

    if let Some(dir) = dir_of(input) {
        store.set(SettingKey::LastInputDir, dir);
    }
    if let Some(dir) = dir_of(output) {
        store.set(SettingKey::LastOutputDir, dir);
    }
    if let Err(err) = store.save() {
        warn!("{}", err);
    }
}
