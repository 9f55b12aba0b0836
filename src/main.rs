//! dumprd - crash-dump initrd builder.
//!
//! Assembles a minimal initramfs containing exactly the programs, their
//! interpreters, and the shared libraries needed to save a memory dump
//! after a kernel crash, and lists previously saved dump directories.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dumprd::config::Config;
use dumprd::cpio::CpioArchive;
use dumprd::install::Installer;
use dumprd::listdir::{list_dir, FilterDumpDirs};
use dumprd::manifest;
use dumprd::path::canonicalize_under;

#[derive(Parser)]
#[command(name = "dumprd")]
#[command(about = "Crash-dump initrd builder")]
struct Cli {
    /// Print debugging output
    #[arg(short = 'D', long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble an initrd image from programs and support data
    Build {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Program to install with its interpreter/library closure (repeatable)
        #[arg(long = "program")]
        programs: Vec<PathBuf>,

        /// Support-data asset to install from the data directory (repeatable)
        #[arg(long = "data")]
        data: Vec<String>,

        /// Resolve program paths relative to this root directory
        #[arg(long, default_value = "/")]
        root: PathBuf,

        /// Write a JSON summary of the image contents to this file
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// List saved crash-dump directories (subdirectories holding a vmcore)
    Dumps {
        /// Directory to scan
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("dumprd=trace")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = Config::load();

    match cli.command {
        Commands::Build {
            output,
            programs,
            data,
            root,
            manifest,
        } => cmd_build(&config, output, &programs, &data, &root, manifest),
        Commands::Dumps { dir } => cmd_dumps(&dir),
    }
}

fn cmd_build(
    config: &Config,
    output: Option<PathBuf>,
    programs: &[PathBuf],
    data: &[String],
    root: &Path,
    manifest_path: Option<PathBuf>,
) -> Result<()> {
    let mut archive = CpioArchive::new();
    archive.add_directory("/bin", 0o755);

    {
        let mut installer = Installer::new(&mut archive)
            .with_reporter(&config.reporter)
            .with_data_dir(&config.data_dir);

        for program in programs {
            let source = canonicalize_under(program, root)
                .with_context(|| format!("cannot resolve {}", program.display()))?;
            eprintln!("Installing program {}", source.display());
            installer.install_program(&source, Path::new("/bin"))?;
        }

        for name in data {
            eprintln!("Installing data {name}");
            installer.install_data(name, Path::new("/"))?;
        }
    }

    let written = match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            let written = archive.write(&mut writer)?;
            writer.flush()?;
            eprintln!("Wrote {} ({} members, {written} bytes)", path.display(), archive.len());
            written
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            let written = archive.write(&mut writer)?;
            writer.flush()?;
            written
        }
    };
    tracing::debug!(members = archive.len(), bytes = written, "archive written");

    if let Some(path) = manifest_path {
        manifest::write_manifest(&path, &manifest::entries_for(&archive))?;
        eprintln!("Wrote manifest {}", path.display());
    }

    Ok(())
}

fn cmd_dumps(dir: &Path) -> Result<()> {
    let names = list_dir(dir, &FilterDumpDirs)
        .with_context(|| format!("cannot list {}", dir.display()))?;
    for name in names {
        println!("{name}");
    }
    Ok(())
}
