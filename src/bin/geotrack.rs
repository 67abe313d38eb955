use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use geotrack_core::{annotate, convert, gpx, kml, logs};
use log::info;
use simplelog::LevelFilter;

/// Converts, merges and annotates GPX and KML/KMZ tracks.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// Log debug messages
    #[arg(short, long)]
    verbose: bool,

    /// Also write a rotating log file into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build described routes and annotated waypoints from a metadata file
    Annotate {
        #[arg(long, default_value = "./data.json")]
        data: PathBuf,
        #[arg(long, default_value = "./routes.gpx")]
        routes: PathBuf,
        #[arg(long, default_value = "./waypoints.gpx")]
        waypoints: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Convert between GPX and KML/KMZ, direction chosen by extension
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Document name of the produced KML
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Print what a GPX, KML or KMZ file holds
    Info { input: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Gpx,
    Kml,
}

fn format_of(path: &Path) -> Result<Format> {
    match path
        .extension()
        .and_then(OsStr::to_str)
        .map(|x| x.to_lowercase())
        .as_deref()
    {
        Some("gpx") => Ok(Format::Gpx),
        Some("kml") | Some("kmz") => Ok(Format::Kml),
        extension => bail!("Unknown extension: {:?}", extension),
    }
}

fn load_as_gpx(path: &Path) -> Result<gpx::Gpx> {
    Ok(match format_of(path)? {
        Format::Gpx => gpx::load(path)?,
        Format::Kml => convert::kml_to_gpx(&kml::load(path)?),
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logs::init(level, cli.log_dir.as_deref())?;

    match cli.command {
        Command::Annotate {
            data,
            routes,
            waypoints,
            output,
        } => {
            let metadata = annotate::Metadata::load(&data)?;
            let tracks = gpx::load(&routes)?;
            let waypoints = gpx::load(&waypoints)?;
            let out = annotate::annotate(&metadata, &tracks, &waypoints)?;
            out.save(&output)?;
            info!("wrote {:?}", output);
        }
        Command::Convert {
            input,
            output,
            name,
        } => {
            match (format_of(&input)?, format_of(&output)?) {
                (Format::Gpx, Format::Kml) => {
                    let name = if name.is_empty() {
                        input
                            .file_stem()
                            .and_then(OsStr::to_str)
                            .unwrap_or_default()
                            .to_owned()
                    } else {
                        name
                    };
                    convert::gpx_to_kml(&gpx::load(&input)?, &name).save(&output)?
                }
                (Format::Kml, Format::Gpx) => {
                    convert::kml_to_gpx(&kml::load(&input)?).save(&output)?
                }
                (Format::Gpx, Format::Gpx) => gpx::load(&input)?.save(&output)?,
                (Format::Kml, Format::Kml) => kml::load(&input)?.save(&output)?,
            }
            info!("wrote {:?}", output);
        }
        Command::Info { input } => {
            let data = load_as_gpx(&input)?;
            let line = convert::full_line(&data);
            println!("waypoints: {}", data.waypoints.len());
            println!("routes:    {}", data.routes.len());
            println!("tracks:    {}", data.tracks.len());
            println!("points:    {}", line.len());
            println!("length:    {:.2} km", line.length());
        }
    }
    Ok(())
}
