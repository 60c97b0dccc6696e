//! Offline geometry tool for the laser turret.
//!
//! Subcommands:
//! - `aim`: Pan/tilt for a pixel at a given standoff
//! - `project`: Gimbal-base point for a pixel at a given standoff
//! - `unproject`: Pixel a gimbal-base point lands on
//! - `defaults`: Print the default turret configuration as JSON

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use shared::geometry::{compute_aim_angles, project_pixel, unproject_point, Point3};
use shared::mount_geometry::MountGeometry;
use tracing_subscriber::EnvFilter;
use turret::TurretConfig;

/// Laser turret aiming geometry tool
#[derive(Parser, Debug)]
#[command(name = "aim_tool")]
#[command(about = "Evaluate the turret's pixel-to-angle geometry without hardware")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct PixelArgs {
    /// Pixel column
    #[arg(long)]
    px: f64,

    /// Pixel row
    #[arg(long)]
    py: f64,

    /// Distance from camera to target plane in cm
    #[arg(short, long, default_value = "100.0")]
    standoff: f64,

    /// Turret config JSON (mount geometry is taken from it)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute pan/tilt angles for a pixel
    Aim(PixelArgs),

    /// Project a pixel into the gimbal-base frame
    Project(PixelArgs),

    /// Map a gimbal-base point back to a pixel
    Unproject {
        /// Along the boresight, cm
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        /// Horizontal, cm
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
        /// Vertical, cm
        #[arg(long, allow_negative_numbers = true)]
        z: f64,

        /// Turret config JSON (mount geometry is taken from it)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration
    Defaults,
}

fn load_mount(config: Option<&PathBuf>) -> Result<MountGeometry> {
    match config {
        Some(path) => {
            let config = TurretConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            Ok(config.mount)
        }
        None => Ok(MountGeometry::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    match args.command {
        Command::Aim(pixel) => {
            let mount = load_mount(pixel.config.as_ref())?;
            let aim = compute_aim_angles(pixel.px, pixel.py, pixel.standoff, &mount)
                .with_context(|| format!("No aim for pixel ({}, {})", pixel.px, pixel.py))?;
            println!("{aim}");
        }
        Command::Project(pixel) => {
            let mount = load_mount(pixel.config.as_ref())?;
            let point = project_pixel(pixel.px, pixel.py, pixel.standoff, &mount)
                .with_context(|| format!("Cannot project pixel ({}, {})", pixel.px, pixel.py))?;
            println!("x={:.3} y={:.3} z={:.3} cm", point.x, point.y, point.z);
        }
        Command::Unproject { x, y, z, config } => {
            let mount = load_mount(config.as_ref())?;
            let (px, py) = unproject_point(Point3::new(x, y, z), &mount)
                .context("Point cannot be mapped to a pixel")?;
            println!("px={px:.2} py={py:.2}");
        }
        Command::Defaults => {
            let json = serde_json::to_string_pretty(&TurretConfig::default())
                .context("Failed to serialize default config")?;
            println!("{json}");
        }
    }

    Ok(())
}
