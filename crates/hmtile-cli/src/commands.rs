//! Subcommand implementations.

use crate::{BuildArgs, CliError, SourceArgs};
use hmtile::{
    build_pyramid, BuildConfig, ElevationProvider, ProviderConfig, ProviderMode, TileIndex, WorldRect,
};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

type Result<T> = std::result::Result<T, CliError>;

#[derive(Serialize)]
struct ElevationOutput {
    x: f64,
    z: f64,
    meters: f64,
    mode: &'static str,
}

#[derive(Serialize)]
struct RegionOutput {
    lod: u8,
    width: u32,
    height: u32,
    bounds: WorldRect,
    min_meters: f64,
    max_meters: f64,
    mode: &'static str,
}

#[derive(Serialize)]
struct RegionSamples<'a> {
    lod: u8,
    width: u32,
    height: u32,
    bounds: WorldRect,
    meters: &'a [f32],
}

fn mode_name(mode: ProviderMode) -> &'static str {
    match mode {
        ProviderMode::Tiled => "tiled",
        ProviderMode::Raw => "raw",
    }
}

fn build_config(args: BuildArgs) -> Result<BuildConfig> {
    let mut config = match &args.config {
        Some(path) => BuildConfig::from_yaml_file(path)?,
        None => {
            let (Some(source), Some(output_dir)) = (&args.source, &args.output_dir) else {
                return Err(CliError::Usage(
                    "build needs <SOURCE> <OUTPUT_DIR> or --config".to_string(),
                ));
            };
            BuildConfig::new(source, output_dir)
        }
    };

    if let Some(source) = args.source {
        config.source = source;
    }
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(tile_size) = args.tile_size {
        config.tile_size = tile_size;
    }
    if let Some(lod_levels) = args.lod_levels {
        config.lod_levels = lod_levels;
    }
    if let Some(min_tile_edge) = args.min_tile_edge {
        config.min_tile_edge = min_tile_edge;
    }
    if args.legacy {
        config.emit_legacy = true;
    }
    Ok(config)
}

fn provider_config(args: &SourceArgs) -> Result<ProviderConfig> {
    let mut config = match &args.config {
        Some(path) => ProviderConfig::from_yaml_file(path)?,
        None => ProviderConfig::default(),
    };
    if let Some(tiles) = &args.tiles {
        config.tiles_dir = Some(tiles.clone());
    }
    if let Some(raster) = &args.raster {
        config.raster = Some(raster.clone());
    }
    if config.tiles_dir.is_none() && config.raster.is_none() {
        return Err(CliError::Usage("pass --tiles, --raster or --config".to_string()));
    }
    Ok(config)
}

/// `hmtile build`
pub fn build(args: BuildArgs) -> Result<()> {
    let config = build_config(args)?;
    let report = build_pyramid(&config)?;
    for (lod, count) in report.tiles_per_lod.iter().enumerate() {
        println!(
            "lod {}: {} tiles, edge {}",
            lod,
            count,
            report.layout.tile_edge(lod as u8)
        );
    }
    println!(
        "{} tiles, {:.1} MB written to {} in {:.2}s",
        report.total_tiles() + report.legacy_tiles,
        report.total_bytes as f64 / (1024.0 * 1024.0),
        report.output_dir.display(),
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

/// `hmtile verify`
pub fn verify(tiles_dir: &Path) -> Result<()> {
    let index = TileIndex::load(tiles_dir)?;
    let problems = index.validate();
    for problem in &problems {
        warn!("{}", problem);
        println!("{}", problem);
    }
    if !problems.is_empty() {
        return Err(CliError::Verify(problems.len()));
    }

    for lod in 0..index.lod_levels() {
        let (gx, gy) = index.effective_grid(lod);
        println!(
            "lod {}: {}x{} tiles, {:.1} source px per sample",
            lod,
            gx,
            gy,
            index.lod_spacing(lod)
        );
    }
    println!("OK: {} tiles", index.len());
    Ok(())
}

/// `hmtile elevation`
pub fn elevation(x: f64, z: f64, source: &SourceArgs) -> Result<()> {
    let provider = ElevationProvider::open(&provider_config(source)?)?;
    let meters = provider.get_elevation(x, z)?;
    let mode = mode_name(provider.mode());

    if source.json {
        let output = ElevationOutput { x, z, meters, mode };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{:.2} m ({})", meters, mode);
    }
    Ok(())
}

/// `hmtile region`
pub fn region(
    rect: WorldRect,
    lod: Option<u8>,
    zoom: Option<f64>,
    output: Option<&Path>,
    source: &SourceArgs,
) -> Result<()> {
    let provider = ElevationProvider::open(&provider_config(source)?)?;
    let grid = match (lod, zoom) {
        (_, Some(zoom)) => provider.extract_region_lod(rect, zoom)?,
        (lod, None) => provider.extract_region(rect, lod.unwrap_or(0))?,
    };
    let (min_meters, max_meters) = grid.meter_range();

    if let Some(path) = output {
        let meters = grid.to_meters();
        let samples = RegionSamples {
            lod: grid.lod,
            width: grid.width,
            height: grid.height,
            bounds: grid.bounds,
            meters: &meters,
        };
        fs::write(path, serde_json::to_string(&samples)?)?;
        info!("Wrote {} samples to {}", meters.len(), path.display());
    }

    let summary = RegionOutput {
        lod: grid.lod,
        width: grid.width,
        height: grid.height,
        bounds: grid.bounds,
        min_meters,
        max_meters,
        mode: mode_name(provider.mode()),
    };
    if source.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!(
            "lod {}: {}x{} samples, {:.2} to {:.2} m ({})",
            summary.lod, summary.width, summary.height, min_meters, max_meters, summary.mode
        );
    }
    Ok(())
}
