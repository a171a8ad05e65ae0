//! Example: Query elevation from a built tile pyramid.
//!
//! Usage: cargo run --example query_elevation -- <x> <z> [tiles_dir]

use hmtile::{ElevationProvider, ProviderConfig, WorldRect};
use std::env;
use std::process;
use std::time::Instant;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <x> <z> [tiles_dir]", args[0]);
        eprintln!("Example: {} 1024 2048 ./tiles", args[0]);
        process::exit(1);
    }

    let x: f64 = args[1].parse().expect("Invalid x");
    let z: f64 = args[2].parse().expect("Invalid z");
    let tiles_dir = args.get(3).map(|s| s.as_str()).unwrap_or("tiles");

    println!("Opening tile pyramid in {}...", tiles_dir);
    let start = Instant::now();
    let provider = match ElevationProvider::open(&ProviderConfig::with_tiles(tiles_dir)) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    let layout = provider.layout();
    println!(
        "Opened {}x{} source, {} LODs in {:.3}s",
        layout.source_width,
        layout.source_height,
        layout.lod_levels,
        start.elapsed().as_secs_f64()
    );

    println!("\nQuerying elevation at ({}, {})...", x, z);
    let query_start = Instant::now();
    match provider.get_elevation(x, z) {
        Ok(elevation) => {
            println!("Elevation: {:.2} meters (loaded in {:.4}s)", elevation, query_start.elapsed().as_secs_f64());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }

    // Second query hits the cache
    let query_start = Instant::now();
    if let Ok(elevation) = provider.get_elevation(x + 0.5, z + 0.5) {
        println!("Elevation nearby: {:.2} meters (cached: {:.6}s)", elevation, query_start.elapsed().as_secs_f64());
    }

    let rect = WorldRect::around(x, z, 256.0);
    for zoom in [1.0, 4.0, 16.0] {
        match provider.extract_region_lod(rect, zoom) {
            Ok(grid) => {
                let (low, high) = grid.meter_range();
                println!(
                    "zoom {:>4}: lod {} {}x{} samples, {:.1} to {:.1} m",
                    zoom, grid.lod, grid.width, grid.height, low, high
                );
            }
            Err(e) => println!("zoom {:>4}: {}", zoom, e),
        }
    }
}
