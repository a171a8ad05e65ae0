//! Command-line integration tests for the `hmtile` binary.
//!
//! These run the built binary against a small synthetic PNG written to a
//! temporary directory.

use image::{ImageBuffer, Luma};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

#[derive(Debug, Deserialize)]
struct ElevationOutput {
    x: f64,
    z: f64,
    meters: f64,
    mode: String,
}

#[derive(Debug, Deserialize)]
struct RegionOutput {
    lod: u8,
    width: u32,
    height: u32,
    min_meters: f64,
    max_meters: f64,
    mode: String,
}

#[derive(Debug, Deserialize)]
struct RegionSamples {
    width: u32,
    height: u32,
    meters: Vec<f32>,
}

fn run(args: &[&str]) -> Output {
    // CARGO_BIN_EXE_hmtile is set by cargo when running tests for this crate
    let binary = env!("CARGO_BIN_EXE_hmtile");
    Command::new(binary)
        .args(args)
        .output()
        .expect("Failed to execute hmtile")
}

fn run_ok(args: &[&str]) -> String {
    let output = run(args);
    if !output.status.success() {
        panic!(
            "hmtile {:?} failed:\nstdout: {}\nstderr: {}",
            args,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// 128x64 horizontal gradient.
fn write_gradient(dir: &Path) -> PathBuf {
    let path = dir.join("height.png");
    let image: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_fn(128, 64, |x, _| Luma([(x * 65535 / 127) as u16]));
    image.save(&path).expect("Failed to write PNG");
    path
}

fn build(dir: &TempDir) -> (PathBuf, PathBuf) {
    let png = write_gradient(dir.path());
    let tiles = dir.path().join("tiles");
    run_ok(&[
        "build",
        png.to_str().unwrap(),
        tiles.to_str().unwrap(),
        "--tile-size",
        "32",
        "--lod-levels",
        "3",
        "--min-tile-edge",
        "8",
    ]);
    (png, tiles)
}

#[test]
fn test_build_then_verify() {
    let dir = TempDir::new().unwrap();
    let (_, tiles) = build(&dir);

    assert!(tiles.join("tile_index.json").exists());
    assert!(tiles.join("lod2/tile_0_0.bin").exists());
    assert!(!tiles.join("tileset.json").exists());

    let stdout = run_ok(&["verify", tiles.to_str().unwrap()]);
    assert!(stdout.contains("OK: 11 tiles"), "{}", stdout);
}

#[test]
fn test_verify_reports_missing_tile() {
    let dir = TempDir::new().unwrap();
    let (_, tiles) = build(&dir);
    fs::remove_file(tiles.join("lod1/tile_1_0.bin")).unwrap();

    let output = run(&["verify", tiles.to_str().unwrap()]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("lod1/1_0"), "{}", stdout);
}

#[test]
fn test_build_from_yaml_config() {
    let dir = TempDir::new().unwrap();
    let png = write_gradient(dir.path());
    let tiles = dir.path().join("yaml_tiles");
    let config = dir.path().join("build.yaml");
    fs::write(
        &config,
        format!(
            "source: {}\noutput_dir: {}\ntile_size: 64\nlod_levels: 2\nmin_tile_edge: 8\n",
            png.display(),
            tiles.display()
        ),
    )
    .unwrap();

    run_ok(&["build", "--config", config.to_str().unwrap(), "--legacy"]);
    assert!(tiles.join("tileset.json").exists());
    assert!(tiles.join("tile_1_0.bin").exists());
    assert!(tiles.join("lod1/tile_0_0.bin").exists());
}

#[test]
fn test_elevation_json_matches_between_modes() {
    let dir = TempDir::new().unwrap();
    let (png, tiles) = build(&dir);

    let tiled: ElevationOutput = serde_json::from_str(&run_ok(&[
        "elevation",
        "40.5",
        "10",
        "--tiles",
        tiles.to_str().unwrap(),
        "--json",
    ]))
    .unwrap();
    let raw: ElevationOutput = serde_json::from_str(&run_ok(&[
        "elevation",
        "40.5",
        "10",
        "--raster",
        png.to_str().unwrap(),
        "--json",
    ]))
    .unwrap();

    assert_eq!((tiled.x, tiled.z), (40.5, 10.0));
    assert_eq!(tiled.mode, "tiled");
    assert_eq!(raw.mode, "raw");
    assert!((tiled.meters - raw.meters).abs() < 0.5, "{:?} vs {:?}", tiled, raw);
}

#[test]
fn test_elevation_out_of_bounds_fails() {
    let dir = TempDir::new().unwrap();
    let (_, tiles) = build(&dir);
    let output = run(&["elevation", "-5", "10", "--tiles", tiles.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("outside"));
}

#[test]
fn test_region_summary_and_samples() {
    let dir = TempDir::new().unwrap();
    let (_, tiles) = build(&dir);
    let samples_path = dir.path().join("region.json");

    let summary: RegionOutput = serde_json::from_str(&run_ok(&[
        "region",
        "0",
        "0",
        "127",
        "63",
        "--lod",
        "1",
        "--tiles",
        tiles.to_str().unwrap(),
        "--json",
        "--output",
        samples_path.to_str().unwrap(),
    ]))
    .unwrap();

    // LOD 1: 64-pixel spans resampled to 16 samples.
    assert_eq!(summary.lod, 1);
    assert_eq!((summary.width, summary.height), (32, 16));
    assert_eq!(summary.mode, "tiled");
    assert_eq!(summary.min_meters, -10994.0);
    assert_eq!(summary.max_meters, 8849.0);

    let samples: RegionSamples =
        serde_json::from_str(&fs::read_to_string(&samples_path).unwrap()).unwrap();
    assert_eq!((samples.width, samples.height), (32, 16));
    assert_eq!(samples.meters.len(), 32 * 16);

    let zoomed: RegionOutput = serde_json::from_str(&run_ok(&[
        "region",
        "0",
        "0",
        "127",
        "63",
        "--zoom",
        "20",
        "--tiles",
        tiles.to_str().unwrap(),
        "--json",
    ]))
    .unwrap();
    assert_eq!(zoomed.lod, 2);
}

#[test]
fn test_missing_source_arguments_fail() {
    let output = run(&["elevation", "1", "1"]);
    assert!(!output.status.success());
    let output = run(&["build"]);
    assert!(!output.status.success());
}
