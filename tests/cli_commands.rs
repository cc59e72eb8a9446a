//! CLI integration tests for spritecal commands.
//!
//! Runs the built binary against generated fixture images and checks exit
//! codes plus text and JSON output.

use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Get the path to the spritecal binary.
fn spritecal_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_spritecal"))
}

/// Run spritecal with the given arguments and return (stdout, stderr, exit code).
///
/// Runs inside `dir` so no spritecal.toml from the surrounding tree is picked up.
fn run(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(spritecal_binary())
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", dir)
        .args(args)
        .output()
        .expect("Failed to execute spritecal");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code().unwrap_or(-1))
}

fn write_step(dir: &Path, name: &str, edge_x: u32) -> String {
    let img = RgbaImage::from_fn(24, 24, |x, _| if x < edge_x { BLACK } else { WHITE });
    let path = dir.join(name);
    img.save(&path).expect("should write fixture");
    path.display().to_string()
}

// ============================================================================
// align
// ============================================================================

#[test]
fn test_align_recovers_shift_json() {
    let temp = TempDir::new().expect("should create temp dir");
    let reference = write_step(temp.path(), "ref.png", 10);
    let target = write_step(temp.path(), "target.png", 11);

    let (stdout, stderr, code) = run(
        temp.path(),
        &[
            "align", &reference, &target, "--x", "10", "--y", "10", "--roi", "5x5", "--radius", "1",
            "--threshold", "100", "--json",
        ],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["result"]["offset"]["dx"], 1);
    assert_eq!(json["result"]["offset"]["dy"], 0);
    let score = json["result"]["score"].as_f64().expect("score");
    assert!((score - 1.0).abs() < 1e-6);
}

#[test]
fn test_align_requires_center_or_all_frames() {
    let temp = TempDir::new().expect("should create temp dir");
    let reference = write_step(temp.path(), "ref.png", 10);

    let (_, stderr, code) = run(temp.path(), &["align", &reference, &reference]);
    assert_eq!(code, 2);
    assert!(stderr.contains("--all-frames"));
}

#[test]
fn test_align_out_of_bounds_center_fails() {
    let temp = TempDir::new().expect("should create temp dir");
    let reference = write_step(temp.path(), "ref.png", 10);

    let (stdout, _, code) =
        run(temp.path(), &["align", &reference, &reference, "--x", "500", "--y", "500"]);
    assert_eq!(code, 1);
    assert!(stdout.contains("No comparable region"));
}

#[test]
fn test_align_all_frames_updates_state() {
    let temp = TempDir::new().expect("should create temp dir");
    let reference = write_step(temp.path(), "ref.png", 10);
    let state_path = temp.path().join("state.json");
    let layout = r#"{"rows":1,"cols":1,"frameWidth":20,"frameHeight":20,
        "boxes":[{"frameIndex":0,"x":0,"y":0,"width":20,"height":20}]}"#;
    let layout_path = temp.path().join("layout.json");
    std::fs::write(&layout_path, layout).expect("should write layout");

    // Same sheet: every frame aligns at (0, 0) so nothing is applied
    let (stdout, stderr, code) = run(
        temp.path(),
        &[
            "align",
            &reference,
            &reference,
            "--all-frames",
            "--layout",
            layout_path.to_str().unwrap(),
            "--roi",
            "5x5",
            "--radius",
            "1",
            "--threshold",
            "100",
            "--json",
        ],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    let frames = json["frames"].as_array().expect("frames array");
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["result"]["offset"]["dx"], 0);

    // With --state the (default 3x3) state is loaded and written back
    let (_, stderr, code) = run(
        temp.path(),
        &["align", &reference, &reference, "--all-frames", "--state", state_path.to_str().unwrap()],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(state_path.exists());
}

#[test]
fn test_align_defaults_target_to_configured_atlas() {
    let temp = TempDir::new().expect("should create temp dir");
    let reference = write_step(temp.path(), "base.png", 10);
    write_step(temp.path(), "patch.png", 11);
    std::fs::write(
        temp.path().join("spritecal.toml"),
        "[sheet]\nbase = \"base.png\"\noverride = \"patch.png\"\noverride_enabled = true\n",
    )
    .expect("should write");

    let (stdout, stderr, code) = run(
        temp.path(),
        &[
            "align", &reference, "--x", "10", "--y", "10", "--roi", "5x5", "--radius", "1", "--threshold",
            "100", "--json",
        ],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["result"]["offset"]["dx"], 1);
    assert_eq!(json["result"]["offset"]["dy"], 0);
}

// ============================================================================
// inspect
// ============================================================================

#[test]
fn test_inspect_reports_step_magnitude() {
    let temp = TempDir::new().expect("should create temp dir");
    let image = write_step(temp.path(), "step.png", 10);

    let (stdout, stderr, code) = run(
        temp.path(),
        &["inspect", &image, "--x", "10", "--y", "10", "--roi", "5x5", "--threshold", "500", "--json"],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["stats"]["max_magnitude"], 1020.0);
    assert_eq!(json["stats"]["edge_pixels"], 10);
}

// ============================================================================
// compose
// ============================================================================

#[test]
fn test_compose_writes_patched_sheet() {
    let temp = TempDir::new().expect("should create temp dir");
    let base = RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255]));
    let mut overlay = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]));
    overlay.put_pixel(6, 6, Rgba([0, 0, 255, 255]));
    base.save(temp.path().join("base.png")).expect("should write");
    overlay.save(temp.path().join("overlay.png")).expect("should write");
    let layout = r#"{"rows":2,"cols":2,"frameWidth":4,"frameHeight":4,"boxes":[]}"#;
    std::fs::write(temp.path().join("layout.json"), layout).expect("should write");

    let (stdout, stderr, code) = run(
        temp.path(),
        &["compose", "base.png", "overlay.png", "-o", "out.png", "--layout", "layout.json", "--json"],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["patched_frames"], serde_json::json!([3]));

    let out = image::open(temp.path().join("out.png")).expect("output exists").to_rgba8();
    assert_eq!(*out.get_pixel(6, 6), Rgba([0, 0, 255, 255]));
    assert_eq!(*out.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
}

fn write_sheet_config(dir: &Path, override_enabled: bool) {
    let base = RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255]));
    let mut patch = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]));
    patch.put_pixel(6, 6, Rgba([0, 0, 255, 255]));
    base.save(dir.join("base.png")).expect("should write");
    patch.save(dir.join("patch.png")).expect("should write");
    let layout = r#"{"rows":2,"cols":2,"frameWidth":4,"frameHeight":4,"boxes":[]}"#;
    std::fs::write(dir.join("layout.json"), layout).expect("should write");
    let toml = format!(
        "[sheet]\nbase = \"base.png\"\noverride = \"patch.png\"\noverride_enabled = {}\nlayout = \"layout.json\"\n",
        override_enabled
    );
    std::fs::write(dir.join("spritecal.toml"), toml).expect("should write");
}

#[test]
fn test_compose_from_config_applies_override() {
    let temp = TempDir::new().expect("should create temp dir");
    write_sheet_config(temp.path(), true);

    let (stdout, stderr, code) = run(temp.path(), &["compose", "-o", "out.png", "--json"]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert!(json["override"].as_str().expect("override applied").ends_with("patch.png"));
    assert!(json["base"].as_str().expect("base source").ends_with("base.png"));
    assert_eq!(json["patched_frames"], serde_json::json!([3]));

    let out = image::open(temp.path().join("out.png")).expect("output exists").to_rgba8();
    assert_eq!(*out.get_pixel(6, 6), Rgba([0, 0, 255, 255]));
    assert_eq!(*out.get_pixel(1, 1), Rgba([255, 0, 0, 255]));
}

#[test]
fn test_compose_from_config_disabled_override_keeps_base() {
    let temp = TempDir::new().expect("should create temp dir");
    write_sheet_config(temp.path(), false);

    let (stdout, stderr, code) = run(temp.path(), &["compose", "-o", "out.png", "--json"]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert!(json["override"].is_null());

    let out = image::open(temp.path().join("out.png")).expect("output exists").to_rgba8();
    assert_eq!(*out.get_pixel(6, 6), Rgba([255, 0, 0, 255]));
}

#[test]
fn test_compose_without_sheets_writes_builtin() {
    let temp = TempDir::new().expect("should create temp dir");
    let (stdout, stderr, code) = run(temp.path(), &["compose", "-o", "out.png", "--json"]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["size"], serde_json::json!([288, 288]));
    assert_eq!(json["base"], "built-in 288x288");
}

#[test]
fn test_compose_size_mismatch_fails() {
    let temp = TempDir::new().expect("should create temp dir");
    RgbaImage::new(8, 8).save(temp.path().join("base.png")).expect("should write");
    RgbaImage::new(4, 8).save(temp.path().join("overlay.png")).expect("should write");

    let (_, stderr, code) =
        run(temp.path(), &["compose", "base.png", "overlay.png", "-o", "out.png"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("does not match"));
}

// ============================================================================
// frames / validate / endpoint
// ============================================================================

#[test]
fn test_frames_default_grid() {
    let temp = TempDir::new().expect("should create temp dir");
    let (stdout, _, code) = run(temp.path(), &["frames", "--json"]);
    assert_eq!(code, 0);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["frame_size"], serde_json::json!([96, 96]));
    assert_eq!(json["columns"], 3);
    assert_eq!(json["frames"].as_array().unwrap().len(), 9);
}

#[test]
fn test_frames_uses_config_layout() {
    let temp = TempDir::new().expect("should create temp dir");
    let layout = r#"{"rows":1,"cols":2,"frameWidth":96,"frameHeight":96,
        "boxes":[{"frameIndex":0,"x":0,"y":6,"width":96,"height":96},
                 {"frameIndex":1,"x":96,"y":0,"width":96,"height":96}]}"#;
    std::fs::write(temp.path().join("avatar.json"), layout).expect("should write");
    std::fs::write(temp.path().join("spritecal.toml"), "[sheet]\nlayout = \"avatar.json\"\n")
        .expect("should write");

    let (stdout, stderr, code) = run(temp.path(), &["frames", "--json"]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["columns"], 2);
    assert_eq!(json["frames"][0]["relative_y"], 6);
    assert_eq!(json["frames"][1]["relative_y"], 0);
}

#[test]
fn test_frames_state_with_out_of_grid_index() {
    let temp = TempDir::new().expect("should create temp dir");
    let state = r#"{"selectedBox":null,
        "boxes":[{"index":3000000000,"x":0.0,"y":6.0,"width":96.0,"height":96.0},
                 {"index":4,"x":96.0,"y":100.0,"width":96.0,"height":96.0}]}"#;
    std::fs::write(temp.path().join("state.json"), state).expect("should write");

    let (stdout, stderr, code) = run(temp.path(), &["frames", "--state", "state.json", "--json"]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    let frames = json["frames"].as_array().expect("frames array");
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["index"], 4);
    assert_eq!(frames[0]["relative_y"], 4);
    assert_eq!(frames[1]["index"], 3_000_000_000u64);
    assert!(frames[1]["relative_y"].is_null());
}

#[test]
fn test_validate_rejects_oversized_layout() {
    let temp = TempDir::new().expect("should create temp dir");
    let huge = r#"{"rows":1,"cols":70000,"frameWidth":70000,"frameHeight":96,"boxes":[]}"#;
    std::fs::write(temp.path().join("huge.json"), huge).expect("should write");

    let (stdout, _, code) = run(temp.path(), &["validate", "huge.json", "--json"]);
    assert_eq!(code, 1);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert!(json["errors"].as_array().unwrap().iter().any(|e| e.as_str().unwrap().contains("exceeds")));
}

#[test]
fn test_validate_reports_problems() {
    let temp = TempDir::new().expect("should create temp dir");
    let bad = r#"{"rows":1,"cols":2,"frameWidth":8,"frameHeight":8,
        "boxes":[{"frameIndex":0,"x":0,"y":0,"width":8,"height":8},
                 {"frameIndex":0,"x":8,"y":0,"width":8,"height":8}]}"#;
    std::fs::write(temp.path().join("bad.json"), bad).expect("should write");
    std::fs::write(temp.path().join("broken.json"), "{").expect("should write");

    let (stdout, _, code) = run(temp.path(), &["validate", "bad.json", "--json"]);
    assert_eq!(code, 1);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["valid"], false);
    assert!(json["errors"].as_array().unwrap().iter().any(|e| e.as_str().unwrap().contains("duplicate")));

    let (stdout, _, code) = run(temp.path(), &["validate", "broken.json"]);
    assert_eq!(code, 1);
    assert!(stdout.contains("1 problem"));
}

#[test]
fn test_endpoint_normalization() {
    let temp = TempDir::new().expect("should create temp dir");
    let (stdout, _, code) = run(temp.path(), &["endpoint", "ｌｏｃａｌｈｏｓｔ：１１４３４"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "http://localhost:11434/");

    let (_, stderr, code) = run(temp.path(), &["endpoint", "localhost"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("URL must include scheme, host and port"));
}
