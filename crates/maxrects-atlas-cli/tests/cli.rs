use image::{Rgba, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "maxrects-atlas-{}-{}",
        name,
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_maxrects-atlas"))
        .args(args)
        .output()
        .unwrap()
}

fn layout_with_config(dir: &Path, yaml: &str) -> Output {
    let sizes = dir.join("sizes.yaml");
    fs::write(&sizes, "- { key: a, w: 10, h: 10 }\n- { key: b, w: 20, h: 6 }\n").unwrap();
    let config = dir.join("atlas.yaml");
    fs::write(&config, yaml).unwrap();
    run(&[
        "-q",
        "layout",
        sizes.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ])
}

#[test]
fn config_heuristic_is_applied() {
    let dir = scratch_dir("config-ok");
    let out = layout_with_config(&dir, "heuristic: bssf\nallow_flip: true\n");
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["meta"]["heuristic"], "bestshortsidefit");
    assert_eq!(json["frames"].as_array().unwrap().len(), 2);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn unknown_config_heuristic_is_an_error() {
    let dir = scratch_dir("config-bad");
    let out = layout_with_config(&dir, "heuristic: skyline\n");
    assert!(!out.status.success());
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("unknown heuristic: skyline"), "{}", stderr);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn grow_writes_one_texture_per_subdirectory() {
    let dir = scratch_dir("grow-tags");
    let input = dir.join("sprites");
    fs::create_dir_all(input.join("ui")).unwrap();
    RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255]))
        .save(input.join("loose.png"))
        .unwrap();
    RgbaImage::from_pixel(6, 4, Rgba([0, 0, 255, 255]))
        .save(input.join("ui").join("button.png"))
        .unwrap();
    let out_dir = dir.join("out");

    let out = run(&[
        "-q",
        "--progress",
        "false",
        "grow",
        input.to_str().unwrap(),
        "-o",
        out_dir.to_str().unwrap(),
        "--initial-size",
        "256",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("[main] entries=1 size=256"), "{}", stdout);
    assert!(stdout.contains("[ui] entries=1 size=256"), "{}", stdout);

    let main = image::open(out_dir.join("runtime.png")).unwrap().to_rgba8();
    assert_eq!(main.dimensions(), (256, 256));
    assert_eq!(*main.get_pixel(2, 2), Rgba([255, 0, 0, 255]));
    let ui = image::open(out_dir.join("runtime_ui.png")).unwrap().to_rgba8();
    assert_eq!(*ui.get_pixel(2, 2), Rgba([0, 0, 255, 255]));
    let _ = fs::remove_dir_all(&dir);
}
