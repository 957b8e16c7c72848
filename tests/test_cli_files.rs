//! File handling and command-line tests
//!
//! Runs the `upscale` binary offline against temporary files and checks the
//! file helpers it is built on.

mod common;

use std::process::Command;

use common::fixtures::{decode, gradient_png, solid_png};
use hd_upscaler::config::UpscaleConfig;
use hd_upscaler::error::ErrorKind;
use hd_upscaler::util::{read_image_file, write_output};
use hd_upscaler::{ScaleFactor, enhance_image};

fn upscale_cmd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_upscale"));
    cmd.env_remove("DEEPAI_API_KEY").env("RUST_LOG", "warn");
    cmd
}

#[test]
fn test_cli_offline_upscale_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    let output = dir.path().join("out.png");
    std::fs::write(&input, gradient_png(6, 5)).unwrap();

    let status = upscale_cmd()
        .arg(&input)
        .args(["--scale", "4", "--offline", "--output"])
        .arg(&output)
        .status()
        .unwrap();

    assert!(status.success());
    assert_eq!(decode(&std::fs::read(&output).unwrap()).dimensions(), (24, 20));
}

#[test]
fn test_cli_reads_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    let output = dir.path().join("from-config.png");
    let config = dir.path().join("upscale.toml");
    std::fs::write(&input, solid_png(2, 2, [1, 2, 3, 255])).unwrap();
    std::fs::write(
        &config,
        format!(
            concat!(
                "output = {:?}\nsharpen = false\nengine = \"simd\"\n",
                "[waifu2x]\nenabled = false\n[deepai]\nenabled = false\n",
            ),
            output.display().to_string()
        ),
    )
    .unwrap();

    let status = upscale_cmd()
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .status()
        .unwrap();

    assert!(status.success());
    assert_eq!(decode(&std::fs::read(&output).unwrap()).dimensions(), (4, 4));
}

#[test]
fn test_cli_rejects_bad_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    std::fs::write(&input, solid_png(2, 2, [0, 0, 0, 255])).unwrap();

    let bad_scale = upscale_cmd()
        .arg(&input)
        .args(["--scale", "3", "--offline"])
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert!(!bad_scale.success());

    let not_image = dir.path().join("notes.txt");
    std::fs::write(&not_image, "hello").unwrap();
    let bad_input = upscale_cmd()
        .arg(&not_image)
        .arg("--offline")
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert!(!bad_input.success());
    assert!(!dir.path().join("enhanced_hd.png").exists());
}

#[test]
fn test_read_image_file_limits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.png");
    let png = gradient_png(16, 16);
    std::fs::write(&path, &png).unwrap();

    assert_eq!(read_image_file(&path, png.len() as u64).unwrap(), png);

    let error = read_image_file(&path, png.len() as u64 - 1).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TooLarge);

    let error = read_image_file(&dir.path().join("missing.png"), 1024).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Io);
}

#[test]
fn test_write_output_into_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("out.png");
    let error = write_output(&path, b"bytes").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Io);
}

#[tokio::test]
async fn test_enhance_image_with_providers_disabled() {
    let mut config = UpscaleConfig::default();
    config.waifu2x.enabled = false;
    config.deepai.enabled = false;

    let result = enhance_image(
        &solid_png(3, 3, [200, 100, 50, 255]),
        ScaleFactor::policy(2).unwrap(),
        &config,
    )
    .await;

    assert!(result.is_fallback());
    assert_eq!(decode(result.image_bytes().unwrap()).dimensions(), (6, 6));
}
