// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use assert_cmd::Command;
use flame::record::PaletteSource;
use flame::{FlameRecord, Fractal, RenderConfig};
use predicates::prelude::*;

fn flame() -> Command {
    Command::cargo_bin("flame").unwrap()
}

#[test]
fn renders_a_random_flame_to_png() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.png");
    flame()
        .args(&["-o", out.to_str().unwrap(), "-s", "40x30", "-n", "500", "-t", "1"])
        .assert()
        .success();
    let img = image::open(&out).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (40, 30));
}

#[test]
fn saved_record_reloads_with_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.png");
    let saved = dir.path().join("flame.json");
    flame()
        .args(&[
            "-o",
            out.to_str().unwrap(),
            "-s",
            "20x20",
            "-n",
            "100",
            "-p",
            "ocean",
            "-g",
            "3.5",
            "--seed",
            "17",
            "--save",
            saved.to_str().unwrap(),
        ])
        .assert()
        .success();

    let record = FlameRecord::load(&saved).unwrap();
    assert_eq!((record.config.width, record.config.height), (20, 20));
    assert_eq!(record.palette, PaletteSource::from("ocean"));
    assert_eq!(record.config.gamma, 3.5);

    let again = dir.path().join("again.png");
    flame()
        .args(&["-o", again.to_str().unwrap(), "-r", saved.to_str().unwrap()])
        .assert()
        .success();
    assert_eq!(
        std::fs::read(&out).unwrap(),
        std::fs::read(&again).unwrap()
    );
}

#[test]
fn bad_size_is_refused() {
    flame()
        .args(&["-o", "never.png", "-s", "wide"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not parse output image size"));
}

#[test]
fn unknown_palette_is_refused() {
    flame()
        .args(&["-o", "never.png", "-p", "plaid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("plaid"));
}

#[test]
fn broken_record_reports_and_exits() {
    let dir = tempfile::tempdir().unwrap();
    let record = dir.path().join("bad.json");
    let mut bad = FlameRecord::new(Fractal::new(), RenderConfig::default(), "fire");
    bad.config.width = 0;
    std::fs::write(&record, bad.to_json().unwrap()).unwrap();
    flame()
        .args(&[
            "-o",
            dir.path().join("out.png").to_str().unwrap(),
            "-r",
            record.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Render failure"));
}
