// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::{App, Arg, ArgMatches};
use env_logger::Env;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::str::FromStr;

use flame::palette::BUILTIN_NAMES;
use flame::record::PaletteSource;
use flame::{FlameRecord, Fractal, RenderConfig, Renderer};

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const RECORD: &str = "record";
const SEED: &str = "seed";
const FRAMES: &str = "frames";
const THREADS: &str = "threads";
const POINTS: &str = "points";
const GAMMA: &str = "gamma";
const PALETTE: &str = "palette";
const SAVE: &str = "save";
const VERBOSE: &str = "verbose";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("flame")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Fractal flame renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output PNG file"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .validator(|s| validate_pair::<u32>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image, e.g. 800x600 [default: 512x512]"),
        )
        .arg(
            Arg::with_name(RECORD)
                .long(RECORD)
                .short("r")
                .takes_value(true)
                .help("Flame record (JSON) to render; a random flame is generated without one"),
        )
        .arg(
            Arg::with_name(SEED)
                .long(SEED)
                .takes_value(true)
                .default_value("1")
                .validator(|s| {
                    u64::from_str(&s)
                        .map(|_| ())
                        .map_err(|_| "Could not parse seed".to_string())
                })
                .help("Seed for the random flame generator"),
        )
        .arg(
            Arg::with_name(FRAMES)
                .long(FRAMES)
                .short("f")
                .takes_value(true)
                .default_value("1")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        10_000,
                        "Could not parse frame count",
                        "Frame count must be between 1 and 10000",
                    )
                })
                .help("Frames to accumulate before writing the image"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Number of threads to use [default: one per CPU]"),
        )
        .arg(
            Arg::with_name(POINTS)
                .long(POINTS)
                .short("n")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        10_000_000,
                        "Could not parse point count",
                        "Point count must be between 1 and 10000000",
                    )
                })
                .help("Random walks per frame [default: 20000]"),
        )
        .arg(
            Arg::with_name(GAMMA)
                .long(GAMMA)
                .short("g")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        0.1f32,
                        10.0,
                        "Could not parse gamma",
                        "Gamma must be between 0.1 and 10",
                    )
                })
                .help("Tone-mapping gamma [default: 2.2]"),
        )
        .arg(
            Arg::with_name(PALETTE)
                .long(PALETTE)
                .short("p")
                .takes_value(true)
                .possible_values(&BUILTIN_NAMES)
                .help("Built-in palette [default: fire]"),
        )
        .arg(
            Arg::with_name(SAVE)
                .long(SAVE)
                .takes_value(true)
                .help("Also write the flame record, with any overrides, to this file"),
        )
        .arg(
            Arg::with_name(VERBOSE)
                .long(VERBOSE)
                .short("v")
                .multiple(true)
                .help("More logging; repeat for more"),
        )
        .get_matches()
}

fn record_from(matches: &ArgMatches) -> flame::Result<FlameRecord> {
    let mut record = match matches.value_of(RECORD) {
        Some(path) => FlameRecord::load(path)?,
        None => {
            let seed = u64::from_str(matches.value_of(SEED).unwrap_or("1")).unwrap_or(1);
            let mut rng = StdRng::seed_from_u64(seed);
            FlameRecord::new(Fractal::random(&mut rng), RenderConfig::default(), "fire")
        }
    };

    if let Some((width, height)) = matches.value_of(SIZE).and_then(|s| parse_pair(s, 'x')) {
        record.config.width = width;
        record.config.height = height;
    }
    if let Some(threads) = matches.value_of(THREADS).and_then(|s| usize::from_str(s).ok()) {
        record.config.threads = threads;
    }
    if let Some(points) = matches.value_of(POINTS).and_then(|s| u32::from_str(s).ok()) {
        record.config.num_points = points;
    }
    if let Some(gamma) = matches.value_of(GAMMA).and_then(|s| f32::from_str(s).ok()) {
        record.config.gamma = gamma;
    }
    if let Some(palette) = matches.value_of(PALETTE) {
        record.palette = PaletteSource::from(palette);
    }
    record.validate()?;
    Ok(record)
}

fn run(matches: &ArgMatches) -> flame::Result<()> {
    let record = record_from(matches)?;
    if let Some(path) = matches.value_of(SAVE) {
        record.save(path)?;
        info!("record written to {}", path);
    }

    let frames = u32::from_str(matches.value_of(FRAMES).unwrap_or("1")).unwrap_or(1);
    let mut renderer = Renderer::from_record(&record)?;
    let mut frame = renderer.step();
    for _ in 1..frames {
        frame = renderer.step();
    }

    let output = matches.value_of(OUTPUT).unwrap_or("flame.png");
    frame.to_rgba_image().save(output)?;
    info!(
        "{}x{} image written to {}",
        frame.width, frame.height, output
    );
    Ok(())
}

fn main() {
    let matches = args();
    let level = match matches.occurrences_of(VERBOSE) {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    if let Err(e) = run(&matches) {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
