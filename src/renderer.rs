// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Frame orchestration.
//!
//! A [`Renderer`] owns a flame, its settings, a palette and the
//! accumulating histogram, and turns them into one tone-mapped frame per
//! step.  A [`FlameThread`] runs a renderer on its own thread, taking
//! commands over a channel and publishing frames on another.

use std::thread;

use crossbeam::channel::{unbounded, Receiver, Sender, TryRecvError};
use log::{debug, info, warn};

use crate::chaos::{ChaosGame, FrameStats};
use crate::config::RenderConfig;
use crate::error::Result;
use crate::fractal::Fractal;
use crate::histogram::Histogram;
use crate::palette::ColorMap;
use crate::record::{FlameRecord, PaletteSource};
use crate::tonemap::{Frame, ToneMapper};

/// Owns everything a run of frames needs.
#[derive(Debug)]
pub struct Renderer {
    fractal: Fractal,
    config: RenderConfig,
    palette: ColorMap,
    palette_source: PaletteSource,
    histogram: Histogram,
    running: bool,
    pending_clear: bool,
    last_stats: FrameStats,
    last_max: u32,
}

impl Renderer {
    /// A stopped renderer with an empty histogram.  The palette is a
    /// built-in name or a [`PaletteSource`].
    pub fn new<P>(fractal: Fractal, config: RenderConfig, palette: P) -> Result<Self>
    where
        P: Into<PaletteSource>,
    {
        fractal.validate()?;
        config.validate()?;
        let palette_source = palette.into();
        let palette = palette_source.color_map()?;
        let histogram = Histogram::new(config.width as usize, config.height as usize);
        Ok(Renderer {
            fractal,
            config,
            palette,
            palette_source,
            histogram,
            running: false,
            pending_clear: false,
            last_stats: FrameStats::default(),
            last_max: 0,
        })
    }

    /// A renderer for a saved record.
    pub fn from_record(record: &FlameRecord) -> Result<Self> {
        Renderer::new(
            record.fractal.clone(),
            record.config.clone(),
            record.palette.clone(),
        )
    }

    /// Capture the current flame, settings and palette.  A palette
    /// loaded from raw bytes is recorded by its entries.
    pub fn to_record(&self) -> FlameRecord {
        FlameRecord::new(
            self.fractal.clone(),
            self.config.clone(),
            self.palette_source.clone(),
        )
    }

    /// The current flame.
    pub fn fractal(&self) -> &Fractal {
        &self.fractal
    }

    /// The current settings.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// The current palette.
    pub fn palette(&self) -> &ColorMap {
        &self.palette
    }

    /// The accumulated density.
    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    /// Plot counts from the most recent frame.
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// The busiest pixel's hit count as of the most recent frame.
    pub fn last_max(&self) -> u32 {
        self.last_max
    }

    /// Replace the flame.  The histogram is cleared at the next frame
    /// boundary since the old density no longer belongs to anything.
    pub fn set_fractal(&mut self, fractal: Fractal) -> Result<()> {
        if let Err(e) = fractal.validate() {
            warn!("rejected fractal: {}", e);
            return Err(e);
        }
        info!("new fractal with {} xforms", fractal.len());
        self.fractal = fractal;
        self.pending_clear = true;
        Ok(())
    }

    /// Edit the flame in place.  The edit is made on a copy and only
    /// kept if the result validates.
    pub fn edit_fractal<F>(&mut self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Fractal) -> Result<()>,
    {
        let mut fractal = self.fractal.clone();
        edit(&mut fractal)?;
        self.set_fractal(fractal)
    }

    /// Replace the settings.  A change of canvas size starts a fresh
    /// histogram.
    pub fn set_config(&mut self, config: RenderConfig) -> Result<()> {
        if let Err(e) = config.validate() {
            warn!("rejected config: {}", e);
            return Err(e);
        }
        if (config.width, config.height) != (self.config.width, self.config.height) {
            info!("canvas resized to {}x{}", config.width, config.height);
            self.histogram = Histogram::new(config.width as usize, config.height as usize);
            self.pending_clear = false;
        }
        self.config = config;
        Ok(())
    }

    /// Change only the canvas size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let config = RenderConfig {
            width,
            height,
            ..self.config.clone()
        };
        self.set_config(config)
    }

    /// Switch to a built-in palette.
    pub fn set_palette(&mut self, name: &str) -> Result<()> {
        let palette = ColorMap::builtin(name)?;
        info!("palette set to {}", name);
        self.palette = palette;
        self.palette_source = PaletteSource::from(name);
        Ok(())
    }

    /// Load a palette from RGBA bytes.  The whole buffer is checked
    /// before the current palette is touched.
    pub fn set_palette_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        match ColorMap::from_rgba_bytes(bytes) {
            Ok(palette) => {
                info!("loaded {}-entry palette", palette.len());
                self.palette_source = PaletteSource::from(&palette);
                self.palette = palette;
                Ok(())
            }
            Err(e) => {
                warn!("rejected palette: {}", e);
                Err(e)
            }
        }
    }

    /// Let [`Renderer::tick`] produce frames.
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Make [`Renderer::tick`] idle.  The histogram is kept.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Whether the renderer is producing frames.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Zero the histogram before the next frame.  Asking twice is the
    /// same as asking once.
    pub fn clear(&mut self) {
        self.pending_clear = true;
    }

    /// A frame if running, nothing otherwise.
    pub fn tick(&mut self) -> Option<Frame> {
        if self.running {
            Some(self.step())
        } else {
            None
        }
    }

    /// Render exactly one frame, running or not: apply any pending
    /// clear, pose the flame for the frame, run the chaos game, reduce
    /// the maximum, tone map, and advance the frame counter.
    pub fn step(&mut self) -> Frame {
        if self.pending_clear {
            self.histogram.clear();
            self.pending_clear = false;
            debug!("histogram cleared");
        }

        let number = self.config.frame;
        let threads = self.config.worker_threads();
        self.fractal.animate(number, self.config.animation_speed);

        self.last_stats = match ChaosGame::new(
            &self.fractal,
            &self.palette,
            self.histogram.width(),
            self.histogram.height(),
            number,
        ) {
            Ok(game) => game
                .with_steps(self.config.warmup, self.config.steps_per_point)
                .run(&self.histogram, self.config.num_points, threads),
            Err(e) => {
                warn!("frame {} skipped: {}", number, e);
                FrameStats::default()
            }
        };
        self.last_max = self.histogram.reduce_max(threads);
        let frame = ToneMapper::from(&self.config).render(&self.histogram, threads);

        debug!(
            "frame {}: {} plotted, {} dropped, max {}",
            number, self.last_stats.plotted, self.last_stats.dropped, self.last_max
        );
        self.config.advance();
        frame
    }
}

/// Requests a [`FlameThread`] accepts.
#[derive(Debug)]
pub enum Command {
    /// Render continuously.
    Start,
    /// Stop rendering; the histogram is kept.
    Stop,
    /// Render one frame.
    Step,
    /// Zero the histogram at the next frame boundary.
    Clear,
    /// Replace the flame.
    SetFractal(Fractal),
    /// Replace the settings.
    SetConfig(RenderConfig),
    /// Switch to a built-in palette by name.
    SetPalette(String),
    /// Load a palette from RGBA bytes.
    SetPaletteBytes(Vec<u8>),
    /// Change the canvas size.
    Resize(u32, u32),
    /// End the thread.
    Shutdown,
}

/// What a [`FlameThread`] publishes.
#[derive(Debug)]
pub enum Update {
    /// A finished frame.
    Frame {
        /// The frame counter it was rendered at.
        number: u32,
        /// The tone-mapped image.
        frame: Frame,
        /// Plot counts for the frame.
        stats: FrameStats,
    },
    /// A command that was refused; the renderer is unchanged.
    Rejected(crate::error::FlameError),
}

/// A renderer running on a background thread.
#[derive(Debug)]
pub struct FlameThread {
    commands: Sender<Command>,
    updates: Receiver<Update>,
    handle: Option<thread::JoinHandle<Renderer>>,
}

impl FlameThread {
    /// Move `renderer` onto a new thread.  The thread sleeps on its
    /// command queue while stopped and polls it between frames while
    /// running.
    pub fn spawn(renderer: Renderer) -> Result<Self> {
        let (commands, command_rx) = unbounded();
        let (update_tx, updates) = unbounded();
        let handle = thread::Builder::new()
            .name("flame".to_owned())
            .spawn(move || run(renderer, command_rx, update_tx))?;
        Ok(FlameThread {
            commands,
            updates,
            handle: Some(handle),
        })
    }

    /// Queue a command.  Returns false if the thread has already ended.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    /// The update stream.
    pub fn updates(&self) -> &Receiver<Update> {
        &self.updates
    }

    /// Stop the thread and hand back its renderer.
    pub fn shutdown(mut self) -> Option<Renderer> {
        let _ = self.commands.send(Command::Shutdown);
        self.handle.take().and_then(|handle| handle.join().ok())
    }
}

impl Drop for FlameThread {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.commands.send(Command::Shutdown);
            let _ = handle.join();
        }
    }
}

fn run(mut renderer: Renderer, commands: Receiver<Command>, updates: Sender<Update>) -> Renderer {
    info!("flame thread started");
    loop {
        let command = if renderer.is_running() {
            match commands.try_recv() {
                Ok(command) => Some(command),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break,
            }
        } else {
            match commands.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            }
        };

        let mut render = renderer.is_running();
        if let Some(command) = command {
            let outcome = match command {
                Command::Start => {
                    renderer.start();
                    Ok(())
                }
                Command::Stop => {
                    renderer.stop();
                    Ok(())
                }
                Command::Step => {
                    render = true;
                    Ok(())
                }
                Command::Clear => {
                    renderer.clear();
                    Ok(())
                }
                Command::SetFractal(fractal) => renderer.set_fractal(fractal),
                Command::SetConfig(config) => renderer.set_config(config),
                Command::SetPalette(name) => renderer.set_palette(&name),
                Command::SetPaletteBytes(bytes) => renderer.set_palette_bytes(&bytes),
                Command::Resize(width, height) => renderer.resize(width, height),
                Command::Shutdown => break,
            };
            if let Err(e) = outcome {
                if updates.send(Update::Rejected(e)).is_err() {
                    break;
                }
            }
            render = render || renderer.is_running();
        }

        if render {
            let number = renderer.config().frame;
            let frame = renderer.step();
            let update = Update::Frame {
                number,
                frame,
                stats: renderer.last_stats(),
            };
            if updates.send(update).is_err() {
                break;
            }
        }
    }
    info!("flame thread stopped");
    renderer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlameError;
    use crate::variations::Variation;
    use crate::xform::{Affine, XForm};
    use std::time::Duration;

    fn identity() -> Fractal {
        Fractal::with_xforms(vec![XForm::new(
            Variation::Linear,
            Affine::identity(),
            0.5,
            1.0,
        )])
        .unwrap()
    }

    fn small() -> RenderConfig {
        RenderConfig {
            width: 8,
            height: 8,
            num_points: 10,
            steps_per_point: 5,
            warmup: 2,
            threads: 2,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn step_renders_and_advances() {
        let mut r = Renderer::new(identity(), small(), "grayscale").unwrap();
        let frame = r.step();
        assert_eq!((frame.width, frame.height), (8, 8));
        assert_eq!(r.config().frame, 1);
        assert_eq!(r.last_stats().plotted, 50);
        assert_eq!(r.histogram().total_hits(), 50);
        assert!(r.last_max() >= 1);
    }

    #[test]
    fn tick_only_renders_while_running() {
        let mut r = Renderer::new(identity(), small(), "grayscale").unwrap();
        assert!(r.tick().is_none());
        r.start();
        assert!(r.tick().is_some());
        r.stop();
        assert!(r.tick().is_none());
        assert_eq!(r.config().frame, 1);
    }

    #[test]
    fn density_accumulates_until_cleared() {
        let mut r = Renderer::new(identity(), small(), "grayscale").unwrap();
        r.step();
        r.step();
        assert_eq!(r.histogram().total_hits(), 100);
        r.clear();
        r.clear();
        assert_eq!(r.histogram().total_hits(), 100);
        r.step();
        assert_eq!(r.histogram().total_hits(), 50);
    }

    #[test]
    fn rejected_changes_leave_state_alone() {
        let mut r = Renderer::new(identity(), small(), "fire").unwrap();
        let before = r.palette().clone();
        assert!(r.set_palette_bytes(&[1, 2, 3]).is_err());
        assert_eq!(r.palette(), &before);

        let bad = r.edit_fractal(|f| f.set_final_xform(Some(3)));
        assert!(bad.is_err());
        assert_eq!(r.fractal(), &identity());

        match r.resize(0, 10) {
            Err(FlameError::InvalidDimensions(0, 10)) => {}
            other => panic!("expected InvalidDimensions, got {:?}", other),
        }
        assert_eq!(r.histogram().len(), 64);
    }

    #[test]
    fn resizing_starts_a_fresh_histogram() {
        let mut r = Renderer::new(identity(), small(), "fire").unwrap();
        r.step();
        r.resize(4, 2).unwrap();
        assert_eq!(r.histogram().len(), 8);
        assert_eq!(r.histogram().total_hits(), 0);
        assert_eq!(r.step().pixels.len(), 8);
    }

    #[test]
    fn records_round_trip_through_the_renderer() {
        let r = Renderer::new(identity(), small(), "ocean").unwrap();
        let record = r.to_record();
        let again = Renderer::from_record(&record).unwrap();
        assert_eq!(again.fractal(), r.fractal());
        assert_eq!(again.config(), r.config());
        assert_eq!(again.palette(), r.palette());
    }

    #[test]
    fn byte_loaded_palettes_survive_the_record() {
        let mut r = Renderer::new(identity(), small(), "fire").unwrap();
        r.set_palette_bytes(&[10, 20, 30, 255, 40, 50, 60, 0]).unwrap();
        let record = r.to_record();
        assert_eq!(
            record.palette,
            PaletteSource::Entries(vec![[10, 20, 30], [40, 50, 60]])
        );
        let json = record.to_json().unwrap();
        let again = Renderer::from_record(&FlameRecord::from_json(&json).unwrap()).unwrap();
        assert_eq!(again.palette(), r.palette());

        r.set_palette("ocean").unwrap();
        assert_eq!(r.to_record().palette, PaletteSource::from("ocean"));
    }

    #[test]
    fn thread_steps_on_request() {
        let renderer = Renderer::new(identity(), small(), "grayscale").unwrap();
        let thread = FlameThread::spawn(renderer).unwrap();
        assert!(thread.send(Command::Step));
        match thread.updates().recv_timeout(Duration::from_secs(10)) {
            Ok(Update::Frame { number, frame, stats }) => {
                assert_eq!(number, 0);
                assert_eq!(frame.pixels.len(), 64);
                assert_eq!(stats.plotted, 50);
            }
            other => panic!("expected a frame, got {:?}", other),
        }

        assert!(thread.send(Command::SetPalette("plaid".to_string())));
        match thread.updates().recv_timeout(Duration::from_secs(10)) {
            Ok(Update::Rejected(FlameError::UnknownPalette(_))) => {}
            other => panic!("expected a rejection, got {:?}", other),
        }

        let renderer = thread.shutdown().unwrap();
        assert_eq!(renderer.config().frame, 1);
    }
}
