// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Flame records: a fractal, its render settings and its palette,
//! saved as JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::RenderConfig;
use crate::error::Result;
use crate::fractal::Fractal;
use crate::palette::ColorMap;

/// Where a record's palette comes from: a built-in by name, or the
/// entries themselves for palettes loaded from raw bytes.  Serialised
/// untagged, so a bare string is a name and an array of triplets is a
/// table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaletteSource {
    /// One of [`crate::palette::BUILTIN_NAMES`].
    Named(String),
    /// Explicit RGB entries.
    Entries(Vec<[u8; 3]>),
}

impl PaletteSource {
    /// Build the palette.
    pub fn color_map(&self) -> Result<ColorMap> {
        match self {
            PaletteSource::Named(name) => ColorMap::builtin(name),
            PaletteSource::Entries(entries) => ColorMap::new(entries.clone()),
        }
    }
}

impl Default for PaletteSource {
    fn default() -> Self {
        PaletteSource::Named("fire".to_string())
    }
}

impl<'a> From<&'a str> for PaletteSource {
    fn from(name: &'a str) -> Self {
        PaletteSource::Named(name.to_string())
    }
}

impl<'a> From<&'a ColorMap> for PaletteSource {
    fn from(palette: &'a ColorMap) -> Self {
        PaletteSource::Entries(palette.entries().to_vec())
    }
}

/// Everything needed to reproduce a render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlameRecord {
    /// The flame itself.
    pub fractal: Fractal,
    /// Canvas, tone-mapping and sampling settings.
    #[serde(default)]
    pub config: RenderConfig,
    /// The palette, by name or by value.
    #[serde(default)]
    pub palette: PaletteSource,
}

impl FlameRecord {
    /// Bundle a fractal with its settings.
    pub fn new<P>(fractal: Fractal, config: RenderConfig, palette: P) -> Self
    where
        P: Into<PaletteSource>,
    {
        FlameRecord {
            fractal,
            config,
            palette: palette.into(),
        }
    }

    /// Check everything a renderer would refuse.
    pub fn validate(&self) -> Result<()> {
        self.fractal.validate()?;
        self.config.validate()?;
        self.palette.color_map()?;
        Ok(())
    }

    /// The palette, resolved.
    pub fn color_map(&self) -> Result<ColorMap> {
        self.palette.color_map()
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate.
    pub fn from_json(text: &str) -> Result<Self> {
        let record: FlameRecord = serde_json::from_str(text)?;
        record.validate()?;
        Ok(record)
    }

    /// Read a record from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        FlameRecord::from_json(&fs::read_to_string(path)?)
    }

    /// Write a record to disk.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
