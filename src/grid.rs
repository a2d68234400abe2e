use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};

/// Geographic window of a WMS 1.3.0 EPSG:4326 request.
///
/// Serializes as `lat_min,lon_min,lat_max,lon_max` (EPSG:4326 axis order).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lon_min: f64,
    pub lat_max: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub fn from_ranges(longitude_range: (f64, f64), latitude_range: (f64, f64)) -> Self {
        Self {
            lat_min: latitude_range.0,
            lon_min: longitude_range.0,
            lat_max: latitude_range.1,
            lon_max: longitude_range.1,
        }
    }

    /// True when `lat_min <= lat_max` and `lon_min <= lon_max`.
    pub fn is_ordered(&self) -> bool {
        self.lat_min <= self.lat_max && self.lon_min <= self.lon_max
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            format_coord(self.lat_min),
            format_coord(self.lon_min),
            format_coord(self.lat_max),
            format_coord(self.lon_max)
        )
    }
}

// Whole numbers keep a trailing ".0" so -90 renders as "-90.0".
fn format_coord(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

/// Pixel position in the virtual raster: `i` is the longitude bin, `j` the
/// latitude bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellIndex {
    pub i: u32,
    pub j: u32,
}

/// Every cell of a `width`x`height` raster, longitude index outer.
pub fn cell_indices(width: u32, height: u32) -> impl Iterator<Item = CellIndex> {
    (0..width).flat_map(move |i| (0..height).map(move |j| CellIndex { i, j }))
}

/// Density raster indexed `rows[lat_bin][lon_bin]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DensityGrid {
    rows: Vec<Vec<f64>>,
}

impl DensityGrid {
    /// Reshape a flat longitude-major sequence (as returned by a grid fetch)
    /// to `[n_lon][n_lat]` and transpose it to `[n_lat][n_lon]`.
    pub fn from_lon_major(values: &[f64], n_lon: usize, n_lat: usize) -> Result<Self> {
        if values.len() != n_lon * n_lat {
            return Err(Error::InvalidRequest(format!(
                "cannot reshape {} values into {n_lon}x{n_lat}",
                values.len()
            )));
        }

        let rows = (0..n_lat)
            .map(|j| (0..n_lon).map(|i| values[i * n_lat + j]).collect())
            .collect();
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn get(&self, lat_bin: usize, lon_bin: usize) -> Option<f64> {
        self.rows.get(lat_bin)?.get(lon_bin).copied()
    }

    pub fn n_lat(&self) -> usize {
        self.rows.len()
    }

    pub fn n_lon(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Write the rows as a nested JSON array. NaN cells become `null`.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
