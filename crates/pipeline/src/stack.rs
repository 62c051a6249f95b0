use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use common::{BreakError, QualityConfig, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dates::parse_modis_date;
use crate::qa::{scale_raw, QualityMask};

/// One raw value of one pixel in one composite, as extracted from a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRecord {
    pub date: String,
    pub pixel: usize,
    pub raw: i32,
}

/// Pixel-reliability flag matching a [`ValueRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagRecord {
    pub date: String,
    pub pixel: usize,
    pub flag: u8,
}

/// Per-pixel time series on a `nrows × ncols` grid, sharing one date axis.
#[derive(Debug, Clone)]
pub struct PixelStack {
    pub nrows: usize,
    pub ncols: usize,
    pub dates: Vec<NaiveDate>,
    /// Row-major pixels, each with one value per date (`NaN` when missing).
    pub pixels: Vec<Vec<f64>>,
}

impl PixelStack {
    /// Assemble long-form records into per-pixel series.
    ///
    /// Values are scaled and fill values dropped. When flags are given, a
    /// value is kept only if its flag is accepted; values without a flag are
    /// dropped.
    pub fn from_records(
        nrows: usize,
        ncols: usize,
        values: &[ValueRecord],
        flags: Option<&[FlagRecord]>,
        quality: &QualityConfig,
    ) -> Result<Self> {
        let n_pixels = nrows * ncols;
        if n_pixels == 0 {
            return Err(BreakError::InvalidInput("pixel grid is empty".into()));
        }

        let mut parsed: BTreeMap<String, NaiveDate> = BTreeMap::new();
        let mut date_of = |key: &str| -> Result<NaiveDate> {
            if let Some(d) = parsed.get(key) {
                return Ok(*d);
            }
            let d = parse_modis_date(key)?;
            parsed.insert(key.to_string(), d);
            Ok(d)
        };

        let mut cells: BTreeMap<NaiveDate, Vec<(usize, i32)>> = BTreeMap::new();
        for r in values {
            check_pixel(r.pixel, n_pixels)?;
            cells.entry(date_of(&r.date)?).or_default().push((r.pixel, r.raw));
        }

        let flag_map = match flags {
            Some(flags) => {
                let mut map = HashMap::with_capacity(flags.len());
                for f in flags {
                    check_pixel(f.pixel, n_pixels)?;
                    map.insert((date_of(&f.date)?, f.pixel), f.flag);
                }
                Some(map)
            }
            None => None,
        };

        let mask = QualityMask::from_config(quality);
        let dates: Vec<NaiveDate> = cells.keys().copied().collect();
        let mut pixels = vec![vec![f64::NAN; dates.len()]; n_pixels];
        let mut rejected = 0usize;
        for (t, (date, entries)) in cells.iter().enumerate() {
            let raws: Vec<i32> = entries.iter().map(|(_, raw)| *raw).collect();
            let scaled = scale_raw(&raws, quality.scale_factor, quality.fill_value);
            for ((pixel, _), value) in entries.iter().zip(scaled) {
                let keep = match &flag_map {
                    Some(map) => map.get(&(*date, *pixel)).is_some_and(|f| mask.accepts(*f)),
                    None => true,
                };
                if keep {
                    pixels[*pixel][t] = value;
                } else {
                    rejected += 1;
                }
            }
        }

        debug!(
            pixels = n_pixels,
            dates = dates.len(),
            records = values.len(),
            rejected = rejected,
            "Pixel stack assembled"
        );

        Ok(Self {
            nrows,
            ncols,
            dates,
            pixels,
        })
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Series of the pixel at `(row, col)`.
    pub fn pixel(&self, row: usize, col: usize) -> Option<&[f64]> {
        if row >= self.nrows || col >= self.ncols {
            return None;
        }
        self.pixels.get(row * self.ncols + col).map(Vec::as_slice)
    }
}

fn check_pixel(pixel: usize, n_pixels: usize) -> Result<()> {
    if pixel >= n_pixels {
        return Err(BreakError::InvalidInput(format!(
            "pixel {pixel} outside a grid of {n_pixels} cells"
        )));
    }
    Ok(())
}
