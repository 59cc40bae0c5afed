//! Intensity normalization
//!
//! Sidescan amplitudes span several orders of magnitude and usually
//! carry empty margins where the receiver recorded nothing. The
//! normalizer turns the per-ping sample arrays of one channel into a
//! quantized raster in a fixed order:
//!
//! 1. drop columns whose mean amplitude is below the cleanup threshold
//! 2. clip to the 16 bit range
//! 3. log compress with `log10(x + 1)`
//! 4. stretch the global range to `0..=65535`
//! 5. optionally equalize the histogram at 16 bit precision
//! 6. stretch to the target bit depth and quantize
//! 7. optionally halve the width with a Lanczos filter
use crate::config::{BitDepth, ConvertConfig};
use crate::error::{Error, Result};
use crate::model::Raster;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};
use log::{debug, info};

const WORKING_MAX: f64 = 65535.0;
const HISTOGRAM_BINS: usize = 65536;

/// Build a raster from the sample arrays of a channel
///
/// Each element of `rows` is one ping. All pings must have the same
/// number of samples.
///
/// # Errors
///
/// Returns [`Error::Normalization`] if there are no pings, the pings are
/// ragged, cleanup removes every column, or every remaining sample has
/// the same value.
pub fn normalize<S: AsRef<[u32]>>(rows: &[S], config: &ConvertConfig) -> Result<Raster> {
    let (height, width) = dimensions(rows)?;
    debug!("Columns before cleanup: {}", width);

    let columns = match config.column_threshold() {
        Some(threshold) => retained_columns(rows, width, threshold),
        None => (0..width).collect(),
    };
    info!(
        "Removing {} columns below threshold {}",
        width - columns.len(),
        config.column_threshold
    );
    if columns.is_empty() {
        return Err(Error::Normalization(
            "column cleanup removed every column".to_string(),
        ));
    }

    let mut values: Vec<f64> = Vec::with_capacity(height * columns.len());
    for row in rows {
        let row = row.as_ref();
        values.extend(columns.iter().map(|&c| log_compress(row[c])));
    }

    let (vmin, vmax) = min_max(&values);
    debug!("Values before scaling: min {}, max {}", vmin, vmax);
    if vmax <= vmin {
        return Err(Error::Normalization(format!(
            "degenerate intensity range, every sample compresses to {}",
            vmin
        )));
    }
    stretch(&mut values, vmin, vmax, WORKING_MAX);

    if config.histogram_equalization {
        values = equalize(&values);
    }

    let (vmin, vmax) = min_max(&values);
    debug!("Values before quantization: min {}, max {}", vmin, vmax);
    if vmax <= vmin {
        return Err(Error::Normalization(
            "degenerate intensity range after equalization".to_string(),
        ));
    }
    stretch(&mut values, vmin, vmax, config.bitdepth.max_value());

    let w = columns.len() as u32;
    let h = height as u32;
    let raster = match config.bitdepth {
        BitDepth::Eight => {
            let data: Vec<u8> = values.iter().map(|&v| v as u8).collect();
            let img = ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(w, h, data).ok_or_else(|| {
                Error::Normalization("raster buffer does not match its dimensions".to_string())
            })?;
            Raster::U8(img)
        }
        BitDepth::Sixteen => {
            let data: Vec<u16> = values.iter().map(|&v| v as u16).collect();
            let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w, h, data).ok_or_else(|| {
                Error::Normalization("raster buffer does not match its dimensions".to_string())
            })?;
            Raster::U16(img)
        }
    };

    let raster = if config.resize_half_width {
        half_width(raster)?
    } else {
        raster
    };
    info!(
        "Raster is {} x {} at {} bits",
        raster.width(),
        raster.height(),
        raster.bitdepth()
    );

    Ok(raster)
}

fn dimensions<S: AsRef<[u32]>>(rows: &[S]) -> Result<(usize, usize)> {
    let first = rows
        .first()
        .ok_or_else(|| Error::Normalization("channel has no pings".to_string()))?;
    let width = first.as_ref().len();
    if width == 0 {
        return Err(Error::Normalization("pings have no samples".to_string()));
    }
    if let Some((i, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.as_ref().len() != width)
    {
        return Err(Error::Normalization(format!(
            "ping {} has {} samples, expected {}",
            i,
            row.as_ref().len(),
            width
        )));
    }
    Ok((rows.len(), width))
}

/// Indices of the columns whose mean is at least `threshold`
fn retained_columns<S: AsRef<[u32]>>(rows: &[S], width: usize, threshold: f64) -> Vec<usize> {
    let mut sums = vec![0u64; width];
    for row in rows {
        for (sum, &x) in sums.iter_mut().zip(row.as_ref()) {
            *sum += u64::from(x);
        }
    }
    let n = rows.len() as f64;
    sums.iter()
        .enumerate()
        .filter(|&(_, &s)| s as f64 / n >= threshold)
        .map(|(i, _)| i)
        .collect()
}

fn log_compress(x: u32) -> f64 {
    let clipped = x.min(u32::from(u16::MAX));
    (f64::from(clipped) + 1.0).log10()
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Map `[vmin, vmax]` linearly onto `[0, upper]` and clip
fn stretch(values: &mut [f64], vmin: f64, vmax: f64, upper: f64) {
    // Already spanning the target range exactly
    if vmin == 0.0 && vmax == upper {
        return;
    }
    let range = vmax - vmin;
    for v in values.iter_mut() {
        *v = ((*v - vmin) / range * upper).clamp(0.0, upper);
    }
}

/// Histogram equalization on values in `0..=65535`
///
/// Values are binned by their integer part. Each value is mapped through
/// the cumulative distribution, interpolating linearly between bins, and
/// truncated to an integer.
fn equalize(values: &[f64]) -> Vec<f64> {
    let mut hist = vec![0u64; HISTOGRAM_BINS];
    for &v in values {
        hist[bin(v)] += 1;
    }

    let total = values.len() as f64;
    let cdf: Vec<f64> = hist
        .iter()
        .scan(0u64, |acc, &x| {
            *acc += x;
            Some(*acc as f64 / total * WORKING_MAX)
        })
        .collect();

    values
        .iter()
        .map(|&v| {
            let i = bin(v);
            let mapped = if i + 1 < HISTOGRAM_BINS {
                cdf[i] + (v - i as f64) * (cdf[i + 1] - cdf[i])
            } else {
                cdf[i]
            };
            mapped.clamp(0.0, WORKING_MAX).trunc()
        })
        .collect()
}

fn bin(v: f64) -> usize {
    (v.max(0.0) as usize).min(HISTOGRAM_BINS - 1)
}

fn half_width(raster: Raster) -> Result<Raster> {
    let w = raster.width() / 2;
    let h = raster.height();
    if w == 0 {
        return Err(Error::Normalization(
            "raster is too narrow to halve".to_string(),
        ));
    }
    debug!("Resizing to half width: {}", w);
    Ok(match raster {
        Raster::U8(img) => Raster::U8(imageops::resize(&img, w, h, FilterType::Lanczos3)),
        Raster::U16(img) => Raster::U16(imageops::resize(&img, w, h, FilterType::Lanczos3)),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn plain(bitdepth: BitDepth, column_threshold: i32) -> ConvertConfig {
        ConvertConfig {
            bitdepth,
            resize_half_width: false,
            histogram_equalization: false,
            column_threshold,
        }
    }

    fn ramp(height: u32, width: u32) -> Vec<Vec<u32>> {
        (0..height)
            .map(|r| (0..width).map(|c| (r * 37 + c * 101) % 4000).collect())
            .collect()
    }

    #[test]
    fn cleanup_removes_empty_column() {
        let rows = vec![vec![0, 40, 100, 300], vec![0, 60, 900, 20]];
        let raster = normalize(&rows, &plain(BitDepth::Eight, 7)).unwrap();
        assert_eq!(raster.width(), 3);
        assert_eq!(raster.height(), 2);

        let raster = normalize(&rows, &plain(BitDepth::Eight, -1)).unwrap();
        assert_eq!(raster.width(), 4);
    }

    #[test]
    fn cleanup_keeps_column_order() {
        let rows = vec![vec![10, 0, 20, 0, 30], vec![10, 2, 20, 1, 30]];
        assert_eq!(retained_columns(&rows, 5, 7.0), vec![0, 2, 4]);
        assert_eq!(retained_columns(&rows, 5, 0.0), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn cleanup_of_every_column_fails() {
        let rows = vec![vec![1, 2], vec![3, 1]];
        let err = normalize(&rows, &plain(BitDepth::Eight, 7)).unwrap_err();
        assert!(matches!(err, Error::Normalization(_)));
    }

    #[test]
    fn extremes_map_to_full_range() {
        let rows = vec![vec![0, 65535], vec![1000, 65535 * 4]];
        let raster = normalize(&rows, &plain(BitDepth::Eight, -1)).unwrap();
        let Raster::U8(img) = raster else {
            panic!("expected an 8 bit raster")
        };
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
        assert_eq!(img.get_pixel(1, 0).0[0], 255);
        assert_eq!(img.get_pixel(1, 1).0[0], 255);

        let raster = normalize(&rows, &plain(BitDepth::Sixteen, -1)).unwrap();
        let Raster::U16(img) = raster else {
            panic!("expected a 16 bit raster")
        };
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
        assert_eq!(img.get_pixel(1, 0).0[0], 65535);
    }

    #[test]
    fn constant_channel_fails() {
        let rows = vec![vec![500u32; 8]; 4];
        let err = normalize(&rows, &plain(BitDepth::Sixteen, -1)).unwrap_err();
        assert!(matches!(err, Error::Normalization(_)));
    }

    #[test]
    fn ragged_and_empty_input_fail() {
        let rows = vec![vec![1u32, 2, 3], vec![1, 2]];
        assert!(matches!(
            normalize(&rows, &plain(BitDepth::Eight, -1)),
            Err(Error::Normalization(_))
        ));

        let rows: Vec<Vec<u32>> = Vec::new();
        assert!(matches!(
            normalize(&rows, &plain(BitDepth::Eight, -1)),
            Err(Error::Normalization(_))
        ));
    }

    #[test]
    fn normalize_is_deterministic() {
        let rows = ramp(40, 64);
        let config = ConvertConfig {
            bitdepth: BitDepth::Eight,
            resize_half_width: true,
            histogram_equalization: true,
            column_threshold: 7,
        };
        let a = normalize(&rows, &config).unwrap();
        let b = normalize(&rows, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn resize_halves_width_only() {
        let rows = ramp(10, 31);
        let config = ConvertConfig {
            resize_half_width: true,
            ..plain(BitDepth::Sixteen, -1)
        };
        let raster = normalize(&rows, &config).unwrap();
        assert_eq!(raster.width(), 15);
        assert_eq!(raster.height(), 10);
        assert_eq!(raster.bitdepth(), 16);
    }

    #[test]
    fn equalization_spans_target_range() {
        let rows = ramp(16, 16);
        let config = ConvertConfig {
            histogram_equalization: true,
            ..plain(BitDepth::Eight, -1)
        };
        let Raster::U8(img) = normalize(&rows, &config).unwrap() else {
            panic!("expected an 8 bit raster")
        };
        let min = img.pixels().map(|p| p.0[0]).min().unwrap();
        let max = img.pixels().map(|p| p.0[0]).max().unwrap();
        assert_eq!(min, 0);
        assert_eq!(max, 255);
    }

    #[test]
    fn equalize_flattens_distribution() {
        let values = vec![0.0, 0.0, 0.0, 65535.0];
        let eq = equalize(&values);
        // three quarters of the samples sit in bin 0
        assert_eq!(eq[0], (0.75 * WORKING_MAX).trunc());
        assert_eq!(eq[3], WORKING_MAX);
    }
}
