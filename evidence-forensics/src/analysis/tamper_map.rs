//! Tamper probability maps produced by the image forgery localizer.
//!
//! The model writes a NumPy `.npz` archive. The map is stored under one of
//! several key names depending on the model build, so the first known key
//! present wins.

use image::{GrayImage, Luma};
use ndarray::{Array2, ArrayD, Axis, Ix2};
use ndarray_npy::NpzReader;
use std::fs::File;
use std::path::Path;

use crate::error::{ForensicsError, ForensicsResult};

/// Candidate array names, most common first.
pub const TAMPER_MAP_KEYS: &[&str] = &[
    "out",
    "pred",
    "heatmap",
    "map",
    "tamper_map",
    "segmentation",
    "mask",
];

const NORMALIZE_EPSILON: f32 = 1e-8;

/// Per-pixel manipulation likelihood, `height x width`
#[derive(Debug, Clone)]
pub struct TamperMap {
    /// Archive key the map was read from
    pub key: String,
    pub values: Array2<f32>,
}

impl TamperMap {
    pub fn new(key: impl Into<String>, values: Array2<f32>) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }

    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    pub fn height(&self) -> usize {
        self.values.nrows()
    }

    /// Min-max normalize to 0..=255.
    ///
    /// Non-finite values are left out of the range and become 0.
    pub fn normalize(&self) -> GrayImage {
        let (min, max) = self
            .values
            .iter()
            .filter(|v| v.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        let width = self.width() as u32;
        let height = self.height() as u32;
        let mut out = GrayImage::new(width, height);
        if !min.is_finite() {
            return out;
        }

        let range = max - min + NORMALIZE_EPSILON;
        for ((row, col), &v) in self.values.indexed_iter() {
            let scaled = if v.is_finite() {
                ((v - min) / range * 255.0) as u8
            } else {
                0
            };
            out.put_pixel(col as u32, row as u32, Luma([scaled]));
        }
        out
    }
}

/// Load the tamper map from a model output archive.
pub fn load_tamper_map(npz_path: impl AsRef<Path>) -> ForensicsResult<TamperMap> {
    let npz_path = npz_path.as_ref();
    let file = File::open(npz_path)?;
    let mut npz = NpzReader::new(file).map_err(|e| ForensicsError::npz(npz_path, e))?;

    let names = npz.names().map_err(|e| ForensicsError::npz(npz_path, e))?;
    let keys: Vec<String> = names
        .iter()
        .map(|n| n.trim_end_matches(".npy").to_string())
        .collect();
    tracing::debug!("NPZ keys in {:?}: {:?}", npz_path, keys);

    let (key, entry) = TAMPER_MAP_KEYS
        .iter()
        .find_map(|wanted| {
            keys.iter()
                .position(|k| k == wanted)
                .map(|idx| (keys[idx].clone(), names[idx].clone()))
        })
        .ok_or_else(|| ForensicsError::MissingTamperMap { keys: keys.clone() })?;

    let raw = read_as_f32(&mut npz, &entry).map_err(|e| ForensicsError::npz(npz_path, e))?;
    let values = squeeze_2d(raw)?;
    Ok(TamperMap::new(key, values))
}

fn read_as_f32(
    npz: &mut NpzReader<File>,
    name: &str,
) -> Result<ArrayD<f32>, ndarray_npy::ReadNpzError> {
    if let Ok(values) = npz.by_name::<ndarray::OwnedRepr<f32>, ndarray::IxDyn>(name) {
        return Ok(values);
    }
    if let Ok(values) = npz.by_name::<ndarray::OwnedRepr<f64>, ndarray::IxDyn>(name) {
        return Ok(values.mapv(|v| v as f32));
    }
    let values = npz.by_name::<ndarray::OwnedRepr<u8>, ndarray::IxDyn>(name)?;
    Ok(values.mapv(f32::from))
}

/// Drop length-1 axes and require exactly two remaining.
fn squeeze_2d(values: ArrayD<f32>) -> ForensicsResult<Array2<f32>> {
    let shape = values.shape().to_vec();
    let mut squeezed = values;
    for axis in (0..shape.len()).rev() {
        if shape[axis] == 1 && squeezed.ndim() > 2 {
            squeezed = squeezed.index_axis_move(Axis(axis), 0);
        }
    }
    squeezed
        .into_dimensionality::<Ix2>()
        .map_err(|_| ForensicsError::UnsupportedMapShape(shape))
}
