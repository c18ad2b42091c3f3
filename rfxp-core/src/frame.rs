//! Session-carried collaborator state and the previous-frame reference.
//!
//! The hosting layer persists two file paths per session; the core
//! reads them as plain paths and does not manage their lifecycle.

use std::path::{Path, PathBuf};

use crate::error::CodecError;
use crate::param::QuantizationFactors;
use crate::pipeline::stages;
use crate::tile::Tile;

// ── SessionContext ───────────────────────────────────────────────

/// Per-session file paths owned by the hosting layer.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// The previous frame's source tile, for temporal differencing.
    pub previous_frame_path: Option<PathBuf>,
    /// The working image the encode operation consumes.
    pub working_image_path: Option<PathBuf>,
}

// ── Previous-frame reference ─────────────────────────────────────

/// Build the differencing reference for the current parameter set: the
/// previous frame pushed through the pre-differencing stages (color
/// conversion, wavelet, quantization, linearization).
pub fn previous_frame_reference(
    path: &Path,
    quant: &QuantizationFactors,
    reduce_extrapolate: bool,
) -> Result<Tile, CodecError> {
    let tile = Tile::from_file(path)?;
    let ycc = stages::color_convert(&tile)?;
    let coeffs = stages::dwt(&ycc, reduce_extrapolate)?;
    let quantized = stages::quantize(&coeffs, quant)?;
    stages::linearize(&quantized)
}

// ── Tests ────────────────────────────────────────────────────────
