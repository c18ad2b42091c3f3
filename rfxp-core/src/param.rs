//! Typed encoding parameters consumed by pipeline stages.
//!
//! The parameter surface is deliberately a struct of typed fields
//! rather than a string-keyed bag: every stage reads exactly the
//! fields it declares, and shape errors surface at assembly time.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::tile::Tile;

/// Number of coefficient bands produced by the three-level wavelet,
/// in band order: LL3, HL3, LH3, HH3, HL2, LH2, HH2, HL1, LH1, HH1.
pub const BAND_COUNT: usize = 10;

// ── QuantizationFactors ──────────────────────────────────────────

/// Per-band quantization factors for one pass.
///
/// A factor of 6 is the identity; larger factors discard
/// `factor - 6` low bits of the band's coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizationFactors {
    factors: [u8; BAND_COUNT],
}

impl QuantizationFactors {
    /// Validate and adopt a band-ordered factor array.
    ///
    /// Fails with [`CodecError::Validation`] when the array shape does
    /// not match the coefficient-band count.
    pub fn new(factors: &[u8]) -> Result<Self, CodecError> {
        let factors: [u8; BAND_COUNT] = factors.try_into().map_err(|_| {
            CodecError::Validation(format!(
                "quantization array holds {} factors, expected {BAND_COUNT}",
                factors.len()
            ))
        })?;
        Ok(Self { factors })
    }

    /// The factor for one band index (`0..BAND_COUNT`).
    pub fn factor(&self, band: usize) -> u8 {
        self.factors[band]
    }

    /// Bits discarded for one band index.
    pub fn shift(&self, band: usize) -> u32 {
        u32::from(self.factors[band].saturating_sub(6))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.factors
    }
}

impl Default for QuantizationFactors {
    /// Identity quantization: every band keeps all bits.
    fn default() -> Self {
        Self {
            factors: [6; BAND_COUNT],
        }
    }
}

// ── ProgressiveQuantizationFactors ───────────────────────────────

/// Ordered per-layer quantization factor sets.
///
/// Order corresponds to progressive layer index and is preserved
/// end-to-end from request parsing to the consuming stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressiveQuantizationFactors {
    layers: Vec<QuantizationFactors>,
}

impl ProgressiveQuantizationFactors {
    pub fn new(layers: Vec<QuantizationFactors>) -> Self {
        Self { layers }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuantizationFactors> {
        self.layers.iter()
    }
}

// ── EntropyAlgorithm ─────────────────────────────────────────────

/// Entropy-coding variant selector for the terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EntropyAlgorithm {
    /// Previous-sample predictor.
    #[default]
    #[serde(rename = "RLGR1")]
    Rlgr1,
    /// Left/above average predictor.
    #[serde(rename = "RLGR3")]
    Rlgr3,
}

// ── StageParams ──────────────────────────────────────────────────

/// The full typed parameter set a stage may draw from.
///
/// Each stage kind documents which fields it reads; unread fields are
/// ignored. The previous-frame reference is injected by the driver
/// immediately before execution.
#[derive(Debug, Clone, Default)]
pub struct StageParams {
    /// Per-band factors for the quantization stage.
    pub quant: Option<QuantizationFactors>,
    /// Per-layer factor sets for the progressive stage.
    pub prog_quants: Option<ProgressiveQuantizationFactors>,
    /// Entropy-coding variant for the terminal stage.
    pub entropy: Option<EntropyAlgorithm>,
    /// Reduce/extrapolate rounding in the wavelet stage.
    pub reduce_extrapolate: bool,
    /// Whether the differencing stage subtracts the previous frame.
    pub use_difference_tile: bool,
    /// Reference coefficients from the previous frame.
    pub previous_frame: Option<Tile>,
}

// ── Tests ────────────────────────────────────────────────────────
