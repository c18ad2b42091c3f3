//! Encode / recompute orchestration — the service surface of the codec.
//!
//! Requests arrive as schema-validated structs (the hosting layer
//! rejects malformed JSON before it gets here), parameters are
//! assembled into the typed per-stage sets, and every outcome
//! collapses into the uniform [`ReturnResult`] envelope at the
//! boundary.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::frame::{SessionContext, previous_frame_reference};
use crate::layers::{LayerPanel, PanelSide, export_layers};
use crate::param::{
    EntropyAlgorithm, ProgressiveQuantizationFactors, QuantizationFactors, StageParams,
};
use crate::pipeline::{Pipeline, StageId, StageKind};
use crate::serialize::DataFormat;
use crate::tile::{Tile, Triplet};

// ── Stage names ──────────────────────────────────────────────────

/// Viewer-facing stage names, in pipeline order.
pub mod stage_names {
    pub const COLOR_CONVERT: &str = "RGB To YCbCr";
    pub const DWT: &str = "DWT";
    pub const QUANTIZATION: &str = "Quantization";
    pub const LINEARIZATION: &str = "Linearization";
    pub const SUB_BAND_DIFFING: &str = "Sub-Band Diffing";
    pub const PROGRESSIVE_QUANTIZATION: &str = "Progressive Quantization";
    pub const ENTROPY_ENCODE: &str = "RLGR/SRL Encode";
}

// ── Request payloads ─────────────────────────────────────────────

/// Canonical codec parameters carried by encode and recompute requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CodecParams {
    /// Per-band quantization factors, band-ordered.
    pub quantization_factors_array: Vec<u8>,
    /// One factor array per progressive layer, coarsest first.
    pub prog_quantization_array: Vec<Vec<u8>>,
    pub entropy_algorithm: EntropyAlgorithm,
    pub use_reduce_extrapolate: bool,
    /// Sample format of tile text carried in the same request.
    #[serde(default)]
    pub use_data_format: DataFormat,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncodeRequest {
    pub params: CodecParams,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecomputeRequest {
    /// Name of the stage to re-run.
    pub action: String,
    pub params: CodecParams,
    /// Fresh input tiles as (Y, Cb, Cr) plane strings.
    pub inputs: Vec<[String; 3]>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PanelRequest {
    pub name: String,
}

// ── ReturnResult ─────────────────────────────────────────────────

/// Uniform success/fail envelope returned to the viewer.
///
/// Failures carry only a human-readable message; no error codes cross
/// the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnResult {
    pub status: String,
    pub data: String,
}

impl ReturnResult {
    pub fn success(data: impl Into<String>) -> Self {
        Self {
            status: "Success".into(),
            data: data.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: "Fail".into(),
            data: message.into(),
        }
    }

    /// Collapse a pipeline outcome into the envelope.
    pub fn from_outcome<T>(outcome: &Result<T, CodecError>) -> Self {
        match outcome {
            Ok(_) => Self::success("Success"),
            Err(e) => Self::fail(e.to_string()),
        }
    }
}

// ── CodecDriver ──────────────────────────────────────────────────

/// One session's encode pipeline plus its orchestration operations.
///
/// Not internally synchronised: the hosting layer serialises requests
/// per session (one in-flight encode/recompute at a time).
pub struct CodecDriver {
    pipeline: Pipeline,
    ids: StageIds,
}

#[derive(Clone, Copy)]
struct StageIds {
    dwt: StageId,
    quantization: StageId,
    diffing: StageId,
    progressive: StageId,
    entropy: StageId,
}

impl CodecDriver {
    /// Build the standard progressive-encode chain.
    pub fn new() -> Result<Self, CodecError> {
        let mut pipeline = Pipeline::new("Progressive Encode");
        let root = pipeline.root();

        pipeline.add_stage(
            root,
            stage_names::COLOR_CONVERT,
            StageKind::ColorConvert,
            StageParams::default(),
        )?;
        let dwt = pipeline.add_stage(root, stage_names::DWT, StageKind::Dwt, StageParams::default())?;
        let quantization = pipeline.add_stage(
            root,
            stage_names::QUANTIZATION,
            StageKind::Quantize,
            StageParams {
                quant: Some(QuantizationFactors::default()),
                ..StageParams::default()
            },
        )?;
        pipeline.add_stage(
            root,
            stage_names::LINEARIZATION,
            StageKind::Linearize,
            StageParams::default(),
        )?;
        let diffing = pipeline.add_stage(
            root,
            stage_names::SUB_BAND_DIFFING,
            StageKind::SubBandDiff,
            StageParams::default(),
        )?;
        let progressive = pipeline.add_stage(
            root,
            stage_names::PROGRESSIVE_QUANTIZATION,
            StageKind::ProgressiveQuantize,
            StageParams::default(),
        )?;
        let entropy = pipeline.add_stage(
            root,
            stage_names::ENTROPY_ENCODE,
            StageKind::EntropyEncode,
            StageParams::default(),
        )?;

        Ok(Self {
            pipeline,
            ids: StageIds {
                dwt,
                quantization,
                diffing,
                progressive,
                entropy,
            },
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Encode the session's working image with the request parameters.
    ///
    /// The previous-frame reference, when the session carries one, is
    /// injected into the differencing stage before execution.
    pub fn encode(
        &mut self,
        request: &EncodeRequest,
        ctx: &SessionContext,
    ) -> Result<Vec<Tile>, CodecError> {
        let path = ctx
            .working_image_path
            .clone()
            .ok_or_else(|| CodecError::Validation("no working image in session".into()))?;
        let tile = Tile::from_file(&path)?;

        let quant = self.apply_params(&request.params)?;
        self.apply_previous_frame(&quant, request.params.use_reduce_extrapolate, ctx)?;

        self.pipeline.execute(vec![tile])
    }

    /// Re-run one named stage with edited inputs and cascade the effect
    /// through every later stage.
    pub fn recompute(
        &mut self,
        request: &RecomputeRequest,
        ctx: &SessionContext,
    ) -> Result<Vec<Tile>, CodecError> {
        // Check the name before touching any state.
        if self.pipeline.find(&request.action).is_none() {
            return Err(CodecError::ActionNotFound);
        }
        let tiles = decode_inputs(&request.inputs, request.params.use_data_format)?;

        let quant = self.apply_params(&request.params)?;
        self.apply_previous_frame(&quant, request.params.use_reduce_extrapolate, ctx)?;

        self.pipeline.recompute(&request.action, tiles)
    }

    /// Per-layer view of a stage's most recent output.
    pub fn layer_panel(&self, name: &str) -> Vec<LayerPanel> {
        export_layers(&self.pipeline, name, PanelSide::Output)
    }

    /// Per-layer view of a stage's most recent input.
    pub fn input_panel(&self, name: &str) -> Vec<LayerPanel> {
        export_layers(&self.pipeline, name, PanelSide::Input)
    }

    // ── Internal ─────────────────────────────────────────────────

    /// Validate the request parameters and distribute them across the
    /// stage chain. Returns the parsed quantization factors for reuse.
    fn apply_params(&mut self, params: &CodecParams) -> Result<QuantizationFactors, CodecError> {
        let quant = QuantizationFactors::new(&params.quantization_factors_array)?;

        let mut layers = Vec::with_capacity(params.prog_quantization_array.len());
        for layer in &params.prog_quantization_array {
            layers.push(QuantizationFactors::new(layer)?);
        }
        if layers.is_empty() {
            return Err(CodecError::Validation(
                "at least one progressive layer is required".into(),
            ));
        }

        self.pipeline.params_mut(self.ids.quantization).quant = Some(quant);
        self.pipeline.params_mut(self.ids.dwt).reduce_extrapolate =
            params.use_reduce_extrapolate;
        self.pipeline.params_mut(self.ids.progressive).prog_quants =
            Some(ProgressiveQuantizationFactors::new(layers));
        self.pipeline.params_mut(self.ids.entropy).entropy = Some(params.entropy_algorithm);

        Ok(quant)
    }

    /// Resolve the session's previous frame and inject it into the
    /// differencing stage. Absent a previous frame, differencing is a
    /// pass-through.
    fn apply_previous_frame(
        &mut self,
        quant: &QuantizationFactors,
        reduce_extrapolate: bool,
        ctx: &SessionContext,
    ) -> Result<(), CodecError> {
        let reference = match &ctx.previous_frame_path {
            Some(path) => Some(previous_frame_reference(path, quant, reduce_extrapolate)?),
            None => None,
        };
        let diffing = self.pipeline.params_mut(self.ids.diffing);
        diffing.use_difference_tile = reference.is_some();
        diffing.previous_frame = reference;
        Ok(())
    }
}

/// Decode request tile triplets per the selected data format, applying
/// the fixed-point normalisation shift where the format calls for it.
fn decode_inputs(inputs: &[[String; 3]], format: DataFormat) -> Result<Vec<Tile>, CodecError> {
    let mut tiles = Vec::with_capacity(inputs.len());
    for [y, cb, cr] in inputs {
        let triplet = Triplet::new(y.clone(), cb.clone(), cr.clone());
        let mut tile = Tile::from_strings(&triplet, format.serializer())?;
        if format.shift() > 0 {
            tile = tile.right_shift(format.shift())?;
        }
        tiles.push(tile);
    }
    Ok(tiles)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_tile(name: &str, tile: &Tile) -> PathBuf {
        let dir = std::env::temp_dir().join("rfxp-driver-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        tile.to_file(&path).unwrap();
        path
    }

    fn ramp_tile() -> Tile {
        let plane: Vec<i32> = (0..64).collect();
        Tile::from_planes(8, 8, [plane.clone(), plane.clone(), plane]).unwrap()
    }

    fn params() -> CodecParams {
        CodecParams {
            quantization_factors_array: vec![6; 10],
            prog_quantization_array: vec![vec![8; 10], vec![6; 10]],
            entropy_algorithm: EntropyAlgorithm::Rlgr1,
            use_reduce_extrapolate: false,
            use_data_format: DataFormat::Integer,
        }
    }

    #[test]
    fn encode_request_parses_wire_shape() {
        let body = r#"{
            "Params": {
                "QuantizationFactorsArray": [6,6,6,6,6,6,6,6,6,6],
                "ProgQuantizationArray": [[8,8,8,8,8,8,8,8,8,8]],
                "EntropyAlgorithm": "RLGR3",
                "UseReduceExtrapolate": true,
                "UseDataFormat": "hex"
            }
        }"#;
        let request: EncodeRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.params.entropy_algorithm, EntropyAlgorithm::Rlgr3);
        assert!(request.params.use_reduce_extrapolate);
        assert_eq!(request.params.use_data_format, DataFormat::Hex);
    }

    #[test]
    fn encode_populates_every_stage() {
        let mut driver = CodecDriver::new().unwrap();
        let ctx = SessionContext {
            working_image_path: Some(write_tile("working.txt", &ramp_tile())),
            previous_frame_path: None,
        };

        driver
            .encode(&EncodeRequest { params: params() }, &ctx)
            .unwrap();

        for name in [
            stage_names::COLOR_CONVERT,
            stage_names::DWT,
            stage_names::QUANTIZATION,
            stage_names::LINEARIZATION,
            stage_names::SUB_BAND_DIFFING,
            stage_names::PROGRESSIVE_QUANTIZATION,
            stage_names::ENTROPY_ENCODE,
        ] {
            assert!(!driver.layer_panel(name).is_empty(), "no result for {name}");
        }
    }

    #[test]
    fn encode_without_working_image_is_validation_error() {
        let mut driver = CodecDriver::new().unwrap();
        let err = driver.encode(&EncodeRequest { params: params() }, &SessionContext::default());
        assert!(matches!(err, Err(CodecError::Validation(_))));
    }

    #[test]
    fn encode_rejects_short_quant_array() {
        let mut driver = CodecDriver::new().unwrap();
        let ctx = SessionContext {
            working_image_path: Some(write_tile("working2.txt", &ramp_tile())),
            previous_frame_path: None,
        };
        let mut bad = params();
        bad.quantization_factors_array = vec![6; 9];

        let err = driver.encode(&EncodeRequest { params: bad }, &ctx);
        assert!(matches!(err, Err(CodecError::Validation(_))));
    }

    #[test]
    fn encode_with_previous_frame_changes_differencing() {
        let working = write_tile("working3.txt", &ramp_tile());

        let mut without = CodecDriver::new().unwrap();
        without
            .encode(
                &EncodeRequest { params: params() },
                &SessionContext {
                    working_image_path: Some(working.clone()),
                    previous_frame_path: None,
                },
            )
            .unwrap();

        let mut with = CodecDriver::new().unwrap();
        with.encode(
            &EncodeRequest { params: params() },
            &SessionContext {
                working_image_path: Some(working.clone()),
                previous_frame_path: Some(working),
            },
        )
        .unwrap();

        // Differencing against an identical previous frame zeroes the output.
        let diff_layers = with.layer_panel(stage_names::SUB_BAND_DIFFING);
        assert!(diff_layers[0].tabs[0].content.split_whitespace().all(|t| t == "0"));
        let plain_layers = without.layer_panel(stage_names::SUB_BAND_DIFFING);
        assert_ne!(diff_layers[0].tabs[0].content, plain_layers[0].tabs[0].content);
    }

    #[test]
    fn recompute_unknown_action_not_found() {
        let mut driver = CodecDriver::new().unwrap();
        let request = RecomputeRequest {
            action: "Mystery Stage".into(),
            params: params(),
            inputs: Vec::new(),
        };
        let outcome = driver.recompute(&request, &SessionContext::default());
        assert!(matches!(outcome, Err(CodecError::ActionNotFound)));

        let envelope = ReturnResult::from_outcome(&outcome);
        assert_eq!(envelope.status, "Fail");
        assert_eq!(envelope.data, "Action not found");
    }

    #[test]
    fn recompute_mid_chain_preserves_upstream_results() {
        let mut driver = CodecDriver::new().unwrap();
        let ctx = SessionContext {
            working_image_path: Some(write_tile("working4.txt", &ramp_tile())),
            previous_frame_path: None,
        };
        driver
            .encode(&EncodeRequest { params: params() }, &ctx)
            .unwrap();

        let quant_before = driver.layer_panel(stage_names::QUANTIZATION);
        let entropy_before = driver.layer_panel(stage_names::ENTROPY_ENCODE);

        // Hand the differencing stage an edited all-zero input.
        let zero = Tile::zeroed(8, 8).to_strings(crate::serialize::default_serializer());
        let request = RecomputeRequest {
            action: stage_names::SUB_BAND_DIFFING.into(),
            params: params(),
            inputs: vec![[zero.y, zero.cb, zero.cr]],
        };
        driver.recompute(&request, &ctx).unwrap();

        assert_eq!(driver.layer_panel(stage_names::QUANTIZATION), quant_before);
        assert_ne!(driver.layer_panel(stage_names::ENTROPY_ENCODE), entropy_before);
    }

    #[test]
    fn recompute_applies_fixed_point_shift() {
        let mut driver = CodecDriver::new().unwrap();
        // 64 in 11.5 fixed point is 2 in the integer domain.
        let plane = vec!["64".to_string(); 3].join(" ");
        let mut p = params();
        p.use_data_format = DataFormat::FixedPoint11_5;
        let request = RecomputeRequest {
            action: stage_names::PROGRESSIVE_QUANTIZATION.into(),
            params: p,
            inputs: vec![[plane.clone(), plane.clone(), plane]],
        };
        driver.recompute(&request, &SessionContext::default()).unwrap();

        let layers = driver.input_panel(stage_names::PROGRESSIVE_QUANTIZATION);
        assert!(layers[0].tabs[0].content.split_whitespace().all(|t| t == "2"));
    }

    #[test]
    fn envelope_shapes() {
        let ok = ReturnResult::success("Success");
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({"status": "Success", "data": "Success"})
        );
        let fail = ReturnResult::fail("boom");
        assert_eq!(fail.status, "Fail");
        assert_eq!(fail.data, "boom");
    }
}
