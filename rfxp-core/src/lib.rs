//! # rfxp-core
//!
//! Core library for the RemoteFX-progressive codec inspection tool.
//!
//! This crate contains:
//! - **Tiles**: [`Tile`] — three-plane sample buffers with text serialization
//! - **Serializers**: integer / hex plane grammars and the wire [`DataFormat`]
//! - **Parameters**: typed quantization and entropy parameter sets
//! - **Pipeline**: the staged encode tree with partial recomputation
//! - **Layers**: per-layer panel export for inspection UIs
//! - **Driver**: request assembly and encode/recompute orchestration
//! - **Error**: [`CodecError`] — typed, `thiserror`-based error hierarchy

pub mod driver;
pub mod error;
pub mod frame;
pub mod layers;
pub mod param;
pub mod pipeline;
pub mod serialize;
pub mod tile;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use driver::{
    CodecDriver, CodecParams, EncodeRequest, PanelRequest, RecomputeRequest, ReturnResult,
    stage_names,
};
pub use error::CodecError;
pub use frame::{SessionContext, previous_frame_reference};
pub use layers::{LayerPanel, PanelSide, TabView, export_layers};
pub use param::{
    BAND_COUNT, EntropyAlgorithm, ProgressiveQuantizationFactors, QuantizationFactors,
    StageParams,
};
pub use pipeline::{ExecutionRecord, Pipeline, Stage, StageId, StageKind};
pub use serialize::{
    DataFormat, HexSerializer, IntegerSerializer, TileSerializer, default_serializer,
};
pub use tile::{PLANE_NAMES, Tile, Triplet};
