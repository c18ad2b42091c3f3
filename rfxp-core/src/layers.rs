//! Per-layer panel rendering for the viewer's inspection panes.
//!
//! Each layer is shown as a set of tabs, one per plane, with the plane
//! text rendered by the default serializer. The terminal entropy stage
//! gets a special layout: its output pairs every layer after the first
//! pass with a raw companion tile at the following index.

use serde::Serialize;

use crate::pipeline::{Pipeline, StageKind};
use crate::serialize::default_serializer;
use crate::tile::{PLANE_NAMES, Tile};

// ── View types ───────────────────────────────────────────────────

/// Which side of a stage to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelSide {
    /// The tiles most recently fed to the stage (editable in the UI).
    Input,
    /// The tiles the stage most recently produced.
    Output,
}

/// One tab of plane text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub editable: bool,
}

/// One logical layer with its plane tabs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerPanel {
    pub id: String,
    pub title: String,
    pub tabs: Vec<TabView>,
}

// ── Export ───────────────────────────────────────────────────────

/// Render the named stage's tiles as per-layer panels.
///
/// A missing stage, or a stage that has not produced a result yet,
/// yields an empty list — never an error.
pub fn export_layers(pipeline: &Pipeline, name: &str, side: PanelSide) -> Vec<LayerPanel> {
    let Some(id) = pipeline.find(name) else {
        return Vec::new();
    };
    if pipeline.result(id).is_none() {
        return Vec::new();
    }
    let data = match side {
        PanelSide::Input => pipeline.input(id),
        PanelSide::Output => pipeline.result(id),
    };
    let Some(data) = data else {
        return Vec::new();
    };

    let editable = side == PanelSide::Input;
    let formed = name.replace([' ', '/'], "-");

    if pipeline.stage(id).kind() == StageKind::EntropyEncode && !editable {
        entropy_layers(&formed, data, editable)
    } else {
        data.iter()
            .enumerate()
            .map(|(index, tile)| {
                layer_panel(&formed, index, format!("Layer {index}"), tile, None, editable)
            })
            .collect()
    }
}

/// First-pass layer at index 0, then (coded, raw) pairs at consecutive
/// indices, each pair displayed as one layer.
fn entropy_layers(formed: &str, data: &[Tile], editable: bool) -> Vec<LayerPanel> {
    let mut layers = Vec::new();

    if let Some(first) = data.first() {
        layers.push(layer_panel(formed, 0, "Layer 0".into(), first, None, editable));
    }
    for index in (1..data.len()).step_by(2) {
        let Some(raw) = data.get(index + 1) else {
            break;
        };
        layers.push(layer_panel(
            formed,
            index,
            format!("Layer {}", (index + 1) / 2),
            &data[index],
            Some(raw),
            editable,
        ));
    }

    layers
}

fn layer_panel(
    formed: &str,
    index: usize,
    title: String,
    tile: &Tile,
    raw: Option<&Tile>,
    editable: bool,
) -> LayerPanel {
    let side_token = if editable { "input" } else { "output" };
    let prefix = format!("{formed}-{side_token}-layer-{index}");

    let strings = tile.to_strings(default_serializer());
    let raw_strings = raw.map(|t| t.to_strings(default_serializer()));

    let mut tabs = Vec::new();
    for (plane, plane_name) in PLANE_NAMES.iter().enumerate() {
        tabs.push(TabView {
            id: format!("{prefix}-{plane_name}"),
            title: (*plane_name).to_string(),
            content: strings.as_array()[plane].clone(),
            editable,
        });
        if let Some(raw_strings) = &raw_strings {
            tabs.push(TabView {
                id: format!("{prefix}-raw-{plane_name}"),
                title: format!("{plane_name} Raw Data"),
                content: raw_strings.as_array()[plane].clone(),
                editable,
            });
        }
    }

    LayerPanel {
        id: prefix,
        title,
        tabs,
    }
}

// ── Tests ────────────────────────────────────────────────────────
