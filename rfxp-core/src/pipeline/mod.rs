//! The stage tree and its execution engine.
//!
//! A [`Pipeline`] is an arena of named [`Stage`] nodes. The root is a
//! composite whose ordered children form the encode chain; executing a
//! composite cascades each child's result into the next child's input.
//!
//! Every run produces immutable [`ExecutionRecord`]s tagged with a
//! monotonic revision, and records are committed only after a whole
//! operation succeeds — a failed or abandoned recompute leaves every
//! node's visible state untouched. Mutating a stage's parameters
//! without re-running it leaves its record stale, which
//! [`Pipeline::is_stale`] makes detectable.

use std::fmt;

use crate::error::CodecError;
use crate::param::StageParams;
use crate::tile::Tile;

pub(crate) mod stages;

// ── StageId ──────────────────────────────────────────────────────

/// Arena index of a stage node. Valid only for the pipeline that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageId(usize);

// ── StageKind ────────────────────────────────────────────────────

/// The transform a stage applies. Each kind declares its input arity;
/// the transforms themselves live in [`stages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// Composite: runs its children in order, feeding results forward.
    /// With no children it passes its input through.
    Sequence,
    /// RGB → YCbCr conversion.
    ColorConvert,
    /// Three-level wavelet.
    Dwt,
    /// Per-band coefficient quantization.
    Quantize,
    /// Band-order linearization.
    Linearize,
    /// Temporal differencing against the previous frame.
    SubBandDiff,
    /// One quantized tile per progressive layer.
    ProgressiveQuantize,
    /// Terminal entropy pre-coding, one coded/raw pair per layer.
    EntropyEncode,
}

impl StageKind {
    fn arity(self) -> Arity {
        match self {
            StageKind::Sequence | StageKind::EntropyEncode => Arity::AtLeast(1),
            _ => Arity::Exactly(1),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

// ── ExecutionRecord ──────────────────────────────────────────────

/// Snapshot of one stage run: the inputs it was fed, the tiles it
/// produced, and the pipeline revision it was committed under.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    pub input: Vec<Tile>,
    pub result: Vec<Tile>,
    pub revision: u64,
}

// ── Stage ────────────────────────────────────────────────────────

/// One node of the pipeline tree.
#[derive(Debug)]
pub struct Stage {
    name: String,
    kind: StageKind,
    params: StageParams,
    children: Vec<StageId>,
    record: Option<ExecutionRecord>,
    params_revision: u64,
}

impl Stage {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn params(&self) -> &StageParams {
        &self.params
    }

    pub fn children(&self) -> &[StageId] {
        &self.children
    }

    /// The most recent committed run, if any.
    pub fn record(&self) -> Option<&ExecutionRecord> {
        self.record.as_ref()
    }

    fn check_arity(&self, actual: usize) -> Result<(), CodecError> {
        let arity = self.kind.arity();
        let ok = match arity {
            Arity::Exactly(n) => actual == n,
            Arity::AtLeast(n) => actual >= n,
        };
        if ok {
            Ok(())
        } else {
            Err(CodecError::Arity {
                stage: self.name.clone(),
                expected: arity.to_string(),
                actual,
            })
        }
    }
}

// ── Pipeline ─────────────────────────────────────────────────────

/// Arena of stages plus the execution engine.
#[derive(Debug)]
pub struct Pipeline {
    stages: Vec<Stage>,
    root: StageId,
    revision: u64,
}

impl Pipeline {
    /// A pipeline holding only a composite root.
    pub fn new(root_name: impl Into<String>) -> Self {
        let root = Stage {
            name: root_name.into(),
            kind: StageKind::Sequence,
            params: StageParams::default(),
            children: Vec::new(),
            record: None,
            params_revision: 0,
        };
        Self {
            stages: vec![root],
            root: StageId(0),
            revision: 0,
        }
    }

    pub fn root(&self) -> StageId {
        self.root
    }

    /// Append a stage under `parent`.
    ///
    /// Stage names are unique across the whole pipeline; a repeat
    /// fails with [`CodecError::DuplicateStage`], which keeps name
    /// lookup unambiguous at every level.
    pub fn add_stage(
        &mut self,
        parent: StageId,
        name: impl Into<String>,
        kind: StageKind,
        params: StageParams,
    ) -> Result<StageId, CodecError> {
        let name = name.into();
        if self.stages.iter().any(|s| s.name == name) {
            return Err(CodecError::DuplicateStage(name));
        }
        let id = StageId(self.stages.len());
        self.stages.push(Stage {
            name,
            kind,
            params,
            children: Vec::new(),
            record: None,
            params_revision: 0,
        });
        self.stages[parent.0].children.push(id);
        Ok(id)
    }

    pub fn stage(&self, id: StageId) -> &Stage {
        &self.stages[id.0]
    }

    /// Locate a stage by name — a linear search over the root's
    /// immediate children, in pipeline order. Deeper levels are not
    /// searched.
    pub fn find(&self, name: &str) -> Option<StageId> {
        self.stages[self.root.0]
            .children
            .iter()
            .copied()
            .find(|id| self.stages[id.0].name == name)
    }

    /// Mutable access to a stage's parameters.
    ///
    /// Bumps the revision: until the stage runs again, its record is
    /// reported stale by [`is_stale`](Self::is_stale).
    pub fn params_mut(&mut self, id: StageId) -> &mut StageParams {
        self.revision += 1;
        let stage = &mut self.stages[id.0];
        stage.params_revision = self.revision;
        &mut stage.params
    }

    /// Whether a stage's record predates its current parameters.
    pub fn is_stale(&self, id: StageId) -> bool {
        let stage = &self.stages[id.0];
        match &stage.record {
            Some(record) => record.revision < stage.params_revision,
            None => false,
        }
    }

    /// Current pipeline revision. Bumped by parameter mutation and by
    /// every committed run.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The inputs most recently fed to a stage.
    pub fn input(&self, id: StageId) -> Option<&[Tile]> {
        self.stages[id.0].record.as_ref().map(|r| r.input.as_slice())
    }

    /// The tiles a stage most recently produced.
    pub fn result(&self, id: StageId) -> Option<&[Tile]> {
        self.stages[id.0]
            .record
            .as_ref()
            .map(|r| r.result.as_slice())
    }

    /// Run the whole pipeline from the root and return the final
    /// tiles. Records for every stage are committed atomically on
    /// success; on error nothing changes.
    pub fn execute(&mut self, inputs: Vec<Tile>) -> Result<Vec<Tile>, CodecError> {
        let mut pending = Vec::new();
        let out = self.run_tree(self.root, inputs, &mut pending)?;
        self.commit(pending);
        Ok(out)
    }

    /// Re-run one named stage with fresh inputs, then cascade through
    /// every later sibling with its existing parameters.
    ///
    /// An unknown name fails with [`CodecError::ActionNotFound`] before
    /// anything runs; a mid-cascade error discards the entire staged
    /// run. Either way no node state is mutated on failure.
    pub fn recompute(&mut self, name: &str, inputs: Vec<Tile>) -> Result<Vec<Tile>, CodecError> {
        let Some(target) = self.find(name) else {
            return Err(CodecError::ActionNotFound);
        };

        let mut pending = Vec::new();
        let mut current = self.run_tree(target, inputs, &mut pending)?;

        let order = self.stages[self.root.0].children.clone();
        let mut following = false;
        for &sibling in &order {
            if following {
                current = self.run_tree(sibling, current, &mut pending)?;
            } else if sibling == target {
                following = true;
            }
        }

        self.commit(pending);
        Ok(current)
    }

    // ── Internal ─────────────────────────────────────────────────

    /// Execute one subtree, pushing a pending record per visited node.
    fn run_tree(
        &self,
        id: StageId,
        inputs: Vec<Tile>,
        pending: &mut Vec<(StageId, ExecutionRecord)>,
    ) -> Result<Vec<Tile>, CodecError> {
        let stage = &self.stages[id.0];
        stage.check_arity(inputs.len())?;

        let result = if stage.children.is_empty() {
            stages::run(stage.kind, &stage.params, &inputs)?
        } else {
            let mut current = inputs.clone();
            for &child in &stage.children {
                current = self.run_tree(child, current, pending)?;
            }
            current
        };

        pending.push((
            id,
            ExecutionRecord {
                input: inputs,
                result: result.clone(),
                revision: 0,
            },
        ));
        Ok(result)
    }

    fn commit(&mut self, pending: Vec<(StageId, ExecutionRecord)>) {
        self.revision += 1;
        for (id, mut record) in pending {
            record.revision = self.revision;
            self.stages[id.0].record = Some(record);
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
