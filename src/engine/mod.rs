//! The search engine: configuration, node graph, report types, and the
//! [`Magic`] entry point.
//!
//! Construction compiles the packaged catalogues and is the only place a
//! packaging defect can fail; [`Magic::analyze`] afterwards returns `Err`
//! solely for configuration mistakes (a bad crib regex, zero budgets).
//! Everything that can go wrong during a search (host operation failures,
//! exhausted budgets, cancellation) is reported through flags and counters
//! on the [`AnalysisReport`], never as an error.

mod search;

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::buffer::ByteBuffer;
use crate::ops::{DataType, OpArg, OperationRegistry};
use crate::score::{Crib, Score};
use crate::sigs::{EncodingHit, FileTypeMatch, SignatureCatalogue};

// ── Defaults and tuning constants ────────────────────────────────────────────

pub const DEFAULT_DEPTH:      usize = 3;
pub const DEFAULT_MAX_NODES:  usize = 10_000;
pub const DEFAULT_KEEP_TOP_K: usize = 200;

/// How much worse than its parent a child's rank may be and still stay
/// expandable outside intensive mode.  Slightly positive so that detective
/// steps which preserve their input (and therefore its rank) survive.
pub const RANK_SLACK: f64 = 0.5;

/// Preview length caps: characters for UTF-8 buffers, bytes for hex dumps.
pub const PREVIEW_MAX_CHARS: usize = 96;
pub const PREVIEW_MAX_BYTES: usize = 48;

// ── Configuration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MagicConfig {
    /// Maximum recipe length.
    pub depth: usize,
    /// Explore operations without a usefulness hint and keep non-improving
    /// children.
    pub intensive: bool,
    /// Widen codepage and script coverage for language detection.
    pub extensive_language_support: bool,
    /// Target regex; a matching buffer is always interesting.
    pub crib_regex: Option<String>,
    /// Hard cap on nodes created across the whole search.
    pub max_nodes: usize,
    /// Frontier budget per depth.
    pub keep_top_k: usize,
}

impl Default for MagicConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            intensive: false,
            extensive_language_support: false,
            crib_regex: None,
            max_nodes: DEFAULT_MAX_NODES,
            keep_top_k: DEFAULT_KEEP_TOP_K,
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid crib regex: {0}")]
    InvalidCrib(#[from] regex::Error),
    #[error("signature catalogue failed to build: {0}")]
    Catalogue(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

// ── Cancellation and progress ────────────────────────────────────────────────

/// Cooperative cancellation; checked between expansions.
pub trait CancelToken {
    fn is_cancelled(&self) -> bool;
}

impl CancelToken for std::sync::atomic::AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(std::sync::atomic::Ordering::Relaxed)
    }
}

/// Progress callback: `(nodes_created, max_nodes)`, called after each
/// created node.
pub type ProgressFn<'a> = dyn FnMut(usize, usize) + 'a;

// ── Node graph ───────────────────────────────────────────────────────────────

/// Node lifecycle.  `Scored` nodes are candidates-eligible; `Pruned` nodes
/// stay in the arena but are never expanded.  Cycle and operation-error
/// children are rejected before a node exists and show up only in counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Scored,
    Expanding,
    Expanded,
    Pruned,
}

/// The operation application that produced a node.
#[derive(Debug, Clone)]
pub struct Producer {
    /// Registration index in the registry, used as a ranking tiebreak.
    pub op_index: usize,
    pub name:     String,
    pub args:     Vec<OpArg>,
}

/// One reached state in the search graph.
#[derive(Debug)]
pub struct MagicNode {
    pub buffer:      ByteBuffer,
    pub parent:      Option<usize>,
    pub producer:    Option<Producer>,
    pub depth:       usize,
    /// Observed or declared type of the buffer; drives operation listing.
    pub dtype:       DataType,
    pub score:       Score,
    pub file_type:   Option<FileTypeMatch>,
    /// Hash of the buffer plus the producing step; cycle/duplicate key.
    pub fingerprint: u64,
    pub state:       NodeState,
}

// ── Report ───────────────────────────────────────────────────────────────────

/// One step of a recipe: an operation name and its argument vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeStep {
    pub op:   String,
    pub args: Vec<OpArg>,
}

/// One ranked interpretation of the input.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    /// Operations applied from the root, in order.  Empty for the root.
    pub recipe:        Vec<RecipeStep>,
    pub detected_type: Option<FileTypeMatch>,
    pub encodings:     Vec<EncodingHit>,
    pub score:         Score,
    /// Truncated display form of the terminal buffer: UTF-8 when valid,
    /// hex otherwise.
    pub preview:       String,
    /// Full terminal buffer content.
    pub data:          Vec<u8>,
    pub fingerprint:   u64,
    pub interesting:   bool,
}

/// The complete result of one `analyze` call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReport {
    /// Candidates sorted by ascending rank (depth, registration order and
    /// operation name as tiebreaks).
    pub candidates:    Vec<Candidate>,
    /// The node budget stopped the search while work remained.
    pub truncated:     bool,
    /// The cancellation token fired; candidates are best-so-far.
    pub cancelled:     bool,
    pub nodes_created: usize,
    /// Per-operation invocation failure counts.
    pub op_errors:     BTreeMap<String, usize>,
}

impl AnalysisReport {
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

// ── Entry point ──────────────────────────────────────────────────────────────

/// The analyzer: owns the compiled catalogues and the language crib, both
/// immutable after construction, so independent `analyze` calls may run
/// concurrently on distinct inputs.
pub struct Magic {
    sigs: SignatureCatalogue,
    crib: Crib,
}

impl Magic {
    /// Compile the packaged catalogues.
    pub fn new() -> Result<Self, EngineError> {
        let sigs = SignatureCatalogue::new().map_err(EngineError::Catalogue)?;
        Ok(Self { sigs, crib: Crib::new() })
    }

    pub fn catalogue(&self) -> &SignatureCatalogue {
        &self.sigs
    }

    /// Run a search to completion.  See [`Magic::analyze_with`] for the
    /// full surface.
    pub fn analyze(
        &self,
        input: &[u8],
        registry: &dyn OperationRegistry,
        config: &MagicConfig,
    ) -> Result<AnalysisReport, EngineError> {
        self.analyze_with(input, registry, config, None, None)
    }

    /// Run a search with optional cooperative cancellation and a progress
    /// callback.
    ///
    /// # Errors
    /// Only configuration problems error: an invalid `crib_regex` or a zero
    /// node/frontier budget.  All runtime failures surface as flags and
    /// counters on the report.
    pub fn analyze_with(
        &self,
        input: &[u8],
        registry: &dyn OperationRegistry,
        config: &MagicConfig,
        cancel: Option<&dyn CancelToken>,
        progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<AnalysisReport, EngineError> {
        if config.max_nodes == 0 {
            return Err(EngineError::InvalidConfig("max_nodes must be at least 1".to_string()));
        }
        if config.keep_top_k == 0 {
            return Err(EngineError::InvalidConfig("keep_top_k must be at least 1".to_string()));
        }

        let crib: Cow<'_, Crib> = match &config.crib_regex {
            Some(pattern) => {
                let mut crib = self.crib.clone();
                crib.set_target(pattern)?;
                Cow::Owned(crib)
            }
            None => Cow::Borrowed(&self.crib),
        };

        Ok(search::run(&self.sigs, &crib, registry, input, config, cancel, progress))
    }
}
