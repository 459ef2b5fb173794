//! The bounded per-depth frontier search.
//!
//! # Algorithm
//!
//! 1. Score the root and seed the depth-0 frontier.
//! 2. At each depth below the budget, expand every frontier node in rank
//!    order: enumerate type-compatible operations, gather argument vectors
//!    (defaults plus fired pattern hints), invoke the host, and score each
//!    child.  Children repeating a fingerprint on their own path (cycle) or
//!    anywhere in the search (duplicate) are rejected; children that fail to
//!    improve on their parent by more than [`RANK_SLACK`] are kept in the
//!    arena but not expanded, unless intensive mode is on.
//! 3. Sort the next frontier by rank and truncate it to `keep_top_k`.
//! 4. Stop on depth, an empty frontier, the `max_nodes` budget (sets
//!    `truncated`), or cancellation (sets `cancelled`).
//!
//! Candidates are the interesting non-root nodes; when none exist the single
//! best-ranked node (the root included) is returned so the caller always
//! sees something for non-empty input.
//!
//! Host operation errors are counted per operation and never propagate.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::{debug, trace};

use super::{
    AnalysisReport, CancelToken, Candidate, MagicConfig, MagicNode, NodeState, Producer,
    ProgressFn, RecipeStep, PREVIEW_MAX_BYTES, PREVIEW_MAX_CHARS, RANK_SLACK,
};
use crate::buffer::ByteBuffer;
use crate::ops::{DataType, OpArg, OperationRegistry};
use crate::score::{rank_order, Crib, Score};
use crate::sigs::SignatureCatalogue;

pub(super) fn run(
    sigs: &SignatureCatalogue,
    crib: &Crib,
    registry: &dyn OperationRegistry,
    input: &[u8],
    config: &MagicConfig,
    cancel: Option<&dyn CancelToken>,
    mut progress: Option<&mut ProgressFn<'_>>,
) -> AnalysisReport {
    let mut report = AnalysisReport::default();
    if input.is_empty() {
        debug!("empty input, nothing to analyze");
        return report;
    }

    let extensive = config.extensive_language_support;
    let mut arena: Vec<MagicNode> = Vec::new();
    let mut seen: HashSet<u64> = HashSet::new();
    let mut cycles = 0usize;
    let mut duplicates = 0usize;

    let root = make_node(ByteBuffer::from(input), None, None, None, 0, sigs, crib, extensive);
    debug!(
        len = input.len(),
        depth = config.depth,
        intensive = config.intensive,
        root_type = ?root.dtype,
        root_rank = root.score.rank,
        "search start"
    );
    seen.insert(root.fingerprint);
    arena.push(root);

    let mut frontier: Vec<usize> = vec![0];

    'depths: for d in 0..config.depth {
        if frontier.is_empty() {
            break;
        }
        frontier.sort_by(|&a, &b| node_order(&arena[a], &arena[b]));
        let mut next: Vec<usize> = Vec::new();

        for &parent_idx in &frontier {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    report.cancelled = true;
                    debug!("cancelled between expansions");
                    break 'depths;
                }
            }

            arena[parent_idx].state = NodeState::Expanding;
            let parent_type = arena[parent_idx].dtype;
            let parent_rank = arena[parent_idx].score.rank;
            let parent_buffer = arena[parent_idx].buffer.clone();

            for (op_index, desc) in registry.list_by_input_type(parent_type) {
                let fired = desc.fired_hints(parent_buffer.as_bytes());
                let hint_makes_useful = fired.iter().any(|h| h.useful);
                if !config.intensive && !desc.magic_useful && !hint_makes_useful {
                    continue;
                }

                // Defaults first, then every fired hint vector, deduplicated.
                let mut vectors: Vec<Vec<OpArg>> = vec![desc.default_args.clone()];
                for hint in &fired {
                    if !vectors.contains(&hint.args) {
                        vectors.push(hint.args.clone());
                    }
                }

                for args in vectors {
                    if arena.len() >= config.max_nodes {
                        report.truncated = true;
                        debug!(nodes = arena.len(), "node budget exhausted");
                        break 'depths;
                    }

                    let child_buffer = match registry.invoke(&desc.name, &args, &parent_buffer) {
                        Ok(b) => b,
                        Err(e) => {
                            *report.op_errors.entry(desc.name.clone()).or_insert(0) += 1;
                            trace!(op = %desc.name, error = %e, "operation failed, child discarded");
                            continue;
                        }
                    };

                    let fp = fingerprint(&child_buffer, &desc.name, &args);
                    if on_path(&arena, parent_idx, fp) {
                        cycles += 1;
                        trace!(op = %desc.name, "cycle rejected");
                        continue;
                    }
                    if !seen.insert(fp) {
                        duplicates += 1;
                        trace!(op = %desc.name, "duplicate rejected");
                        continue;
                    }

                    let producer = Producer { op_index, name: desc.name.clone(), args };
                    let mut child = make_node(
                        child_buffer,
                        Some(parent_idx),
                        Some(producer),
                        Some(desc.output),
                        d + 1,
                        sigs,
                        crib,
                        extensive,
                    );

                    let keep = config.intensive
                        || rank_order(child.score.rank, parent_rank + RANK_SLACK) == Ordering::Less;
                    if !keep {
                        child.state = NodeState::Pruned;
                    }
                    trace!(
                        op = %child.producer.as_ref().map(|p| p.name.as_str()).unwrap_or(""),
                        rank = child.score.rank,
                        kept = keep,
                        "child scored"
                    );

                    let child_idx = arena.len();
                    arena.push(child);
                    if keep {
                        next.push(child_idx);
                    }
                    if let Some(cb) = progress.as_mut() {
                        cb(arena.len(), config.max_nodes);
                    }
                }
            }

            arena[parent_idx].state = NodeState::Expanded;
        }

        next.sort_by(|&a, &b| node_order(&arena[a], &arena[b]));
        if next.len() > config.keep_top_k {
            for &idx in &next[config.keep_top_k..] {
                arena[idx].state = NodeState::Pruned;
            }
            next.truncate(config.keep_top_k);
        }
        frontier = next;
    }

    report.nodes_created = arena.len();
    debug!(
        nodes = arena.len(),
        cycles,
        duplicates,
        truncated = report.truncated,
        cancelled = report.cancelled,
        "search complete"
    );

    // Interesting non-root nodes; the root alone says nothing beyond "this
    // is your input".  When nothing qualifies, fall back to the single
    // best-ranked node so non-empty input always yields one candidate.
    let mut picks: Vec<usize> = (1..arena.len())
        .filter(|&i| arena[i].score.is_interesting())
        .collect();
    if picks.is_empty() {
        if let Some(best) = (0..arena.len()).min_by(|&a, &b| node_order(&arena[a], &arena[b])) {
            picks.push(best);
        }
    }
    picks.sort_by(|&a, &b| node_order(&arena[a], &arena[b]));

    report.candidates = picks
        .into_iter()
        .map(|idx| build_candidate(&arena, idx, sigs, extensive))
        .collect();
    report
}

// ── Node construction ────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn make_node(
    buffer: ByteBuffer,
    parent: Option<usize>,
    producer: Option<Producer>,
    declared_output: Option<DataType>,
    depth: usize,
    sigs: &SignatureCatalogue,
    crib: &Crib,
    extensive: bool,
) -> MagicNode {
    // A RawBytes output may turn out to be text; refine by observation so
    // decode chains can continue.  Narrower declarations are kept as-is.
    let dtype = match declared_output {
        None | Some(DataType::RawBytes) => DataType::detect(&buffer),
        Some(declared) => declared,
    };
    let file_type = sigs.identify(&buffer);
    let score = Score::of(&buffer, crib, extensive, file_type.is_some());
    let fingerprint = match &producer {
        Some(p) => fingerprint(&buffer, &p.name, &p.args),
        None => fingerprint(&buffer, "", &[]),
    };
    MagicNode {
        buffer,
        parent,
        producer,
        depth,
        dtype,
        score,
        file_type,
        fingerprint,
        state: NodeState::Scored,
    }
}

/// Hash of the buffer content plus the step that produced it.
///
/// Including the producing step keeps an output-preserving detective step
/// distinguishable from its parent, while a decode/encode loop collides one
/// level after it closes.
fn fingerprint(buffer: &ByteBuffer, op: &str, args: &[OpArg]) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&buffer.hash64().to_le_bytes());
    hasher.update(op.as_bytes());
    for arg in args {
        hasher.update(&[0x1F]);
        hasher.update(arg.to_string().as_bytes());
    }
    let digest = hasher.finalize();
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(word)
}

fn on_path(arena: &[MagicNode], mut idx: usize, fp: u64) -> bool {
    loop {
        if arena[idx].fingerprint == fp {
            return true;
        }
        match arena[idx].parent {
            Some(parent) => idx = parent,
            None => return false,
        }
    }
}

// ── Ordering ─────────────────────────────────────────────────────────────────

/// Rank ascending (NaN last), then shallower, then earlier registration,
/// then operation name.
fn node_order(a: &MagicNode, b: &MagicNode) -> Ordering {
    rank_order(a.score.rank, b.score.rank)
        .then_with(|| a.depth.cmp(&b.depth))
        .then_with(|| producer_key(a).cmp(&producer_key(b)))
}

fn producer_key(node: &MagicNode) -> (usize, &str) {
    node.producer
        .as_ref()
        .map(|p| (p.op_index, p.name.as_str()))
        .unwrap_or((usize::MAX, ""))
}

// ── Candidate assembly ───────────────────────────────────────────────────────

fn build_candidate(
    arena: &[MagicNode],
    idx: usize,
    sigs: &SignatureCatalogue,
    extensive: bool,
) -> Candidate {
    let node = &arena[idx];

    let mut recipe = Vec::new();
    let mut cursor = idx;
    loop {
        let n = &arena[cursor];
        if let Some(p) = &n.producer {
            recipe.push(RecipeStep { op: p.name.clone(), args: p.args.clone() });
        }
        match n.parent {
            Some(parent) => cursor = parent,
            None => break,
        }
    }
    recipe.reverse();

    Candidate {
        recipe,
        detected_type: node.file_type.clone(),
        encodings: sigs.detect_encodings(&node.buffer, extensive),
        score: node.score.clone(),
        preview: preview_of(&node.buffer),
        data: node.buffer.as_bytes().to_vec(),
        fingerprint: node.fingerprint,
        interesting: node.score.is_interesting(),
    }
}

fn preview_of(buffer: &ByteBuffer) -> String {
    match buffer.try_as_utf8() {
        Some(text) => text.chars().take(PREVIEW_MAX_CHARS).collect(),
        None => hex::encode(&buffer.as_bytes()[..buffer.len().min(PREVIEW_MAX_BYTES)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Magic;
    use crate::ops::{OpError, OperationDescriptor, TableRegistry};

    fn engine() -> Magic {
        Magic::new().expect("catalogues compile")
    }

    /// A registry with one self-inverse operation, to exercise cycle and
    /// duplicate rejection without the builtin table.
    fn involution_registry() -> TableRegistry {
        let mut reg = TableRegistry::new();
        reg.register(
            OperationDescriptor::new("Flip Bits", DataType::RawBytes, DataType::RawBytes)
                .useful(true),
            |_args, input| {
                let flipped: Vec<u8> = input.as_bytes().iter().map(|b| !b).collect();
                Ok(ByteBuffer::new(flipped))
            },
        );
        reg
    }

    #[test]
    fn involution_terminates_via_cycle_rejection() {
        let magic = engine();
        let config = MagicConfig { depth: 6, intensive: true, ..Default::default() };
        let report = magic
            .analyze(b"\x00\x01\x02\x03", &involution_registry(), &config)
            .unwrap();
        // root, flipped, flipped-back; the third application repeats the
        // first fingerprint on its own path and is rejected.
        assert_eq!(report.nodes_created, 3);
        assert!(!report.truncated);
    }

    #[test]
    fn recipes_never_exceed_depth() {
        let magic = engine();
        let registry = crate::ops::builtin::standard_registry().unwrap();
        let config = MagicConfig { depth: 2, intensive: true, ..Default::default() };
        let report = magic.analyze(b"41 42 43 44 45", &registry, &config).unwrap();
        for c in &report.candidates {
            assert!(c.recipe.len() <= 2, "recipe too long: {:?}", c.recipe);
        }
    }

    #[test]
    fn candidates_sorted_by_rank() {
        let magic = engine();
        let registry = crate::ops::builtin::standard_registry().unwrap();
        let config = MagicConfig { intensive: true, ..Default::default() };
        let report = magic.analyze(b"41 42 43 44 45", &registry, &config).unwrap();
        for pair in report.candidates.windows(2) {
            assert!(
                rank_order(pair[0].score.rank, pair[1].score.rank) != Ordering::Greater,
                "candidates out of order"
            );
        }
    }

    #[test]
    fn erroring_host_leaves_root_only() {
        let mut reg = TableRegistry::new();
        reg.register(
            OperationDescriptor::new("Always Fails", DataType::RawBytes, DataType::RawBytes)
                .useful(true),
            |_args, _input| Err(OpError::Failed("nope".to_string())),
        );

        let magic = engine();
        let report = magic
            .analyze(b"some input", &reg, &MagicConfig::default())
            .unwrap();
        assert_eq!(report.nodes_created, 1);
        assert!(!report.truncated);
        assert_eq!(report.op_errors.get("Always Fails"), Some(&1));
        // Root is the fallback candidate, with an empty recipe.
        assert_eq!(report.candidates.len(), 1);
        assert!(report.candidates[0].recipe.is_empty());
    }

    #[test]
    fn max_nodes_one_scores_only_root() {
        let magic = engine();
        let registry = crate::ops::builtin::standard_registry().unwrap();
        let config = MagicConfig { max_nodes: 1, ..Default::default() };
        let report = magic.analyze(b"41 42 43 44 45", &registry, &config).unwrap();
        assert_eq!(report.nodes_created, 1);
        assert!(report.truncated);
    }

    #[test]
    fn depth_zero_keeps_root_recipe_empty() {
        let magic = engine();
        let registry = crate::ops::builtin::standard_registry().unwrap();
        let config = MagicConfig { depth: 0, ..Default::default() };
        let report = magic.analyze(b"41 42 43 44 45", &registry, &config).unwrap();
        assert_eq!(report.nodes_created, 1);
        assert_eq!(report.candidates.len(), 1);
        assert!(report.candidates[0].recipe.is_empty());
        assert!(!report.truncated);
    }

    #[test]
    fn cancellation_returns_best_so_far() {
        use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

        let token = AtomicBool::new(false);
        token.store(true, AtomicOrdering::Relaxed);

        let magic = engine();
        let registry = crate::ops::builtin::standard_registry().unwrap();
        let report = magic
            .analyze_with(
                b"41 42 43 44 45",
                &registry,
                &MagicConfig::default(),
                Some(&token),
                None,
            )
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.nodes_created, 1);
    }

    #[test]
    fn progress_callback_fires() {
        let magic = engine();
        let registry = crate::ops::builtin::standard_registry().unwrap();
        let mut calls = 0usize;
        let mut cb = |created: usize, budget: usize| {
            calls += 1;
            assert!(created <= budget);
        };
        let report = magic
            .analyze_with(
                b"41 42 43 44 45",
                &registry,
                &MagicConfig::default(),
                None,
                Some(&mut cb),
            )
            .unwrap();
        assert!(report.nodes_created > 1);
        assert_eq!(calls, report.nodes_created - 1); // one call per child
    }

    #[test]
    fn invalid_crib_is_a_config_error() {
        let magic = engine();
        let registry = crate::ops::builtin::standard_registry().unwrap();
        let config = MagicConfig { crib_regex: Some("(unclosed".to_string()), ..Default::default() };
        assert!(matches!(
            magic.analyze(b"anything", &registry, &config),
            Err(crate::engine::EngineError::InvalidCrib(_))
        ));
    }

    #[test]
    fn zero_budgets_are_config_errors() {
        let magic = engine();
        let registry = crate::ops::builtin::standard_registry().unwrap();
        let bad_nodes = MagicConfig { max_nodes: 0, ..Default::default() };
        assert!(magic.analyze(b"x", &registry, &bad_nodes).is_err());
        let bad_k = MagicConfig { keep_top_k: 0, ..Default::default() };
        assert!(magic.analyze(b"x", &registry, &bad_k).is_err());
    }
}
