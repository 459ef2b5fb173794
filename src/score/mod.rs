//! Statistical scoring of byte buffers.
//!
//! Every reached buffer gets a [`Score`]: Shannon entropy, a letter-frequency
//! chi-squared against English, printable fraction, UTF-8 validity, an
//! n-gram/common-word credit, script detection, and an optional caller
//! target-regex match.  The components fold into a single `rank` (lower is
//! better) which drives frontier ordering, pruning, and the final report
//! order.
//!
//! # Rank
//!
//! ```text
//! rank = W_CHI · chi              (chi capped at CHI_CAP on a target match)
//!      − W_PRINTABLE · printable_fraction
//!      − W_NGRAM · ngram_score
//!      + W_ENTROPY · |entropy − ENTROPY_PIVOT|
//!      − W_TARGET · matches_target
//!      − W_UTF8 · valid_utf8
//!      − W_FILETYPE · file_type_detected
//! ```
//!
//! `W_TARGET` dominates every finite combination of the other terms, so a
//! buffer matching the caller's crib always sorts first.  A buffer with no
//! ASCII letters has infinite chi-squared and sorts last.
//!
//! All statistics run in O(n) over the buffer.

pub mod tables;

use std::collections::{HashMap, HashSet};

use regex::bytes::Regex;
use serde::Serialize;

use crate::buffer::ByteBuffer;

// ── Weights and thresholds ────────────────────────────────────────────────────

pub const W_CHI:       f64 = 1.0;
pub const W_PRINTABLE: f64 = 2.0;
pub const W_NGRAM:     f64 = 0.5;
pub const W_ENTROPY:   f64 = 0.4;
pub const W_TARGET:    f64 = 1000.0;
pub const W_UTF8:      f64 = 1.0;
/// A recognised file-format signature outweighs the text bonuses, so a
/// format identification is not buried under speculative text decodes.
pub const W_FILETYPE:  f64 = 5.0;

/// Entropy of typical mixed text sits near this pivot; distance from it is
/// penalised symmetrically (both random noise and long runs move away).
pub const ENTROPY_PIVOT: f64 = 4.5;

/// Chi-squared substitute used in the rank when the crib matched, so a
/// letterless target hit still produces a finite, dominant-negative rank.
pub const CHI_CAP: f64 = 100.0;

/// Upper chi-squared bound for the "interesting" text verdict.
pub const CHI_THRESHOLD: f64 = 10.0;

/// Lower n-gram bound for the "interesting" text verdict.  Zero: a short
/// decode like `ABCDE` carries a single weak bigram hit and must still pass.
pub const NGRAM_THRESHOLD: f64 = 0.0;

/// Minimum printable fraction for the "interesting" text verdict.
pub const MIN_PRINTABLE: f64 = 0.9;

/// Minimum script confidence for the non-latin "interesting" verdict.
pub const LANG_CONFIDENCE_THRESHOLD: f64 = 0.75;

/// Flat credit per common-word token in the n-gram score.
const WORD_CREDIT: f64 = 2.0;

/// Minimum alphabetic codepoints before script detection reports anything.
const LANG_MIN_LETTERS: usize = 4;

const UNIFORM_BIGRAM:  f64 = 1.0 / 676.0;
const UNIFORM_TRIGRAM: f64 = 1.0 / 17_576.0;

// ── Crib ─────────────────────────────────────────────────────────────────────

/// Natural-language scoring resources: n-gram log-likelihood tables, the
/// common-word list, and the caller's optional target regex.
#[derive(Debug, Clone)]
pub struct Crib {
    bigram_llr:  HashMap<[u8; 2], f64>,
    trigram_llr: HashMap<[u8; 3], f64>,
    words:       HashSet<&'static str>,
    target:      Option<Regex>,
}

impl Crib {
    pub fn new() -> Self {
        let bigram_llr = tables::BIGRAMS
            .iter()
            .map(|(s, f)| {
                let b = s.as_bytes();
                ([b[0], b[1]], (f / UNIFORM_BIGRAM).ln())
            })
            .collect();
        let trigram_llr = tables::TRIGRAMS
            .iter()
            .map(|(s, f)| {
                let b = s.as_bytes();
                ([b[0], b[1], b[2]], (f / UNIFORM_TRIGRAM).ln())
            })
            .collect();
        let words = tables::COMMON_WORDS.iter().copied().collect();
        Self { bigram_llr, trigram_llr, words, target: None }
    }

    /// Build a crib with a caller-supplied target pattern.  The pattern is
    /// matched against raw bytes, so it may describe non-UTF-8 content.
    pub fn with_target(pattern: &str) -> Result<Self, regex::Error> {
        let mut crib = Self::new();
        crib.set_target(pattern)?;
        Ok(crib)
    }

    pub fn set_target(&mut self, pattern: &str) -> Result<(), regex::Error> {
        self.target = Some(Regex::new(pattern)?);
        Ok(())
    }

    pub fn target(&self) -> Option<&Regex> {
        self.target.as_ref()
    }
}

impl Default for Crib {
    fn default() -> Self {
        Self::new()
    }
}

// ── Per-buffer statistics ────────────────────────────────────────────────────

/// Shannon entropy of the byte histogram, in bits per byte.  Range [0, 8];
/// empty buffer scores 0.
pub fn entropy(b: &ByteBuffer) -> f64 {
    let bytes = b.as_bytes();
    if bytes.is_empty() {
        return 0.0;
    }
    let mut hist = [0usize; 256];
    for &byte in bytes {
        hist[byte as usize] += 1;
    }
    let n = bytes.len() as f64;
    hist.iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.log2()
        })
        .sum()
}

/// Letter-count-normalised chi-squared of the case-folded A–Z histogram
/// against [`tables::LETTER_FREQ`].  Non-letter bytes are ignored entirely;
/// zero letters yields `f64::INFINITY`.
pub fn chi_squared_english(b: &ByteBuffer) -> f64 {
    let mut counts = [0usize; 26];
    let mut total = 0usize;
    for &byte in b.as_bytes() {
        let lower = byte.to_ascii_lowercase();
        if lower.is_ascii_lowercase() {
            counts[(lower - b'a') as usize] += 1;
            total += 1;
        }
    }
    if total == 0 {
        return f64::INFINITY;
    }
    let n = total as f64;
    counts
        .iter()
        .zip(tables::LETTER_FREQ.iter())
        .map(|(&c, &expected)| {
            let observed = c as f64 / n;
            let diff = observed - expected;
            diff * diff / expected
        })
        .sum()
}

/// Fraction of bytes in 0x09–0x0D or 0x20–0x7E.  Empty buffer scores 0.
pub fn printable_fraction(b: &ByteBuffer) -> f64 {
    let bytes = b.as_bytes();
    if bytes.is_empty() {
        return 0.0;
    }
    let printable = bytes
        .iter()
        .filter(|&&byte| matches!(byte, 0x09..=0x0D | 0x20..=0x7E))
        .count();
    printable as f64 / bytes.len() as f64
}

pub fn valid_utf8(b: &ByteBuffer) -> bool {
    b.try_as_utf8().is_some()
}

/// Mean per-position log-likelihood-ratio credit of known English bigrams
/// and trigrams in the case-folded text, plus a bounded common-word credit.
///
/// Zero when the buffer is not valid UTF-8 or fewer than half its bytes are
/// ASCII letters.  Non-negative by construction: ratios are taken against
/// the uniform baseline and only table hits contribute.
pub fn ngram_score(b: &ByteBuffer, crib: &Crib) -> f64 {
    let Some(text) = b.try_as_utf8() else {
        return 0.0;
    };
    let folded: Vec<u8> = text.bytes().map(|c| c.to_ascii_lowercase()).collect();
    if folded.is_empty() {
        return 0.0;
    }
    let letters = folded.iter().filter(|byte| byte.is_ascii_lowercase()).count();
    if (letters as f64) < folded.len() as f64 * 0.5 {
        return 0.0;
    }

    let mut sum = 0.0;
    for w in folded.windows(2) {
        if let Some(llr) = crib.bigram_llr.get(&[w[0], w[1]]) {
            sum += llr;
        }
    }
    for w in folded.windows(3) {
        if let Some(llr) = crib.trigram_llr.get(&[w[0], w[1], w[2]]) {
            sum += llr;
        }
    }
    for token in text.split(|c: char| !c.is_ascii_alphabetic()) {
        if token.is_empty() {
            continue;
        }
        let lowered = token.to_ascii_lowercase();
        if crib.words.contains(lowered.as_str()) {
            sum += WORD_CREDIT;
        }
    }

    sum / folded.len().saturating_sub(1).max(1) as f64
}

/// True iff the crib's target regex matches anywhere in the buffer.
pub fn matches_target(b: &ByteBuffer, crib: &Crib) -> bool {
    crib.target()
        .map(|re| re.is_match(b.as_bytes()))
        .unwrap_or(false)
}

// ── Script detection ─────────────────────────────────────────────────────────

/// One detected script with its share of the alphabetic codepoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageHit {
    pub script:     String,
    pub confidence: f64,
}

fn script_of(c: char, extensive: bool) -> Option<&'static str> {
    match c {
        'a'..='z' | 'A'..='Z' | '\u{C0}'..='\u{24F}' => Some("latin"),
        '\u{400}'..='\u{4FF}' => Some("cyrillic"),
        '\u{370}'..='\u{3FF}' if extensive => Some("greek"),
        '\u{590}'..='\u{5FF}' if extensive => Some("hebrew"),
        '\u{600}'..='\u{6FF}' if extensive => Some("arabic"),
        '\u{E00}'..='\u{E7F}' if extensive => Some("thai"),
        '\u{3040}'..='\u{30FF}' | '\u{4E00}'..='\u{9FFF}' if extensive => Some("cjk"),
        _ => None,
    }
}

/// Script fingerprint of the decoded text: for each known script block, the
/// fraction of alphabetic codepoints falling inside it.  Ordered highest
/// confidence first; empty when the buffer is not UTF-8 or carries fewer
/// than [`LANG_MIN_LETTERS`] letters.
pub fn detect_languages(b: &ByteBuffer, extensive: bool) -> Vec<LanguageHit> {
    let Some(text) = b.try_as_utf8() else {
        return Vec::new();
    };
    let mut per_script: HashMap<&'static str, usize> = HashMap::new();
    let mut alphabetic = 0usize;
    for c in text.chars() {
        if !c.is_alphabetic() {
            continue;
        }
        alphabetic += 1;
        if let Some(script) = script_of(c, extensive) {
            *per_script.entry(script).or_insert(0) += 1;
        }
    }
    if alphabetic < LANG_MIN_LETTERS {
        return Vec::new();
    }

    let mut hits: Vec<LanguageHit> = per_script
        .into_iter()
        .map(|(script, count)| LanguageHit {
            script:     script.to_string(),
            confidence: count as f64 / alphabetic as f64,
        })
        .filter(|hit| hit.confidence >= 0.05)
        .collect();
    hits.sort_by(|a, b| {
        rank_order(b.confidence, a.confidence).then_with(|| a.script.cmp(&b.script))
    });
    hits
}

// ── Aggregate score ──────────────────────────────────────────────────────────

/// The full statistical snapshot of one buffer, plus the aggregate rank.
#[derive(Debug, Clone, Serialize)]
pub struct Score {
    pub entropy:        f64,
    pub chi_squared:    f64,
    pub printable:      f64,
    pub valid_utf8:     bool,
    pub ngram:          f64,
    pub matches_target: bool,
    /// A file-format signature matched this buffer.
    pub file_type_detected: bool,
    pub languages:      Vec<LanguageHit>,
    /// Weighted aggregate; lower is better.
    pub rank:           f64,
}

impl Score {
    pub fn of(b: &ByteBuffer, crib: &Crib, extensive: bool, file_type_detected: bool) -> Score {
        let entropy = entropy(b);
        let chi_squared = chi_squared_english(b);
        let printable = printable_fraction(b);
        let valid_utf8 = valid_utf8(b);
        let ngram = ngram_score(b, crib);
        let matches_target = matches_target(b, crib);
        let languages = detect_languages(b, extensive);

        let chi = if matches_target { chi_squared.min(CHI_CAP) } else { chi_squared };
        let rank = W_CHI * chi
            - W_PRINTABLE * printable
            - W_NGRAM * ngram
            + W_ENTROPY * (entropy - ENTROPY_PIVOT).abs()
            - if matches_target { W_TARGET } else { 0.0 }
            - if valid_utf8 { W_UTF8 } else { 0.0 }
            - if file_type_detected { W_FILETYPE } else { 0.0 };

        Score {
            entropy,
            chi_squared,
            printable,
            valid_utf8,
            ngram,
            matches_target,
            file_type_detected,
            languages,
            rank,
        }
    }

    /// The "interesting" verdict.
    ///
    /// A target match always qualifies.  Otherwise a buffer is interesting
    /// when a file-type signature matched it, when it reads as clean English
    /// text, or when it decodes to a confidently non-latin script.
    pub fn is_interesting(&self) -> bool {
        if self.matches_target {
            return true;
        }
        if self.file_type_detected {
            return true;
        }
        if self.valid_utf8
            && self.printable >= MIN_PRINTABLE
            && self.chi_squared <= CHI_THRESHOLD
            && self.ngram >= NGRAM_THRESHOLD
        {
            return true;
        }
        if self.valid_utf8 {
            if let Some(top) = self.languages.first() {
                if top.script != "latin" && top.confidence >= LANG_CONFIDENCE_THRESHOLD {
                    return true;
                }
            }
        }
        false
    }
}

/// Total order over ranks: ascending, NaN last.
pub fn rank_order(a: f64, b: f64) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a.is_nan(), b.is_nan()) {
        (true, true)   => Ordering::Equal,
        (true, false)  => Ordering::Greater,
        (false, true)  => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}
