//! Textual rendering of analysis reports.
//!
//! One block per candidate: the recipe, any detected file type and
//! encodings, the score components, a bounded preview, and a verdict.  The
//! layout is stable; callers parse nothing from it, but tests pin the
//! canonical no-result text.

use std::fmt::Write;

use crate::engine::{AnalysisReport, Candidate};

/// Emitted verbatim when a report carries no candidates.
pub const NOTHING_OF_INTEREST: &str = "Nothing of interest could be detected about the input data.\n\
     Have you tried modifying the operation arguments?";

/// Render the full report.
///
/// When no candidate earned the "interesting" verdict the canonical
/// no-result text leads the output; any best-effort records follow it.
pub fn render(report: &AnalysisReport) -> String {
    if report.candidates.is_empty() {
        return NOTHING_OF_INTEREST.to_string();
    }

    let mut out = String::new();
    if !report.candidates.iter().any(|c| c.interesting) {
        out.push_str(NOTHING_OF_INTEREST);
        out.push_str("\n\n");
    }
    for (i, candidate) in report.candidates.iter().enumerate() {
        let _ = writeln!(out, "#{} {}", i + 1, render_recipe(candidate));

        if let Some(ft) = &candidate.detected_type {
            let _ = writeln!(
                out,
                "   file type: {} ({}, .{}) at offset {}",
                ft.description, ft.mime, ft.extension, ft.offset
            );
        }
        if !candidate.encodings.is_empty() {
            let names: Vec<String> = candidate
                .encodings
                .iter()
                .map(|e| format!("{} ({:.2})", e.name, e.confidence))
                .collect();
            let _ = writeln!(out, "   encodings: {}", names.join(", "));
        }

        let s = &candidate.score;
        let _ = write!(
            out,
            "   rank {:.3} | entropy {:.2} | chi {:.2} | printable {:.2} | ngram {:.2} | utf8 {}",
            s.rank,
            s.entropy,
            s.chi_squared,
            s.printable,
            s.ngram,
            if s.valid_utf8 { "yes" } else { "no" },
        );
        if !s.languages.is_empty() {
            let scripts: Vec<String> = s
                .languages
                .iter()
                .map(|l| format!("{} ({:.2})", l.script, l.confidence))
                .collect();
            let _ = write!(out, " | scripts: {}", scripts.join(", "));
        }
        out.push('\n');

        if s.valid_utf8 {
            let _ = writeln!(out, "   preview: {:?}", candidate.preview);
        } else {
            let _ = writeln!(out, "   preview: 0x{}", candidate.preview);
        }
        let _ = writeln!(
            out,
            "   verdict: {}",
            if candidate.interesting { "interesting" } else { "speculative" }
        );
    }

    if report.truncated {
        let _ = writeln!(out, "warning: node budget exhausted, results are best-effort");
    }
    if report.cancelled {
        let _ = writeln!(out, "warning: cancelled, results are best-effort");
    }
    if !report.op_errors.is_empty() {
        let counts: Vec<String> = report
            .op_errors
            .iter()
            .map(|(name, n)| format!("{name} ({n})"))
            .collect();
        let _ = writeln!(out, "operation errors: {}", counts.join(", "));
    }
    out
}

fn render_recipe(candidate: &Candidate) -> String {
    if candidate.recipe.is_empty() {
        return "(input as-is)".to_string();
    }
    let steps: Vec<String> = candidate
        .recipe
        .iter()
        .map(|step| {
            if step.args.is_empty() {
                step.op.clone()
            } else {
                let args: Vec<String> = step.args.iter().map(|a| a.to_string()).collect();
                format!("{}({})", step.op, args.join(", "))
            }
        })
        .collect();
    steps.join(" -> ")
}
