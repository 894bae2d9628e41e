//! Human-readable rendering of an [`OperationResult`].

use std::fmt::Write;
use std::time::Duration;

use super::types::OperationResult;

/// Failed chunks listed individually before the rest are summarised.
const MAX_LISTED_FAILURES: usize = 10;

/// Render a clear result as a multi-line summary.
pub fn format_report(result: &OperationResult, preserve_terrain: bool) -> String {
    let mut out = String::new();

    let headline = if result.cancelled {
        "Region clear cancelled"
    } else if result.timed_out {
        "Region clear timed out"
    } else if result.is_success() && result.failed_chunks == 0 {
        "Region clear completed"
    } else if result.is_success() {
        "Region clear completed with failures"
    } else {
        "Region clear failed"
    };
    let _ = writeln!(out, "{headline}");
    let _ = writeln!(out);

    let _ = writeln!(out, "Area:          {}", result.area);
    let _ = writeln!(out, "Y range:       {}", result.clear_y);
    let _ = writeln!(
        out,
        "Chunks:        {} total, {}x{} blocks each",
        result.total_chunks, result.chunk_size, result.chunk_size
    );
    let _ = writeln!(out, "  Successful:  {}", result.successful_chunks);
    let _ = writeln!(out, "  Failed:      {}", result.failed_chunks);
    if result.skipped_chunks > 0 {
        let _ = writeln!(out, "  Skipped:     {}", result.skipped_chunks);
    }
    if result.resumed_chunks > 0 {
        let _ = writeln!(out, "  Resumed:     {}", result.resumed_chunks);
    }
    let _ = writeln!(
        out,
        "Blocks cleared:  {}",
        group_digits(result.total_blocks_cleared)
    );
    if preserve_terrain {
        let _ = writeln!(
            out,
            "Blocks restored: {}",
            group_digits(result.total_blocks_restored)
        );
        if result.ground_restore_failures > 0 {
            let _ = writeln!(
                out,
                "  Ground not restored in {} chunk(s)",
                result.ground_restore_failures
            );
        }
    } else {
        let _ = writeln!(out, "Terrain was not preserved");
    }
    let _ = writeln!(out, "Duration:      {}", format_duration(result.execution_time));

    let problems: Vec<_> = result.problem_chunks().collect();
    if !problems.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Problem chunks:");
        for chunk in problems.iter().take(MAX_LISTED_FAILURES) {
            let (kind, message) = chunk
                .error
                .as_ref()
                .map(|e| (e.kind.as_str(), e.message.as_str()))
                .unwrap_or(("unknown", ""));
            let _ = writeln!(
                out,
                "  #{} at ({}, {}): {} after {} attempt(s): {}",
                chunk.index, chunk.origin_x, chunk.origin_z, kind, chunk.attempts, message
            );
        }
        if problems.len() > MAX_LISTED_FAILURES {
            let _ = writeln!(
                out,
                "  ... and {} more",
                problems.len() - MAX_LISTED_FAILURES
            );
        }
    }

    let suggestions = suggestions(result);
    if !suggestions.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Suggestions:");
        for (i, suggestion) in suggestions.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, suggestion);
        }
    }

    out.trim_end().to_string()
}

/// Recovery hints for every problem in the result, without duplicates.
fn suggestions(result: &OperationResult) -> Vec<&'static str> {
    let mut hints: Vec<&'static str> = Vec::new();
    let mut push = |hint: &'static str| {
        if !hints.contains(&hint) {
            hints.push(hint);
        }
    };

    if result.timed_out {
        push("Increase operation_timeout in [clear] or clear a smaller area");
    }
    if result.skipped_chunks > 0 {
        push("Set checkpoint in [clear] and re-run to continue where this run stopped");
    }
    for chunk in result.problem_chunks() {
        if let Some(error) = &chunk.error {
            if let Some(cause) = error.cause {
                cause.remediation().iter().copied().for_each(&mut push);
            }
            error.kind.remediation().iter().copied().for_each(&mut push);
        }
    }
    hints
}

fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}
