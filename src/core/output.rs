//! Output rendering helpers for CLI surfaces.
//!
//! Human narration goes to stdout in color; machine output is a single JSON
//! envelope. Diagnostics go through `tracing`, never through here.

use crate::core::error::VerifyError;
use crate::phases::BuildReport;
use crate::verify::{Artifact, Verdict};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// Short form of an object id for narration.
pub fn short_id(id: &str) -> &str {
    id.get(..10).unwrap_or(id)
}

/// Printed before anything is written, so a failed build can be rerun
/// with the same seed.
pub fn print_build_start(target: &Path, seed: &str) {
    println!(
        "{} {}",
        "▸ Generating mystery in".bright_cyan().bold(),
        target.display().to_string().bright_white()
    );
    println!("  {} {}", "seed".bright_black(), seed.bright_white());
}

pub fn print_build_report(report: &BuildReport) {
    if let Some(base) = &report.base {
        println!(
            "  {} base snapshot {} ({} residents)",
            "◆".bright_cyan(),
            short_id(base.as_str()).bright_black(),
            report.residents
        );
    }
    if let Some(archive) = &report.archive {
        println!(
            "  {} {} reports on {}",
            "◆".bright_cyan(),
            archive.commits,
            archive.branch.bright_white().bold()
        );
    }
    if let Some(log) = &report.access_log {
        println!(
            "  {} {} access log entries on {}",
            "◆".bright_cyan(),
            log.entries,
            log.branch.bright_white().bold()
        );
    }
    if let Some(residences) = &report.residences {
        for street in &residences.streets {
            println!(
                "  {} {} houses tagged {}",
                "◆".bright_cyan(),
                street.capacity,
                street.tag.bright_white().bold()
            );
        }
        println!(
            "  {} {} investigation files on {}",
            "◆".bright_cyan(),
            residences.pooled.len(),
            crate::phases::residences::INVESTIGATIONS_BRANCH.bright_white().bold()
        );
    }
    if let Some(solution) = &report.solution {
        println!(
            "  {} solution tagged at {}",
            "◆".bright_cyan(),
            short_id(solution.as_str()).bright_black()
        );
    }
    println!("{}", "✓ Mystery ready".bright_green().bold());
}

pub fn render_verdict_text(verdict: &Verdict) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} {}\n",
        "✓ Puzzle is solvable. Culprit:".bright_green().bold(),
        verdict.culprit.bright_white().bold()
    ));
    for elimination in &verdict.eliminated {
        let artifact = match elimination.artifact {
            Artifact::Testimony => "testimony",
            Artifact::Investigation => "investigation file",
        };
        out.push_str(&format!(
            "  {} {} cleared by {}\n",
            "▸".bright_yellow(),
            elimination.suspect,
            artifact
        ));
    }
    out
}

pub fn render_failure_text(err: &VerifyError) -> String {
    format!(
        "{} {}: {}",
        "✗ Verification failed".bright_red().bold(),
        err.check_name().bright_white(),
        compact_line(&err.to_string(), 200)
    )
}

/// JSON result of a verification run.
#[derive(Debug, Serialize)]
pub struct VerifyEnvelope<'a> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<&'a Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<'a> VerifyEnvelope<'a> {
    pub fn from_result(result: &'a Result<Verdict, VerifyError>) -> Self {
        match result {
            Ok(verdict) => Self {
                ok: true,
                verdict: Some(verdict),
                check: None,
                message: None,
            },
            Err(err) => Self {
                ok: false,
                verdict: None,
                check: Some(err.check_name()),
                message: Some(err.to_string()),
            },
        }
    }
}
