//! The coverage sample and the parser for the external coverage tool's
//! output (spec §3, §4.5, §6). The tool itself is an opaque external
//! collaborator; this module only knows how to parse its two lines.

use std::process::Command;

use crate::error::FazzError;

/// `(line_pct, line_abs, branch_pct, branch_abs)`. Only the absolute counts
/// participate in the "interesting" decision (spec §3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageSample {
    pub line_pct: f64,
    pub line_abs: u64,
    pub branch_pct: f64,
    pub branch_abs: u64,
}

/// Invokes the coverage tool rooted at `root` and parses its stdout. Fails
/// with [`FazzError::CoverageParseFailed`] if the tool does not produce the
/// two expected lines (spec §4.5, §6) — a misconfiguration, not a target
/// fault, so this is fatal to the run (spec §7).
pub fn collect_coverage(tool_command: &str, root: &std::path::Path) -> Result<CoverageSample, FazzError> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(tool_command)
        .current_dir(root)
        .output()
        .map_err(|err| FazzError::CoverageParseFailed(format!("failed to launch coverage tool: {err}")))?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_coverage_output(&stdout)
}

/// `^lines: <pct>% (<abs> out of <tot>)` and `^branches: <pct>% (<abs> out
/// of <tot>)`, in any order, anywhere in the tool's stdout.
pub fn parse_coverage_output(stdout: &str) -> Result<CoverageSample, FazzError> {
    let (line_pct, line_abs) = find_metric(stdout, "lines")
        .ok_or_else(|| FazzError::CoverageParseFailed(stdout.to_owned()))?;
    let (branch_pct, branch_abs) = find_metric(stdout, "branches")
        .ok_or_else(|| FazzError::CoverageParseFailed(stdout.to_owned()))?;
    Ok(CoverageSample {
        line_pct,
        line_abs,
        branch_pct,
        branch_abs,
    })
}

fn find_metric(stdout: &str, label: &str) -> Option<(f64, u64)> {
    for line in stdout.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix(label) else {
            continue;
        };
        let Some(rest) = rest.strip_prefix(':') else {
            continue;
        };
        let rest = rest.trim();
        let (pct_str, rest) = rest.split_once('%')?;
        let pct: f64 = pct_str.trim().parse().ok()?;
        let rest = rest.trim();
        let rest = rest.strip_prefix('(')?;
        let (abs_str, _) = rest.split_once(" out of ")?;
        let abs: u64 = abs_str.trim().parse().ok()?;
        return Some((pct, abs));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_tool_output() {
        let output = "lines: 73.4% (110 out of 150)\nbranches: 60.0% (12 out of 20)\n";
        let sample = parse_coverage_output(output).unwrap();
        assert_eq!(sample.line_abs, 110);
        assert_eq!(sample.branch_abs, 12);
    }

    #[test]
    fn fails_on_malformed_output() {
        let output = "no coverage info here\n";
        assert!(parse_coverage_output(output).is_err());
    }

    #[test]
    fn coverage_monotonicity_scripted_samples() {
        let samples = [(100u64, 10u64), (100, 10), (110, 12), (110, 12)];
        let mut best = (0u64, 0u64);
        let mut interesting_flags = Vec::new();
        for (line_abs, branch_abs) in samples {
            let interesting = line_abs > best.0 || branch_abs > best.1;
            if interesting {
                best = (line_abs, branch_abs);
            }
            interesting_flags.push(interesting);
        }
        assert_eq!(interesting_flags, vec![true, false, true, false]);
        assert_eq!(best, (110, 12));
    }
}
