//! Human-readable and JSON reporting of frame solutions

use aspect::FrameSolution;
use serde::Serialize;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Multi-line description of one solution
pub fn format_solution(solution: &FrameSolution) -> String {
    let center = &solution.center;
    let mut out = String::new();

    match center.position() {
        Some((x, y)) => {
            let _ = writeln!(
                out,
                "center: x={x:.3} y={y:.3} (std {:.3}/{:.3}, chords {}/{})",
                center.std_dev_x, center.std_dev_y, center.count_x, center.count_y
            );
        }
        None => {
            let _ = writeln!(
                out,
                "center: no disk (chords {}/{})",
                center.count_x, center.count_y
            );
        }
    }

    if let Some(crop) = &solution.crop {
        let _ = writeln!(
            out,
            "search window: rows {}..{} cols {}..{}",
            crop.row_min,
            crop.row_max(),
            crop.col_min,
            crop.col_max()
        );
    }

    let _ = writeln!(out, "fiducials: {}", solution.fiducials.len());
    for (index, fiducial) in solution.fiducials.iter().enumerate() {
        let _ = writeln!(
            out,
            "  [{index}] row={} col={} score={:.3}",
            fiducial.row, fiducial.col, fiducial.score
        );
    }
    let _ = write!(out, "elapsed: {:.2} ms", millis(solution.elapsed));
    out
}

/// One line per frame for batch output
pub fn format_batch_line(path: &Path, solution: &FrameSolution) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    match solution.center.position() {
        Some((x, y)) => format!(
            "{name}: x={x:.3} y={y:.3} fiducials={} {:.2} ms",
            solution.fiducials.len(),
            millis(solution.elapsed)
        ),
        None => format!("{name}: no disk {:.2} ms", millis(solution.elapsed)),
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1e3
}

/// Solution tagged with the frame it came from, for JSON output
#[derive(Debug, Serialize)]
pub struct FrameReport<'a> {
    pub frame: &'a Path,
    #[serde(flatten)]
    pub solution: &'a FrameSolution,
}

/// Aggregate over a batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub frames: usize,
    pub solved: usize,
    pub failed: Vec<PathBuf>,
    pub fiducials: usize,
    pub mean_elapsed: Duration,
    pub max_elapsed: Duration,
}

impl BatchSummary {
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = (&'a Path, Option<&'a FrameSolution>)>,
    {
        let mut summary = Self::default();
        let mut total = Duration::ZERO;
        let mut timed = 0u32;

        for (path, solution) in results {
            summary.frames += 1;
            let Some(solution) = solution else {
                summary.failed.push(path.to_path_buf());
                continue;
            };

            if solution.center.is_valid() {
                summary.solved += 1;
            }
            summary.fiducials += solution.fiducials.len();
            total += solution.elapsed;
            timed += 1;
            summary.max_elapsed = summary.max_elapsed.max(solution.elapsed);
        }

        if timed > 0 {
            summary.mean_elapsed = total / timed;
        }
        summary
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} frames, {} solved, {} unreadable, {} fiducials, mean {:.2} ms, max {:.2} ms",
            self.frames,
            self.solved,
            self.failed.len(),
            self.fiducials,
            millis(self.mean_elapsed),
            millis(self.max_elapsed)
        )
    }
}
