//! Output formatting and logging utilities

use color_eyre::eyre::Result;
use davidson::Solution;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::time::SystemTime as StdSystemTime;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::format::Writer, fmt::layer, fmt::time::FormatTime, layer::SubscriberExt,
    util::SubscriberInitExt, Registry,
};

/// Custom time formatter that shows only seconds
struct SecondPrecisionTimer;

impl FormatTime for SecondPrecisionTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let duration = StdSystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();

        let total_seconds = duration.as_secs();
        let hours = (total_seconds / 3600) % 24;
        let minutes = (total_seconds / 60) % 60;
        let seconds = total_seconds % 60;

        write!(w, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Where the log ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(String),
    Stdout,
}

/// Setup output logging to file or stdout
///
/// Falls back to stdout when the log file cannot be created.
pub fn setup_output(output_path: Option<&String>) -> LogTarget {
    if let Some(path) = output_path {
        match File::create(path) {
            Ok(log) => {
                let file_layer = layer()
                    .with_writer(log)
                    .with_timer(SecondPrecisionTimer)
                    .with_ansi(false);
                // a subscriber may already be installed by an earlier call
                let _ = Registry::default().with(file_layer).try_init();
                info!("Output will be written to: {}", path);
                return LogTarget::File(path.clone());
            }
            Err(err) => {
                setup_stdout();
                warn!(
                    "Could not create output file {}: {}; logging to stdout",
                    path, err
                );
                return LogTarget::Stdout;
            }
        }
    }
    setup_stdout();
    LogTarget::Stdout
}

fn setup_stdout() {
    let stdout_layer = layer()
        .with_writer(std::io::stdout)
        .with_timer(SecondPrecisionTimer)
        .with_ansi(true);
    let _ = Registry::default().with(stdout_layer).try_init();
}

/// Write eigenvalues, residual norms and optionally eigenvectors
///
/// One line per root: index, eigenvalue, residual norm. Eigenvectors follow as
/// one column per root.
pub fn write_results<W: Write>(
    writer: &mut W,
    solution: &Solution,
    include_eigenvectors: bool,
) -> Result<()> {
    writeln!(
        writer,
        "# {} roots, {} iterations, {} sigma evaluations",
        solution.eigenvalues.len(),
        solution.stats.iterations,
        solution.stats.sigma_evaluations
    )?;
    writeln!(writer, "# root  eigenvalue  residual_norm")?;
    for (i, (value, norm)) in solution
        .eigenvalues
        .iter()
        .zip(solution.residual_norms.iter())
        .enumerate()
    {
        writeln!(writer, "{:4} {:20.12} {:12.4e}", i, value, norm)?;
    }

    if include_eigenvectors && !solution.eigenvectors.is_empty() {
        writeln!(writer, "# eigenvectors (one column per root)")?;
        let dim = solution.eigenvectors[0].len();
        for k in 0..dim {
            let row: Vec<String> = solution
                .eigenvectors
                .iter()
                .map(|v| format!("{:16.10}", v[k]))
                .collect();
            writeln!(writer, "{}", row.join(" "))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use davidson::SolveStats;

    fn sample_solution() -> Solution {
        Solution {
            eigenvalues: vec![-1.5, 0.25],
            eigenvectors: vec![vec![1.0, 0.0], vec![0.0, -1.0]],
            residual_norms: vec![1e-9, 2e-8],
            stats: SolveStats {
                iterations: 4,
                collapses: 0,
                sigma_evaluations: 6,
                discarded_vectors: 0,
            },
        }
    }

    #[test]
    fn test_unwritable_log_falls_back_to_stdout() {
        let path = std::env::temp_dir()
            .join("diag-missing-directory")
            .join("nested")
            .join("run.log")
            .to_string_lossy()
            .into_owned();
        assert_eq!(setup_output(Some(&path)), LogTarget::Stdout);
        assert_eq!(setup_output(None), LogTarget::Stdout);
    }

    #[test]
    fn test_write_results_eigenvalues_only() {
        let mut buffer = Vec::new();
        write_results(&mut buffer, &sample_solution(), false).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "# 2 roots, 4 iterations, 6 sigma evaluations");
        let fields: Vec<&str> = lines[2].split_whitespace().collect();
        assert_eq!(fields[0], "0");
        assert_eq!(fields[1].parse::<f64>().unwrap(), -1.5);
    }

    #[test]
    fn test_write_results_with_eigenvectors() {
        let mut buffer = Vec::new();
        write_results(&mut buffer, &sample_solution(), true).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 7);
        let last: Vec<f64> = lines[6]
            .split_whitespace()
            .map(|x| x.parse().unwrap())
            .collect();
        assert_eq!(last, vec![0.0, -1.0]);
    }
}
