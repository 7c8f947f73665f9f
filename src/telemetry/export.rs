//! Report export for the visualization side.

use super::report::MetricsReport;
use crate::engine::RunOutcome;
use crate::error::Result;

/// Trait for exporting reports to different formats
pub trait MetricsExporter {
    /// Export a finished report
    fn export(&self, report: &MetricsReport) -> Result<()>;
}

/// Export reports as pretty-printed JSON
#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_path: std::path::PathBuf,
}

impl JsonExporter {
    /// Create a new JSON exporter
    pub fn new(output_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.output_path
    }
}

impl MetricsExporter for JsonExporter {
    fn export(&self, report: &MetricsReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&self.output_path, json)?;
        Ok(())
    }
}

/// Export reports to the console (stdout)
#[derive(Debug, Clone, Default)]
pub struct ConsoleExporter {
    verbose: bool,
}

impl ConsoleExporter {
    /// Create a new console exporter
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn render(&self, report: &MetricsReport) -> String {
        let mut out = String::new();
        let fmt_opt = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v));

        out.push_str(&format!("=== {} ===\n", report.strategy));
        out.push_str(&format!("Processors: {}\n", report.processor_count));
        out.push_str(&format!("Ticks: {}\n", report.ticks_elapsed));
        out.push_str(&format!(
            "Tasks: {} generated, {} completed\n",
            report.tasks_generated, report.tasks_completed
        ));
        out.push_str(&format!(
            "Migrations: {} rebalanced, {} stolen\n",
            report.rebalance_migrations, report.steals
        ));
        out.push_str(&format!("Utilization: {:.1}%\n", report.average_utilization * 100.0));
        out.push_str(&format!("Avg waiting: {}\n", fmt_opt(report.average_waiting_time)));
        out.push_str(&format!("Avg turnaround: {}\n", fmt_opt(report.average_turnaround_time)));
        out.push_str(&format!(
            "Load spread: mean {:.2}, max {}\n",
            report.load_imbalance.mean_spread, report.load_imbalance.max_spread
        ));

        if let RunOutcome::NonTerminating { remaining } = report.outcome {
            out.push_str(&format!("WARNING: budget exhausted with {} tasks outstanding\n", remaining));
        }

        if self.verbose {
            if let Some(p) = report.turnaround_percentiles {
                out.push_str(&format!(
                    "\nTurnaround: p50 {}  p95 {}  p99 {}  max {}\n",
                    p.p50, p.p95, p.p99, p.max
                ));
            }
            out.push_str("\nProcessor  busy   idle   util    done  in/out\n");
            for p in &report.processors {
                out.push_str(&format!(
                    "{:<10} {:<6} {:<6} {:<6.1}% {:<5} {}/{}\n",
                    p.id.to_string(),
                    p.busy_ticks,
                    p.idle_ticks,
                    p.utilization * 100.0,
                    p.tasks_completed,
                    p.migrated_in,
                    p.migrated_out
                ));
            }
        }

        out
    }
}

impl MetricsExporter for ConsoleExporter {
    fn export(&self, report: &MetricsReport) -> Result<()> {
        print!("{}", self.render(report));
        Ok(())
    }
}
