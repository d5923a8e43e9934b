use std::collections::HashMap;
use std::time::Instant;

/// Cross-cutting logger for sorting-loop events.
///
/// Decouples the orchestrator from specific output mechanisms so each
/// front end can observe the loop without changing the orchestration code.
pub trait PipelineLogger: Send {
    /// Report that a tick ran.
    fn tick(&mut self, index: usize);

    /// Record how long a named stage (capture, detect, track, classify,
    /// actuate) took for one tick.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. detection count).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events. Used by tests.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn tick(&mut self, _index: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI-oriented logger that tracks per-stage timing and metrics and
/// reports a summary at shutdown.
///
/// Heartbeat output is throttled to every `throttle_ticks` ticks.
pub struct StdoutPipelineLogger {
    throttle_ticks: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    ticks: usize,
    messages: Vec<String>,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_ticks: usize) -> Self {
        Self {
            throttle_ticks: throttle_ticks.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            ticks: 0,
            messages: Vec::new(),
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let ticks = self.ticks;
        let mut lines = Vec::new();

        lines.push(format!(
            "Sorting summary ({ticks} ticks, {:.1}s total):",
            elapsed_ms / 1000.0
        ));

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = if durations.is_empty() {
                0.0
            } else {
                total_ms / durations.len() as f64
            };
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:6.1}ms  max {:6.1}ms  total {total_ms:7.0}ms",
                durations.iter().cloned().fold(0.0, f64::max)
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let values = &self.metrics[name];
            let total: f64 = values.iter().sum();
            let avg = if values.is_empty() {
                0.0
            } else {
                total / values.len() as f64
            };
            lines.push(format!("  {name}: avg {avg:.1}  total {total:.0}"));
        }

        if ticks > 0 && elapsed_ms > 0.0 {
            let rate = ticks as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {rate:.1} ticks/s"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(500)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn tick(&mut self, index: usize) {
        self.ticks = self.ticks.max(index + 1);
        if (index + 1) % self.throttle_ticks == 0 {
            log::info!("Heartbeat: {} ticks", index + 1);
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
