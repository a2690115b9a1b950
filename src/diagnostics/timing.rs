use serde::Serialize;
use std::time::Instant;

/// Wall-clock duration of one named stage of the integrator.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub label: String,
    pub elapsed_ms: f64,
}

impl StageTiming {
    pub fn new(label: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            label: label.into(),
            elapsed_ms,
        }
    }
}

/// Stage timings of one integration run, in execution order.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    /// Record the time elapsed since `start` under `label`.
    pub fn record(&mut self, label: impl Into<String>, start: Instant) {
        self.stages
            .push(StageTiming::new(label, elapsed_ms(start)));
    }

    /// Close the breakdown with the total elapsed since `start`.
    pub fn finish(&mut self, start: Instant) {
        self.total_ms = elapsed_ms(start);
    }

    pub fn stage_ms(&self, label: &str) -> Option<f64> {
        self.stages
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.elapsed_ms)
    }
}

#[inline]
pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_kept_in_order() {
        let start = Instant::now();
        let mut timings = TimingBreakdown::default();
        timings.record("assemble", start);
        timings.record("solve", start);
        timings.finish(start);
        let labels: Vec<_> = timings.stages.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["assemble", "solve"]);
        assert!(timings.stage_ms("solve").is_some());
        assert!(timings.stage_ms("missing").is_none());
        assert!(timings.total_ms >= timings.stages[0].elapsed_ms);
    }
}
