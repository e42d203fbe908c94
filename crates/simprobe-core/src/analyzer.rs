//! Transition heuristic: estimate how many distinct screens a run visited.
//!
//! The analyzer looks only at artifacts recorded in an
//! [`ExplorationLog`]; it never captures or invents images. Artifacts whose
//! file has since disappeared are dropped before counting.
//!
//! 1. Order the artifacts by their ordinal file-name prefix.
//! 2. Fewer than `min_artifacts`: [`Classification::LikelyFailure`].
//! 3. Otherwise compare consecutive pairs among the first `window`
//!    artifacts with the configured [`TransitionMetric`].
//! 4. At least `success_transitions` changes: [`Classification::LikelySuccess`],
//!    otherwise [`Classification::NeedsManualReview`].
//!
//! The verdict is a pure function of the files on disk and the thresholds, so
//! analyzing the same artifacts twice yields the same verdict.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::artifact::{capture_order, Artifact};
use crate::config::HeuristicConfig;
use crate::metric::Comparison;
use crate::session::ExplorationLog;

/// Coarse outcome of a probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// Enough distinct screens were seen that navigation probably worked.
    LikelySuccess,
    /// The app responded, but too few screen changes were detected.
    NeedsManualReview,
    /// Too few captures to say the app responded at all.
    LikelyFailure,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::LikelySuccess => "likely success",
            Classification::NeedsManualReview => "needs manual review",
            Classification::LikelyFailure => "likely failure",
        };
        f.write_str(s)
    }
}

/// Derived verdict for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Artifacts that still exist on disk.
    pub artifact_count: usize,
    /// Number of consecutive pairs judged to be a screen change.
    pub distinct_screen_estimate: usize,
    pub classification: Classification,
    /// Name of the metric used for comparisons.
    pub metric: String,
    /// Every pair that was compared, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comparisons: Vec<Comparison>,
}

/// Applies the transition heuristic to recorded artifacts.
#[derive(Debug, Clone, Default)]
pub struct TransitionAnalyzer {
    config: HeuristicConfig,
}

impl TransitionAnalyzer {
    pub fn new(config: HeuristicConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeuristicConfig {
        &self.config
    }

    /// Analyzes the artifacts recorded in a log.
    pub fn analyze_log(&self, log: &ExplorationLog) -> Verdict {
        self.analyze(log.artifacts().cloned().collect())
    }

    /// Analyzes an explicit artifact set. Missing files are excluded and the
    /// remainder is sorted into capture order before comparison.
    pub fn analyze(&self, artifacts: Vec<Artifact>) -> Verdict {
        let mut present: Vec<Artifact> = artifacts.into_iter().filter(Artifact::exists).collect();
        present.sort_by(capture_order);
        present.dedup_by(|a, b| a.path == b.path);

        let metric = &self.config.metric;
        let artifact_count = present.len();

        if artifact_count < self.config.min_artifacts {
            info!(
                artifact_count,
                min_artifacts = self.config.min_artifacts,
                "insufficient captures for transition analysis"
            );
            return Verdict {
                artifact_count,
                distinct_screen_estimate: 0,
                classification: Classification::LikelyFailure,
                metric: metric.name().to_string(),
                comparisons: Vec::new(),
            };
        }

        let window = &present[..artifact_count.min(self.config.window)];
        let comparisons: Vec<Comparison> = window
            .windows(2)
            .map(|pair| metric.compare(&pair[0], &pair[1]))
            .inspect(|c| debug!(from = %c.from, to = %c.to, score = ?c.score, changed = c.changed, "compared captures"))
            .collect();

        let distinct_screen_estimate = comparisons.iter().filter(|c| c.changed).count();
        let classification = if distinct_screen_estimate >= self.config.success_transitions {
            Classification::LikelySuccess
        } else {
            Classification::NeedsManualReview
        };

        info!(
            artifact_count,
            distinct_screen_estimate,
            classification = %classification,
            metric = metric.name(),
            "transition analysis complete"
        );

        Verdict {
            artifact_count,
            distinct_screen_estimate,
            classification,
            metric: metric.name().to_string(),
            comparisons,
        }
    }
}
