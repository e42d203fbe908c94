//! Fixed probe scripts.
//!
//! A [`ProbeScript`] is an ordered list of steps. Each step holds one or more
//! attempts; an attempt issues its actions in order, then captures a
//! screenshot and pauses. Scripts are plain data: the explorer never changes
//! what it does next based on what it observed.
//!
//! The capture for attempt `n` of step `ordinal` is named
//! `<ordinal>_<label>_<n>.png`, or `<ordinal>_<label>.png` when the step has
//! a single attempt.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::artifact::ArtifactName;
use crate::config::ConfigError;

/// One probe within a step: actions, then a capture, then a pause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// Actions issued before the capture.
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Pause after the capture, on top of per-action settle delays.
    #[serde(default)]
    pub pause_ms: u64,
}

impl Attempt {
    pub fn new(actions: Vec<Action>, pause_ms: u64) -> Self {
        Self { actions, pause_ms }
    }

    /// A single tap followed by a pause.
    pub fn tap(x: u32, y: u32, pause_ms: u64) -> Self {
        Self::new(vec![Action::Tap { x, y }], pause_ms)
    }
}

/// A titled group of attempts sharing a capture label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeStep {
    /// Step number, used as the artifact ordinal.
    pub ordinal: u8,
    /// Console title.
    pub title: String,
    /// Capture label, e.g. `auth_attempt`.
    pub label: String,
    pub attempts: Vec<Attempt>,
}

impl ProbeStep {
    pub fn new(ordinal: u8, title: impl Into<String>, label: impl Into<String>, attempts: Vec<Attempt>) -> Self {
        Self {
            ordinal,
            title: title.into(),
            label: label.into(),
            attempts,
        }
    }

    /// Capture name for the attempt at `index` (0-based).
    pub fn capture_name(&self, index: usize) -> ArtifactName {
        let variant = (self.attempts.len() > 1).then(|| index as u32 + 1);
        ArtifactName::new(self.ordinal, self.label.clone(), variant)
    }
}

/// An ordered, open-loop sequence of probe steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeScript {
    pub name: String,
    pub steps: Vec<ProbeStep>,
}

impl ProbeScript {
    /// Loads a script from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Total number of actions the script issues, captures included.
    pub fn action_count(&self) -> usize {
        self.steps
            .iter()
            .flat_map(|s| &s.attempts)
            .map(|a| a.actions.len() + 1)
            .sum()
    }

    /// Probes whether the household-management flow of the Roomies app is
    /// reachable: launch, dismiss onboarding, open the profile tab, find the
    /// household entry point, open the create flow, fill the form and submit.
    ///
    /// Coordinates target an iPhone 16 Pro simulator.
    pub fn household() -> Self {
        let form = [
            ((393, 300), "Test Household"),
            ((393, 400), "Test User"),
            ((393, 500), "test@example.com"),
        ]
        .into_iter()
        .map(|((x, y), text)| {
            Attempt::new(
                vec![Action::Tap { x, y }, Action::TypeText { text: text.to_string() }],
                1000,
            )
        })
        .collect();

        Self {
            name: "household".to_string(),
            steps: vec![
                ProbeStep::new(1, "Launching app", "app_launched", vec![Attempt::new(vec![Action::Launch], 0)]),
                ProbeStep::new(
                    2,
                    "Dismissing authentication overlays",
                    "auth_attempt",
                    // bottom buttons, centre, then top-left and top-right close/skip
                    taps(&[(393, 600), (393, 700), (393, 500), (100, 100), (600, 100)], 1000),
                ),
                ProbeStep::new(3, "Opening profile tab", "profile_tab_tapped", taps(&[(706, 850)], 2000)),
                ProbeStep::new(
                    4,
                    "Looking for household management",
                    "household_search",
                    taps(&[(393, 400), (393, 500), (393, 600), (393, 300), (200, 400), (600, 400)], 1000),
                ),
                ProbeStep::new(
                    5,
                    "Opening household creation",
                    "create_attempt",
                    taps(&[(393, 600), (393, 700), (200, 600), (600, 600)], 2000),
                ),
                ProbeStep::new(6, "Filling creation form", "form_input", form),
                ProbeStep::new(
                    7,
                    "Submitting form",
                    "submit_attempt",
                    taps(&[(600, 100), (393, 750), (600, 700)], 2000),
                ),
                ProbeStep::new(8, "Capturing final state", "final_state", vec![Attempt::new(Vec::new(), 0)]),
            ],
        }
    }
}

fn taps(points: &[(u32, u32)], pause_ms: u64) -> Vec<Attempt> {
    points.iter().map(|&(x, y)| Attempt::tap(x, y, pause_ms)).collect()
}
