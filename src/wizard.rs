//! Step wizard – a bounded selector over the five form steps.
//!
//! The controller tracks the current [`WizardStep`], derives the progress
//! indicator, and gates forward movement on per-step required fields when
//! the [`GatePolicy`] is `Enforced`. Backward movement is never gated.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::document::{CvContent, CvDocument, PersonalField, Revision};

/// Number of steps in the catalog.
pub const STEP_COUNT: u8 = 5;

/// A step number in `1..=STEP_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WizardStep(u8);

impl WizardStep {
    pub const FIRST: WizardStep = WizardStep(1);
    pub const LAST: WizardStep = WizardStep(STEP_COUNT);

    /// Clamp any integer into the valid range.
    pub fn clamped(n: i64) -> Self {
        Self(n.clamp(1, STEP_COUNT as i64) as u8)
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn kind(self) -> StepKind {
        CATALOG[self.index()].kind
    }

    pub fn title(self) -> &'static str {
        CATALOG[self.index()].title
    }

    fn index(self) -> usize {
        debug_assert!((1..=STEP_COUNT).contains(&self.0), "step {} out of range", self.0);
        (self.0 - 1) as usize
    }

    fn next(self) -> Self {
        Self((self.0 + 1).min(STEP_COUNT))
    }

    fn prev(self) -> Self {
        Self(self.0.saturating_sub(1).max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    PersonalInfo,
    Summary,
    WorkExperience,
    Education,
    SkillsAndFinalize,
}

#[derive(Debug, Clone, Copy)]
pub struct StepInfo {
    pub kind: StepKind,
    pub title: &'static str,
    /// Fields that must be non-empty before leaving the step forward.
    pub required: &'static [PersonalField],
}

pub const CATALOG: [StepInfo; STEP_COUNT as usize] = [
    StepInfo {
        kind: StepKind::PersonalInfo,
        title: "Personal Info",
        required: &[PersonalField::FullName, PersonalField::Position, PersonalField::Email],
    },
    StepInfo {
        kind: StepKind::Summary,
        title: "Summary",
        required: &[],
    },
    StepInfo {
        kind: StepKind::WorkExperience,
        title: "Work Experience",
        required: &[],
    },
    StepInfo {
        kind: StepKind::Education,
        title: "Education",
        required: &[],
    },
    StepInfo {
        kind: StepKind::SkillsAndFinalize,
        title: "Skills & Finalize",
        required: &[],
    },
];

/// Whether incomplete required fields block forward navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatePolicy {
    /// Required fields are shown but never block.
    Advisory,
    /// `next` and forward `jump_to` stop at the first incomplete step.
    #[default]
    Enforced,
}

/// Position of a step relative to the current one, for the indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Visited,
    Current,
    Upcoming,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Moved { from: WizardStep, to: WizardStep },
    /// Forward progress stopped at `at` with these fields empty.
    Blocked { at: WizardStep, missing: Vec<PersonalField> },
    /// Already at the boundary or the target.
    Unchanged,
}

/// Required fields of `step` that are currently empty.
pub fn missing_fields(step: WizardStep, content: &CvContent) -> Vec<PersonalField> {
    CATALOG[step.index()]
        .required
        .iter()
        .copied()
        .filter(|f| f.get(&content.personal_info).trim().is_empty())
        .collect()
}

pub struct WizardController {
    step: WizardStep,
    policy: GatePolicy,
    progress: f32,
    changes: watch::Receiver<Revision>,
    complete: [bool; STEP_COUNT as usize],
}

impl WizardController {
    /// Start at step 1, subscribed to `doc`.
    pub fn new(doc: &CvDocument, policy: GatePolicy) -> Self {
        let mut wizard = Self {
            step: WizardStep::FIRST,
            policy,
            progress: 0.0,
            changes: doc.subscribe(),
            complete: [false; STEP_COUNT as usize],
        };
        wizard.recompute(doc.content());
        wizard.set_step(WizardStep::FIRST);
        wizard
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    /// `step / STEP_COUNT` in `0.2..=1.0`.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn progress_percent(&self) -> f32 {
        self.progress * 100.0
    }

    pub fn has_next(&self) -> bool {
        self.step < WizardStep::LAST
    }

    pub fn has_prev(&self) -> bool {
        self.step > WizardStep::FIRST
    }

    /// Pull the latest document revision if one was published.
    pub fn refresh(&mut self, doc: &CvDocument) {
        if self.changes.has_changed().unwrap_or(false) {
            self.changes.borrow_and_update();
            self.recompute(doc.content());
        }
    }

    fn recompute(&mut self, content: &CvContent) {
        for n in 1..=STEP_COUNT {
            let step = WizardStep(n);
            self.complete[step.index()] = missing_fields(step, content).is_empty();
        }
    }

    /// Whether `step`'s required fields were all filled at the last refresh.
    pub fn is_complete(&self, step: WizardStep) -> bool {
        self.complete[step.index()]
    }

    pub fn step_states(&self) -> [(WizardStep, StepState); STEP_COUNT as usize] {
        std::array::from_fn(|i| {
            let step = WizardStep(i as u8 + 1);
            let state = match step.cmp(&self.step) {
                std::cmp::Ordering::Less => StepState::Visited,
                std::cmp::Ordering::Equal => StepState::Current,
                std::cmp::Ordering::Greater => StepState::Upcoming,
            };
            (step, state)
        })
    }

    fn set_step(&mut self, step: WizardStep) {
        self.step = step;
        self.progress = step.number() as f32 / STEP_COUNT as f32;
    }

    fn move_to(&mut self, to: WizardStep) -> Transition {
        let from = self.step;
        if from == to {
            return Transition::Unchanged;
        }
        self.set_step(to);
        log::debug!("wizard {} -> {}", from.number(), to.number());
        Transition::Moved { from, to }
    }

    pub fn next(&mut self, doc: &CvDocument) -> Transition {
        let target = self.step.next();
        self.advance_towards(target, doc)
    }

    pub fn prev(&mut self) -> Transition {
        let target = self.step.prev();
        self.move_to(target)
    }

    /// Random access. `n` is clamped into range; forward jumps stop at the
    /// first incomplete step in between under an enforced gate.
    pub fn jump_to(&mut self, n: i64, doc: &CvDocument) -> Transition {
        let target = WizardStep::clamped(n);
        if target <= self.step {
            return self.move_to(target);
        }
        self.advance_towards(target, doc)
    }

    fn advance_towards(&mut self, target: WizardStep, doc: &CvDocument) -> Transition {
        self.refresh(doc);
        if self.policy == GatePolicy::Advisory || target <= self.step {
            return self.move_to(target);
        }

        let mut reach = self.step;
        while reach < target {
            let missing = missing_fields(reach, doc.content());
            if !missing.is_empty() {
                if reach == self.step {
                    log::warn!(
                        "step {} incomplete, missing {:?}",
                        reach.number(),
                        missing
                    );
                    return Transition::Blocked { at: reach, missing };
                }
                break;
            }
            reach = reach.next();
        }
        self.move_to(reach)
    }
}
