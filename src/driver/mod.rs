//! Runs the enabled detectors over compilation units.
//!
//! Each unit moves through a fixed sequence of [`UnitState`]s:
//!
//! 1. Tree requirements of the enabled detectors are gathered.
//! 2. A tree is parsed once if any first-round detector reads one.
//! 3. First-round detectors record operations, which are aggregated and
//!    applied.
//! 4. Detectors asking for a [`TreeRequirement::Fresh`] tree run a second
//!    round against a reparse of the first round's output. Their edits are
//!    rebased onto the original text, so every reported group uses the same
//!    offsets.
//! 5. Optionally, the output is reparsed and rejected if it has syntax
//!    errors the input did not.
//!
//! A failure ends that unit only; other units are unaffected.

mod unit;

pub use unit::{CompilationUnit, UnitError, UnitOutcome, UnitState};

use crate::config::{CleanupConfig, DetectorOptions, MessageTable};
use crate::detectors::{Detector, DetectorKind, Operations, ScanInput, TreeRequirement};
use crate::diagnostics::ProblemRecord;
use crate::rewrite::{CompositePatch, EditGroup, OffsetMap, PatchApplier, RewriteAggregator};
use crate::tree::ParseTree;
use crate::ts::{RustSourceParser, SourceParser};
use crate::validate;
use rayon::prelude::*;
use tracing::{debug, info, warn};

pub struct CleanupDriver {
    config: CleanupConfig,
    messages: MessageTable,
    detectors: Vec<Box<dyn Detector>>,
    parser: Box<dyn SourceParser>,
}

/// A detector that is enabled for this run.
struct Scheduled<'d> {
    detector: &'d dyn Detector,
    options: DetectorOptions,
    label: &'d str,
    requirement: TreeRequirement,
}

impl CleanupDriver {
    /// Driver with the built-in detectors and the tree-sitter Rust parser.
    pub fn new(config: CleanupConfig) -> Self {
        let mut driver = Self {
            config,
            messages: MessageTable::default(),
            detectors: DetectorKind::ALL
                .into_iter()
                .map(|kind| Box::new(kind) as Box<dyn Detector>)
                .collect(),
            parser: Box::new(RustSourceParser),
        };
        driver.rebuild_messages();
        driver
    }

    pub fn with_parser(mut self, parser: impl SourceParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Add a detector alongside the built-in ones.
    pub fn register(&mut self, detector: impl Detector + 'static) {
        self.detectors.push(Box::new(detector));
        self.rebuild_messages();
    }

    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    pub fn detectors(&self) -> impl Iterator<Item = &dyn Detector> {
        self.detectors.iter().map(|detector| detector.as_ref())
    }

    /// Ids of every registered detector, for config validation.
    pub fn known_ids(&self) -> Vec<&str> {
        self.detectors().map(|detector| detector.id()).collect()
    }

    /// Edit-group label used for a detector's operations.
    pub fn label<'a>(&'a self, id: &'a str) -> &'a str {
        self.messages.label(id)
    }

    fn rebuild_messages(&mut self) {
        let mut messages = MessageTable::with_defaults(
            self.detectors
                .iter()
                .map(|detector| (detector.id(), detector.default_message())),
        );
        messages.override_with(&self.config.messages);
        self.messages = messages;
    }

    /// Units are independent; one failing does not affect the others.
    pub fn run_all(&self, units: &[CompilationUnit]) -> Vec<UnitOutcome> {
        units.par_iter().map(|unit| self.run(unit)).collect()
    }

    pub fn run(&self, unit: &CompilationUnit) -> UnitOutcome {
        let mut run = UnitRun {
            name: &unit.name,
            states: Vec::new(),
        };
        run.enter(UnitState::NotStarted);

        match self.run_unit(unit, &mut run) {
            Ok((text, groups)) => {
                run.enter(UnitState::Applied);
                let changed = text != unit.text;
                if changed {
                    info!(unit = %unit.name, groups = groups.len(), "cleanups applied");
                }
                UnitOutcome::Applied {
                    name: unit.name.clone(),
                    text,
                    groups,
                    changed,
                    states: run.states,
                }
            }
            Err(error) => {
                run.enter(UnitState::Failed);
                warn!(unit = %unit.name, %error, "cleanup failed");
                UnitOutcome::Failed {
                    name: unit.name.clone(),
                    error,
                    states: run.states,
                }
            }
        }
    }

    fn schedule(&self) -> Vec<Scheduled<'_>> {
        self.detectors()
            .filter(|detector| self.config.is_enabled(detector.id()))
            .map(|detector| {
                let options = self.config.options(detector.id());
                Scheduled {
                    detector,
                    requirement: detector.tree_requirement(&options),
                    options,
                    label: self.messages.label(detector.id()),
                }
            })
            .collect()
    }

    fn run_unit(
        &self,
        unit: &CompilationUnit,
        run: &mut UnitRun<'_>,
    ) -> Result<(String, Vec<EditGroup>), UnitError> {
        let (second, first): (Vec<_>, Vec<_>) = self
            .schedule()
            .into_iter()
            .partition(|scheduled| scheduled.requirement == TreeRequirement::Fresh);
        run.enter(UnitState::RequirementsGathered);

        let tree = if first
            .iter()
            .any(|scheduled| scheduled.requirement == TreeRequirement::Shared)
        {
            let tree = self.parser.parse(&unit.text, &unit.compiler_options)?;
            run.enter(UnitState::TreeBuilt);
            Some(tree)
        } else {
            run.enter(UnitState::TreeSkipped);
            None
        };

        let (mut text, mut groups, first_patch) =
            self.round(&first, &unit.text, tree.as_ref(), &unit.diagnostics, run)?;

        if !second.is_empty() {
            let reparsed;
            let fresh = match &tree {
                Some(tree) if text == unit.text => tree,
                _ => {
                    reparsed = self.parser.parse(&text, &unit.compiler_options)?;
                    &reparsed
                }
            };
            run.enter(UnitState::TreeBuilt);
            // Compiler offsets describe the original text only.
            let (next, more, _) = self.round(&second, &text, Some(fresh), &[], run)?;
            let more = OffsetMap::new(&unit.text, &text, &first_patch).rebase_groups(more);
            text = next;
            merge_groups(&mut groups, more);
        }

        if self.config.driver.validate_syntax && text != unit.text {
            let parsed;
            let original = match &tree {
                Some(tree) => tree,
                None => {
                    parsed = self.parser.parse(&unit.text, &unit.compiler_options)?;
                    &parsed
                }
            };
            let edited = self.parser.parse(&text, &unit.compiler_options)?;
            validate::validate_edit(original, &edited)?;
        }

        Ok((text, groups))
    }

    /// Scan, aggregate and apply one round of detectors against `text`.
    fn round(
        &self,
        scheduled: &[Scheduled<'_>],
        text: &str,
        tree: Option<&ParseTree>,
        diagnostics: &[ProblemRecord],
        run: &mut UnitRun<'_>,
    ) -> Result<(String, Vec<EditGroup>, CompositePatch), UnitError> {
        let mut operations = Operations::new();
        for entry in scheduled {
            let input = ScanInput {
                text,
                tree,
                diagnostics,
                options: &entry.options,
                label: entry.label,
            };
            let before = operations.len();
            entry.detector.scan(&input, &mut operations)?;
            debug!(
                unit = %run.name,
                detector = entry.detector.id(),
                operations = operations.len() - before,
                "detector scanned"
            );
        }
        run.enter(UnitState::OperationsCollected);

        let mut aggregator = RewriteAggregator::with_policy(self.config.comments);
        aggregator.extend(operations);
        let patch = match tree {
            Some(tree) => aggregator.aggregate(tree)?,
            None => aggregator.aggregate_text(text)?,
        };
        run.enter(UnitState::Aggregated);

        let applied = PatchApplier::new().apply(text, &patch)?;
        Ok((applied.text, applied.groups, patch))
    }
}

/// State trail of one unit.
struct UnitRun<'a> {
    name: &'a str,
    states: Vec<UnitState>,
}

impl UnitRun<'_> {
    fn enter(&mut self, state: UnitState) {
        debug!(unit = %self.name, ?state, "unit state");
        self.states.push(state);
    }
}

/// Fold a later round's rebased groups into `groups`, keeping label order.
fn merge_groups(groups: &mut Vec<EditGroup>, more: Vec<EditGroup>) {
    for group in more {
        match groups.iter_mut().find(|existing| existing.label == group.label) {
            Some(existing) => {
                existing.edits.extend(group.edits);
                existing
                    .edits
                    .sort_by_key(|edit| (edit.byte_start, !edit.is_insertion()));
            }
            None => groups.push(group),
        }
    }
    groups.sort_by(|a, b| a.label.cmp(&b.label));
}
