//! The alignment run loop.
//!
//! Each iteration runs an equality pass (base-1 instances against base 2)
//! and then a relation pass in both directions. Equality workers read only
//! the previous iteration's stores; their events are committed to fresh
//! stores that replace the old ones when the pass is over. The loop ends when
//! the equality assignment stops changing, when the iteration budget is used
//! up or when a stop is requested. Class alignment runs once at the end.

use std::fs;
use std::sync::mpsc;
use std::time::Instant;

use ahash::AHashSet;
use concord_facts::FactStore;
use concord_scores::{
    approximate_bipartite, new_store, read_score_file, Backend, Resolution, ScoreLog, ScoreStore,
    StoreSpec, SubPair,
};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::classes::score_class;
use crate::equality::EqualityWorker;
use crate::equivalence::{Equivalences, LiteralMatcher};
use crate::events::{Committer, Labels, ScoreKind};
use crate::join::JoinCoder;
use crate::output;
use crate::relations::RelationWorker;
use crate::settings::{ResumePoint, Settings};
use crate::stop::StopSignal;
use crate::trials::{RelationTrials, TrialEntry};
use crate::{AlignError, JoinError};

/// Which base plays the sub side of a relation or class store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Subs in base 1, supers in base 2.
    Forward,
    /// Subs in base 2, supers in base 1.
    Backward,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::Forward, Direction::Backward];

    pub const fn index(self) -> usize {
        match self {
            Direction::Forward => 0,
            Direction::Backward => 1,
        }
    }

    /// Number of the base holding the subs.
    pub const fn suffix(self) -> u8 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => 2,
        }
    }
}

/// Result of one equality pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqualityOutcome {
    /// Base-1 instances done, including resumed ones.
    pub processed: usize,
    pub entities: usize,
    pub committed: usize,
    /// Set when a stop was requested; the value is `processed`.
    pub stopped_at: Option<usize>,
}

/// Result of [`Aligner::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Iterations completed by this run.
    pub iterations: usize,
    pub converged: bool,
    /// Where to pick up again when the run was stopped.
    pub stopped: Option<ResumePoint>,
}

pub struct Aligner<'a> {
    kb1: &'a FactStore,
    kb2: &'a FactStore,
    settings: &'a Settings,
    coder1: JoinCoder,
    coder2: JoinCoder,
    matcher: LiteralMatcher,
    equality: Box<dyn ScoreStore>,
    sub_relations: [Box<dyn ScoreStore>; 2],
    sub_classes: [Box<dyn ScoreStore>; 2],
    trials: RelationTrials,
    stop: StopSignal,
    pool: Option<ThreadPool>,
}

impl std::fmt::Debug for Aligner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aligner")
            .field("equality", &self.equality.len())
            .field("sub_relations", &[self.sub_relations[0].len(), self.sub_relations[1].len()])
            .field("sub_classes", &[self.sub_classes[0].len(), self.sub_classes[1].len()])
            .field("threads", &self.pool.as_ref().map(|p| p.current_num_threads()))
            .finish()
    }
}

impl<'a> Aligner<'a> {
    /// Both stores must have been sealed with `init()`.
    pub fn new(
        kb1: &'a FactStore,
        kb2: &'a FactStore,
        settings: &'a Settings,
    ) -> Result<Self, AlignError> {
        settings.validate()?;
        if !kb1.is_sealed() || !kb2.is_sealed() {
            warn!("aligning a fact store that was not initialized; statistics are missing");
        }
        let coder1 = JoinCoder::new(kb1, settings.max_join_length)?;
        let coder2 = JoinCoder::new(kb2, settings.max_join_length)?;
        let pool = match settings.threads {
            1 => None,
            n => Some(
                ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("concord-worker-{i}"))
                    .build()?,
            ),
        };

        Ok(Self {
            kb1,
            kb2,
            settings,
            matcher: LiteralMatcher::new(settings.literal_mode, settings.literal_threshold),
            equality: equality_store(settings),
            sub_relations: [
                relation_store(settings, &coder1, &coder2),
                relation_store(settings, &coder2, &coder1),
            ],
            sub_classes: [class_store(settings), class_store(settings)],
            trials: RelationTrials::new(settings.trials),
            stop: StopSignal::new(settings.stop_file.clone()),
            pool,
            coder1,
            coder2,
        })
    }

    /// Replace the stop signal, e.g. with one sharing a signal handler's flag.
    pub fn with_stop(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    /// Trial counts and frozen verdicts of the base-1 relations.
    pub fn trials(&self) -> &RelationTrials {
        &self.trials
    }

    // ========================================================================
    // Stores
    // ========================================================================

    pub fn equality(&self) -> &dyn ScoreStore {
        self.equality.as_ref()
    }

    pub fn sub_relations(&self, direction: Direction) -> &dyn ScoreStore {
        self.sub_relations[direction.index()].as_ref()
    }

    pub fn sub_classes(&self, direction: Direction) -> &dyn ScoreStore {
        self.sub_classes[direction.index()].as_ref()
    }

    /// Join coders of base 1 and base 2.
    pub fn coders(&self) -> (&JoinCoder, &JoinCoder) {
        (&self.coder1, &self.coder2)
    }

    /// One pair per base-1 entity at most: the single-best rows, or a
    /// bipartite reduction of a multi-candidate store. Sorted by sub.
    pub fn assignment(&self) -> Vec<SubPair> {
        let pairs = self.equality.pairs();
        let mut chosen = match self.equality.resolution() {
            Resolution::SingleBest => pairs,
            Resolution::MultiCandidate { .. } => approximate_bipartite(&pairs),
        };
        chosen.sort_by(|a, b| a.sub.cmp(&b.sub).then(a.sup.cmp(&b.sup)));
        chosen
    }

    /// Base-2 equivalents of the base-1 entity `name`, best first.
    pub fn equality_of(&self, name: &str) -> Result<Vec<(String, f64)>, AlignError> {
        let id = self
            .kb1
            .entity_id(name)
            .ok_or_else(|| AlignError::UnknownEntity(name.to_string()))?;
        Ok(self
            .equality
            .best_matches_of(id as u64)
            .into_iter()
            .map(|p| (label(self.kb2, p.sup), p.score))
            .collect())
    }

    /// Rendered super join relations of `relation` (a name in the sub base,
    /// `-` suffix for the inverse), best first.
    pub fn super_relations_of(
        &self,
        direction: Direction,
        relation: &str,
    ) -> Result<Vec<(String, f64)>, AlignError> {
        let (source, target, source_coder, target_coder) = self.sides(direction);
        let sub = source_coder.code(&source_coder.parse(relation, source)?)?;
        self.sub_relations(direction)
            .best_matches_of(sub)
            .into_iter()
            .map(|p| {
                let join = target_coder.decode(p.sup)?;
                Ok((target_coder.render(&join, target), p.score))
            })
            .collect()
    }

    /// Super classes of the class `class` of the sub base, best first.
    pub fn super_classes_of(
        &self,
        direction: Direction,
        class: &str,
    ) -> Result<Vec<(String, f64)>, AlignError> {
        let (source, target, _, _) = self.sides(direction);
        let id = source
            .entity_id(class)
            .ok_or_else(|| AlignError::UnknownEntity(class.to_string()))?;
        Ok(self
            .sub_classes(direction)
            .best_matches_of(id as u64)
            .into_iter()
            .map(|p| (label(target, p.sup), p.score))
            .collect())
    }

    /// Set `sub ⊆ super` (and the same for their inverses) before a run.
    /// `sub` is a single relation of the sub base, `super` a join relation
    /// of the other one.
    pub fn seed_sub_relation(
        &mut self,
        direction: Direction,
        sub: &str,
        sup: &str,
        score: f64,
    ) -> Result<(), AlignError> {
        let (keys, inverse_keys) = {
            let (source, target, source_coder, target_coder) = self.sides(direction);
            let sub = source_coder.parse(sub, source)?;
            if sub.len() != 1 {
                return Err(JoinError::TooLong {
                    len: sub.len(),
                    max: 1,
                }
                .into());
            }
            let sup = target_coder.parse(sup, target)?;
            (
                (source_coder.code(&sub)?, target_coder.code(&sup)?),
                (
                    source_coder.code_with(&sub, true)?,
                    target_coder.code_with(&sup, true)?,
                ),
            )
        };
        let store = &mut self.sub_relations[direction.index()];
        store.set(keys.0, keys.1, score)?;
        store.set(inverse_keys.0, inverse_keys.1, score)?;
        Ok(())
    }

    // ========================================================================
    // Run loop
    // ========================================================================

    pub fn run(&mut self) -> Result<RunOutcome, AlignError> {
        let started = Instant::now();
        let resume = self.settings.resume;
        if (resume.iteration > 0 || resume.entity_offset > 0) && self.settings.output_dir.is_none() {
            return Err(AlignError::ResumeWithoutOutput(resume.iteration));
        }
        if resume.iteration > 0 {
            self.load_equality(resume.iteration - 1)?;
            self.load_relations(resume.iteration - 1)?;
        }
        // A partial pass left its own trial state behind.
        if resume.entity_offset > 0 {
            self.load_trials(resume.iteration)?;
        } else if resume.iteration > 0 {
            self.load_trials(resume.iteration - 1)?;
        }

        let mut previous = keys(&self.assignment());
        let mut iterations = 0;
        let mut converged = false;
        let mut last = None;

        for iteration in resume.iteration..self.settings.max_iterations {
            let offset = if iteration == resume.iteration {
                resume.entity_offset
            } else {
                0
            };
            let pass = self.equality_pass(iteration, offset)?;
            if let Some(entity_offset) = pass.stopped_at {
                return Ok(self.stopped(iteration, entity_offset, iterations));
            }
            if self.relation_pass(iteration)? {
                return Ok(self.stopped(iteration, pass.entities, iterations));
            }
            iterations += 1;
            last = Some(iteration);

            let current = keys(&self.assignment());
            if current == previous {
                converged = true;
                info!(iteration, "equality assignment unchanged; converged");
                break;
            }
            previous = current;
        }

        // Resuming past the iteration budget only has the class pass left.
        if let Some(iteration) = last.or_else(|| resume.iteration.checked_sub(1)) {
            if self.class_pass(iteration)? {
                return Ok(self.stopped(iteration + 1, 0, iterations));
            }
        }
        info!(
            iterations,
            converged,
            equalities = self.equality.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "alignment finished"
        );
        Ok(RunOutcome {
            iterations,
            converged,
            stopped: None,
        })
    }

    fn stopped(&self, iteration: usize, entity_offset: usize, iterations: usize) -> RunOutcome {
        let point = ResumePoint {
            iteration,
            entity_offset,
        };
        info!(iteration, entity_offset, "alignment stopped; resumable");
        RunOutcome {
            iterations,
            converged: false,
            stopped: Some(point),
        }
    }

    // ========================================================================
    // Equality pass
    // ========================================================================

    /// Score every base-1 instance from `start_offset` on against base 2.
    pub fn equality_pass(
        &mut self,
        iteration: usize,
        start_offset: usize,
    ) -> Result<EqualityOutcome, AlignError> {
        let started = Instant::now();
        let entities = self.kb1.instance_ids();
        let total = entities.len();
        let mut processed = start_offset.min(total);
        let (mut next, log) = self.open_equality(iteration, &entities[..processed])?;
        let mut stopped_at = None;

        let committed = {
            let worker = EqualityWorker {
                kb1: self.kb1,
                kb2: self.kb2,
                coder1: &self.coder1,
                coder2: &self.coder2,
                settings: self.settings,
                forward: self.sub_relations[Direction::Forward.index()].as_ref(),
                backward: self.sub_relations[Direction::Backward.index()].as_ref(),
                equivalences: self.equivalences(Direction::Forward),
                trials: &self.trials,
                iteration,
            };
            let mut committer =
                Committer::new(ScoreKind::Equality, next.as_mut(), log.as_ref(), self.labels());

            for chunk in entities[processed..].chunks(self.settings.chunk_size) {
                if self.stop.should_stop() {
                    stopped_at = Some(processed);
                    break;
                }
                match &self.pool {
                    None => {
                        for &y1 in chunk {
                            for event in worker.score_entity(y1)? {
                                committer.record(event)?;
                            }
                        }
                        committer.commit()?;
                    }
                    Some(pool) => score_chunk(pool, &worker, chunk, &mut committer)?,
                }
                processed += chunk.len();
                debug!(iteration, processed, total, "equality chunk committed");
            }
            committer.committed()
        };

        finish_log(log, stopped_at.is_some())?;
        next.reconcile_both_ways();
        self.equality = next;
        if stopped_at.is_none() {
            self.trials.freeze();
        }
        self.save_trials(iteration)?;

        info!(
            iteration,
            processed,
            committed,
            kept = self.equality.len(),
            frozen_relations = self.trials.frozen(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "equality pass done"
        );
        Ok(EqualityOutcome {
            processed,
            entities: total,
            committed,
            stopped_at,
        })
    }

    /// A fresh equality store and its log. When resuming inside an
    /// iteration, the logged rows of the `done` entities are kept in the log
    /// and replayed into the store.
    fn open_equality(
        &self,
        iteration: usize,
        done: &[u32],
    ) -> Result<(Box<dyn ScoreStore>, Option<ScoreLog>), AlignError> {
        let mut store = equality_store(self.settings);
        let Some(dir) = &self.settings.output_dir else {
            return Ok((store, None));
        };
        let path = output::equality_file(dir, iteration);
        if done.is_empty() {
            return Ok((store, Some(ScoreLog::create(&path)?)));
        }

        let rows = if path.exists() {
            read_score_file(&path)?
        } else {
            warn!(path = %path.display(), "no partial equality file to resume from");
            Vec::new()
        };
        let names: AHashSet<&str> = done.iter().filter_map(|&id| self.kb1.entity_name(id)).collect();
        let log = ScoreLog::create(&path)?;
        let mut pairs = Vec::new();
        for row in rows.iter().filter(|row| names.contains(row.sub.as_str())) {
            match (self.kb1.entity_id(&row.sub), self.kb2.entity_id(&row.sup)) {
                (Some(sub), Some(sup)) => {
                    log.append(&row.sub, &row.sup, row.score)?;
                    pairs.push(SubPair::new(sub as u64, sup as u64, row.score));
                }
                _ => warn!(sub = %row.sub, sup = %row.sup, "dropping equality row of unknown entities"),
            }
        }
        replay(store.as_mut(), pairs)?;
        info!(iteration, entities = done.len(), restored = store.len(), "resumed partial equality pass");
        Ok((store, Some(log)))
    }

    // ========================================================================
    // Relation pass
    // ========================================================================

    /// Recompute both relation stores. Returns `true` when stopped.
    pub fn relation_pass(&mut self, iteration: usize) -> Result<bool, AlignError> {
        for direction in Direction::BOTH {
            let started = Instant::now();
            let mut store = self.relation_store(direction);
            let log = self.open_log(|dir| output::relation_file(dir, iteration, direction))?;
            let mut stopped = false;

            let committed = {
                let (source, target, source_coder, target_coder) = self.sides(direction);
                let worker = RelationWorker {
                    direction,
                    source,
                    target,
                    source_coder,
                    target_coder,
                    settings: self.settings,
                    equivalences: self.equivalences(direction),
                    pool: self.pool.as_ref(),
                };
                let mut committer = Committer::new(
                    ScoreKind::SubRelation(direction),
                    store.as_mut(),
                    log.as_ref(),
                    self.labels(),
                );
                for &r1 in source.relations() {
                    if source.is_hierarchy_relation(r1) {
                        continue;
                    }
                    if self.stop.should_stop() {
                        stopped = true;
                        break;
                    }
                    for event in worker.score_relation(r1)? {
                        committer.record(event)?;
                    }
                }
                committer.commit()?
            };

            finish_log(log, stopped)?;
            self.sub_relations[direction.index()] = store;
            info!(
                iteration,
                direction = ?direction,
                committed,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "relation pass done"
            );
            if stopped {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // ========================================================================
    // Class pass
    // ========================================================================

    /// Compute both class stores. Returns `true` when stopped.
    pub fn class_pass(&mut self, iteration: usize) -> Result<bool, AlignError> {
        for direction in Direction::BOTH {
            let started = Instant::now();
            let mut store = class_store(self.settings);
            let log = self.open_log(|dir| output::class_file(dir, iteration, direction))?;
            let mut stopped = false;

            let committed = {
                let (source, target, _, _) = self.sides(direction);
                let equivalences = self.equivalences(direction);
                let mut committer = Committer::new(
                    ScoreKind::SubClass(direction),
                    store.as_mut(),
                    log.as_ref(),
                    self.labels(),
                );
                for class in source.classes().iter() {
                    if self.stop.should_stop() {
                        stopped = true;
                        break;
                    }
                    let events =
                        score_class(direction, target, source, &equivalences, class, self.settings.theta);
                    for event in events {
                        committer.record(event)?;
                    }
                }
                committer.commit()?
            };

            finish_log(log, stopped)?;
            self.sub_classes[direction.index()] = store;
            info!(
                iteration,
                direction = ?direction,
                committed,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "class pass done"
            );
            if stopped {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // ========================================================================
    // Resume
    // ========================================================================

    fn load_equality(&mut self, iteration: usize) -> Result<(), AlignError> {
        let Some(dir) = &self.settings.output_dir else {
            return Err(AlignError::ResumeWithoutOutput(iteration + 1));
        };
        let path = output::equality_file(dir, iteration);
        let mut pairs = Vec::new();
        for row in read_score_file(&path)? {
            match (self.kb1.entity_id(&row.sub), self.kb2.entity_id(&row.sup)) {
                (Some(sub), Some(sup)) => pairs.push(SubPair::new(sub as u64, sup as u64, row.score)),
                _ => warn!(sub = %row.sub, sup = %row.sup, "dropping equality row of unknown entities"),
            }
        }
        let mut store = equality_store(self.settings);
        replay(store.as_mut(), pairs)?;
        store.reconcile_both_ways();
        info!(path = %path.display(), pairs = store.len(), "loaded equalities");
        self.equality = store;
        Ok(())
    }

    fn load_relations(&mut self, iteration: usize) -> Result<(), AlignError> {
        let Some(dir) = self.settings.output_dir.clone() else {
            return Err(AlignError::ResumeWithoutOutput(iteration + 1));
        };
        for direction in Direction::BOTH {
            let path = output::relation_file(&dir, iteration, direction);
            let pairs = {
                let (source, target, source_coder, target_coder) = self.sides(direction);
                let mut pairs = Vec::new();
                for row in read_score_file(&path)? {
                    let parsed = source_coder
                        .parse(&row.sub, source)
                        .and_then(|sub| source_coder.code(&sub))
                        .and_then(|sub| {
                            let sup = target_coder.parse(&row.sup, target)?;
                            Ok((sub, target_coder.code(&sup)?))
                        });
                    match parsed {
                        Ok((sub, sup)) => pairs.push(SubPair::new(sub, sup, row.score)),
                        Err(err) => warn!(sub = %row.sub, sup = %row.sup, %err, "dropping relation row"),
                    }
                }
                pairs
            };
            let mut store = self.relation_store(direction);
            replay(store.as_mut(), pairs)?;
            info!(path = %path.display(), pairs = store.len(), "loaded sub-relations");
            self.sub_relations[direction.index()] = store;
        }
        Ok(())
    }

    fn save_trials(&self, iteration: usize) -> Result<(), AlignError> {
        let Some(dir) = &self.settings.output_dir else {
            return Ok(());
        };
        let render = |coder: &JoinCoder, kb: &FactStore, code: u64| -> Result<String, AlignError> {
            Ok(coder.render(&coder.decode(code)?, kb))
        };
        let entries = self
            .trials
            .entries()
            .into_iter()
            .map(|entry| {
                entry.try_map(
                    |code| render(&self.coder1, self.kb1, code),
                    |code| render(&self.coder2, self.kb2, code),
                )
            })
            .collect::<Result<Vec<TrialEntry<String>>, AlignError>>()?;
        let path = output::trials_file(dir, iteration);
        let json = serde_json::to_string_pretty(&entries)?;
        fs::write(&path, json).map_err(|source| AlignError::TrialsIo { path, source })?;
        Ok(())
    }

    fn load_trials(&mut self, iteration: usize) -> Result<(), AlignError> {
        let Some(dir) = &self.settings.output_dir else {
            return Err(AlignError::ResumeWithoutOutput(iteration));
        };
        let path = output::trials_file(dir, iteration);
        if !path.exists() {
            warn!(path = %path.display(), "no trial state to resume from; relations are tried afresh");
            return Ok(());
        }
        let text = fs::read_to_string(&path).map_err(|source| AlignError::TrialsIo {
            path: path.clone(),
            source,
        })?;
        let named: Vec<TrialEntry<String>> = serde_json::from_str(&text)?;
        let parse = |coder: &JoinCoder, kb: &FactStore, name: String| -> Result<u64, JoinError> {
            coder.code(&coder.parse(&name, kb)?)
        };
        let mut entries = Vec::with_capacity(named.len());
        for entry in named {
            let relation = entry.relation.clone();
            match entry.try_map(
                |name| parse(&self.coder1, self.kb1, name),
                |name| parse(&self.coder2, self.kb2, name),
            ) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!(%relation, %err, "dropping trial state of unknown relation"),
            }
        }
        self.trials = RelationTrials::from_entries(self.settings.trials, entries);
        info!(path = %path.display(), frozen = self.trials.frozen(), "loaded relation trials");
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// `(source base, target base, source coder, target coder)`.
    fn sides(&self, direction: Direction) -> (&'a FactStore, &'a FactStore, &JoinCoder, &JoinCoder) {
        match direction {
            Direction::Forward => (self.kb1, self.kb2, &self.coder1, &self.coder2),
            Direction::Backward => (self.kb2, self.kb1, &self.coder2, &self.coder1),
        }
    }

    fn equivalences(&self, direction: Direction) -> Equivalences<'_> {
        let (source, target, _, _) = self.sides(direction);
        Equivalences {
            source,
            target,
            direction,
            equality: self.equality.as_ref(),
            matcher: self.matcher,
        }
    }

    fn labels(&self) -> Labels<'_> {
        Labels {
            kb1: self.kb1,
            kb2: self.kb2,
            coder1: &self.coder1,
            coder2: &self.coder2,
        }
    }

    fn relation_store(&self, direction: Direction) -> Box<dyn ScoreStore> {
        let (_, _, source_coder, target_coder) = self.sides(direction);
        relation_store(self.settings, source_coder, target_coder)
    }

    fn open_log(
        &self,
        path: impl FnOnce(&std::path::Path) -> std::path::PathBuf,
    ) -> Result<Option<ScoreLog>, AlignError> {
        match &self.settings.output_dir {
            Some(dir) => Ok(Some(ScoreLog::create(path(dir))?)),
            None => Ok(None),
        }
    }
}

/// Evaluate one chunk on the pool while the calling scope commits.
fn score_chunk(
    pool: &ThreadPool,
    worker: &EqualityWorker<'_>,
    chunk: &[u32],
    committer: &mut Committer<'_>,
) -> Result<(), AlignError> {
    let (tx, rx) = mpsc::channel();
    std::thread::scope(|scope| {
        let drain = scope.spawn(move || committer.drain(rx));
        let produced = pool.install(|| {
            chunk.par_iter().try_for_each_with(tx, |tx, &y1| {
                for event in worker.score_entity(y1)? {
                    tx.send(event).map_err(|_| AlignError::CommitterLost)?;
                }
                Ok(())
            })
        });
        let drained = drain.join().map_err(|_| AlignError::CommitterLost)?;
        drained?;
        produced
    })
}

/// Sort finished logs into their snapshot; only flush interrupted ones.
fn finish_log(log: Option<ScoreLog>, interrupted: bool) -> Result<(), AlignError> {
    match log {
        Some(log) if interrupted => log.flush()?,
        Some(log) => {
            log.finish()?;
        }
        None => {}
    }
    Ok(())
}

/// Set `pairs` in the order the committer would have.
fn replay(store: &mut dyn ScoreStore, mut pairs: Vec<SubPair>) -> Result<(), AlignError> {
    pairs.sort_by(|a, b| a.sub.cmp(&b.sub).then(a.sup.cmp(&b.sup)));
    for pair in pairs {
        store.set(pair.sub, pair.sup, pair.score)?;
    }
    Ok(())
}

fn keys(pairs: &[SubPair]) -> Vec<(u64, u64)> {
    pairs.iter().map(|p| (p.sub, p.sup)).collect()
}

fn label(kb: &FactStore, key: u64) -> String {
    u32::try_from(key)
        .ok()
        .and_then(|id| kb.entity_name(id))
        .unwrap_or("?")
        .to_string()
}

fn equality_store(settings: &Settings) -> Box<dyn ScoreStore> {
    new_store(StoreSpec {
        theta: settings.theta,
        resolution: settings.equality_store,
        backend: Backend::Hash,
    })
}

/// Subs are single relations of the source base, supers join relations
/// of the target base.
fn relation_store(settings: &Settings, source: &JoinCoder, target: &JoinCoder) -> Box<dyn ScoreStore> {
    let subs = usize::try_from(source.universe_up_to(1)).unwrap_or(usize::MAX);
    let supers = usize::try_from(target.universe()).unwrap_or(usize::MAX);
    new_store(StoreSpec {
        theta: settings.theta,
        resolution: Resolution::MultiCandidate {
            max_matches: settings.max_relation_candidates,
        },
        backend: Backend::choose(subs, supers, settings.matrix_cell_limit),
    })
}

fn class_store(settings: &Settings) -> Box<dyn ScoreStore> {
    new_store(StoreSpec {
        theta: settings.theta,
        resolution: Resolution::MultiCandidate {
            max_matches: settings.max_class_candidates,
        },
        backend: Backend::Hash,
    })
}
