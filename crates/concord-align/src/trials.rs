//! Relation trial statistics.
//!
//! Workers count, per source relation, how often it was tried as equality
//! evidence and how often it produced a candidate. Verdicts only change in
//! [`RelationTrials::freeze`], called between passes, so what a worker sees
//! never depends on how the other workers are scheduled.
//!
//! The whole state (counts still running and frozen verdicts) can be taken
//! out as [`TrialEntry`] values and put back, so a resumed run gates
//! relations exactly like an uninterrupted one.

use std::collections::BTreeSet;

use ahash::AHashMap;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::settings::TrialSettings;

/// Whether a relation is still worth trying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Open,
    NotWorthTrying,
    /// Only these target join codes ever produced a hit.
    RestrictedTo(Vec<u64>),
}

impl Verdict {
    pub fn allows(&self, target: u64) -> bool {
        match self {
            Verdict::Open => true,
            Verdict::NotWorthTrying => false,
            Verdict::RestrictedTo(codes) => codes.binary_search(&target).is_ok(),
        }
    }
}

/// Trial state of one source relation. `K` identifies relations: join
/// codes in memory, rendered names on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialEntry<K> {
    pub relation: K,
    pub state: TrialState<K>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrialState<K> {
    Counting { tried: u64, hits: u64, targets: Vec<K> },
    Open,
    NotWorthTrying,
    RestrictedTo { targets: Vec<K> },
}

impl<K> TrialEntry<K> {
    /// Translate the source relation with `relation` and every target
    /// with `target`.
    pub fn try_map<L, E>(
        self,
        relation: impl FnOnce(K) -> Result<L, E>,
        mut target: impl FnMut(K) -> Result<L, E>,
    ) -> Result<TrialEntry<L>, E> {
        let mut targets =
            |ts: Vec<K>| -> Result<Vec<L>, E> { ts.into_iter().map(&mut target).collect() };
        let state = match self.state {
            TrialState::Counting {
                tried,
                hits,
                targets: ts,
            } => TrialState::Counting {
                tried,
                hits,
                targets: targets(ts)?,
            },
            TrialState::Open => TrialState::Open,
            TrialState::NotWorthTrying => TrialState::NotWorthTrying,
            TrialState::RestrictedTo { targets: ts } => TrialState::RestrictedTo {
                targets: targets(ts)?,
            },
        };
        Ok(TrialEntry {
            relation: relation(self.relation)?,
            state,
        })
    }
}

#[derive(Debug, Default)]
struct Counts {
    tried: u64,
    hits: u64,
    targets: BTreeSet<u64>,
}

#[derive(Debug)]
pub struct RelationTrials {
    settings: TrialSettings,
    counts: DashMap<u64, Counts>,
    verdicts: AHashMap<u64, Verdict>,
}

impl RelationTrials {
    pub fn new(settings: TrialSettings) -> Self {
        Self {
            settings,
            counts: DashMap::new(),
            verdicts: AHashMap::new(),
        }
    }

    /// The frozen verdict of `relation` (open until frozen otherwise).
    pub fn verdict(&self, relation: u64) -> &Verdict {
        const OPEN: &Verdict = &Verdict::Open;
        self.verdicts.get(&relation).unwrap_or(OPEN)
    }

    /// Count one trial of `relation`; `hits` are the target codes that
    /// produced at least one candidate. Frozen relations are not counted.
    pub fn record(&self, relation: u64, hits: &[u64]) {
        if self.verdicts.contains_key(&relation) {
            return;
        }
        let mut counts = self.counts.entry(relation).or_default();
        counts.tried += 1;
        if !hits.is_empty() {
            counts.hits += 1;
            counts.targets.extend(hits.iter().copied());
        }
    }

    /// Turn every relation that used up its budget into a final verdict.
    pub fn freeze(&mut self) {
        let mut frozen = Vec::new();
        for entry in self.counts.iter() {
            let counts = entry.value();
            if counts.tried < self.settings.budget {
                continue;
            }
            let verdict = if counts.hits >= self.settings.min_hits {
                Verdict::Open
            } else if counts.targets.is_empty() {
                Verdict::NotWorthTrying
            } else {
                Verdict::RestrictedTo(counts.targets.iter().copied().collect())
            };
            frozen.push((*entry.key(), verdict));
        }
        for (relation, verdict) in frozen {
            debug!(relation, ?verdict, "relation trial verdict frozen");
            self.counts.remove(&relation);
            self.verdicts.insert(relation, verdict);
        }
    }

    pub fn frozen(&self) -> usize {
        self.verdicts.len()
    }

    /// Every relation seen so far, by ascending code.
    pub fn entries(&self) -> Vec<TrialEntry<u64>> {
        let mut entries: Vec<TrialEntry<u64>> = self
            .counts
            .iter()
            .map(|entry| TrialEntry {
                relation: *entry.key(),
                state: TrialState::Counting {
                    tried: entry.tried,
                    hits: entry.hits,
                    targets: entry.targets.iter().copied().collect(),
                },
            })
            .collect();
        entries.extend(self.verdicts.iter().map(|(&relation, verdict)| TrialEntry {
            relation,
            state: match verdict {
                Verdict::Open => TrialState::Open,
                Verdict::NotWorthTrying => TrialState::NotWorthTrying,
                Verdict::RestrictedTo(codes) => TrialState::RestrictedTo {
                    targets: codes.clone(),
                },
            },
        }));
        entries.sort_by_key(|e| e.relation);
        entries
    }

    /// Rebuild the state that [`RelationTrials::entries`] took out.
    pub fn from_entries(settings: TrialSettings, entries: Vec<TrialEntry<u64>>) -> Self {
        let mut trials = Self::new(settings);
        for entry in entries {
            let verdict = match entry.state {
                TrialState::Counting {
                    tried,
                    hits,
                    targets,
                } => {
                    trials.counts.insert(
                        entry.relation,
                        Counts {
                            tried,
                            hits,
                            targets: targets.into_iter().collect(),
                        },
                    );
                    continue;
                }
                TrialState::Open => Verdict::Open,
                TrialState::NotWorthTrying => Verdict::NotWorthTrying,
                TrialState::RestrictedTo { mut targets } => {
                    targets.sort_unstable();
                    targets.dedup();
                    Verdict::RestrictedTo(targets)
                }
            };
            trials.verdicts.insert(entry.relation, verdict);
        }
        trials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    fn trials() -> RelationTrials {
        RelationTrials::new(TrialSettings {
            budget: 10,
            min_hits: 3,
        })
    }

    #[test]
    fn verdicts_change_only_on_freeze() {
        let mut t = trials();
        for _ in 0..10 {
            t.record(1, &[]);
        }
        assert_eq!(t.verdict(1), &Verdict::Open);
        t.freeze();
        assert_eq!(t.verdict(1), &Verdict::NotWorthTrying);
        assert!(!t.verdict(1).allows(5));
    }

    #[test]
    fn rare_hits_restrict_targets() {
        let mut t = trials();
        t.record(2, &[7]);
        t.record(2, &[4, 7]);
        for _ in 0..8 {
            t.record(2, &[]);
        }
        t.freeze();
        assert_eq!(t.verdict(2), &Verdict::RestrictedTo(vec![4, 7]));
        assert!(t.verdict(2).allows(4));
        assert!(!t.verdict(2).allows(5));
    }

    #[test]
    fn enough_hits_stay_open_and_budget_is_respected() {
        let mut t = trials();
        for i in 0..10 {
            t.record(3, &[i]);
        }
        for _ in 0..9 {
            t.record(4, &[]);
        }
        t.freeze();
        assert_eq!(t.verdict(3), &Verdict::Open);
        assert_eq!(t.frozen(), 1);
        assert_eq!(t.verdict(4), &Verdict::Open);
    }

    #[test]
    fn entries_restore_counts_and_verdicts() {
        let mut t = trials();
        for _ in 0..10 {
            t.record(1, &[]);
        }
        t.record(2, &[9, 8]);
        t.freeze();
        let entries = t.entries();
        assert_eq!(
            entries,
            vec![
                TrialEntry {
                    relation: 1,
                    state: TrialState::NotWorthTrying
                },
                TrialEntry {
                    relation: 2,
                    state: TrialState::Counting {
                        tried: 1,
                        hits: 1,
                        targets: vec![8, 9]
                    }
                },
            ]
        );

        let mut restored = RelationTrials::from_entries(t.settings, entries);
        assert_eq!(restored.verdict(1), &Verdict::NotWorthTrying);
        for _ in 0..9 {
            restored.record(2, &[]);
        }
        restored.freeze();
        assert_eq!(restored.verdict(2), &Verdict::RestrictedTo(vec![8, 9]));
    }

    #[test]
    fn entries_map_to_names_and_back() {
        let entry = TrialEntry {
            relation: 3u64,
            state: TrialState::RestrictedTo {
                targets: vec![4, 7],
            },
        };
        let named = entry
            .clone()
            .try_map(|c| Ok::<_, ()>(format!("r{c}")), |c| Ok(format!("j{c}")))
            .unwrap();
        assert_eq!(named.relation, "r3");
        let json = serde_json::to_string(&named).unwrap();
        let parsed: TrialEntry<String> = serde_json::from_str(&json).unwrap();
        let back = parsed
            .try_map(
                |n| n[1..].parse::<u64>().map_err(|_| ()),
                |n| n[1..].parse::<u64>().map_err(|_| ()),
            )
            .unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn concurrent_records_are_all_counted() {
        let mut t = trials();
        (0..1000u64).into_par_iter().for_each(|i| {
            t.record(i % 2, &[]);
        });
        t.freeze();
        assert_eq!(t.verdict(0), &Verdict::NotWorthTrying);
        assert_eq!(t.verdict(1), &Verdict::NotWorthTrying);
    }
}
