//! Score events and the committer that applies them.
//!
//! Workers never write to a store: they emit [`ScoreEvent`]s. A single
//! [`Committer`] owns the store being built, logs every event as it arrives
//! and commits the buffered events in ascending `(sub, super)` order, so the
//! resulting store does not depend on the order in which workers finished.
//!
//! A score file is this event log sorted, not a dump of the final store: it
//! also keeps pairs the store dropped afterwards through candidate eviction
//! or `reconcile_both_ways`.

use std::sync::mpsc::Receiver;

use concord_facts::FactStore;
use concord_scores::{Key, ScoreLog, ScoreStore, Stored};

use crate::engine::Direction;
use crate::join::JoinCoder;
use crate::AlignError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreKind {
    Equality,
    SubRelation(Direction),
    SubClass(Direction),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreEvent {
    pub kind: ScoreKind,
    pub sub: Key,
    pub sup: Key,
    pub score: f64,
}

/// Turns event keys back into names for the score files.
#[derive(Debug, Clone, Copy)]
pub struct Labels<'a> {
    pub kb1: &'a FactStore,
    pub kb2: &'a FactStore,
    pub coder1: &'a JoinCoder,
    pub coder2: &'a JoinCoder,
}

impl Labels<'_> {
    pub fn names(&self, event: &ScoreEvent) -> (String, String) {
        match event.kind {
            ScoreKind::Equality => (
                entity(self.kb1, event.sub),
                entity(self.kb2, event.sup),
            ),
            ScoreKind::SubClass(Direction::Forward) => (
                entity(self.kb1, event.sub),
                entity(self.kb2, event.sup),
            ),
            ScoreKind::SubClass(Direction::Backward) => (
                entity(self.kb2, event.sub),
                entity(self.kb1, event.sup),
            ),
            ScoreKind::SubRelation(Direction::Forward) => (
                join(self.coder1, self.kb1, event.sub),
                join(self.coder2, self.kb2, event.sup),
            ),
            ScoreKind::SubRelation(Direction::Backward) => (
                join(self.coder2, self.kb2, event.sub),
                join(self.coder1, self.kb1, event.sup),
            ),
        }
    }
}

fn entity(kb: &FactStore, key: Key) -> String {
    u32::try_from(key)
        .ok()
        .and_then(|id| kb.entity_name(id))
        .unwrap_or("?")
        .to_string()
}

fn join(coder: &JoinCoder, kb: &FactStore, code: Key) -> String {
    match coder.decode(code) {
        Ok(jr) => coder.render(&jr, kb),
        Err(_) => format!("#{code}"),
    }
}

/// Single writer of one score store.
pub struct Committer<'s> {
    kind: ScoreKind,
    store: &'s mut dyn ScoreStore,
    log: Option<&'s ScoreLog>,
    labels: Labels<'s>,
    buffer: Vec<ScoreEvent>,
    committed: usize,
}

impl<'s> Committer<'s> {
    pub fn new(
        kind: ScoreKind,
        store: &'s mut dyn ScoreStore,
        log: Option<&'s ScoreLog>,
        labels: Labels<'s>,
    ) -> Self {
        Self {
            kind,
            store,
            log,
            labels,
            buffer: Vec::new(),
            committed: 0,
        }
    }

    /// Log an event and buffer it for the next commit. Events of another
    /// kind are ignored.
    pub fn record(&mut self, event: ScoreEvent) -> Result<(), AlignError> {
        if event.kind != self.kind {
            tracing::warn!(?event, expected = ?self.kind, "dropping misrouted score event");
            return Ok(());
        }
        if let Some(log) = self.log {
            let (sub, sup) = self.labels.names(&event);
            log.append(&sub, &sup, event.score)?;
        }
        self.buffer.push(event);
        Ok(())
    }

    /// Drain a channel until every sender is gone, then commit.
    pub fn drain(&mut self, rx: Receiver<ScoreEvent>) -> Result<usize, AlignError> {
        for event in rx {
            self.record(event)?;
        }
        self.commit()
    }

    /// Apply the buffered events in `(sub, super)` order. Returns how many
    /// were committed.
    pub fn commit(&mut self) -> Result<usize, AlignError> {
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.sort_by(|a, b| a.sub.cmp(&b.sub).then(a.sup.cmp(&b.sup)));
        let mut committed = 0;
        for event in buffer {
            if self.store.set(event.sub, event.sup, event.score)? == Stored::Committed {
                committed += 1;
            }
        }
        self.committed += committed;
        if let Some(log) = self.log {
            log.flush()?;
        }
        Ok(committed)
    }

    pub fn committed(&self) -> usize {
        self.committed
    }
}
