//! Concord aligner: iterative probabilistic alignment of two knowledge bases.
//!
//! Three kinds of scores are estimated from each other until they settle:
//!
//! - **Equality** `P(y1 ≡ y2)` of a base-1 instance and a base-2 instance,
//!   from the facts they share through aligned relations.
//! - **Sub-relation** `P(r ⊆ J)` of a relation of one base and a join
//!   relation (a path of up to [`MAX_JOIN_CAPACITY`] relations) of the other,
//!   from how often equivalent arguments are connected.
//! - **Sub-class** `P(c1 ⊆ c2)`, once equalities are final.
//!
//! [`Aligner`] owns the score stores and runs the passes; workers never
//! write to a store but emit [`ScoreEvent`]s that a single committer
//! applies in a fixed order, so results do not depend on thread scheduling.
//!
//! ```text
//! equality pass ──► relation pass (both directions) ──► converged? ──► class pass
//!      ▲                                                    │ no
//!      └────────────────────────────────────────────────────┘
//! ```

mod classes;
mod engine;
mod equality;
mod equivalence;
mod error;
mod events;
pub mod join;
mod neighborhood;
mod normalizer;
pub mod output;
mod relations;
mod settings;
mod stop;
mod trials;

pub use engine::{Aligner, Direction, EqualityOutcome, RunOutcome};
pub use equivalence::{Equivalences, LiteralMatcher};
pub use error::{AlignError, JoinError, SettingsError};
pub use events::{Committer, Labels, ScoreEvent, ScoreKind};
pub use join::{JoinCoder, JoinRelation, MAX_JOIN_CAPACITY};
pub use neighborhood::{Neighborhood, NodeStats};
pub use normalizer::{NormalizerKind, RelationNormalizer};
pub use settings::{EqualityCandidates, LiteralMode, ResumePoint, Settings, TrialSettings};
pub use stop::StopSignal;
pub use trials::{RelationTrials, TrialEntry, TrialState, Verdict};
