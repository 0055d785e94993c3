//! Turn selection.
//!
//! The scheduler decides who speaks next. Its only inputs are the stance of
//! the role it last picked, the moderator policy and its random source, so a
//! given seed always replays the same speaking order for the same registry.
//!
//! ```text
//! Start ──any role──▶ AfterPro ──Con──▶ AfterCon ──Pro──▶ AfterPro ...
//!                     AfterNeutral ──Pro ∪ Con──▶ ...
//! (any state) ──last turn handed out──▶ Done
//! ```
//!
//! Moderator turns are layered on top by [`ModeratorPolicy`]; they never
//! break alternation because a neutral turn constrains neither neighbour.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DebateError;
use crate::participant::{Role, Stance};
use crate::registry::SpeakerRegistry;

/// When the moderator gets the floor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ModeratorPolicy {
    /// Only if drawn as the opening speaker.
    #[default]
    StartOnly,
    /// Every turn whose 1-based number is a multiple of `every`.
    Interval { every: usize },
    /// Each turn after the first with probability `chance`.
    Probability { chance: f64 },
}

/// Who may answer a moderator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NeutralFollowUp {
    /// Any opinionated role.
    #[default]
    Open,
    /// The stance opposing the last opinionated turn, if there was one.
    OpposeLast,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SchedulingPolicy {
    pub moderator: ModeratorPolicy,
    pub follow_up: NeutralFollowUp,
}

impl SchedulingPolicy {
    /// Check that a run of `total_turns` can be completed with `registry`
    /// whatever the random draws turn out to be.
    pub fn validate(
        &self,
        registry: &SpeakerRegistry,
        total_turns: usize,
    ) -> Result<(), DebateError> {
        if total_turns == 0 {
            return Err(DebateError::InvalidTurnCount(total_turns));
        }

        if total_turns >= 2 {
            registry.roles_for_stance(Stance::Pro)?;
            registry.roles_for_stance(Stance::Con)?;
        }

        let needs_moderator = match self.moderator {
            ModeratorPolicy::StartOnly => false,
            ModeratorPolicy::Interval { every } => {
                if every < 2 {
                    return Err(DebateError::InvalidPolicy(format!(
                        "moderator interval must be at least 2, got {}",
                        every
                    )));
                }
                every <= total_turns
            }
            ModeratorPolicy::Probability { chance } => {
                if !(chance > 0.0 && chance <= 1.0) {
                    return Err(DebateError::InvalidPolicy(format!(
                        "moderator chance must be in (0, 1], got {}",
                        chance
                    )));
                }
                total_turns >= 2
            }
        };

        if needs_moderator {
            registry.roles_for_stance(Stance::Neutral)?;
        }

        Ok(())
    }
}

/// Where the scheduler stands after its latest pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Start,
    AfterPro,
    AfterCon,
    AfterNeutral,
    Done,
}

impl SchedulerState {
    fn after(stance: Stance) -> Self {
        match stance {
            Stance::Pro => SchedulerState::AfterPro,
            Stance::Con => SchedulerState::AfterCon,
            Stance::Neutral => SchedulerState::AfterNeutral,
        }
    }
}

/// Picks speakers for a fixed number of turns.
pub struct TurnScheduler<'a, R> {
    registry: &'a SpeakerRegistry,
    policy: SchedulingPolicy,
    rng: R,
    state: SchedulerState,
    total_turns: usize,
    selected: usize,
    last_opinionated: Option<Stance>,
}

impl<'a, R: RngCore> TurnScheduler<'a, R> {
    /// Validates the run up front; no turn is ever handed out for a run
    /// that cannot finish.
    pub fn new(
        registry: &'a SpeakerRegistry,
        policy: SchedulingPolicy,
        total_turns: usize,
        rng: R,
    ) -> Result<Self, DebateError> {
        policy.validate(registry, total_turns)?;

        Ok(Self {
            registry,
            policy,
            rng,
            state: SchedulerState::Start,
            total_turns,
            selected: 0,
            last_opinionated: None,
        })
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Number of speakers handed out so far.
    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Pick the next speaker, or `None` once every turn has been handed out.
    pub fn next_speaker(&mut self) -> Result<Option<&'a Role>, DebateError> {
        if self.selected == self.total_turns {
            self.state = SchedulerState::Done;
        }

        let previous = match self.state {
            SchedulerState::Done => return Ok(None),
            SchedulerState::Start => None,
            SchedulerState::AfterPro => Some(Stance::Pro),
            SchedulerState::AfterCon => Some(Stance::Con),
            SchedulerState::AfterNeutral => Some(Stance::Neutral),
        };

        let turn = self.selected + 1;
        let role = match previous {
            None => self
                .registry
                .all_roles()
                .choose(&mut self.rng)
                .ok_or(DebateError::EmptyRegistry)?,
            Some(previous) => {
                let wanted = self.eligible_stances(previous, turn);
                let pool = self.registry.pool(&wanted);
                match pool.choose(&mut self.rng) {
                    Some(role) => *role,
                    None => {
                        let wanted = wanted
                            .iter()
                            .map(|s| s.to_string())
                            .collect::<Vec<_>>()
                            .join(" or ");
                        return Err(DebateError::SelectionImpossible { turn, wanted });
                    }
                }
            }
        };

        debug!(
            turn,
            from = ?self.state,
            speaker = %role.name,
            stance = %role.stance,
            "selected speaker"
        );

        self.selected = turn;
        self.state = SchedulerState::after(role.stance);
        if role.stance.is_opinionated() {
            self.last_opinionated = Some(role.stance);
        }

        Ok(Some(role))
    }

    /// Stances allowed to take `turn` (1-based, never the opening turn)
    /// when `previous` spoke last.
    fn eligible_stances(&mut self, previous: Stance, turn: usize) -> Vec<Stance> {
        let moderator_due = match self.policy.moderator {
            ModeratorPolicy::StartOnly => false,
            ModeratorPolicy::Interval { every } => turn % every == 0,
            ModeratorPolicy::Probability { chance } => self.rng.gen_bool(chance),
        };
        if moderator_due {
            return vec![Stance::Neutral];
        }

        match previous {
            Stance::Pro => vec![Stance::Con],
            Stance::Con => vec![Stance::Pro],
            Stance::Neutral => {
                let opposing = self.last_opinionated.and_then(|s| s.opposing());
                match (self.policy.follow_up, opposing) {
                    (NeutralFollowUp::OpposeLast, Some(stance)) => vec![stance],
                    _ => vec![Stance::Pro, Stance::Con],
                }
            }
        }
    }
}
