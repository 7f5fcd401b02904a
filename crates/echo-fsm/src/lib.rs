// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Echo FSM
//!
//! Table-driven finite state machine for gameplay logic. Each state declares
//! the states it may transition to, an enter action, and an optional per-tick
//! action. Enter actions may request an immediate follow-up transition; the
//! machine follows such chains within a single call until an action settles
//! with [`Transition::Stay`] or [`Transition::Default`].

use core::fmt::Debug;
use core::hash::Hash;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, trace};

/// Default bound on chained transitions in one `enter_state` call.
pub const DEFAULT_CHAIN_LIMIT: usize = 64;

/// Result of a state action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<S> {
    /// Transition onwards to the given state immediately.
    To(S),
    /// Remain in the current state.
    Stay,
    /// Remain in the current state and let the caller apply its default handling.
    Default,
}

/// Errors returned by [`StateMachine`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsmError<S: Debug> {
    /// `to` is not in the allowed transition set of `from`.
    #[error("transition rejected: {from:?} -> {to:?}")]
    TransitionRejected {
        /// State the machine was in.
        from: S,
        /// Requested target.
        to: S,
    },
    /// The target is reachable but declares no enter action.
    #[error("missing action for state {0:?}")]
    MissingAction(S),
    /// The state is not registered in the table.
    #[error("unknown state {0:?}")]
    UnknownState(S),
    /// Enter actions kept chaining past the configured limit.
    #[error("transition chain exceeded {limit} hops")]
    TransitionLoop {
        /// Limit that was hit.
        limit: usize,
    },
}

/// How a transition chain came to rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settled<S> {
    /// State the machine ended in.
    pub state: S,
    /// Number of states entered, including the first target.
    pub hops: usize,
    /// `true` if the last action returned [`Transition::Default`].
    pub default: bool,
}

type EnterAction<S, C> = Box<dyn FnMut(&mut C) -> Transition<S>>;
type TickAction<S, C> = Box<dyn FnMut(f32, &mut C) -> Transition<S>>;

/// One row of the state table.
pub struct StateSpec<S, C> {
    allowed: Vec<S>,
    on_enter: Option<EnterAction<S, C>>,
    on_tick: Option<TickAction<S, C>>,
}

impl<S, C> Default for StateSpec<S, C> {
    fn default() -> Self {
        Self {
            allowed: Vec::new(),
            on_enter: None,
            on_tick: None,
        }
    }
}

impl<S: PartialEq, C> StateSpec<S, C> {
    /// Empty row: no outgoing transitions, no actions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows a transition from this state to `target`.
    #[must_use]
    pub fn allow(mut self, target: S) -> Self {
        if !self.allowed.contains(&target) {
            self.allowed.push(target);
        }
        self
    }

    /// Sets the action run when the state is entered.
    #[must_use]
    pub fn on_enter<F>(mut self, action: F) -> Self
    where
        F: FnMut(&mut C) -> Transition<S> + 'static,
    {
        self.on_enter = Some(Box::new(action));
        self
    }

    /// Sets the action run on every tick while the state is current.
    #[must_use]
    pub fn on_tick<F>(mut self, action: F) -> Self
    where
        F: FnMut(f32, &mut C) -> Transition<S> + 'static,
    {
        self.on_tick = Some(Box::new(action));
        self
    }

    /// Returns `true` if `target` is an allowed successor.
    #[must_use]
    pub fn allows(&self, target: &S) -> bool {
        self.allowed.contains(target)
    }

    /// Allowed successors, in declaration order.
    #[must_use]
    pub fn outgoing(&self) -> &[S] {
        &self.allowed
    }
}

/// Finite state machine over states `S` acting on a context `C`.
pub struct StateMachine<S, C> {
    states: FxHashMap<S, StateSpec<S, C>>,
    current: S,
    chain_limit: usize,
}

impl<S, C> StateMachine<S, C>
where
    S: Copy + Eq + Hash + Debug,
{
    /// Machine starting in `initial` with an empty table.
    ///
    /// The initial state is current without running its enter action.
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self {
            states: FxHashMap::default(),
            current: initial,
            chain_limit: DEFAULT_CHAIN_LIMIT,
        }
    }

    /// Adds or replaces the row for `state`.
    #[must_use]
    pub fn with_state(mut self, state: S, spec: StateSpec<S, C>) -> Self {
        self.states.insert(state, spec);
        self
    }

    /// Overrides the bound on chained transitions.
    #[must_use]
    pub fn with_chain_limit(mut self, limit: usize) -> Self {
        self.chain_limit = limit;
        self
    }

    /// Current state.
    #[must_use]
    pub fn current(&self) -> S {
        self.current
    }

    /// Allowed successors of the current state.
    #[must_use]
    pub fn outgoing(&self) -> &[S] {
        self.states
            .get(&self.current)
            .map_or(&[] as &[S], |spec| spec.outgoing())
    }

    /// Returns `true` if the current state allows a transition to `target`.
    #[must_use]
    pub fn can_enter(&self, target: S) -> bool {
        self.states
            .get(&self.current)
            .is_some_and(|spec| spec.allows(&target))
    }

    /// Transitions to `target`, running its enter action and following any
    /// chained transitions the actions request.
    ///
    /// A rejected hop leaves the machine in the last state it successfully
    /// entered.
    pub fn enter_state(&mut self, target: S, ctx: &mut C) -> Result<Settled<S>, FsmError<S>> {
        let mut target = target;
        let mut hops = 0;
        loop {
            if hops >= self.chain_limit {
                return Err(FsmError::TransitionLoop {
                    limit: self.chain_limit,
                });
            }
            let from = self.current;
            let current = self
                .states
                .get(&from)
                .ok_or(FsmError::UnknownState(from))?;
            if !current.allows(&target) {
                return Err(FsmError::TransitionRejected { from, to: target });
            }
            let action = self
                .states
                .get_mut(&target)
                .ok_or(FsmError::UnknownState(target))?
                .on_enter
                .as_mut()
                .ok_or(FsmError::MissingAction(target))?;

            self.current = target;
            hops += 1;
            trace!(?from, to = ?target, hops, "fsm enter");
            match action(ctx) {
                Transition::To(next) => target = next,
                rest => {
                    debug!(state = ?target, hops, "fsm settled");
                    return Ok(Settled {
                        state: target,
                        hops,
                        default: rest == Transition::Default,
                    });
                }
            }
        }
    }

    /// Runs the current state's tick action. A requested transition is
    /// performed through [`StateMachine::enter_state`].
    ///
    /// Returns `Ok(None)` when nothing transitioned.
    pub fn tick(&mut self, dt: f32, ctx: &mut C) -> Result<Option<Settled<S>>, FsmError<S>> {
        let state = self.current;
        let spec = self
            .states
            .get_mut(&state)
            .ok_or(FsmError::UnknownState(state))?;
        let Some(action) = spec.on_tick.as_mut() else {
            return Ok(None);
        };
        match action(dt, ctx) {
            Transition::To(next) => self.enter_state(next, ctx).map(Some),
            Transition::Stay | Transition::Default => Ok(None),
        }
    }
}
