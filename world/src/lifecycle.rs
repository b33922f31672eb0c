//! Current-session slot and pending timer set.
//!
//! Every timer carries the owner it was scheduled for. Cancelling an owner
//! removes its timers eagerly, and [`Lifecycle::pop_due`] still reports the
//! owner so the caller can compare it against the live tokens before acting.

use std::{collections::BTreeMap, time::Duration};

use flipboard_core::{BurstToken, CellAddress, SessionToken, TimerId, TimerOwner, Wake};

/// Timer waiting for the clock to reach its due instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PendingTimer {
    pub(crate) id: TimerId,
    pub(crate) due: Duration,
    pub(crate) owner: TimerOwner,
    pub(crate) wake: Wake,
}

/// Token issuer and timer queue for one mounted engine.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    next_session: u64,
    next_burst: u64,
    next_timer: u64,
    current: Option<SessionToken>,
    bursts: BTreeMap<BurstToken, CellAddress>,
    timers: BTreeMap<(Duration, TimerId), (TimerOwner, Wake)>,
}

impl Lifecycle {
    /// Issues a fresh session token and makes it current.
    ///
    /// Callers must cancel the previous session first.
    pub(crate) fn issue_session(&mut self) -> SessionToken {
        debug_assert!(self.current.is_none(), "previous session still live");
        self.next_session = self.next_session.saturating_add(1);
        let token = SessionToken::new(self.next_session);
        self.current = Some(token);
        token
    }

    /// Token of the live session, if any.
    pub(crate) fn current_session(&self) -> Option<SessionToken> {
        self.current
    }

    /// Retires the current session and drops every timer it owns.
    pub(crate) fn cancel_session(&mut self) -> Option<SessionToken> {
        let token = self.current.take()?;
        let owner = TimerOwner::Session(token);
        self.timers.retain(|_, (timer_owner, _)| *timer_owner != owner);
        Some(token)
    }

    /// Admits a burst on the provided cell.
    pub(crate) fn begin_burst(&mut self, address: CellAddress) -> BurstToken {
        self.next_burst = self.next_burst.saturating_add(1);
        let token = BurstToken::new(self.next_burst);
        let _ = self.bursts.insert(token, address);
        token
    }

    /// Cell perturbed by a live burst.
    pub(crate) fn burst_address(&self, burst: BurstToken) -> Option<CellAddress> {
        self.bursts.get(&burst).copied()
    }

    /// Retires a burst, returning the cell it perturbed.
    pub(crate) fn finish_burst(&mut self, burst: BurstToken) -> Option<CellAddress> {
        let address = self.bursts.remove(&burst)?;
        let owner = TimerOwner::Burst(burst);
        self.timers.retain(|_, (timer_owner, _)| *timer_owner != owner);
        Some(address)
    }

    /// Retires every live burst and drops their timers, returning the cells they perturbed.
    pub(crate) fn cancel_bursts(&mut self) -> Vec<CellAddress> {
        self.timers
            .retain(|_, (owner, _)| !matches!(owner, TimerOwner::Burst(_)));
        std::mem::take(&mut self.bursts).into_values().collect()
    }

    /// Reports whether callbacks scheduled for `owner` may still act.
    pub(crate) fn is_live(&self, owner: TimerOwner) -> bool {
        match owner {
            TimerOwner::Session(token) => self.current == Some(token),
            TimerOwner::Burst(token) => self.bursts.contains_key(&token),
        }
    }

    /// Queues a timer that fires at `due`.
    pub(crate) fn schedule(&mut self, due: Duration, owner: TimerOwner, wake: Wake) -> TimerId {
        self.next_timer = self.next_timer.saturating_add(1);
        let id = TimerId::new(self.next_timer);
        let _ = self.timers.insert((due, id), (owner, wake));
        id
    }

    /// Removes and returns the earliest timer due at or before `until`.
    ///
    /// Timers sharing a due instant fire in scheduling order.
    pub(crate) fn pop_due(&mut self, until: Duration) -> Option<PendingTimer> {
        let (&(due, id), _) = self.timers.iter().next()?;
        if due > until {
            return None;
        }
        let (owner, wake) = self.timers.remove(&(due, id))?;
        Some(PendingTimer {
            id,
            due,
            owner,
            wake,
        })
    }

    /// Number of timers waiting to fire.
    pub(crate) fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Number of bursts currently running.
    pub(crate) fn live_bursts(&self) -> usize {
        self.bursts.len()
    }

    /// Cancels the session and every timer. Bursts must be retired first.
    pub(crate) fn clear(&mut self) -> Option<SessionToken> {
        debug_assert!(self.bursts.is_empty(), "bursts still live");
        let session = self.cancel_session();
        self.timers.clear();
        session
    }
}
