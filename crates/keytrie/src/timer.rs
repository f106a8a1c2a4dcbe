//! # Ambiguity timers
//!
//! ## Overview
//!
//! When a key sequence is both a complete binding and a prefix of longer ones, an interpreter
//! waits a little before deciding that the shorter binding was meant. How that waiting happens
//! depends on the host: a terminal application might use a helper thread, a GUI its own event
//! loop, and a test suite nothing at all.
//!
//! Interpreters therefore only ever [arm](Timer::arm) and [cancel](Timer::cancel) a [Timer] with a
//! [TimerTicket]. When the time runs out, the host hands the ticket back to the interpreter. Each
//! ticket carries a generation number, so a ticket that arrives after the interpreter has moved on
//! is recognized as stale and ignored.
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crossbeam_channel::{after, select, unbounded, Sender};

/// Identifies one armed timeout.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct TimerTicket {
    owner: u64,
    generation: u64,
}

impl TimerTicket {
    /// Create the first ticket for an owner.
    pub fn new(owner: u64) -> Self {
        TimerTicket { owner, generation: 0 }
    }

    /// Create the ticket that follows this one, invalidating it.
    pub fn next(&self) -> Self {
        TimerTicket { owner: self.owner, generation: self.generation.wrapping_add(1) }
    }

    /// The owner this ticket was created for.
    pub fn owner(&self) -> u64 {
        self.owner
    }

    /// How many tickets came before this one for the same owner.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A cancellable, delayed callback that reports back with a [TimerTicket].
///
/// Implementations must never block the caller. Arming a new ticket replaces whichever ticket was
/// armed before.
pub trait Timer: Send {
    /// Start waiting `after` for the given ticket.
    fn arm(&mut self, ticket: TimerTicket, after: Duration);

    /// Stop waiting for the given ticket, if it is still armed.
    fn cancel(&mut self, ticket: TimerTicket);
}

/// A timer that never fires.
///
/// Hosts using this rely entirely on explicit flushes to resolve ambiguous sequences.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTimer;

impl Timer for NoTimer {
    fn arm(&mut self, _: TimerTicket, _: Duration) {}

    fn cancel(&mut self, _: TimerTicket) {}
}

#[derive(Debug, Default)]
struct ManualState {
    armed: Option<(TimerTicket, Duration)>,
    arms: usize,
    cancels: usize,
}

/// A timer whose clock is advanced by hand.
///
/// Clones share their state, so a test can keep one handle while the interpreter owns another,
/// and then decide exactly when a timeout happens with [ManualTimer::fire].
#[derive(Clone, Debug, Default)]
pub struct ManualTimer {
    state: Arc<Mutex<ManualState>>,
}

impl ManualTimer {
    /// Create a new timer with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The ticket that is currently armed, if any.
    pub fn armed(&self) -> Option<TimerTicket> {
        self.lock().armed.map(|(ticket, _)| ticket)
    }

    /// How long the currently armed ticket asked to wait.
    pub fn delay(&self) -> Option<Duration> {
        self.lock().armed.map(|(_, delay)| delay)
    }

    /// Let the time run out, returning the ticket to give back to the interpreter.
    pub fn fire(&self) -> Option<TimerTicket> {
        self.lock().armed.take().map(|(ticket, _)| ticket)
    }

    /// How many times a ticket has been armed.
    pub fn arms(&self) -> usize {
        self.lock().arms
    }

    /// How many times an armed ticket has been cancelled.
    pub fn cancels(&self) -> usize {
        self.lock().cancels
    }
}

impl Timer for ManualTimer {
    fn arm(&mut self, ticket: TimerTicket, after: Duration) {
        let mut state = self.lock();
        state.armed = Some((ticket, after));
        state.arms += 1;
    }

    fn cancel(&mut self, ticket: TimerTicket) {
        let mut state = self.lock();

        if matches!(state.armed, Some((armed, _)) if armed == ticket) {
            state.armed = None;
            state.cancels += 1;
        }
    }
}

/// A timer that waits on a helper thread and delivers expired tickets over a channel.
///
/// The host selects on the receiving end of the channel alongside its input source, and passes
/// every ticket it gets back to the interpreter.
pub struct ChannelTimer {
    sender: Sender<TimerTicket>,
    armed: Option<(TimerTicket, Sender<()>)>,
}

impl ChannelTimer {
    /// Create a timer that sends expired tickets to `sender`.
    pub fn new(sender: Sender<TimerTicket>) -> Self {
        ChannelTimer { sender, armed: None }
    }
}

impl Timer for ChannelTimer {
    fn arm(&mut self, ticket: TimerTicket, delay: Duration) {
        let (cancel_tx, cancel_rx) = unbounded::<()>();
        let sender = self.sender.clone();

        // Replacing the previous entry drops its cancellation sender, which wakes its thread.
        self.armed = Some((ticket, cancel_tx));

        std::thread::spawn(move || {
            select! {
                recv(cancel_rx) -> _ => {
                    tracing::trace!(?ticket, "timer cancelled");
                },
                recv(after(delay)) -> _ => {
                    if sender.send(ticket).is_err() {
                        tracing::debug!(?ticket, "timer receiver is gone");
                    }
                },
            }
        });
    }

    fn cancel(&mut self, ticket: TimerTicket) {
        if matches!(&self.armed, Some((armed, _)) if *armed == ticket) {
            self.armed = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_generations() {
        let first = TimerTicket::new(3);
        let second = first.next();

        assert_ne!(first, second);
        assert_eq!(first.owner(), second.owner());
        assert_eq!(second.generation(), first.generation() + 1);
        assert_ne!(TimerTicket::new(3), TimerTicket::new(4));
    }

    #[test]
    fn test_manual_timer() {
        let handle = ManualTimer::new();
        let mut timer = handle.clone();
        let ticket = TimerTicket::new(0);

        timer.arm(ticket, Duration::from_millis(1000));
        assert_eq!(handle.armed(), Some(ticket));
        assert_eq!(handle.delay(), Some(Duration::from_millis(1000)));

        // Cancelling some other ticket does nothing.
        timer.cancel(ticket.next());
        assert_eq!(handle.armed(), Some(ticket));
        assert_eq!(handle.cancels(), 0);

        timer.cancel(ticket);
        assert_eq!(handle.armed(), None);
        assert_eq!(handle.fire(), None);
        assert_eq!(handle.cancels(), 1);

        // Arming again replaces whatever was there.
        timer.arm(ticket, Duration::from_millis(5));
        timer.arm(ticket.next(), Duration::from_millis(5));
        assert_eq!(handle.arms(), 3);
        assert_eq!(handle.fire(), Some(ticket.next()));
        assert_eq!(handle.fire(), None);
    }

    #[test]
    fn test_channel_timer_fires() {
        let (tx, rx) = unbounded();
        let mut timer = ChannelTimer::new(tx);
        let ticket = TimerTicket::new(1);

        timer.arm(ticket, Duration::from_millis(5));

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(ticket));
    }

    #[test]
    fn test_channel_timer_cancel() {
        let (tx, rx) = unbounded();
        let mut timer = ChannelTimer::new(tx);
        let first = TimerTicket::new(1);
        let second = first.next();

        timer.arm(first, Duration::from_millis(20));
        timer.cancel(first);
        timer.arm(second, Duration::from_millis(40));

        // Only the second ticket ever arrives.
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(second));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }
}
