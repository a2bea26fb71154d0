//! Pure state machines that interpret events and decide on commands.
//!
//! A machine owns its state, `decide` is synchronous and performs no IO.
//! The caller executes the returned command and feeds the resulting event
//! back in. One event yields at most one command.

pub trait Machine: Send + 'static {
    type Event;
    type Command;

    /// Process an event and optionally return a command.
    ///
    /// Called serially; the machine may update its internal state.
    fn decide(&mut self, event: &Self::Event) -> Option<Self::Command>;
}
