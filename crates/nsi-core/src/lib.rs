//! Domain types and the pure reservation state machine: no I/O, no
//! database, no network — the transaction boundary and the side effects it
//! authorizes live in the binary crate.

pub mod model;
pub mod state;

pub use model::{LogEntry, Reservation, Sdp, Stp};
pub use state::{ConnectionState, Event, TransitionError};
