mod event;

pub use event::{ChatTurn, EventKind, InboundEvent, TurnRole};
