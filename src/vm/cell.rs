use std::mem;
use super::promise::Status;
use super::value::{Outcome, Value};

pub(crate) type Reaction = Box<dyn FnOnce(Value) + Send>;

/// Status, payload and pending reactions of one promise.
///
/// The queues only exist while pending; settling swaps them out in the
/// same transition that stores the payload.
pub(crate) enum Cell {
    Pending {
        fulfilled: Vec<Reaction>,
        rejected:  Vec<Reaction>,
    },
    Fulfilled(Value),
    Rejected(Value),
}

impl Cell {
    pub fn new() -> Self {
        Cell::Pending {
            fulfilled: Vec::new(),
            rejected:  Vec::new(),
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Cell::Pending { .. } => Status::Pending,
            Cell::Fulfilled(_)   => Status::Fulfilled,
            Cell::Rejected(_)    => Status::Rejected,
        }
    }

    /// Leaves `Pending`, returning the reactions that must now run.
    /// `None` if the cell had already settled.
    pub fn settle(&mut self, outcome: Outcome) -> Option<(Vec<Reaction>, Value)> {
        if !matches!(self, Cell::Pending { .. }) {
            return None;
        }

        let next = match &outcome {
            Outcome::Fulfilled(value) => Cell::Fulfilled(value.clone()),
            Outcome::Rejected(reason) => Cell::Rejected(reason.clone()),
        };

        let (fulfilled, rejected) = match mem::replace(self, next) {
            Cell::Pending { fulfilled, rejected } => (fulfilled, rejected),
            Cell::Fulfilled(_) | Cell::Rejected(_) => return None,
        };

        Some(match outcome {
            Outcome::Fulfilled(value) => (fulfilled, value),
            Outcome::Rejected(reason) => (rejected, reason),
        })
    }

    /// Queues a reaction pair, or hands back the one that applies when
    /// the cell has already settled.
    pub fn subscribe(&mut self, on_fulfilled: Reaction, on_rejected: Reaction) -> Option<(Reaction, Value)> {
        match self {
            Cell::Pending { fulfilled, rejected } => {
                fulfilled.push(on_fulfilled);
                rejected.push(on_rejected);
                None
            }
            Cell::Fulfilled(value) => Some((on_fulfilled, value.clone())),
            Cell::Rejected(reason) => Some((on_rejected, reason.clone())),
        }
    }
}
