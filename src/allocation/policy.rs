use crate::fleet::Agv;

/// Chooses one agent among those eligible for new work.
///
/// `available` is in registry order. Implementations must be deterministic
/// for a given input; the engine claims the chosen agent in the same
/// critical section.
pub trait SelectionPolicy: Send + Sync {
    fn select<'a>(&self, available: &[&'a Agv]) -> Option<&'a Agv>;
}

/// First eligible agent in registry order
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstAvailable;

impl SelectionPolicy for FirstAvailable {
    fn select<'a>(&self, available: &[&'a Agv]) -> Option<&'a Agv> {
        available.first().copied()
    }
}
