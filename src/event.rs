use crate::error::GhprsError;

/// What a [`Feed`](crate::feed::Feed) yields on each call to `next`.
#[derive(Debug)]
pub enum Event<T> {
    Item(T),
    Error(GhprsError),
    /// Both the item and the error channel are closed and drained.
    Done,
}

