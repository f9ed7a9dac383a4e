//! Host stack growth for the recursive parser and evaluator.

/// Remaining stack below which the next recursion moves to a new segment.
const RED_ZONE: usize = 128 * 1024;
/// Size of each new stack segment.
const GROW_SIZE: usize = 4 * 1024 * 1024;

/// Run `f`, first switching to a fresh stack segment when the current one
/// is nearly exhausted.
pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, GROW_SIZE, f)
}
