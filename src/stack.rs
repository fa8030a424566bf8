//! Stack growth for recursive evaluation.
//!
//! Parsing, compilation, guest calls and nested `eval` all recurse on the host stack.
//! Each of those entry points runs through [`ensure_sufficient_stack`] so the
//! configured nesting and call depth limits, not the host thread's stack size,
//! bound recursion.

/// Runs `f`, first moving to a freshly allocated stack segment when less than
/// the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    const RED_ZONE: usize = 128 * 1024;
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
