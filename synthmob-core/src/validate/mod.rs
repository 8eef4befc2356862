//! Pure validation of pattern code and structured outputs.
//!
//! Both entry points return a [`Validation`] report instead of mutating
//! anything: `errors` block the write, `warnings` accompany accepted
//! writes and are passed back to the caller.
//!
//! The pattern rules are a string-level approximation of the
//! mini-expression dialect, not a full parser. Known limitation: the
//! decimal-tuple rejection inside `s("...")` can false-positive on
//! legitimate patterns such as `s("fm(0.5,0.2,0.4,0.7)")`.

mod output;
mod pattern;

pub use output::{validate_output, OutputKind};
pub use pattern::validate_pattern;
