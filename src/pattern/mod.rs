//! # Pattern Module
//!
//! Path pattern compilation and matching for sluice.
//!
//! A pattern string such as `/pets/<id:int>/toys/<name>` is compiled once at
//! registration time into an ordered segment list. Matching an incoming path
//! walks the segments, validates typed captures, and yields the raw capture
//! values; no regex scan runs per request except for `double` syntax
//! validation.
//!
//! ## Capture types
//!
//! | Tag | Accepts |
//! |-----|---------|
//! | `int` | signed decimal that fits `i64` |
//! | `double` | decimal with optional exponent (`numeric` is an alias) |
//! | `bool` | `true false 0 1 yes no`, case-insensitive (`logical` is an alias) |
//! | `string` | any non-`/` run (the default when no tag is given) |
//!
//! A failed type validation is a no-match, not an error; errors only arise
//! at compile time for unbalanced brackets or unknown tags.

mod core;

pub use core::{
    CaptureSpec, CaptureVec, ParamType, PathPattern, Segment, MAX_INLINE_CAPTURES,
};
