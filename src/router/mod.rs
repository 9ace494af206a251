//! # Router Module
//!
//! The routing machinery behind the [`App`](crate::app::App) engine: the
//! radix-trie [`matcher`](crate::router::matcher) that indexes patterns by
//! method, and the [`chain`](crate::router::chain) runner that executes
//! middleware in front of a terminal handler.

#![warn(missing_docs)]

/// The middleware chain runner and the `Next` continuation.
pub mod chain;

/// The radix-trie path matcher.
pub mod matcher;
