//! Builds and maintains a local database of the CI status of a branch: its commits, their
//! check suites, the workflow runs behind them, and the artifacts those runs produced.
//!
//! The [`database`] module holds the in-memory reconciliation logic. Fetching from GitHub
//! ([`transactions`]), persistence ([`store`]) and the batch job ([`pipeline`]) are layered
//! on top behind cargo features.

pub mod database;
pub mod env;
pub mod error;
pub mod framework;
pub mod pipeline;
pub mod store;
pub mod transactions;
pub mod workflow;

/// A shorthand to define a statically allocated variable using a [`std::sync::LazyLock`].
///
/// # Examples
///
/// ```rust
/// # use build_status_db::static_lazy_lock;
/// # use std::sync::LazyLock;
/// static_lazy_lock!{
///     pub VAR_1: String = String::from("a static variable");
/// }
/// // ...equals to...
/// pub static VAR_2: LazyLock<String> = LazyLock::new(|| String::from("a static variable"));
/// # assert_eq!(*VAR_1, *VAR_2);
/// ```
#[macro_export]
macro_rules! static_lazy_lock {
    ($(#[$meta:meta])* $vis:vis $name:ident: $type:ty = $expr:expr $(;)?) => {
        $(#[$meta])*
        $vis static $name: $crate::__priv_macro_use::LazyLock<$type> =
            $crate::__priv_macro_use::LazyLock::new(|| $expr);
    };
}

#[doc(hidden)]
pub mod __priv_macro_use {
    pub use std::sync::LazyLock;
}
