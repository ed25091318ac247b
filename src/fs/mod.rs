//! Filesystem utilities for doclock.
//!
//! Atomic writes keep `FileStore` documents from ever being observed half
//! written, even by a reader that does not take the collection guard.

pub mod atomic;

pub use atomic::atomic_write;
