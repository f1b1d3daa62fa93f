//! Cross-cutting helpers that sit outside the resolution core

pub mod debounce;

pub use debounce::Debouncer;
