//! In-process stores.
//!
//! Both stores are owned objects created once at startup and shared through
//! `AppState`; nothing here survives a restart.

mod clock;
mod flashcards;
mod usage;

pub use clock::*;
pub use flashcards::*;
pub use usage::*;
