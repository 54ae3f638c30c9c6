// Card Battle Schema - Shared type definitions
// This crate contains the static enums and data shapes shared between the
// card library data files and the battle engine.

// Re-export the main types
pub use card_data::*;
pub use card_types::*;
pub use effect_data::*;

pub mod card_data;
pub mod card_types;
pub mod effect_data;
