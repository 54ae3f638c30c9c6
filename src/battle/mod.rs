pub mod abilities;
pub mod action_stack;
pub mod ai;
pub mod calculators;
pub mod commands;
pub mod conditions;
pub mod effects;
pub mod engine;
pub mod runner;
pub mod spells;
pub mod state;
pub mod stats;
pub mod summon;
pub mod traps;
pub mod view;

#[cfg(test)]
pub(crate) mod tests;
