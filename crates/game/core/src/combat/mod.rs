//! Combat resolution.
//!
//! The arithmetic in [`damage`] and [`hit`] is pure and backs the built-in
//! attack formulas. [`Simulation::make_attack`](crate::sim::Simulation::make_attack)
//! drives one full attack: tag selection, outcome formula, reactions, events
//! and damage.

pub mod damage;
pub mod hit;
mod resolve;
pub mod result;

pub use damage::{critical_damage, hit_damage};
pub use hit::{calculate_hit_chance, select_tag};
pub use result::AttackOutcome;
