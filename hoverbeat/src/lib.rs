/*!
 * Hover-judged rhythm game core: chart parsing, slider geometry, timing and
 * the per-object judgement state machines.
 */

pub mod chart;
pub mod config;
pub mod game;
