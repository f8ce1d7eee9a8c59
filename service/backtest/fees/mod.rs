use serde::Deserialize;

mod borrow;
mod engine;
mod portfolio;
mod rules;

pub use borrow::*;
pub use engine::*;
pub use portfolio::*;
pub use rules::*;

/// Accrual cadence of a fee, as named in the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    #[default]
    MonthStart,
    WeekStart,
    EveryDay,
}
