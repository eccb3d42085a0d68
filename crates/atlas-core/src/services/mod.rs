pub mod calculator;
pub mod pr;
pub mod rank;
pub mod scoring;

#[cfg(test)]
mod calculator_tests;


pub use calculator::{CalculatorConfig, CalculatorService};
pub use pr::{evaluate_prs, PrEvaluation};
pub use rank::{aggregate, Aggregation, ReferenceContext, StoredRanks, WriteChannel};
