//! Per-project mining stages over a local checkout.

mod bugfix;
mod checkout;
mod correlator;
mod diff;
mod effort;
#[cfg(test)]
mod fixtures;
mod refactoring;
mod tools;

pub use bugfix::{mine_bug_fixes, save_bug_fix_report};
pub use checkout::{Checkout, WorkingTree};
pub use diff::{extract_diffs, save_commit_diffs, GitHistoryWalker};
pub use effort::{aggregate_effort, save_effort, SccCounter};
pub use refactoring::{summarize_refactorings, RefactoringMinerCli};
