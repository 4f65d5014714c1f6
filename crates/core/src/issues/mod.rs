//! Data-quality issue rules with dual in-memory/SQL evaluation.

mod issues_model;

pub use issues_model::{
    has_open_issues, issue_rules, issues_for, open_issues_expr, IssueDetails, IssueIcon, IssueRule,
    ResolutionLocation, RuleExpr,
};
