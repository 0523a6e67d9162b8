//! Tool definitions — static Jira tool table, typed parameter metadata,
//! argument access and execution plans.

pub mod args;
pub mod catalog;
pub mod jira;
pub mod plan;

pub use args::{ArgumentError, ToolArgs};
pub use catalog::{ParamDef, ParamType, ToolAccess, ToolCatalog, ToolDefinition};
pub use jira::JiraTool;
pub use plan::{AvailableTransition, Plan, Shape, TransitionPlan};
