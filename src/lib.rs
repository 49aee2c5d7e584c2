pub mod value;
pub mod value_rhai;
pub mod scene_graph;
pub mod member_registry;
pub mod reference_chain;
pub mod conversion;
pub mod value_source;
pub mod variable;
pub mod creation;
pub mod diagnostics;

// Scripting modules
pub mod script_host;
pub mod script_log;

pub mod cli;
