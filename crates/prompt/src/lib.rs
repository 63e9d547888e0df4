//! Prompt templates, rendering, testing, and improvement.
//!
//! - [`renderer`]: `${name}` placeholder extraction and substitution
//! - [`runner`]: render + generate + record, one test at a time
//! - [`improver`]: framework rewrites and feedback refinement
//! - [`loader`]: YAML template import
//! - [`seeds`]: built-in system templates

pub mod improver;
pub mod loader;
pub mod renderer;
pub mod runner;
pub mod seeds;
pub mod types;

pub use improver::{find_framework, Framework, ImproveResult, PromptImprover, RefineResult, FRAMEWORKS};
pub use loader::{list_template_files, load_template_dir, load_template_file};
pub use renderer::{extract_variables, preview, render, Preview};
pub use runner::{PromptTestRunner, TestLog};
pub use seeds::system_templates;
pub use types::{
    CategoryCount, NewTestRecord, Template, TemplateDraft, TemplateVariable, TestRecord,
    TestStatus, VariableKind, Variables,
};
