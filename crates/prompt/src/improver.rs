//! Prompt improvement through named frameworks, and feedback-driven refinement.
//!
//! Both operations return their outcome as data. The only `Err` is an
//! unknown framework code, raised before any backend is contacted.

use crate::runner::{dispatch, elapsed_ms, DEFAULT_BUDGET};
use promptsmith_core::{AppError, AppResult};
use promptsmith_llm::{Connection, ProviderRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A structural rewrite recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Framework {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,

    /// Instruction text with a single `{prompt}` slot
    #[serde(skip)]
    pub template: &'static str,
}

impl Framework {
    /// The instruction sent to the backend for `prompt`.
    pub fn instruction(&self, prompt: &str) -> String {
        self.template.replace("{prompt}", prompt)
    }
}

/// The built-in framework catalogue.
pub const FRAMEWORKS: &[Framework] = &[
    Framework {
        code: "tcrei",
        name: "TCREI",
        description: "Task, Context, References, Evaluate, Iterate",
        template: "Please rewrite the following prompt using the TCREI framework:\n\n\
**Original Prompt:** {prompt}\n\n\
Rewrite it with these sections:\n\
1. **Task**: Clearly define what needs to be done\n\
2. **Context**: Provide relevant background and constraints\n\
3. **References**: Include examples or standards to follow\n\
4. **Evaluate**: Define success criteria\n\
5. **Iterate**: Suggest how to refine the output\n\n\
Provide only the rewritten prompt in a clear, structured format.",
    },
    Framework {
        code: "crispe",
        name: "CRISPE",
        description: "Capacity and Role, Insight, Statement, Personality, Experiment",
        template: "Please rewrite the following prompt using the CRISPE framework:\n\n\
**Original Prompt:** {prompt}\n\n\
Rewrite it with these sections:\n\
1. **Capacity and Role**: Define the AI's role and expertise\n\
2. **Insight**: Provide context and background information\n\
3. **Statement**: Clear task or question\n\
4. **Personality**: Define tone and style\n\
5. **Experiment**: Encourage creative solutions\n\n\
Provide only the rewritten prompt in a clear, structured format.",
    },
    Framework {
        code: "risen",
        name: "RISEN",
        description: "Role, Instructions, Steps, End Goal, Narrowing",
        template: "Please rewrite the following prompt using the RISEN framework:\n\n\
**Original Prompt:** {prompt}\n\n\
Rewrite it with these sections:\n\
1. **Role**: Define the AI's role\n\
2. **Instructions**: Clear, specific directions\n\
3. **Steps**: Break down the process\n\
4. **End Goal**: Define the desired outcome\n\
5. **Narrowing**: Add constraints and specifications\n\n\
Provide only the rewritten prompt in a clear, structured format.",
    },
    Framework {
        code: "race",
        name: "RACE",
        description: "Role, Action, Context, Expectation",
        template: "Please rewrite the following prompt using the RACE framework:\n\n\
**Original Prompt:** {prompt}\n\n\
Rewrite it with these sections:\n\
1. **Role**: Define what the AI should act as\n\
2. **Action**: Specify what the AI should do\n\
3. **Context**: Provide necessary background\n\
4. **Expectation**: Define the desired output format and quality\n\n\
Provide only the rewritten prompt in a clear, structured format.",
    },
    Framework {
        code: "care",
        name: "CARE",
        description: "Context, Action, Result, Example",
        template: "Please rewrite the following prompt using the CARE framework:\n\n\
**Original Prompt:** {prompt}\n\n\
Rewrite it with these sections:\n\
1. **Context**: Set the scene and background\n\
2. **Action**: What needs to be done\n\
3. **Result**: What the output should look like\n\
4. **Example**: Provide a sample or reference\n\n\
Provide only the rewritten prompt in a clear, structured format.",
    },
];

/// Look up a framework by its code.
pub fn find_framework(code: &str) -> Option<&'static Framework> {
    FRAMEWORKS.iter().find(|f| f.code == code)
}

/// Instruction asking the backend to revise `prompt` per `feedback`.
pub fn refine_instruction(prompt: &str, feedback: &str) -> String {
    format!(
        "I have the following prompt:\n\n{}\n\n\
Please improve it based on this feedback:\n{}\n\n\
Provide only the refined prompt with the improvements applied. \
Keep the same structure and framework, but incorporate the feedback to make it better.",
        prompt, feedback
    )
}

/// Outcome of an improve call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImproveResult {
    pub success: bool,
    pub original_prompt: String,
    pub framework: String,
    pub framework_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub improved_prompt: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: i64,
}

/// Outcome of a refine call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineResult {
    pub success: bool,
    pub original_prompt: String,
    pub feedback: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refined_prompt: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: i64,
}

/// Rewrites prompts through a connection's backend.
pub struct PromptImprover {
    registry: Arc<ProviderRegistry>,
    budget: Option<Duration>,
}

impl PromptImprover {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            budget: Some(DEFAULT_BUDGET),
        }
    }

    /// Replace the generation budget; `None` waits for the backend's own timeout.
    pub fn with_budget(mut self, budget: Option<Duration>) -> Self {
        self.budget = budget;
        self
    }

    /// Rewrite `prompt` using the framework named by `code`.
    pub async fn improve(
        &self,
        prompt: &str,
        code: &str,
        connection: &Connection,
    ) -> AppResult<ImproveResult> {
        let framework = find_framework(code)
            .ok_or_else(|| AppError::Validation(format!("Invalid framework: {}", code)))?;

        let start = Instant::now();
        let outcome = dispatch(
            &self.registry,
            connection,
            &framework.instruction(prompt),
            self.budget,
        )
        .await;
        let duration_ms = elapsed_ms(start);

        let (improved_prompt, error) = match outcome {
            Ok(response) => (Some(response.content), None),
            Err(failure) => {
                tracing::error!(framework = code, error = %failure.message, "Prompt improvement failed");
                (None, Some(failure.message))
            }
        };

        tracing::info!(framework = code, duration_ms, success = error.is_none(), "Prompt improvement finished");

        Ok(ImproveResult {
            success: error.is_none(),
            original_prompt: prompt.to_string(),
            framework: framework.code.to_string(),
            framework_name: framework.name.to_string(),
            improved_prompt,
            error,
            duration_ms,
        })
    }

    /// Revise `prompt` according to `feedback`.
    pub async fn refine(&self, prompt: &str, feedback: &str, connection: &Connection) -> RefineResult {
        let start = Instant::now();
        let outcome = dispatch(
            &self.registry,
            connection,
            &refine_instruction(prompt, feedback),
            self.budget,
        )
        .await;
        let duration_ms = elapsed_ms(start);

        let (refined_prompt, error) = match outcome {
            Ok(response) => (Some(response.content), None),
            Err(failure) => {
                tracing::error!(error = %failure.message, "Prompt refinement failed");
                (None, Some(failure.message))
            }
        };

        RefineResult {
            success: error.is_none(),
            original_prompt: prompt.to_string(),
            feedback: feedback.to_string(),
            refined_prompt,
            error,
            duration_ms,
        }
    }
}
