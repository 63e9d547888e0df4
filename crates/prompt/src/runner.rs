//! Prompt test runner.
//!
//! Renders a template, sends it to a connection's backend, and records the
//! outcome. Provider failures become an `error` record; only a failure to
//! persist the record is returned as `Err`.

use crate::renderer::render;
use crate::types::{NewTestRecord, Template, TestRecord, TestStatus, Variables};
use promptsmith_core::{AppError, AppResult};
use promptsmith_llm::{Connection, GenerateOptions, LlmResponse, ProviderRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default wall-clock budget for a single generation.
pub const DEFAULT_BUDGET: Duration = Duration::from_secs(120);

/// Where test outcomes are written.
pub trait TestLog: Send + Sync {
    /// Persist a test record and return it with its id and timestamp.
    fn record_test(&self, record: NewTestRecord) -> AppResult<TestRecord>;

    /// Bump a template's usage counter by one.
    fn increment_usage(&self, template_id: i64) -> AppResult<()>;
}

/// Why a dispatch produced no text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Failure {
    pub message: String,
    pub timed_out: bool,
}

/// Resolve `connection` and generate once, bounded by `budget`.
pub(crate) async fn dispatch(
    registry: &ProviderRegistry,
    connection: &Connection,
    prompt: &str,
    budget: Option<Duration>,
) -> Result<LlmResponse, Failure> {
    let Some(mut session) = registry.resolve(connection) else {
        let err = AppError::ProviderNotFound(connection.provider.clone());
        return Err(Failure {
            message: err.to_string(),
            timed_out: false,
        });
    };

    let options = GenerateOptions::default();
    let outcome = match budget {
        Some(limit) => match tokio::time::timeout(limit, session.complete(prompt, &options)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                return Err(Failure {
                    message: format!(
                        "Generation timed out after {} seconds",
                        limit.as_secs_f64()
                    ),
                    timed_out: true,
                })
            }
        },
        None => session.complete(prompt, &options).await,
    };

    outcome.map_err(|e| Failure {
        message: e.to_string(),
        timed_out: false,
    })
}

pub(crate) fn elapsed_ms(start: Instant) -> i64 {
    i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX)
}

/// Runs a template against a connection and logs the attempt.
pub struct PromptTestRunner {
    registry: Arc<ProviderRegistry>,
    log: Arc<dyn TestLog>,
    budget: Option<Duration>,
}

impl PromptTestRunner {
    /// Create a runner with the default 120 second budget.
    pub fn new(registry: Arc<ProviderRegistry>, log: Arc<dyn TestLog>) -> Self {
        Self {
            registry,
            log,
            budget: Some(DEFAULT_BUDGET),
        }
    }

    /// Replace the generation budget; `None` waits for the backend's own timeout.
    pub fn with_budget(mut self, budget: Option<Duration>) -> Self {
        self.budget = budget;
        self
    }

    /// Render, generate, and record one test.
    ///
    /// Exactly one record is written per call, and the template's usage
    /// counter goes up by one whether or not generation succeeded.
    pub async fn run(
        &self,
        template: &Template,
        variables: &Variables,
        connection: &Connection,
    ) -> AppResult<TestRecord> {
        let start = Instant::now();
        let rendered = render(&template.content, variables);

        tracing::debug!(
            template_id = template.id,
            connection_id = connection.id,
            provider = %connection.provider,
            prompt_chars = rendered.len(),
            "Running prompt test"
        );

        let outcome = dispatch(&self.registry, connection, &rendered, self.budget).await;
        let duration_ms = elapsed_ms(start);

        let mut record = NewTestRecord {
            user_id: template.user_id.unwrap_or(connection.user_id),
            template_id: template.id,
            connection_id: connection.id,
            rendered_prompt: rendered,
            input_variables: variables.clone(),
            response: None,
            status: TestStatus::Success,
            error_message: None,
            tokens_used: None,
            duration_ms,
        };

        match outcome {
            Ok(response) => {
                tracing::info!(template_id = template.id, duration_ms, "Prompt test succeeded");
                record.tokens_used = response.usage.map(|u| i64::from(u.total_tokens));
                record.response = Some(response.content);
            }
            Err(failure) => {
                tracing::warn!(
                    template_id = template.id,
                    duration_ms,
                    error = %failure.message,
                    "Prompt test failed"
                );
                record.status = if failure.timed_out {
                    TestStatus::Timeout
                } else {
                    TestStatus::Error
                };
                record.error_message = Some(failure.message);
            }
        }

        let saved = self.log.record_test(record)?;
        self.log.increment_usage(template.id)?;

        Ok(saved)
    }
}
