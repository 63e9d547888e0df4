//! Prompt improvement operations.

use crate::Workbench;
use promptsmith_core::{AppError, AppResult};
use promptsmith_prompt::{find_framework, Framework, ImproveResult, RefineResult, FRAMEWORKS};

impl Workbench {
    /// The framework catalogue.
    pub fn frameworks(&self) -> &'static [Framework] {
        FRAMEWORKS
    }

    /// Rewrite `prompt` with a framework through one of the user's connections.
    ///
    /// An unknown framework code fails before the connection is loaded.
    pub async fn improve_prompt(
        &self,
        user_id: i64,
        prompt: &str,
        framework: &str,
        connection_id: i64,
    ) -> AppResult<ImproveResult> {
        if find_framework(framework).is_none() {
            return Err(AppError::Validation(format!("Invalid framework: {}", framework)));
        }
        let connection = self.owned_connection(user_id, connection_id)?;
        self.improver.improve(prompt, framework, &connection).await
    }

    /// Revise `prompt` according to `feedback` through one of the user's connections.
    pub async fn refine_prompt(
        &self,
        user_id: i64,
        prompt: &str,
        feedback: &str,
        connection_id: i64,
    ) -> AppResult<RefineResult> {
        let connection = self.owned_connection(user_id, connection_id)?;
        Ok(self.improver.refine(prompt, feedback, &connection).await)
    }
}
