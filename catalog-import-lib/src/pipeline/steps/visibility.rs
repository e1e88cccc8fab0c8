use std::sync::Arc;

use crate::config::columns;
use crate::context::RowContext;
use crate::error::ImportError;
use crate::pipeline::{ProcessingStep, StepOutcome};
use crate::registry::ImportRegistry;
use crate::types::ValueSource;

/// Replaces the visibility label with its numeric code
pub struct VisibilityStep {
    registry: Arc<ImportRegistry>,
}

impl VisibilityStep {
    pub fn new(registry: Arc<ImportRegistry>) -> Self {
        Self { registry }
    }
}

impl ProcessingStep for VisibilityStep {
    fn name(&self) -> &'static str {
        "visibility"
    }

    fn execute(&self, ctx: &mut RowContext<'_>) -> Result<StepOutcome, ImportError> {
        let label = match ctx.value(columns::VISIBILITY) {
            Some(label) if !label.trim().is_empty() => label.to_string(),
            _ => return Ok(StepOutcome::Continue),
        };

        let code = self.registry.visibility_code(&label).ok_or_else(|| {
            ImportError::UnknownEnumerationValue {
                column: columns::VISIBILITY.to_string(),
                value: label.clone(),
            }
        })?;

        ctx.set_value(columns::VISIBILITY, code.to_string());
        Ok(StepOutcome::Continue)
    }
}
