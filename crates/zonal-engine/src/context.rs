//! Per-run logging context.

use tracing::{info_span, Span};
use uuid::Uuid;

/// Identity and tracing span of one aggregation run.
///
/// Created once per run and handed to the components that do work; they
/// enter its span instead of relying on process-wide logger state.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: Uuid,
    span: Span,
}

impl RunContext {
    pub fn new(variable: &str, polygons: &str, year: Option<i32>) -> Self {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, variable, polygons, year);
        Self { run_id, span }
    }

    /// A context with a fresh run id and no descriptive fields.
    pub fn anonymous() -> Self {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        Self { run_id, span }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}
