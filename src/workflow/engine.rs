//! Workflow execution engine.
//!
//! Every invocation writes the execution record twice: once when it starts
//! running and once when it reaches a terminal status. Scheduled executions
//! are written as `pending` and only run when [`WorkflowEngine::dispatch_scheduled`]
//! is called by an external scheduler.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::handlers::{HandlerContext, HandlerOutput, HandlerRegistry};
use super::types::{
    ExecutionStatus, TriggerRequest, TriggerType, WorkflowExecution, WorkflowResult,
    WorkflowTrigger, CANCELLED_MESSAGE,
};
use crate::core::{EngineError, EngineResult};
use crate::storage::ExecutionStore;

/// Runs workflows and keeps their execution records.
pub struct WorkflowEngine {
    executions: Arc<dyn ExecutionStore>,
    handlers: HandlerRegistry,
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine").field("handlers", &self.handlers).finish_non_exhaustive()
    }
}

impl WorkflowEngine {
    /// Create an engine.
    pub fn new(executions: Arc<dyn ExecutionStore>, handlers: HandlerRegistry) -> Self {
        Self { executions, handlers }
    }

    /// Run a validated trigger to a terminal status.
    ///
    /// Handler errors produce a `failed` result; only store errors are
    /// returned as `Err`.
    pub fn execute(&self, trigger: &WorkflowTrigger) -> EngineResult<WorkflowResult> {
        let execution = WorkflowExecution::running(trigger);
        self.executions.create_execution(&execution)?;

        tracing::info!(
            execution_id = %execution.id,
            project_id = %execution.project_id,
            workflow_type = %execution.workflow_type,
            trigger_type = %execution.trigger_type,
            "Workflow execution started"
        );

        self.run(execution, trigger)
    }

    /// Validate a raw trigger descriptor and run it.
    ///
    /// An unknown trigger type is returned as `Err` without persisting
    /// anything. An unknown workflow type or invalid configuration is
    /// persisted as a single `failed` record and returned as a failed result.
    pub fn execute_request(&self, request: TriggerRequest) -> EngineResult<WorkflowResult> {
        let trigger_type: TriggerType = request.trigger_type.parse()?;

        match WorkflowTrigger::try_from(request.clone()) {
            Ok(trigger) => self.execute(&trigger),
            Err(
                e @ (EngineError::UnknownWorkflowType(_) | EngineError::InvalidConfiguration { .. }),
            ) => {
                let execution = WorkflowExecution::rejected(&request, trigger_type, &e);
                self.executions.create_execution(&execution)?;

                tracing::warn!(
                    execution_id = %execution.id,
                    project_id = %execution.project_id,
                    workflow_type = %execution.workflow_type,
                    error = %e,
                    "Workflow trigger rejected"
                );
                Ok(execution.to_result())
            }
            Err(e) => Err(e),
        }
    }

    /// Record a pending execution for an external scheduler to dispatch.
    pub fn schedule(
        &self,
        trigger: &WorkflowTrigger,
        scheduled_for: DateTime<Utc>,
    ) -> EngineResult<WorkflowExecution> {
        let execution = WorkflowExecution::pending(trigger, scheduled_for);
        self.executions.create_execution(&execution)?;

        tracing::info!(
            execution_id = %execution.id,
            project_id = %execution.project_id,
            workflow_type = %execution.workflow_type,
            scheduled_for = %scheduled_for,
            "Workflow execution scheduled"
        );
        Ok(execution)
    }

    /// Run a pending execution now.
    ///
    /// Fails with `InvalidState` unless the execution is `pending`.
    pub fn dispatch_scheduled(&self, execution_id: Uuid) -> EngineResult<WorkflowResult> {
        let mut execution = self.executions.get_execution(execution_id)?;
        execution.transition(ExecutionStatus::Running)?;

        let config = execution.configuration.clone().ok_or_else(|| {
            EngineError::InvalidConfiguration {
                workflow: execution.workflow_type.clone(),
                reason: "execution has no configuration".to_string(),
            }
        })?;
        let trigger = WorkflowTrigger {
            project_id: execution.project_id,
            trigger_type: execution.trigger_type,
            config,
            triggered_by: execution.triggered_by.clone(),
        };

        execution.started_at = Some(Utc::now());
        self.executions.update_execution(&execution)?;

        tracing::info!(
            execution_id = %execution.id,
            project_id = %execution.project_id,
            workflow_type = %execution.workflow_type,
            "Scheduled workflow execution dispatched"
        );

        self.run(execution, &trigger)
    }

    /// Mark a pending or running execution as cancelled.
    ///
    /// Running handlers are not interrupted.
    pub fn cancel(&self, execution_id: Uuid) -> EngineResult<WorkflowExecution> {
        let mut execution = self.executions.get_execution(execution_id)?;
        execution.transition(ExecutionStatus::Cancelled)?;
        execution.error_message = Some(CANCELLED_MESSAGE.to_string());
        execution.stamp_completion();
        self.executions.update_execution(&execution)?;

        tracing::info!(execution_id = %execution.id, "Workflow execution cancelled");
        Ok(execution)
    }

    /// Fetch an execution record.
    pub fn execution(&self, execution_id: Uuid) -> EngineResult<WorkflowExecution> {
        self.executions.get_execution(execution_id)
    }

    /// All executions of a project, oldest first.
    pub fn executions_for_project(&self, project_id: Uuid) -> EngineResult<Vec<WorkflowExecution>> {
        self.executions.list_executions(project_id)
    }

    fn run(
        &self,
        mut execution: WorkflowExecution,
        trigger: &WorkflowTrigger,
    ) -> EngineResult<WorkflowResult> {
        let ctx = HandlerContext {
            execution_id: execution.id,
            project_id: execution.project_id,
            triggered_by: execution.triggered_by.clone(),
        };
        let mut output = HandlerOutput::default();
        let outcome = self.handlers.dispatch(&ctx, &trigger.config, &mut output);

        execution.result = output.result;
        execution.artifacts.extend(output.artifacts);

        // A cancel recorded while the handler ran wins over the handler outcome.
        let stored = self.executions.get_execution(execution.id)?;
        if stored.status == ExecutionStatus::Cancelled {
            execution.status = stored.status;
            execution.error_message = stored.error_message;
            execution.completed_at = stored.completed_at;
            execution.duration_ms = stored.duration_ms;
        } else {
            execution.finish(outcome.err().map(|e| e.to_string()))?;
        }

        self.executions.update_execution(&execution)?;

        match &execution.error_message {
            None => tracing::info!(
                execution_id = %execution.id,
                status = %execution.status,
                duration_ms = execution.duration_ms.unwrap_or(0),
                "Workflow execution completed"
            ),
            Some(error) => tracing::warn!(
                execution_id = %execution.id,
                status = %execution.status,
                duration_ms = execution.duration_ms.unwrap_or(0),
                error = %error,
                "Workflow execution did not complete"
            ),
        }

        Ok(execution.to_result())
    }
}
