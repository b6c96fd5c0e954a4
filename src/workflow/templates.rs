//! Named workflow templates.
//!
//! The catalog is built once at startup from the built-in templates plus any
//! `[[templates]]` entries in the configuration file, then handed to whoever
//! needs it.

use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::types::{WorkflowConfig, WorkflowTrigger, WorkflowType};
use crate::core::{EngineError, EngineResult, TemplateConfig};

/// A reusable workflow preset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowTemplate {
    pub name: String,
    pub description: String,
    pub workflow_type: WorkflowType,
    pub configuration: Map<String, Value>,
}

impl WorkflowTemplate {
    fn new(name: &str, description: &str, workflow_type: WorkflowType, configuration: Value) -> Self {
        let configuration = match configuration {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.to_string(),
            description: description.to_string(),
            workflow_type,
            configuration,
        }
    }
}

/// Immutable set of templates, looked up by name.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateCatalog {
    templates: Vec<WorkflowTemplate>,
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateCatalog {
    /// The templates shipped with kaskflow.
    pub fn builtin() -> Self {
        Self {
            templates: vec![
                WorkflowTemplate::new(
                    "quick_health_check",
                    "Run every health check",
                    WorkflowType::StateCheck,
                    json!({
                        "check_build": true,
                        "check_tests": true,
                        "check_lint": true,
                        "check_security": true,
                        "check_deployment": true,
                    }),
                ),
                WorkflowTemplate::new(
                    "generate_demo_assets",
                    "Capture a screenshot and a 30 second video (set screenshot_url and video_url)",
                    WorkflowType::AssetGeneration,
                    json!({
                        "generate_screenshots": true,
                        "generate_videos": true,
                        "video_duration": 30,
                    }),
                ),
                WorkflowTemplate::new(
                    "comprehensive_analysis",
                    "Health check with asset summary (set analysis_url for a screenshot)",
                    WorkflowType::FullAnalysis,
                    json!({ "include_asset_summary": true }),
                ),
            ],
        }
    }

    /// Built-ins plus user templates; a user template replaces a built-in
    /// of the same name.
    pub fn from_config(user: &[TemplateConfig]) -> EngineResult<Self> {
        let mut catalog = Self::builtin();

        for entry in user {
            let workflow_type: WorkflowType = entry.workflow_type.parse()?;
            // Capture URLs may be left for the caller, so only the shape is checked.
            WorkflowConfig::parse(workflow_type, Value::Object(entry.configuration.clone()))?;

            let template = WorkflowTemplate {
                name: entry.name.clone(),
                description: entry.description.clone().unwrap_or_default(),
                workflow_type,
                configuration: entry.configuration.clone(),
            };

            match catalog.templates.iter_mut().find(|t| t.name == entry.name) {
                Some(existing) => *existing = template,
                None => catalog.templates.push(template),
            }
        }

        Ok(catalog)
    }

    /// Look up a template.
    pub fn get(&self, name: &str) -> Option<&WorkflowTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// All templates, built-ins first.
    pub fn iter(&self) -> impl Iterator<Item = &WorkflowTemplate> {
        self.templates.iter()
    }

    /// Build a validated manual trigger from a template.
    ///
    /// `overrides` keys replace the template's configuration keys.
    pub fn instantiate(
        &self,
        name: &str,
        project_id: Uuid,
        triggered_by: &str,
        overrides: Map<String, Value>,
    ) -> EngineResult<WorkflowTrigger> {
        let template = self.get(name).ok_or_else(|| EngineError::not_found("template", name))?;

        let mut configuration = template.configuration.clone();
        configuration.extend(overrides);

        let config = WorkflowConfig::from_parts(template.workflow_type, Value::Object(configuration))?;
        Ok(WorkflowTrigger::manual(project_id, config, triggered_by))
    }
}
