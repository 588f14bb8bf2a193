//! Project and model repository: registration and cascading deletes.

use fcst_config::ValidationConfig;
use fcst_core::entities::{ForecastModel, Project};
use fcst_core::ids::{PREFIX_MODEL, PREFIX_PROJECT, PREFIX_TARGET, PREFIX_TIMEZERO, PREFIX_UNIT};
use fcst_core::resolve::find_project;
use fcst_validate::check_project;

use crate::ForecastStore;
use crate::error::StoreError;

impl ForecastStore {
    fn mint_if_empty(&mut self, id: &mut String, prefix: &str) {
        if id.is_empty() {
            *id = self.generate_id(prefix);
        }
    }

    /// Register a project after checking its invariants. Empty entity ids
    /// are minted. Returns the project id.
    ///
    /// # Errors
    ///
    /// `StoreError::Duplicate` if a project with the same name exists,
    /// `StoreError::InvalidProject` if the project breaks its invariants.
    pub fn register_project(
        &mut self,
        mut project: Project,
        config: &ValidationConfig,
    ) -> Result<String, StoreError> {
        if self.projects.iter().any(|p| p.name == project.name) {
            return Err(StoreError::Duplicate {
                entity_type: "project".to_string(),
                name: project.name,
            });
        }
        let report = check_project(&project, config);
        if !report.is_ok() {
            return Err(StoreError::InvalidProject {
                violations: report.into_violations(),
            });
        }

        self.mint_if_empty(&mut project.id, PREFIX_PROJECT);
        for unit in &mut project.units {
            self.mint_if_empty(&mut unit.id, PREFIX_UNIT);
        }
        for target in &mut project.targets {
            self.mint_if_empty(&mut target.id, PREFIX_TARGET);
        }
        for tz in &mut project.timezeros {
            self.mint_if_empty(&mut tz.id, PREFIX_TIMEZERO);
        }
        for model in &mut project.models {
            self.mint_if_empty(&mut model.id, PREFIX_MODEL);
        }

        tracing::debug!(
            project = %project.name,
            units = project.units.len(),
            targets = project.targets.len(),
            "registered project"
        );
        let id = project.id.clone();
        self.projects.push(project);
        Ok(id)
    }

    #[must_use]
    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Look a project up by its name.
    ///
    /// # Errors
    ///
    /// `CoreError::NotFound` (as `StoreError::Core`) when no project has the
    /// name.
    pub fn project_by_name(&self, name: &str) -> Result<&Project, StoreError> {
        Ok(find_project(&self.projects, name)?)
    }

    /// The project owning the model with this id.
    #[must_use]
    pub fn project_of_model(&self, model_id: &str) -> Option<&Project> {
        self.projects
            .iter()
            .find(|p| p.model_by_id(model_id).is_some())
    }

    /// Delete a project with its models and their forecasts.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if no project has this id.
    pub fn delete_project(&mut self, id: &str) -> Result<(), StoreError> {
        let index = self
            .projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found("project", id))?;
        let project = self.projects.remove(index);
        let before = self.forecasts.len();
        self.forecasts
            .retain(|_, forecast| project.model_by_id(&forecast.forecast_model_id).is_none());
        tracing::debug!(
            project = %project.name,
            forecasts = before - self.forecasts.len(),
            "deleted project"
        );
        Ok(())
    }

    /// Add a model to a project. Returns the model id.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` for an unknown project; `StoreError::Duplicate`
    /// when the abbreviation is taken or a second oracle is added.
    pub fn add_model(
        &mut self,
        project_id: &str,
        mut model: ForecastModel,
    ) -> Result<String, StoreError> {
        let position = self
            .projects
            .iter()
            .position(|p| p.id == project_id)
            .ok_or_else(|| StoreError::not_found("project", project_id))?;

        let existing = &self.projects[position].models;
        if existing.iter().any(|m| m.label() == model.label()) {
            return Err(StoreError::Duplicate {
                entity_type: "model".to_string(),
                name: model.label().to_string(),
            });
        }
        if model.is_oracle && existing.iter().any(|m| m.is_oracle) {
            return Err(StoreError::Duplicate {
                entity_type: "oracle model".to_string(),
                name: model.label().to_string(),
            });
        }

        self.mint_if_empty(&mut model.id, PREFIX_MODEL);
        let id = model.id.clone();
        self.projects[position].models.push(model);
        Ok(id)
    }

    /// Delete a model and every forecast it made.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if no project owns a model with this id.
    pub fn delete_model(&mut self, model_id: &str) -> Result<(), StoreError> {
        let project = self
            .projects
            .iter_mut()
            .find(|p| p.model_by_id(model_id).is_some())
            .ok_or_else(|| StoreError::not_found("model", model_id))?;
        project.models.retain(|m| m.id != model_id);
        self.forecasts
            .retain(|_, forecast| forecast.forecast_model_id != model_id);
        Ok(())
    }

    /// The project's oracle model, if exactly one exists.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` for an unknown project, `StoreError::Core`
    /// wrapping `Ambiguous` when several models are flagged as oracle.
    pub fn oracle_model(&self, project_id: &str) -> Result<Option<&ForecastModel>, StoreError> {
        let project = self
            .project(project_id)
            .ok_or_else(|| StoreError::not_found("project", project_id))?;
        Ok(project.oracle_model()?)
    }
}
