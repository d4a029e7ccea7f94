//! Action template table.

use autorule_domain::error::{AlreadyExistsError, AutomationError, NotFoundError};
use autorule_domain::id::TemplateId;
use autorule_domain::result::ActionResult;
use autorule_domain::template::ActionTemplate;
use autorule_domain::time::now;

use super::{ActionManager, ActionQueueEntry};
use crate::ports::{
    GpioController, HttpClient, LedController, PowerController, SshClient, VariableStore,
};

const ENTITY: &str = "ActionTemplate";

fn not_found(id: &TemplateId) -> AutomationError {
    NotFoundError {
        entity: ENTITY,
        id: id.to_string(),
    }
    .into()
}

impl<V, S, L, G, P, H> ActionManager<V, S, L, G, P, H> {
    /// Add a new template. Its usage metadata is reset.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::InvalidArgument`] when the template does
    /// not validate, [`AutomationError::AlreadyExists`] for a duplicate id,
    /// or [`AutomationError::ResourceExhausted`] when the table is full.
    #[tracing::instrument(skip(self, template), fields(id = %template.id))]
    pub fn add_template(&self, mut template: ActionTemplate) -> Result<(), AutomationError> {
        template.validate()?;
        template.created_at = now();
        template.use_count = 0;
        template.last_used_at = None;
        self.insert_template(template)?;
        tracing::info!("template added");
        Ok(())
    }

    /// Remove a template, keeping the order of the others.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::NotFound`] if no template has this id.
    #[tracing::instrument(skip(self))]
    pub fn remove_template(&self, id: &TemplateId) -> Result<ActionTemplate, AutomationError> {
        let mut templates = self.lock_templates();
        let position = templates
            .iter()
            .position(|template| template.id == *id)
            .ok_or_else(|| not_found(id))?;
        Ok(templates.remove(position))
    }

    /// # Errors
    ///
    /// Returns [`AutomationError::NotFound`] if no template has this id.
    pub fn get_template(&self, id: &TemplateId) -> Result<ActionTemplate, AutomationError> {
        self.lock_templates()
            .iter()
            .find(|template| template.id == *id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// All templates in insertion order.
    #[must_use]
    pub fn list_templates(&self) -> Vec<ActionTemplate> {
        self.lock_templates().clone()
    }

    #[must_use]
    pub fn template_count(&self) -> usize {
        self.lock_templates().len()
    }

    /// Replace the definition of an existing template.
    ///
    /// `created_at`, `use_count` and `last_used_at` are kept from the
    /// stored entry.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::InvalidArgument`] when the template does
    /// not validate, or [`AutomationError::NotFound`] if it is not stored.
    #[tracing::instrument(skip(self, template), fields(id = %template.id))]
    pub fn update_template(&self, mut template: ActionTemplate) -> Result<(), AutomationError> {
        template.validate()?;
        let mut templates = self.lock_templates();
        let stored = templates
            .iter_mut()
            .find(|stored| stored.id == template.id)
            .ok_or_else(|| not_found(&template.id))?;
        template.created_at = stored.created_at;
        template.use_count = stored.use_count;
        template.last_used_at = stored.last_used_at;
        *stored = template;
        Ok(())
    }

    /// Reload persisted templates, keeping their usage metadata.
    ///
    /// Entries that do not validate, duplicate an id, or exceed the table
    /// capacity are skipped with a warning. Returns how many were restored.
    pub fn restore_templates(&self, templates: Vec<ActionTemplate>) -> usize {
        let mut restored = 0;
        for template in templates {
            let id = template.id.clone();
            match template.validate().and_then(|()| self.insert_template(template)) {
                Ok(()) => restored += 1,
                Err(err) => tracing::warn!(%id, error = %err, "skipping stored template"),
            }
        }
        tracing::info!(restored, "templates restored");
        restored
    }

    fn insert_template(&self, template: ActionTemplate) -> Result<(), AutomationError> {
        let mut templates = self.lock_templates();
        if templates.iter().any(|stored| stored.id == template.id) {
            return Err(AlreadyExistsError {
                entity: ENTITY,
                id: template.id.to_string(),
            }
            .into());
        }
        if templates.len() >= self.config.max_templates {
            return Err(AutomationError::exhausted(
                "template table",
                self.config.max_templates,
            ));
        }
        templates.push(template);
        Ok(())
    }
}

impl<V, S, L, G, P, H> ActionManager<V, S, L, G, P, H>
where
    V: VariableStore,
    S: SshClient,
    L: LedController,
    G: GpioController,
    P: PowerController,
    H: HttpClient,
{
    /// Run the template called `id`.
    ///
    /// A disabled template yields a failed result without running. Async
    /// templates are queued and yield a `Queued` result. Usage metadata is
    /// bumped whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::NotFound`] if no template has this id.
    #[tracing::instrument(skip(self))]
    pub async fn execute_template(&self, id: &TemplateId) -> Result<ActionResult, AutomationError> {
        let template = self.get_template(id)?;
        if !template.enabled {
            return Ok(ActionResult::failed(format!("Template disabled: {id}")));
        }

        let result = if template.run_async {
            match self.enqueue(ActionQueueEntry::new(template.action)).await {
                Ok(job) => ActionResult::queued(format!("queued as {job}")),
                Err(err) => ActionResult::failed(err.to_string()),
            }
        } else {
            self.execute(&template.action).await
        };

        self.mark_template_used(id);
        Ok(result)
    }

    fn mark_template_used(&self, id: &TemplateId) {
        let mut templates = self.lock_templates();
        // May have been removed while it ran.
        if let Some(stored) = templates.iter_mut().find(|stored| stored.id == *id) {
            stored.mark_used(now());
        }
    }
}
