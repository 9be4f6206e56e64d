//! Task and model selection
//!
//! The selection pair is validated against whichever catalog is in effect
//! (live listing when present, embedded fallback otherwise). Every
//! transition re-derives the model id so it never dangles: after any
//! operation the model is either `None` or listed under the current task
//! tag in that catalog.

use std::error::Error as StdError;
use std::fmt;

use crate::core::catalog::Catalog;
use crate::core::constants::CHAT_TASK_TAG;

/// Rejected selection operations. The rendering layer is expected to only
/// offer ids from the effective catalog, so these surface as warnings.
#[derive(Debug, PartialEq, Eq)]
pub enum SelectionError {
    UnknownModel { model_id: String, task_tag: String },
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::UnknownModel { model_id, task_tag } => {
                write!(f, "model {model_id} is not listed under task {task_tag}")
            }
        }
    }
}

impl StdError for SelectionError {}

/// The current (task tag, model id) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    task_tag: String,
    model_id: Option<String>,
}

impl Selection {
    /// Initial selection: the chat task with the catalog's first model
    /// for it, or no model when the catalog has none.
    pub fn new(catalog: &Catalog) -> Self {
        let mut selection = Self {
            task_tag: CHAT_TASK_TAG.to_string(),
            model_id: None,
        };
        selection.rederive_model(catalog);
        selection
    }

    pub fn task_tag(&self) -> &str {
        &self.task_tag
    }

    pub fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }

    /// Switch to `tag`. Any string is accepted, including tags absent from
    /// the catalog; the model id becomes the first model listed under the
    /// new tag, or `None` when the tag has no models.
    pub fn set_task(&mut self, tag: impl Into<String>, catalog: &Catalog) {
        self.task_tag = tag.into();
        self.rederive_model(catalog);
    }

    /// Choose a model under the current task tag. Ids not listed there in
    /// `catalog` are rejected and the selection is left unchanged.
    pub fn set_model(
        &mut self,
        id: impl Into<String>,
        catalog: &Catalog,
    ) -> Result<(), SelectionError> {
        let id = id.into();
        if !catalog.contains(&self.task_tag, &id) {
            return Err(SelectionError::UnknownModel {
                model_id: id,
                task_tag: self.task_tag.clone(),
            });
        }
        self.model_id = Some(id);
        Ok(())
    }

    /// Re-validate after the live catalog was replaced wholesale.
    pub fn on_catalog_replaced(&mut self, catalog: &Catalog) {
        self.rederive_model(catalog);
    }

    /// Re-validate after the credential changed and the live catalog was
    /// dropped; `fallback` is the catalog now in effect.
    pub fn on_credential_invalidated(&mut self, fallback: &Catalog) {
        self.rederive_model(fallback);
    }

    fn rederive_model(&mut self, catalog: &Catalog) {
        self.model_id = catalog
            .first_model_for(&self.task_tag)
            .map(|model| model.id.clone());
    }

    /// True when the model id is `None` or listed under the task tag.
    /// Exposed for tests and debug assertions.
    pub fn is_consistent_with(&self, catalog: &Catalog) -> bool {
        match &self.model_id {
            None => true,
            Some(id) => catalog.contains(&self.task_tag, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ModelEntry;

    fn entry(id: &str, pipeline_tag: &str) -> ModelEntry {
        ModelEntry {
            id: id.to_string(),
            model_id: None,
            pipeline_tag: Some(pipeline_tag.to_string()),
        }
    }

    fn sample_catalog() -> Catalog {
        Catalog::from_entries(vec![
            entry("org/gen-a", "text-generation"),
            entry("org/gen-b", "text-generation"),
            entry("org/img-a", "text-to-image"),
        ])
    }

    #[test]
    fn initial_selection_targets_first_chat_model() {
        let catalog = sample_catalog();
        let selection = Selection::new(&catalog);
        assert_eq!(selection.task_tag(), "text-generation");
        assert_eq!(selection.model_id(), Some("org/gen-a"));
        assert!(selection.is_consistent_with(&catalog));
    }

    #[test]
    fn set_task_rederives_model_as_first_of_new_tag() {
        let catalog = sample_catalog();
        let mut selection = Selection::new(&catalog);

        selection.set_task("text-to-image", &catalog);
        assert_eq!(selection.model_id(), Some("org/img-a"));

        selection.set_task("text-generation", &catalog);
        assert_eq!(selection.model_id(), Some("org/gen-a"));
    }

    #[test]
    fn set_task_accepts_unknown_tags_with_no_model() {
        let catalog = sample_catalog();
        let mut selection = Selection::new(&catalog);

        selection.set_task("audio-classification", &catalog);
        assert_eq!(selection.task_tag(), "audio-classification");
        assert_eq!(selection.model_id(), None);
        assert!(selection.is_consistent_with(&catalog));
    }

    #[test]
    fn set_model_accepts_listed_ids_only() {
        let catalog = sample_catalog();
        let mut selection = Selection::new(&catalog);

        assert!(selection.set_model("org/gen-b", &catalog).is_ok());
        assert_eq!(selection.model_id(), Some("org/gen-b"));

        // A model listed under another tag is still unknown here.
        let err = selection.set_model("org/img-a", &catalog).unwrap_err();
        assert_eq!(
            err,
            SelectionError::UnknownModel {
                model_id: "org/img-a".to_string(),
                task_tag: "text-generation".to_string(),
            }
        );
        assert_eq!(selection.model_id(), Some("org/gen-b"));
    }

    #[test]
    fn catalog_replacement_resets_model_to_first_of_tag() {
        let catalog = sample_catalog();
        let mut selection = Selection::new(&catalog);
        selection.set_model("org/gen-b", &catalog).unwrap();

        let replacement = Catalog::from_entries(vec![
            entry("org/gen-new", "text-generation"),
            entry("org/gen-b", "text-generation"),
        ]);
        selection.on_catalog_replaced(&replacement);

        assert_eq!(selection.model_id(), Some("org/gen-new"));
        assert!(selection.is_consistent_with(&replacement));
    }

    #[test]
    fn credential_invalidation_rederives_against_fallback() {
        let live = sample_catalog();
        let mut selection = Selection::new(&live);
        selection.set_model("org/gen-b", &live).unwrap();

        let fallback = Catalog::from_entries(vec![entry("builtin/gen", "text-generation")]);
        selection.on_credential_invalidated(&fallback);

        assert_eq!(selection.model_id(), Some("builtin/gen"));
        assert!(selection.is_consistent_with(&fallback));
    }

    #[test]
    fn invariant_holds_across_generated_transitions() {
        // Deterministic sweep over tag/catalog combinations standing in
        // for a property test.
        let catalogs = [
            Catalog::from_entries(Vec::new()),
            Catalog::from_entries(vec![entry("org/solo", "translation")]),
            sample_catalog(),
        ];
        let tags = ["text-generation", "text-to-image", "translation", "bogus"];

        for catalog in &catalogs {
            let mut selection = Selection::new(catalog);
            assert!(selection.is_consistent_with(catalog));

            for tag in tags {
                selection.set_task(tag, catalog);
                assert!(selection.is_consistent_with(catalog));

                let _ = selection.set_model("org/solo", catalog);
                assert!(selection.is_consistent_with(catalog));

                selection.on_catalog_replaced(catalog);
                assert!(selection.is_consistent_with(catalog));
            }
        }
    }
}
