//! Task-grouped model catalog
//!
//! The raw model listing arrives as a flat array; the session works with it
//! grouped by pipeline task tag. Group order is first-appearance order and
//! the models inside a group keep the listing's response order, so the
//! rendering layer can display both without re-sorting.

use indexmap::IndexMap;

use crate::api::ModelEntry;

/// One selectable model. `display_name` prefers the listing's `modelId`
/// field and falls back to the repo id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub id: String,
    pub display_name: String,
    pub task_tag: String,
}

/// Insertion-ordered mapping from task tag to the models carrying that tag.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    groups: IndexMap<String, Vec<Model>>,
}

impl Catalog {
    pub fn from_models<I>(models: I) -> Self
    where
        I: IntoIterator<Item = Model>,
    {
        let mut groups: IndexMap<String, Vec<Model>> = IndexMap::new();
        for model in models {
            groups.entry(model.task_tag.clone()).or_default().push(model);
        }
        Self { groups }
    }

    /// Group a raw listing. Entries without a pipeline tag are dropped.
    pub fn from_entries(entries: Vec<ModelEntry>) -> Self {
        Self::from_models(entries.into_iter().filter_map(|entry| {
            let task_tag = entry.pipeline_tag?;
            let display_name = entry.model_id.unwrap_or_else(|| entry.id.clone());
            Some(Model {
                id: entry.id,
                display_name,
                task_tag,
            })
        }))
    }

    /// Task tags in first-appearance order.
    pub fn task_tags(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Models under `tag` in response order; empty when the tag is unknown.
    pub fn models_for(&self, tag: &str) -> &[Model] {
        self.groups.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first_model_for(&self, tag: &str) -> Option<&Model> {
        self.models_for(tag).first()
    }

    pub fn contains(&self, tag: &str, model_id: &str) -> bool {
        self.models_for(tag).iter().any(|model| model.id == model_id)
    }

    /// Number of task tags.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total model count across all tags.
    pub fn model_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}
