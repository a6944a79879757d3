//! Client-side prompt state.
//!
//! Every request moves through pending → fulfilled / rejected, and the view
//! re-applies tag filtering and sorting to whatever the server returned.

use crate::prompts::Prompt;

/// Client-side sort choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewSort {
    #[default]
    Newest,
    Oldest,
}

/// Operations that go through the pending/fulfilled/rejected cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Fetch,
    Create,
    Delete,
    Enhance,
}

impl Operation {
    fn default_error(self) -> &'static str {
        match self {
            Operation::Fetch => "Failed to fetch prompts",
            Operation::Create => "Failed to create prompt",
            Operation::Delete => "Failed to delete prompt",
            Operation::Enhance => "Failed to enhance prompt",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    Pending,
    Fetched(Vec<Prompt>),
    Created(Prompt),
    Deleted(String),
    Enhanced(String),
    /// A failed operation, with the server's message when it sent one.
    Rejected(Operation, Option<String>),
    SetSortBy(ViewSort),
    SetFilterTags(Vec<String>),
    ClearEnhanced,
}

#[derive(Debug, Clone, Default)]
pub struct ClientState {
    pub prompts: Vec<Prompt>,
    pub enhanced_content: String,
    pub loading: bool,
    pub error: Option<String>,
    pub sort_by: ViewSort,
    pub filter_tags: Vec<String>,
}

impl ClientState {
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Pending => {
                self.loading = true;
                self.error = None;
            }
            Action::Fetched(prompts) => {
                self.loading = false;
                self.prompts = prompts;
            }
            Action::Created(prompt) => {
                self.loading = false;
                self.prompts.insert(0, prompt);
            }
            Action::Deleted(id) => {
                self.loading = false;
                self.prompts.retain(|p| p.id != id);
            }
            Action::Enhanced(text) => {
                self.loading = false;
                self.enhanced_content = text;
            }
            Action::Rejected(op, message) => {
                self.loading = false;
                self.error = Some(message.unwrap_or_else(|| op.default_error().to_string()));
            }
            Action::SetSortBy(sort) => self.sort_by = sort,
            Action::SetFilterTags(tags) => self.filter_tags = tags,
            Action::ClearEnhanced => self.enhanced_content.clear(),
        }
    }

    /// Prompts carrying every filter tag, in the chosen order.
    pub fn visible_prompts(&self) -> Vec<&Prompt> {
        let mut visible: Vec<&Prompt> = self
            .prompts
            .iter()
            .filter(|p| self.filter_tags.iter().all(|tag| p.has_tag(tag)))
            .collect();
        match self.sort_by {
            ViewSort::Newest => visible.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            ViewSort::Oldest => visible.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        }
        visible
    }

    /// Every distinct tag across loaded prompts, in first-seen order.
    pub fn all_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = Vec::new();
        for tag in self.prompts.iter().flat_map(|p| p.tags.iter()) {
            if !tags.contains(&tag.as_str()) {
                tags.push(tag);
            }
        }
        tags
    }
}

/// Split comma-separated tag input, trimming and dropping empties.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
