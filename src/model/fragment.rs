use serde::{Deserialize, Serialize};

/// Media type of a fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FragmentKind {
    #[default]
    #[serde(alias = "text")]
    Text,
    #[serde(alias = "image")]
    Image,
}

/// A unit of user-supplied content with its extracted features.
///
/// Fragments are produced by an upstream feature-extraction step and are only
/// read by this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fragment {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub content: Option<String>,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
    pub themes: Vec<String>,
    pub mood: Option<String>,
    pub insight: Option<String>,
    pub kind: FragmentKind,
    /// Dominant colors; only meaningful for images.
    pub palette: Vec<String>,
}

impl Fragment {
    /// Create an empty text fragment with the given identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: FragmentKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_palette<I, S>(mut self, palette: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.palette = palette.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.kind == FragmentKind::Image
    }

    /// Lower-cased blob of every textual feature, space separated.
    ///
    /// Order: title, summary, content, tags, keywords, themes, mood, insight.
    #[must_use]
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(
            4 + self.tags.len() + self.keywords.len() + self.themes.len(),
        );
        parts.push(&self.title);
        parts.push(&self.summary);
        if let Some(content) = self.content.as_deref() {
            parts.push(content);
        }
        parts.extend(self.tags.iter().map(String::as_str));
        parts.extend(self.keywords.iter().map(String::as_str));
        parts.extend(self.themes.iter().map(String::as_str));
        if let Some(mood) = self.mood.as_deref() {
            parts.push(mood);
        }
        if let Some(insight) = self.insight.as_deref() {
            parts.push(insight);
        }
        parts.join(" ").to_lowercase()
    }
}
