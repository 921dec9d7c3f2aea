use serde::{Deserialize, Serialize};

/// One catalog entry as returned by the lookup service. Never mutated once fetched;
/// categories hold copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

impl BookRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: Vec::new(),
            description: None,
            thumbnail: None,
            info_link: None,
            published_date: None,
        }
    }

    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    /// Author names joined for display, or "unknown" when the catalog had none.
    pub fn authors_display(&self) -> String {
        if self.authors.is_empty() { "unknown".to_string() } else { self.authors.join(", ") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authors_fall_back_to_unknown() {
        let b = BookRecord::new("A1", "Dune");
        assert_eq!(b.authors_display(), "unknown");
        let b = b.with_authors(["Frank Herbert", "Brian Herbert"]);
        assert_eq!(b.authors_display(), "Frank Herbert, Brian Herbert");
    }

    #[test]
    fn optional_fields_are_omitted_from_json() {
        let json = serde_json::to_value(BookRecord::new("A1", "Dune")).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "A1", "title": "Dune", "authors": [] }));
        let back: BookRecord = serde_json::from_str(r#"{"id":"A1","infoLink":"http://x"}"#).unwrap();
        assert_eq!(back.title, "");
        assert_eq!(back.info_link.as_deref(), Some("http://x"));
    }
}
