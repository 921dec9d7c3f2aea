//! Shape of the volumes endpoint's JSON response. Only the fields the shelf keeps are read.

use serde::Deserialize;
use shelf_core::BookRecord;

#[derive(Debug, Default, Deserialize)]
pub struct VolumesResponse {
    #[serde(default)]
    pub items: Option<Vec<Volume>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub id: String,
    #[serde(default)]
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub image_links: Option<ImageLinks>,
    pub info_link: Option<String>,
    pub published_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageLinks {
    pub thumbnail: Option<String>,
}

impl From<Volume> for BookRecord {
    fn from(v: Volume) -> Self {
        let info = v.volume_info;
        BookRecord {
            id: v.id,
            title: info.title.unwrap_or_default(),
            authors: info.authors,
            description: info.description,
            thumbnail: info.image_links.and_then(|l| l.thumbnail),
            info_link: info.info_link,
            published_date: info.published_date,
        }
    }
}

impl VolumesResponse {
    /// Missing `items` means no matches.
    pub fn into_books(self) -> Vec<BookRecord> {
        self.items.unwrap_or_default().into_iter().map(BookRecord::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_item() {
        let body = r#"{
            "kind": "books#volumes",
            "totalItems": 1,
            "items": [{
                "id": "A1",
                "volumeInfo": {
                    "title": "Dune",
                    "authors": ["Frank Herbert"],
                    "description": "Desert planet.",
                    "imageLinks": { "smallThumbnail": "http://s", "thumbnail": "http://t" },
                    "infoLink": "http://info",
                    "publishedDate": "1965"
                }
            }]
        }"#;
        let books = serde_json::from_str::<VolumesResponse>(body).unwrap().into_books();
        assert_eq!(books.len(), 1);
        let b = &books[0];
        assert_eq!(b.id, "A1");
        assert_eq!(b.authors_display(), "Frank Herbert");
        assert_eq!(b.thumbnail.as_deref(), Some("http://t"));
        assert_eq!(b.info_link.as_deref(), Some("http://info"));
        assert_eq!(b.published_date.as_deref(), Some("1965"));
    }

    #[test]
    fn sparse_items_and_missing_items() {
        let books = serde_json::from_str::<VolumesResponse>(r#"{"items":[{"id":"B1"}]}"#).unwrap().into_books();
        assert_eq!(books[0].title, "");
        assert_eq!(books[0].authors_display(), "unknown");
        assert!(books[0].thumbnail.is_none());

        let none = serde_json::from_str::<VolumesResponse>(r#"{"kind":"books#volumes","totalItems":0}"#).unwrap();
        assert!(none.into_books().is_empty());
    }

    #[test]
    fn item_without_id_is_rejected() {
        assert!(serde_json::from_str::<VolumesResponse>(r#"{"items":[{"volumeInfo":{}}]}"#).is_err());
    }
}
