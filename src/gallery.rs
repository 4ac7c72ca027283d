//! Drawing gallery attached to a sub-project.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::fields::GalleryKind;
use crate::subproject::SubProject;
use crate::task::new_id;

/// A drawing or document registered in the sub-project gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawing_number: Option<String>,
    /// Location of the file: a path or URL.
    pub url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub upload_date: String,
    #[serde(rename = "type")]
    pub kind: GalleryKind,
}

impl GalleryItem {
    /// Register a file. The title defaults to the file stem and the kind is
    /// taken from the extension.
    pub fn from_path(
        path: &Path,
        title: Option<String>,
        drawing_number: Option<String>,
        category: Option<String>,
        upload_date: &str,
    ) -> Self {
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        let title = title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("untitled")
                .to_string()
        });
        GalleryItem {
            id: new_id("g"),
            title,
            drawing_number: drawing_number.filter(|d| !d.trim().is_empty()),
            url: path.to_string_lossy().to_string(),
            category: category.unwrap_or_else(|| "General".to_string()),
            upload_date: upload_date.to_string(),
            kind: if is_pdf { GalleryKind::Pdf } else { GalleryKind::Image },
        }
    }
}

pub fn add_gallery_items(sp: &SubProject, items: Vec<GalleryItem>) -> SubProject {
    let mut next = sp.clone();
    next.gallery.extend(items);
    next
}

pub fn remove_gallery_item(sp: &SubProject, item_id: &str) -> SubProject {
    let mut next = sp.clone();
    next.gallery.retain(|g| g.id != item_id);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{DesignStage, ProjectType};

    #[test]
    fn test_from_path_defaults() {
        let item = GalleryItem::from_path(
            Path::new("/drawings/AHU-01 layout.PDF"),
            None,
            Some("  ".into()),
            None,
            "2024-06-01",
        );
        assert_eq!(item.title, "AHU-01 layout");
        assert_eq!(item.kind, GalleryKind::Pdf);
        assert_eq!(item.drawing_number, None);
        assert_eq!(item.category, "General");

        let img = GalleryItem::from_path(Path::new("site.jpg"), Some("Site".into()), Some("D-7".into()), None, "");
        assert_eq!(img.kind, GalleryKind::Image);
        assert_eq!(img.drawing_number.as_deref(), Some("D-7"));
    }

    #[test]
    fn test_add_and_remove() {
        let sp = SubProject::new("Lab", "L1", ProjectType::Other, DesignStage::Schematic);
        let item = GalleryItem::from_path(Path::new("a.png"), None, None, None, "");
        let id = item.id.clone();
        let sp = add_gallery_items(&sp, vec![item]);
        assert_eq!(sp.gallery.len(), 1);
        let sp = remove_gallery_item(&sp, "missing");
        assert_eq!(sp.gallery.len(), 1);
        let sp = remove_gallery_item(&sp, &id);
        assert!(sp.gallery.is_empty());
    }
}
