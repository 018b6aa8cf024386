//! Querying organizer logs

use super::planner::{Category, OrganizePlan, PlannedFile};
use crate::{Error, Result};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub extension: Option<String>,
    pub category: Option<String>,
    /// Prefix of the `YYYY-MM-DD` modification date (`2024`, `2024-05`, ...)
    pub date: Option<String>,
    pub duplicates_only: bool,
}

impl ListFilter {
    pub fn matches(&self, file: &PlannedFile) -> bool {
        if let Some(ext) = &self.extension {
            if !file.extension.eq_ignore_ascii_case(ext.trim().trim_start_matches('.')) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if Category::parse(category) != Some(file.category) {
                return false;
            }
        }
        if let Some(date) = &self.date {
            if !file.modified.starts_with(date.trim()) {
                return false;
            }
        }
        !self.duplicates_only || file.duplicate
    }
}

pub fn load_log(path: &Path) -> Result<OrganizePlan> {
    if !path.is_file() {
        return Err(Error::NotFound(path.display().to_string()));
    }
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn list<'a>(plan: &'a OrganizePlan, filter: &ListFilter) -> Vec<&'a PlannedFile> {
    plan.files.iter().filter(|f| filter.matches(f)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organize::planner::{PlanMeta, PlanSummary, SortBy};

    fn file(name: &str, category: Category, modified: &str, duplicate: bool) -> PlannedFile {
        let ext = name.rsplit('.').next().unwrap_or_default().to_string();
        PlannedFile {
            original_path: format!("/r/{}", name),
            new_path: format!("/r/{}/{}", category.folder(), name),
            category,
            extension: ext,
            size: 1,
            modified: modified.to_string(),
            hash: name.to_string(),
            duplicate,
            unchanged: false,
        }
    }

    #[test]
    fn test_filters() {
        let plan = OrganizePlan {
            meta: PlanMeta {
                root: "/r".to_string(),
                sort_by: SortBy::Date,
                executed_by: "t".to_string(),
                executed_at: "2024-06-01 10:00:00".to_string(),
            },
            files: vec![
                file("a.pdf", Category::Documents, "2024-05-02", false),
                file("b.png", Category::Pictures, "2023-01-10", false),
                file("c.pdf", Category::Documents, "2024-06-11", true),
            ],
            summary: PlanSummary::default(),
        };

        let by_ext = ListFilter { extension: Some(".PDF".into()), ..Default::default() };
        assert_eq!(list(&plan, &by_ext).len(), 2);

        let by_cat = ListFilter { category: Some("pictures".into()), ..Default::default() };
        assert_eq!(list(&plan, &by_cat)[0].extension, "png");

        let by_date = ListFilter { date: Some("2024-05".into()), ..Default::default() };
        assert_eq!(list(&plan, &by_date).len(), 1);

        let dups = ListFilter { duplicates_only: true, ..Default::default() };
        assert_eq!(list(&plan, &dups)[0].original_path, "/r/c.pdf");
    }

    #[test]
    fn test_missing_log() {
        assert!(matches!(load_log(Path::new("/no/such/log.json")), Err(Error::NotFound(_))));
    }
}
