//! Folder scaffolds for common kinds of work

use super::executor::write_json_atomic;
use super::planner::LOG_DIR;
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const PROFILES: &[&str] = &["it", "education", "researcher", "engineer", "health", "data", "media"];

const IT_DEFAULT: &[&str] = &[
    "IT/Projects/Active",
    "IT/Projects/Archived",
    "IT/Projects/Templates",
    "IT/Code/Scripts",
    "IT/Code/Tools",
    "IT/Code/Experiments",
    "IT/Docs/Architecture",
    "IT/Docs/Notes",
    "IT/Docs/Manuals",
    "IT/Configs",
    "IT/Logs",
    "IT/Resources",
];

const IT_STUDENT: &[&str] = &[
    "IT/Courses/Program/Modules",
    "IT/Courses/Program/Notes",
    "IT/Courses/Program/Labs",
    "IT/Courses/Program/Assignments",
    "IT/Courses/Program/Certificates",
    "IT/Courses/Program/Resources",
    "IT/Code/Scripts",
    "IT/Code/Tools",
    "IT/Docs/Notes",
    "IT/Docs/Manuals",
    "IT/Archive",
];

const IT_SUPPORT: &[&str] = &[
    "IT/Projects/Active",
    "IT/Projects/Archived",
    "IT/Operations/Incidents",
    "IT/Operations/Requests",
    "IT/Operations/Changes",
    "IT/Systems/Windows",
    "IT/Systems/Linux",
    "IT/Systems/Network",
    "IT/Systems/Cloud",
    "IT/Scripts/PowerShell",
    "IT/Scripts/Bash",
    "IT/Scripts/Python",
    "IT/Documentation/SOPs",
    "IT/Documentation/Runbooks",
    "IT/Documentation/HowTos",
    "IT/Software/Installers",
    "IT/Software/Licenses",
    "IT/Logs",
    "IT/Templates",
    "IT/Archive",
];

const EDUCATION_DEFAULT: &[&str] = &[
    "Education/Courses/Online",
    "Education/Courses/InPerson",
    "Education/Courses/Certifications",
    "Education/Subjects",
    "Education/Materials/PDFs",
    "Education/Materials/Slides",
    "Education/Materials/Videos",
    "Education/Notes",
    "Education/Exams",
    "Education/References",
    "Education/Archive",
];

const EDUCATION_TEACHER: &[&str] = &[
    "Education/Teaching/Courses/Active",
    "Education/Teaching/Courses/Archived",
    "Education/Teaching/LessonPlans",
    "Education/Teaching/Materials/Handouts",
    "Education/Teaching/Materials/Slides",
    "Education/Teaching/Materials/Assignments",
    "Education/Teaching/Assessments/Quizzes",
    "Education/Teaching/Assessments/Exams",
    "Education/Teaching/Assessments/Rubrics",
    "Education/Teaching/Students",
    "Education/Teaching/Administration",
    "Education/Teaching/Archive",
];

const EDUCATION_STUDENT: &[&str] = &[
    "Education/Studies/Courses/Current",
    "Education/Studies/Courses/Completed",
    "Education/Studies/Notes",
    "Education/Studies/Assignments/Drafts",
    "Education/Studies/Assignments/Submitted",
    "Education/Studies/Exams/Practice",
    "Education/Studies/Exams/Results",
    "Education/Studies/Projects",
    "Education/Studies/Resources",
    "Education/Studies/Archive",
];

const RESEARCHER: &[&str] = &[
    "Research/Papers/Drafts",
    "Research/Papers/Submitted",
    "Research/Papers/Published",
    "Research/Data/Raw",
    "Research/Data/Cleaned",
    "Research/Data/Results",
    "Research/Notes",
    "Research/References/PDFs",
    "Research/Presentations",
    "Research/Admin",
];

const ENGINEER: &[&str] = &[
    "Engineering/Projects/Design",
    "Engineering/Projects/Simulation",
    "Engineering/Projects/Calculations",
    "Engineering/Projects/Reports",
    "Engineering/CAD",
    "Engineering/Standards",
    "Engineering/Drawings",
    "Engineering/Photos",
    "Engineering/Archive",
];

const HEALTH: &[&str] = &[
    "Health/Patients",
    "Health/Reports",
    "Health/Imaging",
    "Health/Lab",
    "Health/Admin",
    "Health/Guidelines",
    "Health/Archive",
];

const DATA: &[&str] = &[
    "Data/Projects",
    "Data/Datasets",
    "Data/Experiments",
    "Data/Visuals",
    "Data/Archive",
];

const MEDIA: &[&str] = &[
    "Media/Shoots",
    "Media/Catalogs",
    "Media/Presets",
    "Media/Video",
    "Media/Clients",
    "Media/Archive",
];

#[derive(Debug, Clone, Default)]
pub struct ScaffoldOptions {
    /// Sub-profile: `student`/`support` for it, `teacher`/`student` for education
    pub variant: Option<String>,
    /// Adds a project skeleton under `Data/Projects` (data profile)
    pub project_name: Option<String>,
    /// Adds a dated shoot under `Media/Shoots` (media profile)
    pub shoot_name: Option<String>,
    /// Create the folders; otherwise only report them
    pub apply: bool,
    pub executed_by: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScaffoldReport {
    pub profile: String,
    pub root: String,
    pub folders: Vec<String>,
    pub created: Vec<String>,
    pub next_steps: &'static str,
    pub log_path: Option<PathBuf>,
}

#[derive(Serialize)]
struct AuditLog<'a> {
    profile: &'a str,
    root: &'a str,
    executed_by: &'a str,
    timestamp: String,
    created: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    audit: Option<serde_json::Value>,
}

pub fn next_steps(profile: &str, variant: Option<&str>) -> &'static str {
    match (profile, variant) {
        ("education", Some("teacher")) => "Organize by course first. Archive past semesters aggressively.",
        (_, Some("student")) => "Keep assignments and exams immutable after submission.",
        ("it", _) => "Place active projects under IT/Projects/Active and archive aggressively.",
        ("education", _) => "Keep institutional documents separated from personal teaching or study material.",
        ("researcher", _) => "Never modify raw research data. Keep work reproducible.",
        ("engineer", _) => "Keep CAD, calculations, and reports strictly separated.",
        ("health", _) => "Create patient folders manually. Maintain audit trails.",
        ("data", _) => "Use --project-name to initialize a project. Raw data is immutable.",
        ("media", _) => "Import RAW files only. Never overwrite originals.",
        _ => "",
    }
}

pub fn data_project_folders(project: &str) -> Vec<String> {
    let base = format!("Data/Projects/{}", project);
    ["Data/Raw", "Data/Processed", "Data/Output", "Notebooks", "Scripts", "Reports"]
        .iter()
        .map(|sub| format!("{}/{}", base, sub))
        .collect()
}

pub fn media_shoot_folders(shoot: Option<&str>) -> Vec<String> {
    let month = chrono::Local::now().format("%Y-%m").to_string();
    let name = match shoot {
        Some(s) => format!("{}-{}", month, s),
        None => month,
    };
    ["RAW", "Edited", "Export"]
        .iter()
        .map(|sub| format!("Media/Shoots/{}/{}", name, sub))
        .collect()
}

/// Relative folders of a profile
pub fn folders(profile: &str, options: &ScaffoldOptions) -> Result<Vec<String>> {
    let variant = options.variant.as_deref().map(str::to_lowercase);
    let base: &[&str] = match (profile, variant.as_deref()) {
        ("it", None | Some("default")) => IT_DEFAULT,
        ("it", Some("student")) => IT_STUDENT,
        ("it", Some("support")) => IT_SUPPORT,
        ("education", None | Some("default")) => EDUCATION_DEFAULT,
        ("education", Some("teacher")) => EDUCATION_TEACHER,
        ("education", Some("student")) => EDUCATION_STUDENT,
        ("researcher", None) => RESEARCHER,
        ("engineer", None) => ENGINEER,
        ("health", None) => HEALTH,
        ("data", None) => DATA,
        ("media", None) => MEDIA,
        (p, Some(v)) if PROFILES.contains(&p) => {
            return Err(Error::InvalidInput(format!("profile '{}' has no variant '{}'", p, v)));
        }
        (p, _) => {
            return Err(Error::InvalidInput(format!(
                "unknown profile '{}' (expected one of {})",
                p,
                PROFILES.join(", ")
            )));
        }
    };

    let mut out: Vec<String> = base.iter().map(|s| s.to_string()).collect();
    if profile == "data" {
        if let Some(project) = options.project_name.as_deref().filter(|p| !p.trim().is_empty()) {
            out.extend(data_project_folders(project.trim()));
        }
    }
    if profile == "media" {
        out.extend(media_shoot_folders(options.shoot_name.as_deref()));
    }
    Ok(out)
}

/// Report, and with `apply` create, the folders of a profile under `root`
pub fn scaffold(root: &Path, profile: &str, options: &ScaffoldOptions) -> Result<ScaffoldReport> {
    let profile = profile.trim().to_lowercase();
    let folders = folders(&profile, options)?;
    let mut created = Vec::new();
    let mut log_path = None;

    if options.apply {
        for rel in &folders {
            let dir = root.join(rel);
            std::fs::create_dir_all(&dir)?;
            created.push(dir.display().to_string());
        }

        let audit = (profile == "health").then(|| {
            serde_json::json!({ "hashing": true, "strict_logging": true })
        });
        let root_str = root.display().to_string();
        let log = AuditLog {
            profile: &profile,
            root: &root_str,
            executed_by: &options.executed_by,
            timestamp: chrono::Utc::now().to_rfc3339(),
            created: &created,
            audit,
        };
        let path = root.join(LOG_DIR).join(format!("profile_{}_scaffold.json", profile));
        write_json_atomic(&log, &path)?;
        tracing::info!("Created {} folders for profile {}", created.len(), profile);
        log_path = Some(path);
    }

    Ok(ScaffoldReport {
        next_steps: next_steps(&profile, options.variant.as_deref()),
        profile,
        root: root.display().to_string(),
        folders,
        created,
        log_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dry_run_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let report = scaffold(dir.path(), "Researcher", &ScaffoldOptions::default()).unwrap();
        assert_eq!(report.folders.len(), RESEARCHER.len());
        assert!(report.created.is_empty());
        assert!(!dir.path().join("Research").exists());
    }

    #[test]
    fn test_apply_health_writes_audit_log() {
        let dir = TempDir::new().unwrap();
        let options = ScaffoldOptions { apply: true, executed_by: "qa".into(), ..Default::default() };
        let report = scaffold(dir.path(), "health", &options).unwrap();
        assert!(dir.path().join("Health/Patients").is_dir());

        let log = std::fs::read_to_string(report.log_path.unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["audit"]["hashing"], true);
        assert_eq!(value["created"].as_array().unwrap().len(), HEALTH.len());
    }

    #[test]
    fn test_variants_and_extras() {
        let student = ScaffoldOptions { variant: Some("student".into()), ..Default::default() };
        assert!(folders("it", &student).unwrap().contains(&"IT/Courses/Program/Labs".to_string()));
        assert!(folders("engineer", &student).is_err());
        assert!(folders("chef", &ScaffoldOptions::default()).is_err());

        let data = ScaffoldOptions { project_name: Some("churn".into()), ..Default::default() };
        assert!(folders("data", &data).unwrap().contains(&"Data/Projects/churn/Data/Raw".to_string()));

        let media = ScaffoldOptions { shoot_name: Some("wedding".into()), ..Default::default() };
        let dirs = folders("media", &media).unwrap();
        assert!(dirs.iter().any(|d| d.ends_with("-wedding/RAW")));
    }
}
