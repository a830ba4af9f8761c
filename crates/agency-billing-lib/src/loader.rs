use crate::data_structures::{ProjectRecord, TimeBasedRequest, WebsiteHostingInterval};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const TICKETS_FILE: &str = "tickets";
pub const HOSTING_FILE: &str = "hosting";
pub const PROJECTS_FILE: &str = "projects";

/// The three normalized record lists the engine consumes.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub tickets: Vec<TimeBasedRequest>,
    pub sites: Vec<WebsiteHostingInterval>,
    pub projects: Vec<ProjectRecord>,
}

impl RecordSet {
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty() && self.sites.is_empty() && self.projects.is_empty()
    }
}

/// Reads records from `.json` array files or `.jsonl` files.
pub struct DataLoader;

impl DataLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn load_tickets<P: AsRef<Path>>(&self, path: P) -> Result<Vec<TimeBasedRequest>> {
        self.load_records(path)
    }

    pub fn load_sites<P: AsRef<Path>>(&self, path: P) -> Result<Vec<WebsiteHostingInterval>> {
        self.load_records(path)
    }

    pub fn load_projects<P: AsRef<Path>>(&self, path: P) -> Result<Vec<ProjectRecord>> {
        self.load_records(path)
    }

    /// Loads `tickets`, `hosting` and `projects` files from `dir_path`.
    /// A missing file means an empty list for that stream.
    pub fn load_from_directory<P: AsRef<Path>>(&self, dir_path: P) -> Result<RecordSet> {
        let dir_path = dir_path.as_ref();
        if !dir_path.is_dir() {
            return Err(anyhow::anyhow!(
                "Data directory does not exist: {}",
                dir_path.display()
            ));
        }

        let mut records = RecordSet::default();
        if let Some(path) = self.find_file(dir_path, TICKETS_FILE) {
            records.tickets = self.load_tickets(&path)?;
        }
        if let Some(path) = self.find_file(dir_path, HOSTING_FILE) {
            records.sites = self.load_sites(&path)?;
        }
        if let Some(path) = self.find_file(dir_path, PROJECTS_FILE) {
            records.projects = self.load_projects(&path)?;
        }

        debug!(
            tickets = records.tickets.len(),
            sites = records.sites.len(),
            projects = records.projects.len(),
            "Loaded records from {}",
            dir_path.display()
        );
        Ok(records)
    }

    fn find_file(&self, dir_path: &Path, stem: &str) -> Option<PathBuf> {
        ["jsonl", "json"]
            .iter()
            .map(|extension| dir_path.join(format!("{}.{}", stem, extension)))
            .find(|path| path.is_file())
    }

    fn load_records<T: DeserializeOwned, P: AsRef<Path>>(&self, path: P) -> Result<Vec<T>> {
        let path = path.as_ref();
        let is_jsonl = path.extension().is_some_and(|extension| extension == "jsonl");

        if is_jsonl {
            self.load_jsonl(path)
        } else {
            let file = File::open(path)
                .with_context(|| format!("Failed to open file: {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse records in {}", path.display()))
        }
    }

    fn load_jsonl<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        let file =
            File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;

        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let record = serde_json::from_str(&line).with_context(|| {
                format!("Malformed record on line {} of {}", line_num + 1, path.display())
            })?;
            records.push(record);
        }

        Ok(records)
    }
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::{PricingTier, ProjectCategory};
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::{tempdir, Builder};

    #[test]
    fn test_load_tickets_jsonl_with_empty_lines() {
        let loader = DataLoader::new();
        let mut temp_file = Builder::new().suffix(".jsonl").tempfile().unwrap();

        let content = r#"{"id": "T-1", "date": "2024-01-02", "urgency_tier": "low", "hours": 1.5}

{"id": "T-2", "date": "2024-01-03", "urgency_tier": "High", "hours": "0.25"}"#;
        temp_file.write_all(content.as_bytes()).unwrap();

        let tickets = loader.load_tickets(temp_file.path()).unwrap();
        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[0].hours(), dec!(1.5));
        assert_eq!(tickets[1].urgency_tier(), PricingTier::High);
    }

    #[test]
    fn test_malformed_jsonl_line_is_an_error() {
        let loader = DataLoader::new();
        let mut temp_file = Builder::new().suffix(".jsonl").tempfile().unwrap();

        let content = r#"{"id": "T-1", "date": "2024-01-02", "urgency_tier": "low", "hours": 1}
{"id": "T-2", "date": "2024-01-03""#;
        temp_file.write_all(content.as_bytes()).unwrap();

        let error = loader.load_tickets(temp_file.path()).unwrap_err();
        assert!(format!("{:#}", error).contains("line 2"));
    }

    #[test]
    fn test_load_projects_json_array() {
        let loader = DataLoader::new();
        let mut temp_file = Builder::new().suffix(".json").tempfile().unwrap();

        let content = r#"[
            {"id": "P-1", "name": "Promo page", "category": "landing_page", "completion_date": "2024-02-10", "base_amount": 200},
            {"id": "P-2", "name": "Intake", "category": "Multi-Form", "completion_date": "2024-02-11", "base_amount": "450.00"}
        ]"#;
        temp_file.write_all(content.as_bytes()).unwrap();

        let projects = loader.load_projects(temp_file.path()).unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].category(), ProjectCategory::LandingPage);
        assert_eq!(projects[1].category(), ProjectCategory::MultiForm);
        assert_eq!(projects[1].base_amount(), dec!(450));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let loader = DataLoader::new();
        let mut temp_file = Builder::new().suffix(".json").tempfile().unwrap();

        let content = r#"[{"id": "P-1", "name": "X", "category": "mobile_app", "completion_date": "2024-02-10", "base_amount": 200}]"#;
        temp_file.write_all(content.as_bytes()).unwrap();

        assert!(loader.load_projects(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_from_directory() {
        let loader = DataLoader::new();
        let dir = tempdir().unwrap();

        std::fs::write(
            dir.path().join("hosting.json"),
            r#"[{"site_id": "s1", "site_name": "Main", "url": "https://main.example", "hosting_start": "2024-01-01", "hosting_end": null},
                {"site_id": "s2", "site_name": "Old", "hosting_start": "2023-06-01", "hosting_end": "2024-01-15"}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("tickets.jsonl"),
            r#"{"id": "T-1", "date": "2024-01-02", "urgency_tier": "medium", "hours": 2}"#,
        )
        .unwrap();

        let records = loader.load_from_directory(dir.path()).unwrap();
        assert_eq!(records.tickets.len(), 1);
        assert_eq!(records.sites.len(), 2);
        assert!(records.sites[0].is_active());
        assert!(!records.sites[1].is_active());
        assert!(records.projects.is_empty());
    }

    #[test]
    fn test_missing_directory() {
        let loader = DataLoader::new();
        assert!(loader.load_from_directory("/nonexistent/agency-billing").is_err());
    }
}
