//! Agent definition fixtures for building temporary agent trees.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

#[derive(Debug, Clone)]
pub struct AgentFile {
    pub path: PathBuf,
    pub content: String,
}

impl AgentFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

pub struct AgentTreeFixture {
    pub root: TempDir,
    pub files: Vec<AgentFile>,
}

impl AgentTreeFixture {
    /// Two agents with disjoint scopes, boundary language and hedging
    /// guidance. Static analysis finds no errors in this pair.
    pub fn clean_pair() -> Self {
        AgentTreeBuilder::new()
            .yaml_agent(
                "backend_dev",
                "You build backend services: REST api endpoints, middleware, the \
                 service layer. Don't answer frontend questions; state your \
                 confidence and hedge when unsure.",
                &["backend"],
            )
            .yaml_agent(
                "frontend_dev",
                "You build frontend UIs with react, css and html in the browser. \
                 Avoid backend topics; say you are not sure when uncertain.",
                &["frontend"],
            )
            .build()
            .expect("Failed to create clean agent pair")
    }

    /// Two agents with contradictory storage directives. Static analysis
    /// reports a conflict error for this pair.
    pub fn conflicting_pair() -> Self {
        AgentTreeBuilder::new()
            .yaml_agent(
                "storage_a",
                "You manage databases. Always use postgres for relational storage. \
                 Stay within the scope of database work.",
                &[],
            )
            .yaml_agent(
                "storage_b",
                "You manage persistence. Never use postgres, standardize on mysql. \
                 Avoid answering outside this scope.",
                &[],
            )
            .build()
            .expect("Failed to create conflicting agent pair")
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }
}

pub struct AgentTreeBuilder {
    files: Vec<AgentFile>,
}

impl AgentTreeBuilder {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    pub fn file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.push(AgentFile::new(path, content));
        self
    }

    /// Writes `<id>.yaml` with the prompt on a single quoted line.
    pub fn yaml_agent(self, id: &str, prompt: &str, domains: &[&str]) -> Self {
        let mut content = format!("id: {id}\nsystem_prompt: \"{prompt}\"\n");
        if !domains.is_empty() {
            content.push_str("domains:\n");
            for domain in domains {
                content.push_str("  - ");
                content.push_str(domain);
                content.push('\n');
            }
        }
        self.file(format!("{id}.yaml"), content)
    }

    pub fn config(self, content: impl Into<String>) -> Self {
        self.file("agent-evals.yaml", content)
    }

    pub fn build(self) -> std::io::Result<AgentTreeFixture> {
        let root = TempDir::new()?;

        for file in &self.files {
            let file_path = root.path().join(&file.path);
            if let Some(parent) = file_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&file_path, &file.content)?;
        }

        Ok(AgentTreeFixture {
            root,
            files: self.files,
        })
    }
}

impl Default for AgentTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_pair_fixture() {
        let fixture = AgentTreeFixture::clean_pair();

        assert!(fixture.path().join("backend_dev.yaml").exists());
        assert!(fixture.path().join("frontend_dev.yaml").exists());
        assert_eq!(fixture.files.len(), 2);
    }

    #[test]
    fn test_builder_creates_nested_paths() {
        let fixture = AgentTreeBuilder::new()
            .file("team_a/agent.yaml", "system_prompt: \"Own the payments flow.\"\n")
            .config("thresholds:\n  min_overall_score: 0.5\n")
            .build()
            .unwrap();

        assert!(fixture.path().join("team_a/agent.yaml").exists());
        let config = fs::read_to_string(fixture.path().join("agent-evals.yaml")).unwrap();
        assert!(config.contains("min_overall_score"));
    }
}
