//! Agent definition discovery and loading.
//!
//! Supports four source formats:
//! - YAML/JSON files with a `system_prompt` (or fallback) key
//! - Markdown/text files, optionally with YAML frontmatter
//! - Directories containing AGENT.md plus optional SKILLS.md / RULES.md
//!
//! `load_agents_recursive` walks a whole tree and can collapse duplicate
//! definitions (identical system prompts) into one representative.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{EvalError, Result};

type RawMap = serde_json::Map<String, serde_json::Value>;

/// One loaded agent configuration, format-independent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub source_path: String,
    pub system_prompt: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub claimed_domains: Vec<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: RawMap,
    /// SHA-256 hex of the system prompt; set by the recursive loader.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_hash: String,
    /// Other source paths with identical content, populated by dedup.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub also_found_in: Vec<String>,
}

impl AgentDefinition {
    /// The complete text that defines this agent's behavior: system prompt
    /// plus skills and rules rendered as list blocks.
    pub fn full_context(&self) -> String {
        let mut out = self.system_prompt.clone();
        if !self.skills.is_empty() {
            out.push_str("\n\nSkills:\n");
            for s in &self.skills {
                out.push_str("- ");
                out.push_str(s);
                out.push('\n');
            }
        }
        if !self.rules.is_empty() {
            out.push_str("\n\nRules:\n");
            for r in &self.rules {
                out.push_str("- ");
                out.push_str(r);
                out.push('\n');
            }
        }
        out
    }

    pub fn word_count(&self) -> usize {
        self.full_context().split_whitespace().count()
    }
}

/// Loads agent definitions from a file or a single directory level.
///
/// For directories, subdirectories are tried as directory-format agents
/// first, then plain files in the root. Files that parse but contain no
/// usable prompt are skipped silently.
pub fn load_agents(path: &Path) -> Result<Vec<AgentDefinition>> {
    let meta = fs::metadata(path)
        .map_err(|_| EvalError::AgentSource(format!("agent path not found: {}", path.display())))?;

    if !meta.is_dir() {
        return Ok(load_single_file(path)?.into_iter().collect());
    }

    let mut entries: Vec<_> = fs::read_dir(path)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    let mut agents = Vec::new();

    // First pass: directory-based agents.
    for entry in &entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !entry.file_type()?.is_dir() || name.starts_with('.') {
            continue;
        }
        if let Some(agent) = try_load_directory_agent(&entry.path()) {
            agents.push(agent);
        }
    }

    // Second pass: individual files in the root.
    for entry in &entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() || name.starts_with('.') {
            continue;
        }
        if name == "agent-evals.yaml" || name == "agent-evals.yml" {
            continue;
        }
        match load_single_file(&entry.path()) {
            Ok(Some(agent)) => agents.push(agent),
            Ok(None) => {}
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "Skipped agent file");
            }
        }
    }

    Ok(agents)
}

/// Walks the directory tree rooted at `path`, loading agent definitions from
/// all supported file types. `source_path` is recorded relative to the root
/// and every agent gets a content hash. When `dedup` is true, agents with
/// identical system prompts are collapsed into a single representative with
/// `also_found_in` populated.
pub fn load_agents_recursive(path: &Path, dedup: bool) -> Result<Vec<AgentDefinition>> {
    let meta = fs::metadata(path)
        .map_err(|_| EvalError::AgentSource(format!("agent path not found: {}", path.display())))?;

    if !meta.is_dir() {
        return load_agents(path);
    }

    let mut all = Vec::new();

    let walker = WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden_entry(e));
    for entry in walker {
        let Ok(entry) = entry else { continue };
        if entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name == "agent-evals.yaml" || name == "agent-evals.yml" {
            continue;
        }
        match load_single_file(entry.path()) {
            Ok(Some(mut agent)) => {
                let rel = entry.path().strip_prefix(path).unwrap_or(entry.path());
                agent.source_path = rel.display().to_string();
                agent.content_hash = content_hash(&agent.system_prompt);
                all.push(agent);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "Skipped agent file");
            }
        }
    }

    debug!(count = all.len(), dedup, "Scanned agent tree");

    if dedup {
        Ok(deduplicate_agents(all))
    } else {
        Ok(qualify_conflicting_ids(all))
    }
}

fn is_hidden_entry(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn load_single_file(path: &Path) -> Result<Option<AgentDefinition>> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "yaml" | "yml" => load_yaml(path),
        "json" => load_json(path),
        "md" | "txt" => load_text(path),
        _ => Ok(None),
    }
}

fn load_yaml(path: &Path) -> Result<Option<AgentDefinition>> {
    let data = fs::read_to_string(path)?;

    let Ok(raw) = serde_yaml_bw::from_str::<serde_json::Value>(&data) else {
        return Ok(None);
    };
    let Some(map) = raw.as_object() else {
        return Ok(None);
    };

    let Some(system_prompt) = first_string(map, &["system_prompt", "instructions", "prompt", "content"])
    else {
        return Ok(None);
    };

    let stem = filename_stem(path);

    Ok(Some(AgentDefinition {
        id: get_string(map, "id").unwrap_or_else(|| stem.clone()),
        name: get_string(map, "name").unwrap_or_else(|| name_from_stem(&stem)),
        source_path: path.display().to_string(),
        system_prompt,
        skills: string_list(map, &["skills", "domain_tags"]),
        rules: string_list(map, &["rules"]),
        claimed_domains: string_list(map, &["domains", "domain_tags"]),
        metadata: filter_keys(
            map,
            &[
                "system_prompt",
                "instructions",
                "prompt",
                "content",
                "name",
                "id",
                "skills",
                "rules",
                "domains",
                "domain_tags",
            ],
        ),
        ..Default::default()
    }))
}

fn load_json(path: &Path) -> Result<Option<AgentDefinition>> {
    let data = fs::read_to_string(path)?;

    let Ok(raw) = serde_json::from_str::<serde_json::Value>(&data) else {
        return Ok(None);
    };
    let Some(map) = raw.as_object() else {
        return Ok(None);
    };

    let Some(system_prompt) = first_string(map, &["system_prompt", "instructions", "prompt"]) else {
        return Ok(None);
    };

    let stem = filename_stem(path);

    Ok(Some(AgentDefinition {
        id: get_string(map, "id").unwrap_or_else(|| stem.clone()),
        name: get_string(map, "name").unwrap_or_else(|| name_from_stem(&stem)),
        source_path: path.display().to_string(),
        system_prompt,
        skills: string_list(map, &["skills"]),
        rules: string_list(map, &["rules"]),
        claimed_domains: string_list(map, &["domains"]),
        ..Default::default()
    }))
}

fn load_text(path: &Path) -> Result<Option<AgentDefinition>> {
    let data = fs::read_to_string(path)?;

    let mut content = data.trim().to_string();
    if content.len() < 20 {
        return Ok(None);
    }

    let stem = filename_stem(path);
    let mut frontmatter: Option<RawMap> = None;

    // YAML frontmatter in markdown.
    if content.starts_with("---") {
        let parts: Vec<&str> = content.splitn(3, "---").collect();
        if parts.len() >= 3
            && let Ok(fm) = serde_yaml_bw::from_str::<serde_json::Value>(parts[1])
            && let Some(map) = fm.as_object()
        {
            frontmatter = Some(map.clone());
            content = parts[2].trim().to_string();
        }
    }

    let mut agent = AgentDefinition {
        id: stem.clone(),
        name: name_from_stem(&stem),
        source_path: path.display().to_string(),
        system_prompt: content,
        ..Default::default()
    };

    if let Some(fm) = frontmatter {
        if let Some(name) = get_string(&fm, "name") {
            agent.name = name;
        }
        agent.skills = string_list(&fm, &["skills"]);
        agent.rules = string_list(&fm, &["rules"]);
        agent.claimed_domains = string_list(&fm, &["domains"]);
        agent.metadata = fm;
    }

    Ok(Some(agent))
}

fn try_load_directory_agent(dir: &Path) -> Option<AgentDefinition> {
    const AGENT_FILES: &[&str] = &[
        "AGENT.md",
        "agent.md",
        "system_prompt.md",
        "instructions.md",
        "AGENT.txt",
        "prompt.md",
        "README.md",
    ];
    const SKILL_FILES: &[&str] = &["SKILLS.md", "skills.md", "SKILL.md"];
    const RULE_FILES: &[&str] = &["RULES.md", "rules.md", "RULE.md"];

    let system_prompt = first_readable(dir, AGENT_FILES).map(|s| s.trim().to_string())?;
    if system_prompt.is_empty() {
        return None;
    }

    let skills = first_readable(dir, SKILL_FILES)
        .map(|s| extract_list_items(&s))
        .unwrap_or_default();
    let rules = first_readable(dir, RULE_FILES)
        .map(|s| extract_list_items(&s))
        .unwrap_or_default();

    let dir_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut metadata = RawMap::new();
    metadata.insert("format".into(), "directory".into());

    Some(AgentDefinition {
        id: dir_name.clone(),
        name: name_from_stem(&dir_name),
        source_path: dir.display().to_string(),
        system_prompt,
        skills,
        rules,
        metadata,
        ..Default::default()
    })
}

fn first_readable(dir: &Path, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| fs::read_to_string(dir.join(name)).ok())
}

fn list_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-*]\s+(.+)$").unwrap())
}

fn extract_list_items(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            list_item_re()
                .captures(line.trim())
                .map(|c| c[1].trim().to_string())
        })
        .collect()
}

fn filename_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Derives a display name from a file stem: underscores and hyphens become
/// spaces, each word gets its first letter uppercased.
pub(crate) fn name_from_stem(stem: &str) -> String {
    stem.replace(['_', '-'], " ")
        .split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn content_hash(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn deduplicate_agents(agents: Vec<AgentDefinition>) -> Vec<AgentDefinition> {
    let mut reps: Vec<AgentDefinition> = Vec::new();
    let mut index_by_hash: HashMap<String, usize> = HashMap::new();

    for agent in agents {
        match index_by_hash.get(&agent.content_hash) {
            Some(&i) => reps[i].also_found_in.push(agent.source_path),
            None => {
                index_by_hash.insert(agent.content_hash.clone(), reps.len());
                reps.push(agent);
            }
        }
    }

    qualify_conflicting_ids(reps)
}

/// Prefixes colliding IDs with their parent directory so two `agent.yaml`
/// files in different subtrees stay distinguishable.
fn qualify_conflicting_ids(mut agents: Vec<AgentDefinition>) -> Vec<AgentDefinition> {
    let mut id_count: HashMap<String, usize> = HashMap::new();
    for agent in &agents {
        *id_count.entry(agent.id.clone()).or_default() += 1;
    }

    for agent in &mut agents {
        if id_count.get(&agent.id).copied().unwrap_or(0) > 1 {
            let dir = Path::new(&agent.source_path)
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !dir.is_empty() && dir != "." {
                agent.id = format!("{}/{}", dir, agent.id);
            }
        }
    }

    agents
}

fn get_string(map: &RawMap, key: &str) -> Option<String> {
    map.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_string(map: &RawMap, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| get_string(map, k))
}

/// Returns the first key that holds a non-empty list of strings; non-string
/// items are dropped.
fn string_list(map: &RawMap, keys: &[&str]) -> Vec<String> {
    for key in keys {
        if let Some(seq) = map.get(*key).and_then(|v| v.as_array()) {
            let items: Vec<String> = seq
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect();
            if !items.is_empty() {
                return items;
            }
        }
    }
    Vec::new()
}

fn filter_keys(map: &RawMap, exclude: &[&str]) -> RawMap {
    map.iter()
        .filter(|(k, _)| !exclude.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
