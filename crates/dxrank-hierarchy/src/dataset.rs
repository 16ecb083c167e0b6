//! Dataset shapes accepted by the hierarchy loader and file/directory readers.
//!
//! Two JSON shapes are recognized:
//! - structured: `{ "chapters": [...], "categories": [...], "codes": [...] }`
//! - flat: `[ { "code": "E11.621", "description": "...", ... }, ... ]`, where
//!   category and chapter are derived from the code when not given.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use dxrank_core::types::SpecificityAttribute;
use dxrank_core::{Error, Result};

use crate::code_format::{category_stem, normalize_code};
use crate::hierarchy::Hierarchy;
use crate::icd10::{chapter_for_code, label_matches};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub range: String,
    /// Declared category order; categories not listed here are appended in dataset order.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: String,
    pub chapter: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeRecord {
    pub code: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub category_title: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub requires: Vec<SpecificityAttribute>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredDataset {
    pub chapters: Vec<ChapterRecord>,
    pub categories: Vec<CategoryRecord>,
    pub codes: Vec<CodeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dataset {
    Structured(StructuredDataset),
    Flat(Vec<CodeRecord>),
}

impl Dataset {
    /// Resolve a dataset into explicit chapters, categories and codes.
    pub fn into_structured(self) -> Result<StructuredDataset> {
        match self {
            Self::Structured(s) => Ok(s),
            Self::Flat(records) => structure_flat(records),
        }
    }
}

/// Place flat records using the built-in chapter table.
fn structure_flat(records: Vec<CodeRecord>) -> Result<StructuredDataset> {
    let mut out = StructuredDataset::default();
    let mut chapter_pos: HashMap<&'static str, usize> = HashMap::new();
    let mut category_pos: HashMap<String, usize> = HashMap::new();

    for mut record in records {
        let code = normalize_code(&record.code);
        let def = chapter_for_code(&code)
            .ok_or_else(|| Error::integrity(format!("cannot place code '{}' in any chapter", code)))?;
        if let Some(label) = record.chapter.as_deref() {
            if !label_matches(def, label) {
                return Err(Error::integrity(format!(
                    "code '{}' declares chapter '{}' but belongs to '{}'",
                    code,
                    label,
                    def.display_name()
                )));
            }
        }
        if !chapter_pos.contains_key(def.id) {
            chapter_pos.insert(def.id, out.chapters.len());
            out.chapters.push(ChapterRecord {
                id: def.id.to_string(),
                title: def.title.to_string(),
                range: def.range.to_string(),
                categories: Vec::new(),
                keywords: def.keywords.iter().map(|k| k.to_string()).collect(),
            });
        }

        let category = record.category.clone().map(|c| c.trim().to_string()).unwrap_or_else(|| category_stem(&code));
        match category_pos.get(&category) {
            Some(&pos) => {
                let existing = &mut out.categories[pos];
                if existing.chapter != def.id {
                    return Err(Error::integrity(format!(
                        "category '{}' spans chapters '{}' and '{}'",
                        category, existing.chapter, def.id
                    )));
                }
                if existing.title.is_empty() {
                    if let Some(title) = record.category_title.take() {
                        existing.title = title;
                    }
                }
            }
            None => {
                category_pos.insert(category.clone(), out.categories.len());
                out.categories.push(CategoryRecord {
                    id: category.clone(),
                    chapter: def.id.to_string(),
                    title: record.category_title.take().unwrap_or_default(),
                });
            }
        }

        record.code = code;
        record.category = Some(category);
        record.chapter = Some(def.id.to_string());
        out.codes.push(record);
    }
    Ok(out)
}

/// Parse a dataset from JSON text.
pub fn parse(json: &str) -> Result<Dataset> {
    serde_json::from_str(json).map_err(|e| Error::integrity(format!("unreadable dataset: {}", e)))
}

fn list_json_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    files.sort();
    files
}

fn read_dataset(path: &Path) -> Result<Dataset> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::integrity(format!("cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| Error::integrity(format!("unreadable dataset {}: {}", path.display(), e)))
}

/// Load a hierarchy from a JSON file, or from every `*.json` shard under a directory.
///
/// Shards must be flat record arrays; they are merged in sorted path order.
pub fn load_path(path: &Path) -> Result<Hierarchy> {
    let dataset = if path.is_dir() {
        let files = list_json_files(path);
        if files.is_empty() {
            return Err(Error::integrity(format!("no .json files under {}", path.display())));
        }
        let mut records = Vec::new();
        for file in &files {
            debug!(file = %file.display(), "reading dataset shard");
            match read_dataset(file)? {
                Dataset::Flat(mut shard) => records.append(&mut shard),
                Dataset::Structured(_) => {
                    return Err(Error::integrity(format!(
                        "{}: structured datasets cannot be merged as shards",
                        file.display()
                    )))
                }
            }
        }
        Dataset::Flat(records)
    } else {
        read_dataset(path)?
    };
    let hierarchy = Hierarchy::load(dataset)?;
    info!(
        codes = hierarchy.code_count(),
        categories = hierarchy.category_count(),
        chapters = hierarchy.chapter_count(),
        path = %path.display(),
        "hierarchy loaded"
    );
    Ok(hierarchy)
}
