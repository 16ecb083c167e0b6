//! Read-only code → category → chapter tree.
//!
//! Records live in three arenas addressed by typed indices. Every lookup the
//! ranking path needs is a map lookup or a slice index; nothing walks the tree
//! at query time. A `Hierarchy` is never mutated after `load`, so a single
//! instance (typically behind an `Arc`) serves any number of concurrent queries.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

use dxrank_core::text::{contains_phrase, words};
use dxrank_core::types::SpecificityAttribute;
use dxrank_core::{Error, Result};

use crate::code_format::{is_well_formed, normalize_code};
use crate::dataset::{Dataset, StructuredDataset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CodeIdx(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CategoryIdx(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChapterIdx(u32);

/// A single assignable diagnosis code (leaf of the tree).
#[derive(Debug, Clone)]
pub struct Code {
    pub id: String,
    pub description: String,
    pub category: CategoryIdx,
    pub chapter: ChapterIdx,
    /// Specificity the code demands before it can be assigned confidently.
    pub requires: BTreeSet<SpecificityAttribute>,
    pub synonyms: Vec<String>,
}

impl Code {
    pub fn requires(&self, attr: SpecificityAttribute) -> bool {
        self.requires.contains(&attr)
    }
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: String,
    pub title: String,
    pub chapter: ChapterIdx,
    pub members: Vec<CodeIdx>,
}

#[derive(Debug, Clone)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub range: String,
    pub categories: Vec<CategoryIdx>,
    pub keywords: Vec<String>,
}

impl Chapter {
    pub fn display_name(&self) -> String {
        if self.title.is_empty() { self.id.clone() } else { format!("{}. {}", self.id, self.title) }
    }
}

#[derive(Debug)]
pub struct Hierarchy {
    codes: Vec<Code>,
    categories: Vec<Category>,
    chapters: Vec<Chapter>,
    code_by_id: HashMap<String, CodeIdx>,
    category_by_id: HashMap<String, CategoryIdx>,
    chapter_by_id: HashMap<String, ChapterIdx>,
}

fn arena_index(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::integrity(format!("too many {}", what)))
}

impl Hierarchy {
    /// Build and validate a hierarchy.
    ///
    /// Fails with `DataIntegrity` on duplicate or malformed identifiers,
    /// references to missing categories or chapters, or any category placed
    /// under more than one chapter.
    pub fn load(dataset: Dataset) -> Result<Self> {
        Self::build(dataset.into_structured()?)
    }

    fn build(data: StructuredDataset) -> Result<Self> {
        if data.codes.is_empty() {
            return Err(Error::integrity("dataset contains no codes"));
        }
        let mut h = Self {
            codes: Vec::with_capacity(data.codes.len()),
            categories: Vec::with_capacity(data.categories.len()),
            chapters: Vec::with_capacity(data.chapters.len()),
            code_by_id: HashMap::with_capacity(data.codes.len()),
            category_by_id: HashMap::with_capacity(data.categories.len()),
            chapter_by_id: HashMap::with_capacity(data.chapters.len()),
        };

        for rec in &data.chapters {
            let id = rec.id.trim().to_string();
            if id.is_empty() {
                return Err(Error::integrity("chapter with empty id"));
            }
            let idx = ChapterIdx(arena_index(h.chapters.len(), "chapters")?);
            if h.chapter_by_id.insert(id.clone(), idx).is_some() {
                return Err(Error::integrity(format!("duplicate chapter '{}'", id)));
            }
            h.chapters.push(Chapter {
                id,
                title: rec.title.trim().to_string(),
                range: rec.range.trim().to_string(),
                categories: Vec::new(),
                keywords: rec.keywords.iter().map(|k| k.trim().to_lowercase()).filter(|k| !k.is_empty()).collect(),
            });
        }

        for rec in &data.categories {
            let id = rec.id.trim().to_string();
            if id.is_empty() {
                return Err(Error::integrity("category with empty id"));
            }
            let chapter = *h.chapter_by_id.get(rec.chapter.trim()).ok_or_else(|| {
                Error::integrity(format!("category '{}' references unknown chapter '{}'", id, rec.chapter))
            })?;
            let idx = CategoryIdx(arena_index(h.categories.len(), "categories")?);
            if h.category_by_id.insert(id.clone(), idx).is_some() {
                return Err(Error::integrity(format!("duplicate category '{}'", id)));
            }
            h.categories.push(Category { id, title: rec.title.trim().to_string(), chapter, members: Vec::new() });
        }

        // Declared category order first, then the rest in dataset order.
        let mut placed: HashSet<CategoryIdx> = HashSet::new();
        for (ci, rec) in data.chapters.iter().enumerate() {
            for cat_id in &rec.categories {
                let cat = *h.category_by_id.get(cat_id.trim()).ok_or_else(|| {
                    Error::integrity(format!("chapter '{}' lists unknown category '{}'", rec.id, cat_id))
                })?;
                let owner = h.categories[cat.0 as usize].chapter;
                if owner.0 as usize != ci {
                    return Err(Error::integrity(format!(
                        "chapter '{}' lists category '{}' which belongs to chapter '{}'",
                        rec.id, cat_id, h.chapters[owner.0 as usize].id
                    )));
                }
                if !placed.insert(cat) {
                    return Err(Error::integrity(format!("category '{}' listed twice", cat_id)));
                }
                h.chapters[ci].categories.push(cat);
            }
        }
        for (i, cat) in h.categories.iter().enumerate() {
            let idx = CategoryIdx(i as u32);
            if !placed.contains(&idx) {
                h.chapters[cat.chapter.0 as usize].categories.push(idx);
            }
        }

        for rec in data.codes {
            let id = normalize_code(&rec.code);
            if !is_well_formed(&id) {
                return Err(Error::integrity(format!("malformed code identifier '{}'", rec.code)));
            }
            let cat_id = rec
                .category
                .as_deref()
                .map(str::trim)
                .ok_or_else(|| Error::integrity(format!("code '{}' has no category", id)))?;
            let category = *h.category_by_id.get(cat_id).ok_or_else(|| {
                Error::integrity(format!("code '{}' references unknown category '{}'", id, cat_id))
            })?;
            let chapter = h.categories[category.0 as usize].chapter;
            if let Some(declared) = rec.chapter.as_deref().map(str::trim) {
                if declared != h.chapters[chapter.0 as usize].id {
                    return Err(Error::integrity(format!(
                        "code '{}' declares chapter '{}' but its category belongs to '{}'",
                        id, declared, h.chapters[chapter.0 as usize].id
                    )));
                }
            }
            let idx = CodeIdx(arena_index(h.codes.len(), "codes")?);
            if h.code_by_id.insert(id.clone(), idx).is_some() {
                return Err(Error::integrity(format!("duplicate code '{}'", id)));
            }
            h.categories[category.0 as usize].members.push(idx);
            h.codes.push(Code {
                id,
                description: rec.description.trim().to_string(),
                category,
                chapter,
                requires: rec.requires.into_iter().collect(),
                synonyms: rec.synonyms,
            });
        }
        Ok(h)
    }

    pub fn code(&self, idx: CodeIdx) -> &Code {
        &self.codes[idx.0 as usize]
    }

    pub fn category(&self, idx: CategoryIdx) -> &Category {
        &self.categories[idx.0 as usize]
    }

    pub fn chapter(&self, idx: ChapterIdx) -> &Chapter {
        &self.chapters[idx.0 as usize]
    }

    /// Resolve an identifier in any accepted spelling (`e11621`, `E11.621`).
    pub fn lookup(&self, id: &str) -> Option<CodeIdx> {
        self.code_by_id.get(&normalize_code(id)).copied()
    }

    pub fn get(&self, id: &str) -> Option<&Code> {
        self.lookup(id).map(|idx| self.code(idx))
    }

    pub fn category_by_id(&self, id: &str) -> Option<&Category> {
        self.category_by_id.get(id.trim()).map(|&i| self.category(i))
    }

    pub fn chapter_by_id(&self, id: &str) -> Option<&Chapter> {
        self.chapter_by_id.get(id.trim()).map(|&i| self.chapter(i))
    }

    /// Whether the identifier names a code in this hierarchy.
    pub fn is_valid(&self, id: &str) -> bool {
        self.lookup(id).is_some()
    }

    pub fn ancestors(&self, idx: CodeIdx) -> (&Category, &Chapter) {
        let code = self.code(idx);
        (self.category(code.category), self.chapter(code.chapter))
    }

    /// Other codes sharing the category of `idx`, in dataset order.
    pub fn siblings(&self, idx: CodeIdx) -> impl Iterator<Item = &Code> + '_ {
        let category = self.category(self.code(idx).category);
        category.members.iter().filter(move |&&m| m != idx).map(move |&m| self.code(m))
    }

    pub fn codes(&self) -> impl Iterator<Item = (CodeIdx, &Code)> + '_ {
        self.codes.iter().enumerate().map(|(i, c)| (CodeIdx(i as u32), c))
    }

    pub fn chapters(&self) -> impl Iterator<Item = (ChapterIdx, &Chapter)> + '_ {
        self.chapters.iter().enumerate().map(|(i, c)| (ChapterIdx(i as u32), c))
    }

    pub fn code_count(&self) -> usize {
        self.codes.len()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    /// Chapter implied by the query text, by whole-word keyword hits.
    ///
    /// Highest hit count wins; ties go to the chapter that appears first.
    pub fn detect_chapter(&self, text: &str) -> Option<ChapterIdx> {
        let haystack = words(text);
        if haystack.is_empty() {
            return None;
        }
        let mut best: Option<(ChapterIdx, usize)> = None;
        for (idx, chapter) in self.chapters() {
            let hits = chapter.keywords.iter().filter(|k| contains_phrase(&haystack, k)).count();
            if hits > 0 && best.map_or(true, |(_, b)| hits > b) {
                best = Some((idx, hits));
            }
        }
        best.map(|(idx, _)| idx)
    }
}
