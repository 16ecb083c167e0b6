//! Domain types shared by the hierarchy model and the ranking engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// A raw neighbour returned by an external vector index.
///
/// `id` is the code identifier as stored in the index (dotted or not).
/// `score` is cosine similarity in [-1, 1]; higher is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    pub id: String,
    pub score: f64,
}

impl IndexHit {
    pub fn new(id: impl Into<String>, score: f64) -> Self {
        Self { id: id.into(), score }
    }
}

/// Clinical specificity a code may demand before it can be assigned confidently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecificityAttribute {
    Laterality,
    Severity,
    AnatomicalSite,
}

impl SpecificityAttribute {
    pub const ALL: [SpecificityAttribute; 3] = [Self::Laterality, Self::Severity, Self::AnatomicalSite];

    /// Closed vocabulary a code description uses to express this attribute.
    /// Anatomical sites have no closed vocabulary.
    pub fn vocabulary(self) -> &'static [&'static str] {
        match self {
            Self::Laterality => &["left", "right", "bilateral"],
            Self::Severity => &["mild", "moderate", "severe"],
            Self::AnatomicalSite => &[],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Laterality => "laterality",
            Self::Severity => "severity",
            Self::AnatomicalSite => "anatomical site",
        }
    }
}

impl fmt::Display for SpecificityAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const UNSPECIFIED_MARKERS: &[&str] = &["unspecified", "unknown", "not specified", "not documented"];

/// Placeholders providers emit for "not mentioned"; dropped on validation.
const ABSENT_MARKERS: &[&str] = &["null", "none", "n/a"];

/// Lower-case, trim and collapse internal whitespace.
pub fn normalize_term(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_unspecified_marker(term: &str) -> bool {
    UNSPECIFIED_MARKERS.contains(&term)
}

/// What the extraction says about one specificity attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeEvidence {
    /// Not mentioned in the source text.
    Absent,
    /// Mentioned, but the text does not say which value applies.
    Unspecified,
    Specified(BTreeSet<String>),
}

/// Entities supplied by an external extraction provider.
///
/// Every field is an unordered set of normalized strings. Extra keys in the
/// provider payload (diagnosis, procedures, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    #[serde(default)]
    pub symptoms: BTreeSet<String>,
    #[serde(default)]
    pub anatomical_sites: BTreeSet<String>,
    #[serde(default)]
    pub laterality: BTreeSet<String>,
    #[serde(default)]
    pub severity: BTreeSet<String>,
}

impl ExtractedEntities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symptom(mut self, s: &str) -> Self {
        self.symptoms.insert(normalize_term(s));
        self
    }

    pub fn with_site(mut self, s: &str) -> Self {
        self.anatomical_sites.insert(normalize_term(s));
        self
    }

    pub fn with_laterality(mut self, s: &str) -> Self {
        self.laterality.insert(normalize_term(s));
        self
    }

    pub fn with_severity(mut self, s: &str) -> Self {
        self.severity.insert(normalize_term(s));
        self
    }

    fn values(&self, attr: SpecificityAttribute) -> &BTreeSet<String> {
        match attr {
            SpecificityAttribute::Laterality => &self.laterality,
            SpecificityAttribute::Severity => &self.severity,
            SpecificityAttribute::AnatomicalSite => &self.anatomical_sites,
        }
    }

    pub fn evidence(&self, attr: SpecificityAttribute) -> AttributeEvidence {
        let values = self.values(attr);
        if values.is_empty() {
            return AttributeEvidence::Absent;
        }
        let concrete: BTreeSet<String> = values.iter().filter(|v| !is_unspecified_marker(v)).cloned().collect();
        if concrete.is_empty() { AttributeEvidence::Unspecified } else { AttributeEvidence::Specified(concrete) }
    }

    /// Re-normalize every value and reject payloads fusion cannot trust.
    pub fn validated(self) -> Result<Self, String> {
        let norm = |set: BTreeSet<String>, field: &str| -> Result<BTreeSet<String>, String> {
            let mut out = BTreeSet::new();
            for v in set {
                let n = normalize_term(&v);
                if n.is_empty() {
                    return Err(format!("empty value in '{}'", field));
                }
                if ABSENT_MARKERS.contains(&n.as_str()) {
                    continue;
                }
                out.insert(n);
            }
            Ok(out)
        };
        let entities = Self {
            symptoms: norm(self.symptoms, "symptoms")?,
            anatomical_sites: norm(self.anatomical_sites, "anatomical_sites")?,
            laterality: norm(self.laterality, "laterality")?,
            severity: norm(self.severity, "severity")?,
        };
        let vocab = SpecificityAttribute::Laterality.vocabulary();
        if let Some(bad) = entities.laterality.iter().find(|v| !vocab.contains(&v.as_str()) && !is_unspecified_marker(v)) {
            return Err(format!("unknown laterality '{}'", bad));
        }
        for attr in [SpecificityAttribute::Laterality, SpecificityAttribute::Severity] {
            let values = entities.values(attr);
            let markers = values.iter().filter(|v| is_unspecified_marker(v)).count();
            if markers > 0 && markers < values.len() {
                return Err(format!("{} is both specified and unspecified", attr));
            }
        }
        Ok(entities)
    }
}

/// Why no extraction result takes part in a ranking run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AbsenceReason {
    NotRequested,
    TimedOut,
    ProviderFailed(String),
    Malformed(String),
}

impl fmt::Display for AbsenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRequested => f.write_str("no extraction requested"),
            Self::TimedOut => f.write_str("extraction timed out"),
            Self::ProviderFailed(e) => write!(f, "extraction provider failed: {}", e),
            Self::Malformed(e) => write!(f, "malformed extraction: {}", e),
        }
    }
}

/// The optional entity-extraction signal fed to the fusion layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitySignal {
    Absent(AbsenceReason),
    Present(ExtractedEntities),
}

impl EntitySignal {
    pub fn none() -> Self {
        Self::Absent(AbsenceReason::NotRequested)
    }

    pub fn present(entities: ExtractedEntities) -> Self {
        match entities.validated() {
            Ok(e) => Self::Present(e),
            Err(reason) => Self::Absent(AbsenceReason::Malformed(reason)),
        }
    }

    /// Fold a provider call result into a signal; failures never escalate.
    pub fn from_extraction(result: anyhow::Result<ExtractedEntities>) -> Self {
        match result {
            Ok(entities) => Self::present(entities),
            Err(e) => Self::Absent(AbsenceReason::ProviderFailed(e.to_string())),
        }
    }

    /// Parse a provider JSON payload.
    ///
    /// Scalar strings and `null` are accepted for single-valued fields, so the
    /// `"laterality": "left" | null` shape parses alongside plain arrays.
    pub fn from_json(value: &Value) -> Self {
        match parse_entities(value) {
            Ok(entities) => Self::present(entities),
            Err(reason) => Self::Absent(AbsenceReason::Malformed(reason)),
        }
    }

    pub fn entities(&self) -> Option<&ExtractedEntities> {
        match self {
            Self::Present(e) => Some(e),
            Self::Absent(_) => None,
        }
    }
}

fn parse_entities(value: &Value) -> Result<ExtractedEntities, String> {
    let obj = value.as_object().ok_or_else(|| "payload is not an object".to_string())?;
    let field = |name: &str| -> Result<BTreeSet<String>, String> {
        match obj.get(name) {
            None | Some(Value::Null) => Ok(BTreeSet::new()),
            Some(Value::String(s)) => Ok(BTreeSet::from([s.clone()])),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(|| format!("'{}' contains a non-string value", name)))
                .collect(),
            Some(_) => Err(format!("'{}' has an unexpected type", name)),
        }
    };
    Ok(ExtractedEntities {
        symptoms: field("symptoms")?,
        anatomical_sites: field("anatomical_sites")?,
        laterality: field("laterality")?,
        severity: field("severity")?,
    })
}
