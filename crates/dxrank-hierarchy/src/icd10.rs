//! Built-in ICD-10 chapter table.
//!
//! Used to place codes from flat datasets that carry no explicit chapter, and
//! to seed chapter keyword lists for query-side chapter detection.

use crate::code_format::remove_dots;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterDef {
    pub id: &'static str,
    pub title: &'static str,
    pub range: &'static str,
    pub keywords: &'static [&'static str],
}

impl ChapterDef {
    /// `IV. Endocrine, nutritional and metabolic diseases`
    pub fn display_name(&self) -> String {
        format!("{}. {}", self.id, self.title)
    }
}

pub const CHAPTERS: &[ChapterDef] = &[
    ChapterDef {
        id: "I",
        title: "Certain infectious and parasitic diseases",
        range: "A00-B99",
        keywords: &["infection", "infectious", "bacteria", "virus", "parasite", "sepsis", "tuberculosis", "hiv", "hepatitis", "covid"],
    },
    ChapterDef {
        id: "II",
        title: "Neoplasms",
        range: "C00-D49",
        keywords: &["cancer", "tumor", "neoplasm", "carcinoma", "malignant", "benign", "metastasis", "lymphoma", "leukemia", "sarcoma"],
    },
    ChapterDef {
        id: "III",
        title: "Diseases of the blood and blood-forming organs",
        range: "D50-D89",
        keywords: &["anemia", "blood", "coagulation", "hemophilia", "thrombocytopenia", "bleeding", "clotting"],
    },
    ChapterDef {
        id: "IV",
        title: "Endocrine, nutritional and metabolic diseases",
        range: "E00-E89",
        keywords: &["diabetes", "thyroid", "endocrine", "metabolic", "obesity", "malnutrition", "vitamin deficiency", "gout", "hyperthyroid"],
    },
    ChapterDef {
        id: "V",
        title: "Mental, Behavioral and Neurodevelopmental disorders",
        range: "F01-F99",
        keywords: &["depression", "anxiety", "psychosis", "mental", "psychiatric", "bipolar", "schizophrenia", "adhd", "autism", "dementia"],
    },
    ChapterDef {
        id: "VI",
        title: "Diseases of the nervous system",
        range: "G00-G99",
        keywords: &["neurological", "epilepsy", "seizure", "parkinson", "alzheimer", "migraine", "neuropathy", "multiple sclerosis", "nerve"],
    },
    ChapterDef {
        id: "VII",
        title: "Diseases of the eye and adnexa",
        range: "H00-H59",
        keywords: &["eye", "vision", "blindness", "cataract", "glaucoma", "retina", "visual", "optic", "ocular"],
    },
    ChapterDef {
        id: "VIII",
        title: "Diseases of the ear and mastoid process",
        range: "H60-H95",
        keywords: &["ear", "hearing", "deafness", "tinnitus", "otitis", "mastoid", "auditory"],
    },
    ChapterDef {
        id: "IX",
        title: "Diseases of the circulatory system",
        range: "I00-I99",
        keywords: &["heart", "cardiac", "hypertension", "stroke", "cardiovascular", "arrhythmia", "myocardial infarction", "coronary", "vascular"],
    },
    ChapterDef {
        id: "X",
        title: "Diseases of the respiratory system",
        range: "J00-J99",
        keywords: &["lung", "respiratory", "asthma", "pneumonia", "copd", "bronchitis", "pulmonary", "breathing", "cough"],
    },
    ChapterDef {
        id: "XI",
        title: "Diseases of the digestive system",
        range: "K00-K95",
        keywords: &["stomach", "intestinal", "digestive", "gastric", "liver", "cirrhosis", "ulcer", "gallbladder", "pancreas", "bowel"],
    },
    ChapterDef {
        id: "XII",
        title: "Diseases of the skin and subcutaneous tissue",
        range: "L00-L99",
        keywords: &["skin", "dermatitis", "rash", "eczema", "psoriasis", "ulcer", "abscess", "cellulitis", "wound"],
    },
    ChapterDef {
        id: "XIII",
        title: "Diseases of the musculoskeletal system and connective tissue",
        range: "M00-M99",
        keywords: &["bone", "joint", "arthritis", "fracture", "osteoporosis", "back pain", "musculoskeletal", "rheumatoid", "muscle"],
    },
    ChapterDef {
        id: "XIV",
        title: "Diseases of the genitourinary system",
        range: "N00-N99",
        keywords: &["kidney", "renal", "urinary", "bladder", "prostate", "ureter", "nephritis", "genital"],
    },
    ChapterDef {
        id: "XV",
        title: "Pregnancy, childbirth and the puerperium",
        range: "O00-O9A",
        keywords: &["pregnancy", "pregnant", "childbirth", "labor", "delivery", "obstetric", "maternal", "fetal", "prenatal"],
    },
    ChapterDef {
        id: "XVI",
        title: "Certain conditions originating in the perinatal period",
        range: "P00-P96",
        keywords: &["newborn", "neonatal", "perinatal", "birth", "premature"],
    },
    ChapterDef {
        id: "XVII",
        title: "Congenital malformations, deformations and chromosomal abnormalities",
        range: "Q00-Q99",
        keywords: &["congenital", "birth defect", "chromosomal", "malformation", "genetic", "syndrome"],
    },
    ChapterDef {
        id: "XVIII",
        title: "Symptoms, signs and abnormal clinical and laboratory findings",
        range: "R00-R99",
        keywords: &["symptom", "abnormal", "finding", "pain", "fever", "fatigue", "dizziness", "weakness"],
    },
    ChapterDef {
        id: "XIX",
        title: "Injury, poisoning and certain other consequences of external causes",
        range: "S00-T88",
        keywords: &["injury", "fracture", "trauma", "poisoning", "burn", "wound", "laceration", "accident", "fall"],
    },
    ChapterDef {
        id: "XX",
        title: "External causes of morbidity",
        range: "V00-Y99",
        keywords: &["accident", "fall", "collision", "assault", "suicide", "external cause"],
    },
    ChapterDef {
        id: "XXI",
        title: "Factors influencing health status and contact with health services",
        range: "Z00-Z99",
        keywords: &["screening", "examination", "history of", "follow-up", "counseling", "vaccination", "prophylactic"],
    },
    ChapterDef {
        id: "XXII",
        title: "Codes for special purposes",
        range: "U00-U85",
        keywords: &[],
    },
];

fn by_id(id: &str) -> Option<&'static ChapterDef> {
    CHAPTERS.iter().find(|c| c.id == id)
}

/// Chapter a code belongs to, by leading letter (and numeric block for D and H).
pub fn chapter_for_code(code: &str) -> Option<&'static ChapterDef> {
    let bare = remove_dots(code.trim()).to_uppercase();
    let mut chars = bare.chars();
    let letter = chars.next()?;
    let block = || bare.get(1..3).and_then(|s| s.parse::<u32>().ok());
    let id = match letter {
        'A' | 'B' => "I",
        'C' => "II",
        'D' => match block()? {
            0..=49 => "II",
            50..=89 => "III",
            _ => return None,
        },
        'E' => "IV",
        'F' => "V",
        'G' => "VI",
        'H' => match block()? {
            0..=59 => "VII",
            60..=95 => "VIII",
            _ => return None,
        },
        'I' => "IX",
        'J' => "X",
        'K' => "XI",
        'L' => "XII",
        'M' => "XIII",
        'N' => "XIV",
        'O' => "XV",
        'P' => "XVI",
        'Q' => "XVII",
        'R' => "XVIII",
        'S' | 'T' => "XIX",
        'V' | 'W' | 'X' | 'Y' => "XX",
        'Z' => "XXI",
        'U' => "XXII",
        _ => return None,
    };
    by_id(id)
}

/// Match a free-form chapter label against a definition: accepts the bare id
/// (`IV`), the display name, or the title alone, case-insensitively.
pub fn label_matches(def: &ChapterDef, label: &str) -> bool {
    let label = label.trim();
    label.eq_ignore_ascii_case(def.id)
        || label.eq_ignore_ascii_case(&def.display_name())
        || label.eq_ignore_ascii_case(def.title)
}
