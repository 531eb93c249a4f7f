//! Known passenger fields and column-name normalisation
//!
//! Every lookup of a source column goes through [`Field`] so the set of
//! columns the pipeline understands is fixed at compile time. Engineered
//! columns (indicators, family size, title) are listed in [`engineered`].

use std::collections::HashMap;

/// How a known field is used by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// The binary outcome
    Label,
    /// Numeric measurement or count
    Numeric,
    /// Small set of categorical levels
    Nominal,
    /// Free text, only used through derived features
    FreeText,
}

/// Source columns the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Survived,
    Pclass,
    Sex,
    Age,
    SibSp,
    Parch,
    Fare,
    Embarked,
    Name,
    Cabin,
    Ticket,
    Boat,
    HomeDest,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::Survived,
        Field::Pclass,
        Field::Sex,
        Field::Age,
        Field::SibSp,
        Field::Parch,
        Field::Fare,
        Field::Embarked,
        Field::Name,
        Field::Cabin,
        Field::Ticket,
        Field::Boat,
        Field::HomeDest,
    ];

    /// Canonical (normalized) column name.
    pub fn name(self) -> &'static str {
        match self {
            Field::Survived => "survived",
            Field::Pclass => "pclass",
            Field::Sex => "sex",
            Field::Age => "age",
            Field::SibSp => "sibsp",
            Field::Parch => "parch",
            Field::Fare => "fare",
            Field::Embarked => "embarked",
            Field::Name => "name",
            Field::Cabin => "cabin",
            Field::Ticket => "ticket",
            Field::Boat => "boat",
            Field::HomeDest => "home_dest",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Survived => FieldKind::Label,
            Field::Pclass | Field::Age | Field::SibSp | Field::Parch | Field::Fare => {
                FieldKind::Numeric
            }
            Field::Sex | Field::Embarked => FieldKind::Nominal,
            Field::Name | Field::Cabin | Field::Ticket | Field::Boat | Field::HomeDest => {
                FieldKind::FreeText
            }
        }
    }

    /// Alternative spellings renamed to the canonical name before cleaning.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::HomeDest => &["home.dest"],
            _ => &[],
        }
    }

    /// Name of the presence indicator derived from this field.
    pub fn indicator_name(self) -> String {
        format!("has_{}", self.name())
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.name() == name)
    }
}

/// Names of the columns produced by the cleaner.
pub mod engineered {
    pub const FAMILY_SIZE: &str = "family_size";
    pub const IS_ALONE: &str = "is_alone";
    pub const TITLE: &str = "title";
    /// Bucket for titles seen fewer than [`RARE_TITLE_MIN_COUNT`] times
    pub const RARE_TITLE: &str = "Rare";
    pub const RARE_TITLE_MIN_COUNT: usize = 10;
}

/// Normalize a raw header: lower-case, with whitespace, `-`, `/` and `_`
/// runs collapsed to a single underscore. Dots are kept.
///
/// Returns an empty string when nothing but separators remain; callers
/// substitute a positional name.
pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '/' || c == '_')
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Normalize a full header row, filling blanks and de-duplicating.
///
/// Blank names become `unnamed_<position>`; repeated names get a `_<n>`
/// suffix (n starting at 2) in order of appearance.
pub fn normalize_header<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(names.len());

    for (idx, raw) in names.iter().enumerate() {
        let mut name = normalize_column_name(raw.as_ref());
        if name.is_empty() {
            name = format!("unnamed_{}", idx);
        }

        let count = seen.entry(name.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            let mut n = *count;
            let mut candidate = format!("{}_{}", name, n);
            while seen.contains_key(&candidate) {
                n += 1;
                candidate = format!("{}_{}", name, n);
            }
            seen.insert(candidate.clone(), 1);
            name = candidate;
        }
        out.push(name);
    }

    out
}
