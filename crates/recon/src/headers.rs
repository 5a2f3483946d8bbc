use std::collections::HashMap;

use crate::model::RowField;

/// Accepted header labels per canonical field.
pub const HEADER_SYNONYMS: &[(RowField, &[&str])] = &[
    (RowField::Published, &["published", "date", "published date"]),
    (RowField::Outlet, &["source", "outlet", "outlet name", "publisher"]),
    (RowField::Title, &["headline", "title"]),
    (RowField::Readership, &["potential audience", "readership", "reach"]),
    (RowField::AdEq, &["adeq", "advertising value equivalency", "ad value"]),
    (RowField::Base, &["location", "country", "region", "base"]),
    (RowField::Url, &["url", "link", "article url"]),
];

/// Normalize a header label: trim, lowercase, collapse whitespace runs.
pub fn norm(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Normalized label → field lookup.
#[derive(Debug, Clone)]
pub struct SynonymTable {
    index: HashMap<String, RowField>,
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::new(HEADER_SYNONYMS.iter().map(|(field, labels)| (*field, labels.iter().copied())))
    }
}

impl SynonymTable {
    pub fn new<'a, L>(entries: impl IntoIterator<Item = (RowField, L)>) -> Self
    where
        L: IntoIterator<Item = &'a str>,
    {
        let mut index = HashMap::new();
        for (field, labels) in entries {
            for label in labels {
                index.insert(norm(label), field);
            }
        }
        Self { index }
    }

    /// Exact match after normalization; no partial matching.
    pub fn lookup(&self, label: &str) -> Option<RowField> {
        self.index.get(&norm(label)).copied()
    }
}

/// How a header row maps onto canonical fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderResolution {
    /// Field per column index
    pub by_index: Vec<Option<RowField>>,
    /// Raw label → field, in column order
    pub by_label: Vec<(String, Option<RowField>)>,
    /// Raw labels with no match, in column order
    pub unmapped: Vec<String>,
}

impl HeaderResolution {
    /// First column mapped to `field`
    pub fn column_of(&self, field: RowField) -> Option<usize> {
        self.by_index.iter().position(|f| *f == Some(field))
    }

    pub fn field_at(&self, col: usize) -> Option<RowField> {
        self.by_index.get(col).copied().flatten()
    }

    pub fn mapped_count(&self) -> usize {
        self.by_index.iter().filter(|f| f.is_some()).count()
    }
}

/// Resolve raw header labels against the synonym table.
pub fn resolve_headers<S: AsRef<str>>(table: &SynonymTable, labels: &[S]) -> HeaderResolution {
    let mut resolution = HeaderResolution::default();
    for raw in labels {
        let raw = raw.as_ref();
        let field = table.lookup(raw);
        resolution.by_index.push(field);
        resolution.by_label.push((raw.to_string(), field));
        if field.is_none() {
            resolution.unmapped.push(raw.to_string());
        }
    }
    resolution
}
