use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::model::{CanonicalRow, Field, RedCell, StyleWarnings};
use crate::url_key::canonicalize;

/// Reconciled rows plus the cells the report should flag.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub rows: Vec<CanonicalRow>,
    pub style_warnings: StyleWarnings,
    /// Secondary rows folded into an existing row
    pub merged: usize,
    /// Secondary rows added as new rows
    pub appended: usize,
}

/// Merge secondary rows into primary rows by canonical URL, sort, and derive
/// style warnings. `invalid_date_urls` holds trimmed URLs whose rows should
/// be flagged as a whole.
pub fn merge(
    primary: Vec<CanonicalRow>,
    secondary: Vec<CanonicalRow>,
    invalid_date_urls: &BTreeSet<String>,
) -> MergeOutcome {
    let mut rows = primary;
    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        if let Some(key) = row.url.as_deref().and_then(canonicalize) {
            index.insert(key, i);
        }
    }

    let (mut merged, mut appended) = (0, 0);
    for incoming in secondary {
        let Some(key) = incoming.url.as_deref().and_then(canonicalize) else {
            rows.push(incoming);
            appended += 1;
            continue;
        };
        match index.get(&key) {
            Some(&existing) => {
                merge_into(&mut rows[existing], incoming);
                merged += 1;
            }
            None => {
                index.insert(key, rows.len());
                rows.push(incoming);
                appended += 1;
            }
        }
    }

    sort_rows(&mut rows);
    let style_warnings = derive_style_warnings(&rows, invalid_date_urls);
    log::info!(
        "merge: {} rows ({} merged, {} appended), {} flagged cells, {} flagged rows",
        rows.len(),
        merged,
        appended,
        style_warnings.red_cells.len(),
        style_warnings.red_rows.len()
    );
    MergeOutcome { rows, style_warnings, merged, appended }
}

/// Fold `incoming` into `existing` for rows sharing a canonical URL.
pub fn merge_into(existing: &mut CanonicalRow, incoming: CanonicalRow) {
    existing.readership = match (&existing.readership, &incoming.readership) {
        (Field::Unresolved, Field::Unresolved) => Field::Unresolved,
        (a, b) => Field::Resolved(
            a.resolved().copied().unwrap_or(0).max(b.resolved().copied().unwrap_or(0)),
        ),
    };

    let keep_ad_eq = matches!(existing.ad_eq, Field::Resolved(v) if v != 0);
    if !keep_ad_eq && incoming.ad_eq.is_resolved() {
        existing.ad_eq = incoming.ad_eq;
    }

    fill_unresolved(&mut existing.published, incoming.published);
    fill_unresolved(&mut existing.outlet, incoming.outlet);
    fill_unresolved(&mut existing.title, incoming.title);
    fill_unresolved(&mut existing.base, incoming.base);

    if existing.url.is_none() {
        existing.url = incoming.url;
    }
}

fn fill_unresolved<T>(slot: &mut Field<T>, incoming: Field<T>) {
    if !slot.is_resolved() && incoming.is_resolved() {
        *slot = incoming;
    }
}

/// Newest first, undated rows last, then outlet A→Z ignoring case. Stable.
pub fn compare_rows(a: &CanonicalRow, b: &CanonicalRow) -> Ordering {
    let by_date = match (a.published.resolved(), b.published.resolved()) {
        (Some(da), Some(db)) => db.cmp(da),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date.then_with(|| a.outlet_sort_key().cmp(&b.outlet_sort_key()))
}

pub fn sort_rows(rows: &mut [CanonicalRow]) {
    rows.sort_by(compare_rows);
}

/// Stable sort returning `new_index[old] = new`, for remapping warnings.
pub fn sort_rows_with_permutation(rows: &mut Vec<CanonicalRow>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| compare_rows(&rows[a], &rows[b]));
    let mut new_index = vec![0; rows.len()];
    for (new, &old) in order.iter().enumerate() {
        new_index[old] = new;
    }
    let mut taken: Vec<Option<CanonicalRow>> = std::mem::take(rows).into_iter().map(Some).collect();
    *rows = order.iter().filter_map(|&old| taken[old].take()).collect();
    new_index
}

/// Flag every placeholder cell, and whole rows whose URL lost its date.
pub fn derive_style_warnings(rows: &[CanonicalRow], invalid_date_urls: &BTreeSet<String>) -> StyleWarnings {
    let mut warnings = StyleWarnings::default();
    for (i, row) in rows.iter().enumerate() {
        for field in row.unresolved_fields() {
            warnings.red_cells.push(RedCell { row: i, col: field.report_column() });
        }
        if row.url.as_deref().is_some_and(|u| invalid_date_urls.contains(u.trim())) {
            warnings.red_rows.push(i);
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> Field<NaiveDate> {
        Field::Resolved(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn full_row(url: &str, outlet: &str, readership: i64, ad_eq: i64) -> CanonicalRow {
        CanonicalRow {
            published: date(2025, 1, 2),
            outlet: Field::text(outlet),
            title: Field::text("Big Launch"),
            readership: Field::Resolved(readership),
            ad_eq: Field::Resolved(ad_eq),
            base: Field::text("USA"),
            url: Some(url.to_string()),
        }
    }

    fn sparse_row(url: &str, readership: i64) -> CanonicalRow {
        CanonicalRow {
            readership: Field::Resolved(readership),
            url: Some(url.to_string()),
            ..CanonicalRow::default()
        }
    }

    #[test]
    fn primary_and_secondary_collapse_to_one_row() {
        let primary = vec![full_row("http://example.com/a", "Example Times", 100, 30)];
        let secondary = vec![sparse_row("https://www.example.com/a/", 150)];
        let out = merge(primary.clone(), secondary, &BTreeSet::new());
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.merged, 1);
        let row = &out.rows[0];
        assert_eq!(row.readership, Field::Resolved(150));
        assert_eq!(row.ad_eq, Field::Resolved(30));
        assert_eq!(row.outlet, primary[0].outlet);
        assert_eq!(row.title, primary[0].title);
        assert_eq!(row.base, primary[0].base);
        assert_eq!(row.published, primary[0].published);
        assert_eq!(row.url.as_deref(), Some("http://example.com/a"));
        assert!(out.style_warnings.is_empty());
    }

    #[test]
    fn readership_max_regardless_of_side() {
        let a = merge(
            vec![sparse_row("https://x.com/1", 100)],
            vec![sparse_row("x.com/1", 150)],
            &BTreeSet::new(),
        );
        let b = merge(
            vec![sparse_row("https://x.com/1", 150)],
            vec![sparse_row("x.com/1", 100)],
            &BTreeSet::new(),
        );
        assert_eq!(a.rows[0].readership, Field::Resolved(150));
        assert_eq!(b.rows[0].readership, Field::Resolved(150));
    }

    #[test]
    fn unresolved_readership_counts_as_zero() {
        let mut existing = sparse_row("https://x.com/1", 0);
        existing.readership = Field::Unresolved;
        merge_into(&mut existing, sparse_row("https://x.com/1", 40));
        assert_eq!(existing.readership, Field::Resolved(40));

        let mut both = CanonicalRow::default();
        merge_into(&mut both, CanonicalRow::default());
        assert_eq!(both.readership, Field::Unresolved);
    }

    #[test]
    fn ad_eq_taken_from_incoming_only_when_existing_is_zero_or_missing() {
        let mut zero = full_row("https://x.com/1", "X", 10, 0);
        merge_into(&mut zero, full_row("https://x.com/1", "X", 10, 7));
        assert_eq!(zero.ad_eq, Field::Resolved(7));

        let mut missing = sparse_row("https://x.com/1", 10);
        merge_into(&mut missing, full_row("https://x.com/1", "X", 10, 9));
        assert_eq!(missing.ad_eq, Field::Resolved(9));

        let mut kept = full_row("https://x.com/1", "X", 10, 5);
        merge_into(&mut kept, full_row("https://x.com/1", "X", 10, 9));
        assert_eq!(kept.ad_eq, Field::Resolved(5));
    }

    #[test]
    fn placeholders_filled_but_values_never_overwritten() {
        let mut existing = sparse_row("https://x.com/1", 10);
        existing.outlet = Field::text("Original");
        let mut incoming = full_row("https://x.com/1", "Other", 10, 3);
        incoming.title = Field::text("Filled Title");
        merge_into(&mut existing, incoming);
        assert_eq!(existing.outlet, Field::text("Original"));
        assert_eq!(existing.title, Field::text("Filled Title"));
        assert_eq!(existing.base, Field::text("USA"));
        assert_eq!(existing.published, date(2025, 1, 2));
    }

    #[test]
    fn url_adopted_when_missing() {
        let mut existing = CanonicalRow::default();
        merge_into(&mut existing, sparse_row("https://x.com/1", 1));
        assert_eq!(existing.url.as_deref(), Some("https://x.com/1"));
    }

    #[test]
    fn rows_without_key_are_appended() {
        let mut no_url = full_row("", "Z", 1, 1);
        no_url.url = None;
        let out = merge(vec![no_url.clone()], vec![no_url], &BTreeSet::new());
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.appended, 1);
    }

    #[test]
    fn sort_by_date_desc_then_outlet() {
        let mut older = full_row("https://x.com/1", "beta", 1, 1);
        older.published = date(2025, 1, 15);
        let mut newer = full_row("https://x.com/2", "Zeta", 1, 1);
        newer.published = date(2025, 2, 1);
        let mut undated = full_row("https://x.com/3", "Alpha", 1, 1);
        undated.published = Field::Unresolved;
        let mut same_day = full_row("https://x.com/4", "Alpha", 1, 1);
        same_day.published = date(2025, 1, 15);

        let out = merge(vec![undated, older, newer, same_day], vec![], &BTreeSet::new());
        let outlets: Vec<&str> = out.rows.iter().map(|r| r.outlet.display()).collect();
        assert_eq!(outlets, vec!["Zeta", "Alpha", "beta", "Alpha"]);
        assert_eq!(out.rows[3].published, Field::Unresolved);
    }

    #[test]
    fn style_warnings_use_report_columns() {
        let mut partial = sparse_row("https://x.com/1", 10);
        partial.outlet = Field::text("Wire");
        let invalid: BTreeSet<String> = ["https://x.com/1".to_string()].into();
        let out = merge(vec![], vec![partial], &invalid);
        let cols: Vec<usize> = out.style_warnings.red_cells.iter().map(|c| c.col).collect();
        // published, title, adEq, base
        assert_eq!(cols, vec![1, 3, 5, 6]);
        assert_eq!(out.style_warnings.red_rows, vec![0]);
    }

    #[test]
    fn permutation_matches_sort() {
        let mut a = full_row("https://x.com/1", "A", 1, 1);
        a.published = date(2024, 1, 1);
        let b = full_row("https://x.com/2", "B", 1, 1);
        let mut rows = vec![a.clone(), b.clone()];
        let new_index = sort_rows_with_permutation(&mut rows);
        assert_eq!(new_index, vec![1, 0]);
        assert_eq!(rows, vec![b, a]);
    }
}
