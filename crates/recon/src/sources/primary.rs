//! Delimited-text source: header row first, arbitrary column order.

use chrono::NaiveDate;

use crate::error::ReconError;
use crate::headers::{resolve_headers, SynonymTable};
use crate::model::{CanonicalRow, ExtractIssue, Field, PrimaryExtract, RowField};
use crate::normalize::{parse_flexible_date, parse_number, round_whole};
use crate::table::{is_blank_row, parse_table};

/// Row under construction. `None` means the column never supplied the field;
/// `Some(Field::Unresolved)` means it did, but the value was a placeholder.
#[derive(Default)]
struct Draft {
    published: Option<Field<NaiveDate>>,
    outlet: Option<String>,
    title: Option<String>,
    readership: Option<i64>,
    ad_eq: Option<i64>,
    base: Option<String>,
    url: Option<String>,
}

impl Draft {
    fn is_set(&self, field: RowField) -> bool {
        match field {
            RowField::Published => self.published.is_some(),
            RowField::Outlet => self.outlet.is_some(),
            RowField::Title => self.title.is_some(),
            RowField::Readership => self.readership.is_some(),
            RowField::AdEq => self.ad_eq.is_some(),
            RowField::Base => self.base.is_some(),
            RowField::Url => self.url.is_some(),
        }
    }

    fn into_row(self) -> CanonicalRow {
        CanonicalRow {
            published: self.published.unwrap_or(Field::Unresolved),
            outlet: self.outlet.into(),
            title: self.title.into(),
            readership: self.readership.into(),
            ad_eq: self.ad_eq.into(),
            base: self.base.into(),
            url: self.url,
        }
    }
}

/// Extract canonical rows from delimited text.
///
/// Rows missing any required field are dropped with a
/// "Missing required fields" issue; kept rows stay in source order.
pub fn extract_primary(text: &str, synonyms: &SynonymTable) -> Result<PrimaryExtract, ReconError> {
    let matrix = parse_table(text);
    let Some(header_row) = matrix.iter().find(|r| !is_blank_row(r)) else {
        return Err(ReconError::EmptyPrimary);
    };
    let header_index = matrix.iter().position(|r| !is_blank_row(r)).unwrap_or(0);
    let headers = resolve_headers(synonyms, header_row);
    if !headers.unmapped.is_empty() {
        log::debug!("primary: unmapped headers {:?}", headers.unmapped);
    }

    let mut out = PrimaryExtract {
        unmapped_headers: headers.unmapped.clone(),
        header_map: headers.by_label.clone(),
        ..PrimaryExtract::default()
    };
    let mut dropped = 0usize;

    for (index, cells) in matrix.iter().enumerate().skip(header_index + 1) {
        if is_blank_row(cells) {
            continue;
        }
        let row_number = index + 1;
        let mut draft = Draft::default();

        for (col, raw) in cells.iter().enumerate() {
            let Some(field) = headers.field_at(col) else {
                continue;
            };
            let value = raw.trim();
            match field {
                RowField::Readership | RowField::AdEq => {
                    // Blank is reported once, as a missing field
                    if value.is_empty() {
                        continue;
                    }
                    match parse_number(value) {
                        Some(n) if field == RowField::Readership => draft.readership = Some(round_whole(n)),
                        Some(n) => draft.ad_eq = Some(round_whole(n)),
                        None => out.issues.push(
                            ExtractIssue::for_field(row_number, field, format!("Invalid {field} number"))
                                .with_raw(value),
                        ),
                    }
                }
                RowField::Published => {
                    let parsed = parse_flexible_date(value);
                    if parsed.is_none() {
                        out.issues.push(
                            ExtractIssue::for_field(row_number, field, "Missing or invalid published date")
                                .with_raw(value),
                        );
                    }
                    draft.published = Some(parsed.into());
                }
                RowField::Outlet => draft.outlet = non_empty(value),
                RowField::Title => draft.title = non_empty(value),
                RowField::Base => draft.base = non_empty(value),
                RowField::Url => draft.url = non_empty(value),
            }
        }

        let missing: Vec<&str> = RowField::REQUIRED
            .iter()
            .filter(|f| !draft.is_set(**f))
            .map(|f| f.name())
            .collect();
        if !missing.is_empty() {
            out.issues.push(ExtractIssue::new(
                row_number,
                format!("Missing required fields: {}", missing.join(", ")),
            ));
            dropped += 1;
            continue;
        }
        out.rows.push(draft.into_row());
    }

    log::info!(
        "primary: {} rows kept, {} dropped, {} issues",
        out.rows.len(),
        dropped,
        out.issues.len()
    );
    Ok(out)
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> PrimaryExtract {
        extract_primary(text, &SynonymTable::default()).unwrap()
    }

    const HEADER: &str = "Date,Source,Headline,Potential Audience,AdEq,Country,URL,Sentiment\n";

    #[test]
    fn extracts_rows_in_source_order() {
        let text = format!(
            "{HEADER}\
             2025-01-02,Example Times,Big Launch,100,$30,USA,http://example.com/a,Positive\n\
             15/01/2025,Daily Wire,\"Second, story\",\"1,250\",400,UK,https://wire.example/b,Neutral\n"
        );
        let out = extract(&text);
        assert!(out.issues.is_empty(), "{:?}", out.issues);
        assert_eq!(out.rows.len(), 2);
        let first = &out.rows[0];
        assert_eq!(first.published, Field::Resolved(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()));
        assert_eq!(first.outlet, Field::Resolved("Example Times".into()));
        assert_eq!(first.ad_eq, Field::Resolved(30));
        assert_eq!(first.url.as_deref(), Some("http://example.com/a"));
        assert_eq!(out.rows[1].title, Field::Resolved("Second, story".into()));
        assert_eq!(out.rows[1].readership, Field::Resolved(1250));
        assert_eq!(out.unmapped_headers, vec!["Sentiment"]);
        assert_eq!(out.header_map[1], ("Source".to_string(), Some(RowField::Outlet)));
    }

    #[test]
    fn blank_readership_drops_row_with_one_issue() {
        let text = format!("{HEADER}2025-01-02,Example Times,Big Launch,,30,USA,http://example.com/a,\n");
        let out = extract(&text);
        assert!(out.rows.is_empty());
        assert_eq!(out.issues.len(), 1);
        assert_eq!(out.issues[0].row, 2);
        assert_eq!(out.issues[0].message, "Missing required fields: readership");
    }

    #[test]
    fn invalid_number_is_recorded_and_row_dropped() {
        let text = format!("{HEADER}2025-01-02,Example Times,Big Launch,lots,30,USA,http://example.com/a,\n");
        let out = extract(&text);
        assert!(out.rows.is_empty());
        assert_eq!(out.issues.len(), 2);
        assert_eq!(out.issues[0].field.as_deref(), Some("readership"));
        assert_eq!(out.issues[0].raw_value.as_deref(), Some("lots"));
        assert_eq!(out.issues[1].message, "Missing required fields: readership");
    }

    #[test]
    fn invalid_date_keeps_row_with_placeholder() {
        let text = format!("{HEADER}someday,Example Times,Big Launch,100,30,USA,http://example.com/a,\n");
        let out = extract(&text);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].published, Field::Unresolved);
        assert_eq!(out.issues.len(), 1);
        assert_eq!(out.issues[0].message, "Missing or invalid published date");
    }

    #[test]
    fn missing_columns_are_named() {
        let out = extract("Headline,URL\nLaunch,http://a.com\n");
        assert_eq!(
            out.issues[0].message,
            "Missing required fields: published, outlet, readership, adEq, base"
        );
    }

    #[test]
    fn blank_lines_keep_row_numbers() {
        let text = format!(
            "{HEADER}\n2025-01-02,Example Times,Big Launch,,30,USA,http://example.com/a,\n"
        );
        let out = extract(&text);
        assert_eq!(out.issues[0].row, 3);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(
            extract_primary("", &SynonymTable::default()),
            Err(ReconError::EmptyPrimary)
        ));
        assert!(matches!(
            extract_primary("\n \n", &SynonymTable::default()),
            Err(ReconError::EmptyPrimary)
        ));
    }

    #[test]
    fn semicolon_export() {
        let text = "Date;Source;Headline;Reach;AdEq;Region;Link\n\
                    2025-03-01;Wire;Story;10;3;EU;https://w.example/s\n";
        let out = extract(text);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].base, Field::Resolved("EU".into()));
    }
}
