//! Package-level layout reader for xlsx files.
//!
//! calamine gives us values and formulas. Everything a report template
//! depends on beyond that (cell styles, column widths, row heights, merged
//! ranges and hyperlink targets) lives in the raw package XML, which is read
//! here with zip + quick-xml.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::str::FromStr;

use clipsheet_engine::cell::{
    Alignment, BorderStyle, CellBorder, CellFormat, NumberFormat, TextOverflow,
    VerticalAlignment,
};
use clipsheet_engine::sheet::parse_cell_ref;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

// =============================================================================
// Public types
// =============================================================================

/// cellXfs index → resolved CellFormat
#[derive(Debug, Default)]
pub struct StyleTable {
    pub styles: Vec<CellFormat>,
}

impl StyleTable {
    pub fn get(&self, id: usize) -> Option<&CellFormat> {
        self.styles.get(id)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

/// Layout data for one worksheet, 0-based coordinates.
#[derive(Debug, Default)]
pub struct SheetLayout {
    /// (row, col, style_id) for every cell with a non-default style
    pub cell_styles: Vec<(usize, usize, usize)>,
    /// Column widths in Excel character units
    pub col_widths: HashMap<usize, f64>,
    /// Row heights in points
    pub row_heights: HashMap<usize, f64>,
    /// (start_row, start_col, end_row, end_col)
    pub merged_regions: Vec<(usize, usize, usize, usize)>,
    /// (row, col, target). Internal links are stored as `#Sheet!A1`.
    pub hyperlinks: Vec<(usize, usize, String)>,
}

/// Everything read from the package, one `SheetLayout` per requested sheet.
#[derive(Debug, Default)]
pub struct PackageLayout {
    pub styles: StyleTable,
    pub sheets: Vec<SheetLayout>,
    /// Features seen but only approximated (theme tints, gradients)
    pub approximations: Vec<String>,
}

/// True if the bytes look like a zip package (xlsx), as opposed to legacy xls.
pub fn is_zip_package(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04")
}

// =============================================================================
// Top-level entry point
// =============================================================================

/// Read styles and per-sheet layout from xlsx bytes.
/// `sheet_names` is the workbook order reported by calamine; the result has
/// one entry per name, empty where a worksheet part cannot be resolved.
pub fn read_package_layout(bytes: &[u8], sheet_names: &[String]) -> Result<PackageLayout, String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| format!("not a zip package: {e}"))?;

    let mut layout = PackageLayout::default();
    if let Some(xml) = read_zip_text(&mut archive, "xl/styles.xml") {
        let (styles, approximations) = parse_styles_xml(&xml);
        layout.styles = styles;
        layout.approximations = approximations;
    }

    let workbook_xml = read_zip_text(&mut archive, "xl/workbook.xml").unwrap_or_default();
    let workbook_rels = read_zip_text(&mut archive, "xl/_rels/workbook.xml.rels").unwrap_or_default();
    let part_by_rid = parse_relationships(&workbook_rels);
    let rid_by_name = parse_workbook_sheets(&workbook_xml);

    for name in sheet_names {
        let part = rid_by_name
            .get(name)
            .and_then(|rid| part_by_rid.get(rid))
            .map(|target| resolve_part_path("xl", target));

        let Some(part) = part else {
            layout.sheets.push(SheetLayout::default());
            continue;
        };
        let Some(xml) = read_zip_text(&mut archive, &part) else {
            layout.sheets.push(SheetLayout::default());
            continue;
        };

        let mut sheet = parse_sheet_layout(&xml);
        if !sheet.hyperlinks.is_empty() {
            let rels = read_zip_text(&mut archive, &sheet_rels_path(&part)).unwrap_or_default();
            resolve_hyperlink_targets(&mut sheet.hyperlinks, &parse_relationships(&rels));
        }
        layout.sheets.push(sheet);
    }

    Ok(layout)
}

// =============================================================================
// styles.xml
// =============================================================================

#[derive(Debug, Clone, Default)]
struct FontEntry {
    bold: bool,
    italic: bool,
    underline: bool,
    strikethrough: bool,
    size: Option<f32>,
    color: Option<[u8; 4]>,
    family: Option<String>,
}

#[derive(Debug, Default)]
struct XfEntry {
    num_fmt_id: Option<u16>,
    font_id: Option<usize>,
    fill_id: Option<usize>,
    border_id: Option<usize>,
    h_align: Option<String>,
    v_align: Option<String>,
    wrap_text: bool,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    NumFmts,
    Fonts,
    Fills,
    Borders,
    CellXfs,
    Other,
}

/// Parse styles.xml in a single pass. Returns the resolved style table and
/// the list of approximated features.
pub fn parse_styles_xml(xml: &str) -> (StyleTable, Vec<String>) {
    let mut approximations = Vec::new();
    let mut num_fmts: HashMap<u16, String> = HashMap::new();
    let mut fonts: Vec<FontEntry> = Vec::new();
    let mut fills: Vec<Option<[u8; 4]>> = Vec::new();
    let mut borders: Vec<[CellBorder; 4]> = Vec::new();
    let mut xfs: Vec<XfEntry> = Vec::new();

    let mut section = Section::None;
    let mut font = FontEntry::default();
    let mut fill: Option<[u8; 4]> = None;
    let mut in_pattern = false;
    let mut border = [CellBorder::default(); 4];
    let mut side: Option<usize> = None;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let event = match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) | Err(_) => break,
            Ok(ev) => ev,
        };
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                match (section, e.name().as_ref()) {
                    (Section::None, b"numFmts") if !empty => section = Section::NumFmts,
                    (Section::None, b"fonts") if !empty => section = Section::Fonts,
                    (Section::None, b"fills") if !empty => section = Section::Fills,
                    (Section::None, b"borders") if !empty => section = Section::Borders,
                    (Section::None, b"cellXfs") if !empty => section = Section::CellXfs,
                    (Section::None, b"cellStyleXfs" | b"dxfs" | b"cellStyles") if !empty => {
                        section = Section::Other
                    }

                    (Section::NumFmts, b"numFmt") => {
                        if let (Some(id), Some(code)) = (attr_parse(e, b"numFmtId"), attr_string(e, b"formatCode")) {
                            num_fmts.insert(id, code);
                        }
                    }

                    (Section::Fonts, b"font") => {
                        font = FontEntry::default();
                        if empty {
                            fonts.push(font.clone());
                        }
                    }
                    (Section::Fonts, b"b") => font.bold = flag_attr(e),
                    (Section::Fonts, b"i") => font.italic = flag_attr(e),
                    (Section::Fonts, b"strike") => font.strikethrough = flag_attr(e),
                    (Section::Fonts, b"u") => {
                        font.underline = attr_string(e, b"val").map_or(true, |v| v != "none")
                    }
                    (Section::Fonts, b"sz") => font.size = attr_parse(e, b"val"),
                    (Section::Fonts, b"name") => font.family = attr_string(e, b"val"),
                    (Section::Fonts, b"color") => font.color = parse_color(e, &mut approximations),

                    (Section::Fills, b"fill") => {
                        fill = None;
                        if empty {
                            fills.push(None);
                        }
                    }
                    (Section::Fills, b"patternFill") => {
                        in_pattern = !empty;
                        if attr_string(e, b"patternType").as_deref() == Some("none") {
                            in_pattern = false;
                        }
                    }
                    (Section::Fills, b"gradientFill") => note(&mut approximations, "gradient fills"),
                    (Section::Fills, b"fgColor") if in_pattern => fill = parse_color(e, &mut approximations),

                    (Section::Borders, b"border") => {
                        border = [CellBorder::default(); 4];
                        if empty {
                            borders.push(border);
                        }
                    }
                    (Section::Borders, b"top" | b"right" | b"bottom" | b"left") => {
                        let idx = match e.name().as_ref() {
                            b"top" => 0,
                            b"right" => 1,
                            b"bottom" => 2,
                            _ => 3,
                        };
                        border[idx].style = attr_string(e, b"style")
                            .map(|s| parse_border_style(&s))
                            .unwrap_or_default();
                        side = if empty { None } else { Some(idx) };
                    }
                    (Section::Borders, b"color") => {
                        if let Some(idx) = side {
                            border[idx].color = parse_color(e, &mut approximations);
                        }
                    }

                    (Section::CellXfs, b"xf") => {
                        xfs.push(XfEntry {
                            num_fmt_id: attr_parse(e, b"numFmtId"),
                            font_id: attr_parse(e, b"fontId"),
                            fill_id: attr_parse(e, b"fillId"),
                            border_id: attr_parse(e, b"borderId"),
                            ..XfEntry::default()
                        });
                    }
                    (Section::CellXfs, b"alignment") => {
                        if let Some(xf) = xfs.last_mut() {
                            xf.h_align = attr_string(e, b"horizontal");
                            xf.v_align = attr_string(e, b"vertical");
                            xf.wrap_text = attr_string(e, b"wrapText")
                                .is_some_and(|v| v == "1" || v == "true");
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => match (section, e.name().as_ref()) {
                (Section::NumFmts, b"numFmts")
                | (Section::Fonts, b"fonts")
                | (Section::Fills, b"fills")
                | (Section::Borders, b"borders")
                | (Section::CellXfs, b"cellXfs")
                | (Section::Other, b"cellStyleXfs" | b"dxfs" | b"cellStyles") => section = Section::None,
                (Section::Fonts, b"font") => fonts.push(font.clone()),
                (Section::Fills, b"patternFill") => in_pattern = false,
                (Section::Fills, b"fill") => fills.push(fill),
                (Section::Borders, b"top" | b"right" | b"bottom" | b"left") => side = None,
                (Section::Borders, b"border") => borders.push(border),
                _ => {}
            },
            _ => {}
        }
    }

    let styles = xfs
        .iter()
        .map(|xf| resolve_xf(xf, &num_fmts, &fonts, &fills, &borders))
        .collect();
    (StyleTable { styles }, approximations)
}

fn resolve_xf(
    xf: &XfEntry,
    num_fmts: &HashMap<u16, String>,
    fonts: &[FontEntry],
    fills: &[Option<[u8; 4]>],
    borders: &[[CellBorder; 4]],
) -> CellFormat {
    let mut format = CellFormat::default();

    if let Some(font) = xf.font_id.and_then(|id| fonts.get(id)) {
        format.bold = font.bold;
        format.italic = font.italic;
        format.underline = font.underline;
        format.strikethrough = font.strikethrough;
        format.font_size = font.size;
        format.font_color = font.color;
        format.font_family = font.family.clone();
    }

    if let Some(fill) = xf.fill_id.and_then(|id| fills.get(id)) {
        format.background_color = *fill;
    }

    if let Some([top, right, bottom, left]) = xf.border_id.and_then(|id| borders.get(id)) {
        format.border_top = *top;
        format.border_right = *right;
        format.border_bottom = *bottom;
        format.border_left = *left;
    }

    if let Some(id) = xf.num_fmt_id {
        format.number_format = match num_fmts.get(&id) {
            Some(code) => NumberFormat::from_code(code),
            None => builtin_number_format(id),
        };
    }

    format.alignment = match xf.h_align.as_deref() {
        Some("left") => Alignment::Left,
        Some("center" | "centerContinuous") => Alignment::Center,
        Some("right") => Alignment::Right,
        _ => Alignment::General,
    };
    format.vertical_alignment = match xf.v_align.as_deref() {
        Some("top") => VerticalAlignment::Top,
        Some("center") => VerticalAlignment::Middle,
        _ => VerticalAlignment::Bottom,
    };
    if xf.wrap_text {
        format.text_overflow = TextOverflow::Wrap;
    }

    format
}

/// Built-in numFmtId → format. Ids not listed fall back to General.
fn builtin_number_format(id: u16) -> NumberFormat {
    match id {
        1 => NumberFormat::Number { decimals: 0, thousands: false },
        2 => NumberFormat::Number { decimals: 2, thousands: false },
        3 | 37 | 38 => NumberFormat::thousands(),
        4 | 39 | 40 => NumberFormat::Number { decimals: 2, thousands: true },
        5 | 6 => NumberFormat::Currency { decimals: 0 },
        7 | 8 | 44 => NumberFormat::Currency { decimals: 2 },
        9 => NumberFormat::Percent { decimals: 0 },
        10 => NumberFormat::Percent { decimals: 2 },
        14 => NumberFormat::Date("m/d/yyyy".into()),
        15 => NumberFormat::Date("d-mmm-yy".into()),
        16 => NumberFormat::Date("d-mmm".into()),
        17 => NumberFormat::Date("mmm-yy".into()),
        22 => NumberFormat::Date("m/d/yyyy h:mm".into()),
        _ => NumberFormat::General,
    }
}

fn parse_border_style(s: &str) -> BorderStyle {
    match s {
        "thin" | "hair" => BorderStyle::Thin,
        "medium" | "mediumDashDot" | "mediumDashDotDot" => BorderStyle::Medium,
        "mediumDashed" | "dashed" | "dashDot" | "dashDotDot" | "slantDashDot" => BorderStyle::Dashed,
        "dotted" => BorderStyle::Dotted,
        "double" => BorderStyle::Double,
        "thick" => BorderStyle::Thick,
        _ => BorderStyle::None,
    }
}

// =============================================================================
// Colors
// =============================================================================

/// Legacy indexed palette, entries 0-63 (RGB).
const INDEXED_PALETTE: [[u8; 3]; 64] = [
    [0, 0, 0], [255, 255, 255], [255, 0, 0], [0, 255, 0],
    [0, 0, 255], [255, 255, 0], [255, 0, 255], [0, 255, 255],
    [0, 0, 0], [255, 255, 255], [255, 0, 0], [0, 255, 0],
    [0, 0, 255], [255, 255, 0], [255, 0, 255], [0, 255, 255],
    [128, 0, 0], [0, 128, 0], [0, 0, 128], [128, 128, 0],
    [128, 0, 128], [0, 128, 128], [192, 192, 192], [128, 128, 128],
    [153, 153, 255], [153, 51, 102], [255, 255, 204], [204, 255, 255],
    [102, 0, 102], [255, 128, 128], [0, 102, 204], [204, 204, 255],
    [0, 0, 128], [255, 0, 255], [255, 255, 0], [0, 255, 255],
    [128, 0, 128], [128, 0, 0], [0, 128, 128], [0, 0, 255],
    [0, 204, 255], [204, 255, 255], [204, 255, 204], [255, 255, 153],
    [153, 204, 255], [255, 153, 204], [204, 153, 255], [255, 204, 153],
    [51, 102, 255], [51, 204, 204], [153, 204, 0], [255, 204, 0],
    [255, 153, 0], [255, 102, 0], [102, 102, 153], [150, 150, 150],
    [0, 51, 102], [51, 153, 102], [0, 51, 0], [51, 51, 0],
    [153, 51, 0], [153, 51, 51], [51, 51, 153], [51, 51, 51],
];

/// Office default theme colors, no tint applied.
const THEME_PALETTE: [[u8; 3]; 10] = [
    [255, 255, 255], [0, 0, 0], [231, 230, 230], [68, 84, 106],
    [68, 114, 196], [237, 125, 49], [165, 165, 165], [255, 192, 0],
    [91, 155, 213], [112, 173, 71],
];

fn rgba(rgb: [u8; 3]) -> [u8; 4] {
    [rgb[0], rgb[1], rgb[2], 255]
}

/// Resolve a `<color>`-style element: rgb wins over indexed over theme.
fn parse_color(e: &BytesStart, approximations: &mut Vec<String>) -> Option<[u8; 4]> {
    if let Some(hex) = attr_string(e, b"rgb") {
        return parse_argb_hex(&hex);
    }
    if let Some(idx) = attr_parse::<usize>(e, b"indexed") {
        return match idx {
            0..=63 => Some(rgba(INDEXED_PALETTE[idx])),
            64 => Some([0, 0, 0, 255]),
            65 => Some([255, 255, 255, 255]),
            _ => None,
        };
    }
    if let Some(idx) = attr_parse::<usize>(e, b"theme") {
        let color = THEME_PALETTE.get(idx).copied().map(rgba);
        if color.is_some() && attr_string(e, b"tint").is_some() {
            note(approximations, "theme tints");
        }
        return color;
    }
    None
}

/// `AARRGGBB` or `RRGGBB` → RGBA
fn parse_argb_hex(hex: &str) -> Option<[u8; 4]> {
    let s = hex.trim_start_matches('#');
    let byte = |i: usize| u8::from_str_radix(s.get(i..i + 2)?, 16).ok();
    match s.len() {
        8 => Some([byte(2)?, byte(4)?, byte(6)?, byte(0)?]),
        6 => Some([byte(0)?, byte(2)?, byte(4)?, 255]),
        _ => None,
    }
}

fn note(approximations: &mut Vec<String>, feature: &str) {
    if !approximations.iter().any(|s| s == feature) {
        approximations.push(feature.to_string());
    }
}

// =============================================================================
// Worksheet XML
// =============================================================================

/// Extract style ids, dimensions, merges and hyperlink relationship ids from a
/// worksheet part. Hyperlinks with an `r:id` carry the id until
/// [`resolve_hyperlink_targets`] swaps in the relationship target.
pub fn parse_sheet_layout(xml: &str) -> SheetLayout {
    let mut layout = SheetLayout::default();

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"row" => {
                    let custom = attr_string(e, b"customHeight").is_some_and(|v| v == "1" || v == "true");
                    let row = attr_parse::<usize>(e, b"r").map(|r| r.saturating_sub(1));
                    if let (true, Some(row), Some(ht)) = (custom, row, attr_parse::<f64>(e, b"ht")) {
                        layout.row_heights.insert(row, ht);
                    }
                }
                b"c" => {
                    let style = attr_parse::<usize>(e, b"s").unwrap_or(0);
                    let cell = attr_string(e, b"r").and_then(|r| parse_cell_ref(&r));
                    if let (true, Some((row, col))) = (style > 0, cell) {
                        layout.cell_styles.push((row, col, style));
                    }
                }
                b"col" => {
                    let custom = attr_string(e, b"customWidth").is_some_and(|v| v == "1" || v == "true");
                    let min = attr_parse::<usize>(e, b"min");
                    let max = attr_parse::<usize>(e, b"max");
                    let width = attr_parse::<f64>(e, b"width");
                    if let (true, Some(min), Some(max), Some(w)) = (custom, min, max, width) {
                        // Whole-sheet <col max="16384"> ranges are capped to keep the map small
                        for col in min.saturating_sub(1)..max.min(256) {
                            layout.col_widths.insert(col, w);
                        }
                    }
                }
                b"mergeCell" => {
                    if let Some(region) = attr_string(e, b"ref").and_then(|r| parse_merge_ref(&r)) {
                        layout.merged_regions.push(region);
                    }
                }
                b"hyperlink" => {
                    let anchor = attr_string(e, b"ref")
                        .and_then(|r| parse_cell_ref(r.split(':').next().unwrap_or_default()));
                    let target = attr_string(e, b"r:id")
                        .or_else(|| attr_string(e, b"location").map(|loc| format!("#{loc}")));
                    if let (Some((row, col)), Some(target)) = (anchor, target) {
                        layout.hyperlinks.push((row, col, target));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    layout
}

/// Replace relationship ids with their targets; unresolved ids are dropped.
fn resolve_hyperlink_targets(links: &mut Vec<(usize, usize, String)>, rels: &HashMap<String, String>) {
    links.retain_mut(|(_, _, target)| {
        if target.starts_with('#') {
            return true;
        }
        match rels.get(target.as_str()) {
            Some(resolved) => {
                *target = resolved.clone();
                true
            }
            None => false,
        }
    });
}

/// Parse a merge range reference like "A1:C3" into (start_row, start_col, end_row, end_col).
pub fn parse_merge_ref(r: &str) -> Option<(usize, usize, usize, usize)> {
    let (start, end) = r.split_once(':')?;
    let (sr, sc) = parse_cell_ref(start)?;
    let (er, ec) = parse_cell_ref(end)?;
    Some((sr, sc, er, ec))
}

// =============================================================================
// Package plumbing
// =============================================================================

/// sheet name → relationship id, from workbook.xml
fn parse_workbook_sheets(xml: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"sheet" => {
                if let (Some(name), Some(rid)) = (attr_string(e, b"name"), attr_string(e, b"r:id")) {
                    map.insert(name, rid);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    map
}

/// relationship id → target, from any .rels part
fn parse_relationships(xml: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr_string(e, b"Id"), attr_string(e, b"Target")) {
                    map.insert(id, target);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    map
}

/// Targets are relative to the owning folder unless they start with '/'.
fn resolve_part_path(base: &str, target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("{base}/{target}"),
    }
}

/// "xl/worksheets/sheet1.xml" → "xl/worksheets/_rels/sheet1.xml.rels"
fn sheet_rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

fn read_zip_text<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Option<String> {
    let mut file = archive.by_name(path).ok()?;
    let mut content = String::new();
    file.read_to_string(&mut content).ok()?;
    Some(content)
}

/// Unescape the predefined XML entities
fn unescape_xml(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| unescape_xml(&String::from_utf8_lossy(&a.value)))
}

fn attr_parse<T: FromStr>(e: &BytesStart, key: &[u8]) -> Option<T> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// `<b/>` means on; `<b val="0"/>` means off
fn flag_attr(e: &BytesStart) -> bool {
    attr_string(e, b"val").map_or(true, |v| v != "0" && v != "false")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="2">
    <numFmt numFmtId="164" formatCode="dd\-mmm\-yy"/>
    <numFmt numFmtId="165" formatCode="&quot;$&quot;#,##0"/>
  </numFmts>
  <fonts count="3">
    <font><sz val="11"/><name val="Calibri"/></font>
    <font><b/><sz val="14"/><color rgb="FF1F3864"/><name val="Arial"/></font>
    <font><u/><sz val="11"/><color theme="10" tint="0.5"/><name val="Calibri"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFD9E1F2"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left style="thin"><color indexed="64"/></left><right style="thin"/><top style="medium"><color rgb="FFFF0000"/></top><bottom style="thin"/><diagonal/></border>
  </borders>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="0" fontId="1" fillId="2" borderId="1" xfId="0" applyFont="1"><alignment horizontal="center" vertical="center" wrapText="1"/></xf>
    <xf numFmtId="164" fontId="0" fillId="0" borderId="1" xfId="0"/>
    <xf numFmtId="3" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="165" fontId="0" fillId="0" borderId="0" xfId="0"/>
  </cellXfs>
</styleSheet>"#;

    #[test]
    fn test_parse_styles_resolves_xfs() {
        let (table, approximations) = parse_styles_xml(STYLES);
        assert_eq!(table.len(), 5);
        assert!(approximations.is_empty());

        let header = table.get(1).unwrap();
        assert!(header.bold);
        assert_eq!(header.font_size, Some(14.0));
        assert_eq!(header.font_color, Some([0x1F, 0x38, 0x64, 255]));
        assert_eq!(header.font_family.as_deref(), Some("Arial"));
        assert_eq!(header.background_color, Some([0xD9, 0xE1, 0xF2, 255]));
        assert_eq!(header.alignment, Alignment::Center);
        assert_eq!(header.vertical_alignment, VerticalAlignment::Middle);
        assert_eq!(header.text_overflow, TextOverflow::Wrap);
        assert_eq!(header.border_top.style, BorderStyle::Medium);
        assert_eq!(header.border_top.color, Some([255, 0, 0, 255]));
        assert_eq!(header.border_left.color, Some([0, 0, 0, 255]));

        assert_eq!(table.get(2).unwrap().number_format, NumberFormat::Date("dd\\-mmm\\-yy".into()));
        assert_eq!(table.get(3).unwrap().number_format, NumberFormat::thousands());
        assert_eq!(table.get(4).unwrap().number_format, NumberFormat::whole_currency());
        assert_eq!(table.get(0).unwrap().background_color, None);
    }

    #[test]
    fn test_parse_empty_styles_xml() {
        let (table, _) = parse_styles_xml("<styleSheet/>");
        assert!(table.is_empty());
    }

    #[test]
    fn test_parse_sheet_layout() {
        let xml = r#"<worksheet xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <cols><col min="2" max="3" width="14.5" customWidth="1"/><col min="4" max="4" width="9"/></cols>
  <sheetData>
    <row r="1" ht="30" customHeight="1"><c r="A1" s="1" t="s"><v>0</v></c><c r="B1" s="0"/></row>
    <row r="3"><c r="D3" s="2"/></row>
  </sheetData>
  <mergeCells count="1"><mergeCell ref="B1:G1"/></mergeCells>
  <hyperlinks>
    <hyperlink ref="D3" r:id="rId1"/>
    <hyperlink ref="A5" location="'LIST'!A1" display="LIST"/>
  </hyperlinks>
</worksheet>"#;
        let layout = parse_sheet_layout(xml);
        assert_eq!(layout.cell_styles, vec![(0, 0, 1), (2, 3, 2)]);
        assert_eq!(layout.col_widths.get(&1), Some(&14.5));
        assert_eq!(layout.col_widths.get(&2), Some(&14.5));
        assert_eq!(layout.col_widths.get(&3), None);
        assert_eq!(layout.row_heights.get(&0), Some(&30.0));
        assert_eq!(layout.merged_regions, vec![(0, 1, 0, 6)]);
        assert_eq!(layout.hyperlinks[0], (2, 3, "rId1".to_string()));
        assert_eq!(layout.hyperlinks[1], (4, 0, "#'LIST'!A1".to_string()));
    }

    #[test]
    fn test_resolve_hyperlink_targets() {
        let rels = parse_relationships(
            r#"<Relationships><Relationship Id="rId1" Type="hyperlink" Target="https://example.com/a?x=1&amp;y=2" TargetMode="External"/></Relationships>"#,
        );
        let mut links = vec![
            (2, 3, "rId1".to_string()),
            (3, 3, "rId9".to_string()),
            (4, 0, "#A1".to_string()),
        ];
        resolve_hyperlink_targets(&mut links, &rels);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].2, "https://example.com/a?x=1&y=2");
        assert_eq!(links[1].2, "#A1");
    }


    #[test]
    fn test_parse_merge_ref() {
        assert_eq!(parse_merge_ref("A1:C3"), Some((0, 0, 2, 2)));
        assert_eq!(parse_merge_ref("$B$1:$G$1"), Some((0, 1, 0, 6)));
        assert_eq!(parse_merge_ref("B1"), None);
    }

    #[test]
    fn test_package_paths() {
        assert_eq!(resolve_part_path("xl", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_part_path("xl", "/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(sheet_rels_path("xl/worksheets/sheet1.xml"), "xl/worksheets/_rels/sheet1.xml.rels");
    }

    #[test]
    fn test_parse_argb_hex() {
        assert_eq!(parse_argb_hex("FFFF0000"), Some([255, 0, 0, 255]));
        assert_eq!(parse_argb_hex("0000FF"), Some([0, 0, 255, 255]));
        assert_eq!(parse_argb_hex("xyz"), None);
    }

    #[test]
    fn test_theme_tint_is_noted() {
        let xml = r#"<styleSheet><fonts><font><color theme="4" tint="-0.25"/></font></fonts>
            <cellXfs><xf fontId="0"/></cellXfs></styleSheet>"#;
        let (table, approximations) = parse_styles_xml(xml);
        assert_eq!(table.get(0).unwrap().font_color, Some([68, 114, 196, 255]));
        assert_eq!(approximations, vec!["theme tints".to_string()]);
    }

    #[test]
    fn test_is_zip_package() {
        assert!(is_zip_package(b"PK\x03\x04rest"));
        assert!(!is_zip_package(&[0xD0, 0xCF, 0x11, 0xE0]));
    }
}
