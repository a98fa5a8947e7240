use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;
use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::domain::{GeneId, GeneRecord, NOT_AVAILABLE, Organism, OrthologTable, SequenceRecord};
use crate::error::FetchError;

const PREVIEW_ROWS: usize = 10;
const PREVIEW_CHARS: usize = 500;

const OVERVIEW_COLUMNS: [&str; 11] = [
    "FlyBase ID",
    "Genus",
    "Species",
    "Abbrev",
    "Chromosome Arm",
    "Start Position",
    "End Position",
    "Strand",
    "Auto Summary",
    "Allele Count",
    "Stock Count",
];

/// Output file name for a gene bundle; a pure function of the resolved id,
/// so re-runs overwrite the same file.
pub fn bundle_file_name(id: &GeneId) -> String {
    format!("{id}_flybase_bundle.xlsx")
}

/// Output file name for an ortholog bundle; pure function of id + organism.
pub fn ortholog_file_name(id: &GeneId, organism: Organism) -> String {
    format!("{}_orthologs_{}.xlsx", id, organism.file_label())
}

/// Fails fast when the destination folder is missing, before any network
/// call in the save path.
pub fn ensure_output_dir(out_dir: &Utf8Path) -> Result<(), FetchError> {
    if !out_dir.is_dir() {
        return Err(FetchError::OutputPathInvalid(out_dir.to_path_buf()));
    }
    Ok(())
}

/// Writes the multi-sheet gene bundle and returns the final path.
pub fn write_gene_bundle(
    record: &GeneRecord,
    out_dir: &Utf8Path,
) -> Result<Utf8PathBuf, FetchError> {
    ensure_output_dir(out_dir)?;
    let mut book = umya_spreadsheet::new_file_empty_worksheet();

    write_overview(&mut book, record)?;
    write_sequence_sheet(&mut book, "Sequence_gene", &record.sequences.gene)?;
    write_sequence_sheet(&mut book, "Sequence_transcripts", &record.sequences.transcripts)?;
    write_sequence_sheet(&mut book, "Sequence_proteins", &record.sequences.proteins)?;
    write_id_sheet(&mut book, "Alleles_FBal", "FBal", &record.related.alleles)?;
    write_id_sheet(&mut book, "Stocks_FBst", "FBst", &record.related.stocks)?;
    write_preview_sheet(&mut book, record)?;

    let path = out_dir.join(bundle_file_name(&record.id));
    persist(&book, &path)?;
    info!(path = %path, "gene bundle written");
    Ok(path)
}

/// Writes the single-sheet ortholog bundle and returns the final path.
pub fn write_ortholog_bundle(
    id: &GeneId,
    organism: Organism,
    table: &OrthologTable,
    out_dir: &Utf8Path,
) -> Result<Utf8PathBuf, FetchError> {
    ensure_output_dir(out_dir)?;
    let mut book = umya_spreadsheet::new_file_empty_worksheet();

    let sheet = new_sheet(&mut book, "Orthologs")?;
    for (col, name) in table.columns.iter().enumerate() {
        set_cell(sheet, col + 1, 1, name);
    }
    for (row_idx, row) in table.rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            set_cell(sheet, col + 1, row_idx + 2, value);
        }
    }

    let path = out_dir.join(ortholog_file_name(id, organism));
    persist(&book, &path)?;
    info!(path = %path, "ortholog bundle written");
    Ok(path)
}

fn write_overview(book: &mut Spreadsheet, record: &GeneRecord) -> Result<(), FetchError> {
    let sheet = new_sheet(book, "Overview")?;
    let summary = record.summary.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let values: [&str; 11] = [
        record.id.as_str(),
        &record.species.genus,
        &record.species.species,
        &record.species.abbreviation,
        &record.location.arm,
        &record.location.start,
        &record.location.end,
        &record.location.strand,
        &summary,
        record.related.allele_count.as_deref().unwrap_or(""),
        record.related.stock_count.as_deref().unwrap_or(""),
    ];
    for (col, name) in OVERVIEW_COLUMNS.iter().enumerate() {
        set_cell(sheet, col + 1, 1, name);
    }
    for (col, value) in values.iter().enumerate() {
        set_cell(sheet, col + 1, 2, value);
    }
    Ok(())
}

fn write_sequence_sheet(
    book: &mut Spreadsheet,
    name: &str,
    records: &[SequenceRecord],
) -> Result<(), FetchError> {
    let sheet = new_sheet(book, name)?;
    for (col, header) in ["id", "description", "sequence"].iter().enumerate() {
        set_cell(sheet, col + 1, 1, header);
    }
    for (row_idx, record) in records.iter().enumerate() {
        set_cell(sheet, 1, row_idx + 2, &record.id);
        set_cell(sheet, 2, row_idx + 2, &record.description);
        set_cell(sheet, 3, row_idx + 2, &record.sequence);
    }
    Ok(())
}

fn write_id_sheet(
    book: &mut Spreadsheet,
    name: &str,
    header: &str,
    ids: &[String],
) -> Result<(), FetchError> {
    let sheet = new_sheet(book, name)?;
    set_cell(sheet, 1, 1, header);
    for (row_idx, id) in ids.iter().enumerate() {
        set_cell(sheet, 1, row_idx + 2, id);
    }
    Ok(())
}

fn write_preview_sheet(book: &mut Spreadsheet, record: &GeneRecord) -> Result<(), FetchError> {
    let sheet = new_sheet(book, "HitList_preview")?;
    set_cell(sheet, 1, 1, "index");
    set_cell(sheet, 2, 1, "json");

    let entries = record
        .related
        .raw
        .as_array()
        .map(|items| items.as_slice())
        .unwrap_or_default();
    for (idx, entry) in entries.iter().take(PREVIEW_ROWS).enumerate() {
        let json = serde_json::to_string(entry)
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        set_cell(sheet, 1, idx + 2, &idx.to_string());
        set_cell(sheet, 2, idx + 2, truncate_chars(&json, PREVIEW_CHARS));
    }
    Ok(())
}

fn new_sheet<'a>(book: &'a mut Spreadsheet, name: &str) -> Result<&'a mut Worksheet, FetchError> {
    book.new_sheet(name)
        .map_err(|err| FetchError::Filesystem(format!("cannot create sheet {name}: {err}")))
}

fn set_cell(sheet: &mut Worksheet, col: usize, row: usize, value: &str) {
    sheet
        .get_cell_mut(format!("{}{}", column_letter(col), row))
        .set_value(value);
}

fn column_letter(mut index: usize) -> String {
    let mut letters = String::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.insert(0, (b'A' + rem as u8) as char);
        index = (index - 1) / 26;
    }
    letters
}

fn truncate_chars(value: &str, limit: usize) -> &str {
    match value.char_indices().nth(limit) {
        Some((offset, _)) => &value[..offset],
        None => value,
    }
}

/// Writes the workbook to a scratch file inside the destination folder and
/// renames it into place, so a failed write never leaves a partial bundle.
fn persist(book: &Spreadsheet, path: &Utf8Path) -> Result<(), FetchError> {
    let dir = path
        .parent()
        .ok_or_else(|| FetchError::OutputPathInvalid(path.to_path_buf()))?;
    let temp_dir = tempfile::Builder::new()
        .prefix("flyfetch")
        .tempdir_in(dir.as_std_path())
        .map_err(|err| FetchError::Filesystem(err.to_string()))?;
    let temp_path = temp_dir.path().join("bundle.xlsx");

    umya_spreadsheet::writer::xlsx::write(book, &temp_path).map_err(|err| {
        FetchError::WritePermission {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    })?;
    fs::rename(&temp_path, path.as_std_path()).map_err(|err| FetchError::WritePermission {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_deterministic() {
        let id: GeneId = "FBgn0000099".parse().unwrap();
        assert_eq!(bundle_file_name(&id), "FBgn0000099_flybase_bundle.xlsx");
        assert_eq!(bundle_file_name(&id), bundle_file_name(&id));
        assert_eq!(
            ortholog_file_name(&id, Organism::Celegans),
            "FBgn0000099_orthologs_c._elegans.xlsx"
        );
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(11), "K");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
    }

    #[test]
    fn truncation_is_char_safe() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
        assert_eq!(truncate_chars("ééééé", 2), "éé");
    }
}
