use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use serde_json::{Value, json};

use flyfetch::domain::{GeneId, GeneRecord};
use flyfetch::error::FetchError;
use flyfetch::workbook;

fn gene_id() -> GeneId {
    "FBgn0000099".parse().unwrap()
}

fn temp_out_dir() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, path)
}

#[test]
fn missing_destination_folder_is_rejected() {
    let record = GeneRecord::empty(gene_id());
    let missing = Utf8PathBuf::from("/no/such/folder");
    let err = workbook::write_gene_bundle(&record, &missing).unwrap_err();
    assert_matches!(err, FetchError::OutputPathInvalid(_));
}

#[test]
fn preview_sheet_caps_rows_and_truncates_payloads() {
    let (_guard, out) = temp_out_dir();
    let mut record = GeneRecord::empty(gene_id());

    let mut items: Vec<Value> = (0..12).map(|i| json!({"entry": i})).collect();
    items[0] = json!({"blob": "x".repeat(2000)});
    record.related.raw = Value::Array(items);

    let path = workbook::write_gene_bundle(&record, &out).unwrap();
    let book = umya_spreadsheet::reader::xlsx::read(path.as_std_path()).unwrap();
    let preview = book.get_sheet_by_name("HitList_preview").unwrap();

    // 10 entries plus the header row; row 12 stays empty
    assert_eq!(preview.get_value("A11"), "9");
    assert_eq!(preview.get_value("A12"), "");
    assert_eq!(preview.get_value("B2").chars().count(), 500);
}

#[test]
fn rerun_overwrites_the_same_file() {
    let (_guard, out) = temp_out_dir();
    let record = GeneRecord::empty(gene_id());

    let first = workbook::write_gene_bundle(&record, &out).unwrap();
    let second = workbook::write_gene_bundle(&record, &out).unwrap();
    assert_eq!(first, second);

    let bundles = std::fs::read_dir(out.as_std_path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .ends_with("_flybase_bundle.xlsx")
        })
        .count();
    assert_eq!(bundles, 1);
}

#[test]
fn empty_record_produces_all_sheets() {
    let (_guard, out) = temp_out_dir();
    let record = GeneRecord::empty(gene_id());

    let path = workbook::write_gene_bundle(&record, &out).unwrap();
    let book = umya_spreadsheet::reader::xlsx::read(path.as_std_path()).unwrap();
    for sheet in [
        "Overview",
        "Sequence_gene",
        "Sequence_transcripts",
        "Sequence_proteins",
        "Alleles_FBal",
        "Stocks_FBst",
        "HitList_preview",
    ] {
        assert!(book.get_sheet_by_name(sheet).is_some(), "missing {sheet}");
    }
}
