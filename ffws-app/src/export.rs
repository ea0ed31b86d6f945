use chrono::{DateTime, Local};
use ffws_web::{Dataset, Extraction};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// `pagasa_<dataset>_YYYYMMDD_HHMM.csv`, stamped with `now`.
pub fn default_file_name(dataset: Dataset, now: DateTime<Local>) -> PathBuf {
    PathBuf::from(format!(
        "pagasa_{}_{}.csv",
        dataset.name(),
        now.format("%Y%m%d_%H%M")
    ))
}

/// Header of field names plus `timestamp`, then one line per record.
/// Fields holding a comma, quote or line break are quoted.
pub fn write_csv<W: Write>(w: W, extraction: &Extraction) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(w);
    writer.write_record(extraction.columns())?;
    for record in &extraction.records {
        writer.write_record(record.to_row())?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `extraction` to `path`. Returns `Ok(false)` without touching the
/// filesystem when there is nothing to save.
pub fn export_csv(extraction: &Extraction, path: &Path) -> io::Result<bool> {
    if extraction.is_empty() {
        return Ok(false);
    }
    write_csv(File::create(path)?, extraction)?;
    tracing::info!(
        target: "ffws.export",
        path = %path.display(),
        records = extraction.records.len(),
        "csv.saved"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ffws_web::{CaptureTime, Record};

    const FIELDS: &[&str] = &["station", "current"];

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 7, 24, 9, 3, 0).unwrap()
    }

    fn extraction(rows: &[[&str; 2]]) -> Extraction {
        let captured_at = CaptureTime::at(at());
        Extraction {
            dataset: "water_level",
            headers: vec!["Station".into(), "Current".into()],
            records: rows
                .iter()
                .map(|r| {
                    let cells = r.iter().map(|c| c.to_string()).collect();
                    Record::from_cells(FIELDS, cells, captured_at)
                })
                .collect(),
            fields: FIELDS,
            captured_at,
        }
    }

    #[test]
    fn file_name_carries_dataset_and_minute() {
        assert_eq!(
            default_file_name(Dataset::WaterLevel, at()),
            PathBuf::from("pagasa_water_level_20240724_0903.csv")
        );
        assert_eq!(
            default_file_name(Dataset::Rainfall, at()),
            PathBuf::from("pagasa_rainfall_20240724_0903.csv")
        );
    }

    #[test]
    fn writes_header_and_quotes_where_needed() {
        let mut out = Vec::new();
        write_csv(
            &mut out,
            &extraction(&[["Sto Nino", "12.4"], ["Rosario, Jusmag", "say \"hi\""]]),
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "station,current,timestamp\n\
             Sto Nino,12.4,2024-07-24 09:03\n\
             \"Rosario, Jusmag\",\"say \"\"hi\"\"\",2024-07-24 09:03\n"
        );
    }

    #[test]
    fn empty_extraction_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        assert!(!export_csv(&extraction(&[]), &path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn export_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        assert!(export_csv(&extraction(&[["Nangka", "0.5"]]), &path).unwrap());
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("station,current,timestamp\n"));
        assert!(text.contains("Nangka,0.5,2024-07-24 09:03"));
    }

    #[test]
    fn written_file_reads_back_with_embedded_newlines() {
        let mut out = Vec::new();
        write_csv(&mut out, &extraction(&[["Line\nBreak", "1,5"]])).unwrap();

        let mut reader = csv::Reader::from_reader(out.as_slice());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, ["station", "current", "timestamp"]);
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].iter().collect::<Vec<_>>(),
            ["Line\nBreak", "1,5", "2024-07-24 09:03"]
        );
    }
}
