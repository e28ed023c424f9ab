use std::fmt::{self, Display};
use std::fs;

use log::info;

use crate::config::EtlConfig;
use crate::error::EtlError;
use crate::esma::{self, dltins, instrument_records, register_index};
use crate::s3::S3Publisher;

/// What a successful run did, for log lines and the run endpoint response.
#[derive(Debug)]
pub struct EtlReport {
    pub records: usize,
    pub csv_bytes: usize,
    pub csv_path: String,
    pub bucket: String,
    pub object_key: String,
    pub e_tag: Option<String>,
}

impl Display for EtlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records, {} csv bytes at {}, uploaded to s3://{}/{}",
            self.records, self.csv_bytes, self.csv_path, self.bucket, self.object_key
        )?;
        if let Some(e_tag) = &self.e_tag {
            write!(f, " (etag {})", e_tag)?;
        }
        Ok(())
    }
}

/// The whole pipeline, strictly in order: fetch the register index, find the
/// first download link, fetch that archive, pull out the instrument XML,
/// flatten it to rows, write the csv locally, upload it.  The first failure
/// aborts everything after it; nothing partial reaches the store.
pub async fn run(cfg: &EtlConfig) -> Result<EtlReport, EtlError> {
    let index = esma::fetch_bytes(&cfg.index_url, "register index").await?;
    let link = register_index::find_download_link(&index, &register_index::FIRDS_LINK)?;
    let blob = esma::fetch_bytes(&link, "instrument archive").await?;
    let payload = dltins::extract_xml_entry(&blob)?;
    let rows = instrument_records::extract_rows(
        &payload,
        instrument_records::FIRDS_RECORD_TAG,
        &instrument_records::FIRDS_COLUMNS,
    )?;
    info!("extracted {} instrument records", rows.len());

    let csv = instrument_records::to_csv(&instrument_records::FIRDS_COLUMNS, &rows)?;
    let csv_bytes = csv.len();
    fs::write(&cfg.csv_path, &csv)?;
    info!("wrote {} bytes of csv to {}", csv_bytes, cfg.csv_path);

    let publisher = S3Publisher::new(cfg);
    let e_tag = publisher.upload(&cfg.object_key, csv).await?;

    Ok(EtlReport {
        records: rows.len(),
        csv_bytes,
        csv_path: cfg.csv_path.clone(),
        bucket: cfg.bucket.clone(),
        object_key: cfg.object_key.clone(),
        e_tag,
    })
}
