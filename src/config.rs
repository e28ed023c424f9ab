use std::env;

use crate::error::EtlError;

/// Query against the FIRDS files register for a publication window, same
/// shape the registers UI issues.  Narrow the `publication_date` range to
/// pick a different set of files.
pub const DEFAULT_INDEX_URL: &str = "https://registers.esma.europa.eu/solr/esma_registers_firds_files/select?q=*&fq=publication_date:%5B2021-01-17T00:00:00Z+TO+2021-01-19T23:59:59Z%5D&wt=xml&indent=true&start=0&rows=100";

/// Everything one run needs, read once at invocation time and passed down.
/// Nothing in the pipeline reads the environment after this is built.
#[derive(Debug, Clone)]
pub struct EtlConfig {
    /// Solr select url of the FIRDS files register
    pub index_url: String,
    /// Where the csv lands locally before the upload
    pub csv_path: String,
    pub bucket: String,
    /// Object key for the upload, defaults to the csv path
    pub object_key: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Set for MinIO and other S3-compatible stores
    pub endpoint: Option<String>,
}

impl EtlConfig {
    pub fn from_env() -> Result<EtlConfig, EtlError> {
        EtlConfig::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(get: F) -> Result<EtlConfig, EtlError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| get(name).ok_or_else(|| EtlError::Config(name.to_string()));
        let csv_path = get("FIRDS_CSV_PATH").unwrap_or_else(|| "output.csv".to_string());
        let object_key = get("FIRDS_OBJECT_KEY").unwrap_or_else(|| csv_path.clone());
        Ok(EtlConfig {
            index_url: get("FIRDS_INDEX_URL").unwrap_or_else(|| DEFAULT_INDEX_URL.to_string()),
            csv_path,
            bucket: required("FIRDS_BUCKET")?,
            object_key,
            access_key: required("AWS_ACCESS_KEY_ID")?,
            secret_key: required("AWS_SECRET_ACCESS_KEY")?,
            region: get("FIRDS_S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            endpoint: get("FIRDS_S3_ENDPOINT"),
        })
    }
}
