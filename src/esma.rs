pub mod dltins;
pub mod instrument_records;
pub mod register_index;

use log::info;

use crate::error::EtlError;

/// One GET, no retries, whole body in memory.  `what` names the document
/// in error messages, e.g. "register index" or "instrument archive".
pub async fn fetch_bytes(url: &str, what: &'static str) -> Result<Vec<u8>, EtlError> {
    let resp = reqwest::get(url).await.map_err(|e| EtlError::Fetch {
        what,
        url: url.to_string(),
        source: e,
    })?;
    let status = resp.status();
    if !status.is_success() {
        return Err(EtlError::FetchStatus {
            what,
            url: url.to_string(),
            status,
        });
    }
    let body = resp.bytes().await.map_err(|e| EtlError::Fetch {
        what,
        url: url.to_string(),
        source: e,
    })?;
    info!("downloaded the {} from {} ({} bytes)", what, url, body.len());
    Ok(body.to_vec())
}
