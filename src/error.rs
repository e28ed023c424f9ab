use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can fail between the register index fetch and the S3
/// upload.  One variant per failure class; each carries enough context
/// (url, tag, bucket) that the message alone tells an operator what broke.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("failed to download the {what} from {url}: {source}")]
    Fetch {
        what: &'static str,
        url: String,
        source: reqwest::Error,
    },

    #[error("GET {url} for the {what} returned status {status}")]
    FetchStatus {
        what: &'static str,
        url: String,
        status: StatusCode,
    },

    #[error("malformed XML in the {doc}: {source}")]
    Xml {
        doc: &'static str,
        source: quick_xml::Error,
    },

    #[error("no download link element <{tag}> in the register index")]
    LinkNotFound { tag: String },

    #[error("cannot read the downloaded archive: {0}")]
    Extract(#[from] zip::result::ZipError),

    #[error("the archive contains no .xml entry")]
    NoXmlEntry,

    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing required environment variable {0}")]
    Config(String),

    #[error("object store rejected the credentials: {0}")]
    Auth(String),

    #[error("bucket {0} does not exist or is not accessible")]
    BucketNotFound(String),

    #[error("failed to upload s3://{bucket}/{key}: {message}")]
    Upload {
        bucket: String,
        key: String,
        message: String,
    },
}

impl EtlError {
    /// Short name of the pipeline stage the error belongs to, for log lines
    /// and the run endpoint's response message.
    pub fn stage(&self) -> &'static str {
        match self {
            EtlError::Fetch { .. } | EtlError::FetchStatus { .. } => "download",
            EtlError::Xml { .. } => "xml parsing",
            EtlError::LinkNotFound { .. } => "link extraction",
            EtlError::Extract(_) | EtlError::NoXmlEntry => "archive extraction",
            EtlError::Csv(_) => "csv serialization",
            EtlError::Io(_) => "local io",
            EtlError::Config(_) => "configuration",
            EtlError::Auth(_) | EtlError::BucketNotFound(_) | EtlError::Upload { .. } => "upload",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_piece() {
        let e = EtlError::LinkNotFound {
            tag: "str".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "no download link element <str> in the register index"
        );
        assert_eq!(e.stage(), "link extraction");

        let e = EtlError::BucketNotFound("firds-csv".to_string());
        assert_eq!(
            e.to_string(),
            "bucket firds-csv does not exist or is not accessible"
        );
        assert_eq!(e.stage(), "upload");
    }

    #[test]
    fn upload_message_has_bucket_and_key() {
        let e = EtlError::Upload {
            bucket: "firds-csv".to_string(),
            key: "output.csv".to_string(),
            message: "SlowDown: please reduce your request rate".to_string(),
        };
        assert!(e.to_string().contains("s3://firds-csv/output.csv"));
    }
}
