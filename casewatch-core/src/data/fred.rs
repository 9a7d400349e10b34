//! FRED flat-file provider.
//!
//! Each economic metric is one CSV download from the FRED graph endpoint,
//! identified by its series code. No retries here: a failed download is a
//! `SourceUnavailable`, and the refresh coordinator owns the retry policy.

use super::provider::{DataError, RemoteSource};
use std::time::Duration;

const FRED_GRAPH_CSV: &str = "https://fred.stlouisfed.org/graph/fredgraph.csv";

/// Build the CSV download URL for a FRED series code.
pub fn fred_csv_url(code: &str) -> String {
    format!("{FRED_GRAPH_CSV}?id={code}")
}

/// One HTTP endpoint returning a CSV payload.
pub struct HttpSource {
    id: String,
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Result<Self, DataError> {
        let id = id.into();
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("casewatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::unavailable(&id, format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            id,
            url: url.into(),
            client,
        })
    }

    /// Source for a FRED series code; the code doubles as the source id.
    pub fn fred(code: &str) -> Result<Self, DataError> {
        Self::new(code, fred_csv_url(code))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RemoteSource for HttpSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn retrieve(&self) -> Result<Vec<u8>, DataError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| DataError::unavailable(&self.id, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::unavailable(
                &self.id,
                format!("HTTP {status} from {}", self.url),
            ));
        }

        let body = resp
            .bytes()
            .map_err(|e| DataError::unavailable(&self.id, format!("reading body: {e}")))?;
        if body.is_empty() {
            return Err(DataError::unavailable(&self.id, "empty response body"));
        }
        Ok(body.to_vec())
    }
}
