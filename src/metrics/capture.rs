//! Response status observation.

use axum::http::StatusCode;

/// Records the status code produced by downstream handling without
/// altering the response.
///
/// A capture starts out unset and reports 0 until a status is recorded,
/// mirroring a response sink that was never explicitly written to.
#[derive(Debug, Default)]
pub struct ResponseCapture {
    status: Option<StatusCode>,
}

impl ResponseCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note the status the downstream handler produced.
    pub fn record(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// The captured status code, or 0 if none was observed.
    pub fn status_code(&self) -> u16 {
        self.status.map(|status| status.as_u16()).unwrap_or(0)
    }

    /// Label value for the `response_status` counter.
    pub fn status_label(&self) -> String {
        self.status_code().to_string()
    }
}
