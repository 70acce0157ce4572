use bytes::Bytes;

/// HTTP method used for a [`RequestDescriptor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RequestKind {
    #[default]
    Get,
    Head,
}

impl RequestKind {
    pub fn method(self) -> reqwest::Method {
        match self {
            RequestKind::Get => reqwest::Method::GET,
            RequestKind::Head => reqwest::Method::HEAD,
        }
    }
}

/// One request to issue, built by a pipeline and consumed by the fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestDescriptor {
    url: String,
    kind: RequestKind,
}

impl RequestDescriptor {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: RequestKind::Get,
        }
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: RequestKind::Head,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Path segment after the last `/`, e.g. the station id of a
    /// `regione/<id>` request.
    pub fn last_segment(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or_default()
    }
}

/// Status reported for requests that never produced a response.
pub const TRANSIENT_STATUS: u16 = 504;

/// Outcome of one [`RequestDescriptor`].
///
/// Failures are data: a non-200 status keeps whatever body the upstream sent,
/// and a transport failure is reported as [`TRANSIENT_STATUS`] with an empty
/// body and `transient` set.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub source: RequestDescriptor,
    pub body: Bytes,
    pub status: u16,
    pub succeeded: bool,
    /// No response was received. A 504 sent by the upstream leaves this unset.
    pub transient: bool,
}

impl FetchResult {
    pub fn from_response(source: RequestDescriptor, status: u16, body: Bytes) -> Self {
        Self {
            source,
            body,
            status,
            succeeded: status == 200,
            transient: false,
        }
    }

    pub fn transient(source: RequestDescriptor) -> Self {
        Self {
            source,
            body: Bytes::new(),
            status: TRANSIENT_STATUS,
            succeeded: false,
            transient: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_transient_failure(&self) -> bool {
        self.transient
    }
}
