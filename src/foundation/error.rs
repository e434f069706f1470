use crate::foundation::locale;

pub type ReportResult<T> = Result<T, ReportError>;

/// Errors surfaced to the caller of the report pipeline.
///
/// Precondition variants are raised before composition starts. Everything the composer can
/// recover from locally ([`RenderFailure`], [`FetchError`]) never shows up here.
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("no items selected")]
    NoItemsSelected,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("generation failed: {0}")]
    GenerationFailure(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReportError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::GenerationFailure(msg.into())
    }

    /// `true` for errors raised before any page was composed.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::MissingRequiredField(_) | Self::NoItemsSelected)
    }

    /// User-facing notice for a precondition error, `None` for everything else.
    pub fn precondition_notice(&self) -> Option<&'static str> {
        match self {
            Self::MissingRequiredField(_) => Some(locale::MISSING_FIELDS_NOTICE),
            Self::NoItemsSelected => Some(locale::NO_ITEMS_NOTICE),
            _ => None,
        }
    }
}

/// Markup could not be turned into a raster image. The cover falls back to a drawn page.
#[derive(thiserror::Error, Debug)]
pub enum RenderFailure {
    #[error("referenced image '{url}' could not be loaded: {source}")]
    Resource {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("markup parse error: {0}")]
    Parse(String),

    #[error("rasterization error: {0}")]
    Raster(String),

    #[error("image encode error: {0}")]
    Encode(String),
}

/// An image could not be fetched or decoded.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected status {status} for '{url}'")]
    Status { url: String, status: u16 },

    #[error("malformed data uri: {0}")]
    DataUri(String),

    #[error("read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("decode error: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}
