pub type Result<T> = std::result::Result<T, MatteError>;

#[derive(thiserror::Error, Debug)]
pub enum MatteError {
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("unsupported color range: {0}")]
    UnsupportedColorRange(String),

    #[error("palette has no entry for fill color {0:?}")]
    MissingFillColor([u8; 3]),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MatteError {
    pub fn invalid_frame(msg: impl Into<String>) -> Self {
        Self::InvalidFrame(msg.into())
    }

    pub fn color_range(msg: impl Into<String>) -> Self {
        Self::UnsupportedColorRange(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
