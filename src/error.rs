use thiserror::Error;

pub type Result<T, E = TutorError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum TutorError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("could not read document: {0}")]
    Extraction(String),

    #[error("video search failed: {0}")]
    VideoUpstream(String),

    #[error("answer generation failed: {0}")]
    GenerationUpstream(String),

    #[error("could not display output: {0}")]
    Surface(String),
}

impl TutorError {
    /// Short label shown to users above the error detail.
    pub fn label(&self) -> &'static str {
        match self {
            TutorError::Config(_) => "Configuration problem",
            TutorError::Extraction(_) => "Document problem",
            TutorError::VideoUpstream(_) => "Video search unavailable",
            TutorError::GenerationUpstream(_) => "Explanation unavailable",
            TutorError::Surface(_) => "Display problem",
        }
    }
}

impl From<serenity::Error> for TutorError {
    fn from(err: serenity::Error) -> Self {
        TutorError::Surface(err.to_string())
    }
}
