/// Plain text pulled from a user's uploaded document, used to ground answers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextExcerpt {
    /// Filename of the upload the excerpt came from.
    pub source: String,
    pub text: String,
}

impl ContextExcerpt {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}
