use std::ops::ControlFlow;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::error::{Result, TutorError};
use crate::llm::{AnswerGenerator, Fragment};
use crate::video::{VideoResult, VideoSearch};

/// What a query is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Video,
    Explanation,
}

/// Decides a query's intent.
pub type Classifier = fn(&str) -> Intent;

/// Any mention of "video", in any case and anywhere in the query, asks for videos.
pub fn keyword_classifier(query: &str) -> Intent {
    if query.to_lowercase().contains("video") {
        Intent::Video
    } else {
        Intent::Explanation
    }
}

/// Prompt sent to the generator for an explanation request.
pub fn build_prompt(excerpt: &str, query: &str) -> String {
    if excerpt.is_empty() {
        format!("Explain this computer science concept clearly: {}", query)
    } else {
        format!("{}\n\nQuestion: {}", excerpt, query)
    }
}

/// Where routed output is shown.
///
/// `render_answer` replaces the displayed answer with the full text so far.
/// Returning `ControlFlow::Break` stops generation.
#[async_trait]
pub trait RenderSurface: Send {
    async fn render_videos(&mut self, videos: &[VideoResult]) -> Result<()>;

    async fn render_answer(&mut self, answer: &str) -> Result<ControlFlow<()>>;

    /// Called once after the last `render_answer`. `completed` is false when
    /// the surface stopped generation early.
    async fn finish_answer(&mut self, answer: &str, completed: bool) -> Result<()>;

    /// Called instead of `finish_answer` when generation fails after it
    /// started. `answer` is everything received before the failure and must
    /// stay visible.
    async fn fail_answer(&mut self, answer: &str, err: &TutorError) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Videos(Vec<VideoResult>),
    Answer { text: String, completed: bool },
}

pub struct QueryRouter {
    videos: Arc<dyn VideoSearch>,
    generator: Arc<dyn AnswerGenerator>,
    classify: Classifier,
}

impl QueryRouter {
    pub fn new(videos: Arc<dyn VideoSearch>, generator: Arc<dyn AnswerGenerator>) -> Self {
        Self {
            videos,
            generator,
            classify: keyword_classifier,
        }
    }

    pub fn with_classifier(mut self, classify: Classifier) -> Self {
        self.classify = classify;
        self
    }

    pub fn classify(&self, query: &str) -> Intent {
        (self.classify)(query)
    }

    /// Handle one query from start to finish. Nothing is carried over to the next call.
    pub async fn route(
        &self,
        query: &str,
        excerpt: &str,
        surface: &mut dyn RenderSurface,
    ) -> Result<Outcome> {
        let intent = self.classify(query);
        info!(?intent, query, has_context = !excerpt.is_empty(), "Routing query");

        match intent {
            Intent::Video => {
                let videos = self.videos.search(query).await?;
                surface.render_videos(&videos).await?;
                Ok(Outcome::Videos(videos))
            }
            Intent::Explanation => self.explain(&build_prompt(excerpt, query), surface).await,
        }
    }

    async fn explain(&self, prompt: &str, surface: &mut dyn RenderSurface) -> Result<Outcome> {
        let mut fragments = self.generator.generate(prompt).await?;
        let mut answer = String::new();
        let mut completed = false;
        let mut count = 0usize;

        while let Some(fragment) = fragments.next().await {
            let fragment = match fragment {
                Ok(fragment) => fragment,
                Err(e) => {
                    drop(fragments);
                    warn!(fragments = count, len = answer.len(), error = %e, "Answer interrupted");
                    if let Err(render_err) = surface.fail_answer(&answer, &e).await {
                        warn!(error = %render_err, "Could not show partial answer");
                    }
                    return Err(e);
                }
            };
            match fragment {
                Fragment::Text(text) => {
                    count += 1;
                    answer.push_str(&text);
                    if surface.render_answer(&answer).await?.is_break() {
                        info!(fragments = count, "Answer stopped by surface");
                        break;
                    }
                }
                Fragment::End => {
                    completed = true;
                    break;
                }
            }
        }
        // Dropping the stream closes the upstream response.
        drop(fragments);

        debug!(fragments = count, len = answer.len(), completed, "Answer assembled");
        surface.finish_answer(&answer, completed).await?;
        Ok(Outcome::Answer {
            text: answer,
            completed,
        })
    }
}
