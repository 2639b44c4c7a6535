use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use poise::{CreateReply, ReplyHandle};
use tracing::{debug, warn};

use crate::error::{Result, TutorError};
use crate::router::RenderSurface;
use crate::state::Context;
use crate::video::VideoResult;

/// Discord rejects messages longer than 2000 characters.
const MESSAGE_LIMIT: usize = 1990;
/// Discord rate-limits edits, so streamed updates are coalesced.
const EDIT_INTERVAL: Duration = Duration::from_millis(750);

const VIDEOS_HEADING: &str = "**Top YouTube Videos**";
const ANSWER_HEADING: &str = "**Explanation**";

/// Renders into one interaction reply, editing it in place.
pub struct DiscordSurface<'a> {
    ctx: Context<'a>,
    handle: ReplyHandle<'a>,
    last_edit: Option<Instant>,
    error_shown: bool,
}

impl<'a> DiscordSurface<'a> {
    pub fn new(ctx: Context<'a>, handle: ReplyHandle<'a>) -> Self {
        Self {
            ctx,
            handle,
            last_edit: None,
            error_shown: false,
        }
    }

    async fn replace(&mut self, content: &str) -> Result<()> {
        self.handle
            .edit(self.ctx, CreateReply::default().content(content))
            .await?;
        self.last_edit = Some(Instant::now());
        Ok(())
    }

    /// Report a failure without touching any answer already in the reply.
    pub async fn show_error(&mut self, err: &TutorError) -> Result<()> {
        if self.error_shown {
            return Ok(());
        }
        let message = error_message(err);
        if self.last_edit.is_some() {
            self.ctx.say(message).await?;
        } else {
            self.replace(&message).await?;
        }
        self.error_shown = true;
        Ok(())
    }

    /// Show `text` in the reply, spilling into follow-up messages when too long.
    pub async fn show(&mut self, text: &str) -> Result<()> {
        let mut chunks = split_message(text, MESSAGE_LIMIT).into_iter();
        let first = chunks.next().unwrap_or("");
        self.replace(first).await?;
        for chunk in chunks {
            self.ctx.say(chunk).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<'a> RenderSurface for DiscordSurface<'a> {
    async fn render_videos(&mut self, videos: &[VideoResult]) -> Result<()> {
        self.show(&format_videos(videos)).await
    }

    async fn render_answer(&mut self, answer: &str) -> Result<ControlFlow<()>> {
        let due = self
            .last_edit
            .map_or(true, |at| at.elapsed() >= EDIT_INTERVAL);
        if due {
            let budget = MESSAGE_LIMIT - ANSWER_HEADING.len() - 1;
            let shown = format!("{}\n{}", ANSWER_HEADING, tail(answer, budget));
            self.replace(&shown).await?;
        }
        Ok(ControlFlow::Continue(()))
    }

    async fn finish_answer(&mut self, answer: &str, completed: bool) -> Result<()> {
        if !completed {
            warn!(len = answer.len(), "Answer ended before completion");
        }
        debug!(len = answer.len(), "Writing final answer");
        self.show(&format!("{}\n{}", ANSWER_HEADING, answer)).await
    }

    async fn fail_answer(&mut self, answer: &str, err: &TutorError) -> Result<()> {
        // Edits may have been coalesced away, so write everything received.
        if !answer.is_empty() {
            self.show(&format!("{}\n{}", ANSWER_HEADING, answer)).await?;
        }
        self.show_error(err).await
    }
}

/// User-facing text for a failure.
pub fn error_message(err: &TutorError) -> String {
    format!("**{}**\n{}", err.label(), err)
}

/// Markdown list of clickable video links.
pub fn format_videos(videos: &[VideoResult]) -> String {
    if videos.is_empty() {
        return format!("{}\nNo videos found.", VIDEOS_HEADING);
    }
    let mut out = String::from(VIDEOS_HEADING);
    for video in videos {
        out.push_str(&format!("\n- [{}]({})", video.title, video.link));
    }
    out
}

/// Split text into pieces of at most `max` bytes, preferring newline, then
/// space, boundaries.
pub fn split_message(text: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        let split_at = if remaining.len() > max {
            let mut limit = max;
            while !remaining.is_char_boundary(limit) {
                limit -= 1;
            }
            remaining[..limit]
                .rfind('\n')
                .or_else(|| remaining[..limit].rfind(' '))
                .map(|i| i + 1)
                .unwrap_or(limit)
                .max(remaining.chars().next().map_or(1, char::len_utf8))
        } else {
            remaining.len()
        };
        chunks.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }
    chunks
}

/// Last part of `text` fitting in `max` bytes.
fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_videos() {
        let videos = vec![
            VideoResult {
                title: "Heaps".to_string(),
                link: "https://www.youtube.com/watch?v=h".to_string(),
            },
            VideoResult {
                title: "Tries".to_string(),
                link: "https://www.youtube.com/watch?v=t".to_string(),
            },
        ];
        assert_eq!(
            format_videos(&videos),
            "**Top YouTube Videos**\n- [Heaps](https://www.youtube.com/watch?v=h)\n- [Tries](https://www.youtube.com/watch?v=t)"
        );
        assert_eq!(format_videos(&[]), "**Top YouTube Videos**\nNo videos found.");
    }

    #[test]
    fn test_error_message() {
        let err = TutorError::GenerationUpstream("HTTP 429".to_string());
        assert_eq!(
            error_message(&err),
            "**Explanation unavailable**\nanswer generation failed: HTTP 429"
        );
    }

    #[test]
    fn test_split_prefers_newlines() {
        let text = "first line\nsecond line\nthird";
        let chunks = split_message(text, 15);
        assert_eq!(chunks, vec!["first line\n", "second line\n", "third"]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_hard_cut_on_char_boundary() {
        let text = "ééééé";
        let chunks = split_message(text, 3);
        assert!(chunks.iter().all(|c| c.len() <= 3));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_short_and_empty() {
        assert_eq!(split_message("hi", 10), vec!["hi"]);
        assert!(split_message("", 10).is_empty());
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("abc", 10), "abc");
        assert_eq!(tail("aé", 1), "");
    }
}
