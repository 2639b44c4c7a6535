use poise::serenity_prelude as serenity;
use tracing::{error, info};

use crate::docs::extract::extract_pdf_text;
use crate::docs::types::ContextExcerpt;
use crate::error::TutorError;
use crate::state::Context;

/// Upload notes or a textbook (PDF) to ground your questions
#[poise::command(slash_command)]
pub async fn upload(
    ctx: Context<'_>,
    #[description = "PDF document"] document: serenity::Attachment,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    match load_pdf(&document).await {
        Ok(excerpt) if excerpt.is_empty() => {
            let reply = format!(
                "**{}** has no extractable text, so it cannot ground your questions.",
                excerpt.source
            );
            ctx.data()
                .contexts
                .replace(ctx.author().id.get(), excerpt)
                .await;
            ctx.say(reply).await?;
        }
        Ok(excerpt) => {
            let reply = format!(
                "PDF loaded: **{}** ({} characters of context). Ask something based on it with `/tutor search`.",
                excerpt.source,
                excerpt.char_count()
            );
            ctx.data()
                .contexts
                .replace(ctx.author().id.get(), excerpt)
                .await;
            ctx.say(reply).await?;
        }
        Err(e) => {
            error!(user = ctx.author().name, filename = %document.filename, error = %e, "Upload failed");
            ctx.say(format!("**{}**\n{}", e.label(), e)).await?;
        }
    }
    Ok(())
}

/// Whether an attachment looks like a PDF by content type or extension.
pub fn is_pdf(filename: &str, content_type: Option<&str>) -> bool {
    let by_type = content_type
        .map(|t| t.split(';').next().unwrap_or("").trim().eq_ignore_ascii_case("application/pdf"))
        .unwrap_or(false);
    by_type || filename.to_ascii_lowercase().ends_with(".pdf")
}

/// Download a PDF attachment and extract its excerpt.
pub async fn load_pdf(attachment: &serenity::Attachment) -> Result<ContextExcerpt, TutorError> {
    if !is_pdf(&attachment.filename, attachment.content_type.as_deref()) {
        return Err(TutorError::Extraction(format!(
            "{} is not a PDF; only PDF documents are supported",
            attachment.filename
        )));
    }

    let bytes = attachment
        .download()
        .await
        .map_err(|e| TutorError::Extraction(format!("failed to download {}: {e}", attachment.filename)))?;

    // PDF parsing is CPU-bound
    let text = tokio::task::spawn_blocking(move || extract_pdf_text(&bytes))
        .await
        .map_err(|e| TutorError::Extraction(format!("extraction task failed: {e}")))??;

    info!(
        filename = %attachment.filename,
        size = attachment.size,
        chars = text.chars().count(),
        "PDF extracted"
    );
    Ok(ContextExcerpt::new(attachment.filename.clone(), text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf("notes.pdf", None));
        assert!(is_pdf("NOTES.PDF", Some("application/octet-stream")));
        assert!(is_pdf("scan", Some("application/pdf")));
        assert!(is_pdf("scan", Some("application/pdf; charset=binary")));
        assert!(!is_pdf("notes.docx", Some("application/vnd.openxmlformats")));
        assert!(!is_pdf("notes.txt", None));
    }
}
