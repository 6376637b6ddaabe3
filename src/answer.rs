//! Builds grounded prompts from retrieved listings and turns completions into answers.

use tracing::warn;

use crate::llm::{CompletionError, CompletionService};
use crate::store::ChunkMetadata;

/// Answer given when retrieval found nothing; the completion service is not called.
pub const NO_MATCHES_ANSWER: &str = "No matching products found in the database.";

/// Renders retrieved listings as the context block of the prompt.
pub fn format_context(results: &[ChunkMetadata]) -> String {
    results
        .iter()
        .map(|meta| {
            format!(
                "- {}\n  Price: ${}\n  Source: {}\n  Link: {}",
                meta.name, meta.price, meta.source_site, meta.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Fills the instruction template with `context` and the literal user question.
pub fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "You are a helpful assistant that knows about trailer products.\n\
         \n\
         Here are the most relevant trailer parts:\n\
         \n\
         {context}\n\
         \n\
         Now answer the following question based only on the information above:\n\
         \n\
         User Question: {query}\n\
         \n\
         Answer:"
    )
}

/// Prompt for `query` over `results`, or `None` when there is nothing to ground on.
pub fn compose(query: &str, results: &[ChunkMetadata]) -> Option<String> {
    if results.is_empty() {
        return None;
    }
    Some(build_prompt(query, &format_context(results)))
}

/// Maps a completion failure to the text shown in place of an answer.
pub fn failure_message(err: &CompletionError) -> String {
    match err {
        CompletionError::Status { status, .. } => {
            format!("Error: the language model responded with status code {status}")
        }
        other => format!("Exception while calling the language model: {other}"),
    }
}

/// Answers `query` from `results`. Never fails: completion errors become a message.
pub async fn answer(
    query: &str,
    results: &[ChunkMetadata],
    completion: &dyn CompletionService,
) -> String {
    let Some(prompt) = compose(query, results) else {
        return NO_MATCHES_ANSWER.to_string();
    };
    match completion.generate(&prompt).await {
        Ok(text) => text.trim().to_string(),
        Err(err) => {
            warn!(error = %err, "completion failed");
            failure_message(&err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCompletion {
        calls: AtomicUsize,
        reply: fn() -> Result<String, CompletionError>,
    }

    impl CountingCompletion {
        fn new(reply: fn() -> Result<String, CompletionError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reply,
            }
        }
    }

    #[async_trait]
    impl CompletionService for CountingCompletion {
        async fn generate(&self, _prompt: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)()
        }
    }

    fn hub() -> ChunkMetadata {
        ChunkMetadata {
            name: "Axle Hub".into(),
            price: "12.00".into(),
            url: "http://ebay.com/x".into(),
            source_site: "eBay".into(),
            image_url: String::new(),
        }
    }

    #[test]
    fn formats_context_entries_separated_by_blank_line() {
        let mut second = hub();
        second.name = "Leaf Spring".into();
        let context = format_context(&[hub(), second]);
        assert_eq!(
            context,
            "- Axle Hub\n  Price: $12.00\n  Source: eBay\n  Link: http://ebay.com/x\n\n\
             - Leaf Spring\n  Price: $12.00\n  Source: eBay\n  Link: http://ebay.com/x"
        );
    }

    #[test]
    fn prompt_embeds_context_and_question() {
        let prompt = compose("which hub fits?", &[hub()]).expect("prompt");
        assert!(prompt.starts_with("You are a helpful assistant that knows about trailer products.\n\n"));
        assert!(prompt.contains("Here are the most relevant trailer parts:\n\n- Axle Hub\n"));
        assert!(prompt.contains("\n\nUser Question: which hub fits?\n\nAnswer:"));
        assert!(compose("anything", &[]).is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn empty_results_skip_completion() {
        let completion = CountingCompletion::new(|| Ok("unused".into()));
        let reply = answer("axle", &[], &completion).await;
        assert_eq!(reply, NO_MATCHES_ANSWER);
        assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn returns_trimmed_completion() {
        let completion = CountingCompletion::new(|| Ok("  Use the 3.5k hub.\n".into()));
        let reply = answer("axle", &[hub()], &completion).await;
        assert_eq!(reply, "Use the 3.5k hub.");
        assert_eq!(completion.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn status_failure_becomes_message() {
        let completion = CountingCompletion::new(|| {
            Err(CompletionError::Status {
                status: 503,
                body: "busy".into(),
            })
        });
        let reply = answer("axle", &[hub()], &completion).await;
        assert_eq!(
            reply,
            "Error: the language model responded with status code 503"
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn other_failures_become_exception_message() {
        let completion =
            CountingCompletion::new(|| Err(CompletionError::InvalidResponse("not json".into())));
        let reply = answer("axle", &[hub()], &completion).await;
        assert!(reply.starts_with("Exception while calling the language model:"));
        assert!(reply.contains("not json"));
    }
}
