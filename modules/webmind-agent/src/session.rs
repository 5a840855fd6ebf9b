//! The sequential retrieval-and-sufficiency loop.
//!
//! One URL at a time: fetch readable text, ask the model whether it answers
//! the query, stop on the first sufficient verdict or after the attempt
//! budget is spent. Collaborator failures are absorbed at the per-URL
//! boundary; the loop itself only errors on invalid arguments.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use webmind_common::WebMindError;

use crate::judge::CompletionModel;
use crate::prompts;
use crate::scraper::PageFetcher;
use crate::verdict::{parse_verdict, Verdict};

// --- StatusSink ---

/// Observability hook for per-transition progress messages. Fire-and-forget:
/// the signature is infallible so a sink can never abort the session.
pub trait StatusSink: Send + Sync {
    fn notify(&self, message: &str);
}

/// Default sink that mirrors progress into the log.
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn notify(&self, message: &str) {
        info!("{message}");
    }
}

// --- Results ---

/// Terminal state of one session. Constructed exactly once, at loop exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A page answered the query. `answer` already carries the source
    /// attribution suffix.
    Answered { answer: String, source_url: String },
    /// Budget consumed without a sufficient verdict.
    Exhausted { tried: usize },
    /// The search provider supplied zero URLs; no attempts were made.
    NoCandidates,
    /// The cancellation flag was set before an iteration started.
    Cancelled { tried: usize },
}

impl SessionOutcome {
    /// Human-readable form shown to the user.
    pub fn message(&self) -> String {
        match self {
            SessionOutcome::Answered { answer, .. } => answer.clone(),
            SessionOutcome::Exhausted { tried } => {
                format!("Could not find a sufficient answer after trying {tried} URL(s).")
            }
            SessionOutcome::NoCandidates => {
                "Could not find any relevant web pages for the query.".to_string()
            }
            SessionOutcome::Cancelled { tried } => {
                format!("Search cancelled after trying {tried} URL(s).")
            }
        }
    }
}

/// Outcome plus the ordered list of URLs actually attempted, always returned
/// for diagnostic display regardless of how the session ended.
#[derive(Debug)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub tried_urls: Vec<String>,
}

// --- SearchSession ---

pub struct SearchSession {
    fetcher: Box<dyn PageFetcher>,
    model: Box<dyn CompletionModel>,
    /// Max characters of scraped text per judge call, keyed off the active
    /// model by the caller.
    context_cap: usize,
    cancelled: Arc<AtomicBool>,
}

/// Cut `text` at `max` bytes without splitting a UTF-8 character.
fn truncate_chars(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

impl SearchSession {
    pub fn new(
        fetcher: Box<dyn PageFetcher>,
        model: Box<dyn CompletionModel>,
        context_cap: usize,
    ) -> Self {
        Self {
            fetcher,
            model,
            context_cap,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked at the top of each per-URL iteration. Setting it makes
    /// the session exit with [`SessionOutcome::Cancelled`].
    pub fn cancellation_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Run the loop over `candidates[..min(budget, len)]`, strictly in
    /// order, each URL attempted at most once. Errors only on a zero
    /// budget; every collaborator failure is converted into a status notice
    /// and a continuation.
    pub async fn run(
        &self,
        query: &str,
        candidates: &[String],
        budget: usize,
        sink: &dyn StatusSink,
    ) -> Result<SessionReport, WebMindError> {
        if budget == 0 {
            return Err(WebMindError::InvalidBudget(budget));
        }

        if candidates.is_empty() {
            sink.notify("No candidate URLs to try.");
            return Ok(SessionReport {
                outcome: SessionOutcome::NoCandidates,
                tried_urls: Vec::new(),
            });
        }

        let mut tried_urls: Vec<String> = Vec::new();

        for (attempt, url) in candidates.iter().take(budget).enumerate() {
            if self.cancelled.load(Ordering::Relaxed) {
                info!(tried = tried_urls.len(), "Session cancelled");
                return Ok(SessionReport {
                    outcome: SessionOutcome::Cancelled {
                        tried: tried_urls.len(),
                    },
                    tried_urls,
                });
            }

            // Recorded before the fetch so failures still count toward the
            // budget and show up in the diagnostic trail.
            tried_urls.push(url.clone());
            sink.notify(&format!(
                "Attempt {}/{budget}: Trying URL: {url}",
                attempt + 1
            ));

            sink.notify("  ↳ Scraping content...");
            let scraped_text = match self.fetcher.fetch(url).await {
                Ok(text) if text.trim().is_empty() => {
                    sink.notify(&format!("  ↳ ⚠️ No valid content obtained from {url}."));
                    continue;
                }
                Ok(text) => {
                    sink.notify(&format!(
                        "  ↳ ✅ Scraping successful (content length: {}).",
                        text.len()
                    ));
                    text
                }
                Err(err) => {
                    warn!(url = url.as_str(), error = %err, "Fetch failed");
                    sink.notify(&format!("  ↳ ❌ Error during scraping for {url}: {err}"));
                    continue;
                }
            };

            sink.notify("  ↳ Analyzing content for sufficiency...");
            let prompt = prompts::sufficiency_prompt(
                query,
                url,
                truncate_chars(&scraped_text, self.context_cap),
            );
            let reply = match self.model.complete(&prompt).await {
                Ok(reply) => reply,
                Err(err) => {
                    warn!(url = url.as_str(), error = %err, "Judge call failed");
                    sink.notify(&format!("  ↳ ❌ Error during AI analysis for {url}: {err}"));
                    continue;
                }
            };

            match parse_verdict(&reply) {
                Verdict::Sufficient(answer) => {
                    sink.notify(&format!("  ↳ ✅ Found sufficient answer from {url}."));
                    let answer = format!("{answer}\n\n---\n*Source: {url}*");
                    return Ok(SessionReport {
                        outcome: SessionOutcome::Answered {
                            answer,
                            source_url: url.clone(),
                        },
                        tried_urls,
                    });
                }
                Verdict::Insufficient => {
                    sink.notify(&format!(
                        "  ↳ ℹ️ Content from {url} deemed insufficient by AI."
                    ));
                }
            }
        }

        let tried = tried_urls.len();
        sink.notify(&format!(
            "🏁 Could not find a sufficient answer after trying {tried} URL(s)."
        ));
        Ok(SessionReport {
            outcome: SessionOutcome::Exhausted { tried },
            tried_urls,
        })
    }

    /// Ask the model for a short explanation of why the session exhausted.
    /// Purely cosmetic: any failure degrades to `None` and never changes
    /// the session outcome.
    pub async fn summarize_failure(&self, query: &str, tried_urls: &[String]) -> Option<String> {
        let prompt = prompts::failure_summary_prompt(query, tried_urls);
        match self.model.complete(&prompt).await {
            Ok(summary) => Some(summary),
            Err(err) => {
                warn!(error = %err, "Failure summary generation failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockFetcher, MockModel, RecordingSink};

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn session(fetcher: MockFetcher, model: MockModel) -> SearchSession {
        SearchSession::new(Box::new(fetcher), Box::new(model), 15_000)
    }

    #[tokio::test]
    async fn success_on_first_try() {
        let fetcher = MockFetcher::new().with_page("https://a.example", "France facts");
        let model = MockModel::new().with_reply("Final Answer: Paris");
        let sink = RecordingSink::new();

        let report = session(fetcher, model)
            .run("capital of France", &urls(&["https://a.example"]), 5, &sink)
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            SessionOutcome::Answered {
                answer: "Paris\n\n---\n*Source: https://a.example*".to_string(),
                source_url: "https://a.example".to_string(),
            }
        );
        assert_eq!(report.tried_urls, urls(&["https://a.example"]));
    }

    #[tokio::test]
    async fn exhaustion_after_all_insufficient() {
        let fetcher = MockFetcher::new()
            .with_page("https://a.example", "text a")
            .with_page("https://b.example", "text b");
        let model = MockModel::new()
            .with_reply("Insufficient context")
            .with_reply("Insufficient context");
        let sink = RecordingSink::new();

        let report = session(fetcher, model)
            .run(
                "q",
                &urls(&["https://a.example", "https://b.example"]),
                2,
                &sink,
            )
            .await
            .unwrap();

        assert_eq!(report.outcome, SessionOutcome::Exhausted { tried: 2 });
        assert_eq!(
            report.tried_urls,
            urls(&["https://a.example", "https://b.example"])
        );
        assert!(sink
            .messages()
            .iter()
            .any(|m| m.contains("after trying 2 URL(s)")));
    }

    #[tokio::test]
    async fn empty_candidate_list_is_distinct_from_exhaustion() {
        let fetcher = MockFetcher::new();
        let model = MockModel::new();
        let sink = RecordingSink::new();

        let report = session(fetcher, model).run("q", &[], 5, &sink).await.unwrap();

        assert_eq!(report.outcome, SessionOutcome::NoCandidates);
        assert!(report.tried_urls.is_empty());
    }

    #[tokio::test]
    async fn mixed_failures_do_not_stop_the_loop() {
        let fetcher = MockFetcher::new()
            .with_error("https://a.example", "connection refused")
            .with_page("https://b.example", "text b")
            .with_page("https://c.example", "text c");
        // First model call (for b) errors, second (for c) answers.
        let model = MockModel::new()
            .with_error("model overloaded")
            .with_reply("Final Answer: Found it");
        let sink = RecordingSink::new();

        let candidates = urls(&["https://a.example", "https://b.example", "https://c.example"]);
        let report = session(fetcher, model)
            .run("q", &candidates, 3, &sink)
            .await
            .unwrap();

        match report.outcome {
            SessionOutcome::Answered { source_url, .. } => {
                assert_eq!(source_url, "https://c.example");
            }
            other => panic!("expected Answered, got {other:?}"),
        }
        assert_eq!(report.tried_urls, candidates);
    }

    #[tokio::test]
    async fn budget_caps_attempts() {
        let fetcher = MockFetcher::new()
            .with_page("https://a.example", "a")
            .with_page("https://b.example", "b");
        let model = MockModel::new()
            .with_reply("Insufficient context")
            .with_reply("Insufficient context");
        let sink = RecordingSink::new();

        let candidates = urls(&[
            "https://a.example",
            "https://b.example",
            "https://c.example",
            "https://d.example",
        ]);
        let report = session(fetcher, model)
            .run("q", &candidates, 2, &sink)
            .await
            .unwrap();

        assert_eq!(report.outcome, SessionOutcome::Exhausted { tried: 2 });
        assert_eq!(report.tried_urls, candidates[..2].to_vec());
    }

    #[tokio::test]
    async fn early_exit_stops_all_further_calls() {
        let fetcher = MockFetcher::new()
            .with_page("https://a.example", "a")
            .with_page("https://b.example", "b");
        let model = MockModel::new().with_reply("Final Answer: done");
        let sink = RecordingSink::new();

        let fetch_log = fetcher.call_log();
        let model_calls = model.call_count();

        let report = session(fetcher, model)
            .run(
                "q",
                &urls(&["https://a.example", "https://b.example"]),
                5,
                &sink,
            )
            .await
            .unwrap();

        assert!(matches!(report.outcome, SessionOutcome::Answered { .. }));
        assert_eq!(report.tried_urls, urls(&["https://a.example"]));
        assert_eq!(*fetch_log.lock().unwrap(), urls(&["https://a.example"]));
        assert_eq!(model_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn whitespace_only_content_skips_the_judge() {
        let fetcher = MockFetcher::new()
            .with_page("https://a.example", "   \n\t ")
            .with_page("https://b.example", "real text");
        let model = MockModel::new().with_reply("Final Answer: from b");
        let sink = RecordingSink::new();

        let model_calls = model.call_count();

        let report = session(fetcher, model)
            .run(
                "q",
                &urls(&["https://a.example", "https://b.example"]),
                5,
                &sink,
            )
            .await
            .unwrap();

        match report.outcome {
            SessionOutcome::Answered { source_url, .. } => {
                assert_eq!(source_url, "https://b.example");
            }
            other => panic!("expected Answered, got {other:?}"),
        }
        assert_eq!(
            report.tried_urls,
            urls(&["https://a.example", "https://b.example"])
        );
        // The empty page never reached the model.
        assert_eq!(model_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_reply_counts_as_insufficient() {
        let fetcher = MockFetcher::new().with_page("https://a.example", "a");
        let model = MockModel::new().with_reply("I think the answer is 5");
        let sink = RecordingSink::new();

        let report = session(fetcher, model)
            .run("q", &urls(&["https://a.example"]), 5, &sink)
            .await
            .unwrap();

        assert_eq!(report.outcome, SessionOutcome::Exhausted { tried: 1 });
    }

    #[tokio::test]
    async fn zero_budget_is_rejected_before_the_loop() {
        let fetcher = MockFetcher::new().with_page("https://a.example", "a");
        let model = MockModel::new();
        let sink = RecordingSink::new();

        let err = session(fetcher, model)
            .run("q", &urls(&["https://a.example"]), 0, &sink)
            .await
            .unwrap_err();

        assert!(matches!(err, WebMindError::InvalidBudget(0)));
    }

    #[tokio::test]
    async fn cancellation_before_start_tries_nothing() {
        let fetcher = MockFetcher::new().with_page("https://a.example", "a");
        let model = MockModel::new();
        let sink = RecordingSink::new();

        let s = session(fetcher, model);
        s.cancellation_handle()
            .store(true, std::sync::atomic::Ordering::Relaxed);

        let report = s
            .run("q", &urls(&["https://a.example"]), 5, &sink)
            .await
            .unwrap();

        assert_eq!(report.outcome, SessionOutcome::Cancelled { tried: 0 });
        assert!(report.tried_urls.is_empty());
    }

    #[tokio::test]
    async fn cancellation_between_iterations() {
        let fetcher = MockFetcher::new()
            .with_page("https://a.example", "a")
            .with_page("https://b.example", "b");
        let model = MockModel::new().with_reply("Insufficient context");
        let sink = RecordingSink::new();

        let s = session(fetcher, model);
        let flag = s.cancellation_handle();

        // Cancel as soon as the first attempt is announced; the check at
        // the top of iteration two turns this into a Cancelled exit.
        struct CancelAfterFirstAttempt {
            flag: Arc<AtomicBool>,
            inner: RecordingSink,
        }
        impl StatusSink for CancelAfterFirstAttempt {
            fn notify(&self, message: &str) {
                if message.starts_with("Attempt 1/") {
                    self.flag.store(true, Ordering::Relaxed);
                }
                self.inner.notify(message);
            }
        }
        let cancelling_sink = CancelAfterFirstAttempt { flag, inner: sink };

        let report = s
            .run(
                "q",
                &urls(&["https://a.example", "https://b.example"]),
                5,
                &cancelling_sink,
            )
            .await
            .unwrap();

        assert_eq!(report.outcome, SessionOutcome::Cancelled { tried: 1 });
        assert_eq!(report.tried_urls, urls(&["https://a.example"]));
    }

    #[tokio::test]
    async fn judge_sees_truncated_text() {
        let fetcher = MockFetcher::new().with_page("https://a.example", &"x".repeat(500));
        let model = MockModel::new().with_reply("Insufficient context");
        let prompts = model.prompt_log();

        let s = SearchSession::new(Box::new(fetcher), Box::new(model), 100);
        s.run("q", &urls(&["https://a.example"]), 1, &RecordingSink::new())
            .await
            .unwrap();

        let sent = prompts.lock().unwrap();
        assert!(sent[0].contains(&"x".repeat(100)));
        assert!(!sent[0].contains(&"x".repeat(101)));
    }

    #[tokio::test]
    async fn failure_summary_degrades_to_none_on_error() {
        let model_err = MockModel::new().with_error("down");
        let s = SearchSession::new(Box::new(MockFetcher::new()), Box::new(model_err), 100);
        assert!(s
            .summarize_failure("q", &urls(&["https://a.example"]))
            .await
            .is_none());

        let model_ok = MockModel::new().with_reply("The query was too niche.");
        let s = SearchSession::new(Box::new(MockFetcher::new()), Box::new(model_ok), 100);
        assert_eq!(
            s.summarize_failure("q", &urls(&["https://a.example"])).await,
            Some("The query was too niche.".to_string())
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // 'é' is two bytes; a cut landing inside it backs off.
        let s = "aéé";
        assert_eq!(truncate_chars(s, 2), "a");
        assert_eq!(truncate_chars(s, 3), "aé");
        assert_eq!(truncate_chars("", 5), "");
    }
}
