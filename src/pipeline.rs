use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, instrument};

use crate::console::{Console, ConsoleError};
use crate::utils::openai_chat::{ChatCompleter, ChatCompletionError, ChatRequest};
use crate::utils::pdf::{DocumentTextSource, PdfError};
use crate::utils::prompts::{evaluation_prompt, summary_prompt};

pub const PATH_PROMPT: &str = "Enter the path to the PDF file: ";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No PDF path provided.")]
    EmptyPath,

    #[error(transparent)]
    Console(#[from] ConsoleError),

    #[error(transparent)]
    Extraction(#[from] PdfError),

    #[error("summarization request failed")]
    Summarize(#[source] ChatCompletionError),

    #[error("evaluation request failed")]
    Evaluate(#[source] ChatCompletionError),
}

/// Model output for one document. The evaluation is kept as free-form text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub summary: String,
    pub evaluation: String,
}

/// Linear driver: path, extraction, summary, self-evaluation, output.
pub struct Pipeline<S, C> {
    source: S,
    client: C,
    model: String,
}

impl<S, C> Pipeline<S, C>
where
    S: DocumentTextSource,
    C: ChatCompleter,
{
    pub fn new(source: S, client: C, model: impl Into<String>) -> Self {
        Self {
            source,
            client,
            model: model.into(),
        }
    }

    /// Runs the whole interactive flow. Output is only written once both model calls succeed.
    pub async fn run<R, W>(&self, console: &mut Console<R, W>) -> Result<Report, PipelineError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let path = read_path(console).await?;
        let report = self.process(&path).await?;
        console.write_report(&report).await?;
        Ok(report)
    }

    /// Extracts, summarizes and evaluates the document at `path`.
    #[instrument(skip(self), fields(model = %self.model))]
    pub async fn process(&self, path: &Path) -> Result<Report, PipelineError> {
        let text = self.source.extract_text(path)?;
        info!("Extracted {} characters of text", text.chars().count());

        let summary = self.summarize(&text).await?;
        info!("Summary generated ({} characters)", summary.chars().count());

        let evaluation = self.evaluate(&text, &summary).await?;
        info!("Evaluation generated ({} characters)", evaluation.chars().count());

        Ok(Report {
            summary,
            evaluation,
        })
    }

    async fn summarize(&self, text: &str) -> Result<String, PipelineError> {
        let request = ChatRequest::new(summary_prompt(text), self.model.as_str());
        self.client
            .complete(&request)
            .await
            .map_err(PipelineError::Summarize)
    }

    async fn evaluate(&self, text: &str, summary: &str) -> Result<String, PipelineError> {
        let request = ChatRequest::new(evaluation_prompt(text, summary), self.model.as_str());
        self.client
            .complete(&request)
            .await
            .map_err(PipelineError::Evaluate)
    }
}

async fn read_path<R, W>(console: &mut Console<R, W>) -> Result<PathBuf, PipelineError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let line = console.prompt_line(PATH_PROMPT).await?;
    line.map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .ok_or(PipelineError::EmptyPath)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::{SEPARATOR_BANNER, SUMMARY_BANNER, TRAILER_BANNER};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    const SENTENCE: &str = "This study examines X and finds Y.";

    #[derive(Clone, Default)]
    struct FakeSource {
        text: Option<String>,
        calls: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl FakeSource {
        fn with_text(text: &str) -> Self {
            Self {
                text: Some(text.to_string()),
                ..Self::default()
            }
        }

        fn failing() -> Self {
            Self::default()
        }

        fn calls(&self) -> Vec<PathBuf> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl DocumentTextSource for FakeSource {
        fn extract_text(&self, path: &Path) -> Result<String, PdfError> {
            self.calls.lock().unwrap().push(path.to_path_buf());
            self.text.clone().ok_or_else(|| PdfError::NotPdf {
                path: path.to_path_buf(),
            })
        }
    }

    #[derive(Clone, Default)]
    struct FakeChat {
        responses: Arc<Mutex<VecDeque<Result<String, ChatCompletionError>>>>,
        requests: Arc<Mutex<Vec<ChatRequest>>>,
    }

    impl FakeChat {
        fn replying(replies: &[&str]) -> Self {
            let chat = Self::default();
            for reply in replies {
                chat.push(Ok(reply.to_string()));
            }
            chat
        }

        fn push(&self, response: Result<String, ChatCompletionError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatCompleter for FakeChat {
        async fn complete(&self, request: &ChatRequest) -> Result<String, ChatCompletionError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ChatCompletionError::EmptyResponse))
        }
    }

    fn console(input: &'static str) -> Console<&'static [u8], Vec<u8>> {
        Console::new(input.as_bytes(), Vec::new())
    }

    #[tokio::test]
    async fn end_to_end_summarizes_then_evaluates_and_prints_in_order() {
        let source = FakeSource::with_text(SENTENCE);
        let chat = FakeChat::replying(&["Lay summary of X.", "Step 1: none.\nTrue"]);
        let pipeline = Pipeline::new(source.clone(), chat.clone(), "gpt-4o-mini");

        let mut console = console("  /papers/one-page.pdf  \n");
        let report = pipeline.run(&mut console).await.expect("pipeline");

        assert_eq!(source.calls(), vec![PathBuf::from("/papers/one-page.pdf")]);

        let requests = chat.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].user.contains(SENTENCE));
        assert_eq!(requests[0].user, summary_prompt(SENTENCE));
        assert!(requests[1].user.contains(SENTENCE));
        assert!(requests[1].user.contains("Lay summary of X."));
        for request in &requests {
            assert_eq!(request.model, "gpt-4o-mini");
            assert_eq!(request.system, "You are a helpful assistant.");
            assert_eq!(request.temperature, 0.0);
        }

        assert_eq!(report.summary, "Lay summary of X.");
        assert_eq!(report.evaluation, "Step 1: none.\nTrue");

        let written = String::from_utf8(console.into_writer()).expect("utf8");
        assert!(written.starts_with(PATH_PROMPT));
        let summary_at = written.find("Lay summary of X.").expect("summary printed");
        let evaluation_at = written.find("Step 1: none.").expect("evaluation printed");
        assert!(summary_at < evaluation_at);
        assert!(written.find(SUMMARY_BANNER).expect("banner") < summary_at);
        assert!(written.find(SEPARATOR_BANNER).expect("separator") < evaluation_at);
        assert!(written.trim_end().ends_with(TRAILER_BANNER));
    }

    #[tokio::test]
    async fn empty_path_stops_before_extraction() {
        let source = FakeSource::with_text(SENTENCE);
        let chat = FakeChat::replying(&["unused", "unused"]);
        let pipeline = Pipeline::new(source.clone(), chat.clone(), "gpt-4o-mini");

        let mut console = console("   \n");
        let err = pipeline.run(&mut console).await.expect_err("must fail");

        assert!(matches!(err, PipelineError::EmptyPath));
        assert!(source.calls().is_empty());
        assert!(chat.requests().is_empty());
    }

    #[tokio::test]
    async fn closed_input_counts_as_empty_path() {
        let source = FakeSource::with_text(SENTENCE);
        let pipeline = Pipeline::new(source.clone(), FakeChat::default(), "gpt-4o-mini");

        let err = pipeline
            .run(&mut console(""))
            .await
            .expect_err("must fail");
        assert!(matches!(err, PipelineError::EmptyPath));
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn extraction_failure_makes_no_model_request() {
        let chat = FakeChat::replying(&["unused", "unused"]);
        let pipeline = Pipeline::new(FakeSource::failing(), chat.clone(), "gpt-4o-mini");

        let mut console = console("notes.txt\n");
        let err = pipeline.run(&mut console).await.expect_err("must fail");

        assert!(matches!(err, PipelineError::Extraction(PdfError::NotPdf { .. })));
        assert!(chat.requests().is_empty());

        let written = String::from_utf8(console.into_writer()).expect("utf8");
        assert_eq!(written, PATH_PROMPT);
    }

    #[tokio::test]
    async fn summarize_failure_skips_evaluation_and_prints_nothing() {
        let chat = FakeChat::default();
        chat.push(Err(ChatCompletionError::RateLimited("slow down".to_string())));
        let pipeline = Pipeline::new(FakeSource::with_text(SENTENCE), chat.clone(), "gpt-4o-mini");

        let mut console = console("paper.pdf\n");
        let err = pipeline.run(&mut console).await.expect_err("must fail");

        assert!(matches!(
            err,
            PipelineError::Summarize(ChatCompletionError::RateLimited(_))
        ));
        assert_eq!(chat.requests().len(), 1);

        let written = String::from_utf8(console.into_writer()).expect("utf8");
        assert_eq!(written, PATH_PROMPT);
    }

    #[tokio::test]
    async fn evaluate_failure_discards_the_summary() {
        let chat = FakeChat::default();
        chat.push(Ok("A summary.".to_string()));
        chat.push(Err(ChatCompletionError::Authentication("bad key".to_string())));
        let pipeline = Pipeline::new(FakeSource::with_text(SENTENCE), chat.clone(), "gpt-4o-mini");

        let mut console = console("paper.pdf\n");
        let err = pipeline.run(&mut console).await.expect_err("must fail");

        assert!(matches!(err, PipelineError::Evaluate(_)));
        assert_eq!(chat.requests().len(), 2);

        let written = String::from_utf8(console.into_writer()).expect("utf8");
        assert!(!written.contains("A summary."));
    }

    #[tokio::test]
    async fn repeated_runs_send_identical_requests() {
        let chat = FakeChat::replying(&["S", "E", "S", "E"]);
        let pipeline = Pipeline::new(FakeSource::with_text(SENTENCE), chat.clone(), "gpt-4o-mini");

        let first = pipeline.process(Path::new("a.pdf")).await.expect("first run");
        let second = pipeline.process(Path::new("a.pdf")).await.expect("second run");

        assert_eq!(first, second);
        let requests = chat.requests();
        assert_eq!(requests[0], requests[2]);
        assert_eq!(requests[1], requests[3]);
    }
}
