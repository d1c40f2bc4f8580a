//! Terminal-backed manual test-data entry.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;

use jit_core::{ExamplePair, OperatorPort};

/// Asks the operator on `writer` and reads answers from `reader`.
pub struct PromptOperator<R, W> {
    io: Mutex<(R, W)>,
}

pub type StdinOperator = PromptOperator<BufReader<Stdin>, Stdout>;

impl StdinOperator {
    pub fn stdio() -> Self {
        PromptOperator::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> PromptOperator<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }

    async fn ask(reader: &mut R, writer: &mut W, question: &str) -> Option<String> {
        writer.write_all(question.as_bytes()).await.ok()?;
        writer.flush().await.ok()?;
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

#[async_trait]
impl<R, W> OperatorPort for PromptOperator<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn manual_entry(&self) -> Option<ExamplePair> {
        let mut guard = self.io.lock().await;
        let (reader, writer) = &mut *guard;

        let answer = Self::ask(reader, writer, "Enter test data manually? (y/n): ").await?;
        if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            return None;
        }
        let input = Self::ask(reader, writer, "Enter example input: ").await?;
        let expected_output = Self::ask(reader, writer, "Enter expected output: ").await?;
        Some(ExamplePair::new(input, expected_output))
    }
}

/// Used with `--non-interactive`: manual entry is always declined.
pub struct DecliningOperator;

#[async_trait]
impl OperatorPort for DecliningOperator {
    async fn manual_entry(&self) -> Option<ExamplePair> {
        tracing::info!("manual entry skipped (non-interactive)");
        None
    }
}
