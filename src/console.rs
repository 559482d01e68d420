use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::debug;

use crate::pipeline::Report;

pub const SUMMARY_BANNER: &str = "-------------- Generated Summary ------------------------";
pub const SEPARATOR_BANNER: &str = "-----------------------------------------------";
pub const TRAILER_BANNER: &str =
    "-----------------------------------------------------------------------";

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("console codec error: {0}")]
    Codec(#[from] LinesCodecError),
}

/// Line-oriented interactive console over any async reader/writer pair.
pub struct Console<R, W> {
    reader: FramedRead<BufReader<R>, LinesCodec>,
    writer: FramedWrite<W, LinesCodec>,
}

impl Console<tokio::io::Stdin, tokio::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> Console<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        let reader = FramedRead::new(BufReader::new(reader), LinesCodec::new());
        let writer = FramedWrite::new(writer, LinesCodec::new());

        Self { reader, writer }
    }

    /// Writes `prompt` without a line break and reads one line back.
    /// Returns `None` at end of input.
    pub async fn prompt_line(&mut self, prompt: &str) -> Result<Option<String>, ConsoleError> {
        let out = self.writer.get_mut();
        out.write_all(prompt.as_bytes()).await?;
        out.flush().await?;

        match self.reader.next().await {
            Some(Ok(line)) => {
                debug!("Received input line ({} bytes)", line.len());
                Ok(Some(line))
            }
            Some(Err(e)) => Err(e.into()),
            None => {
                debug!("EOF reached");
                Ok(None)
            }
        }
    }

    /// Prints the summary and evaluation between the fixed banner lines.
    pub async fn write_report(&mut self, report: &Report) -> Result<(), ConsoleError> {
        let lines = [
            "",
            SUMMARY_BANNER,
            "",
            report.summary.as_str(),
            "",
            SEPARATOR_BANNER,
            "",
            report.evaluation.as_str(),
            "",
            TRAILER_BANNER,
        ];

        for line in lines {
            self.writer.feed(line).await?;
        }
        SinkExt::<&str>::flush(&mut self.writer).await?;

        Ok(())
    }

    #[cfg(test)]
    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }
}
