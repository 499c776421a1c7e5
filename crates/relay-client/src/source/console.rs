//! Interactive command source reading one command per line.

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::{Command, CommandSource, SourceError};

const PROMPT: &str = "relay> ";

/// Reads commands from a line-oriented input and prints results.
///
/// Blank lines are skipped; end of input ends the session.
#[derive(Debug)]
pub struct ConsoleSource<R, W> {
    input: R,
    output: W,
    line: String,
}

impl ConsoleSource<BufReader<io::Stdin>, io::Stdout> {
    /// Console bound to the process's standard input and output.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R, W> ConsoleSource<R, W> {
    /// Console over arbitrary streams.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            line: String::new(),
        }
    }

    /// Consumes the console, returning the output stream.
    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R, W> CommandSource for ConsoleSource<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn next(&mut self) -> Result<Option<Command>, SourceError> {
        loop {
            self.output
                .write_all(PROMPT.as_bytes())
                .await
                .map_err(SourceError::Output)?;
            self.output.flush().await.map_err(SourceError::Output)?;

            self.line.clear();
            let read = self
                .input
                .read_line(&mut self.line)
                .await
                .map_err(SourceError::Input)?;
            if read == 0 {
                return Ok(None);
            }
            let text = self.line.trim();
            if !text.is_empty() {
                return Ok(Some(Command::classify(text)));
            }
        }
    }

    async fn deliver(&mut self, result: &str) -> Result<(), SourceError> {
        self.output
            .write_all(result.as_bytes())
            .await
            .map_err(SourceError::Output)?;
        self.output
            .write_all(b"\n")
            .await
            .map_err(SourceError::Output)?;
        self.output.flush().await.map_err(SourceError::Output)
    }
}
