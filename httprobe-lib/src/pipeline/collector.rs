use async_channel::Receiver;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{OutputLine, Result};

/// Write result lines in completion order until the output stream is
/// closed and drained. Returns the number of lines written.
///
/// # Errors
///
/// Fails on the first write error. The output stream is closed before
/// returning so that workers never wait on a consumer that is gone.
pub(crate) async fn collect<W>(lines: Receiver<OutputLine>, output: &mut W) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let result = write_all(&lines, output).await;
    if result.is_err() {
        lines.close();
    }
    result
}

async fn write_all<W>(lines: &Receiver<OutputLine>, output: &mut W) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while let Ok(line) = lines.recv().await {
        output.write_all(line.as_str().as_bytes()).await?;
        output.write_all(b"\n").await?;
        written += 1;
    }
    output.flush().await?;
    Ok(written)
}
