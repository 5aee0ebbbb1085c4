use std::pin::Pin;

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_stream::{wrappers::SplitStream, Stream, StreamExt};

pub const NEW_LINE: &[u8; 2] = b"\r\n";

pub type BoxedStream<Item> = Pin<Box<dyn Stream<Item = Item> + Send>>;

/// Turns a reader into a stream of JSON documents, one per line.
///
/// Blank lines are skipped. A line which fails to parse, including one that is
/// not valid UTF-8, yields an `Err` item but does not end the stream; only a
/// read error or EOF does. Read errors are the only items carrying a [std::io::Error].
pub fn json_lines<R, T>(reader: R, peer: &'static str) -> BoxedStream<anyhow::Result<T>>
where
    R: AsyncRead + Unpin + Send + 'static,
    T: DeserializeOwned + 'static,
{
    Box::pin(
        SplitStream::new(BufReader::new(reader).split(b'\n'))
            .filter(|line| !matches!(line, Ok(line) if line.iter().all(u8::is_ascii_whitespace)))
            .map(move |line| {
                let line =
                    line.with_context(|| format!("could not read line from the {}", peer))?;

                // serde_json checks the encoding itself, so bad bytes are a parse error
                serde_json::from_slice::<T>(&line)
                    .with_context(|| format!("failed to deserialize line from the {}", peer))
            }),
    )
}

/// Writes JSON documents terminated by [NEW_LINE]
pub struct JsonLineWriter<W: AsyncWrite + Unpin> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> JsonLineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write<T: Serialize>(&mut self, item: &T) -> anyhow::Result<()> {
        let mut serialized_bytes = serde_json::to_vec(item)?;
        serialized_bytes.extend_from_slice(NEW_LINE);

        self.writer
            .write_all(serialized_bytes.as_slice())
            .await
            .context("could not write to the tcp stream")?;

        Ok(())
    }
}
