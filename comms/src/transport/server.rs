use tokio::net::{tcp::OwnedWriteHalf, TcpStream};

use crate::{command, event};

use super::common::{json_lines, BoxedStream, JsonLineWriter};

/// [CommandStream] is a stream of [crate::command::UserCommand]s sent by the client
///
/// A line that is not a valid command yields an `Err` item, the stream keeps going afterwards.
///
/// # Cancel Safety
///
/// This stream is cancel-safe, meaning that it can be used in [tokio::select!]
/// without the risk of missing commands.
pub type CommandStream = BoxedStream<anyhow::Result<command::UserCommand>>;

/// [EventWriter] is a wrapper around a [TcpStream] which writes [crate::event::Event]s to the client
pub struct EventWriter {
    inner: JsonLineWriter<OwnedWriteHalf>,
}

impl EventWriter {
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self {
            inner: JsonLineWriter::new(writer),
        }
    }

    /// Send a [crate::event::Event] to the backing [TcpStream]
    ///
    /// # Cancel Safety
    ///
    /// This method is not cancellation safe. If it is used as the event
    /// in a [tokio::select!] statement and some other
    /// branch completes first, then the provided [crate::event::Event] may have been
    /// partially written, but future calls to `write` will start over
    /// from the beginning of the buffer. Causing undefined behaviour.
    pub async fn write(&mut self, event: &event::Event) -> anyhow::Result<()> {
        self.inner.write(event).await
    }
}

/// Splits a TCP stream into a stream of commands and an event writer.
///
/// # Arguments
///
/// - `stream` - A [TcpStream] to split
pub fn split_tcp_stream(stream: TcpStream) -> (CommandStream, EventWriter) {
    let (reader, writer) = stream.into_split();

    (json_lines(reader, "client"), EventWriter::new(writer))
}
