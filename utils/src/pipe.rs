use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;

/// Creates a bounded byte channel.  The producer pushes ordered chunks (or a terminal error) into the
/// sender; the consumer reads them back through the returned stream.
pub fn pipe(buffer_size: usize) -> (ChannelSender, ChannelStream) {
    let (sender, receiver) = mpsc::channel(buffer_size.max(1));
    (ChannelSender(sender), ChannelStream(receiver))
}

/// Producer half of [`pipe`].
#[derive(Debug, Clone)]
pub struct ChannelSender(mpsc::Sender<io::Result<Bytes>>);

impl ChannelSender {
    /// Sends a chunk, waiting for capacity.  Returns false once the consumer has gone away.
    pub async fn send(&self, data: Bytes) -> bool {
        self.0.send(Ok(data)).await.is_ok()
    }

    /// Delivers a terminal error to the consumer.
    pub async fn fail(&self, error: io::Error) -> bool {
        self.0.send(Err(error)).await.is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

/// Consumer half of [`pipe`]; yields chunks in the order they were sent.
#[derive(Debug)]
pub struct ChannelStream(mpsc::Receiver<io::Result<Bytes>>);

impl ChannelStream {
    pub fn reader(self) -> ChannelReader {
        StreamReader::new(self)
    }
}

impl Stream for ChannelStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.0.poll_recv(cx)
    }
}

pub type ChannelReader = StreamReader<ChannelStream, Bytes>;

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn test_channel_read_write() {
        let (sender, stream) = pipe(10);
        let mut reader = stream.reader();

        assert!(sender.send(Bytes::from_static(b"Hello, ")).await);
        assert!(sender.send(Bytes::from_static(b"World!")).await);

        // Drop sender to signal EOF
        drop(sender);

        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();

        assert_eq!(buf, b"Hello, World!");
    }

    #[tokio::test]
    async fn test_channel_error_surfaces_to_reader() {
        let (sender, stream) = pipe(2);
        let mut reader = stream.reader();

        tokio::spawn(async move {
            sender.send(Bytes::from_static(b"part")).await;
            sender.fail(io::Error::other("part 2 failed")).await;
        });

        let mut buf = Vec::new();
        let err = reader.read_to_end(&mut buf).await.unwrap_err();
        assert_eq!(err.to_string(), "part 2 failed");
        assert_eq!(buf, b"part");
    }

    #[tokio::test]
    async fn test_sender_sees_closed_consumer() {
        let (sender, stream) = pipe(1);
        drop(stream);
        assert!(sender.is_closed());
        assert!(!sender.send(Bytes::from_static(b"x")).await);
    }
}
