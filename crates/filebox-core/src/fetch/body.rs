//! Response body as a `ByteStream` with inter-byte timeout and cancellation.

use std::time::Duration;

use bytes::Bytes;
use futures_util::stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::transfer::{AbortOnDrop, Event};
use crate::error::{FileBoxError, Result};
use crate::stream::ByteStream;

struct BodyState {
    rx: mpsc::Receiver<Event>,
    abort: AbortOnDrop,
    expected: Option<u64>,
    received: u64,
    response_timeout: Duration,
    cancel: CancellationToken,
    done: bool,
}

enum Next {
    Cancelled,
    Stalled,
    Event(Option<Event>),
}

impl BodyState {
    /// Ends the stream with `err` and stops the transfer.
    fn fail(&mut self, err: FileBoxError) -> Option<Result<Bytes>> {
        self.done = true;
        self.abort.0.raise();
        Some(Err(err))
    }

    async fn step(&mut self) -> Option<Result<Bytes>> {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Next::Cancelled,
                ev = tokio::time::timeout(self.response_timeout, self.rx.recv()) => match ev {
                    Ok(ev) => Next::Event(ev),
                    Err(_) => Next::Stalled,
                },
            };

            return match next {
                Next::Cancelled => self.fail(FileBoxError::Cancelled),
                Next::Stalled => self.fail(FileBoxError::ResponseTimeout(self.response_timeout)),
                Next::Event(Some(Event::Data(data))) => {
                    self.received += data.len() as u64;
                    Some(Ok(data))
                }
                // A late head cannot happen after the first one; skip it.
                Next::Event(Some(Event::Head(_))) => continue,
                Next::Event(Some(Event::Done(Ok(())))) => {
                    self.done = true;
                    match self.expected {
                        Some(expected) if expected != self.received => {
                            Some(Err(FileBoxError::IncompleteBody {
                                expected,
                                received: self.received,
                            }))
                        }
                        _ => None,
                    }
                }
                Next::Event(Some(Event::Done(Err(e)))) => match self.expected {
                    Some(expected) if e.is_partial_file() => self.fail(FileBoxError::IncompleteBody {
                        expected,
                        received: self.received,
                    }),
                    _ => self.fail(FileBoxError::Transport(e)),
                },
                Next::Event(None) => self.fail(FileBoxError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "transfer thread ended without reporting",
                ))),
            };
        }
    }
}

/// Wrap the remaining transfer events as a body stream.
///
/// `expected` is the announced body length; a mismatch at the end of the
/// transfer becomes `IncompleteBody`.
pub(super) fn body_stream(
    rx: mpsc::Receiver<Event>,
    abort: AbortOnDrop,
    expected: Option<u64>,
    response_timeout: Duration,
    cancel: CancellationToken,
) -> ByteStream {
    let state = BodyState {
        rx,
        abort,
        expected,
        received: 0,
        response_timeout,
        cancel,
        done: false,
    };
    Box::pin(stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }
        let item = st.step().await?;
        Some((item, st))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::transfer::AbortFlag;
    use futures_util::StreamExt;

    fn setup(
        expected: Option<u64>,
        timeout: Duration,
    ) -> (mpsc::Sender<Event>, ByteStream, CancellationToken, AbortFlag) {
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let flag = AbortFlag::default();
        let body = body_stream(
            rx,
            AbortOnDrop(flag.clone()),
            expected,
            timeout,
            cancel.clone(),
        );
        (tx, body, cancel, flag)
    }

    #[tokio::test]
    async fn delivers_data_then_ends() {
        let (tx, mut body, _, _) = setup(Some(5), Duration::from_secs(5));
        tx.send(Event::Data(Bytes::from_static(b"hel"))).await.unwrap();
        tx.send(Event::Data(Bytes::from_static(b"lo"))).await.unwrap();
        tx.send(Event::Done(Ok(()))).await.unwrap();
        assert_eq!(body.next().await.unwrap().unwrap(), Bytes::from_static(b"hel"));
        assert_eq!(body.next().await.unwrap().unwrap(), Bytes::from_static(b"lo"));
        assert!(body.next().await.is_none());
    }

    #[tokio::test]
    async fn short_body_is_an_error() {
        let (tx, mut body, _, _) = setup(Some(10), Duration::from_secs(5));
        tx.send(Event::Data(Bytes::from_static(b"abc"))).await.unwrap();
        tx.send(Event::Done(Ok(()))).await.unwrap();
        body.next().await.unwrap().unwrap();
        match body.next().await.unwrap() {
            Err(FileBoxError::IncompleteBody { expected, received }) => {
                assert_eq!((expected, received), (10, 3));
            }
            other => panic!("expected IncompleteBody, got {:?}", other),
        }
        assert!(body.next().await.is_none());
    }

    #[tokio::test]
    async fn stall_raises_response_timeout_and_aborts() {
        let (tx, mut body, _, flag) = setup(None, Duration::from_millis(50));
        tx.send(Event::Data(Bytes::from_static(b"first"))).await.unwrap();
        assert!(body.next().await.unwrap().is_ok());
        assert!(matches!(
            body.next().await.unwrap(),
            Err(FileBoxError::ResponseTimeout(_))
        ));
        assert!(flag.is_raised());
        assert!(body.next().await.is_none());
        drop(tx);
    }

    #[tokio::test]
    async fn cancellation_wins_over_pending_data() {
        let (tx, mut body, cancel, _) = setup(None, Duration::from_secs(5));
        tx.send(Event::Data(Bytes::from_static(b"x"))).await.unwrap();
        cancel.cancel();
        assert!(matches!(body.next().await.unwrap(), Err(FileBoxError::Cancelled)));
        assert!(body.next().await.is_none());
    }
}
