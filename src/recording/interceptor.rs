//! Body interceptor that copies every delivered chunk into a capture buffer

use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use hyper::body::{Body, Frame, SizeHint};

use crate::{ReelError, Result};

#[derive(Debug, Default)]
struct CaptureState {
    buffer: BytesMut,
    complete: bool,
}

/// Handle to the bytes captured by a [`RecordingBody`]
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct BodyCapture {
    state: Arc<Mutex<CaptureState>>,
}

impl BodyCapture {
    /// The captured body
    ///
    /// # Errors
    ///
    /// Returns `BodyNotYetDelivered` until the wrapped body has signalled its end
    pub fn value(&self) -> Result<Bytes> {
        let state = self.lock();
        if !state.complete {
            return Err(ReelError::BodyNotYetDelivered);
        }
        Ok(state.buffer.clone().freeze())
    }

    /// Bytes captured so far, whether or not delivery has finished
    ///
    /// A consumer may stop reading a body early, e.g. a server that answers before
    /// draining an upload; this returns what reached it.
    #[must_use]
    pub fn captured(&self) -> Bytes {
        self.lock().buffer.clone().freeze()
    }

    /// Whether the wrapped body has been delivered to the end
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.lock().complete
    }

    /// Bytes captured so far
    #[must_use]
    pub fn captured_len(&self) -> usize {
        self.lock().buffer.len()
    }

    fn record(&self, data: &Bytes) {
        self.lock().buffer.extend_from_slice(data);
    }

    fn finish(&self) {
        self.lock().complete = true;
    }

    fn lock(&self) -> MutexGuard<'_, CaptureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Body wrapper that duplicates each data frame into a [`BodyCapture`]
///
/// Frames, size hints and errors of the wrapped body pass through untouched. The
/// capture completes only when the wrapped body reports its end, so a body that fails
/// or is dropped midway never yields a value. Use one wrapper per delivery attempt.
pub struct RecordingBody<B> {
    inner: B,
    capture: BodyCapture,
}

impl<B: Body> RecordingBody<B> {
    /// Wrap `inner`, returning the wrapper and a handle to its capture
    pub fn new(inner: B) -> (Self, BodyCapture) {
        let capture = BodyCapture::default();
        // Consumers may skip polling a body that is already at its end.
        if inner.is_end_stream() {
            capture.finish();
        }
        let body = Self {
            inner,
            capture: capture.clone(),
        };
        (body, capture)
    }
}

impl<B> Body for RecordingBody<B>
where
    B: Body<Data = Bytes> + Unpin,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<std::result::Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.capture.record(data);
                }
                if this.inner.is_end_stream() {
                    this.capture.finish();
                }
            }
            Poll::Ready(None) => this.capture.finish(),
            Poll::Ready(Some(Err(_))) | Poll::Pending => {}
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use http_body_util::{BodyExt, Empty, Full, StreamBody};

    const LOREM_IPSUM: &str = "Iliquiscipis laortie issendiam.  Aciliqu eniscip nostra nostie \
        etueratem primis dolor pellentesque nulla; consed nostie nullut \
        modionsed adio numsandre.  Curae mattis nullute nostra laortieisse \
        maecenas utateismodi niscidu dionse.";

    #[tokio::test]
    async fn test_full_body_passes_through_and_is_captured() {
        let (body, capture) = RecordingBody::new(Full::new(Bytes::from_static(LOREM_IPSUM.as_bytes())));
        assert_eq!(body.size_hint().exact(), Some(LOREM_IPSUM.len() as u64));

        let delivered = body.collect().await.unwrap().to_bytes();

        assert_eq!(delivered, LOREM_IPSUM.as_bytes());
        assert_eq!(capture.value().unwrap(), LOREM_IPSUM.as_bytes());
    }

    #[tokio::test]
    async fn test_chunked_body_is_captured_in_order() {
        let chunks = vec![
            Ok::<_, std::io::Error>(Frame::data(Bytes::from_static(b"hel"))),
            Ok(Frame::data(Bytes::from_static(b"lo"))),
        ];
        let (body, capture) = RecordingBody::new(StreamBody::new(stream::iter(chunks)));

        assert!(matches!(capture.value(), Err(ReelError::BodyNotYetDelivered)));

        let delivered = body.collect().await.unwrap().to_bytes();
        assert_eq!(delivered, Bytes::from_static(b"hello"));
        assert_eq!(capture.value().unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_errors_pass_through_and_leave_capture_incomplete() {
        let chunks = vec![
            Ok(Frame::data(Bytes::from_static(b"partial"))),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let (body, capture) = RecordingBody::new(StreamBody::new(stream::iter(chunks)));

        let err = body.collect().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionReset);
        assert_eq!(capture.captured_len(), 7);
        assert_eq!(capture.captured(), Bytes::from_static(b"partial"));
        assert!(matches!(capture.value(), Err(ReelError::BodyNotYetDelivered)));
    }

    #[test]
    fn test_empty_body_is_complete_immediately() {
        let (_body, capture) = RecordingBody::new(Empty::<Bytes>::new());

        assert!(capture.is_complete());
        assert!(capture.value().unwrap().is_empty());
    }

    #[test]
    fn test_dropped_body_never_completes() {
        let (body, capture) = RecordingBody::new(Full::new(Bytes::from_static(b"unread")));
        drop(body);

        assert!(!capture.is_complete());
        assert!(capture.captured().is_empty());
        assert!(matches!(capture.value(), Err(ReelError::BodyNotYetDelivered)));
    }
}
