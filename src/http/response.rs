//! Response relay.
//!
//! The backend status and end-to-end headers are passed through and the
//! body is streamed, never collected. The body shares the attempt
//! deadline with the response head. Once the head is sent an error in
//! the body stream can only be logged.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::Response;
use axum::BoxError;
use http_body_util::BodyExt;
use hyper::body::{Body as HttpBody, Frame, SizeHint};
use thiserror::Error;
use tokio::time::{Instant, Sleep};

use crate::security::headers::strip_hop_by_hop;

/// The backend did not finish the body before the attempt deadline.
#[derive(Debug, Error)]
#[error("response body not finished within {0:?}")]
pub struct BodyDeadlineElapsed(pub Duration);

/// Body that fails once `deadline` passes before its last frame.
pub struct DeadlineBody<B> {
    inner: Pin<Box<B>>,
    sleep: Pin<Box<Sleep>>,
    budget: Duration,
    expired: bool,
}

impl<B> DeadlineBody<B> {
    pub fn new(inner: B, deadline: Instant) -> Self {
        Self {
            inner: Box::pin(inner),
            sleep: Box::pin(tokio::time::sleep_until(deadline)),
            budget: deadline.saturating_duration_since(Instant::now()),
            expired: false,
        }
    }
}

impl<B> HttpBody for DeadlineBody<B>
where
    B: HttpBody<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, BoxError>>> {
        let this = &mut *self;
        if this.expired {
            return Poll::Ready(None);
        }

        if let Poll::Ready(frame) = this.inner.as_mut().poll_frame(cx) {
            return Poll::Ready(frame.map(|res| res.map_err(Into::into)));
        }

        if this.sleep.as_mut().poll(cx).is_ready() {
            this.expired = true;
            return Poll::Ready(Some(Err(BodyDeadlineElapsed(this.budget).into())));
        }

        Poll::Pending
    }

    fn is_end_stream(&self) -> bool {
        !self.expired && self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Turn a backend response into the response sent to the caller.
///
/// The body fails with [`BodyDeadlineElapsed`] if it is still streaming
/// at `deadline`.
pub fn relay<B>(response: Response<B>, service: &str, deadline: Instant) -> Response<Body>
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);

    let service = service.to_string();
    let body = DeadlineBody::new(body, deadline).map_err(move |e| {
        tracing::warn!(service = %service, error = %e, "Error streaming response body");
        e
    });

    Response::from_parts(parts, Body::new(body))
}
