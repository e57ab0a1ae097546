//! A stream wrapper that runs cleanup exactly once when the stream is
//! dropped -- used so an SSE connection's session is terminated and its
//! registry entry removed the moment the client disconnects, regardless of
//! which poll that happens on.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use pin_project_lite::pin_project;

pin_project! {
    pub struct GuardedStream<S, G: Cleanup> {
        #[pin]
        inner: S,
        guard: Option<G>,
    }
}

pub trait Cleanup {
    fn cleanup(&mut self);
}

impl<S, G: Cleanup> GuardedStream<S, G> {
    pub fn new(inner: S, guard: G) -> Self {
        Self { inner, guard: Some(guard) }
    }
}

impl<S: Stream, G: Cleanup> Stream for GuardedStream<S, G> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }
}

impl<S, G: Cleanup> Drop for GuardedStream<S, G> {
    fn drop(&mut self) {
        if let Some(mut guard) = self.guard.take() {
            guard.cleanup();
        }
    }
}
