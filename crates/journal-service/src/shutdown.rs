//! Draining support for the server.
//!
//! Once draining starts, new requests are answered with 503 while requests
//! already running are left to finish. [`ShutdownState::drained`] resolves
//! when the last of them is gone, which lets a sync that is halfway through
//! its writes complete before the process exits.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};

use http::{Request, Response, StatusCode};
use pin_project::pin_project;
use tokio::sync::Notify;
use tower::{Layer, Service};

#[derive(Default)]
struct Inner {
    draining: AtomicBool,
    in_flight: AtomicUsize,
    idle: Notify,
}

#[derive(Clone, Default)]
pub struct ShutdownState {
    inner: Arc<Inner>,
}

impl ShutdownState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_draining(&self) {
        self.inner.draining.store(true, Ordering::SeqCst);
        self.inner.idle.notify_waiters();
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Resolves once draining has started and no request is in flight.
    pub async fn drained(&self) {
        loop {
            let idle = self.inner.idle.notified();
            tokio::pin!(idle);
            // register before checking so a wakeup between check and await is not lost
            idle.as_mut().enable();

            if self.is_draining() && self.in_flight() == 0 {
                return;
            }
            idle.await;
        }
    }

    fn track(&self) -> InFlightGuard {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            state: self.clone(),
        }
    }
}

/// Counts one request as in flight until dropped, including when the request
/// future is cancelled by a timeout.
struct InFlightGuard {
    state: ShutdownState,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.state.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.state.inner.idle.notify_waiters();
        }
    }
}

#[derive(Clone)]
pub struct GracefulShutdownLayer {
    state: ShutdownState,
}

impl GracefulShutdownLayer {
    pub fn new(state: ShutdownState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for GracefulShutdownLayer {
    type Service = GracefulShutdownService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GracefulShutdownService {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct GracefulShutdownService<S> {
    inner: S,
    state: ShutdownState,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for GracefulShutdownService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: Default,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = GracefulShutdownFuture<S::Future, ResBody>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        if self.state.is_draining() {
            let mut response = Response::new(ResBody::default());
            *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
            return GracefulShutdownFuture {
                kind: Kind::Rejected(Some(response)),
            };
        }

        GracefulShutdownFuture {
            kind: Kind::Running {
                future: self.inner.call(req),
                _guard: self.state.track(),
            },
        }
    }
}

#[pin_project]
pub struct GracefulShutdownFuture<F, B> {
    #[pin]
    kind: Kind<F, B>,
}

#[pin_project(project = KindProj)]
enum Kind<F, B> {
    Running {
        #[pin]
        future: F,
        _guard: InFlightGuard,
    },
    Rejected(Option<Response<B>>),
}

impl<F, B, E> Future for GracefulShutdownFuture<F, B>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<B>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().kind.project() {
            KindProj::Running { future, .. } => future.poll(cx),
            KindProj::Rejected(response) => match response.take() {
                Some(response) => Poll::Ready(Ok(response)),
                None => panic!("GracefulShutdownFuture polled after completion"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Empty;
    use std::time::Duration;
    use tower::{ServiceBuilder, ServiceExt};

    /// Answers 200 after a short delay, like a handler waiting on the store.
    #[derive(Clone)]
    struct SlowService;

    impl Service<Request<Empty<Bytes>>> for SlowService {
        type Response = Response<Empty<Bytes>>;
        type Error = std::convert::Infallible;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: Request<Empty<Bytes>>) -> Self::Future {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(Response::new(Empty::new()))
            })
        }
    }

    fn request() -> Request<Empty<Bytes>> {
        Request::builder().body(Empty::new()).unwrap()
    }

    #[tokio::test]
    async fn test_requests_pass_through_before_draining() {
        let state = ShutdownState::new();
        let service = ServiceBuilder::new()
            .layer(GracefulShutdownLayer::new(state.clone()))
            .service(SlowService);

        let response = service.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_draining_rejects_new_requests() {
        let state = ShutdownState::new();
        let service = ServiceBuilder::new()
            .layer(GracefulShutdownLayer::new(state.clone()))
            .service(SlowService);

        state.begin_draining();

        let response = service.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(state.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_drained_waits_for_running_requests() {
        let state = ShutdownState::new();
        let service = ServiceBuilder::new()
            .layer(GracefulShutdownLayer::new(state.clone()))
            .service(SlowService);

        let running = tokio::spawn(service.clone().oneshot(request()));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(state.in_flight(), 1);

        state.begin_draining();
        tokio::time::timeout(Duration::from_secs(1), state.drained())
            .await
            .expect("drain should finish once the request completes");

        let response = running.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_request_is_no_longer_counted() {
        let state = ShutdownState::new();
        let service = ServiceBuilder::new()
            .layer(GracefulShutdownLayer::new(state.clone()))
            .service(SlowService);

        let cancelled =
            tokio::time::timeout(Duration::from_millis(1), service.oneshot(request())).await;
        assert!(cancelled.is_err());
        assert_eq!(state.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_drained_returns_immediately_when_idle() {
        let state = ShutdownState::new();
        state.begin_draining();
        tokio::time::timeout(Duration::from_millis(100), state.drained())
            .await
            .unwrap();
    }
}
