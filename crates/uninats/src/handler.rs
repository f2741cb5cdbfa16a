use crate::codec::TypedMessage;

use std::error::Error as StdError;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uninats_transport::Headers;

/// What a handler knows about the request it is serving.
#[derive(Clone, Debug)]
pub struct RequestContext {
    /// Concrete subject the request arrived on.
    pub subject: String,

    /// Reply destination, if the sender expects a response.
    pub reply: Option<String>,

    /// Headers sent with the request.
    pub headers: Headers,

    /// Cancelled when the registration is stopped or the client closes.
    pub cancellation: CancellationToken,
}

/// Serves requests registered with [`crate::Client::reply`].
#[async_trait]
pub trait ReplyHandler
where
    Self: Clone + Send + Sync + 'static,
{
    /// Request type.
    type Request: TypedMessage;

    /// Response type.
    type Response: TypedMessage;

    /// Error type.
    type Error: StdError + Send + Sync + 'static;

    /// Handles one request.
    async fn handle(
        &self,
        context: RequestContext,
        request: Self::Request,
    ) -> Result<Self::Response, Self::Error>;
}

/// A [`ReplyHandler`] built from an async closure. See [`reply_fn`].
pub struct ReplyFn<F, Req> {
    f: F,
    _marker: PhantomData<fn(Req)>,
}

/// Wraps an async closure as a [`ReplyHandler`].
pub fn reply_fn<F, Fut, Req, Res, E>(f: F) -> ReplyFn<F, Req>
where
    F: Fn(RequestContext, Req) -> Fut,
    Fut: Future<Output = Result<Res, E>>,
{
    ReplyFn {
        f,
        _marker: PhantomData,
    }
}

impl<F: Clone, Req> Clone for ReplyFn<F, Req> {
    fn clone(&self) -> Self {
        Self {
            f: self.f.clone(),
            _marker: PhantomData,
        }
    }
}

impl<F, Req> Debug for ReplyFn<F, Req> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyFn").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut, Req, Res, E> ReplyHandler for ReplyFn<F, Req>
where
    F: Fn(RequestContext, Req) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Res, E>> + Send + 'static,
    Req: TypedMessage,
    Res: TypedMessage,
    E: StdError + Send + Sync + 'static,
{
    type Request = Req;
    type Response = Res;
    type Error = E;

    async fn handle(&self, context: RequestContext, request: Req) -> Result<Res, E> {
        (self.f)(context, request).await
    }
}
