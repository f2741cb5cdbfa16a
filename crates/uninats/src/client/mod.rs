mod error;

use crate::codec::{self, TypedMessage};
use crate::config::ClientConfig;
use crate::fault::Fault;
use crate::handler::{ReplyHandler, RequestContext};
use crate::registration::{RegistrationTable, SubscriptionHandle};
pub use error::Error;

use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uninats_transport::{
    Acknowledgment, ERROR_CODE_HEADER, ERROR_HEADER, ErrorReply, InboundMessage,
    MESSAGE_TYPE_HEADER, OutboundMessage, PublishOptions, StreamConfig, Subject, Transport,
};

/// Code sent on the error-reply channel when a handler fails.
const HANDLER_ERROR_CODE: u16 = 500;

/// Lifecycle of a [`Client`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    /// Created but `connect` has not succeeded yet.
    Unconnected,

    /// Connected; operations reach the transport.
    Connected,

    /// Closed for good.
    Closed,
}

enum State<T> {
    Unconnected,
    Connected(T),
    Closed,
}

struct Inner<T>
where
    T: Transport,
{
    config: ClientConfig,
    options: T::Options,
    state: RwLock<State<T>>,
    registrations: Arc<Mutex<RegistrationTable>>,
    shutdown: CancellationToken,
    faults: broadcast::Sender<Fault>,
}

/// Typed publish and request/reply over a [`Transport`].
///
/// Clones share the same connection and registrations.
pub struct Client<T>
where
    T: Transport,
{
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Client<T>
where
    T: Transport,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Debug for Client<T>
where
    T: Transport,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("address", &self.inner.config.address)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<T> Client<T>
where
    T: Transport,
{
    /// Creates an unconnected client.
    #[must_use]
    pub fn new(config: ClientConfig, options: T::Options) -> Self {
        let (faults, _) = broadcast::channel(config.fault_capacity.max(1));

        Self {
            inner: Arc::new(Inner {
                config,
                options,
                state: RwLock::new(State::Unconnected),
                registrations: Arc::new(Mutex::new(RegistrationTable::default())),
                shutdown: CancellationToken::new(),
                faults,
            }),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ClientState {
        match *self.inner.state.read() {
            State::Unconnected => ClientState::Unconnected,
            State::Connected(_) => ClientState::Connected,
            State::Closed => ClientState::Closed,
        }
    }

    /// Receives faults raised while serving requests from now on.
    #[must_use]
    pub fn faults(&self) -> broadcast::Receiver<Fault> {
        self.inner.faults.subscribe()
    }

    /// Connects to the configured address. There is no retry.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyConnected` or `Closed` if the client is past
    /// `Unconnected`, and `Connection` if the transport fails.
    #[instrument(skip(self), fields(address = %self.inner.config.address))]
    pub async fn connect(&self) -> Result<(), Error<T::Error>> {
        match self.state() {
            ClientState::Unconnected => {}
            ClientState::Connected => return Err(Error::AlreadyConnected),
            ClientState::Closed => return Err(Error::Closed),
        }

        let address = self.inner.config.address.clone();
        let transport = T::connect(&address, self.inner.options.clone())
            .await
            .map_err(|source| Error::Connection { address, source })?;

        // Another caller may have connected or closed while we were dialling.
        let conflict = {
            let mut state = self.inner.state.write();
            if matches!(*state, State::Unconnected) {
                *state = State::Connected(transport.clone());
                None
            } else if matches!(*state, State::Closed) {
                Some(Error::Closed)
            } else {
                Some(Error::AlreadyConnected)
            }
        };

        if let Some(error) = conflict {
            let _ = transport.close().await;
            return Err(error);
        }

        info!("connected");

        Ok(())
    }

    /// Closes the client.
    ///
    /// Stops every reply registration and closes the transport without
    /// waiting for in-flight handlers; their replies fail as faults. Closing
    /// an already closed client does nothing.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the transport fails to close cleanly.
    #[instrument(skip(self), fields(address = %self.inner.config.address))]
    pub async fn close(&self) -> Result<(), Error<T::Error>> {
        let previous = std::mem::replace(&mut *self.inner.state.write(), State::Closed);

        self.inner.shutdown.cancel();
        let registrations = self.inner.registrations.lock().clear();
        for registration in registrations {
            registration.cancellation.cancel();
        }

        match previous {
            State::Connected(transport) => {
                transport.close().await.map_err(Error::Transport)?;
                info!("closed");
            }
            State::Unconnected | State::Closed => {}
        }

        Ok(())
    }

    /// Waits until `shutdown` is cancelled or the client is closed, then
    /// closes it.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Client::close`].
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), Error<T::Error>> {
        tokio::select! {
            () = shutdown.cancelled() => info!("shutdown requested"),
            () = self.inner.shutdown.cancelled() => {}
        }

        self.close().await
    }

    /// Creates a stream, doing nothing if one with the same name exists.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` or `Closed` outside the connected state and
    /// `Transport` if the transport rejects the stream.
    pub async fn create_stream(&self, config: StreamConfig) -> Result<(), Error<T::Error>> {
        self.create_stream_with_cancel(config, &CancellationToken::new())
            .await
    }

    /// [`Client::create_stream`], abandoned when `cancel` fires.
    ///
    /// # Errors
    ///
    /// As [`Client::create_stream`], plus `Cancelled` and `Timeout`.
    #[instrument(skip(self, config, cancel), fields(stream = %config.name))]
    pub async fn create_stream_with_cancel(
        &self,
        config: StreamConfig,
        cancel: &CancellationToken,
    ) -> Result<(), Error<T::Error>> {
        let transport = self.transport()?;

        self.guard(cancel, async {
            transport
                .create_stream(config)
                .await
                .map_err(Error::Transport)
        })
        .await
    }

    /// Publishes a message into the stream capturing `subject`.
    ///
    /// The message is encoded, tagged with its type name and handed to the
    /// transport once. `options` reach the transport unchanged.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` or `Closed` outside the connected state,
    /// `Subject` for empty or wildcard subjects, `Encode` if the message
    /// cannot be encoded (the transport is never contacted) and `Transport`
    /// if the publish fails.
    pub async fn publish<M>(
        &self,
        subject: &str,
        message: &M,
        options: &PublishOptions,
    ) -> Result<Acknowledgment, Error<T::Error>>
    where
        M: TypedMessage,
    {
        self.publish_with_cancel(subject, message, options, &CancellationToken::new())
            .await
    }

    /// [`Client::publish`], abandoned when `cancel` fires.
    ///
    /// A cancelled publish may still have been delivered.
    ///
    /// # Errors
    ///
    /// As [`Client::publish`], plus `Cancelled` and `Timeout`.
    #[instrument(skip(self, message, options, cancel), fields(message_type = %M::full_name()))]
    pub async fn publish_with_cancel<M>(
        &self,
        subject: &str,
        message: &M,
        options: &PublishOptions,
        cancel: &CancellationToken,
    ) -> Result<Acknowledgment, Error<T::Error>>
    where
        M: TypedMessage,
    {
        let transport = self.transport()?;
        let subject = Subject::publishable(subject)?;
        let payload = codec::encode_with_limit(message, transport.max_payload())?;
        let outbound =
            OutboundMessage::new(payload).with_header(MESSAGE_TYPE_HEADER, M::full_name());

        let ack = self
            .guard(cancel, async {
                transport
                    .publish(&subject, outbound, options)
                    .await
                    .map_err(Error::Transport)
            })
            .await?;

        debug!(
            stream = %ack.stream,
            sequence = ack.sequence,
            domain = %ack.domain,
            duplicate = ack.duplicate,
            "publish acknowledged"
        );

        Ok(ack)
    }

    /// Serves requests on `subject` with `handler`.
    ///
    /// Wildcard subjects are allowed. A later registration on the same subject
    /// replaces this one. Each request is handled on its own task, and its
    /// [`RequestContext::cancellation`] fires when the registration stops.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` or `Closed` outside the connected state,
    /// `Subject` for invalid subjects and `Transport` if subscribing fails.
    pub async fn reply<H>(
        &self,
        subject: &str,
        handler: H,
    ) -> Result<SubscriptionHandle, Error<T::Error>>
    where
        H: ReplyHandler,
    {
        self.reply_with_cancel(subject, handler, &CancellationToken::new())
            .await
    }

    /// [`Client::reply`], abandoned when `cancel` fires before the
    /// subscription is established.
    ///
    /// # Errors
    ///
    /// As [`Client::reply`], plus `Cancelled` and `Timeout`.
    #[instrument(skip(self, handler, cancel))]
    pub async fn reply_with_cancel<H>(
        &self,
        subject: &str,
        handler: H,
        cancel: &CancellationToken,
    ) -> Result<SubscriptionHandle, Error<T::Error>>
    where
        H: ReplyHandler,
    {
        let transport = self.transport()?;
        let subject = Subject::new(subject)?;

        let subscription = self
            .guard(cancel, async {
                transport
                    .subscribe(&subject)
                    .await
                    .map_err(Error::Transport)
            })
            .await?;

        let cancellation = self.inner.shutdown.child_token();
        let (id, replaced) = self
            .inner
            .registrations
            .lock()
            .insert(subject.clone(), cancellation.clone());

        if let Some(previous) = replaced {
            warn!(%subject, "replacing existing reply registration");
            previous.cancellation.cancel();
        }

        // A close that raced the subscribe has already cleared the table.
        if self.inner.shutdown.is_cancelled() {
            self.inner.registrations.lock().remove(&subject, id);
            cancellation.cancel();
            return Err(Error::Closed);
        }

        let dispatcher = Dispatcher {
            transport,
            handler,
            faults: self.inner.faults.clone(),
            shutdown: self.inner.shutdown.clone(),
        };

        tokio::spawn(serve::<T, H>(
            dispatcher,
            subscription,
            cancellation.clone(),
            self.inner.registrations.clone(),
            subject.clone(),
            id,
        ));

        debug!(%subject, id, "reply registered");

        Ok(SubscriptionHandle::new(subject, id, cancellation))
    }

    /// Sends a request and decodes the response as `Res`.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` or `Closed` outside the connected state,
    /// `Subject` for empty or wildcard subjects, `Encode`/`Decode` for codec
    /// failures, `Remote` if the responder sent an error reply and
    /// `Transport` if the request fails or times out.
    pub async fn request<Req, Res>(&self, subject: &str, request: &Req) -> Result<Res, Error<T::Error>>
    where
        Req: TypedMessage,
        Res: TypedMessage,
    {
        self.request_with_cancel(subject, request, &CancellationToken::new())
            .await
    }

    /// [`Client::request`], abandoned when `cancel` fires.
    ///
    /// # Errors
    ///
    /// As [`Client::request`], plus `Cancelled` and `Timeout`.
    #[instrument(skip(self, request, cancel), fields(request_type = %Req::full_name()))]
    pub async fn request_with_cancel<Req, Res>(
        &self,
        subject: &str,
        request: &Req,
        cancel: &CancellationToken,
    ) -> Result<Res, Error<T::Error>>
    where
        Req: TypedMessage,
        Res: TypedMessage,
    {
        let transport = self.transport()?;
        let subject = Subject::publishable(subject)?;
        let payload = codec::encode_with_limit(request, transport.max_payload())?;
        let outbound =
            OutboundMessage::new(payload).with_header(MESSAGE_TYPE_HEADER, Req::full_name());
        let timeout = self.inner.config.request_timeout;

        let response = self
            .guard(cancel, async {
                transport
                    .request(&subject, outbound, timeout)
                    .await
                    .map_err(Error::Transport)
            })
            .await?;

        if let Some(description) = response.header(ERROR_HEADER) {
            let code = response
                .header(ERROR_CODE_HEADER)
                .and_then(|code| code.parse().ok())
                .unwrap_or(HANDLER_ERROR_CODE);

            return Err(Error::Remote {
                code,
                description: description.to_string(),
            });
        }

        Ok(codec::decode_typed(
            &response.payload,
            response.header(MESSAGE_TYPE_HEADER),
        )?)
    }

    fn transport(&self) -> Result<T, Error<T::Error>> {
        match &*self.inner.state.read() {
            State::Connected(transport) => Ok(transport.clone()),
            State::Unconnected => Err(Error::NotConnected),
            State::Closed => Err(Error::Closed),
        }
    }

    /// Runs `operation` until it finishes, `cancel` fires, the client closes
    /// or the operation timeout elapses.
    async fn guard<F, R>(
        &self,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<R, Error<T::Error>>
    where
        F: Future<Output = Result<R, Error<T::Error>>>,
    {
        let bounded = async {
            match self.inner.config.operation_timeout {
                Some(limit) => match tokio::time::timeout(limit, operation).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::Timeout(limit)),
                },
                None => operation.await,
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            () = self.inner.shutdown.cancelled() => Err(Error::Closed),
            result = bounded => result,
        }
    }
}

struct Dispatcher<T, H> {
    transport: T,
    handler: H,
    faults: broadcast::Sender<Fault>,
    shutdown: CancellationToken,
}

impl<T, H> Clone for Dispatcher<T, H>
where
    T: Transport,
    H: ReplyHandler,
{
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            handler: self.handler.clone(),
            faults: self.faults.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<T, H> Dispatcher<T, H>
where
    T: Transport,
    H: ReplyHandler,
{
    fn fault(&self, fault: Fault) {
        error!(subject = fault.subject(), "{fault}");
        let _ = self.faults.send(fault);
    }

    async fn dispatch(self, message: InboundMessage, cancellation: CancellationToken) {
        let subject = message.subject.clone();

        let request = match codec::decode_typed::<H::Request>(
            &message.payload,
            message.header(MESSAGE_TYPE_HEADER),
        ) {
            Ok(request) => request,
            Err(e) => {
                self.fault(Fault::Decode {
                    subject,
                    error: e.to_string(),
                });
                return;
            }
        };

        let context = RequestContext {
            subject: subject.clone(),
            reply: message.reply.clone(),
            headers: message.headers,
            cancellation,
        };

        let response = match self.handler.handle(context, request).await {
            Ok(response) => response,
            Err(e) => {
                let description = e.to_string();
                if let Some(reply) = &message.reply {
                    self.send_error_reply(&subject, reply, &description).await;
                }
                self.fault(Fault::Handler {
                    subject,
                    error: description,
                });
                return;
            }
        };

        let Some(reply) = message.reply else {
            debug!(%subject, "request has no reply destination, discarding response");
            return;
        };

        let payload = match codec::encode_with_limit(&response, self.transport.max_payload()) {
            Ok(payload) => payload,
            Err(e) => {
                self.fault(Fault::Encode {
                    subject,
                    error: e.to_string(),
                });
                return;
            }
        };

        if self.shutdown.is_cancelled() {
            self.fault(Fault::Reply {
                subject,
                error: Error::<T::Error>::Closed.to_string(),
            });
            return;
        }

        let outbound = OutboundMessage::new(payload)
            .with_header(MESSAGE_TYPE_HEADER, <H::Response as prost::Name>::full_name());

        if let Err(e) = self.transport.respond(&reply, outbound).await {
            self.fault(Fault::Reply {
                subject,
                error: e.to_string(),
            });
        }
    }

    async fn send_error_reply(&self, subject: &str, reply: &str, description: &str) {
        if !self.transport.supports_error_replies() || self.shutdown.is_cancelled() {
            return;
        }

        if let Err(e) = self
            .transport
            .respond_error(reply, ErrorReply::new(HANDLER_ERROR_CODE, description))
            .await
        {
            self.fault(Fault::Reply {
                subject: subject.to_string(),
                error: e.to_string(),
            });
        }
    }
}

async fn serve<T, H>(
    dispatcher: Dispatcher<T, H>,
    mut subscription: T::Subscription,
    cancellation: CancellationToken,
    registrations: Arc<Mutex<RegistrationTable>>,
    subject: Subject,
    id: u64,
) where
    T: Transport,
    H: ReplyHandler,
{
    loop {
        tokio::select! {
            biased;
            () = cancellation.cancelled() => break,
            message = subscription.next() => match message {
                Some(message) => {
                    let dispatcher = dispatcher.clone();
                    let request_cancellation = cancellation.child_token();
                    tokio::spawn(dispatcher.dispatch(message, request_cancellation));
                }
                None => {
                    debug!(%subject, "subscription ended");
                    break;
                }
            },
        }
    }

    cancellation.cancel();
    registrations.lock().remove(&subject, id);
    debug!(%subject, id, "reply registration stopped");
}
