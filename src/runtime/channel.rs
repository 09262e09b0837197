use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use tokio::{runtime::Runtime, sync::broadcast};
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use crate::{
    ShareLock,
    common::{BroadcastQueue, Shutdown},
    events::{NodeStatus, StatusMessage, StatusPublisher},
};

macro_rules! dispatch_event {
    ($handles:expr, $(&$item:ident), +) => {
        let handlers = $handles.read().unwrap();
        for handle in handlers.iter() {
            (handle)($(&$item),+);
        }
    };
}

macro_rules! dispatch_event_async {
    ($handles:expr, $(&$item:ident), +) => {
        let handles = $handles.clone();

        tokio::spawn(async move {
            let handlers = handles.read().unwrap().clone();
            for handle in handlers.iter() {
                (handle)($(&$item),+).await;
            }
        });
    };
}

const STATUS_QUEUE_SIZE: usize = 2048;

pub type StatusHandle = Arc<dyn Fn(&StatusMessage) + Send + Sync>;
pub type StatusHandleAsync = Arc<dyn Fn(&StatusMessage) -> BoxFuture<'static, ()> + Send + Sync>;

/// Glob filters selecting which status events a subscription sees.
#[derive(Debug, Clone)]
pub struct SubscribeOptions {
    /// glob pattern matched against the channel name
    /// eg. `openai-*`
    pub channel: String,

    /// glob pattern matched against the node id
    /// eg. `node_1*`
    pub node: String,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            channel: "*".to_string(),
            node: "*".to_string(),
        }
    }
}

#[allow(unused)]
impl SubscribeOptions {
    pub fn new(
        channel: String,
        node: String,
    ) -> Self {
        Self { channel, node }
    }

    pub fn with_channel(channel: String) -> Self {
        Self {
            channel,
            node: "*".to_string(),
        }
    }

    pub fn with_node(node: String) -> Self {
        Self {
            channel: "*".to_string(),
            node,
        }
    }
}

/// Broadcast transport for node status events.
///
/// Publishing is ordered and non-blocking; subscribers that fall
/// behind lose oldest events first, never the publisher.
#[derive(Clone)]
pub struct Channel {
    status_queue: Arc<BroadcastQueue<StatusMessage>>,

    handlers: ShareLock<Vec<StatusHandle>>,
    handlers_async: ShareLock<Vec<StatusHandleAsync>>,

    runtime: Arc<Runtime>,
    shutdown: Arc<Shutdown>,
}

impl Channel {
    pub(crate) fn new(runtime: Arc<Runtime>) -> Self {
        Self {
            status_queue: BroadcastQueue::new(STATUS_QUEUE_SIZE),
            handlers: Arc::new(RwLock::new(Vec::new())),
            handlers_async: Arc::new(RwLock::new(Vec::new())),
            runtime,
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    /// Raw receiver over every status event, unfiltered.
    pub fn subscribe_raw(&self) -> broadcast::Receiver<StatusMessage> {
        self.status_queue.subscribe()
    }

    pub(crate) fn listen(&self) {
        let mut status_queue = self.status_queue.subscribe();
        let handlers = self.handlers.clone();
        let handlers_async = self.handlers_async.clone();

        let shutdown = self.shutdown.clone();
        self.runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    Ok(message) = status_queue.recv() => {
                        let m = message.clone();
                        dispatch_event!(handlers, &m);
                        dispatch_event_async!(handlers_async, &message);
                    }
                }
            }
        });
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown.shutdown();
    }
}

impl StatusPublisher for Channel {
    fn publish(
        &self,
        message: StatusMessage,
    ) {
        // fire-and-forget: nobody listening is not an error
        let _ = self.status_queue.send(message);
    }
}

/// A glob-filtered view over a [`Channel`].
#[derive(Clone)]
pub struct ChannelSubscription {
    channel: Arc<Channel>,

    glob: (globset::GlobMatcher, globset::GlobMatcher),
}

#[allow(unused)]
impl ChannelSubscription {
    pub fn new(
        channel: Arc<Channel>,
        options: SubscribeOptions,
    ) -> Self {
        Self {
            channel,
            glob: (
                globset::Glob::new(&options.channel).unwrap().compile_matcher(),
                globset::Glob::new(&options.node).unwrap().compile_matcher(),
            ),
        }
    }

    /// Run `f` for every matching status event.
    pub fn on_status(
        &self,
        f: impl Fn(&StatusMessage) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.handlers.write().unwrap().push(Arc::new(move |m| {
            if is_match(&glob, m) {
                f(m);
            }
        }));
    }

    /// Run `f` for every matching error status event.
    pub fn on_error(
        &self,
        f: impl Fn(&StatusMessage) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.handlers.write().unwrap().push(Arc::new(move |m| {
            if m.status == NodeStatus::Error && is_match(&glob, m) {
                f(m);
            }
        }));
    }

    pub fn on_status_async<F>(
        &self,
        f: F,
    ) where
        F: Fn(&StatusMessage) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let glob = self.glob.clone();

        self.channel.handlers_async.write().unwrap().push(Arc::new(move |m| {
            if is_match(&glob, m) {
                f(m)
            } else {
                Box::pin(async {})
            }
        }));
    }

    /// Matching events as an async stream.
    pub fn into_stream(self) -> impl futures::Stream<Item = StatusMessage> {
        let receiver = self.channel.subscribe_raw();
        let glob = self.glob.clone();
        BroadcastStream::new(receiver).filter_map(move |item| match item {
            Ok(message) if is_match(&glob, &message) => Some(message),
            _ => None,
        })
    }
}

fn is_match(
    glob: &(globset::GlobMatcher, globset::GlobMatcher),
    m: &StatusMessage,
) -> bool {
    let (pat_channel, pat_node) = glob;
    pat_channel.is_match(&m.channel) && pat_node.is_match(&m.node_id)
}

/// Latest-status fold over one node, the polling shape editors use:
/// most recently timestamped matching event wins, `initial` before
/// anything arrives.
pub struct NodeStatusWatch {
    state: Arc<RwLock<(NodeStatus, i64)>>,
}

impl NodeStatusWatch {
    pub fn watch(
        channel: Arc<Channel>,
        node_id: impl Into<String>,
    ) -> Self {
        let state = Arc::new(RwLock::new((NodeStatus::Initial, 0)));
        let subscription = ChannelSubscription::new(channel, SubscribeOptions::with_node(node_id.into()));

        let shared = state.clone();
        subscription.on_status(move |message| {
            let mut current = shared.write().unwrap();
            if message.timestamp >= current.1 {
                *current = (message.status, message.timestamp);
            }
        });

        Self { state }
    }

    pub fn current(&self) -> NodeStatus {
        self.state.read().unwrap().0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn launch_channel() -> (Arc<Channel>, Arc<Runtime>) {
        let runtime = Arc::new(tokio::runtime::Runtime::new().unwrap());
        let channel = Arc::new(Channel::new(runtime.clone()));
        channel.listen();
        (channel, runtime)
    }

    #[test]
    fn test_subscription_filters_by_channel_glob() {
        let (channel, _runtime) = launch_channel();
        let (tx, rx) = flume::bounded(8);

        let subscription = ChannelSubscription::new(
            channel.clone(),
            SubscribeOptions::with_channel("openai-*".to_string()),
        );
        subscription.on_status(move |m| {
            let _ = tx.send(m.clone());
        });

        channel.publish(StatusMessage::new("openai-execution", "n1", NodeStatus::Loading));
        channel.publish(StatusMessage::new("edit-fields-execution", "n2", NodeStatus::Loading));
        channel.publish(StatusMessage::new("openai-execution", "n1", NodeStatus::Success));

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first.node_id, "n1");
        assert_eq!(first.status, NodeStatus::Loading);
        assert_eq!(second.status, NodeStatus::Success);
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn test_on_error_only_sees_error_events() {
        let (channel, _runtime) = launch_channel();
        let (tx, rx) = flume::bounded(8);

        let subscription = ChannelSubscription::new(channel.clone(), SubscribeOptions::default());
        subscription.on_error(move |m| {
            let _ = tx.send(m.node_id.clone());
        });

        channel.publish(StatusMessage::new("gemini-execution", "n1", NodeStatus::Loading));
        channel.publish(StatusMessage::new("gemini-execution", "n1", NodeStatus::Error));

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), "n1");
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn test_node_status_watch_defaults_to_initial_then_folds() {
        let (channel, _runtime) = launch_channel();

        let watch = NodeStatusWatch::watch(channel.clone(), "n7");
        assert_eq!(watch.current(), NodeStatus::Initial);

        channel.publish(StatusMessage::new("http-request-execution", "n7", NodeStatus::Loading));
        channel.publish(StatusMessage::new("http-request-execution", "other", NodeStatus::Error));
        channel.publish(StatusMessage::new("http-request-execution", "n7", NodeStatus::Success));

        // the listen loop runs on the channel runtime
        std::thread::sleep(Duration::from_millis(300));
        assert_eq!(watch.current(), NodeStatus::Success);
    }

    #[test]
    fn test_publish_without_listeners_does_not_fail() {
        let runtime = Arc::new(tokio::runtime::Runtime::new().unwrap());
        let channel = Channel::new(runtime);
        channel.publish(StatusMessage::new("openai-execution", "n1", NodeStatus::Loading));
    }
}
