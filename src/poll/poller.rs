//! Background polling of remote-backed collections.
//!
//! Document indexing and content generation change server-side without a
//! client-initiated action, so the lists that surface them are refreshed
//! on fixed intervals while a chat is active. A cache invalidation of the
//! polled topic wakes the loop immediately, collapsing the pending tick
//! and the invalidation into a single fetch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::AgentApi;
use crate::cache::{CacheChange, CacheEvent, CacheTopic, ResourceCache};
use crate::core::config::PollConfig;
use crate::core::errors::SyncResult;
use crate::core::ids::ChatId;
use crate::poll::notifier::TransitionNotifier;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PollTarget {
    Documents,
    Generated,
}

struct PollBinding {
    chat: ChatId,
    stops: Vec<Arc<Notify>>,
    tasks: Vec<JoinHandle<()>>,
}

/// Schedules periodic refresh of pollable resources for the active chat.
///
/// One loop runs per (resource, chat) pair, each with its own cancellable
/// stop handle; binding a new chat stops the previous loops. An in-flight
/// tick still completes and reconciles for its original chat, it just goes
/// unobserved.
pub struct Poller {
    api: Arc<dyn AgentApi>,
    cache: Arc<ResourceCache>,
    notifier: Arc<TransitionNotifier>,
    config: PollConfig,
    binding: Mutex<Option<PollBinding>>,
}

impl Poller {
    /// Create a poller over the given transport, cache, and notifier.
    #[must_use]
    pub fn new(
        api: Arc<dyn AgentApi>,
        cache: Arc<ResourceCache>,
        notifier: Arc<TransitionNotifier>,
        config: PollConfig,
    ) -> Self {
        Self {
            api,
            cache,
            notifier,
            config,
            binding: Mutex::new(None),
        }
    }

    /// Start polling for a chat, stopping any previous binding first.
    pub async fn bind(&self, chat: ChatId) {
        self.unbind().await;
        if !self.config.enabled {
            return;
        }

        let stops = vec![Arc::new(Notify::new()), Arc::new(Notify::new())];
        let tasks = vec![
            self.spawn_loop(
                PollTarget::Documents,
                chat.clone(),
                self.config.documents_interval,
                stops[0].clone(),
            ),
            self.spawn_loop(
                PollTarget::Generated,
                chat.clone(),
                self.config.generated_interval,
                stops[1].clone(),
            ),
        ];

        let mut binding = self.binding.lock().await;
        *binding = Some(PollBinding { chat, stops, tasks });
    }

    /// Stop polling entirely (no chat is active).
    pub async fn unbind(&self) {
        let mut binding = self.binding.lock().await;
        if let Some(previous) = binding.take() {
            // One permit per loop, so a loop that is mid-tick still picks
            // up the stop at its next select.
            for stop in &previous.stops {
                stop.notify_one();
            }
            drop(previous.tasks);
            debug!(chat = %previous.chat, "polling stopped");
        }
    }

    /// The chat currently being polled, if any.
    pub async fn bound_chat(&self) -> Option<ChatId> {
        self.binding.lock().await.as_ref().map(|b| b.chat.clone())
    }

    fn spawn_loop(
        &self,
        target: PollTarget,
        chat: ChatId,
        interval: Duration,
        stop: Arc<Notify>,
    ) -> JoinHandle<()> {
        let api = Arc::clone(&self.api);
        let cache = Arc::clone(&self.cache);
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            run_poll_loop(target, chat, interval, api, cache, notifier, stop).await;
        })
    }
}

async fn run_poll_loop(
    target: PollTarget,
    chat: ChatId,
    interval: Duration,
    api: Arc<dyn AgentApi>,
    cache: Arc<ResourceCache>,
    notifier: Arc<TransitionNotifier>,
    stop: Arc<Notify>,
) {
    let mut events = cache.subscribe();
    // The first tick fires immediately, so a freshly bound chat gets its
    // lists without waiting a full interval.
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    debug!(chat = %chat, ?target, ?interval, "polling started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = stop.notified() => {
                debug!(chat = %chat, ?target, "poll loop exiting");
                return;
            }
            event = events.recv() => {
                match event {
                    // An invalidation of our topic means fetch now; the
                    // interval tick pending alongside it is collapsed.
                    Ok(event) if wants_refresh(&event, target, &chat) => {}
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(chat = %chat, ?target, skipped, "cache events lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => return,
                }
            }
        }

        let tick = match target {
            PollTarget::Documents => poll_documents_once(&api, &cache, &notifier, &chat).await,
            PollTarget::Generated => poll_generated_once(&api, &cache, &notifier, &chat).await,
        };
        if let Err(err) = tick {
            // Last-known-good cache entry is retained; next tick retries.
            warn!(chat = %chat, ?target, error = %err, "poll tick failed");
        }
    }
}

fn wants_refresh(event: &CacheEvent, target: PollTarget, chat: &ChatId) -> bool {
    if event.change != CacheChange::Invalidated {
        return false;
    }
    match (&event.topic, target) {
        (CacheTopic::Documents(id), PollTarget::Documents)
        | (CacheTopic::Generated(id), PollTarget::Generated) => id == chat,
        _ => false,
    }
}

/// One document-list refresh: fetch, version-guarded write, diff.
///
/// The entry version is snapshotted before the fetch so a slow response
/// cannot overwrite a newer write; a suppressed write also skips the
/// notifier, since the snapshot it carries is stale.
pub(crate) async fn poll_documents_once(
    api: &Arc<dyn AgentApi>,
    cache: &ResourceCache,
    notifier: &TransitionNotifier,
    chat: &ChatId,
) -> SyncResult<()> {
    let based_on = cache.documents(chat).map_or(0, |s| s.version);
    let documents = api.list_documents(chat.clone()).await?;
    if cache.try_set_documents(chat.clone(), documents.clone(), based_on) {
        notifier.observe_documents(chat, &documents);
    }
    Ok(())
}

/// One generated-list refresh: fetch, version-guarded write, diff.
pub(crate) async fn poll_generated_once(
    api: &Arc<dyn AgentApi>,
    cache: &ResourceCache,
    notifier: &TransitionNotifier,
    chat: &ChatId,
) -> SyncResult<()> {
    let based_on = cache.generated(chat).map_or(0, |s| s.version);
    let files = api.list_generated(chat.clone()).await?;
    if cache.try_set_generated(chat.clone(), files.clone(), based_on) {
        notifier.observe_generated(chat, &files);
    }
    Ok(())
}
