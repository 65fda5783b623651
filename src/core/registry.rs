use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

pub type Callback = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

#[derive(Default)]
struct RegistryInner {
    topics: Mutex<HashMap<String, HashMap<u64, Callback>>>,
    next_id: AtomicU64,
}

/// topic -> callbacks 的對照表
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    inner: Arc<RegistryInner>,
}

/// `subscribe` 的回傳值；呼叫 `unsubscribe` 移除對應的 callback
#[must_use = "dropping a Subscription keeps the callback registered; call unsubscribe() to remove it"]
pub struct Subscription {
    topic: String,
    id: u64,
    registry: Weak<RegistryInner>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn unsubscribe(self) {
        if let Some(inner) = self.registry.upgrade() {
            let mut topics = inner.topics.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(callbacks) = topics.get_mut(&self.topic) {
                callbacks.remove(&self.id);
                if callbacks.is_empty() {
                    topics.remove(&self.topic);
                }
            }
        }
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, topic: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        let topic = topic.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock()
            .entry(topic.clone())
            .or_default()
            .insert(id, Arc::new(callback));

        Subscription {
            topic,
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// 同步呼叫 topic 的所有 callback，回傳實際完成的數量。
    ///
    /// 走訪的是快照，callback 內 subscribe/unsubscribe 不影響本輪；
    /// 單一 callback panic 不會中斷其他 callback。
    pub fn dispatch(&self, topic: &str, payload: &serde_json::Value) -> usize {
        let snapshot: Vec<Callback> = match self.lock().get(topic) {
            Some(callbacks) => callbacks.values().cloned().collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for callback in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(payload))) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::error!("💥 Subscriber for '{}' panicked", topic),
            }
        }
        delivered
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.lock().contains_key(topic)
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.lock().get(topic).map(HashMap::len).unwrap_or(0)
    }

    pub fn topic_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, HashMap<u64, Callback>>> {
        self.inner.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
