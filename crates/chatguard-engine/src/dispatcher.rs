//! Debounced dispatch
//!
//! One rescheduleable timer per key. Every call bumps the key's generation and
//! replaces the pending timer, so only the last call within the quiet window fires.
//! Handlers that are already running are not aborted; they check their [`Ticket`]
//! before applying anything.

use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use chatguard_core::markup;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

struct Slot {
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

/// Identifies one scheduled call. Stale once a later call for the same key is made.
#[derive(Clone)]
pub struct Ticket<K: Eq + Hash> {
    key: K,
    generation: u64,
    slots: Arc<DashMap<K, Slot>>,
}

impl<K: Eq + Hash> Ticket<K> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// No later call has been scheduled (or cancelled) for this key
    pub fn is_current(&self) -> bool {
        self.slots
            .get(&self.key)
            .is_some_and(|slot| slot.generation == self.generation)
    }
}

pub struct Debouncer<K: Eq + Hash> {
    window: Duration,
    min_len: usize,
    slots: Arc<DashMap<K, Slot>>,
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
{
    /// Calls collapse within `window`; texts shorter than `min_len` characters are dropped
    pub fn new(window: Duration, min_len: usize) -> Self {
        Self {
            window,
            min_len,
            slots: Arc::new(DashMap::new()),
        }
    }

    /// (Re)schedule `handler` for `key`. After the quiet window, it is called with
    /// this call's text unless a later call replaced it or the text is too short.
    /// Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&self, key: K, text: String, handler: F) -> u64
    where
        F: FnOnce(String, Ticket<K>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slots.entry(key.clone()).or_insert(Slot {
            generation: 0,
            timer: None,
        });
        slot.generation += 1;
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }

        let generation = slot.generation;
        let ticket = Ticket {
            key,
            generation,
            slots: self.slots.clone(),
        };
        let window = self.window;
        let min_len = self.min_len;

        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if markup::char_len(&text) < min_len {
                debug!(key = ?ticket.key, "text below minimum length, not dispatched");
                return;
            }
            // Detached so a later reschedule aborting this timer cannot cut the
            // handler short
            tokio::spawn(handler(text, ticket));
        }));

        generation
    }

    /// Drop any pending call for `key` and invalidate in-flight tickets
    pub fn cancel(&self, key: &K) {
        if let Some(mut slot) = self.slots.get_mut(key) {
            slot.generation += 1;
            if let Some(timer) = slot.timer.take() {
                timer.abort();
            }
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Calls = Arc<Mutex<Vec<(u32, String)>>>;

    fn record(calls: Calls, key: u32) -> impl FnOnce(String, Ticket<u32>) -> std::future::Ready<()> {
        move |text, _ticket| {
            calls.lock().unwrap().push((key, text));
            std::future::ready(())
        }
    }

    fn debouncer() -> Debouncer<u32> {
        Debouncer::new(Duration::from_millis(500), 3)
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_call_wins() {
        let debouncer = debouncer();
        let calls: Calls = Arc::default();

        debouncer.schedule(1, "you".into(), record(calls.clone(), 1));
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.schedule(1, "you a".into(), record(calls.clone(), 1));
        tokio::time::sleep(Duration::from_millis(400)).await;
        debouncer.schedule(1, "you are".into(), record(calls.clone(), 1));

        // 400ms after the last call nothing has fired yet
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(calls.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*calls.lock().unwrap(), vec![(1, "you are".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let debouncer = debouncer();
        let calls: Calls = Arc::default();

        debouncer.schedule(1, "first".into(), record(calls.clone(), 1));
        debouncer.schedule(2, "second".into(), record(calls.clone(), 2));
        tokio::time::sleep(Duration::from_millis(600)).await;

        let mut seen = calls.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec![(1, "first".to_string()), (2, "second".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_text_not_dispatched() {
        let debouncer = debouncer();
        let calls: Calls = Arc::default();

        debouncer.schedule(1, "long enough".into(), record(calls.clone(), 1));
        debouncer.schedule(1, "ab".into(), record(calls.clone(), 1));
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticket_goes_stale() {
        let debouncer = debouncer();
        let tickets: Arc<Mutex<Vec<Ticket<u32>>>> = Arc::default();

        let sink = tickets.clone();
        debouncer.schedule(7, "hello".into(), move |_text, ticket| {
            sink.lock().unwrap().push(ticket);
            std::future::ready(())
        });
        tokio::time::sleep(Duration::from_millis(600)).await;

        let ticket = tickets.lock().unwrap().pop().unwrap();
        assert!(ticket.is_current());
        assert_eq!(ticket.generation(), 1);

        debouncer.schedule(7, "hello again".into(), |_, _| std::future::ready(()));
        assert!(!ticket.is_current());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let debouncer = debouncer();
        let calls: Calls = Arc::default();

        debouncer.schedule(1, "pending".into(), record(calls.clone(), 1));
        debouncer.cancel(&1);
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert!(calls.lock().unwrap().is_empty());
    }
}
