//! The central event timer scheduler (spec §6 `EventTimerScheduler`).
//!
//! The teacher has no direct equivalent: `statime`'s ports are driven by
//! an async executor's timers, whereas this daemon runs the port engine
//! on plain `std::thread`s (spec §5). Each armed timer becomes a sleeper
//! thread; a generation counter per [`gptp_port::Event`] lets
//! `delete_event_timer`/a superseding `add_event_timer` invalidate a
//! sleeper without needing to cancel its thread.

use gptp_port::Event;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Callback = Arc<dyn Fn(Event) + Send + Sync>;

#[derive(Default)]
struct State {
    callback: Option<Callback>,
    generation: HashMap<Event, u64>,
}

pub struct LinuxScheduler {
    state: Arc<Mutex<State>>,
}

impl LinuxScheduler {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Bind the callback invoked when a timer fires. Called once, after
    /// the `Port` that owns this scheduler has been constructed (the
    /// scheduler can't hold an `Arc<Port<..>>` directly: the port's type
    /// is itself generic over its scheduler).
    pub fn bind(&self, callback: impl Fn(Event) + Send + Sync + 'static) {
        self.state.lock().unwrap().callback = Some(Arc::new(callback));
    }
}

impl Default for LinuxScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl gptp_port::EventTimerScheduler for LinuxScheduler {
    fn add_event_timer(&self, event: Event, delay: Duration) {
        let my_generation = {
            let mut state = self.state.lock().unwrap();
            let generation = state.generation.entry(event).or_insert(0);
            *generation += 1;
            *generation
        };

        let state = Arc::clone(&self.state);
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            let callback = {
                let state = state.lock().unwrap();
                if state.generation.get(&event).copied() != Some(my_generation) {
                    None
                } else {
                    state.callback.clone()
                }
            };
            if let Some(callback) = callback {
                callback(event);
            }
        });
    }

    fn delete_event_timer(&self, event: Event) {
        let mut state = self.state.lock().unwrap();
        *state.generation.entry(event).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gptp_port::EventTimerScheduler;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn superseded_timer_does_not_fire() {
        let scheduler = LinuxScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));
        let fired_clone = Arc::clone(&fired);
        scheduler.bind(move |_event| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        scheduler.add_event_timer(Event::SyncIntervalTimeoutExpires, Duration::from_millis(20));
        scheduler.delete_event_timer(Event::SyncIntervalTimeoutExpires);
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn live_timer_fires_once() {
        let scheduler = LinuxScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));
        let fired_clone = Arc::clone(&fired);
        scheduler.bind(move |_event| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        scheduler.add_event_timer(Event::PdelayIntervalTimeoutExpires, Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
