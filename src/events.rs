use std::sync::Arc;

use parking_lot::Mutex;

use crate::actions::InputSpec;

/// Notifications published to whoever drives the runner (a UI, the CLI, tests).
#[derive(Debug, Clone, PartialEq)]
pub enum RunnerEvent {
    ActionsLoaded { success: bool },
    ActionsChanged,
    ActionExecuted { action_id: String, success: bool },
    InputsRequired { action_id: String, inputs: Vec<InputSpec> },
    ExecutionStarted { command: String },
    ExecutionFinished { command: String, exit_code: Option<i32> },
    ExecutionError { command: String, message: String },
}

/// Independent subscription channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Load,
    CatalogChanged,
    Execution,
    InputsRequired,
    Process,
}

impl RunnerEvent {
    pub fn topic(&self) -> Topic {
        match self {
            Self::ActionsLoaded { .. } => Topic::Load,
            Self::ActionsChanged => Topic::CatalogChanged,
            Self::ActionExecuted { .. } => Topic::Execution,
            Self::InputsRequired { .. } => Topic::InputsRequired,
            Self::ExecutionStarted { .. }
            | Self::ExecutionFinished { .. }
            | Self::ExecutionError { .. } => Topic::Process,
        }
    }
}

type Listener = Arc<dyn Fn(&RunnerEvent) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<Vec<(Topic, Listener)>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, topic: Topic, listener: F)
    where
        F: Fn(&RunnerEvent) + Send + Sync + 'static,
    {
        self.listeners.lock().push((topic, Arc::new(listener)));
    }

    pub fn publish(&self, event: RunnerEvent) {
        let topic = event.topic();
        // Snapshot the matching listeners so a callback may subscribe or publish.
        let matching: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .filter(|(t, _)| *t == topic)
            .map(|(_, l)| l.clone())
            .collect();

        for listener in matching {
            listener(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listeners_only_see_their_topic() {
        let bus = EventBus::new();
        let loads = Arc::new(Mutex::new(Vec::new()));
        let changes = Arc::new(Mutex::new(0));

        let sink = loads.clone();
        bus.subscribe(Topic::Load, move |event| {
            sink.lock().push(event.clone());
        });
        let counter = changes.clone();
        bus.subscribe(Topic::CatalogChanged, move |_| {
            *counter.lock() += 1;
        });

        bus.publish(RunnerEvent::ActionsLoaded { success: false });
        bus.publish(RunnerEvent::ActionExecuted {
            action_id: "calc".into(),
            success: true,
        });

        assert_eq!(
            *loads.lock(),
            vec![RunnerEvent::ActionsLoaded { success: false }]
        );
        assert_eq!(*changes.lock(), 0);

        bus.publish(RunnerEvent::ActionsChanged);
        assert_eq!(*changes.lock(), 1);
    }

    #[test]
    fn test_bus_survives_a_panicking_listener() {
        let bus = Arc::new(EventBus::new());
        bus.subscribe(Topic::Load, |_| panic!("listener failed"));

        let publisher = bus.clone();
        let joined = std::thread::spawn(move || {
            publisher.publish(RunnerEvent::ActionsLoaded { success: true });
        })
        .join();
        assert!(joined.is_err());

        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        bus.subscribe(Topic::CatalogChanged, move |_| {
            *counter.lock() += 1;
        });
        bus.publish(RunnerEvent::ActionsChanged);
        assert_eq!(*seen.lock(), 1);
    }

    #[test]
    fn test_listener_may_subscribe_while_handling() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(0));

        let inner_bus = bus.clone();
        let counter = seen.clone();
        bus.subscribe(Topic::Load, move |_| {
            let counter = counter.clone();
            inner_bus.subscribe(Topic::CatalogChanged, move |_| {
                *counter.lock() += 1;
            });
        });

        bus.publish(RunnerEvent::ActionsLoaded { success: true });
        bus.publish(RunnerEvent::ActionsChanged);
        assert_eq!(*seen.lock(), 1);
    }

    #[test]
    fn test_process_events_share_a_topic() {
        let started = RunnerEvent::ExecutionStarted {
            command: "ls".into(),
        };
        let failed = RunnerEvent::ExecutionError {
            command: "ls".into(),
            message: "boom".into(),
        };
        assert_eq!(started.topic(), Topic::Process);
        assert_eq!(failed.topic(), Topic::Process);
    }
}
