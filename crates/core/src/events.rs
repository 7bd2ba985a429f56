//! Build Progress Events
//!
//! The build runner publishes one event per step transition. Listeners such
//! as the CLI progress printer consume them on their own thread.

use std::fmt;
use parking_lot::Mutex;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::trace;

/// Events emitted while a build plan executes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    PlanStarted { steps: usize },
    StepStarted { name: String },
    StepSucceeded { name: String },
    StepFailed { name: String, error: String },
    /// Not run because `failed_dependency` failed
    StepSkipped { name: String, failed_dependency: String },
    PlanFinished { success: bool },
}

impl Event {
    /// Whether the event settles the outcome of one step
    pub fn finishes_step(&self) -> bool {
        matches!(
            self,
            Event::StepSucceeded { .. } | Event::StepFailed { .. } | Event::StepSkipped { .. }
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::PlanStarted { steps } => write!(f, "Running {} step(s)", steps),
            Event::StepStarted { name } => write!(f, "started {}", name),
            Event::StepSucceeded { name } => write!(f, "ok {}", name),
            Event::StepFailed { name, error } => write!(f, "FAILED {}: {}", name, error),
            Event::StepSkipped { name, failed_dependency } => {
                write!(f, "skipped {} ({} failed)", name, failed_dependency)
            }
            Event::PlanFinished { success: true } => f.write_str("Build succeeded"),
            Event::PlanFinished { success: false } => f.write_str("Build failed"),
        }
    }
}

/// Receiving end handed out by [`EventBus::subscribe`]
pub struct EventSubscription {
    receiver: Receiver<Event>,
}

impl EventSubscription {
    /// Block on incoming events until the bus is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.receiver.iter()
    }

    /// Events already delivered, without waiting
    pub fn drain(&self) -> Vec<Event> {
        self.receiver.try_iter().collect()
    }
}

/// Fan-out of build events to every live subscription
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<Vec<Sender<Event>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> EventSubscription {
        let (sender, receiver) = unbounded();
        self.listeners.lock().push(sender);
        EventSubscription { receiver }
    }

    /// Send `event` to every subscription; dropped subscriptions are forgotten.
    /// Returns the number of listeners reached.
    pub fn emit(&self, event: Event) -> usize {
        let mut listeners = self.listeners.lock();
        listeners.retain(|sender| sender.send(event.clone()).is_ok());
        trace!("{:?} -> {} listener(s)", event, listeners.len());
        listeners.len()
    }

    pub fn listeners(&self) -> usize {
        self.listeners.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscription_receives() {
        let bus = EventBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        assert_eq!(bus.emit(Event::PlanStarted { steps: 3 }), 2);
        assert_eq!(first.drain(), vec![Event::PlanStarted { steps: 3 }]);
        assert_eq!(second.drain().len(), 1);
    }

    #[test]
    fn test_dropped_subscription_forgotten() {
        let bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.listeners(), 2);

        assert_eq!(bus.emit(Event::PlanFinished { success: true }), 1);
        assert_eq!(bus.listeners(), 1);
        assert_eq!(kept.drain().len(), 1);
    }

    #[test]
    fn test_iter_ends_with_bus() {
        let bus = EventBus::new();
        let subscription = bus.subscribe();
        bus.emit(Event::StepStarted { name: "generateLinkerWrapper".to_string() });
        drop(bus);

        let events: Vec<Event> = subscription.iter().collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_display() {
        let failed = Event::StepFailed { name: "cargoBuildForArm".to_string(), error: "exit code 101".to_string() };
        assert!(failed.finishes_step());
        assert_eq!(failed.to_string(), "FAILED cargoBuildForArm: exit code 101");
        assert!(!Event::StepStarted { name: "x".to_string() }.finishes_step());
        assert_eq!(
            Event::StepSkipped { name: "generateDebugAssets".to_string(), failed_dependency: "cargoBuild".to_string() }
                .to_string(),
            "skipped generateDebugAssets (cargoBuild failed)"
        );
    }
}
