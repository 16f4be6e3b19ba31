//! Cross-view refresh signalling.
//!
//! Forms publish an `AccountEvent` after a successful mutation; the dashboard
//! drains them and bumps its refresh counter, which is the cue to refetch the
//! balance and the recent-activity feed. Coarse by intent: any mutation means
//! refetch everything.

use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountEvent {
    TransferCompleted,
    DepositCompleted,
    WithdrawalCompleted,
}

/// Cloneable sending half handed to every form.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: Sender<AccountEvent>,
}

impl EventPublisher {
    /// A dropped dashboard is not an error for the publisher.
    pub fn publish(&self, event: AccountEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Debug)]
pub struct Dashboard {
    refresh: u64,
    rx: Receiver<AccountEvent>,
    publisher: EventPublisher,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            refresh: 0,
            rx,
            publisher: EventPublisher { tx },
        }
    }

    pub fn publisher(&self) -> EventPublisher {
        self.publisher.clone()
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh
    }

    /// Manual refresh (the `r` key).
    pub fn request_refresh(&mut self) {
        self.refresh += 1;
    }

    /// Consume pending events, one counter step each. Returns true when at
    /// least one event arrived and a refetch is due.
    pub fn drain_events(&mut self) -> bool {
        let mut seen = false;
        while let Ok(_event) = self.rx.try_recv() {
            self.refresh += 1;
            seen = true;
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_bump_refresh_counter() {
        let mut dash = Dashboard::new();
        assert!(!dash.drain_events());
        assert_eq!(dash.refresh_count(), 0);

        let transfer = dash.publisher();
        let deposit = dash.publisher();
        transfer.publish(AccountEvent::TransferCompleted);
        deposit.publish(AccountEvent::DepositCompleted);

        assert!(dash.drain_events());
        assert_eq!(dash.refresh_count(), 2);
        assert!(!dash.drain_events());
        assert_eq!(dash.refresh_count(), 2);
    }

    #[test]
    fn test_counter_is_monotonic() {
        let mut dash = Dashboard::new();
        let p = dash.publisher();
        let mut last = dash.refresh_count();
        for i in 0..5 {
            if i % 2 == 0 {
                p.publish(AccountEvent::WithdrawalCompleted);
                dash.drain_events();
            } else {
                dash.request_refresh();
            }
            assert!(dash.refresh_count() > last);
            last = dash.refresh_count();
        }
    }

    #[test]
    fn test_publish_from_another_thread() {
        let mut dash = Dashboard::new();
        let p = dash.publisher();
        std::thread::spawn(move || p.publish(AccountEvent::TransferCompleted))
            .join()
            .unwrap();
        assert!(dash.drain_events());
    }
}
