#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use aisle_core::clock::ManualClock;
use aisle_core::reminder::ScheduleRequest;
use aisle_core::rsvp::RsvpStatus;
use aisle_core::types::{DbId, Timestamp};
use aisle_db::models::event::{CreateEvent, Event};
use aisle_db::models::guest::{CreateGuest, Guest};
use aisle_db::models::reminder_schedule::ReminderSchedule;
use aisle_notify::dispatch::Dispatcher;
use aisle_notify::store::InMemoryStore;
use aisle_notify::{
    DispatchConfig, DispatchError, EngineConfig, NotificationEngine, SimulatedChannel, Stores,
};
use chrono::{Duration, TimeZone, Utc};

pub const TEMPLATE: &str = "Hi {guestName}, please answer by {rsvpDeadline}: {rsvpLink}";

/// Fixed "now" for every test: Wednesday 27 May 2026, noon UTC.
pub fn start_time() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 5, 27, 12, 0, 0).unwrap()
}

pub struct Fixture {
    pub clock: Arc<ManualClock>,
    pub store: Arc<InMemoryStore>,
    pub stores: Stores,
}

impl Fixture {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(start_time()));
        let store = Arc::new(InMemoryStore::new(clock.clone()));
        let stores = Stores::from_backend(store.clone());
        Self {
            clock,
            store,
            stores,
        }
    }

    /// An event whose RSVP deadline is `days` days from now.
    pub fn event(&self, days: i64) -> Event {
        self.store.add_event(CreateEvent {
            title: "Ana & Luis".to_string(),
            event_date: start_time() + Duration::days(days + 19),
            location: Some("Quinta do Lago".to_string()),
            rsvp_deadline: start_time() + Duration::days(days),
            organizer_id: Some(7),
            organizer_name: Some("Marta".to_string()),
        })
    }

    pub fn guest(
        &self,
        event_id: DbId,
        name: &str,
        phone: Option<&str>,
        status: RsvpStatus,
    ) -> Guest {
        self.store.add_guest(CreateGuest {
            event_id,
            name: name.to_string(),
            phone: phone.map(str::to_string),
            rsvp_status: status,
        })
    }

    pub fn engine(&self, dispatcher: Arc<dyn Dispatcher>) -> Arc<NotificationEngine> {
        Arc::new(NotificationEngine::new(
            self.stores.clone(),
            dispatcher,
            self.clock.clone(),
            EngineConfig::default(),
        ))
    }

    pub fn channel(&self, config: DispatchConfig) -> SimulatedChannel {
        SimulatedChannel::new(config, self.stores.messages.clone(), self.clock.clone())
    }

    /// Configure one active schedule and return it.
    pub async fn schedule(
        &self,
        engine: &NotificationEngine,
        event_id: DbId,
        trigger_days: i32,
    ) -> ReminderSchedule {
        engine
            .configure(event_id, &[ScheduleRequest::new(trigger_days, TEMPLATE)])
            .await
            .expect("configure schedule")
            .pop()
            .expect("schedule created")
    }
}

/// Dispatcher that records every send and fails for configured numbers.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub sent: Mutex<Vec<(String, String, DbId)>>,
    pub failures: HashMap<String, String>,
}

impl RecordingDispatcher {
    pub fn failing_for(phone: &str, reason: &str) -> Self {
        Self {
            sent: Mutex::default(),
            failures: HashMap::from([(phone.to_string(), reason.to_string())]),
        }
    }

    pub fn sent(&self) -> Vec<(String, String, DbId)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, phone: &str) -> usize {
        self.sent().iter().filter(|(to, _, _)| to == phone).count()
    }
}

#[async_trait::async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn send(&self, to: &str, content: &str, message_id: DbId) -> Result<(), DispatchError> {
        if let Some(reason) = self.failures.get(to) {
            return Err(DispatchError::Unavailable(reason.clone()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), content.to_string(), message_id));
        Ok(())
    }
}
