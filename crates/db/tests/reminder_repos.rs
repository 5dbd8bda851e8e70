//! Repository integration tests for events, guests, messages, reminder
//! schedules and execution history.
//!
//! Exercises the repository layer against a real database:
//! - Unique `(event_id, trigger_days)` constraint
//! - Guarded delivery-status updates
//! - Cascade delete from events
//! - Execution statistics rollup

use aisle_core::message::{DeliveryStatus, MessageType};
use aisle_core::rsvp::RsvpStatus;
use aisle_db::models::event::CreateEvent;
use aisle_db::models::guest::CreateGuest;
use aisle_db::models::message::{CreateMessage, MessageFilter};
use aisle_db::models::reminder_schedule::{CreateReminderSchedule, UpdateReminderSchedule};
use aisle_db::models::schedule_execution::CreateScheduleExecution;
use aisle_db::repositories::{
    EventRepo, GuestRepo, MessageRepo, ReminderScheduleRepo, ScheduleExecutionRepo,
};
use chrono::{Duration, TimeZone, Utc};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_event() -> CreateEvent {
    CreateEvent {
        title: "Ana & Luis".to_string(),
        event_date: Utc.with_ymd_and_hms(2026, 6, 20, 16, 0, 0).unwrap(),
        location: Some("Quinta do Lago".to_string()),
        rsvp_deadline: Utc.with_ymd_and_hms(2026, 6, 1, 23, 59, 0).unwrap(),
        organizer_id: Some(7),
        organizer_name: Some("Marta".to_string()),
    }
}

fn new_schedule(event_id: i64, trigger_days: i32) -> CreateReminderSchedule {
    CreateReminderSchedule {
        event_id,
        trigger_days,
        message_template: "Hi {guestName}".to_string(),
        is_active: true,
    }
}

// ---------------------------------------------------------------------------
// Reminder schedules
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_trigger_days_rejected(pool: PgPool) {
    let event = EventRepo::create(&pool, &new_event()).await.unwrap();
    ReminderScheduleRepo::create(&pool, &new_schedule(event.id, 7))
        .await
        .unwrap();

    assert!(
        ReminderScheduleRepo::exists_for_event_and_trigger_days(&pool, event.id, 7)
            .await
            .unwrap()
    );

    let err = ReminderScheduleRepo::create(&pool, &new_schedule(event.id, 7))
        .await
        .unwrap_err();
    let db_err = err.as_database_error().expect("database error");
    assert!(db_err.is_unique_violation());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn update_and_active_filter(pool: PgPool) {
    let event = EventRepo::create(&pool, &new_event()).await.unwrap();
    let seven = ReminderScheduleRepo::create(&pool, &new_schedule(event.id, 7))
        .await
        .unwrap();
    ReminderScheduleRepo::create(&pool, &new_schedule(event.id, 1))
        .await
        .unwrap();

    let updated = ReminderScheduleRepo::update(
        &pool,
        seven.id,
        &UpdateReminderSchedule {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .expect("schedule exists");
    assert!(!updated.is_active);
    assert_eq!(updated.trigger_days, 7);
    assert_eq!(updated.message_template, "Hi {guestName}");

    let active = ReminderScheduleRepo::find_active_by_event(&pool, event.id)
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].trigger_days, 1);

    let all = ReminderScheduleRepo::find_by_event(&pool, event.id).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn deleting_event_cascades(pool: PgPool) {
    let event = EventRepo::create(&pool, &new_event()).await.unwrap();
    let schedule = ReminderScheduleRepo::create(&pool, &new_schedule(event.id, 3))
        .await
        .unwrap();

    assert!(EventRepo::delete(&pool, event.id).await.unwrap());
    assert!(ReminderScheduleRepo::find_by_id(&pool, schedule.id)
        .await
        .unwrap()
        .is_none());
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn message_status_updates_are_guarded(pool: PgPool) {
    let event = EventRepo::create(&pool, &new_event()).await.unwrap();
    let guest = GuestRepo::create(
        &pool,
        &CreateGuest {
            event_id: event.id,
            name: "Ana".to_string(),
            phone: Some("+351900000001".to_string()),
            rsvp_status: RsvpStatus::Pending,
        },
    )
    .await
    .unwrap();

    let message = MessageRepo::create(
        &pool,
        &CreateMessage {
            event_id: event.id,
            recipient_id: guest.id,
            content: "Hi Ana".to_string(),
            message_type: MessageType::Reminder,
            scheduled_at: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(message.delivery_status, DeliveryStatus::Pending);

    let now = Utc::now();
    // pending -> delivered is not allowed.
    assert!(MessageRepo::mark_as_delivered(&pool, message.id, now)
        .await
        .unwrap()
        .is_none());

    let sent = MessageRepo::mark_as_sent(&pool, message.id, now)
        .await
        .unwrap()
        .expect("pending -> sent");
    assert_eq!(sent.delivery_status, DeliveryStatus::Sent);
    assert!(sent.sent_at.is_some());

    let delivered = MessageRepo::mark_as_delivered(&pool, message.id, now)
        .await
        .unwrap()
        .expect("sent -> delivered");
    assert_eq!(delivered.delivery_status, DeliveryStatus::Delivered);

    // Terminal.
    assert!(MessageRepo::mark_as_failed(&pool, message.id, now)
        .await
        .unwrap()
        .is_none());

    let found = MessageRepo::find_with_filters(
        &pool,
        &MessageFilter {
            event_id: Some(event.id),
            recipient_id: Some(guest.id),
            message_type: Some(MessageType::Reminder),
            delivery_status: Some(DeliveryStatus::Delivered),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(found.len(), 1);
}

// ---------------------------------------------------------------------------
// Execution history
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn execution_statistics_rollup(pool: PgPool) {
    let event = EventRepo::create(&pool, &new_event()).await.unwrap();
    let schedule = ReminderScheduleRepo::create(&pool, &new_schedule(event.id, 7))
        .await
        .unwrap();

    let first = Utc.with_ymd_and_hms(2026, 5, 25, 9, 0, 0).unwrap();
    for (executed_at, errors) in [
        (first, vec!["Failed to send reminder to Ana: Rate limit exceeded".to_string()]),
        (first + Duration::hours(2), vec![]),
        (first + Duration::days(1), vec![]),
    ] {
        ScheduleExecutionRepo::create(
            &pool,
            &CreateScheduleExecution {
                schedule_id: schedule.id,
                event_id: event.id,
                executed_at,
                guests_processed: 3,
                items_scheduled: 2,
                items_skipped: 1,
                errors,
            },
        )
        .await
        .unwrap();
    }

    let stats = ScheduleExecutionRepo::statistics(&pool, event.id).await.unwrap();
    assert_eq!(stats.total_executions, 3);
    assert_eq!(stats.total_guests_processed, 9);
    assert_eq!(stats.total_scheduled, 6);
    assert_eq!(stats.total_skipped, 3);
    assert_eq!(stats.total_errors, 1);
    assert_eq!(stats.last_execution_date, Some(first + Duration::days(1)));
    assert_eq!(stats.per_day.len(), 2);
    assert_eq!(stats.per_day[1].executions, 2);

    assert!(
        ScheduleExecutionRepo::has_executed_on(&pool, schedule.id, first.date_naive())
            .await
            .unwrap()
    );

    let history = ScheduleExecutionRepo::list_for_event(&pool, event.id).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].errors.len(), 1);
}
