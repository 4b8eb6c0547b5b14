//! Daily notification passes.
//!
//! [`plan_day`] decides, purely, who is owed what on a given day.
//! [`Dispatcher`] carries a plan out against the store, messenger and
//! reminder log, and drives catch-up over missed passes.
//!
//! Delivery is at-least-once. A crash after a send but before the
//! checkpoint (or completion) is saved resends on the next run. A failed
//! send is logged and does not hold up the pass; it stays owed and is
//! retried at the start of later runs until it goes out or its attempt
//! budget (see [`crate::wal::owed_keys`]) runs out.

use crate::catchup::{pass_day, passes_to_run};
use crate::cycle;
use crate::dose;
use crate::message;
use crate::messenger::Messenger;
use crate::store::ScheduleStore;
use crate::wal::{DeliveryKey, ReminderKind, ReminderRecord, ReminderSink};
use crate::{Result, Schedule, WorkerState};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashSet;
use uuid::Uuid;

/// A message owed to a user on a given day
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub owner_id: i64,
    pub schedule_id: Uuid,
    pub kind: ReminderKind,
    pub date: NaiveDate,
    pub text: String,
    /// For completions, the schedule as it is stored after the notice is attempted
    pub completed: Option<Schedule>,
}

impl Notification {
    pub fn key(&self) -> DeliveryKey {
        (self.schedule_id, self.date, self.kind)
    }
}

/// Everything owed on `today` across `schedules`, in schedule order
///
/// Inactive schedules are ignored. A schedule whose cycle has elapsed gets
/// a completion notice instead of a dose reminder.
pub fn plan_day(schedules: &[Schedule], today: NaiveDate) -> Vec<Notification> {
    schedules
        .iter()
        .filter(|s| s.active)
        .filter_map(|schedule| {
            if cycle::is_complete(schedule, today) {
                let completed = cycle::apply_completion(schedule, today);
                Some(Notification {
                    owner_id: schedule.owner_id,
                    schedule_id: schedule.id,
                    kind: ReminderKind::Completion,
                    date: today,
                    text: message::completion_notice(&completed),
                    completed: Some(completed),
                })
            } else if dose::is_dose_day(schedule.frequency, schedule.start_date, today) {
                Some(Notification {
                    owner_id: schedule.owner_id,
                    schedule_id: schedule.id,
                    kind: ReminderKind::Dose,
                    date: today,
                    text: message::dose_reminder(schedule, today),
                    completed: None,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Outcome of one pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    pub day: Option<NaiveDate>,
    pub doses_sent: usize,
    pub completions: usize,
    /// Already delivered by an earlier run
    pub skipped: usize,
    pub failed: usize,
}

/// Runs notification passes against the external collaborators
pub struct Dispatcher<'a> {
    store: &'a mut dyn ScheduleStore,
    messenger: &'a mut dyn Messenger,
    log: &'a mut dyn ReminderSink,
    delivered: HashSet<DeliveryKey>,
    owed: Vec<DeliveryKey>,
    /// Keys already tried during this run
    attempted: HashSet<DeliveryKey>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        store: &'a mut dyn ScheduleStore,
        messenger: &'a mut dyn Messenger,
        log: &'a mut dyn ReminderSink,
    ) -> Self {
        Self {
            store,
            messenger,
            log,
            delivered: HashSet::new(),
            owed: Vec::new(),
            attempted: HashSet::new(),
        }
    }

    /// Seed the notifications earlier runs already delivered
    pub fn with_delivered(mut self, delivered: HashSet<DeliveryKey>) -> Self {
        self.delivered = delivered;
        self
    }

    /// Seed the notifications earlier runs failed to deliver
    pub fn with_owed(mut self, owed: Vec<DeliveryKey>) -> Self {
        self.owed = owed;
        self
    }

    /// Send one notification and log the attempt; `Ok(false)` if the send failed
    fn deliver(&mut self, notification: &Notification, now: DateTime<Utc>) -> Result<bool> {
        let key = notification.key();
        self.attempted.insert(key);

        let sent = match self
            .messenger
            .send(notification.owner_id, &notification.text)
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    "Failed to notify user {} about schedule {}: {}",
                    notification.owner_id,
                    notification.schedule_id,
                    e
                );
                false
            }
        };

        self.log.append(&ReminderRecord {
            id: Uuid::new_v4(),
            schedule_id: notification.schedule_id,
            owner_id: notification.owner_id,
            kind: notification.kind,
            reminder_date: notification.date,
            sent,
            recorded_at: now,
        })?;

        if sent {
            self.delivered.insert(key);
        }
        Ok(sent)
    }

    /// Resend notifications earlier runs could not deliver
    ///
    /// The returned report has no `day`. Owed keys whose schedule no longer
    /// exists are dropped.
    pub fn retry_owed(&mut self, now: DateTime<Utc>) -> Result<PassReport> {
        let mut report = PassReport::default();
        let owed = std::mem::take(&mut self.owed);
        if owed.is_empty() {
            return Ok(report);
        }

        tracing::info!("Retrying {} undelivered notifications", owed.len());
        let schedules = self.store.load_schedules()?;

        for key in owed {
            if self.delivered.contains(&key) || self.attempted.contains(&key) {
                continue;
            }

            let (schedule_id, date, kind) = key;
            let Some(schedule) = schedules.iter().find(|s| s.id == schedule_id) else {
                tracing::warn!("Dropping owed {:?}: schedule {} not found", kind, schedule_id);
                continue;
            };

            let text = match kind {
                ReminderKind::Dose => message::dose_reminder(schedule, date),
                ReminderKind::Completion => message::completion_notice(schedule),
            };
            let notification = Notification {
                owner_id: schedule.owner_id,
                schedule_id,
                kind,
                date,
                text,
                completed: None,
            };

            if !self.deliver(&notification, now)? {
                report.failed += 1;
                continue;
            }
            match kind {
                ReminderKind::Dose => report.doses_sent += 1,
                ReminderKind::Completion => report.completions += 1,
            }
        }

        Ok(report)
    }

    /// Evaluate `today` for every active schedule and send what is owed
    ///
    /// Each completion notice is sent first and the completed schedule is
    /// saved afterwards, whether or not the send went out. A failed send is
    /// counted in `failed` and left in the log for [`Self::retry_owed`].
    pub fn run_pass(&mut self, today: NaiveDate, now: DateTime<Utc>) -> Result<PassReport> {
        let schedules = self.store.load_active_schedules()?;
        let plan = plan_day(&schedules, today);

        tracing::info!(
            "Pass for {}: {} active schedules, {} notifications due",
            today,
            schedules.len(),
            plan.len()
        );

        let mut report = PassReport {
            day: Some(today),
            ..PassReport::default()
        };

        for notification in plan {
            let key = notification.key();

            if self.delivered.contains(&key) || self.attempted.contains(&key) {
                tracing::debug!(
                    "{:?} for schedule {} on {} already handled",
                    notification.kind,
                    notification.schedule_id,
                    today
                );
                report.skipped += 1;
            } else if self.deliver(&notification, now)? {
                match notification.kind {
                    ReminderKind::Dose => report.doses_sent += 1,
                    ReminderKind::Completion => report.completions += 1,
                }
            } else {
                report.failed += 1;
            }

            if let Some(completed) = &notification.completed {
                self.store.save(completed)?;
                tracing::info!(
                    "Schedule {} ({}) completed on {}",
                    completed.id,
                    completed.peptide_name,
                    today
                );
            }
        }

        if report.failed > 0 {
            tracing::warn!(
                "{} notification(s) for {} could not be delivered; will retry next run",
                report.failed,
                today
            );
        }

        Ok(report)
    }

    /// Retry owed notifications, then replay every pass owed since the
    /// checkpoint, oldest first
    ///
    /// The checkpoint is persisted after each pass and the advanced value
    /// is returned. On error the store holds the last pass that completed.
    pub fn run_catch_up(
        &mut self,
        state: WorkerState,
        now: DateTime<Utc>,
        run_interval: Duration,
    ) -> Result<(WorkerState, Vec<PassReport>)> {
        let mut state = state;
        let mut reports = Vec::new();
        let mut last_day = None;

        let retried = self.retry_owed(now)?;
        if retried != PassReport::default() {
            reports.push(retried);
        }

        for pass in passes_to_run(state.last_run_at, now, run_interval) {
            let day = pass_day(pass);
            if last_day == Some(day) {
                tracing::debug!("{} already evaluated in this run", day);
            } else {
                reports.push(self.run_pass(day, pass)?);
                last_day = Some(day);
            }

            state = WorkerState { last_run_at: pass };
            self.store.save_worker_state(&state)?;
        }

        Ok((state, reports))
    }
}
