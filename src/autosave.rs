//! Periodic draft flushing.
//!
//! The timer is injected through [`Scheduler`] so tests can drive ticks by hand and
//! sessions can stop it on teardown.

use std::{
    sync::mpsc::{self, RecvTimeoutError, Sender},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    errors::{Result, WizardError},
    wizard::SharedSession,
};

pub type Task = Box<dyn FnMut() + Send + 'static>;

/// Runs a task repeatedly until cancelled.
pub trait Scheduler {
    /// Starts running `task` every `interval`, replacing any previous schedule.
    fn schedule(&mut self, interval: Duration, task: Task) -> Result<()>;
    fn cancel(&mut self);
    fn is_running(&self) -> bool;
}

/// Background-thread scheduler. Dropping it cancels the task.
#[derive(Default)]
pub struct ThreadScheduler {
    worker: Option<(Sender<()>, JoinHandle<()>)>,
}

impl ThreadScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule(&mut self, interval: Duration, mut task: Task) -> Result<()> {
        self.cancel();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("autosave".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => task(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|err| WizardError::Scheduler(err.to_string()))?;
        self.worker = Some((stop_tx, handle));
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some((stop_tx, handle)) = self.worker.take() {
            let _ = stop_tx.send(());
            if handle.join().is_err() {
                tracing::warn!("autosave worker panicked");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Scheduler that only runs its task when [`ManualScheduler::tick`] is called.
#[derive(Default)]
pub struct ManualScheduler {
    task: Option<Task>,
    interval: Option<Duration>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the scheduled task once. Returns false when nothing is scheduled.
    pub fn tick(&mut self) -> bool {
        match self.task.as_mut() {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, interval: Duration, task: Task) -> Result<()> {
        self.interval = Some(interval);
        self.task = Some(task);
        Ok(())
    }

    fn cancel(&mut self) {
        self.task = None;
        self.interval = None;
    }

    fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

/// Flushes a shared session on every scheduler tick.
pub struct AutoSave<S: Scheduler> {
    scheduler: S,
}

impl<S: Scheduler> AutoSave<S> {
    pub fn new(scheduler: S) -> Self {
        Self { scheduler }
    }

    pub fn start(&mut self, session: SharedSession, interval: Duration) -> Result<()> {
        tracing::debug!(?interval, "autosave started");
        self.scheduler
            .schedule(interval, Box::new(move || flush_shared(&session)))
    }

    pub fn stop(&mut self) {
        if self.scheduler.is_running() {
            tracing::debug!("autosave stopped");
        }
        self.scheduler.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}

/// One autosave tick; a poisoned session lock skips the flush.
pub fn flush_shared(session: &SharedSession) {
    match session.lock() {
        Ok(mut session) => {
            session.flush();
        }
        Err(_) => tracing::warn!("session lock poisoned, skipping autosave"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn counting_task(counter: &Arc<AtomicUsize>) -> Task {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn manual_scheduler_runs_only_on_tick() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = ManualScheduler::new();
        assert!(!scheduler.tick());

        scheduler
            .schedule(Duration::from_secs(30), counting_task(&counter))
            .expect("schedule");
        assert_eq!(scheduler.interval(), Some(Duration::from_secs(30)));
        assert!(scheduler.tick());
        assert!(scheduler.tick());
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        scheduler.cancel();
        assert!(!scheduler.tick());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn thread_scheduler_stops_after_cancel() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = ThreadScheduler::new();
        scheduler
            .schedule(Duration::from_millis(5), counting_task(&counter))
            .expect("schedule");
        assert!(scheduler.is_running());

        thread::sleep(Duration::from_millis(60));
        scheduler.cancel();
        assert!(!scheduler.is_running());

        let after_cancel = counter.load(Ordering::SeqCst);
        assert!(after_cancel >= 1, "expected at least one tick");
        thread::sleep(Duration::from_millis(30));
        assert_eq!(counter.load(Ordering::SeqCst), after_cancel);
    }

    #[test]
    fn dropping_thread_scheduler_cancels_task() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let mut scheduler = ThreadScheduler::new();
            scheduler
                .schedule(Duration::from_millis(5), counting_task(&counter))
                .expect("schedule");
            thread::sleep(Duration::from_millis(20));
        }
        let after_drop = counter.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(counter.load(Ordering::SeqCst), after_drop);
    }
}
