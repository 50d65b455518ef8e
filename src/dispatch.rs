//! Detection work queue.
//!
//! Reader threads push tasks without blocking; a single worker thread owns
//! the `GestureDetector` and runs tasks in arrival order.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::gesture::{Detection, GestureConfig, GestureDetector, TouchSample};
use crate::mode::ModeSwitch;
use crate::suspend::SuspendFlag;
use crate::wake::WakeTrigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Detect(TouchSample),
    Reset,
}

/// Producer side of the queue. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    tx: Sender<Task>,
}

impl Dispatcher {
    pub fn detect(&self, sample: TouchSample) {
        self.push(Task::Detect(sample));
    }

    pub fn reset(&self) {
        self.push(Task::Reset);
    }

    fn push(&self, task: Task) {
        if self.tx.send(task).is_err() {
            log::debug!("Detection worker stopped, dropping {:?}", task);
        }
    }
}

/// Everything the worker reads besides the queue itself.
pub struct WorkerContext {
    pub gesture: GestureConfig,
    pub suspend: Arc<SuspendFlag>,
    pub mode: Arc<ModeSwitch>,
    pub wake: WakeTrigger,
}

/// Start the detection worker. It ends once every `Dispatcher` is dropped.
pub fn spawn(ctx: WorkerContext) -> io::Result<(Dispatcher, JoinHandle<()>)> {
    let (tx, rx) = mpsc::channel();
    let handle = thread::Builder::new()
        .name("dt2w-input".into())
        .spawn(move || run_worker(ctx, rx))?;
    Ok((Dispatcher { tx }, handle))
}

fn run_worker(ctx: WorkerContext, rx: Receiver<Task>) {
    let mut detector = GestureDetector::new(ctx.gesture);
    let mut sample_count: u64 = 0;

    for task in rx {
        match task {
            Task::Reset => {
                if let Some(time) = detector.state().last_time() {
                    let (x, y) = detector.state().last_position();
                    log::debug!("Gesture reset, dropping tap ({}, {}) @{}ms", x, y, time);
                }
                detector.reset();
            }
            Task::Detect(sample) => {
                let active = ctx.suspend.is_suspended() && ctx.mode.get().is_enabled();
                let outcome = detector.detect(sample, active);
                log_sample(&mut sample_count, &sample, outcome);

                if outcome == Detection::DoubleTap {
                    log::info!("Double tap at ({}, {})", sample.x, sample.y);
                    ctx.wake.fire();
                }
            }
        }
    }

    log::debug!("Detection worker stopping");
}

fn log_sample(count: &mut u64, sample: &TouchSample, outcome: Detection) {
    *count += 1;
    if outcome != Detection::Inactive {
        log::debug!(
            "Tap ({}, {}) @{}ms: {:?}",
            sample.x,
            sample.y,
            sample.timestamp,
            outcome
        );
    }
    if (*count).is_multiple_of(500) {
        log::debug!("Touch samples processed: {}", count);
    }
}
