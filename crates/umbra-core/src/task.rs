// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A bounded queue of GPU work submitted from any thread and executed on the
//! render thread at one point per frame.

use crate::renderer::context::RenderContext;
use crate::renderer::error::ResourceError;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors of the task queue and of the tasks it runs.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The queue is at capacity; the task was not queued.
    #[error("GPU task queue is full, '{label}' rejected")]
    QueueFull {
        /// Label of the rejected task.
        label: String,
    },
    /// The queue was dropped before the task could be queued.
    #[error("GPU task queue is closed, '{label}' rejected")]
    Closed {
        /// Label of the rejected task.
        label: String,
    },
    /// The task panicked or was dropped without running.
    #[error("GPU task '{label}' did not complete")]
    Abandoned {
        /// Label of the task.
        label: String,
    },
    /// A GPU resource operation inside the task failed.
    #[error(transparent)]
    Resource(#[from] ResourceError),
    /// The task reported a failure.
    #[error("{0}")]
    Failed(String),
}

type Job<C> = Box<dyn FnOnce(&mut C) -> Result<(), String> + Send>;

struct QueuedTask<C> {
    label: String,
    job: Job<C>,
}

/// Summary of one [`GpuTaskQueue::drain`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Tasks run, including failed ones.
    pub executed: u32,
    /// Tasks that returned an error or panicked.
    pub failed: u32,
    /// Tasks that ran longer than the soft budget.
    pub over_budget: u32,
}

/// The receiving end, owned by the render thread.
pub struct GpuTaskQueue<C = RenderContext> {
    receiver: flume::Receiver<QueuedTask<C>>,
    soft_budget: Duration,
}

impl<C> Clone for GpuTaskQueue<C> {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.clone(),
            soft_budget: self.soft_budget,
        }
    }
}

impl<C> std::fmt::Debug for GpuTaskQueue<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuTaskQueue")
            .field("pending", &self.receiver.len())
            .field("soft_budget", &self.soft_budget)
            .finish()
    }
}

/// The submitting end; cheap to clone and shareable across threads.
pub struct GpuTaskSender<C = RenderContext> {
    sender: flume::Sender<QueuedTask<C>>,
}

impl<C> Clone for GpuTaskSender<C> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<C> std::fmt::Debug for GpuTaskSender<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuTaskSender")
            .field("pending", &self.sender.len())
            .finish()
    }
}

/// Completion signal of one submitted task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    label: String,
    receiver: flume::Receiver<Result<T, TaskError>>,
}

impl<C> GpuTaskQueue<C> {
    /// Creates a queue holding at most `capacity` pending tasks.
    pub fn bounded(capacity: usize, soft_budget: Duration) -> (Self, GpuTaskSender<C>) {
        let (sender, receiver) = flume::bounded(capacity.max(1));
        (
            Self {
                receiver,
                soft_budget,
            },
            GpuTaskSender { sender },
        )
    }

    /// Number of tasks waiting.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Runs every task queued at the moment of the call.
    ///
    /// Tasks submitted while draining wait for the next drain. A failing or
    /// panicking task is logged and reported to its handle; the remaining
    /// tasks still run.
    pub fn drain(&self, ctx: &mut C) -> DrainReport {
        let mut report = DrainReport::default();
        let pending = self.receiver.len();
        for _ in 0..pending {
            let Ok(task) = self.receiver.try_recv() else {
                break;
            };
            let QueuedTask { label, job } = task;

            let started = Instant::now();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| job(ctx)));
            let elapsed = started.elapsed();

            report.executed += 1;
            match outcome {
                Ok(Ok(())) => log::trace!("GPU task '{label}' completed in {elapsed:?}"),
                Ok(Err(message)) => {
                    report.failed += 1;
                    log::error!("GPU task '{label}' failed: {message}");
                }
                Err(_) => {
                    report.failed += 1;
                    log::error!("GPU task '{label}' panicked");
                }
            }
            if elapsed > self.soft_budget {
                report.over_budget += 1;
                log::warn!(
                    "GPU task '{label}' took {elapsed:?}, over its {:?} budget",
                    self.soft_budget
                );
            }
        }
        report
    }
}

impl<C> GpuTaskSender<C> {
    /// Queues `task` for the next drain without blocking.
    ///
    /// ## Errors
    /// [`TaskError::QueueFull`] when the queue is at capacity and
    /// [`TaskError::Closed`] when the queue no longer exists.
    pub fn submit<T, F>(&self, label: impl Into<String>, task: F) -> Result<TaskHandle<T>, TaskError>
    where
        T: Send + 'static,
        F: FnOnce(&mut C) -> Result<T, TaskError> + Send + 'static,
    {
        let label = label.into();
        let (result_tx, result_rx) = flume::bounded(1);
        let job: Job<C> = Box::new(move |ctx| {
            let result = task(ctx);
            let outcome = result.as_ref().map(|_| ()).map_err(|e| e.to_string());
            // The originating thread may have dropped its handle.
            let _ = result_tx.send(result);
            outcome
        });

        match self.sender.try_send(QueuedTask {
            label: label.clone(),
            job,
        }) {
            Ok(()) => Ok(TaskHandle {
                label,
                receiver: result_rx,
            }),
            Err(flume::TrySendError::Full(_)) => {
                log::warn!("GPU task queue full, rejecting '{label}'");
                Err(TaskError::QueueFull { label })
            }
            Err(flume::TrySendError::Disconnected(_)) => Err(TaskError::Closed { label }),
        }
    }
}

impl<T> TaskHandle<T> {
    /// Label given at submission.
    pub fn label(&self) -> &str {
        &self.label
    }

    fn abandoned(&self) -> TaskError {
        TaskError::Abandoned {
            label: self.label.clone(),
        }
    }

    /// Blocks until the task has run.
    pub fn wait(self) -> Result<T, TaskError> {
        match self.receiver.recv() {
            Ok(result) => result,
            Err(_) => Err(self.abandoned()),
        }
    }

    /// The result if the task has run, `None` while it is pending.
    pub fn try_result(&self) -> Option<Result<T, TaskError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(flume::TryRecvError::Empty) => None,
            Err(flume::TryRecvError::Disconnected) => Some(Err(self.abandoned())),
        }
    }

    /// Waits at most `timeout`; `None` when the task is still pending.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, TaskError>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(flume::RecvTimeoutError::Timeout) => None,
            Err(flume::RecvTimeoutError::Disconnected) => Some(Err(self.abandoned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[derive(Debug, Default)]
    struct Counter {
        value: u32,
    }

    fn queue(capacity: usize) -> (GpuTaskQueue<Counter>, GpuTaskSender<Counter>) {
        GpuTaskQueue::bounded(capacity, Duration::from_millis(50))
    }

    #[test]
    fn test_result_is_delivered_to_handle() {
        let (queue, sender) = queue(4);
        let handle = sender
            .submit("increment", |c: &mut Counter| {
                c.value += 1;
                Ok(c.value * 10)
            })
            .unwrap();
        assert!(handle.try_result().is_none());

        let mut counter = Counter::default();
        let report = queue.drain(&mut counter);
        assert_eq!(report.executed, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(counter.value, 1);
        assert_eq!(handle.wait().unwrap(), 10);
    }

    #[test]
    fn test_full_queue_rejects_without_blocking() {
        let (_queue, sender) = queue(1);
        sender.submit("first", |_: &mut Counter| Ok(())).unwrap();
        let err = sender.submit("second", |_: &mut Counter| Ok(())).unwrap_err();
        assert!(matches!(err, TaskError::QueueFull { ref label } if label == "second"));
    }

    #[test]
    fn test_failure_and_panic_do_not_stop_the_drain() {
        let (queue, sender) = queue(8);
        let failing = sender
            .submit("fails", |_: &mut Counter| -> Result<(), TaskError> {
                Err(TaskError::Failed("bad texture".into()))
            })
            .unwrap();
        let panicking = sender
            .submit("panics", |_: &mut Counter| -> Result<(), TaskError> {
                panic!("boom")
            })
            .unwrap();
        let ok = sender
            .submit("ok", |c: &mut Counter| {
                c.value = 7;
                Ok(())
            })
            .unwrap();

        let mut counter = Counter::default();
        let report = queue.drain(&mut counter);
        assert_eq!(report.executed, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(counter.value, 7);

        assert!(matches!(failing.wait(), Err(TaskError::Failed(_))));
        assert!(matches!(panicking.wait(), Err(TaskError::Abandoned { .. })));
        assert!(ok.wait().is_ok());
    }

    #[test]
    fn test_tasks_submitted_during_drain_wait_for_next_drain() {
        let (queue, sender) = queue(8);
        let inner = sender.clone();
        sender
            .submit("spawner", move |_: &mut Counter| {
                inner
                    .submit("late", |c: &mut Counter| {
                        c.value += 100;
                        Ok(())
                    })
                    .map(|_| ())
            })
            .unwrap();

        let mut counter = Counter::default();
        assert_eq!(queue.drain(&mut counter).executed, 1);
        assert_eq!(counter.value, 0);
        assert_eq!(queue.drain(&mut counter).executed, 1);
        assert_eq!(counter.value, 100);
    }

    #[test]
    fn test_slow_task_is_reported_over_budget() {
        let (queue, sender) = GpuTaskQueue::<Counter>::bounded(2, Duration::from_millis(1));
        sender
            .submit("slow", |_: &mut Counter| {
                thread::sleep(Duration::from_millis(10));
                Ok(())
            })
            .unwrap();
        let report = queue.drain(&mut Counter::default());
        assert_eq!(report.over_budget, 1);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn test_submit_from_another_thread() {
        let (queue, sender) = queue(4);
        let handle = thread::spawn(move || {
            sender
                .submit("remote", |c: &mut Counter| Ok(c.value + 1))
                .unwrap()
        })
        .join()
        .unwrap();

        let mut counter = Counter { value: 41 };
        queue.drain(&mut counter);
        assert_eq!(handle.wait_timeout(Duration::from_secs(1)).unwrap().unwrap(), 42);
    }

    #[test]
    fn test_dropped_queue_abandons_pending_tasks() {
        let (queue, sender) = queue(4);
        let handle = sender.submit("orphan", |_: &mut Counter| Ok(())).unwrap();
        drop(queue);
        drop(sender);
        assert!(matches!(handle.wait(), Err(TaskError::Abandoned { .. })));
    }
}
