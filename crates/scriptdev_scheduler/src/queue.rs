//! FIFO task queue shared by every worker of a pool.
//!
//! The queue starts closed. It is opened once workers exist and closed again
//! at shutdown; a closed queue rejects new tasks and tells waiting workers to
//! exit.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// A unit of work executed exactly once by exactly one worker.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Outcome of one bounded wait on the queue
pub(crate) enum Pop {
    /// A task was dequeued and now belongs to the caller
    Task(Task),
    /// The wait timed out with nothing to do
    Idle,
    /// The queue was closed; the worker should exit
    Closed,
}

struct QueueState {
    tasks: VecDeque<Task>,
    open: bool,
}

pub(crate) struct TaskQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                open: false,
            }),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn open(&self) {
        self.state.lock().open = true;
    }

    /// Close the queue, wake every waiter, and hand back the tasks nobody
    /// picked up. The caller drops them outside the lock.
    pub(crate) fn close(&self) -> Vec<Task> {
        let abandoned = {
            let mut state = self.state.lock();
            state.open = false;
            state.tasks.drain(..).collect()
        };
        self.ready.notify_all();
        abandoned
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Enqueue a task and wake one waiting worker. Returns false, without
    /// enqueueing, if the queue is closed.
    pub(crate) fn push(&self, task: Task) -> bool {
        {
            let mut state = self.state.lock();
            if !state.open {
                return false;
            }
            state.tasks.push_back(task);
        }
        self.ready.notify_one();
        true
    }

    /// Dequeue the oldest task, waiting at most `timeout` for one to arrive.
    pub(crate) fn pop_timeout(&self, timeout: Duration) -> Pop {
        let mut state = self.state.lock();
        if !state.open {
            return Pop::Closed;
        }
        if let Some(task) = state.tasks.pop_front() {
            return Pop::Task(task);
        }

        self.ready.wait_for(&mut state, timeout);

        if !state.open {
            return Pop::Closed;
        }
        match state.tasks.pop_front() {
            Some(task) => Pop::Task(task),
            None => Pop::Idle,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }
}
