use std::fmt::Display;
use std::future::Future;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Registry for fire-and-forget event work. Inbound HTTP handlers must ack
/// Slack within its deadline, so the real work runs in spawned tasks; the
/// supervisor exists so their outcomes are still logged and awaitable
/// instead of vanishing into the runtime.
#[derive(Default)]
pub struct TaskSupervisor {
    handles: Mutex<Vec<(String, JoinHandle<()>)>>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a named task and records its handle. The task's own error is
    /// logged, not propagated; a panic surfaces as a join error later.
    pub async fn spawn<F, E>(&self, task_name: &str, correlation_id: &str, future: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let name = task_name.to_string();
        let correlation = correlation_id.to_string();

        let handle = tokio::spawn({
            let name = name.clone();
            async move {
                match future.await {
                    Ok(()) => info!(
                        event_name = "task.completed",
                        task_name = %name,
                        correlation_id = %correlation,
                        "background task finished"
                    ),
                    Err(error) => error!(
                        event_name = "task.failed",
                        task_name = %name,
                        correlation_id = %correlation,
                        error = %error,
                        "background task failed"
                    ),
                }
            }
        });

        let mut handles = self.handles.lock().await;
        reap_finished(&mut handles).await;
        handles.push((name, handle));
    }

    /// Awaits every spawned task. Used on shutdown and in tests; panicked
    /// tasks are logged here rather than re-raised.
    pub async fn wait_idle(&self) {
        let drained: Vec<_> = self.handles.lock().await.drain(..).collect();
        for (name, handle) in drained {
            if let Err(join_error) = handle.await {
                error!(
                    event_name = "task.join_failed",
                    task_name = %name,
                    error = %join_error,
                    "background task did not join cleanly"
                );
            }
        }
    }

    pub async fn pending_count(&self) -> usize {
        let mut handles = self.handles.lock().await;
        reap_finished(&mut handles).await;
        handles.len()
    }
}

/// Drops entries whose task has already run. Joining a finished handle does
/// not block, and it is the only place a panic from the task surfaces, so
/// finished entries are joined here instead of silently discarded. Without
/// this the registry would grow by one entry per Slack event until shutdown.
async fn reap_finished(handles: &mut Vec<(String, JoinHandle<()>)>) {
    let mut index = 0;
    while index < handles.len() {
        if handles[index].1.is_finished() {
            let (name, handle) = handles.remove(index);
            if let Err(join_error) = handle.await {
                error!(
                    event_name = "task.join_failed",
                    task_name = %name,
                    error = %join_error,
                    "background task did not join cleanly"
                );
            }
        } else {
            index += 1;
        }
    }
}
