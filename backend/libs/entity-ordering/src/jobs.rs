//! Fire-and-forget ordering jobs.
//!
//! [`OrderingJobService`] exposes the ordering operations as "jobs": every
//! `schedule_*` call hands the work to a [`JobScheduler`] and returns an
//! opaque job id straight away. The id cannot be used to query status,
//! cancel, or fetch a result. Failures inside the job are logged and go
//! nowhere else; failures while scheduling turn into an empty job id.
//!
//! Two schedulers are provided:
//!
//! - [`ImmediateJobScheduler`] spawns a detached tokio task per job. Nothing
//!   tracks the task; if the process exits first, the work is lost.
//! - [`ManualJobScheduler`] queues jobs until [`ManualJobScheduler::run_pending`]
//!   is awaited. Deterministic, for tests and one-shot processes.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::VecDeque;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{OrderingError, OrderingResult};
use crate::model::{OrderColumn, Orderable, ReorderItem};
use crate::service::OrderingService;

/// Unit of work handed to a scheduler. Errors are already handled inside.
pub type Job = BoxFuture<'static, ()>;

/// Accepts jobs for later execution.
pub trait JobScheduler: Send + Sync {
    /// Accept `job` and return its id. Must not wait for the job to run.
    fn schedule(&self, job_name: &'static str, job: Job) -> OrderingResult<String>;
}

/// Runs each job on a detached tokio task as soon as it is scheduled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateJobScheduler;

impl ImmediateJobScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl JobScheduler for ImmediateJobScheduler {
    fn schedule(&self, job_name: &'static str, job: Job) -> OrderingResult<String> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| OrderingError::SchedulerUnavailable(e.to_string()))?;

        let job_id = Uuid::new_v4().to_string();
        let span = info_span!("ordering_job", job_id = %job_id, job = job_name);

        // JoinHandle dropped: the task is detached and untracked.
        drop(runtime.spawn(job.instrument(span)));

        debug!(job_id = %job_id, job = job_name, "Ordering job spawned");
        Ok(job_id)
    }
}

struct QueuedJob {
    id: String,
    name: &'static str,
    job: Job,
}

/// Holds jobs in FIFO order until [`run_pending`](Self::run_pending) is awaited.
#[derive(Default)]
pub struct ManualJobScheduler {
    queue: Mutex<VecDeque<QueuedJob>>,
}

impl ManualJobScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue
            .lock()
            .map(|queue| queue.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    /// Run queued jobs one after another, including any they schedule.
    ///
    /// Returns how many jobs ran.
    pub async fn run_pending(&self) -> usize {
        let mut ran = 0;

        while let Some(queued) = self.pop() {
            let span = info_span!("ordering_job", job_id = %queued.id, job = queued.name);
            queued.job.instrument(span).await;
            ran += 1;
        }

        ran
    }

    fn pop(&self) -> Option<QueuedJob> {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
    }
}

impl JobScheduler for ManualJobScheduler {
    fn schedule(&self, job_name: &'static str, job: Job) -> OrderingResult<String> {
        let job_id = Uuid::new_v4().to_string();

        self.queue
            .lock()
            .map_err(|_| OrderingError::SchedulerUnavailable("job queue poisoned".to_string()))?
            .push_back(QueuedJob {
                id: job_id.clone(),
                name: job_name,
                job,
            });

        debug!(job_id = %job_id, job = job_name, "Ordering job queued");
        Ok(job_id)
    }
}

/// Job-style front end to an [`OrderingService`].
pub struct OrderingJobService<T, S> {
    ordering: Arc<S>,
    scheduler: Arc<dyn JobScheduler>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, S> Clone for OrderingJobService<T, S> {
    fn clone(&self) -> Self {
        Self {
            ordering: Arc::clone(&self.ordering),
            scheduler: Arc::clone(&self.scheduler),
            _entity: PhantomData,
        }
    }
}

impl<T, S> OrderingJobService<T, S>
where
    T: Orderable,
    S: OrderingService<T> + 'static,
{
    pub fn new(ordering: Arc<S>, scheduler: Arc<dyn JobScheduler>) -> Self {
        Self {
            ordering,
            scheduler,
            _entity: PhantomData,
        }
    }

    /// The service the jobs call into, for callers that want to wait.
    pub fn ordering(&self) -> &Arc<S> {
        &self.ordering
    }

    pub fn schedule_reorder_after_insert(
        &self,
        entity_id: &str,
        new_order: i32,
        column: &OrderColumn,
    ) -> String {
        let ordering = Arc::clone(&self.ordering);
        let entity_id = entity_id.to_string();
        let column = column.clone();

        self.submit("reorder_after_insert", async move {
            OrderingService::<T>::reorder_after_insert(&*ordering, &entity_id, new_order, &column)
                .await
        })
    }

    pub fn schedule_reorder_after_delete(
        &self,
        deleted_order: i32,
        column: &OrderColumn,
    ) -> String {
        let ordering = Arc::clone(&self.ordering);
        let column = column.clone();

        self.submit("reorder_after_delete", async move {
            OrderingService::<T>::reorder_after_delete(&*ordering, deleted_order, &column).await
        })
    }

    pub fn schedule_validate_and_fix(&self, column: &OrderColumn) -> String {
        let ordering = Arc::clone(&self.ordering);
        let column = column.clone();

        self.submit("validate_and_fix_order", async move {
            OrderingService::<T>::validate_and_fix_order(&*ordering, &column)
                .await
                .map(|_| ())
        })
    }

    pub fn schedule_batch_reorder(&self, items: Vec<ReorderItem>, column: &OrderColumn) -> String {
        let ordering = Arc::clone(&self.ordering);
        let column = column.clone();

        self.submit("process_batch_reorder", async move {
            // The summary is logged by the service; a job has nowhere to return it.
            OrderingService::<T>::process_batch_reorder(&*ordering, &items, &column).await;
            Ok(())
        })
    }

    /// Recurring schedules are not supported; logs a warning and does nothing.
    pub fn schedule_recurring_validation(&self, cron_expression: &str, column: &OrderColumn) {
        warn!(
            entity = T::TABLE,
            column = %column,
            cron = %cron_expression,
            "Recurring ordering jobs are not supported; schedule ignored"
        );
    }

    fn submit<F>(&self, job_name: &'static str, work: F) -> String
    where
        F: Future<Output = OrderingResult<()>> + Send + 'static,
    {
        let job = async move {
            if let Err(e) = work.await {
                error!(
                    entity = T::TABLE,
                    job = job_name,
                    error = %e,
                    "Ordering job failed"
                );
            }
        }
        .boxed();

        match self.scheduler.schedule(job_name, job) {
            Ok(job_id) => {
                info!(
                    entity = T::TABLE,
                    job = job_name,
                    job_id = %job_id,
                    "Ordering job scheduled"
                );
                job_id
            }
            Err(e) => {
                error!(
                    entity = T::TABLE,
                    job = job_name,
                    error = %e,
                    "Failed to schedule ordering job"
                );
                String::new()
            }
        }
    }
}
