//! The personalization queue
//!
//! One worker task owns the queue and the reader. The loop is an explicit
//! state machine: it folds submissions, watcher results and shutdown into
//! events, and a transition handler per event moves the current job
//! through Queued -> WaitingForCard -> Processing -> Done/Failed. The next
//! job never starts before the previous card has been removed.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tap_card::WaitOutcome;

use crate::models::{CardRequest, CardResponse, JobError, JobState, JobView};
use crate::watcher::{CardWatcher, WatchReply};
use crate::writer::CardWriter;

/// Submissions beyond this block the submitter until the worker catches up
const QUEUE_CAPACITY: usize = 100;

/// How long each watcher arm waits before reporting a timeout
const WATCH_TIMEOUT: Duration = Duration::from_secs(5);

struct CardJob {
    request: CardRequest,
    reply: Option<oneshot::Sender<Result<CardResponse, JobError>>>,
    state: JobState,
}

/// Everything that can wake the worker loop
enum Event {
    Submitted(Option<CardJob>),
    CardPresent(Result<WaitOutcome, String>),
    CardRemoved(Result<WaitOutcome, String>),
    Shutdown,
}

/// Submission handle shared by the HTTP API and the issuer client
#[derive(Clone)]
pub struct Service {
    submit_tx: mpsc::Sender<CardJob>,
    snapshot: Arc<RwLock<Vec<JobView>>>,
}

impl Service {
    /// Enqueue a card and get the single-shot reply channel
    ///
    /// Blocks (asynchronously) while the queue is full.
    pub async fn enqueue(
        &self,
        request: CardRequest,
    ) -> Result<oneshot::Receiver<Result<CardResponse, JobError>>, JobError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        let job = CardJob {
            request,
            reply: Some(reply_tx),
            state: JobState::Queued,
        };

        self.submit_tx
            .send(job)
            .await
            .map_err(|_| JobError::QueueClosed)?;

        Ok(reply_rx)
    }

    /// Enqueue and wait for the job to finish
    pub async fn submit(&self, request: CardRequest) -> Result<CardResponse, JobError> {
        let reply = self.enqueue(request).await?;
        reply.await.map_err(|_| JobError::Cancelled)?
    }

    /// Current queue contents with per-job state
    pub fn jobs(&self) -> Vec<JobView> {
        self.snapshot.read().clone()
    }
}

pub struct Worker {
    submit_rx: mpsc::Receiver<CardJob>,
    watcher: Arc<dyn CardWatcher>,
    writer: Arc<dyn CardWriter>,
    cancel: CancellationToken,

    queue: VecDeque<CardJob>,
    job_in_progress: bool,
    present_watch: Option<WatchReply>,
    removed_watch: Option<WatchReply>,
    snapshot: Arc<RwLock<Vec<JobView>>>,
}

/// Build the service handle and spawn its worker task
pub fn spawn(
    watcher: Arc<dyn CardWatcher>,
    writer: Arc<dyn CardWriter>,
    cancel: CancellationToken,
) -> (Service, JoinHandle<()>) {
    let (submit_tx, submit_rx) = mpsc::channel(QUEUE_CAPACITY);
    let snapshot = Arc::new(RwLock::new(Vec::new()));

    let worker = Worker {
        submit_rx,
        watcher,
        writer,
        cancel,
        queue: VecDeque::new(),
        job_in_progress: false,
        present_watch: None,
        removed_watch: None,
        snapshot: snapshot.clone(),
    };

    let handle = tokio::spawn(worker.run());

    (
        Service {
            submit_tx,
            snapshot,
        },
        handle,
    )
}

impl Worker {
    async fn run(mut self) {
        info!("card personalizer worker started");

        loop {
            // select! creates every arm's future before checking guards, so
            // the guards must not touch the fields the futures borrow
            let present_armed = self.present_watch.is_some();
            let removed_armed = self.removed_watch.is_some();

            let event = tokio::select! {
                job = self.submit_rx.recv() => Event::Submitted(job),
                outcome = recv_watch(&mut self.present_watch),
                    if present_armed => Event::CardPresent(outcome),
                outcome = recv_watch(&mut self.removed_watch),
                    if removed_armed => Event::CardRemoved(outcome),
                () = self.cancel.cancelled() => Event::Shutdown,
            };

            match event {
                Event::Submitted(Some(job)) => self.on_submitted(job),
                Event::Submitted(None) => {
                    info!("submission channel closed, stopping worker");
                    break;
                }
                Event::CardPresent(outcome) => self.on_card_present(outcome).await,
                Event::CardRemoved(outcome) => self.on_card_removed(outcome),
                Event::Shutdown => {
                    info!("shutdown requested, stopping worker");
                    break;
                }
            }
        }

        self.drain();
        info!("card personalizer worker stopped");
    }

    fn on_submitted(&mut self, job: CardJob) {
        info!(job = %job.request.name, queued = self.queue.len(), "job submitted");
        self.queue.push_back(job);
        self.publish_snapshot();

        if !self.job_in_progress {
            self.start_next();
        }
    }

    /// Arm the card-present watch for the head of the queue
    fn start_next(&mut self) {
        self.job_in_progress = false;
        self.present_watch = None;
        self.removed_watch = None;

        let Some(job) = self.queue.front_mut() else {
            self.publish_snapshot();
            return;
        };

        self.job_in_progress = true;
        job.state = JobState::WaitingForCard;
        info!(job = %job.request.name, "waiting for card");

        self.present_watch = Some(self.watcher.watch_card_present(WATCH_TIMEOUT));
        self.publish_snapshot();
    }

    async fn on_card_present(&mut self, outcome: Result<WaitOutcome, String>) {
        self.present_watch = None;
        if !self.job_in_progress {
            return;
        }

        match outcome {
            Ok(WaitOutcome::Present) => self.process_current().await,
            Ok(_) => {
                // timeout preserves state; the watch is simply re-armed
                self.present_watch = Some(self.watcher.watch_card_present(WATCH_TIMEOUT));
            }
            Err(reason) => {
                warn!(error = %reason, "card wait failed");
                self.finish_current(Err(JobError::Watch(reason)), JobState::Failed);
            }
        }
    }

    /// Write the card at the head of the queue and report the result
    async fn process_current(&mut self) {
        let request = {
            let job = self.queue.front_mut().expect("job in progress");
            job.state = JobState::Processing;
            job.request.clone()
        };
        self.publish_snapshot();
        info!(job = %request.name, "processing job");

        match self.writer.write(&request).await {
            Ok(response) => self.finish_current(Ok(response), JobState::Done),
            Err(err) => {
                warn!(job = %request.name, error = %err, "job failed");
                self.finish_current(Err(err), JobState::Failed);
            }
        }
    }

    /// Deliver the result and wait for the card to leave the reader;
    /// success and failure alike must see a removal before the next job
    fn finish_current(
        &mut self,
        result: Result<CardResponse, JobError>,
        state: JobState,
    ) {
        if let Some(job) = self.queue.front_mut() {
            job.state = state;
            if let Some(reply) = job.reply.take() {
                let _ = reply.send(result);
            }
            info!(job = %job.request.name, state = ?state, "job finished");
        }

        self.publish_snapshot();
        self.removed_watch = Some(self.watcher.watch_card_removed(WATCH_TIMEOUT));
    }

    fn on_card_removed(&mut self, outcome: Result<WaitOutcome, String>) {
        self.removed_watch = None;
        if !self.job_in_progress {
            return;
        }

        match outcome {
            Ok(WaitOutcome::Removed) => {}
            Ok(_) => {
                self.removed_watch = Some(self.watcher.watch_card_removed(WATCH_TIMEOUT));
                return;
            }
            Err(reason) => {
                // a broken wait must not wedge the queue; treat as removed
                warn!(error = %reason, "card removal wait failed");
            }
        }

        if let Some(job) = self.queue.pop_front() {
            info!(job = %job.request.name, "card removed, job retired");
        }
        self.start_next();
    }

    /// Fail everything still queued on shutdown
    fn drain(&mut self) {
        while let Some(mut job) = self.queue.pop_front() {
            if let Some(reply) = job.reply.take() {
                let _ = reply.send(Err(JobError::Cancelled));
            }
        }
        self.publish_snapshot();
    }

    fn publish_snapshot(&self) {
        let view = self
            .queue
            .iter()
            .map(|job| JobView {
                name: job.request.name.clone(),
                state: job.state,
            })
            .collect();
        *self.snapshot.write() = view;
    }
}

/// Await an armed watch; the select arm guards on `is_some`
async fn recv_watch(slot: &mut Option<WatchReply>) -> Result<WaitOutcome, String> {
    match slot.as_mut() {
        Some(reply) => match reply.await {
            Ok(outcome) => outcome,
            Err(_) => Err("watcher dropped its channel".to_string()),
        },
        None => std::future::pending().await,
    }
}
