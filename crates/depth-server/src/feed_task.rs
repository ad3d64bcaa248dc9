//! Writer task.
//!
//! This task owns the only `DepthWriter` and applies every `FeedRequest`
//! coming from feed connections, in arrival order. Readers query the same
//! engine through `DepthReader` handles and never go through this task.
//!
//! Requests already queued when the task wakes up are applied as one batch
//! under a single lock acquisition.

use depth_core::{ApplyOutcome, DepthWriter};
use tracing::{debug, info, trace};

use crate::types::{FeedRequest, FeedRx};

/// Upper bound on events applied under one lock acquisition.
const MAX_BATCH: usize = 256;

/// Run the writer loop until every `FeedTx` is dropped.
pub async fn run_feed_loop(mut feed_rx: FeedRx, mut writer: DepthWriter) {
    let mut batch: Vec<FeedRequest> = Vec::with_capacity(MAX_BATCH);

    while let Some(first) = feed_rx.recv().await {
        batch.push(first);
        while batch.len() < MAX_BATCH {
            match feed_rx.try_recv() {
                Ok(req) => batch.push(req),
                Err(_) => break,
            }
        }

        apply_batch(&mut writer, &mut batch);
    }

    info!("feed loop shutting down (feed channel closed)");
}

fn apply_batch(writer: &mut DepthWriter, batch: &mut Vec<FeedRequest>) {
    let origins: Vec<(u64, &'static str)> = batch
        .iter()
        .map(|req| (req.client_id.0, req.event.kind()))
        .collect();
    let outcomes = writer.apply_each(batch.drain(..).map(|req| req.event));

    for ((client, kind), outcome) in origins.into_iter().zip(outcomes) {
        match outcome {
            ApplyOutcome::Applied => trace!(client, kind, "event applied"),
            ApplyOutcome::Ignored => debug!(client, kind, "event ignored"),
        }
    }
}
