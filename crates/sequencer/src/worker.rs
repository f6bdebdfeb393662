//! Acquisition worker: the drain loop and its guaranteed epilogue

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};

use contracts::{AcquisitionPhase, CameraError, RunStatus, RunSummary, SequenceRequest};
use dispatcher::DeliveryOutcome;
use ingestion::{
    millis, wait_for_elapsed_or_stop, DrainOutcome, FrameHandoff, SourceKind, StopSignal,
    EMPTY_SEQUENCE,
};
use tracing::{debug, error, info, trace, warn};

use crate::controller::Shared;

/// Poll period while suspended, so a stop is noticed
const SUSPEND_POLL: Duration = Duration::from_millis(50);

thread_local! {
    static ON_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// True on an acquisition worker thread (sink, trigger and listener callbacks)
pub(crate) fn on_worker_thread() -> bool {
    ON_WORKER.with(Cell::get)
}

pub(crate) fn run(
    shared: Arc<Shared>,
    handoff: Arc<FrameHandoff>,
    stop: StopSignal,
    request: SequenceRequest,
) {
    ON_WORKER.with(|flag| flag.set(true));
    let started = Instant::now();
    let label = shared.config.label.clone();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        drain_loop(&shared, &handoff, &stop, &request, started)
    }));
    let status = match outcome {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            error!(camera = %label, error = %e, "Acquisition failed");
            RunStatus::Failed(e.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(camera = %label, panic = %message, "Acquisition worker fault");
            RunStatus::Failed(message)
        }
    };

    shared.source.detach();
    if let Err(e) = shared.sink.flush() {
        warn!(camera = %label, error = %e, "Sink flush failed");
    }

    let handoff_totals = handoff.metrics().snapshot();
    observability::record_handoff_totals(
        &label,
        handoff_totals.published,
        handoff_totals.skipped,
        handoff_totals.wait_timeouts,
    );
    debug!(
        camera = %label,
        published = handoff_totals.published,
        skipped = handoff_totals.skipped,
        drained = handoff_totals.drained,
        wait_timeouts = handoff_totals.wait_timeouts,
        "Handoff totals"
    );

    let summary = RunSummary {
        frames_delivered: shared.frames_delivered.load(Ordering::SeqCst),
        status,
        elapsed: started.elapsed(),
    };

    {
        let mut state = shared.lock_state();
        state.phase = AcquisitionPhase::Stopped;
        state.finished_elapsed = Some(summary.elapsed);
        state.last_status = Some(summary.status.clone());
        shared
            .handoff
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        shared.state_changed.notify_all();
    }

    observability::record_run_finished(&label, &summary);
    info!(
        camera = %label,
        frames_delivered = summary.frames_delivered,
        status = %summary.status,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Sequence finished"
    );

    notify_finished(&shared, &summary);
}

fn drain_loop(
    shared: &Shared,
    handoff: &FrameHandoff,
    stop: &StopSignal,
    request: &SequenceRequest,
    started: Instant,
) -> Result<RunStatus, CameraError> {
    let label = &shared.config.label;
    let paced = shared.source.kind() == SourceKind::Synthesized;
    let interval = millis(request.interval_ms);

    let mut last_sequence = EMPTY_SEQUENCE;
    let mut frame_number: u64 = 0;
    let mut last_frame_start: Option<Instant> = None;
    let mut last_elapsed_ms: Option<f64> = None;

    loop {
        if stop.is_stopped() {
            return Ok(RunStatus::Interrupted);
        }
        let delivered = shared.frames_delivered.load(Ordering::SeqCst);
        if request.count.is_reached(delivered) {
            return Ok(RunStatus::Completed);
        }
        if !wait_while_suspended(shared, stop) {
            return Ok(RunStatus::Interrupted);
        }

        if let Some(trigger) = shared.trigger() {
            if let Err(e) = trigger.fire() {
                warn!(camera = %label, device = %trigger.name(), error = %e, "Trigger failed, continuing");
                observability::record_trigger_failure(trigger.name());
            }
        }

        if paced {
            if let Some(previous) = last_frame_start {
                if wait_for_elapsed_or_stop(previous, interval, stop) {
                    return Ok(RunStatus::Interrupted);
                }
            }
            last_frame_start = Some(Instant::now());
        }
        shared.source.produce(frame_number, stop)?;
        frame_number += 1;

        let captured = match handoff.drain(last_sequence, shared.config.drain_timeout) {
            DrainOutcome::Frame(captured) => captured,
            DrainOutcome::Empty => {
                trace!(camera = %label, "No new frame, re-checking");
                continue;
            }
        };
        last_sequence = captured.sequence;

        let frame = shared
            .sink
            .frame_from(captured, delivered, started.elapsed());
        match shared.sink.deliver(&frame)? {
            DeliveryOutcome::Delivered => {
                shared.frames_delivered.fetch_add(1, Ordering::SeqCst);
                observability::record_frame_delivered(&frame.metadata);
                if let Some(previous) = last_elapsed_ms {
                    observability::record_frame_interval_ms(
                        label,
                        frame.metadata.elapsed_ms - previous,
                    );
                }
                last_elapsed_ms = Some(frame.metadata.elapsed_ms);
                trace!(
                    camera = %label,
                    frame_index = frame.metadata.frame_index,
                    sequence = frame.metadata.sequence_number,
                    "Frame delivered"
                );
            }
            DeliveryOutcome::Overflow => {
                warn!(
                    camera = %label,
                    frame_index = frame.metadata.frame_index,
                    "Sink overflow, stopping sequence"
                );
                return Ok(RunStatus::Overflow);
            }
        }
        observability::record_sink_depth(shared.sink.sink_name(), shared.sink.metrics().buffered_len());
    }
}

/// Block while suspended; `false` if a stop arrived
fn wait_while_suspended(shared: &Shared, stop: &StopSignal) -> bool {
    let mut suspended = shared
        .suspended
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    while *suspended && !stop.is_stopped() {
        suspended = shared
            .resume
            .wait_timeout(suspended, SUSPEND_POLL)
            .unwrap_or_else(PoisonError::into_inner)
            .0;
    }
    !stop.is_stopped()
}

fn notify_finished(shared: &Shared, summary: &RunSummary) {
    let Some(listener) = shared.listener() else {
        return;
    };
    let label = &shared.config.label;
    match panic::catch_unwind(AssertUnwindSafe(|| listener.acquisition_finished(summary))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(camera = %label, error = %e, "Finished notification failed"),
        Err(payload) => error!(
            camera = %label,
            panic = %panic_message(payload.as_ref()),
            "Finished notification panicked"
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
