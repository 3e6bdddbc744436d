//! Worker thread which owns the coordinator, so that exactly one tick is processed at a time.
//!
//! The main thread sends each batch of ticks as a [`WorkerSignal::Ticks`] and waits for the
//! matching [`WorkerSignal::Plan`] (or [`WorkerSignal::Error`]) before sending the next batch.

// -----------------------------------------------------------------------------------------------
// INCLUDES
// -----------------------------------------------------------------------------------------------

use std::{
    sync::mpsc::{channel, Receiver, RecvError, SendError, Sender},
    thread::{self, JoinHandle},
};

use comms_if::tick::Tick;
use log::{debug, warn};
use util::module::State;

use super::{CoordError, Coordinator, Plan, StatusReport};

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Main thread side of the worker.
pub struct WorkerHandle {
    sender: Sender<WorkerSignal>,
    receiver: Receiver<WorkerSignal>,
    jh: Option<JoinHandle<Result<(), CoordError>>>,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug)]
pub enum WorkerSignal {
    /// The worker should stop it's operations
    Stop,

    /// A batch of ticks to apply before planning
    Ticks(Vec<Tick>),

    /// The plan produced from the last batch
    Plan(Plan, Box<StatusReport>),

    /// Unhandlable error
    Error(Box<CoordError>),
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl WorkerHandle {
    /// Move the coordinator into a new worker thread.
    pub fn spawn(coord: Coordinator) -> std::io::Result<Self> {
        let (main_sender, worker_receiver) = channel();
        let (worker_sender, main_receiver) = channel();

        let jh = thread::Builder::new()
            .name("wuc::worker".into())
            .spawn(move || worker_thread(coord, worker_sender, worker_receiver))?;

        Ok(Self {
            sender: main_sender,
            receiver: main_receiver,
            jh: Some(jh),
        })
    }

    /// Send a batch of ticks to the worker and wait for the resulting plan.
    pub fn process(&self, ticks: Vec<Tick>) -> Result<(Plan, StatusReport), CoordError> {
        self.sender.send(WorkerSignal::Ticks(ticks))?;

        match self.receiver.recv()? {
            WorkerSignal::Plan(plan, report) => Ok((plan, *report)),
            WorkerSignal::Error(e) => Err(*e),
            s => {
                warn!("Unexpected signal from the worker: {:?}", s);
                Err(CoordError::WorkerRecvError)
            }
        }
    }

    /// Stop the worker and wait for it to exit.
    pub fn stop(mut self) -> Result<(), CoordError> {
        // The worker may already have exited after an error
        self.sender.send(WorkerSignal::Stop).ok();

        match self.jh.take() {
            Some(jh) => match jh.join() {
                Ok(r) => r,
                Err(_) => {
                    warn!("Worker thread panicked");
                    Err(CoordError::WorkerRecvError)
                }
            },
            None => Ok(()),
        }
    }
}

impl From<SendError<WorkerSignal>> for CoordError {
    fn from(_: SendError<WorkerSignal>) -> Self {
        Self::WorkerSendError
    }
}

impl From<RecvError> for CoordError {
    fn from(_: RecvError) -> Self {
        Self::WorkerRecvError
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

fn worker_thread(
    mut coord: Coordinator,
    main_sender: Sender<WorkerSignal>,
    main_reciever: Receiver<WorkerSignal>,
) -> Result<(), CoordError> {
    // Wait for commands from main
    while let Ok(signal) = main_reciever.recv() {
        match signal {
            WorkerSignal::Stop => break,
            WorkerSignal::Ticks(ticks) => match coord.proc(&ticks) {
                Ok((plan, report)) => {
                    main_sender.send(WorkerSignal::Plan(plan, Box::new(report)))?
                }
                Err(e) => {
                    main_sender.send(WorkerSignal::Error(Box::new(e)))?;
                    break;
                }
            },
            s => warn!("Worker received unexpected signal {:?}", s),
        }
    }

    debug!("Worker thread exiting");

    Ok(())
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
