//! Main coordinator executable entry point.
//!
//! # Architecture
//!
//! The executable replays a tick script against the coordinator:
//!
//!     - Initialise the session, logging and the coordinator
//!     - Move the coordinator into the worker thread
//!     - Main loop:
//!         - Collect the ticks due this cycle from the script
//!         - Hand them to the worker and wait for the plan
//!         - Save the plan and status report into the session
//!     - Stop the worker at the end of the script
//!
//! # Usage
//!
//! `wuc_exec <script_path>`, with `WUC_SW_ROOT` pointing at the directory containing `params/`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::env;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::{PendingTicks, ScriptInterpreter},
    session::{self, Session},
};
use wuc_lib::coord::{worker::WorkerHandle, Coordinator, StatusReport};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.10;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("wuc_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Worker Unit Coordinator Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD SCRIPT ----

    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    if args.len() != 2 {
        return Err(eyre!(
            "Expected one argument (the tick script path), found {}",
            args.len() - 1
        ));
    }

    info!("Loading script from \"{}\"", &args[1]);

    let mut si = ScriptInterpreter::new(&args[1]).wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} ticks\n",
        si.get_duration(),
        si.get_num_ticks()
    );

    // ---- INITIALISE COORDINATOR ----

    let mut coord = Coordinator::default();
    coord
        .init("wuc.toml", &session)
        .wrap_err("Failed to initialise the Coordinator")?;

    let worker = WorkerHandle::spawn(coord).wrap_err("Failed to start the worker thread")?;

    info!("Worker started\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut last_report: Option<StatusReport> = None;

    loop {
        let cycle_start_instant = Instant::now();

        let ticks = match si.get_pending_ticks() {
            PendingTicks::None => None,
            PendingTicks::Some(t) => Some(t),
            PendingTicks::EndOfScript => {
                info!("End of tick script reached, stopping");
                break;
            }
        };

        if let Some(ticks) = ticks {
            let (plan, report) = worker
                .process(ticks)
                .wrap_err("An error occured while processing ticks")?;

            for (unit_id, commands) in plan.iter() {
                debug!("Unit {}: {} commands", unit_id, commands.len());
            }

            if !plan.is_empty() {
                session.save(format!("plans/plan_{:06}.json", report.tick), plan);
                session.save(format!("reports/report_{:06}.json", report.tick), report.clone());
            }

            last_report = Some(report);
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
            ),
        }
    }

    // ---- SHUTDOWN ----

    worker.stop().wrap_err("The worker thread failed")?;

    if let Some(report) = last_report {
        info!(
            "Final state: {} pending, {} active, {} finished, {} cells mapped",
            report.num_pending, report.num_active, report.num_finished, report.num_cells
        );
        session::save_with_timestamp("final_report.json", report);
    }

    session.exit();

    info!("End of execution");

    Ok(())
}
