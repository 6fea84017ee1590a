//! Simulation scheduler
//!
//! The main loop: one fixed-duration tick per iteration. Each tick drains
//! at most one protocol command (or a local override), applies it to the
//! simulation, routes the reply, and publishes a render snapshot for the
//! external renderer/HUD. The scheduler is the sole writer of the tick
//! counter and the sole consumer of the command queue.
//!
//! Pacing is explicit configuration. Client-paced couples simulation time
//! to protocol turns: while a client is attached the loop waits (in bounded
//! slices, so the local stop flag stays responsive) for its next command.
//! Free-running never waits; a missing command becomes a coast tick. With
//! no client attached both policies coast at the configured tick rate.

use crate::config::{Pacing, SimulationConfig};
use crate::error::Result;
use crate::geometry::{Point, Pose};
use crate::protocol::{CommandServer, PendingRequest, TickReply};
use crate::robot::DriveCommand;
use crate::sim::{Simulation, TickDirective, TickReport};
use crossbeam_channel::{bounded, Receiver, Sender};
use log::info;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Bounded wait slice while client-paced; keeps the stop flag live
const POLL_SLICE: Duration = Duration::from_millis(100);

/// Per-tick snapshot for the external renderer
#[derive(Debug, Clone)]
pub struct RenderFrame {
    pub tick: u64,
    pub pose: Pose,
    pub perimeter: Vec<Point>,
    pub readings: BTreeMap<String, f32>,
}

enum Acquired {
    Request(PendingRequest),
    Coast,
    Stopped,
}

/// Fixed-tick scheduler wiring the simulation to the protocol server
pub struct Scheduler {
    sim: Simulation,
    server: CommandServer,
    pacing: Pacing,
    tick_interval: Duration,
    dt: f32,
    stop: Arc<AtomicBool>,
    render_tx: Sender<RenderFrame>,
    render_rx: Option<Receiver<RenderFrame>>,
    override_tx: Sender<DriveCommand>,
    override_rx: Receiver<DriveCommand>,
}

impl Scheduler {
    pub fn new(
        sim: Simulation,
        server: CommandServer,
        config: &SimulationConfig,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let dt = 1.0 / config.tick_hz;
        let (render_tx, render_rx) = bounded(4);
        let (override_tx, override_rx) = bounded(4);
        Self {
            sim,
            server,
            pacing: config.pacing,
            tick_interval: Duration::from_secs_f32(dt),
            dt,
            stop,
            render_tx,
            render_rx: Some(render_rx),
            override_tx,
            override_rx,
        }
    }

    /// Take the render snapshot stream (once); frames are dropped when the
    /// consumer falls behind
    pub fn render_frames(&mut self) -> Option<Receiver<RenderFrame>> {
        self.render_rx.take()
    }

    /// Handle for local override drive commands that bypass the network
    /// protocol (manual/debug control)
    pub fn override_handle(&self) -> Sender<DriveCommand> {
        self.override_tx.clone()
    }

    /// Run until the stop flag is raised
    pub fn run(&mut self) -> Result<()> {
        info!(
            "scheduler running: {:.0} Hz, pacing {:?}",
            1.0 / self.dt,
            self.pacing
        );

        while !self.stop.load(Ordering::Relaxed) {
            let tick_start = Instant::now();

            // A local override pre-empts the network command for this tick
            let (directive, pending) = if let Ok(cmd) = self.override_rx.try_recv() {
                (TickDirective { drive: Some(cmd) }, None)
            } else {
                match self.acquire_request() {
                    Acquired::Request(pending) => (
                        TickDirective {
                            drive: pending.request.drive.clone(),
                        },
                        Some(pending),
                    ),
                    Acquired::Coast => (TickDirective::default(), None),
                    Acquired::Stopped => break,
                }
            };

            let report = self.sim.step(&directive, self.dt);

            // One reply per consumed command; coast ticks reply to nobody
            if let Some(pending) = pending {
                let reply = reply_for(&report, pending.request.query.as_deref());
                self.server.send_reply(pending.serial, reply);
            }

            let _ = self.render_tx.try_send(frame_for(&report));

            let elapsed = tick_start.elapsed();
            if elapsed < self.tick_interval {
                thread::sleep(self.tick_interval - elapsed);
            }
        }

        info!("scheduler stopped at tick {}", self.sim.tick());
        self.server.shutdown();
        Ok(())
    }

    /// Obtain at most one command for this tick, per the pacing policy
    fn acquire_request(&self) -> Acquired {
        match self.pacing {
            Pacing::Client => loop {
                if self.stop.load(Ordering::Relaxed) {
                    return Acquired::Stopped;
                }
                if !self.server.connected() {
                    // Nobody to pace us; keep the simulation (and renderer)
                    // alive while awaiting a connection
                    return match self.server.poll_request(Duration::ZERO) {
                        Some(pending) => Acquired::Request(pending),
                        None => Acquired::Coast,
                    };
                }
                if let Some(pending) = self.server.poll_request(POLL_SLICE) {
                    return Acquired::Request(pending);
                }
            },
            Pacing::FreeRunning => match self.server.poll_request(Duration::ZERO) {
                Some(pending) => Acquired::Request(pending),
                None => Acquired::Coast,
            },
        }
    }
}

/// Build the wire reply, applying the sensor-query filter
fn reply_for(report: &TickReport, query: Option<&[String]>) -> TickReply {
    let readings = report
        .readings
        .iter()
        .filter(|(id, _)| query.is_none_or(|q| q.iter().any(|wanted| wanted == *id)))
        .map(|(id, value)| (id.clone(), *value as f64))
        .collect();

    TickReply {
        tick: report.tick,
        accepted: report.accepted,
        error: report.command_error.clone(),
        readings,
    }
}

fn frame_for(report: &TickReport) -> RenderFrame {
    RenderFrame {
        tick: report.tick,
        pose: report.pose,
        perimeter: report.perimeter.clone(),
        readings: report.readings.clone(),
    }
}
