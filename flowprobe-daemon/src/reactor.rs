//! The single-owner event loop.
//!
//! One task owns the reorder window, the per-port counters and both periodic
//! timers, so arrival bodies and tick bodies never interleave and no state
//! needs locking.

#![forbid(unsafe_code)]

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tracing::info;

use flowprobe_telemetry::{Recorder, Sampler, SamplerConfig};

use crate::intake::{Arrival, Intake};

pub struct Reactor {
    intake: Intake,
    sampler: Sampler,
    sampler_config: SamplerConfig,
    recorder: Recorder,
    rx: mpsc::Receiver<Arrival>,
}

impl Reactor {
    pub fn new(
        intake: Intake,
        recorder: Recorder,
        rx: mpsc::Receiver<Arrival>,
        sampler_config: SamplerConfig,
    ) -> Self {
        Self { intake, sampler: Sampler::new(), sampler_config, recorder, rx }
    }

    /// Run until Ctrl-C or until every receive loop is gone, then drain the
    /// recorder.
    pub async fn run(mut self) {
        let start = Instant::now();
        let mut drops_tick = interval_at(
            start + self.sampler_config.drops_period,
            self.sampler_config.drops_period,
        );
        let mut flows_tick = interval_at(
            start + self.sampler_config.drops_period + self.sampler_config.flows_offset,
            self.sampler_config.flows_period,
        );
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                arrival = self.rx.recv() => match arrival {
                    Some(arrival) => self.intake.process(arrival, &self.recorder),
                    None => break,
                },
                _ = drops_tick.tick() => {
                    self.sampler.drops_tick(self.intake.buffer(), self.intake.totals(), &self.recorder);
                }
                _ = flows_tick.tick() => {
                    self.sampler.flows_tick(self.intake.buffer(), self.intake.ports(), &self.recorder);
                }
                _ = &mut ctrl_c => {
                    info!("shutdown requested");
                    break;
                }
            }
        }

        self.intake.buffer().report_bursts();
        self.intake.report_ports();
        self.recorder.close().await;
    }
}
