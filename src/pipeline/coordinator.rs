use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::thread::JoinHandle;

use crate::engine::Engine;
use crate::engine::memory::LentRegion;
use crate::foundation::error::{EncoderError, EncoderResult};
use crate::session::config::EncoderConfig;

use super::consumer::serve;
use super::protocol::{ConsumerMsg, FramePayload, ProducerMsg, TransferMode};

/// Name given to the consumer thread.
pub const CONSUMER_THREAD_NAME: &str = "mp4enc-consumer";

/// Options controlling a [`PipelineCoordinator`].
#[derive(Clone, Copy, Debug)]
pub struct PipelineOpts {
    /// How frame bytes travel to the consumer.
    pub mode: TransferMode,
    /// Bounded capacity of the producer -> consumer channel.
    pub channel_capacity: usize,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self {
            mode: TransferMode::Shared,
            channel_capacity: 4,
        }
    }
}

/// Producer half of a two-thread encode pipeline.
///
/// The consumer thread owns the engine and the session; the coordinator only ever sees frame
/// bytes and, at the end, the encoded stream.
pub struct PipelineCoordinator {
    tx: Option<SyncSender<ProducerMsg>>,
    rx: Receiver<ConsumerMsg>,
    worker: Option<JoinHandle<()>>,
    opts: PipelineOpts,
    frame_len: usize,
    started: bool,
    // Shared mode: `Some` while it is the producer's turn to fill the region.
    region: Option<LentRegion>,
    frames_submitted: u64,
}

impl PipelineCoordinator {
    /// Spawn the consumer thread and wait for its `Ready`.
    ///
    /// The engine is built on the consumer thread by `factory`, so engines need not be `Send`.
    #[tracing::instrument(skip(factory))]
    pub fn spawn<E, F>(factory: F, opts: PipelineOpts) -> EncoderResult<Self>
    where
        E: Engine + 'static,
        F: FnOnce() -> EncoderResult<E> + Send + 'static,
    {
        let (tx, consumer_rx) = mpsc::sync_channel::<ProducerMsg>(opts.channel_capacity.max(1));
        let (consumer_tx, rx) = mpsc::channel::<ConsumerMsg>();
        let worker = std::thread::Builder::new()
            .name(CONSUMER_THREAD_NAME.to_string())
            .spawn(move || serve(factory, consumer_rx, consumer_tx))
            .map_err(|e| EncoderError::pipeline(format!("failed to spawn consumer thread: {e}")))?;

        let mut coordinator = Self {
            tx: Some(tx),
            rx,
            worker: Some(worker),
            opts,
            frame_len: 0,
            started: false,
            region: None,
            frames_submitted: 0,
        };
        match coordinator.recv()? {
            ConsumerMsg::Ready => {
                tracing::debug!("consumer ready");
                Ok(coordinator)
            }
            other => Err(unexpected("ready", &other)),
        }
    }

    /// Send `Start` and wait for the consumer to create its session.
    pub fn start(&mut self, config: EncoderConfig) -> EncoderResult<()> {
        if self.started {
            return Err(EncoderError::contract("pipeline already started"));
        }
        let frame_len = config.rgb_frame_len();
        let (width, height, stride) = (config.width, config.height, config.stride);
        self.send(ProducerMsg::Start {
            config,
            mode: self.opts.mode,
        })?;

        let region = match self.recv()? {
            ConsumerMsg::Started { region } => region,
            other => return Err(unexpected("started", &other)),
        };
        match (self.opts.mode, &region) {
            (TransferMode::Shared, Some(r)) if r.len() == frame_len => {}
            (TransferMode::Owned, None) => {}
            _ => {
                return Err(EncoderError::contract(
                    "started reply does not match the requested transfer mode",
                ));
            }
        }
        self.region = region;
        self.frame_len = frame_len;
        self.started = true;
        tracing::info!(
            width,
            height,
            stride,
            mode = ?self.opts.mode,
            "pipeline started"
        );
        Ok(())
    }

    /// Frames handed to the consumer so far.
    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    /// Bytes per frame expected by [`PipelineCoordinator::submit`].
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Submit one packed RGB(A) frame by copying it into the frame buffer.
    pub fn submit(&mut self, frame: &[u8]) -> EncoderResult<()> {
        if frame.len() != self.frame_len {
            return Err(EncoderError::config(format!(
                "frame of {} bytes does not match the {}-byte frame region",
                frame.len(),
                self.frame_len
            )));
        }
        self.submit_with(|dst| {
            dst.copy_from_slice(frame);
            Ok(())
        })
    }

    /// Submit one frame by letting `fill` write it in place.
    ///
    /// In shared mode `fill` writes straight into the engine staging region, after the consumer
    /// has handed it back from the previous frame.
    pub fn submit_with<F>(&mut self, fill: F) -> EncoderResult<()>
    where
        F: FnOnce(&mut [u8]) -> EncoderResult<()>,
    {
        if !self.started {
            return Err(EncoderError::contract("submit before start"));
        }
        let index = self.frames_submitted;
        let payload = match self.opts.mode {
            TransferMode::Shared => {
                let mut region = match self.region.take() {
                    Some(region) => region,
                    None => self.await_consumed()?,
                };
                if let Err(err) = fill(region.as_mut_slice()) {
                    self.region = Some(region);
                    return Err(err);
                }
                FramePayload::Shared(region)
            }
            TransferMode::Owned => {
                self.check_failed()?;
                let mut frame = vec![0u8; self.frame_len];
                fill(&mut frame)?;
                FramePayload::Owned(frame)
            }
        };

        self.send(ProducerMsg::Frame { index, payload })?;
        self.frames_submitted += 1;
        tracing::trace!(index, "frame submitted");
        Ok(())
    }

    /// Send `Finish`, wait for `End` and join the consumer thread.
    pub fn finish(mut self) -> EncoderResult<Vec<u8>> {
        let region = match (self.opts.mode, self.region.take()) {
            (TransferMode::Shared, None) if self.frames_submitted > 0 => {
                Some(self.await_consumed()?)
            }
            (_, region) => region,
        };
        self.send(ProducerMsg::Finish { region })?;

        let bytes = match self.recv()? {
            ConsumerMsg::End(bytes) => bytes,
            other => return Err(unexpected("end", &other)),
        };
        self.join()?;
        tracing::info!(
            frames = self.frames_submitted,
            bytes = bytes.len(),
            "pipeline finished"
        );
        Ok(bytes)
    }

    fn await_consumed(&mut self) -> EncoderResult<LentRegion> {
        let outstanding = self.frames_submitted.checked_sub(1);
        match self.recv()? {
            ConsumerMsg::Consumed {
                index,
                region: Some(region),
            } if Some(index) == outstanding => Ok(region),
            ConsumerMsg::Consumed { index, .. } => Err(EncoderError::contract(format!(
                "acknowledgement for frame {index} while {outstanding:?} is outstanding"
            ))),
            other => Err(unexpected("consumed", &other)),
        }
    }

    // Owned mode never waits for replies, so a consumer failure is only noticed here.
    fn check_failed(&mut self) -> EncoderResult<()> {
        match self.rx.try_recv() {
            Ok(ConsumerMsg::Failed(err)) => Err(err),
            Ok(other) => Err(unexpected("no reply", &other)),
            Err(TryRecvError::Empty) => Ok(()),
            Err(TryRecvError::Disconnected) => Err(self.disconnected()),
        }
    }

    fn send(&mut self, msg: ProducerMsg) -> EncoderResult<()> {
        let name = msg.name();
        let Some(tx) = self.tx.as_ref() else {
            return Err(EncoderError::pipeline("pipeline already shut down"));
        };
        if tx.send(msg).is_err() {
            // The consumer hung up; prefer the error it reported.
            return Err(match self.rx.try_recv() {
                Ok(ConsumerMsg::Failed(err)) => err,
                _ => self.disconnected(),
            });
        }
        tracing::debug!(msg = name, "producer sent");
        Ok(())
    }

    fn recv(&mut self) -> EncoderResult<ConsumerMsg> {
        match self.rx.recv() {
            Ok(ConsumerMsg::Failed(err)) => {
                let _ = self.join();
                Err(err)
            }
            Ok(msg) => Ok(msg),
            Err(_) => Err(self.disconnected()),
        }
    }

    fn disconnected(&mut self) -> EncoderError {
        match self.join() {
            Err(panicked) => panicked,
            Ok(()) => EncoderError::pipeline("consumer channel disconnected unexpectedly"),
        }
    }

    fn join(&mut self) -> EncoderResult<()> {
        // Closing the channel lets a consumer blocked in `recv` return.
        self.tx.take();
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .map_err(|_| EncoderError::pipeline("consumer thread panicked")),
            None => Ok(()),
        }
    }
}

impl Drop for PipelineCoordinator {
    fn drop(&mut self) {
        if self.worker.is_some() {
            tracing::debug!("pipeline dropped before finish");
            let _ = self.join();
        }
    }
}

fn unexpected(expected: &str, got: &ConsumerMsg) -> EncoderError {
    EncoderError::contract(format!(
        "expected '{expected}' from consumer, got '{}'",
        got.name()
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/coordinator.rs"]
mod tests;
