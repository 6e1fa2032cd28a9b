use std::sync::mpsc::{Receiver, Sender};

use crate::engine::Engine;
use crate::foundation::error::{EncoderError, EncoderResult};
use crate::session::encoder_session::EncoderSession;

use super::protocol::{ConsumerMsg, FramePayload, ProducerMsg, TransferMode};

/// Serve one pipeline run on the current thread.
///
/// Sends `Ready`, then answers producer messages until `Finish` has been handled. Returns the
/// first error instead of reporting it; [`serve`] is the wrapper that turns it into
/// [`ConsumerMsg::Failed`].
pub fn run_consumer<E: Engine>(
    engine: E,
    rx: &Receiver<ProducerMsg>,
    tx: &Sender<ConsumerMsg>,
) -> EncoderResult<()> {
    let mut engine = Some(engine);
    let mut active: Option<(EncoderSession<E>, TransferMode)> = None;
    let mut expected_index = 0u64;

    reply(tx, ConsumerMsg::Ready)?;
    loop {
        let msg = rx
            .recv()
            .map_err(|_| EncoderError::pipeline("producer channel disconnected unexpectedly"))?;
        tracing::debug!(msg = msg.name(), "consumer received");

        match msg {
            ProducerMsg::Start { config, mode } => {
                let Some(engine) = engine.take() else {
                    return Err(EncoderError::contract("start received twice"));
                };
                let mut session = EncoderSession::create(engine, config)?;
                let region = match mode {
                    TransferMode::Shared => Some(session.lend_rgb_region()?),
                    TransferMode::Owned => None,
                };
                active = Some((session, mode));
                reply(tx, ConsumerMsg::Started { region })?;
            }
            ProducerMsg::Frame { index, payload } => {
                let Some((session, mode)) = active.as_mut() else {
                    return Err(EncoderError::contract(format!(
                        "frame {index} received before start"
                    )));
                };
                if index != expected_index {
                    return Err(EncoderError::contract(format!(
                        "frame {index} received out of order, expected {expected_index}"
                    )));
                }
                match (*mode, payload) {
                    (TransferMode::Shared, FramePayload::Shared(region)) => {
                        session.restore_region(region)?;
                        session.encode_rgb_pointer()?;
                        let region = session.lend_rgb_region()?;
                        reply(
                            tx,
                            ConsumerMsg::Consumed {
                                index,
                                region: Some(region),
                            },
                        )?;
                    }
                    (TransferMode::Owned, FramePayload::Owned(frame)) => {
                        session.encode_rgb(&frame)?;
                    }
                    (mode, _) => {
                        return Err(EncoderError::contract(format!(
                            "frame {index} payload does not match {mode:?} transfer mode"
                        )));
                    }
                }
                tracing::trace!(index, "consumer encoded frame");
                expected_index += 1;
            }
            ProducerMsg::Finish { region } => {
                let Some((mut session, _)) = active.take() else {
                    return Err(EncoderError::contract("finish received before start"));
                };
                if let Some(region) = region {
                    session.restore_region(region)?;
                }
                let bytes = session.end()?;
                reply(tx, ConsumerMsg::End(bytes))?;
                return Ok(());
            }
        }
    }
}

/// Build the engine with `factory`, run the consumer, and report any error to the producer.
pub fn serve<E, F>(factory: F, rx: Receiver<ProducerMsg>, tx: Sender<ConsumerMsg>)
where
    E: Engine,
    F: FnOnce() -> EncoderResult<E>,
{
    let result = factory().and_then(|engine| run_consumer(engine, &rx, &tx));
    if let Err(err) = result {
        tracing::warn!(error = %err, "consumer stopped");
        // The producer may already be gone; nothing else to report to.
        let _ = tx.send(ConsumerMsg::Failed(err));
    }
}

fn reply(tx: &Sender<ConsumerMsg>, msg: ConsumerMsg) -> EncoderResult<()> {
    tx.send(msg)
        .map_err(|_| EncoderError::pipeline("producer channel disconnected unexpectedly"))
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/consumer.rs"]
mod tests;
