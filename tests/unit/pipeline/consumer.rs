use std::sync::mpsc;

use super::*;
use crate::engine::reference::{ReferenceContainer, ReferenceEngine};
use crate::session::config::EncoderConfig;

struct Harness {
    tx: mpsc::Sender<ProducerMsg>,
    rx: mpsc::Receiver<ConsumerMsg>,
    worker: std::thread::JoinHandle<EncoderResult<()>>,
}

fn harness() -> Harness {
    let (tx, consumer_rx) = mpsc::channel();
    let (consumer_tx, rx) = mpsc::channel();
    let worker = std::thread::spawn(move || {
        run_consumer(ReferenceEngine::new(), &consumer_rx, &consumer_tx)
    });
    let h = Harness { tx, rx, worker };
    assert!(matches!(h.rx.recv().unwrap(), ConsumerMsg::Ready));
    h
}

fn config() -> EncoderConfig {
    EncoderConfig::new(4, 4).with_stride(3)
}

fn start(h: &Harness, mode: TransferMode) -> Option<crate::engine::memory::LentRegion> {
    h.tx.send(ProducerMsg::Start {
        config: config(),
        mode,
    })
    .unwrap();
    match h.rx.recv().unwrap() {
        ConsumerMsg::Started { region } => region,
        other => panic!("unexpected {}", other.name()),
    }
}

#[test]
fn shared_mode_ping_pongs_the_region() {
    let h = harness();
    let mut region = start(&h, TransferMode::Shared).unwrap();
    assert_eq!(region.len(), 4 * 4 * 3);

    for index in 0..3u64 {
        region.as_mut_slice().fill(index as u8 * 40);
        h.tx.send(ProducerMsg::Frame {
            index,
            payload: FramePayload::Shared(region),
        })
        .unwrap();
        region = match h.rx.recv().unwrap() {
            ConsumerMsg::Consumed {
                index: acked,
                region: Some(region),
            } => {
                assert_eq!(acked, index);
                region
            }
            other => panic!("unexpected {}", other.name()),
        };
    }

    h.tx.send(ProducerMsg::Finish {
        region: Some(region),
    })
    .unwrap();
    let ConsumerMsg::End(bytes) = h.rx.recv().unwrap() else {
        panic!("expected end");
    };
    h.worker.join().unwrap().unwrap();
    assert_eq!(ReferenceContainer::parse(&bytes).unwrap().frame_count(), 3);
}

#[test]
fn owned_mode_sends_no_acknowledgements() {
    let h = harness();
    assert!(start(&h, TransferMode::Owned).is_none());
    for index in 0..2u64 {
        h.tx.send(ProducerMsg::Frame {
            index,
            payload: FramePayload::Owned(vec![index as u8; 48]),
        })
        .unwrap();
    }
    h.tx.send(ProducerMsg::Finish { region: None }).unwrap();
    assert!(matches!(h.rx.recv().unwrap(), ConsumerMsg::End(_)));
    h.worker.join().unwrap().unwrap();
}

#[test]
fn frame_before_start_is_a_contract_violation() {
    let h = harness();
    h.tx.send(ProducerMsg::Frame {
        index: 0,
        payload: FramePayload::Owned(vec![0; 48]),
    })
    .unwrap();
    let err = h.worker.join().unwrap().unwrap_err();
    assert!(err.is_contract_violation());
}

#[test]
fn out_of_order_frame_is_a_contract_violation() {
    let h = harness();
    start(&h, TransferMode::Owned);
    h.tx.send(ProducerMsg::Frame {
        index: 1,
        payload: FramePayload::Owned(vec![0; 48]),
    })
    .unwrap();
    let err = h.worker.join().unwrap().unwrap_err();
    assert!(err.is_contract_violation());
}

#[test]
fn second_start_and_mismatched_payload_are_rejected() {
    let h = harness();
    start(&h, TransferMode::Owned);
    h.tx.send(ProducerMsg::Start {
        config: config(),
        mode: TransferMode::Owned,
    })
    .unwrap();
    assert!(h.worker.join().unwrap().unwrap_err().is_contract_violation());

    let h = harness();
    assert!(start(&h, TransferMode::Owned).is_none());
    let mut foreign = crate::engine::memory::LinearMemory::new();
    let ptr = foreign.allocate(48).unwrap();
    h.tx.send(ProducerMsg::Frame {
        index: 0,
        payload: FramePayload::Shared(foreign.lend(ptr).unwrap()),
    })
    .unwrap();
    assert!(h.worker.join().unwrap().unwrap_err().is_contract_violation());
}

#[test]
fn wrong_sized_owned_frame_stops_the_consumer() {
    let h = harness();
    start(&h, TransferMode::Owned);
    h.tx.send(ProducerMsg::Frame {
        index: 0,
        payload: FramePayload::Owned(vec![0; 47]),
    })
    .unwrap();
    assert!(h.worker.join().unwrap().unwrap_err().is_contract_violation());
}

#[test]
fn serve_reports_factory_failure() {
    let (_tx, consumer_rx) = mpsc::channel();
    let (consumer_tx, rx) = mpsc::channel();
    serve(
        || -> EncoderResult<ReferenceEngine> { Err(EncoderError::engine("no engine")) },
        consumer_rx,
        consumer_tx,
    );
    assert!(matches!(
        rx.recv().unwrap(),
        ConsumerMsg::Failed(EncoderError::Engine(_))
    ));
}
