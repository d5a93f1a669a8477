use std::sync::{Arc, Mutex};
use std::time::Duration;

use typist::render::Renderer;
use typist::scheduler::runtime::TokioScheduler;
use typist::sequencer::{SequenceConfig, SequencerSlot, TextSequencer};

fn recorder() -> (Arc<Mutex<Vec<(String, bool)>>>, Arc<dyn Renderer>) {
    let frames = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&frames);
    let renderer: Arc<dyn Renderer> = Arc::new(move |visible: &str, deleting: bool| {
        sink.lock().unwrap().push((visible.to_string(), deleting));
    });
    (frames, renderer)
}

#[tokio::test(start_paused = true)]
async fn types_on_real_runtime() {
    let sequencer = TextSequencer::new(Arc::new(TokioScheduler::current().unwrap()));
    let (frames, renderer) = recorder();
    let config = SequenceConfig {
        type_interval_ms: 50,
        looping: false,
        ..SequenceConfig::new("Hi")
    };

    let handle = sequencer.start(&config, renderer).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(
        *frames.lock().unwrap(),
        vec![("H".to_string(), false), ("Hi".to_string(), false)]
    );
    assert!(handle.is_finished());
}

#[tokio::test(start_paused = true)]
async fn cancel_aborts_pending_timer() {
    let sequencer = TextSequencer::new(Arc::new(TokioScheduler::current().unwrap()));
    let (frames, renderer) = recorder();
    let config = SequenceConfig {
        type_interval_ms: 100,
        ..SequenceConfig::new("long text")
    };

    let handle = sequencer.start(&config, renderer).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    handle.cancel();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(frames.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn full_loop_on_real_runtime() {
    let sequencer = TextSequencer::new(Arc::new(TokioScheduler::current().unwrap()));
    let (frames, renderer) = recorder();
    let config = SequenceConfig {
        type_interval_ms: 10,
        delete_interval_ms: 10,
        hold_ms: 100,
        restart_pause_ms: 250,
        ..SequenceConfig::new("Ok")
    };

    let mut slot = SequencerSlot::new(sequencer, renderer);
    slot.play(&config).unwrap();
    // O@0 Ok@10 O@110 ""@120 O@370
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(frames.lock().unwrap().len(), 4);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(frames.lock().unwrap()[4], ("O".to_string(), false));
    slot.stop();
}
