pub mod engine_tests;

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Level;

use roomdrop_client::{ClientConfig, Engine, EngineHandle};
use roomdrop_core::SignalMessage;

use crate::utils::{MemoryFileSink, MockRelayOutput, MockTransportFactory};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// An engine wired to mocks, running on its own task.
pub struct TestEngine {
    pub handle: EngineHandle,
    /// Feeds messages to the engine as if the relay had sent them.
    pub relay_in: mpsc::Sender<SignalMessage>,
    /// Everything the engine emits towards the relay.
    pub relay_out: mpsc::UnboundedReceiver<SignalMessage>,
    pub relay: MockRelayOutput,
    pub transports: MockTransportFactory,
    pub sink: MemoryFileSink,
}

pub fn create_test_engine() -> TestEngine {
    create_test_engine_with(MockTransportFactory::new())
}

pub fn create_test_engine_with(transports: MockTransportFactory) -> TestEngine {
    let (relay, relay_out) = MockRelayOutput::new();
    let (relay_in, signal_rx) = mpsc::channel(100);
    let sink = MemoryFileSink::new();

    let (engine, handle) = Engine::new(
        ClientConfig::default(),
        Arc::new(relay.clone()),
        signal_rx,
        Box::new(transports.clone()),
        Arc::new(sink.clone()),
    );

    tokio::spawn(async move {
        engine.run().await;
    });

    TestEngine {
        handle,
        relay_in,
        relay_out,
        relay,
        transports,
        sink,
    }
}
