use rtp_display::bridge::LifecycleBridge;
use rtp_display::config::Config;
use rtp_display::consent::{CaptureGrant, ConsentProvider, ConsentResult};
use rtp_display::engine::{EngineFactory, EventSender, Protocol, StreamEngine};
use rtp_display::notify::{ChannelNotifier, NotifierMessage};
use rtp_display::session::SessionController;
use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::time::sleep;

/// Engine that pretends to connect on a worker thread.
struct SimulatedEngine {
    events: EventSender,
    streaming: bool,
}

impl StreamEngine for SimulatedEngine {
    fn set_capture_grant(&mut self, grant: &CaptureGrant) {
        println!("engine: capture grant {} bytes", grant.payload().len());
    }

    fn prepare_video(&mut self) -> bool {
        true
    }

    fn prepare_audio(&mut self) -> bool {
        true
    }

    fn start_stream(&mut self, url: &str) {
        println!("engine: connecting to {}", url);
        self.streaming = true;
        let events = self.events.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            events.auth_success();
            events.connection_success();
            for bitrate in [1_500_000, 2_500_000] {
                thread::sleep(Duration::from_millis(300));
                events.new_bitrate(bitrate);
            }
        });
    }

    fn stop_stream(&mut self) {
        println!("engine: stopping");
        self.streaming = false;
        self.events.disconnect();
    }

    fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn is_recording(&self) -> bool {
        false
    }
}

struct SimulatedFactory;

impl EngineFactory for SimulatedFactory {
    fn create(
        &self,
        protocol: Protocol,
        events: EventSender,
    ) -> rtp_display::Result<Box<dyn StreamEngine>> {
        println!("factory: {} engine #{}", protocol, events.generation());
        Ok(Box::new(SimulatedEngine {
            events,
            streaming: false,
        }))
    }
}

struct AlwaysConsent;

#[async_trait::async_trait]
impl ConsentProvider for AlwaysConsent {
    async fn request_consent(&self) -> ConsentResult {
        ConsentResult::granted(&b"simulated-projection"[..])
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut config = Config::load();
    if let Some(endpoint) = std::env::args().nth(1) {
        config.endpoint = endpoint;
    }
    config.validate()?;

    let (notifier, mut notices) = ChannelNotifier::new();
    let notifier = Arc::new(notifier);
    let (controller, events) = SessionController::new(Arc::new(SimulatedFactory), notifier.clone());
    let bridge = Arc::new(LifecycleBridge::new(
        Arc::new(controller),
        notifier,
        Arc::new(AlwaysConsent),
        config.clone(),
    ));
    let _pump = bridge.spawn_event_pump(events);

    let title = config.notification_title.clone();
    tokio::spawn(async move {
        while let Some(message) = notices.recv().await {
            match message {
                NotifierMessage::Post(notice) => println!("[{}] {}", title, notice),
                NotifierMessage::Show(ongoing) => println!("[{}] show {:?}", title, ongoing),
                NotifierMessage::Cancel(ongoing) => println!("[{}] cancel {:?}", title, ongoing),
            }
        }
    });

    bridge.on_service_create();
    println!("toggle -> {}", bridge.toggle().await);

    sleep(Duration::from_secs(1)).await;
    let snapshot = bridge.controller().snapshot();
    println!(
        "status {} bitrate {:?} uptime {:?}",
        snapshot.status,
        snapshot.last_bitrate,
        snapshot.uptime()
    );

    println!("toggle -> {}", bridge.toggle().await);
    sleep(Duration::from_millis(100)).await;
    println!("Done");

    Ok(())
}
