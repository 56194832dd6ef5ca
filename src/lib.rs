#![doc(html_root_url = "https://docs.rs/rtp-display/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # rtp-display - session control for display streaming
//!
//! `rtp-display` owns the lifecycle glue around an external RTMP streaming
//! engine: it keeps a single streaming session, decides when an engine is
//! (re)built, orders capability preparation and stream start/stop, and
//! turns the engine's asynchronous connection callbacks into user-visible
//! notices. Capture, encoding and the RTMP transport itself stay inside
//! the engine, reached through the [`engine::StreamEngine`] trait.
//!
//! ## Features
//!
//! - Serialized session state machine (`Idle`, `Preparing`, `Streaming`, `Failed`)
//! - At most one engine instance alive at any time
//! - Explicit endpoint scheme selection (`rtmp://`, `rtmps://`)
//! - Engine callbacks delivered over a channel, tagged per engine instance
//! - Thread-safe notice delivery for the UI side
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rtp_display::bridge::LifecycleBridge;
//! use rtp_display::config::Config;
//! use rtp_display::engine::testing::{FixedConsent, ScriptedFactory};
//! use rtp_display::notify::LogNotifier;
//! use rtp_display::session::SessionController;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load();
//!     let notifier = Arc::new(LogNotifier::new(config.notification_title.clone()));
//!     let (controller, events) =
//!         SessionController::new(Arc::new(ScriptedFactory::new()), notifier.clone());
//!
//!     let bridge = Arc::new(LifecycleBridge::new(
//!         Arc::new(controller),
//!         notifier,
//!         Arc::new(FixedConsent::granting()),
//!         config,
//!     ));
//!     let _pump = bridge.spawn_event_pump(events);
//!
//!     bridge.on_service_create();
//!     let status = bridge.toggle().await;
//!     println!("session is {}", status);
//! }
//! ```
//!
//! ## Module Overview
//!
//! - `session`: the session state and its controller
//! - `bridge`: host lifecycle and engine callback adaptation
//! - `engine`: engine traits, events, endpoints, scripted doubles
//! - `consent`: capture consent tokens and the consent flow trait
//! - `notify`: notices and notifiers
//! - `config`: configuration loading
//! - `error`: error type and result alias

/// Host lifecycle and engine callback adaptation
pub mod bridge;

/// Configuration module
pub mod config;

/// Capture consent tokens
pub mod consent;

/// External streaming engine seam
pub mod engine;

/// Error types and utilities
pub mod error;

/// User-visible notices
pub mod notify;

/// Streaming session state machine
pub mod session;

pub use error::{DisplayError, Result};
