//! # Events Module
//!
//! Event-driven log and progress reporting.
//!
//! ## Design
//! The engine emits `(message, severity)` log lines, `(phase, percent)`
//! progress updates and a final `(success, summary)` signal through a
//! channel, so any front end (CLI, GUI) can subscribe.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Log { message, severity } => println!("[{:?}] {}", severity, message),
//!             Event::Progress { phase, percent } => println!("{} {}%", phase, percent),
//!             _ => {}
//!         }
//!     }
//! });
//!
//! reconciler.run_with_events(&sender, &CancellationToken::new())?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
