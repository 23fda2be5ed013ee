pub mod client;
pub mod dispatch;
pub mod messages;

pub use client::{NatsClient, Subjects};
pub use dispatch::{handle_fault, handle_response, run_event_pump, run_fault_listener, run_response_listener};
pub use messages::{EndSessionMessage, InboundMessage, InterviewerFault, InterviewerResponse, StartSessionMessage};
