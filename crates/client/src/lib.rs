//! Client side of larder.
//!
//! This crate provides the HTTP fetch pipeline and the offline cache gateway
//! that sits in front of it. The server drives both.

pub mod fetch;
pub mod gateway;
pub mod request;

pub use fetch::{FetchClient, FetchConfig, Network, UrlError, parse_origin, resolve};
pub use gateway::{
    ActivationReport, ControlMessage, Gateway, GatewayConfig, InstallReport, Intercepted, Outcome, Route, VersionReply,
    WorkerState,
};
pub use request::{Destination, GatewayRequest, RequestMode, parse_method};
