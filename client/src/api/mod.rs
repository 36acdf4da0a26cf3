//! HTTP plumbing for the remote collaborator.
//!
//! The gateway is the only component that talks to the network; the DTOs
//! translate its JSON shapes into the client's domain model.

pub mod common;
pub mod dto;
pub mod gateway;
