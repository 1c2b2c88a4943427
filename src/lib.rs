//! Marketing Agent - Conversation Flow Engine
//!
//! This crate implements the core of a staged, document-producing marketing
//! agent: the workflow state machine a project advances through, the context
//! assembly that reconstructs the model input on every turn, the resilient
//! model invocation layer, and the per-turn orchestration with quota and
//! retention policies. Chat transport, payment processing, and the model
//! service itself are external collaborators reached through ports.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
