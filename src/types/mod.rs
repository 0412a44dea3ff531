//! Core type definitions: chat messages, decoded model events, and stream
//! outcomes.

pub mod events;
pub mod message;
