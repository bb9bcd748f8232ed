// Typed errors shared by the core
pub mod error;

// Core ledgers
pub mod fleet;
pub mod inventory;
pub mod order;

// Agent selection, restock planning and two-phase transfers
pub mod allocation;

// Floor (inventory + fleet + locations) and state views
pub mod warehouse;

// Action dispatch, journal and analysis
pub mod coordinator;

// Snapshot persistence and recovery
pub mod snapshot;

// Natural-language assistant
pub mod assistant;

// HTTP API
pub mod api;

// Configuration
pub mod config;

// Demo seed data
pub mod demo;
