//! Fault injection for exercising client resilience.

pub mod network;

pub use network::{
    simulate_network_condition, NetworkConditionGuard, NetworkConditionSimulator, NetworkConditionSpec,
    SimulationStats,
};
