//! Runtime wiring.

mod container;

pub use container::{
    Adapters, Container, ContainerError, DynBroker, DynColdStore, DynSink, DynStore,
    EngineScheduler,
};
