//! Host-side particle synchronization for a domain-decomposed simulation
//! with one accelerator attached to a designated node.
//!
//! Per step: [`Synchronizer::gather_particles`] builds the upload buffer on
//! the designated node, the accelerator computes, and
//! [`Synchronizer::scatter_forces`] returns results to the owning nodes.
//! Device energies are folded in with [`EnergyAccumulator::add_device_energy`].
//!
//! Preconditions the protocol relies on but does not check: every node uses
//! the same [`AttributeSet`], and no particle migrates between a gather and
//! the scatter that pairs with it.

pub mod attributes;
pub mod buffer;
pub mod cells;
pub mod codec;
pub mod config;
pub mod energy;
pub mod error;
pub mod fold;
mod gather;
pub mod particle;
pub mod plan;
mod scatter;
pub mod sync;
pub mod transport;

pub use attributes::{Attribute, AttributeSet};
pub use buffer::{ForceBuffer, ParticleBuffer, SwimVelocityRecord};
pub use cells::{Cell, CellGrid, CellStore, LocalCells};
pub use codec::ParticleCodec;
pub use config::SyncConfig;
pub use energy::{DeviceEnergy, EnergyAccumulator};
pub use error::{SyncError, SyncResult};
pub use fold::{PeriodicBox, PositionFolder};
pub use particle::Particle;
pub use sync::{DeviceGlobals, Synchronizer};
pub use transport::{ChannelTransport, SingleNode, Tag, Transport};
#[cfg(feature = "distributed")]
pub use transport::MpiTransport;
