use crate::codec::ParticleCodec;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::Transport;
use bytemuck::{Pod, Zeroable};
use log::{debug, error};

/// Accelerator-wide particle variables every node must agree on.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DeviceGlobals {
    pub number_of_particles: u32,
    /// Non-zero when particles are spread over more than one node.
    pub communication_enabled: u32,
}

/// One node's endpoint of the host/accelerator synchronization protocol.
///
/// Gather lives in `gather.rs`, scatter in `scatter.rs`.
pub struct Synchronizer<T> {
    pub(crate) transport: T,
    pub(crate) codec: ParticleCodec,
    pub(crate) designated: usize,
}

impl<T: Transport> Synchronizer<T> {
    pub fn new(transport: T, config: &SyncConfig) -> SyncResult<Self> {
        if config.designated_rank >= transport.size() {
            return Err(SyncError::InvalidRank {
                rank: config.designated_rank,
                size: transport.size(),
            });
        }
        let codec = ParticleCodec::new(&config.attributes)?;
        debug!(
            "{}: synchronizer ready, designated rank {}, particle record {} words, force record {} words",
            transport.rank(),
            config.designated_rank,
            codec.particle_layout().stride(),
            codec.force_layout().stride()
        );
        Ok(Self {
            transport,
            codec,
            designated: config.designated_rank,
        })
    }

    pub fn rank(&self) -> usize {
        self.transport.rank()
    }

    pub fn designated_rank(&self) -> usize {
        self.designated
    }

    /// Whether this node owns the accelerator.
    pub fn is_designated(&self) -> bool {
        self.transport.rank() == self.designated
    }

    pub fn codec(&self) -> &ParticleCodec {
        &self.codec
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// End the step on every node and hand `err` back.
    ///
    /// Errors that were themselves caused by a peer's abort are not
    /// re-announced.
    pub fn abort(&self, err: SyncError) -> SyncError {
        if !matches!(err, SyncError::Aborted { .. }) {
            error!("{}: aborting step: {}", self.rank(), err);
            self.transport.abort(&err.to_string());
        }
        err
    }

    /// Replace `globals` on every node with the designated node's value.
    pub fn broadcast_device_globals(&self, globals: &mut DeviceGlobals) -> SyncResult<()> {
        self.transport
            .broadcast(self.designated, bytemuck::bytes_of_mut(globals))?;
        debug!(
            "{}: device globals {} particles, communication {}",
            self.rank(),
            globals.number_of_particles,
            globals.communication_enabled
        );
        Ok(())
    }
}
