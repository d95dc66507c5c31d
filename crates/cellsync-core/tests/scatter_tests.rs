mod common;

use cellsync_core::transport::run_cluster;
use cellsync_core::{
    Attribute, AttributeSet, CellStore, SingleNode, SwimVelocityRecord, SyncConfig, SyncError,
    Synchronizer, Transport,
};
use common::{identity, init_logging, node_cells};
use glam::{DVec3, Vec3};

/// Force the designated node hands back for global offset `i`.
fn force_for(i: usize) -> Vec3 {
    Vec3::new(i as f32, 10.0 * i as f32, -1.0)
}

/// Scatter `force_for(offset)` over a cluster and return every node's cells.
fn scatter_cluster(layout: &[Vec<usize>], prior: DVec3, rounds: usize) -> Vec<CellStore> {
    let config = SyncConfig::default();
    run_cluster(layout.len(), |transport| {
        let rank = transport.rank();
        let mut cells = node_cells(rank, &layout[rank]);
        for p in cells.particles_mut() {
            p.force = prior;
        }
        let sync = Synchronizer::new(transport, &config).unwrap();
        let total: usize = layout.iter().flatten().sum();
        for _ in 0..rounds {
            if sync.is_designated() {
                let mut forces = sync.codec().force_buffer(total);
                for i in 0..total {
                    forces.set_force(i, force_for(i));
                }
                sync.scatter_forces(&mut cells, Some(&forces)).unwrap();
            } else {
                sync.scatter_forces(&mut cells, None).unwrap();
            }
        }
        cells
    })
}

#[test]
fn test_scatter_returns_forces_to_owners() {
    init_logging();
    let layout = vec![vec![2], vec![0], vec![1, 0, 2]];
    let nodes = scatter_cluster(&layout, DVec3::ZERO, 1);

    let node0: Vec<DVec3> = nodes[0].particles().map(|p| p.force).collect();
    assert_eq!(node0, vec![force_for(0).as_dvec3(), force_for(1).as_dvec3()]);
    assert_eq!(nodes[1].particles().count(), 0);
    let node2: Vec<DVec3> = nodes[2].particles().map(|p| p.force).collect();
    assert_eq!(
        node2,
        vec![
            force_for(2).as_dvec3(),
            force_for(3).as_dvec3(),
            force_for(4).as_dvec3()
        ]
    );
}

#[test]
fn test_scatter_accumulates_over_prior_force() {
    let layout = vec![vec![1, 1], vec![2], vec![1]];
    let prior = DVec3::new(0.5, -0.25, 2.0);
    let nodes = scatter_cluster(&layout, prior, 2);

    let mut offset = 0;
    for node in &nodes {
        for p in node.particles() {
            let f = force_for(offset).as_dvec3();
            assert_eq!(p.force, prior + f + f, "offset {offset}");
            offset += 1;
        }
    }
    assert_eq!(offset, 5);
}

#[test]
fn test_scatter_all_on_designated_and_empty_designated() {
    for layout in [vec![vec![4], vec![0]], vec![vec![0], vec![3]]] {
        let nodes = scatter_cluster(&layout, DVec3::ZERO, 1);
        let forces: Vec<DVec3> = nodes
            .iter()
            .flat_map(|n| n.particles().map(|p| p.force))
            .collect();
        let expected: Vec<DVec3> = (0..forces.len()).map(|i| force_for(i).as_dvec3()).collect();
        assert_eq!(forces, expected);
    }
}

#[test]
fn test_single_node_scatter_is_local_accumulation() {
    let mut cells = node_cells(0, &[2, 0, 2]);
    let sync = Synchronizer::new(SingleNode, &SyncConfig::default()).unwrap();
    let mut forces = sync.codec().force_buffer(4);
    for i in 0..4 {
        forces.set_force(i, force_for(i));
    }
    sync.scatter_forces(&mut cells, Some(&forces)).unwrap();
    for (i, p) in cells.particles().enumerate() {
        assert_eq!(p.force, force_for(i).as_dvec3());
    }
}

#[test]
fn test_gather_then_scatter_attributes_forces_by_position() {
    // Kernel stand-in: force = -position of the gathered record.
    let layout = vec![vec![3, 0, 1], vec![2], vec![0], vec![2, 2]];
    let config = SyncConfig::default();
    let nodes = run_cluster(layout.len(), |transport| {
        let rank = transport.rank();
        let mut cells = node_cells(rank, &layout[rank]);
        let sync = Synchronizer::new(transport, &config).unwrap();
        let gathered = sync.gather_particles(&cells, &identity).unwrap();
        let forces = gathered.map(|particles| {
            let mut forces = sync.codec().force_buffer(particles.len());
            for i in 0..particles.len() {
                forces.set_force(i, -particles.position(i));
            }
            forces
        });
        sync.scatter_forces(&mut cells, forces.as_ref()).unwrap();
        cells
    });

    for node in &nodes {
        for p in node.particles() {
            assert_eq!(p.force, -p.position.as_vec3().as_dvec3());
        }
    }
}

#[test]
fn test_scatter_composition_overwrites() {
    let attrs = AttributeSet::new()
        .with(Attribute::Composition)
        .with_fluid_components(2);
    let config = SyncConfig {
        attributes: attrs,
        ..SyncConfig::default()
    };
    let layout = vec![vec![1], vec![2]];
    let nodes = run_cluster(2, |transport| {
        let rank = transport.rank();
        let mut cells = node_cells(rank, &layout[rank]);
        for p in cells.particles_mut() {
            p.composition = vec![-1.0; 2];
        }
        let sync = Synchronizer::new(transport, &config).unwrap();
        let forces = sync.is_designated().then(|| {
            let mut forces = sync.codec().force_buffer(3);
            for i in 0..3 {
                forces.set_force(i, force_for(i));
                forces
                    .composition_mut(i)
                    .unwrap()
                    .copy_from_slice(&[i as f32, 0.5]);
            }
            forces
        });
        sync.scatter_forces(&mut cells, forces.as_ref()).unwrap();
        cells
    });

    let compositions: Vec<Vec<f64>> = nodes
        .iter()
        .flat_map(|n| n.particles().map(|p| p.composition.clone()))
        .collect();
    assert_eq!(
        compositions,
        vec![vec![0.0, 0.5], vec![1.0, 0.5], vec![2.0, 0.5]]
    );
}

#[test]
fn test_scatter_swim_velocities() {
    let config = SyncConfig {
        attributes: AttributeSet::new().with(Attribute::Swimming),
        ..SyncConfig::default()
    };
    let layout = vec![vec![1], vec![0], vec![1, 1]];
    let nodes = run_cluster(3, |transport| {
        let rank = transport.rank();
        let mut cells = node_cells(rank, &layout[rank]);
        let sync = Synchronizer::new(transport, &config).unwrap();
        let velocities: Option<Vec<SwimVelocityRecord>> = sync.is_designated().then(|| {
            (0..3)
                .map(|i| SwimVelocityRecord {
                    center: [i as f32; 3],
                    source: [-(i as f32); 3],
                })
                .collect()
        });
        sync.scatter_swim_velocities(&mut cells, velocities.as_deref())
            .unwrap();
        cells
    });

    let centers: Vec<f64> = nodes
        .iter()
        .flat_map(|n| n.particles().map(|p| p.swim_velocity.center.x))
        .collect();
    assert_eq!(centers, vec![0.0, 1.0, 2.0]);
    let last = nodes[2].particles().last().unwrap();
    assert_eq!(last.swim_velocity.source, DVec3::splat(-2.0));
}

#[test]
fn test_swim_velocities_need_swimming() {
    let mut cells = node_cells(0, &[1]);
    let sync = Synchronizer::new(SingleNode, &SyncConfig::default()).unwrap();
    let none: &[SwimVelocityRecord] = &[];
    let err = sync.scatter_swim_velocities(&mut cells, Some(none)).unwrap_err();
    assert!(matches!(err, SyncError::InvalidConfig(_)));
}

#[test]
fn test_designated_without_buffer_fails() {
    let mut cells = node_cells(0, &[1]);
    let sync = Synchronizer::new(SingleNode, &SyncConfig::default()).unwrap();
    let err = sync.scatter_forces(&mut cells, None).unwrap_err();
    assert!(matches!(err, SyncError::MissingBuffer { rank: 0 }));
}

#[test]
fn test_force_buffer_of_wrong_length_is_count_drift() {
    let layout = vec![vec![2], vec![0], vec![1]];
    let config = SyncConfig::default();
    let results = run_cluster(3, |transport| {
        let rank = transport.rank();
        let mut cells = node_cells(rank, &layout[rank]);
        let sync = Synchronizer::new(transport, &config).unwrap();
        // Built for a stale count of 4 particles; the cluster now holds 3.
        let forces = sync.is_designated().then(|| sync.codec().force_buffer(4));
        sync.scatter_forces(&mut cells, forces.as_ref())
    });

    assert!(matches!(
        results[0],
        Err(SyncError::CountDrift { rank: 0, expected: 3, found: 4 })
    ));
    assert!(results[1].is_ok());
    // Rank 2 never gets its slice: the step fails there too.
    assert!(matches!(
        results[2],
        Err(SyncError::Aborted { rank: 2, peer: 0, .. })
    ));
}

#[test]
fn test_count_drift_releases_every_waiting_node() {
    init_logging();
    let layout = vec![vec![2], vec![1], vec![1]];
    let config = SyncConfig::default();
    let results = run_cluster(3, |transport| {
        let rank = transport.rank();
        let mut cells = node_cells(rank, &layout[rank]);
        let sync = Synchronizer::new(transport, &config).unwrap();
        let forces = sync.is_designated().then(|| sync.codec().force_buffer(5));
        sync.scatter_forces(&mut cells, forces.as_ref())
    });

    assert!(matches!(
        results[0],
        Err(SyncError::CountDrift { rank: 0, expected: 4, found: 5 })
    ));
    for (rank, result) in results.iter().enumerate().skip(1) {
        match result {
            Err(SyncError::Aborted { rank: r, peer: 0, reason }) => {
                assert_eq!(*r, rank);
                assert!(reason.contains("drift"), "{reason}");
            }
            other => panic!("rank {rank}: {other:?}"),
        }
    }
}

#[test]
fn test_missing_buffer_releases_every_waiting_node() {
    let layout = vec![vec![1], vec![2], vec![1]];
    let config = SyncConfig::default();
    let results = run_cluster(3, |transport| {
        let rank = transport.rank();
        let mut cells = node_cells(rank, &layout[rank]);
        let sync = Synchronizer::new(transport, &config).unwrap();
        sync.scatter_forces(&mut cells, None)
    });

    assert!(matches!(results[0], Err(SyncError::MissingBuffer { rank: 0 })));
    assert!(matches!(results[1], Err(SyncError::Aborted { peer: 0, .. })));
    assert!(matches!(results[2], Err(SyncError::Aborted { peer: 0, .. })));
}

#[test]
fn test_force_buffer_with_foreign_layout_rejected() {
    let mut cells = node_cells(0, &[1]);
    let sync = Synchronizer::new(SingleNode, &SyncConfig::default()).unwrap();
    let attrs = AttributeSet::new()
        .with(Attribute::Composition)
        .with_fluid_components(1);
    let other = cellsync_core::ParticleCodec::new(&attrs).unwrap();
    let forces = other.force_buffer(1);
    let err = sync.scatter_forces(&mut cells, Some(&forces)).unwrap_err();
    assert!(matches!(err, SyncError::InvalidConfig(_)));
}
