//! Shared-engine and randomized trajectory tests.
//!
//! The engine holds no mutable state, so concurrent requests must produce exactly what
//! sequential ones do.

use airbook_core::{
    grid, CellBooking, CellEngine, EngineConfig, GeoPoint, StateVector4D, TrajectoryOptions,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

fn start() -> DateTime<Utc> {
    Utc.timestamp_opt(1_577_880_000, 0).unwrap()
}

/// A wandering flight of `legs` short legs around Southampton.
fn random_trajectory(rng: &mut StdRng, legs: usize) -> Vec<StateVector4D> {
    let mut lon = -1.40 + rng.random_range(-0.02..0.02);
    let mut lat = 50.91 + rng.random_range(-0.02..0.02);
    let mut t = start();
    let mut out = Vec::with_capacity(legs + 1);
    for _ in 0..=legs {
        let alt = rng.random_range(0.0..300.0);
        out.push(StateVector4D::new(GeoPoint::new(lon, lat, alt), t, 15.0));
        lon += rng.random_range(-0.01..0.01);
        lat += rng.random_range(-0.01..0.01);
        t += Duration::seconds(rng.random_range(0..120));
    }
    out
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_match_sequential() {
    grid::warm_up();
    let mut rng = StdRng::seed_from_u64(7);
    let flights: Vec<Vec<StateVector4D>> = (0..8).map(|_| random_trajectory(&mut rng, 4)).collect();

    for config in [EngineConfig::h3d(9, 40.0), EngineConfig::s23d(14, 40.0)] {
        let engine = Arc::new(CellEngine::new(config).unwrap());
        let options = TrajectoryOptions::default();
        let expected: Vec<Vec<CellBooking>> = flights
            .iter()
            .map(|f| engine.trajectory_bookings(f, &options).unwrap())
            .collect();

        let mut handles = Vec::new();
        for flight in flights.clone() {
            let engine = Arc::clone(&engine);
            handles.push(tokio::task::spawn_blocking(move || {
                engine.trajectory_bookings(&flight, &options)
            }));
        }
        for (handle, expected) in handles.into_iter().zip(expected) {
            let got = handle.await.unwrap().unwrap();
            assert_eq!(got, expected);
        }
    }
}

#[test]
fn test_random_trajectories_keep_invariants() {
    let mut rng = StdRng::seed_from_u64(42);
    let options = TrajectoryOptions {
        temporal_backward_buffer_s: 30,
        temporal_forward_buffer_s: 90,
        ..TrajectoryOptions::default()
    };
    for _ in 0..16 {
        let flight = random_trajectory(&mut rng, 5);
        for config in [EngineConfig::h3(8), EngineConfig::s2(13)] {
            let bookings = CellEngine::new(config)
                .unwrap()
                .trajectory_bookings(&flight, &options)
                .unwrap();
            let first = flight[0].time;
            let earliest = bookings.iter().map(|b| b.time_slice.start).min().unwrap();
            assert_eq!(earliest, first - Duration::seconds(30));
            for pair in bookings.windows(2) {
                assert!(pair[0].time_slice.start <= pair[1].time_slice.start);
                assert_ne!(pair[0].cell_id, pair[1].cell_id);
            }
            for b in &bookings {
                assert!(b.time_slice.start <= b.time_slice.end);
            }
        }
    }
}
