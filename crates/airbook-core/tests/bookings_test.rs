//! End-to-end booking properties across both grid systems and both geometry modes.

use airbook_core::{
    codec, h3_cell_bookings, h3_volume_bookings, h3d_cell_bookings, h3d_volume_bookings,
    s23d_cell_bookings, s23d_volume_bookings, s2_cell_bookings, s2_volume_bookings, CellBooking,
    CellEngine, EngineConfig, Error, GeoPoint, GridKind, StateVector4D, TimeSlice,
    TrajectoryOptions, Volume4D,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashSet;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_577_880_000 + secs, 0).unwrap()
}

/// Two waypoints about 5 km apart, flown in ten minutes.
fn southampton_flight() -> Vec<StateVector4D> {
    vec![
        StateVector4D::new(GeoPoint::new(-1.39200210, 50.90768760, 60.0), at(0), 10.0),
        StateVector4D::new(GeoPoint::new(-1.45465850, 50.93035940, 120.0), at(600), 10.0),
    ]
}

fn every_mode() -> Vec<EngineConfig> {
    vec![
        EngineConfig::h3(9),
        EngineConfig::h3d(9, 40.0),
        EngineConfig::s2(14),
        EngineConfig::s23d(14, 40.0),
    ]
}

fn assert_sorted(bookings: &[CellBooking]) {
    for pair in bookings.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            (a.time_slice.start, &a.cell_id) <= (b.time_slice.start, &b.cell_id),
            "{:?} sorts after {:?}",
            a,
            b
        );
    }
}

#[test]
fn test_cell_count_grows_with_resolution() {
    let traj = southampton_flight();
    let options = TrajectoryOptions::default();
    let counts: Vec<usize> = (7..=9)
        .map(|res| h3_cell_bookings(&traj, res, &options).unwrap().len())
        .collect();
    assert!(
        counts[0] < counts[1] && counts[1] < counts[2],
        "H3 counts {:?}",
        counts
    );

    let counts: Vec<usize> = (12..=14)
        .map(|res| s2_cell_bookings(&traj, res, &options).unwrap().len())
        .collect();
    assert!(
        counts[0] < counts[1] && counts[1] < counts[2],
        "S2 counts {:?}",
        counts
    );
}

#[test]
fn test_layered_cell_count_grows_with_resolution() {
    let traj = southampton_flight();
    let options = TrajectoryOptions::default();
    let counts: Vec<usize> = (7..=9)
        .map(|res| h3d_cell_bookings(&traj, res, 40.0, &options).unwrap().len())
        .collect();
    assert!(
        counts[0] < counts[1] && counts[1] < counts[2],
        "H3D counts {:?}",
        counts
    );

    let counts: Vec<usize> = (12..=14)
        .map(|res| s23d_cell_bookings(&traj, res, 40.0, &options).unwrap().len())
        .collect();
    assert!(
        counts[0] < counts[1] && counts[1] < counts[2],
        "S23D counts {:?}",
        counts
    );
}

#[test]
fn test_buffers_bound_the_schedule() {
    let traj = southampton_flight();
    let options = TrajectoryOptions {
        temporal_backward_buffer_s: 120,
        temporal_forward_buffer_s: 240,
        ..TrajectoryOptions::default()
    };
    for config in every_mode() {
        let bookings = CellEngine::new(config)
            .unwrap()
            .trajectory_bookings(&traj, &options)
            .unwrap();
        let earliest = bookings.iter().map(|b| b.time_slice.start).min().unwrap();
        let latest = bookings.iter().map(|b| b.time_slice.end).max().unwrap();
        assert_eq!(earliest, at(0) - Duration::seconds(120));
        assert!(latest >= at(0) + Duration::seconds(240));
        assert_eq!(latest, at(600) + Duration::seconds(240));
        for booking in &bookings {
            assert!(booking.time_slice.duration() >= Duration::seconds(360));
        }
    }
}

#[test]
fn test_bookings_are_sorted_and_unique() {
    let traj = southampton_flight();
    for config in every_mode() {
        let bookings = CellEngine::new(config)
            .unwrap()
            .trajectory_bookings(&traj, &TrajectoryOptions::default())
            .unwrap();
        assert!(!bookings.is_empty());
        assert_sorted(&bookings);
        let ids: HashSet<&str> = bookings.iter().map(|b| b.cell_id.as_str()).collect();
        assert_eq!(ids.len(), bookings.len(), "{:?} produced duplicate ids", config);
    }
}

#[test]
fn test_layered_ids_extend_flat_ids() {
    let traj = southampton_flight();
    let options = TrajectoryOptions::default();
    let flat: HashSet<String> = h3_cell_bookings(&traj, 9, &options)
        .unwrap()
        .into_iter()
        .map(|b| b.cell_id.into_string())
        .collect();
    let layered = h3d_cell_bookings(&traj, 9, 40.0, &options).unwrap();
    for booking in &layered {
        let id = booking.cell_id.as_str();
        assert_eq!(id.len(), 17);
        assert!(flat.contains(&id[..15]));
        let layer = u8::from_str_radix(&id[15..], 16).unwrap();
        assert!((1..=2).contains(&layer), "altitude 60-120 m maps to layers 1 and 2");
    }
}

#[test]
fn test_ids_carry_resolution_padding() {
    let traj = southampton_flight();
    let options = TrajectoryOptions::default();
    for res in [5u8, 8, 11] {
        for booking in h3_cell_bookings(&traj, res, &options).unwrap() {
            let trailing = booking.cell_id.as_str().chars().rev().take_while(|c| *c == 'f').count();
            assert!(trailing >= codec::padding_len(GridKind::H3, res));
        }
    }
    for level in [10u8, 13, 16] {
        for booking in s2_cell_bookings(&traj, level, &options).unwrap() {
            assert_eq!(
                booking.cell_id.as_str().len(),
                codec::token_len(GridKind::S2, level)
            );
        }
    }
    for booking in s23d_cell_bookings(&traj, 13, 40.0, &options).unwrap() {
        assert_eq!(
            booking.cell_id.as_str().len(),
            codec::token_len(GridKind::S2, 13) + 2
        );
    }
}

#[test]
fn test_single_waypoint_is_rejected_everywhere() {
    let traj = &southampton_flight()[..1];
    for config in every_mode() {
        let err = CellEngine::new(config)
            .unwrap()
            .trajectory_bookings(traj, &TrajectoryOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTrajectory(_)), "{:?}: {}", config, err);
    }
}

fn harbour_volume() -> Volume4D {
    Volume4D {
        footprint: vec![
            GeoPoint::flat(-1.42, 50.89),
            GeoPoint::flat(-1.39, 50.89),
            GeoPoint::flat(-1.39, 50.91),
            GeoPoint::flat(-1.42, 50.91),
            GeoPoint::flat(-1.42, 50.89),
        ],
        altitude_min_m: 0.0,
        altitude_max_m: 120.0,
        time_slice: TimeSlice::new(at(0), at(3600)),
    }
}

#[test]
fn test_volume_slices_are_unmodified() {
    let volume = harbour_volume();
    for config in every_mode() {
        let bookings = CellEngine::new(config)
            .unwrap()
            .volume_bookings(&volume)
            .unwrap();
        assert!(!bookings.is_empty());
        assert!(bookings.iter().all(|b| b.time_slice == volume.time_slice));
        let ids: Vec<&str> = bookings.iter().map(|b| b.cell_id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids, sorted);
    }
}

#[test]
fn test_volume_cover_grows_with_resolution() {
    let volume = harbour_volume();
    let h3: Vec<usize> = (6..=9)
        .map(|res| h3_volume_bookings(&volume, res).unwrap().len())
        .collect();
    assert!(h3.windows(2).all(|w| w[0] <= w[1]), "H3 {:?}", h3);
    let s2: Vec<usize> = (10..=13)
        .map(|res| s2_volume_bookings(&volume, res).unwrap().len())
        .collect();
    assert!(s2.windows(2).all(|w| w[0] <= w[1]), "S2 {:?}", s2);
}

#[test]
fn test_layered_volume_cover_grows_with_resolution() {
    let volume = harbour_volume();
    let h3d: Vec<usize> = (6..=9)
        .map(|res| h3d_volume_bookings(&volume, res, 40.0).unwrap().len())
        .collect();
    assert!(h3d.windows(2).all(|w| w[0] <= w[1]), "H3D {:?}", h3d);
    assert!(h3d[0] < h3d[3], "H3D {:?}", h3d);
    let s23d: Vec<usize> = (10..=13)
        .map(|res| s23d_volume_bookings(&volume, res, 40.0).unwrap().len())
        .collect();
    assert!(s23d.windows(2).all(|w| w[0] <= w[1]), "S23D {:?}", s23d);
    assert!(s23d[0] < s23d[3], "S23D {:?}", s23d);
}

#[test]
fn test_layered_volume_books_each_band() {
    let volume = harbour_volume();
    let flat = h3_volume_bookings(&volume, 8).unwrap().len();
    let layered = h3d_volume_bookings(&volume, 8, 40.0).unwrap().len();
    // 0-120 m touches layers 0, 1 and 2.
    assert_eq!(layered, flat * 3);
}

#[test]
fn test_invalid_volume_geometry() {
    let mut volume = harbour_volume();
    volume.footprint.pop();
    assert!(matches!(
        h3_volume_bookings(&volume, 8),
        Err(Error::InvalidGeometry(_))
    ));
}
