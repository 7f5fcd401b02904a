// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::expect_used)]
//! Integration tests for the AOI manager: notification semantics, boundary
//! handling, mixed radii and scan locality.

use echo_aoi::{AoiManager, AoiObserver, Axis, Entity, EntityId, Interest};

#[derive(Debug, Default)]
struct Recorder {
    entered: Vec<EntityId>,
    left: Vec<EntityId>,
}

impl AoiObserver for Recorder {
    fn on_enter_aoi(&mut self, _me: EntityId, other: EntityId) {
        self.entered.push(other);
    }

    fn on_leave_aoi(&mut self, _me: EntityId, other: EntityId) {
        self.left.push(other);
    }
}

fn spawn(aoi: &mut AoiManager<Recorder>, x: f32, z: f32, radius: f32) -> EntityId {
    aoi.enter(Entity::new(Recorder::default()).with_radius(radius), x, z)
        .expect("enter")
}

fn rec(aoi: &AoiManager<Recorder>, id: EntityId) -> &Recorder {
    &aoi.get(id).expect("entity present").payload
}

fn sorted(mut ids: Vec<EntityId>) -> Vec<EntityId> {
    ids.sort();
    ids
}

#[test]
fn windowed_enter_and_leave_fire_exactly_once_per_side() {
    let mut aoi = AoiManager::new();
    let a = spawn(&mut aoi, 0.0, 0.0, 10.0);
    let b = spawn(&mut aoi, 5.0, 0.0, 10.0);

    assert_eq!(rec(&aoi, a).entered, vec![b]);
    assert_eq!(rec(&aoi, b).entered, vec![a]);
    assert!(rec(&aoi, a).left.is_empty());

    aoi.moved(b, 50.0, 0.0).expect("move");
    assert_eq!(rec(&aoi, a).left, vec![b]);
    assert_eq!(rec(&aoi, b).left, vec![a]);
    assert_eq!(rec(&aoi, a).entered.len(), 1);
    assert_eq!(aoi.neighbor_count(a), 0);
    assert_eq!(aoi.neighbor_count(b), 0);
    aoi.validate().expect("invariants");
}

#[test]
fn boundary_is_inclusive_on_both_axes() {
    let mut aoi = AoiManager::new();
    let a = spawn(&mut aoi, 0.0, 0.0, 10.0);
    let corner = spawn(&mut aoi, 10.0, -10.0, 10.0);
    let outside = spawn(&mut aoi, 10.5, 0.0, 10.0);

    assert!(aoi.is_neighbor(a, corner));
    assert!(aoi.is_neighbor(corner, a));
    assert!(!aoi.is_neighbor(a, outside));
    aoi.validate().expect("invariants");
}

#[test]
fn interest_region_is_a_square_not_a_disc() {
    let mut aoi = AoiManager::new();
    let a = spawn(&mut aoi, 0.0, 0.0, 10.0);
    // Euclidean distance ~12.7, Chebyshev distance 9.
    let diagonal = spawn(&mut aoi, 9.0, 9.0, 10.0);
    assert!(aoi.is_neighbor(a, diagonal));
}

#[test]
fn one_axis_overlap_is_not_enough() {
    let mut aoi = AoiManager::new();
    let a = spawn(&mut aoi, 0.0, 0.0, 10.0);
    let same_x = spawn(&mut aoi, 0.0, 40.0, 10.0);
    let same_z = spawn(&mut aoi, 40.0, 0.0, 10.0);
    assert_eq!(aoi.neighbor_count(a), 0);

    // Moving on Z alone brings `same_x` into range.
    aoi.moved(same_x, 0.0, 5.0).expect("move");
    assert!(aoi.is_neighbor(a, same_x));
    assert!(!aoi.is_neighbor(a, same_z));
    aoi.validate().expect("invariants");
}

#[test]
fn enter_then_leave_is_net_zero() {
    let mut aoi = AoiManager::new();
    let ids: Vec<EntityId> = (0..6)
        .map(|i| spawn(&mut aoi, i as f32 * 4.0, 0.0, 10.0))
        .collect();
    let before: Vec<Vec<EntityId>> = ids
        .iter()
        .map(|id| sorted(aoi.neighbors(*id).collect()))
        .collect();

    let visitor = spawn(&mut aoi, 8.0, 1.0, 10.0);
    assert!(aoi.neighbor_count(visitor) > 0);
    let entity = aoi.leave(visitor).expect("leave");

    let after: Vec<Vec<EntityId>> = ids
        .iter()
        .map(|id| sorted(aoi.neighbors(*id).collect()))
        .collect();
    assert_eq!(before, after);
    assert_eq!(entity.payload.entered.len(), entity.payload.left.len());
    assert!(!aoi.contains(visitor));
    assert_eq!(aoi.neighbor_count(visitor), 0);
    for id in &ids {
        assert!(!aoi.is_neighbor(*id, visitor));
    }
    aoi.validate().expect("invariants");
}

#[test]
fn leave_notifies_every_neighbor() {
    let mut aoi = AoiManager::new();
    let hub = spawn(&mut aoi, 0.0, 0.0, 10.0);
    let spokes: Vec<EntityId> = [(3.0, 0.0), (-3.0, 2.0), (0.0, -7.0)]
        .iter()
        .map(|&(x, z)| spawn(&mut aoi, x, z, 10.0))
        .collect();

    let hub_entity = aoi.leave(hub).expect("leave");
    assert_eq!(sorted(hub_entity.payload.left), sorted(spokes.clone()));
    for id in spokes {
        assert_eq!(rec(&aoi, id).left, vec![hub]);
    }
    aoi.validate().expect("invariants");
}

#[test]
fn mixed_radii_follow_the_adjusting_side() {
    let mut aoi = AoiManager::new();
    let wide = spawn(&mut aoi, 0.0, 0.0, 10.0);
    let narrow = spawn(&mut aoi, 5.0, 0.0, 2.0);

    // `narrow` entered last and scanned with radius 2: no relation yet.
    assert!(!aoi.is_neighbor(wide, narrow));

    // `wide` scans with radius 10 and writes the pair on both sides.
    aoi.adjust(wide).expect("adjust");
    assert!(aoi.is_neighbor(wide, narrow));
    assert!(aoi.is_neighbor(narrow, wide));
    assert_eq!(rec(&aoi, narrow).entered, vec![wide]);

    // `narrow` re-scans with its own radius and drops the pair again.
    aoi.adjust(narrow).expect("adjust");
    assert!(!aoi.is_neighbor(wide, narrow));
    assert_eq!(rec(&aoi, wide).left, vec![narrow]);
    aoi.validate().expect("invariants");
}

#[test]
fn radius_change_takes_effect_on_adjust() {
    let mut aoi = AoiManager::new();
    let a = spawn(&mut aoi, 0.0, 0.0, 10.0);
    let b = spawn(&mut aoi, 8.0, 0.0, 10.0);
    assert!(aoi.is_neighbor(a, b));

    aoi.get_mut(a).expect("entity").set_radius(4.0);
    assert!(aoi.is_neighbor(a, b));
    let stats = aoi.adjust(a).expect("adjust");
    assert_eq!(stats.left, 1);
    assert!(!aoi.is_neighbor(a, b));
}

#[test]
fn interest_change_silences_notifications() {
    let mut aoi = AoiManager::new();
    let a = spawn(&mut aoi, 0.0, 0.0, 10.0);
    aoi.get_mut(a)
        .expect("entity")
        .set_interest(Interest {
            notify_enter: true,
            notify_leave: false,
        });
    let b = spawn(&mut aoi, 1.0, 0.0, 10.0);
    aoi.moved(b, 100.0, 0.0).expect("move");
    assert_eq!(rec(&aoi, a).entered, vec![b]);
    assert!(rec(&aoi, a).left.is_empty());
    assert_eq!(rec(&aoi, b).left, vec![a]);
}

#[test]
fn axes_stay_sorted_after_moves() {
    let mut aoi = AoiManager::new();
    let ids: Vec<EntityId> = (0..8)
        .map(|i| spawn(&mut aoi, i as f32, (8 - i) as f32, 3.0))
        .collect();
    aoi.moved(ids[0], 20.0, -5.0).expect("move");
    aoi.moved(ids[7], -3.0, 30.0).expect("move");

    let x_order = aoi.axis_order(Axis::X);
    assert_eq!(x_order.first(), Some(&ids[7]));
    assert_eq!(x_order.last(), Some(&ids[0]));
    let z_order = aoi.axis_order(Axis::Z);
    assert_eq!(z_order.first(), Some(&ids[0]));
    assert_eq!(z_order.last(), Some(&ids[7]));
    aoi.validate().expect("invariants");
}

#[test]
fn adjust_work_ignores_entities_outside_both_windows() {
    fn cluster(far: usize) -> usize {
        let mut aoi: AoiManager<()> = AoiManager::new();
        let mover = aoi
            .enter(Entity::new(()).with_radius(10.0), 0.0, 0.0)
            .expect("enter");
        for i in 0..20 {
            let x = (i % 5) as f32 * 3.0 - 6.0;
            let z = (i / 5) as f32 * 3.0 - 6.0;
            aoi.enter(Entity::new(()).with_radius(10.0), x, z)
                .expect("enter");
        }
        // Far population: outside the mover's X window and Z window.
        for i in 0..far {
            let offset = 1_000.0 + i as f32;
            aoi.enter(Entity::new(()).with_radius(10.0), offset, offset)
                .expect("enter");
        }
        let stats = aoi.moved(mover, 1.0, 1.0).expect("move");
        aoi.validate().expect("invariants");
        stats.visited + stats.resorted
    }

    let baseline = cluster(0);
    assert!(baseline > 0);
    assert_eq!(cluster(100), baseline);
    assert_eq!(cluster(2_000), baseline);
}

#[test]
fn invalid_radius_falls_back_to_default_on_adjust() {
    let mut aoi = AoiManager::new();
    let a = spawn(&mut aoi, 0.0, 0.0, 10.0);
    let far = spawn(&mut aoi, 5_000.0, -7_000.0, 10.0);
    let default_radius = aoi.config().default_radius;

    for bad in [f32::NAN, f32::INFINITY, 0.0, -3.0] {
        aoi.get_mut(a).expect("entity").set_radius(bad);
        let stats = aoi.adjust(a).expect("adjust");
        assert_eq!(stats.visited, 0);
        assert_eq!(stats.entered, 0);
        assert!(!aoi.is_neighbor(a, far));
        assert_eq!(aoi.get(a).map(Entity::radius), Some(default_radius));
    }
    assert!(rec(&aoi, a).entered.is_empty());
    assert!(rec(&aoi, far).entered.is_empty());
    aoi.validate().expect("invariants");
}

#[test]
fn stationary_off_grid_pair_never_toggles() {
    let mut aoi = AoiManager::new();
    // 10.1 - 0.1 is not exactly 10 in f32; both sides must still agree.
    let a = spawn(&mut aoi, 0.1, 0.0, 10.0);
    let b = spawn(&mut aoi, 10.1, 0.0, 10.0);
    let paired = aoi.is_neighbor(a, b);

    for _ in 0..4 {
        let from_a = aoi.adjust(a).expect("adjust");
        let from_b = aoi.adjust(b).expect("adjust");
        assert_eq!(from_a.entered + from_a.left, 0);
        assert_eq!(from_b.entered + from_b.left, 0);
        assert_eq!(aoi.is_neighbor(a, b), paired);
    }
    assert_eq!(rec(&aoi, a).entered.len(), usize::from(paired));
    assert_eq!(rec(&aoi, b).entered.len(), usize::from(paired));
    assert!(rec(&aoi, a).left.is_empty());
    assert!(rec(&aoi, b).left.is_empty());
    aoi.validate().expect("invariants");
}
