use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::player::Vec3;

/// Half-extent of the square play area on the XZ plane.
pub const MAP_HALF_EXTENT: f32 = 200.0;

/// Players spawn standing on the ground plane.
pub const SPAWN_HEIGHT: f32 = 1.0;

/// An axis-aligned spawn rectangle on the XZ plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnZone {
    pub x_min: f32,
    pub x_max: f32,
    pub z_min: f32,
    pub z_max: f32,
}

impl SpawnZone {
    const fn new(x_min: f32, x_max: f32, z_min: f32, z_max: f32) -> Self {
        Self {
            x_min,
            x_max,
            z_min,
            z_max,
        }
    }

    /// Uniformly sample a point inside the zone.
    pub fn sample(&self, rng: &mut impl Rng) -> Vec3 {
        Vec3::new(
            rng.random_range(self.x_min..self.x_max),
            SPAWN_HEIGHT,
            rng.random_range(self.z_min..self.z_max),
        )
    }

    pub fn contains(&self, p: &Vec3) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.z >= self.z_min && p.z <= self.z_max
    }
}

/// Fixed non-overlapping spawn zones: the four map corners plus the middle
/// of each edge. Keeping zones well apart means a fresh spawn is never
/// inside tag range of another zone's occupant.
pub const SPAWN_ZONES: &[SpawnZone] = &[
    SpawnZone::new(-180.0, -120.0, -180.0, -120.0),
    SpawnZone::new(-180.0, -120.0, 120.0, 180.0),
    SpawnZone::new(120.0, 180.0, -180.0, -120.0),
    SpawnZone::new(120.0, 180.0, 120.0, 180.0),
    SpawnZone::new(-30.0, 30.0, -180.0, -120.0),
    SpawnZone::new(-30.0, 30.0, 120.0, 180.0),
    SpawnZone::new(-180.0, -120.0, -30.0, 30.0),
    SpawnZone::new(120.0, 180.0, -30.0, 30.0),
];

/// Pick a random spawn zone and a random point inside it.
pub fn random_spawn_point(rng: &mut impl Rng) -> Vec3 {
    let zone = &SPAWN_ZONES[rng.random_range(0..SPAWN_ZONES.len())];
    zone.sample(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn zones_fit_inside_map() {
        for zone in SPAWN_ZONES {
            assert!(zone.x_min >= -MAP_HALF_EXTENT && zone.x_max <= MAP_HALF_EXTENT);
            assert!(zone.z_min >= -MAP_HALF_EXTENT && zone.z_max <= MAP_HALF_EXTENT);
            assert!(zone.x_min < zone.x_max);
            assert!(zone.z_min < zone.z_max);
        }
    }

    #[test]
    fn zones_do_not_overlap() {
        for (i, a) in SPAWN_ZONES.iter().enumerate() {
            for b in &SPAWN_ZONES[i + 1..] {
                let disjoint_x = a.x_max <= b.x_min || b.x_max <= a.x_min;
                let disjoint_z = a.z_max <= b.z_min || b.z_max <= a.z_min;
                assert!(
                    disjoint_x || disjoint_z,
                    "zones {a:?} and {b:?} overlap"
                );
            }
        }
    }

    #[test]
    fn sampled_points_land_in_a_zone() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let p = random_spawn_point(&mut rng);
            assert_eq!(p.y, SPAWN_HEIGHT);
            assert!(
                SPAWN_ZONES.iter().any(|z| z.contains(&p)),
                "spawn point {p:?} outside every zone"
            );
        }
    }
}
