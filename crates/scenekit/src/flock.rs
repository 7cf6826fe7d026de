//! Boid-style schooling for the fish scene.

use crate::config::FishConfig;
use crate::entity::{Entity, EntityBuffer};
use crate::physics::{Bounds, EPSILON, ReflectMode};
use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMode {
    /// Leave one face, come back in through the opposite one
    Wrap,
    /// Bounce off the faces
    Reflect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlockRules {
    pub perception_radius: f32,
    pub separation_radius: f32,
    pub alignment: f32,
    pub cohesion: f32,
    pub separation: f32,
    pub avoid_radius: f32,
    pub avoid_strength: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub edges: EdgeMode,
}

impl FlockRules {
    pub fn from_config(config: &FishConfig) -> Self {
        Self {
            perception_radius: config.perception_radius,
            separation_radius: config.separation_radius,
            alignment: config.alignment,
            cohesion: config.cohesion,
            separation: config.separation,
            avoid_radius: config.avoid_radius,
            avoid_strength: config.avoid_strength,
            min_speed: config.min_speed,
            max_speed: config.max_speed.max(config.min_speed),
            edges: EdgeMode::Wrap,
        }
    }

    /// Velocity change for `entities[index]` from its neighbours and the pointer
    pub fn steer(&self, entities: &[Entity], index: usize, pointer: Option<Vec3>) -> Vec3 {
        let fish = &entities[index];
        let mut velocity_sum = Vec3::ZERO;
        let mut position_sum = Vec3::ZERO;
        let mut push = Vec3::ZERO;
        let mut neighbours = 0;

        for (other_index, other) in entities.iter().enumerate() {
            if other_index == index {
                continue;
            }
            let offset = fish.position - other.position;
            let distance = offset.length();
            if distance >= self.perception_radius {
                continue;
            }
            neighbours += 1;
            velocity_sum += other.velocity;
            position_sum += other.position;
            if distance < self.separation_radius {
                push += offset / (distance * distance + EPSILON);
            }
        }

        let mut steer = push * self.separation;
        if neighbours > 0 {
            let count = neighbours as f32;
            steer += (velocity_sum / count - fish.velocity) * self.alignment;
            steer += (position_sum / count - fish.position) * self.cohesion;
        }

        if let Some(pointer) = pointer {
            let away = fish.position - pointer;
            let distance = away.length();
            if distance < self.avoid_radius {
                let falloff = 1.0 - distance / self.avoid_radius;
                steer += away / (distance + EPSILON) * self.avoid_strength * falloff;
            }
        }
        steer
    }

    /// One tick for the whole school. Steering is computed from the state at
    /// the start of the tick, so the result does not depend on entity order.
    pub fn step(&self, buffer: &mut EntityBuffer, pointer: Option<Vec3>, bounds: &Bounds) {
        let steering: Vec<Vec3> = (0..buffer.len())
            .map(|index| self.steer(buffer.entities(), index, pointer))
            .collect();

        for (fish, steer) in buffer.iter_mut().zip(steering) {
            fish.velocity = clamp_speed(fish.velocity + steer, self.min_speed, self.max_speed);
            fish.position += fish.velocity;
            match self.edges {
                EdgeMode::Wrap => bounds.wrap(&mut fish.position),
                EdgeMode::Reflect => {
                    bounds.reflect(&mut fish.position, &mut fish.velocity, ReflectMode::Clamp { restitution: 1.0 });
                }
            }
            fish.rotation = heading(fish.velocity);
        }
    }
}

/// Rescale `velocity` so its length lies in `[min, max]`. A standing fish
/// starts swimming along +X.
pub fn clamp_speed(velocity: Vec3, min: f32, max: f32) -> Vec3 {
    let speed = velocity.length();
    if speed < EPSILON {
        return Vec3::X * min;
    }
    velocity * (speed.clamp(min, max) / speed)
}

/// Euler rotation that turns a +X facing model into the swim direction
pub fn heading(velocity: Vec3) -> Vec3 {
    let direction = velocity.normalize_or_zero();
    if direction == Vec3::ZERO {
        return Vec3::ZERO;
    }
    let yaw = (-direction.z).atan2(direction.x);
    let pitch = direction.y.clamp(-1.0, 1.0).asin();
    Vec3::new(0.0, yaw, pitch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{EulerRot, Quat};
    use proptest::prelude::*;

    fn rules() -> FlockRules {
        FlockRules::from_config(&FishConfig::default())
    }

    fn fish(position: Vec3, velocity: Vec3) -> Entity {
        Entity::new(position, velocity, Default::default())
    }

    #[test]
    fn lone_fish_only_reacts_to_pointer() {
        let school = [fish(Vec3::ZERO, Vec3::X * 0.05)];
        assert_eq!(rules().steer(&school, 0, None), Vec3::ZERO);

        let steer = rules().steer(&school, 0, Some(Vec3::new(1.0, 0.0, 0.0)));
        assert!(steer.x < 0.0);
    }

    #[test]
    fn crowded_fish_push_apart() {
        let school = [fish(Vec3::ZERO, Vec3::ZERO), fish(Vec3::new(0.2, 0.0, 0.0), Vec3::ZERO)];
        let rules = FlockRules { cohesion: 0.0, ..rules() };
        assert!(rules.steer(&school, 0, None).x < 0.0);
        assert!(rules.steer(&school, 1, None).x > 0.0);
    }

    #[test]
    fn distant_fish_are_ignored() {
        let school = [fish(Vec3::ZERO, Vec3::X), fish(Vec3::new(50.0, 0.0, 0.0), Vec3::NEG_X)];
        assert_eq!(rules().steer(&school, 0, None), Vec3::ZERO);
    }

    #[test]
    fn alignment_pulls_towards_neighbour_heading() {
        let school = [fish(Vec3::ZERO, Vec3::X * 0.05), fish(Vec3::new(0.0, 1.5, 0.0), Vec3::Z * 0.05)];
        let rules = FlockRules { cohesion: 0.0, separation: 0.0, ..rules() };
        let steer = rules.steer(&school, 0, None);
        assert!(steer.z > 0.0);
        assert!(steer.x < 0.0);
    }

    #[test]
    fn standing_fish_gets_minimum_speed() {
        assert_eq!(clamp_speed(Vec3::ZERO, 0.02, 0.08), Vec3::X * 0.02);
    }

    #[test]
    fn heading_points_model_along_velocity() {
        let velocity = Vec3::new(0.3, 0.2, -0.5);
        let rotation = heading(velocity);
        let turned = Quat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z) * Vec3::X;
        assert!((turned - velocity.normalize()).length() < 1e-4, "turned {turned:?}");
    }

    #[test]
    fn reflecting_school_stays_inside() {
        let bounds = Bounds::symmetric(Vec3::splat(1.0));
        let rules = FlockRules { edges: EdgeMode::Reflect, ..rules() };
        let mut buffer = EntityBuffer::new(vec![
            fish(Vec3::new(0.95, 0.0, 0.0), Vec3::X * 0.08),
            fish(Vec3::new(-0.95, 0.5, 0.0), Vec3::NEG_X * 0.08),
        ]);
        for _ in 0..200 {
            rules.step(&mut buffer, None, &bounds);
            assert!(buffer.entities().iter().all(|f| bounds.contains(f.position)));
        }
    }

    proptest! {
        #[test]
        fn speeds_stay_in_range(
            seeds in prop::collection::vec((-5.0f32..5.0, -3.0f32..3.0, -0.2f32..0.2, -0.2f32..0.2), 1..20),
            pointer_x in -5.0f32..5.0,
        ) {
            let rules = rules();
            let bounds = Bounds::symmetric(Vec3::new(8.0, 4.0, 4.0));
            let mut buffer = EntityBuffer::new(
                seeds
                    .iter()
                    .map(|(x, y, vx, vy)| fish(Vec3::new(*x, *y, 0.0), Vec3::new(*vx, *vy, 0.0)))
                    .collect(),
            );
            for _ in 0..5 {
                rules.step(&mut buffer, Some(Vec3::new(pointer_x, 0.0, 0.0)), &bounds);
            }
            for fish in buffer.entities() {
                let speed = fish.velocity.length();
                prop_assert!(speed >= rules.min_speed - 1e-5 && speed <= rules.max_speed + 1e-5);
            }
        }
    }
}
