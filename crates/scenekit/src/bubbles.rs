use crate::color::Rgb;
use crate::config::BubbleConfig;
use crate::entity::{Entity, EntityBuffer, VisualAttributes};
use crate::scenes::sample_range;
use glam::Vec3;
use rand::Rng;
use rand::rngs::StdRng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bubble {
    pub entity: Entity,
    /// Seconds since spawn
    pub age: f32,
    pub lifetime: f32,
    /// Rise per tick
    pub rise: f32,
    pub wobble_phase: f32,
}

impl Bubble {
    fn expired(&self, fade_threshold: f32) -> bool {
        self.age >= self.lifetime || self.entity.visual.opacity <= fade_threshold
    }
}

/// Opacity for a bubble `age` seconds into a `lifetime`, fading out over the
/// last `fade_fraction` of it
pub fn fade(base_opacity: f32, age: f32, lifetime: f32, fade_fraction: f32) -> f32 {
    let window = lifetime * fade_fraction;
    if window <= 0.0 {
        return if age < lifetime { base_opacity } else { 0.0 };
    }
    base_opacity * ((lifetime - age) / window).clamp(0.0, 1.0)
}

/// Self-removing bubbles, the only entities that die before teardown
#[derive(Debug)]
pub struct BubbleEmitter {
    config: BubbleConfig,
    bubbles: Vec<Bubble>,
    spawn_budget: f32,
    rng: StdRng,
}

impl BubbleEmitter {
    pub fn new(config: BubbleConfig, rng: StdRng) -> Self {
        Self {
            config,
            bubbles: Vec::new(),
            spawn_budget: 0.0,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    pub fn bubbles(&self) -> &[Bubble] {
        &self.bubbles
    }

    pub fn clear(&mut self) {
        self.bubbles.clear();
        self.spawn_budget = 0.0;
    }

    fn spawn(&mut self) {
        let [half_width, half_depth] = self.config.spawn_area;
        let position = Vec3::new(
            self.rng.random_range(-1.0..=1.0) * half_width,
            self.config.floor_y,
            self.rng.random_range(-1.0..=1.0) * half_depth,
        );
        let radius = sample_range(&mut self.rng, &self.config.radius);
        let visual = VisualAttributes {
            color: Rgb::from_hex(self.config.color),
            scale: radius,
            base_scale: radius,
            radius,
            opacity: self.config.opacity,
        };
        self.bubbles.push(Bubble {
            entity: Entity::new(position, Vec3::ZERO, visual),
            age: 0.0,
            lifetime: sample_range(&mut self.rng, &self.config.lifetime),
            rise: sample_range(&mut self.rng, &self.config.rise_speed),
            wobble_phase: self.rng.random_range(0.0..std::f32::consts::TAU),
        });
    }

    /// Spawn what the rate allows, move, age and fade every bubble, then drop
    /// the expired ones. Returns how many were removed.
    pub fn step(&mut self, elapsed: f32, delta: f32) -> usize {
        self.spawn_budget += self.config.spawn_rate.max(0.0) * delta.max(0.0);
        while self.spawn_budget >= 1.0 && self.bubbles.len() < self.config.max_bubbles {
            self.spawn();
            self.spawn_budget -= 1.0;
        }
        // No backlog while the cap is reached
        self.spawn_budget = self.spawn_budget.min(1.0);

        let config = &self.config;
        for bubble in &mut self.bubbles {
            bubble.age += delta;
            let sway = (elapsed * config.wobble_frequency + bubble.wobble_phase).sin();
            bubble.entity.velocity = Vec3::new(sway * config.wobble_amplitude, bubble.rise, 0.0);
            bubble.entity.position += bubble.entity.velocity;
            bubble.entity.visual.opacity =
                fade(config.opacity, bubble.age, bubble.lifetime, config.fade_fraction);
        }

        let before = self.bubbles.len();
        let threshold = config.fade_threshold;
        self.bubbles.retain(|bubble| !bubble.expired(threshold));
        before - self.bubbles.len()
    }

    pub fn write_to(&self, buffer: &mut EntityBuffer) {
        buffer.replace(self.bubbles.iter().map(|bubble| bubble.entity));
    }
}
