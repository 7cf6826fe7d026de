use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Terms the water shader can evaluate
pub const MAX_WAVE_TERMS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveShape {
    Sin,
    Cos,
}

/// `amplitude * shape(kx * x + kz * z + speed * t + phase)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveTerm {
    pub shape: WaveShape,
    pub amplitude: f32,
    pub kx: f32,
    pub kz: f32,
    pub speed: f32,
    #[serde(default)]
    pub phase: f32,
}

impl WaveTerm {
    pub fn argument(&self, x: f32, z: f32, time: f32) -> f32 {
        self.kx * x + self.kz * z + self.speed * time + self.phase
    }

    pub fn eval(&self, x: f32, z: f32, time: f32) -> f32 {
        self.value_at(self.argument(x, z, time))
    }

    /// Term evaluated at a raw phase angle
    pub fn value_at(&self, angle: f32) -> f32 {
        match self.shape {
            WaveShape::Sin => self.amplitude * angle.sin(),
            WaveShape::Cos => self.amplitude * angle.cos(),
        }
    }
}

/// Sum of phase-shifted periodic terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveStack {
    pub terms: Vec<WaveTerm>,
}

impl Default for WaveStack {
    fn default() -> Self {
        Self {
            terms: vec![
                WaveTerm { shape: WaveShape::Sin, amplitude: 0.4, kx: 0.3, kz: 0.0, speed: 1.2, phase: 0.0 },
                WaveTerm { shape: WaveShape::Cos, amplitude: 0.2, kx: 0.0, kz: 0.5, speed: 1.5, phase: 0.0 },
                WaveTerm { shape: WaveShape::Sin, amplitude: 0.1, kx: 0.7, kz: 0.7, speed: 1.0, phase: 0.0 },
            ],
        }
    }
}

impl WaveStack {
    pub fn height(&self, x: f32, z: f32, time: f32) -> f32 {
        self.terms.iter().map(|term| term.eval(x, z, time)).sum()
    }

    /// Surface normal (y up) from central differences
    pub fn normal(&self, x: f32, z: f32, time: f32) -> Vec3 {
        const STEP: f32 = 0.01;
        let dx = (self.height(x + STEP, z, time) - self.height(x - STEP, z, time)) / (2.0 * STEP);
        let dz = (self.height(x, z + STEP, time) - self.height(x, z - STEP, time)) / (2.0 * STEP);
        Vec3::new(-dx, 1.0, -dz).normalize()
    }

    /// Largest possible displacement
    pub fn max_amplitude(&self) -> f32 {
        self.terms.iter().map(|term| term.amplitude.abs()).sum()
    }

    /// Two vec4 per term for the shader: `(amplitude, kx, kz, speed)` and
    /// `(phase, shape, 0, 0)` where shape is 0 for sine, 1 for cosine.
    /// Unused slots are zero and contribute nothing.
    pub fn packed(&self) -> [Vec4; MAX_WAVE_TERMS * 2] {
        let mut packed = [Vec4::ZERO; MAX_WAVE_TERMS * 2];
        for (i, term) in self.terms.iter().take(MAX_WAVE_TERMS).enumerate() {
            let shape = match term.shape {
                WaveShape::Sin => 0.0,
                WaveShape::Cos => 1.0,
            };
            packed[i * 2] = Vec4::new(term.amplitude, term.kx, term.kz, term.speed);
            packed[i * 2 + 1] = Vec4::new(term.phase, shape, 0.0, 0.0);
        }
        packed
    }
}
