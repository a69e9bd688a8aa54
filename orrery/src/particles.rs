//! Fixed capacity particle emitters.
//!
//! Each emitter owns a pool of particles allocated once. Dead particles
//! (`life <= 0`) are reused; when every slot is alive the first slot is
//! overwritten.

use std::f32::consts::TAU;

use glam::{Vec3, Vec4};
use orrery_types::{BlendMode, ParticleAbi, ParticleSpace};
use rand::{rngs::SmallRng, Rng, SeedableRng};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EmitterSettings {
    /// Size of the particle pool.
    pub capacity: usize,
    /// Particles spawned each time the spawn accumulator fills.
    pub spawn_amount: usize,
    /// Accumulator fill per second.
    pub spawn_rate: f32,
    /// Radius of the ball particles spawn in around the origin.
    pub range: f32,
    /// Seconds a particle lives.
    pub life: f32,
    /// Half extent of the particle quad in world units.
    pub size: f32,
    pub color: Vec4,
    pub blend: BlendMode,
    pub space: ParticleSpace,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            capacity: 500,
            spawn_amount: 2,
            spawn_rate: 60.0,
            range: 0.5,
            life: 1.0,
            size: 0.1,
            color: Vec4::ONE,
            blend: BlendMode::Additive,
            space: ParticleSpace::Local,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub color: Vec4,
    pub life: f32,
}

impl Particle {
    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }
}

#[derive(Debug, Clone)]
pub struct Emitter {
    settings: EmitterSettings,
    particles: Vec<Particle>,
    last_used: usize,
    accumulator: f32,
    previous_origin: Option<Vec3>,
    /// Emitter movement since the previous `emit`.
    movement: Vec3,
    rng: SmallRng,
}

impl Emitter {
    /// Allocates the pool. Capacity is at least one and life is kept positive.
    pub fn new(mut settings: EmitterSettings, seed: u64) -> Self {
        settings.capacity = settings.capacity.max(1);
        settings.life = settings.life.max(1.0e-3);
        settings.range = settings.range.abs();

        Self {
            particles: vec![Particle::default(); settings.capacity],
            settings,
            last_used: 0,
            accumulator: 0.0,
            previous_origin: None,
            movement: Vec3::ZERO,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn settings(&self) -> &EmitterSettings {
        &self.settings
    }

    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn live_count(&self) -> usize {
        self.particles.iter().filter(|p| p.is_alive()).count()
    }

    /// Spawns a batch of particles whenever the spawn accumulator fills.
    ///
    /// Also records how far the emitter moved since the previous call, which
    /// [`Emitter::step`] applies to local space particles. The first call records
    /// no movement.
    pub fn emit(&mut self, dt: f32, origin: Vec3, velocity_hint: Vec3) {
        self.movement = match self.previous_origin.replace(origin) {
            Some(previous) => origin - previous,
            None => Vec3::ZERO,
        };

        if !dt.is_finite() || dt <= 0.0 {
            return;
        }

        self.accumulator += self.settings.spawn_rate * dt;
        if self.accumulator > 1.0 {
            self.accumulator = 0.0;
            for _ in 0..self.settings.spawn_amount {
                let slot = self.first_unused();
                let offset = random_point_in_ball(&mut self.rng, self.settings.range);
                self.particles[slot] = Particle {
                    position: origin + offset,
                    velocity: velocity_hint,
                    color: self.settings.color,
                    life: self.settings.life,
                };
            }
        }
    }

    /// Ages and moves live particles. Alpha fades linearly with remaining life.
    pub fn step(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }

        let carried = match self.settings.space {
            ParticleSpace::Local => self.movement,
            ParticleSpace::World => Vec3::ZERO,
        };
        // Movement only applies once per emit.
        self.movement = Vec3::ZERO;

        let max_life = self.settings.life;
        for particle in &mut self.particles {
            if !particle.is_alive() {
                continue;
            }
            particle.life -= dt;
            if particle.is_alive() {
                particle.position += carried + particle.velocity * dt;
                particle.color.w = particle.life / max_life;
            }
        }
    }

    /// Forward scan from the last slot handed out, then from the start, then slot zero.
    fn first_unused(&mut self) -> usize {
        let found = (self.last_used..self.particles.len())
            .chain(0..self.last_used)
            .find(|&idx| !self.particles[idx].is_alive())
            .unwrap_or(0);
        self.last_used = found;
        found
    }

    /// Appends one quad instance per live particle.
    pub fn write_instances(&self, out: &mut Vec<ParticleAbi>) {
        out.extend(self.particles.iter().filter(|p| p.is_alive()).map(|p| ParticleAbi {
            position: p.position,
            size: self.settings.size,
            color: p.color,
        }));
    }
}

/// Uniformly distributed point inside a ball of `radius` around the origin.
pub fn random_point_in_ball(rng: &mut impl Rng, radius: f32) -> Vec3 {
    if radius <= 0.0 {
        return Vec3::ZERO;
    }
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let phi: f32 = rng.gen_range(0.0..TAU);
    let r = radius * rng.gen::<f32>().cbrt();
    let ring = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(ring * phi.cos(), ring * phi.sin(), z) * r
}
