use rand::rngs::SmallRng;
use rand::Rng;
use rand_distr::Uniform;

use crate::{FieldParams, Particle};

/// Scatters a full particle set over `[0, width) x [0, height)`. Every draw
/// comes from the caller's generator, so consecutive calls keep producing
/// fresh fields.
#[must_use]
pub fn scatter(rng: &mut SmallRng, params: &FieldParams, width: f32, height: f32) -> Vec<Particle> {
  let pos_x = Uniform::new(0.0f32, width);
  let pos_y = Uniform::new(0.0f32, height);
  let vel = Uniform::new(-params.max_speed, params.max_speed);
  let radius = Uniform::new(params.min_radius, params.max_radius);
  let opacity = Uniform::new(params.min_opacity, params.max_opacity);

  let mut particles = Vec::with_capacity(params.particle_count as usize);
  for _ in 0..params.particle_count {
    particles.push(Particle {
      pos: [rng.sample(pos_x), rng.sample(pos_y)],
      vel: [rng.sample(vel), rng.sample(vel)],
      radius: rng.sample(radius),
      opacity: rng.sample(opacity),
    });
  }
  particles
}

#[cfg(test)]
mod tests {
  use super::scatter;
  use crate::FieldParams;
  use rand::rngs::SmallRng;
  use rand::SeedableRng;

  #[test]
  fn scatter_honors_configured_ranges() {
    let params = FieldParams::default();
    let mut rng = SmallRng::seed_from_u64(3);
    let particles = scatter(&mut rng, &params, 800.0, 600.0);
    assert_eq!(particles.len(), params.particle_count as usize);
    for p in &particles {
      assert!(p.pos[0] >= 0.0 && p.pos[0] < 800.0);
      assert!(p.pos[1] >= 0.0 && p.pos[1] < 600.0);
      assert!(p.vel[0] >= -params.max_speed && p.vel[0] < params.max_speed);
      assert!(p.vel[1] >= -params.max_speed && p.vel[1] < params.max_speed);
      assert!(p.radius >= params.min_radius && p.radius < params.max_radius);
      assert!(p.opacity >= params.min_opacity && p.opacity < params.max_opacity);
    }
  }

  #[test]
  fn scatter_is_deterministic_for_a_seed() {
    let params = FieldParams::default();
    let mut a = SmallRng::seed_from_u64(42);
    let mut b = SmallRng::seed_from_u64(42);
    let first = scatter(&mut a, &params, 640.0, 480.0);
    let second = scatter(&mut b, &params, 640.0, 480.0);
    for (p, q) in first.iter().zip(&second) {
      assert_eq!(p.pos, q.pos);
      assert_eq!(p.vel, q.vel);
      assert_eq!(p.radius, q.radius);
      assert_eq!(p.opacity, q.opacity);
    }
  }

  #[test]
  fn consecutive_scatters_differ() {
    let params = FieldParams::default();
    let mut rng = SmallRng::seed_from_u64(42);
    let first = scatter(&mut rng, &params, 640.0, 480.0);
    let second = scatter(&mut rng, &params, 640.0, 480.0);
    assert_eq!(second.len(), first.len());
    assert!(first.iter().zip(&second).any(|(p, q)| p.pos != q.pos));
  }
}
