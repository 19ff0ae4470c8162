use cgmath::{MetricSpace, Vector2};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::{initialize, FieldParams, Particle};

/// One proximity link between a pair of particles, endpoints in device
/// pixels.
#[derive(Copy, Clone, Debug)]
pub struct Link {
  pub a: [f32; 2],
  pub b: [f32; 2],
  pub alpha: f32,
}

pub struct Field {
  params: FieldParams,
  width: f32,
  height: f32,
  particles: Vec<Particle>,
  pointer: Option<[f32; 2]>,
  rng: SmallRng,
}

impl Field {
  #[must_use]
  pub fn new(params: FieldParams, width: u32, height: u32, seed: Option<u64>) -> Self {
    let rng = match seed {
      Some(seed) => SmallRng::seed_from_u64(seed),
      None => SmallRng::from_entropy(),
    };
    let mut field = Self {
      params,
      width: width.max(1) as f32,
      height: height.max(1) as f32,
      particles: Vec::new(),
      pointer: None,
      rng,
    };
    field.reseed();
    field
  }

  /// Discards every particle and scatters a fresh set over the current
  /// bounds.
  pub fn reseed(&mut self) {
    self.particles = initialize::scatter(&mut self.rng, &self.params, self.width, self.height);
  }

  /// Adopts new viewport bounds. The whole field is regenerated rather than
  /// repositioned.
  pub fn resize(&mut self, width: u32, height: u32) {
    self.width = width.max(1) as f32;
    self.height = height.max(1) as f32;
    self.reseed();
  }

  /// Advances every particle by one frame: Euler step, then toroidal wrap.
  pub fn step(&mut self) {
    for p in &mut self.particles {
      let next = Vector2::from(p.pos) + Vector2::from(p.vel);
      p.pos = next.into();
      // Edge teleport, not reflection: a coordinate leaving through one
      // side reappears at the opposite bound with velocity untouched. A
      // low-side crossing lands exactly on the bound, which is the same
      // point as zero on the torus and moves back inside on the next step.
      if p.pos[0] < 0.0 {
        p.pos[0] = self.width;
      } else if p.pos[0] > self.width {
        p.pos[0] = 0.0;
      }
      if p.pos[1] < 0.0 {
        p.pos[1] = self.height;
      } else if p.pos[1] > self.height {
        p.pos[1] = 0.0;
      }
    }
  }

  /// Scans every unordered particle pair once and collects the segments
  /// closer than the proximity threshold into `out`.
  pub fn collect_links(&self, out: &mut Vec<Link>) {
    out.clear();
    for (i, p) in self.particles.iter().enumerate() {
      for q in &self.particles[i + 1..] {
        let dist = Vector2::from(p.pos).distance(Vector2::from(q.pos));
        if let Some(alpha) = self.params.link_alpha_at(dist) {
          out.push(Link {
            a: p.pos,
            b: q.pos,
            alpha,
          });
        }
      }
    }
  }

  pub fn set_pointer(&mut self, x: f32, y: f32) {
    self.pointer = Some([x, y]);
  }

  /// Last recorded pointer position. Updated on every move signal, read by
  /// nothing in the simulation.
  #[must_use]
  pub fn pointer(&self) -> Option<[f32; 2]> {
    self.pointer
  }

  #[must_use]
  pub fn particles(&self) -> &[Particle] {
    &self.particles
  }

  #[must_use]
  pub fn bounds(&self) -> (f32, f32) {
    (self.width, self.height)
  }
}

#[cfg(test)]
mod tests {
  use super::Field;
  use crate::{FieldParams, Particle};

  fn test_field(width: u32, height: u32) -> Field {
    Field::new(FieldParams::default(), width, height, Some(7))
  }

  fn still(x: f32, y: f32) -> Particle {
    Particle {
      pos: [x, y],
      vel: [0.0, 0.0],
      radius: 2.0,
      opacity: 0.5,
    }
  }

  #[test]
  fn field_matches_target_count_in_bounds() {
    let field = test_field(800, 600);
    assert_eq!(field.particles().len(), 80);
    for p in field.particles() {
      assert!(p.pos[0] >= 0.0 && p.pos[0] < 800.0);
      assert!(p.pos[1] >= 0.0 && p.pos[1] < 600.0);
    }
  }

  #[test]
  fn high_side_crossing_teleports_to_zero() {
    let mut field = test_field(800, 600);
    field.particles = vec![Particle {
      pos: [799.9, 300.0],
      vel: [0.5, 0.0],
      radius: 2.0,
      opacity: 0.5,
    }];
    field.step();
    let p = field.particles()[0];
    assert_eq!(p.pos[0], 0.0);
    assert_eq!(p.vel, [0.5, 0.0]);
  }

  #[test]
  fn low_side_crossing_lands_on_opposite_bound() {
    let mut field = test_field(800, 600);
    let mut a = still(0.0, 300.0);
    a.vel = [-0.5, 0.0];
    field.particles = vec![a, still(799.0, 300.0)];
    field.step();
    assert_eq!(field.particles()[0].pos[0], 800.0);
    assert_eq!(field.particles()[1].pos[0], 799.0);

    // the pair distance is recomputed from the wrapped position
    let mut links = Vec::new();
    field.collect_links(&mut links);
    assert_eq!(links.len(), 1);
    let expected = 0.15 * (1.0 - 1.0 / 150.0);
    assert!((links[0].alpha - expected).abs() < 1e-6);
  }

  #[test]
  fn link_alpha_fades_out_at_the_threshold() {
    let params = FieldParams::default();
    assert!((params.link_alpha_at(0.0).unwrap() - 0.15).abs() < 1e-6);
    let mut last = f32::MAX;
    for d in 0..=150 {
      let alpha = params.link_alpha_at(d as f32).unwrap_or(0.0);
      assert!(alpha <= last);
      last = alpha;
    }
    assert!(params.link_alpha_at(149.99).unwrap() > 0.0);
    assert!(params.link_alpha_at(150.0).is_none());
    assert!(params.link_alpha_at(151.0).is_none());
  }

  #[test]
  fn link_scan_visits_each_pair_once() {
    let mut field = test_field(800, 600);
    field.particles = vec![
      still(100.0, 100.0),
      still(110.0, 100.0),
      still(100.0, 110.0),
      still(700.0, 500.0),
    ];
    let mut links = Vec::new();
    field.collect_links(&mut links);
    // three mutually close particles, one far outlier
    assert_eq!(links.len(), 3);

    // the scratch vec is cleared on every scan
    field.collect_links(&mut links);
    assert_eq!(links.len(), 3);
  }

  #[test]
  fn reseed_replaces_every_particle() {
    let mut field = test_field(800, 600);
    let before: Vec<[f32; 2]> = field.particles().iter().map(|p| p.pos).collect();
    field.reseed();
    assert_eq!(field.particles().len(), 80);
    for p in field.particles() {
      assert!(!before.contains(&p.pos));
      assert!(p.pos[0] >= 0.0 && p.pos[0] < 800.0);
      assert!(p.pos[1] >= 0.0 && p.pos[1] < 600.0);
    }
  }

  #[test]
  fn resize_regenerates_at_new_bounds() {
    let mut field = test_field(800, 600);
    let before: Vec<[f32; 2]> = field.particles().iter().map(|p| p.pos).collect();
    field.resize(400, 300);
    assert_eq!(field.bounds(), (400.0, 300.0));
    assert_eq!(field.particles().len(), 80);
    for p in field.particles() {
      assert!(!before.contains(&p.pos));
      assert!(p.pos[0] >= 0.0 && p.pos[0] < 400.0);
      assert!(p.pos[1] >= 0.0 && p.pos[1] < 300.0);
    }
  }

  #[test]
  fn steps_keep_particles_on_the_torus() {
    let mut field = test_field(640, 480);
    for _ in 0..10_000 {
      field.step();
      for p in field.particles() {
        // a coordinate may sit exactly on the far bound for the frame
        // after a low-side crossing; that bound is identified with zero
        assert!(p.pos[0] >= 0.0 && p.pos[0] <= 640.0);
        assert!(p.pos[1] >= 0.0 && p.pos[1] <= 480.0);
      }
    }
  }

  #[test]
  fn velocities_never_change() {
    let mut field = test_field(800, 600);
    let before: Vec<[f32; 2]> = field.particles().iter().map(|p| p.vel).collect();
    for _ in 0..1_000 {
      field.step();
    }
    let after: Vec<[f32; 2]> = field.particles().iter().map(|p| p.vel).collect();
    assert_eq!(before, after);
  }

  #[test]
  fn pointer_is_recorded_but_inert() {
    let mut plain = test_field(800, 600);
    let mut tracked = test_field(800, 600);
    assert_eq!(tracked.pointer(), None);
    tracked.set_pointer(120.0, 40.0);
    assert_eq!(tracked.pointer(), Some([120.0, 40.0]));

    // same seed, same trajectories, pointer or not
    plain.step();
    tracked.step();
    for (p, q) in plain.particles().iter().zip(tracked.particles()) {
      assert_eq!(p.pos, q.pos);
    }
  }
}
