pub mod field;
pub mod initialize;
pub mod render;
pub mod state;

#[derive(Copy, Clone, Debug)]
pub struct FieldParams {
  pub particle_count: u32,
  pub max_speed: f32,
  pub min_radius: f32,
  pub max_radius: f32,
  pub min_opacity: f32,
  pub max_opacity: f32,
  pub link_distance: f32,
  pub link_alpha: f32,
}

impl Default for FieldParams {
  fn default() -> Self {
    Self {
      particle_count: 80,
      max_speed: 0.25, // per axis, pixels per frame
      min_radius: 1.0,
      max_radius: 3.0,
      min_opacity: 0.2,
      max_opacity: 0.7,
      link_distance: 150.0,
      link_alpha: 0.15, // peak alpha of a link, reached when a pair coincides
    }
  }
}

impl FieldParams {
  /// Alpha of the line joining two particles `distance` apart; `None` once
  /// the pair is at or beyond the proximity threshold.
  #[must_use]
  pub fn link_alpha_at(&self, distance: f32) -> Option<f32> {
    if distance < self.link_distance {
      Some(self.link_alpha * (1.0 - distance / self.link_distance))
    } else {
      None
    }
  }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Particle {
  pub pos: [f32; 2],
  pub vel: [f32; 2],
  pub radius: f32,
  pub opacity: f32,
}
