use std::borrow::Cow;
use wgpu::{util::DeviceExt, PipelineCompilationOptions};

use crate::field::{Field, Link};
use crate::FieldParams;

// #0a0a0f, the page backdrop behind the field, in linear space
const BACKDROP: wgpu::Color = wgpu::Color {
  r: 0.003,
  g: 0.003,
  b: 0.005,
  a: 1.0,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct LinkVertex {
  pos: [f32; 2],
  alpha: f32,
}

pub struct Render {
  disc_pipeline: wgpu::RenderPipeline,
  link_pipeline: wgpu::RenderPipeline,
  vertices_buffer: wgpu::Buffer,
  particle_buffer: wgpu::Buffer,
  link_buffer: wgpu::Buffer,
  links: Vec<Link>,
  link_vertices: Vec<LinkVertex>,
}

impl Render {
  #[must_use]
  pub fn init(
    config: &wgpu::SurfaceConfiguration,
    _adapter: &wgpu::Adapter,
    device: &wgpu::Device,
    _queue: &wgpu::Queue,
    screen_bind_group_layout: &wgpu::BindGroupLayout,
    params: &FieldParams,
  ) -> Self {
    let draw_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
      label: None,
      source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/draw.wgsl"))),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
      label: Some("field"),
      bind_group_layouts: &[screen_bind_group_layout],
      push_constant_ranges: &[],
    });
    let target = wgpu::ColorTargetState {
      format: config.view_formats[0],
      blend: Some(wgpu::BlendState::ALPHA_BLENDING),
      write_mask: wgpu::ColorWrites::ALL,
    };

    // ========================================================================
    // disc pipeline stuff
    // ========================================================================

    let particle_buffer_layout = wgpu::VertexBufferLayout {
      array_stride: 6 * 4, // pos2 + vel2 + radius + opacity
      step_mode: wgpu::VertexStepMode::Instance,
      attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32, 3 => Float32],
    };
    let vertex_buffer = wgpu::VertexBufferLayout {
      array_stride: 2 * 4, // quad corner
      step_mode: wgpu::VertexStepMode::Vertex,
      attributes: &wgpu::vertex_attr_array![4 => Float32x2],
    };
    let disc_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
      label: Some("Disc Pipeline"),
      layout: Some(&pipeline_layout),
      vertex: wgpu::VertexState {
        module: &draw_shader,
        entry_point: "disc_vs",
        compilation_options: PipelineCompilationOptions::default(),
        buffers: &[particle_buffer_layout, vertex_buffer],
      },
      fragment: Some(wgpu::FragmentState {
        module: &draw_shader,
        entry_point: "disc_fs",
        compilation_options: PipelineCompilationOptions::default(),
        targets: &[Some(target.clone())],
      }),
      primitive: wgpu::PrimitiveState::default(),
      depth_stencil: None,
      multisample: wgpu::MultisampleState::default(),
      multiview: None,
      cache: None,
    });

    // ========================================================================
    // link pipeline stuff
    // ========================================================================

    let link_buffer_layout = wgpu::VertexBufferLayout {
      array_stride: 3 * 4, // pos2 + alpha
      step_mode: wgpu::VertexStepMode::Vertex,
      attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32],
    };
    let link_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
      label: Some("Link Pipeline"),
      layout: Some(&pipeline_layout),
      vertex: wgpu::VertexState {
        module: &draw_shader,
        entry_point: "link_vs",
        compilation_options: PipelineCompilationOptions::default(),
        buffers: &[link_buffer_layout],
      },
      fragment: Some(wgpu::FragmentState {
        module: &draw_shader,
        entry_point: "link_fs",
        compilation_options: PipelineCompilationOptions::default(),
        targets: &[Some(target)],
      }),
      primitive: wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::LineList,
        ..Default::default()
      },
      depth_stencil: None,
      multisample: wgpu::MultisampleState::default(),
      multiview: None,
      cache: None,
    });

    let vertex_buffer_data: [f32; 12] = [
      // two triangles spanning the unit quad around a particle
      -1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, 1.0,
    ];
    let vertices_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Vertex Buffer"),
      contents: bytemuck::bytes_of(&vertex_buffer_data),
      usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    });

    let particle_count = params.particle_count as usize;
    let particle_buffer = device.create_buffer(&wgpu::BufferDescriptor {
      label: Some("Particle Buffer"),
      size: (particle_count * 6 * 4) as u64,
      usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
      mapped_at_creation: false,
    });

    // sized for the worst case where every unordered pair is linked
    let max_links = particle_count * particle_count.saturating_sub(1) / 2;
    let link_buffer = device.create_buffer(&wgpu::BufferDescriptor {
      label: Some("Link Buffer"),
      size: (max_links * 2 * 3 * 4) as u64,
      usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
      mapped_at_creation: false,
    });

    Render {
      disc_pipeline,
      link_pipeline,
      vertices_buffer,
      particle_buffer,
      link_buffer,
      links: Vec::new(),
      link_vertices: Vec::with_capacity(max_links * 2),
    }
  }

  pub fn render(
    &mut self,
    view: &wgpu::TextureView,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    screen_bind_group: &wgpu::BindGroup,
    field: &Field,
  ) {
    field.collect_links(&mut self.links);
    self.link_vertices.clear();
    for link in &self.links {
      self.link_vertices.push(LinkVertex {
        pos: link.a,
        alpha: link.alpha,
      });
      self.link_vertices.push(LinkVertex {
        pos: link.b,
        alpha: link.alpha,
      });
    }

    queue.write_buffer(
      &self.particle_buffer,
      0,
      bytemuck::cast_slice(field.particles()),
    );
    if !self.link_vertices.is_empty() {
      queue.write_buffer(&self.link_buffer, 0, bytemuck::cast_slice(&self.link_vertices));
    }

    let color_attachments = [Some(wgpu::RenderPassColorAttachment {
      view,
      resolve_target: None,
      ops: wgpu::Operations {
        load: wgpu::LoadOp::Clear(BACKDROP),
        store: wgpu::StoreOp::Store,
      },
    })];
    let render_pass_descriptor = wgpu::RenderPassDescriptor {
      label: None,
      color_attachments: &color_attachments,
      depth_stencil_attachment: None,
      timestamp_writes: None,
      occlusion_query_set: None,
    };
    let mut command_encoder =
      device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    {
      let mut rpass = command_encoder.begin_render_pass(&render_pass_descriptor);
      rpass.set_pipeline(&self.disc_pipeline);
      rpass.set_bind_group(0, screen_bind_group, &[]);
      rpass.set_vertex_buffer(0, self.particle_buffer.slice(..));
      rpass.set_vertex_buffer(1, self.vertices_buffer.slice(..));
      rpass.draw(0..6, 0..field.particles().len() as u32);
      if !self.link_vertices.is_empty() {
        rpass.set_pipeline(&self.link_pipeline);
        rpass.set_bind_group(0, screen_bind_group, &[]);
        rpass.set_vertex_buffer(0, self.link_buffer.slice(..));
        rpass.draw(0..self.link_vertices.len() as u32, 0..1);
      }
    }
    queue.submit(Some(command_encoder.finish()));
  }
}
