use crate::field::Field;
use crate::render::Render;
use crate::FieldParams;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::{
  dpi::PhysicalSize,
  event::{ElementState, Event, KeyEvent, StartCause, WindowEvent},
  event_loop::{EventLoop, EventLoopWindowTarget},
  keyboard::{KeyCode, PhysicalKey},
  window::Window,
};

pub struct RunOptions {
  pub params: FieldParams,
  pub width: u32,
  pub height: u32,
  pub seed: Option<u64>,
  pub headless: bool,
  pub frames: u64,
}

impl Default for RunOptions {
  fn default() -> Self {
    Self {
      params: FieldParams::default(),
      width: 1280,
      height: 720,
      seed: None,
      headless: false,
      frames: 0,
    }
  }
}

/// Cooperative cancellation for the animation loops; every clone observes
/// the same flag.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  pub fn request_stop(&self) {
    self.0.store(true, Ordering::Relaxed);
  }

  #[must_use]
  pub fn stop_requested(&self) -> bool {
    self.0.load(Ordering::Relaxed)
  }
}

struct EventLoopWrapper {
  event_loop: EventLoop<()>,
  window: Arc<Window>,
}

impl EventLoopWrapper {
  fn new(title: &str, width: u32, height: u32) -> Option<Self> {
    let event_loop = match EventLoop::new() {
      Ok(event_loop) => event_loop,
      Err(err) => {
        warn!("no event loop available, particle field stays off: {err}");
        return None;
      }
    };
    let mut builder = winit::window::WindowBuilder::new();
    builder = builder
      .with_title(title)
      .with_inner_size(PhysicalSize::new(width, height));
    let window = match builder.build(&event_loop) {
      Ok(window) => Arc::new(window),
      Err(err) => {
        warn!("window creation failed, particle field stays off: {err}");
        return None;
      }
    };

    Some(Self { event_loop, window })
  }
}

struct SurfaceWrapper {
  surface: Option<wgpu::Surface<'static>>,
  config: Option<wgpu::SurfaceConfiguration>,
}

impl SurfaceWrapper {
  fn new() -> Self {
    Self {
      surface: None,
      config: None,
    }
  }

  fn resume(&mut self, context: &State, window: Arc<Window>) -> bool {
    let window_size = window.inner_size();
    let width = window_size.width.max(1);
    let height = window_size.height.max(1);
    let surface = match context.instance.create_surface(window) {
      Ok(surface) => surface,
      Err(err) => {
        warn!("surface creation failed, particle field stays off: {err}");
        return false;
      }
    };
    let mut config = match surface.get_default_config(&context.adapter, width, height) {
      Some(config) => config,
      None => {
        warn!("surface is incompatible with the adapter, particle field stays off");
        return false;
      }
    };
    let view_format = config.format.add_srgb_suffix();
    config.view_formats.push(view_format);
    surface.configure(&context.device, &config);
    self.surface = Some(surface);
    self.config = Some(config);
    true
  }

  fn resize(&mut self, context: &State, size: PhysicalSize<u32>) {
    let config = self.config.as_mut().unwrap();
    config.width = size.width.max(1);
    config.height = size.height.max(1);
    self
      .surface
      .as_ref()
      .unwrap()
      .configure(&context.device, config);
  }

  fn acquire(&mut self, context: &State) -> wgpu::SurfaceTexture {
    let surface = self.surface.as_ref().unwrap();

    match surface.get_current_texture() {
      Ok(frame) => frame,
      Err(wgpu::SurfaceError::Timeout) => surface.get_current_texture().unwrap(),
      Err(
        wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost | wgpu::SurfaceError::OutOfMemory,
      ) => {
        surface.configure(&context.device, self.config());
        surface.get_current_texture().unwrap()
      }
    }
  }

  fn suspend(&mut self) {}

  fn config(&self) -> &wgpu::SurfaceConfiguration {
    self.config.as_ref().unwrap()
  }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ScreenUniform {
  size: [f32; 2],
  _pad: [f32; 2],
}

impl ScreenUniform {
  fn new(width: u32, height: u32) -> Self {
    Self {
      size: [width.max(1) as f32, height.max(1) as f32],
      _pad: [0.0; 2],
    }
  }
}

struct State {
  instance: wgpu::Instance,
  adapter: wgpu::Adapter,
  device: wgpu::Device,
  queue: wgpu::Queue,
  screen_buffer: wgpu::Buffer,
  screen_bind_group: wgpu::BindGroup,
  screen_bind_group_layout: wgpu::BindGroupLayout,
}

impl State {
  fn resize(&self, size: PhysicalSize<u32>) {
    let uniform = ScreenUniform::new(size.width, size.height);
    self
      .queue
      .write_buffer(&self.screen_buffer, 0, bytemuck::bytes_of(&uniform));
  }

  async fn init(surface: &SurfaceWrapper, size: &PhysicalSize<u32>) -> Option<Self> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
      #[cfg(not(target_arch = "wasm32"))]
      backends: wgpu::Backends::PRIMARY,
      ..Default::default()
    });

    let adapter = match instance
      .request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: surface.surface.as_ref(),
        force_fallback_adapter: false,
      })
      .await
    {
      Some(adapter) => adapter,
      None => {
        warn!("no compatible graphics adapter, particle field stays off");
        return None;
      }
    };

    let (device, queue) = match adapter
      .request_device(
        &wgpu::DeviceDescriptor {
          label: None,
          required_features: wgpu::Features::empty(),
          required_limits: wgpu::Limits::default(),
          memory_hints: Default::default(),
        },
        None,
      )
      .await
    {
      Ok(pair) => pair,
      Err(err) => {
        warn!("device request failed, particle field stays off: {err}");
        return None;
      }
    };

    let uniform = ScreenUniform::new(size.width, size.height);
    let screen_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Screen Buffer"),
      contents: bytemuck::bytes_of(&uniform),
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let screen_bind_group_layout =
      device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
          binding: 0,
          visibility: wgpu::ShaderStages::VERTEX,
          ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
          },
          count: None,
        }],
        label: Some("screen_bind_group_layout"),
      });
    let screen_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
      layout: &screen_bind_group_layout,
      entries: &[wgpu::BindGroupEntry {
        binding: 0,
        resource: screen_buffer.as_entire_binding(),
      }],
      label: Some("screen_bind_group"),
    });

    Some(Self {
      instance,
      adapter,
      device,
      queue,
      screen_buffer,
      screen_bind_group,
      screen_bind_group_layout,
    })
  }
}

async fn start(options: &RunOptions, stop: StopHandle) {
  let window_loop = match EventLoopWrapper::new("Particle Field", options.width, options.height) {
    Some(window_loop) => window_loop,
    None => return,
  };
  let mut surface = SurfaceWrapper::new();
  let context = match State::init(&surface, &window_loop.window.inner_size()).await {
    Some(context) => context,
    None => return,
  };
  let params = options.params;
  let seed = options.seed;
  let event_loop_function = EventLoop::run;
  let mut render: Option<Render> = None;
  let mut field: Option<Field> = None;

  let _ = (event_loop_function)(
    window_loop.event_loop,
    move |event, target: &EventLoopWindowTarget<()>| match event {
      Event::NewEvents(StartCause::Init) => {
        if !surface.resume(&context, window_loop.window.clone()) {
          target.exit();
          return;
        }
        if render.is_none() {
          let config = surface.config();
          render = Some(Render::init(
            config,
            &context.adapter,
            &context.device,
            &context.queue,
            &context.screen_bind_group_layout,
            &params,
          ));
          field = Some(Field::new(params, config.width, config.height, seed));
          context.resize(PhysicalSize::new(config.width, config.height));
          info!(
            "field started: {} particles over {}x{}",
            params.particle_count, config.width, config.height
          );
        }
      }
      Event::Suspended => {
        surface.suspend();
      }
      Event::WindowEvent { event, window_id } if window_id == window_loop.window.id() => {
        match event {
          WindowEvent::CloseRequested
          | WindowEvent::KeyboardInput {
            event:
              KeyEvent {
                state: ElementState::Pressed,
                physical_key: PhysicalKey::Code(KeyCode::Escape),
                ..
              },
            ..
          } => target.exit(),
          WindowEvent::Resized(size) => {
            // a resize regenerates the whole field at the new bounds
            if surface.surface.is_some() {
              surface.resize(&context, size);
              context.resize(size);
              if let Some(field) = &mut field {
                field.resize(size.width, size.height);
              }
            }
          }
          WindowEvent::CursorMoved { position, .. } => {
            if let Some(field) = &mut field {
              field.set_pointer(position.x as f32, position.y as f32);
            }
          }
          WindowEvent::RedrawRequested => {
            window_loop.window.request_redraw();
            if stop.stop_requested() {
              target.exit();
              return;
            }
            if render.is_none() {
              return;
            }
            if let (Some(field), Some(render)) = (&mut field, &mut render) {
              field.step();
              let frame = surface.acquire(&context);
              let view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
                format: Some(surface.config().view_formats[0]),
                ..wgpu::TextureViewDescriptor::default()
              });
              render.render(
                &view,
                &context.device,
                &context.queue,
                &context.screen_bind_group,
                field,
              );
              frame.present();
            }
          }
          _ => {}
        }
      }
      _ => {}
    },
  );
}

/// Runs the field without a window: same particles, same link scan, no GPU.
pub fn run_headless(options: &RunOptions, stop: &StopHandle) {
  let mut field = Field::new(options.params, options.width, options.height, options.seed);
  let mut links = Vec::new();
  let mut frame: u64 = 0;
  info!(
    "headless field: {} particles over {}x{}",
    options.params.particle_count, options.width, options.height
  );
  while !stop.stop_requested() {
    if options.frames != 0 && frame >= options.frames {
      break;
    }
    field.step();
    field.collect_links(&mut links);
    frame += 1;
    if frame % 600 == 0 {
      info!("frame {frame}: {} links", links.len());
    }
  }
  info!("stopped after {frame} frames, {} links in the last one", links.len());
}

pub fn run(options: &RunOptions) {
  env_logger::init();
  let stop = StopHandle::new();
  let handler_stop = stop.clone();
  if let Err(err) = ctrlc::set_handler(move || handler_stop.request_stop()) {
    warn!("ctrl-c handler not installed: {err}");
  }
  if options.headless {
    run_headless(options, &stop);
  } else {
    pollster::block_on(start(options, stop));
  }
}
