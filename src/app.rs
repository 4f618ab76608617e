//! Host driver: window, surface, event loop.
//!
//! Translates winit events into the simulator's input stream and drives one
//! `update`/`render` pair per redraw. Everything in here is host plumbing;
//! the simulator itself never sees winit types.

use std::sync::Arc;

use winit::{
    event::{ElementState, Event, MouseButton, TouchPhase, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::config::SimConfig;
use crate::input::{InputEvent, Key, PointerId};
use crate::simulation::Simulator;

const MOUSE_POINTER_ID: PointerId = -1;

pub fn run() {
    let event_loop = EventLoop::new().unwrap();

    let window_attributes = winit::window::Window::default_attributes()
        .with_title("inkflow")
        .with_inner_size(winit::dpi::PhysicalSize::new(1280, 720));
    let window = Arc::new(event_loop.create_window(window_attributes).unwrap());

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    let surface = instance.create_surface(window.clone()).unwrap();

    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: Some(&surface),
        force_fallback_adapter: false,
    }))
    .expect("no suitable GPU adapter");

    let size = window.inner_size();
    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .find(|f| f.is_srgb())
        .copied()
        .unwrap_or(surface_caps.formats[0]);

    let mut simulator = match Simulator::new(
        &adapter,
        surface_format,
        (size.width.max(1), size.height.max(1)),
        SimConfig::default(),
    ) {
        Ok(simulator) => simulator,
        Err(e) => {
            eprintln!("inkflow: {e}");
            std::process::exit(1);
        }
    };

    let mut surface_config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode: surface_caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(simulator.device(), &surface_config);

    let mut cursor = (0.0f32, 0.0f32);
    let mut last_frame = std::time::Instant::now();

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { event, window_id } if window_id == window.id() => {
                    match event {
                        WindowEvent::CloseRequested => {
                            log::info!("close requested");
                            elwt.exit();
                        }
                        WindowEvent::Resized(new_size) => {
                            if new_size.width > 0 && new_size.height > 0 {
                                surface_config.width = new_size.width;
                                surface_config.height = new_size.height;
                                surface.configure(simulator.device(), &surface_config);
                                if let Err(e) = simulator.resize(new_size.width, new_size.height)
                                {
                                    log::error!("resize failed, will retry: {e}");
                                }
                            }
                        }
                        WindowEvent::CursorMoved { position, .. } => {
                            cursor = (position.x as f32, position.y as f32);
                            simulator.handle_event(InputEvent::PointerMove {
                                id: MOUSE_POINTER_ID,
                                x: cursor.0,
                                y: cursor.1,
                            });
                        }
                        WindowEvent::MouseInput { state, button, .. } => {
                            if button == MouseButton::Left {
                                let event = match state {
                                    ElementState::Pressed => InputEvent::PointerDown {
                                        id: MOUSE_POINTER_ID,
                                        x: cursor.0,
                                        y: cursor.1,
                                    },
                                    ElementState::Released => InputEvent::PointerUp {
                                        id: MOUSE_POINTER_ID,
                                    },
                                };
                                simulator.handle_event(event);
                            }
                        }
                        WindowEvent::Touch(touch) => {
                            let id = touch.id as PointerId;
                            let (x, y) = (touch.location.x as f32, touch.location.y as f32);
                            let event = match touch.phase {
                                TouchPhase::Started => InputEvent::PointerDown { id, x, y },
                                TouchPhase::Moved => InputEvent::PointerMove { id, x, y },
                                TouchPhase::Ended => InputEvent::PointerUp { id },
                                TouchPhase::Cancelled => InputEvent::PointerCancel { id },
                            };
                            simulator.handle_event(event);
                        }
                        WindowEvent::KeyboardInput { event, .. } => {
                            if event.state == ElementState::Pressed && !event.repeat {
                                let code = match event.physical_key {
                                    PhysicalKey::Code(KeyCode::KeyP) => Key::P,
                                    PhysicalKey::Code(KeyCode::Space) => Key::Space,
                                    _ => Key::Other,
                                };
                                simulator.handle_event(InputEvent::Key { code });
                            }
                        }
                        WindowEvent::RedrawRequested => {
                            let now = std::time::Instant::now();
                            let dt = now.duration_since(last_frame).as_secs_f32();
                            last_frame = now;

                            simulator.update(dt);

                            let output = match surface.get_current_texture() {
                                Ok(output) => output,
                                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                    surface.configure(simulator.device(), &surface_config);
                                    return;
                                }
                                Err(e) => {
                                    log::error!("surface acquire failed: {e}");
                                    return;
                                }
                            };
                            let view = output
                                .texture
                                .create_view(&wgpu::TextureViewDescriptor::default());
                            simulator.render(&view);
                            output.present();
                        }
                        _ => {}
                    }
                }
                Event::AboutToWait => {
                    window.request_redraw();
                }
                _ => {}
            }
        })
        .unwrap();
}
