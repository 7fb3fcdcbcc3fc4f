//! Window input translated into framework events.
//!
//! [`InputEvent`] is the tagged form of everything an application can react
//! to; [`EventListener`] has one method per event class, all defaulting to
//! no-ops so handlers only implement what they use.

use winit::event::ElementState;
use winit::event::MouseButton;
use winit::event::MouseScrollDelta;
use winit::event::WindowEvent;
use winit::keyboard::KeyCode;
use winit::keyboard::PhysicalKey;

use crate::frame::Nano;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent
{
        KeyDown
        {
                key: KeyCode,
                repeat: bool,
        },
        KeyUp
        {
                key: KeyCode,
        },
        Char(char),
        MouseDown(MouseButton),
        MouseUp(MouseButton),
        MouseMove
        {
                x: f64,
                y: f64,
        },
        /// Lines for wheel mice, pixels for touchpads.
        Scroll
        {
                x: f32,
                y: f32,
        },
        Resize
        {
                width: u32,
                height: u32,
        },
}

impl InputEvent
{
        /// One key press may yield both a key and a character event.
        pub fn from_window_event(event: &WindowEvent) -> Vec<InputEvent>
        {
                match event
                {
                        WindowEvent::KeyboardInput { event, .. } =>
                        {
                                let mut events = Vec::with_capacity(2);

                                if let PhysicalKey::Code(key) = event.physical_key
                                {
                                        events.push(match event.state
                                        {
                                                ElementState::Pressed => InputEvent::KeyDown {
                                                        key,
                                                        repeat: event.repeat,
                                                },
                                                ElementState::Released => InputEvent::KeyUp { key },
                                        });
                                }

                                if event.state == ElementState::Pressed
                                {
                                        if let Some(text) = &event.text
                                        {
                                                events.extend(
                                                        text.chars()
                                                                .filter(|c| !c.is_control())
                                                                .map(InputEvent::Char),
                                                );
                                        }
                                }

                                events
                        }
                        WindowEvent::MouseInput { state, button, .. } => vec![match state
                        {
                                ElementState::Pressed => InputEvent::MouseDown(*button),
                                ElementState::Released => InputEvent::MouseUp(*button),
                        }],
                        WindowEvent::CursorMoved { position, .. } => vec![InputEvent::MouseMove {
                                x: position.x,
                                y: position.y,
                        }],
                        WindowEvent::MouseWheel { delta, .. } =>
                        {
                                let (x, y) = match delta
                                {
                                        MouseScrollDelta::LineDelta(x, y) => (*x, *y),
                                        MouseScrollDelta::PixelDelta(p) => (p.x as f32, p.y as f32),
                                };

                                vec![InputEvent::Scroll { x, y }]
                        }
                        WindowEvent::Resized(size) => vec![InputEvent::Resize {
                                width: size.width,
                                height: size.height,
                        }],
                        _ => Vec::new(),
                }
        }

        /// Keyboard and mouse events, which the overlay may capture.
        pub fn is_pointer_or_key(&self) -> bool
        {
                !matches!(self, InputEvent::Resize { .. })
        }

        pub fn deliver<L: EventListener + ?Sized>(
                self,
                listener: &mut L,
                nano: &mut Nano,
        )
        {
                match self
                {
                        InputEvent::KeyDown { key, repeat } => listener.on_key_down(nano, key, repeat),
                        InputEvent::KeyUp { key } => listener.on_key_up(nano, key),
                        InputEvent::Char(c) => listener.on_char(nano, c),
                        InputEvent::MouseDown(button) => listener.on_mouse_down(nano, button),
                        InputEvent::MouseUp(button) => listener.on_mouse_up(nano, button),
                        InputEvent::MouseMove { x, y } => listener.on_mouse_move(nano, x, y),
                        InputEvent::Scroll { x, y } => listener.on_scroll(nano, x, y),
                        InputEvent::Resize { width, height } => listener.on_resize(nano, width, height),
                }
        }
}

#[allow(unused_variables)]
pub trait EventListener
{
        fn on_key_down(
                &mut self,
                nano: &mut Nano,
                key: KeyCode,
                repeat: bool,
        )
        {
        }

        fn on_key_up(
                &mut self,
                nano: &mut Nano,
                key: KeyCode,
        )
        {
        }

        fn on_char(
                &mut self,
                nano: &mut Nano,
                c: char,
        )
        {
        }

        fn on_mouse_down(
                &mut self,
                nano: &mut Nano,
                button: MouseButton,
        )
        {
        }

        fn on_mouse_up(
                &mut self,
                nano: &mut Nano,
                button: MouseButton,
        )
        {
        }

        fn on_mouse_move(
                &mut self,
                nano: &mut Nano,
                x: f64,
                y: f64,
        )
        {
        }

        fn on_scroll(
                &mut self,
                nano: &mut Nano,
                x: f32,
                y: f32,
        )
        {
        }

        fn on_resize(
                &mut self,
                nano: &mut Nano,
                width: u32,
                height: u32,
        )
        {
        }
}
