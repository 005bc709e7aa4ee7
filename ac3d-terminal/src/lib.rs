/// Terminal viewer for AC3D models
use ac3d_core::Scene;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self},
};
use log::debug;
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};

pub mod camera;
pub mod renderer;
pub mod textures;

pub use camera::Camera;
pub use renderer::AsciiRenderer;
pub use textures::TextureSet;

/// Radians per orbit key press
const ORBIT_STEP: f32 = 0.1;
const ZOOM_STEP: f32 = 0.9;

/// Main application struct for terminal model viewing
pub struct TerminalApp {
    scene: Scene,
    textures: TextureSet,
    title: String,
    camera: Camera,
    renderer: AsciiRenderer,
    width: u16,
    height: u16,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(scene: Scene, textures: TextureSet, title: impl Into<String>) -> io::Result<Self> {
        let (width, height) = terminal::size()?;

        Ok(Self {
            camera: Camera::fit_to_bounding_box(&scene.bounding_box, width as u32, height as u32),
            renderer: AsciiRenderer::new(width as usize, height as usize),
            scene,
            textures,
            title: title.into(),
            width,
            height,
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?);
            }

            self.render()?;

            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press | KeyEventKind::Repeat,
                ..
            }) => self.handle_key(code),
            Event::Resize(width, height) => {
                debug!("terminal resized to {width}x{height}");
                self.width = width;
                self.height = height;
                self.camera.resize(width as u32, height as u32);
                self.renderer.resize(width as usize, height as usize);
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('w') | KeyCode::Up => self.camera.orbit(0.0, ORBIT_STEP),
            KeyCode::Char('s') | KeyCode::Down => self.camera.orbit(0.0, -ORBIT_STEP),
            KeyCode::Char('a') | KeyCode::Left => self.camera.orbit(-ORBIT_STEP, 0.0),
            KeyCode::Char('d') | KeyCode::Right => self.camera.orbit(ORBIT_STEP, 0.0),
            KeyCode::Char('+') | KeyCode::Char('=') => self.camera.zoom(ZOOM_STEP),
            KeyCode::Char('-') => self.camera.zoom(1.0 / ZOOM_STEP),
            KeyCode::Char('f') => {
                self.camera = Camera::fit_to_bounding_box(
                    &self.scene.bounding_box,
                    self.width as u32,
                    self.height as u32,
                );
            }
            _ => {}
        }
    }

    fn render(&mut self) -> io::Result<()> {
        self.renderer.clear();
        self.renderer
            .render_scene(&self.scene, &self.camera, &self.textures);

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.draw(&mut stdout)?;

        // Status line
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "{} | {} groups | FPS: {:.1} | WASD/Arrows=Orbit +/-=Zoom F=Frame Q=Quit",
                self.title,
                self.scene.groups.len(),
                self.fps
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}
