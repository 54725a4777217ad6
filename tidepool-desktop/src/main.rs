mod platform;
mod switches;

use glfw::{Action, Context as _, Key, Modifiers, MouseButton, SwapInterval, Window, WindowEvent, WindowHint, WindowMode};
use luminance::framebuffer::FramebufferError;
use luminance_glfw::{GlfwSurface, GlfwSurfaceError};
use platform::DesktopPlatformServices;
use std::{error::Error, fmt, iter, os::raw::c_void, path::PathBuf, process};
use structopt::StructOpt;
use switches::{on_off, GlSwitches};
use tidepool::{
  camera::Movement, clock::FrameClock, terrain::TessellationMode, textures::SamplerKind, FrameInput,
  InputAction, LoopFeedback, Scene, SceneConfig, SceneError,
};

// frames between two window title refreshes
const TITLE_REFRESH: u64 = 30;

#[derive(Debug, StructOpt)]
pub struct CLIOpts {
  #[structopt(short, long, default_value = "data")]
  /// Directory where to pick textures from.
  textures: PathBuf,

  #[structopt(short, long)]
  /// List available scenes.
  list_scenes: bool,

  #[structopt(long, default_value = "800")]
  /// Window width.
  width: u32,

  #[structopt(long, default_value = "600")]
  /// Window height.
  height: u32,

  #[structopt(long)]
  /// Don’t wait for the vertical blank before swapping buffers.
  no_vsync: bool,

  #[structopt(short, long, default_value = "trilinear")]
  /// Texture filtering: nearest, bilinear or trilinear.
  sampler: SamplerKind,

  /// Scene to run.
  scene: Option<String>,
}

/// Macro to declaratively add scenes.
macro_rules! scenes {
  ($($name:literal => $scene:ty),* $(,)?) => {
    fn show_available_scenes() {
      println!("available scenes:");
      $( println!("  - {}", $name); )*
    }

    // run a scene based on its name
    fn pick_and_run_scene(cli_opts: &CLIOpts) -> Result<(), DesktopError> {
      match cli_opts.scene.as_deref() {
        $(
          Some($name) => run_scene::<$scene>(cli_opts, $name),
        )*

        Some(name) => {
          log::error!("no scene named {}", name);
          show_available_scenes();
          Err(DesktopError::UnknownScene(name.to_owned()))
        }

        None => {
          log::error!("no scene picked");
          show_available_scenes();
          Err(DesktopError::NoScene)
        }
      }
    }
  }
}

scenes! {
  "water" => tidepool::water::WaterScene,
  "terrain" => tidepool::terrain::TerrainScene,
  "gallery" => tidepool::gallery::GalleryScene,
}

/// Raised when GLFW cannot open the window.
#[derive(Debug)]
pub struct NoWindow;

impl fmt::Display for NoWindow {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str("cannot create the window")
  }
}

impl Error for NoWindow {}

#[derive(Debug)]
pub enum DesktopError {
  UnknownScene(String),
  NoScene,
  Surface(GlfwSurfaceError<NoWindow>),
  BackBuffer(FramebufferError),
  Scene(SceneError),
}

impl fmt::Display for DesktopError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      DesktopError::UnknownScene(ref name) => write!(f, "unknown scene: {}", name),
      DesktopError::NoScene => f.write_str("no scene to run"),
      DesktopError::Surface(ref e) => write!(f, "cannot create the GLFW surface: {}", e),
      DesktopError::BackBuffer(ref e) => write!(f, "cannot get the back buffer: {}", e),
      DesktopError::Scene(ref e) => write!(f, "cannot bootstrap the scene: {}", e),
    }
  }
}

impl Error for DesktopError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      DesktopError::UnknownScene(_) | DesktopError::NoScene => None,
      DesktopError::Surface(e) => Some(e),
      DesktopError::BackBuffer(e) => Some(e),
      DesktopError::Scene(e) => Some(e),
    }
  }
}

impl From<GlfwSurfaceError<NoWindow>> for DesktopError {
  fn from(e: GlfwSurfaceError<NoWindow>) -> Self {
    DesktopError::Surface(e)
  }
}

impl From<FramebufferError> for DesktopError {
  fn from(e: FramebufferError) -> Self {
    DesktopError::BackBuffer(e)
  }
}

impl From<SceneError> for DesktopError {
  fn from(e: SceneError) -> Self {
    DesktopError::Scene(e)
  }
}

/// What a window event turns into.
#[derive(Clone, Copy, Debug, PartialEq)]
enum DesktopAction {
  /// Forwarded to the scene.
  Scene(InputAction),
  ToggleMultisampling,
  ToggleWireframe,
  ToggleVsync,
}

fn swap_interval(vsync: bool) -> SwapInterval {
  if vsync {
    SwapInterval::Sync(1)
  } else {
    SwapInterval::None
  }
}

// Run a scene until it exits.
fn run_scene<S>(cli_opts: &CLIOpts, name: &str) -> Result<(), DesktopError>
where
  S: Scene,
{
  // Check the features so that we know what we need to load.
  let mut services = DesktopPlatformServices::new(cli_opts.textures.clone(), S::features());
  let mut vsync = !cli_opts.no_vsync;
  let (width, height) = (cli_opts.width, cli_opts.height);
  let title = format!("tidepool | {}", name);

  let surface = GlfwSurface::new(|glfw| -> Result<_, GlfwSurfaceError<NoWindow>> {
    // tessellation stages need a 4.x context; 4.1 is the highest everywhere
    glfw.window_hint(WindowHint::ContextVersion(4, 1));
    glfw.window_hint(WindowHint::Samples(Some(4)));

    let (mut window, events) = glfw
      .create_window(width, height, &title, WindowMode::Windowed)
      .ok_or(GlfwSurfaceError::UserError(NoWindow))?;

    window.make_current();
    window.set_all_polling(true);
    glfw.set_swap_interval(swap_interval(vsync));

    Ok((window, events))
  })?;

  let mut context = surface.context;
  let events = surface.events_rx;

  // raw calls go through our own bindings
  gl::load_with(|s| context.window.get_proc_address(s) as *const c_void);

  let mut switches = GlSwitches::default();
  switches.apply();

  let (fb_w, fb_h) = context.window.get_framebuffer_size();
  let config = SceneConfig {
    size: [fb_w.max(0) as u32, fb_h.max(0) as u32],
    sampler: cli_opts.sampler,
  };

  log::info!("starting {} ({}×{}, vsync {})", name, fb_w, fb_h, on_off(vsync));
  log::info!("move with WASD, R and F; look around holding the right mouse button; Enter resets the camera");
  log::info!("F1 multisampling, F2 wireframe, F3 face culling, F4 depth test, F5 vsync, Esc quits");

  let scene = S::bootstrap(&config, &mut services, &mut context)?;
  let mut clock = FrameClock::new();

  // render a first frame passing the initial framebuffer size, so that scenes get a correct size whatever they
  // assumed while bootstrapping
  let input = FrameInput {
    frame: clock.tick(),
    movement: Movement::empty(),
  };
  let feedback = scene.render_frame(
    &input,
    context.back_buffer()?,
    iter::once(InputAction::Resized {
      width: config.size[0],
      height: config.size[1],
    }),
    &mut context,
  );
  let mut scene = match feedback {
    LoopFeedback::Exit => return Ok(()),
    LoopFeedback::Continue(scene) => scene,
  };
  context.window.swap_buffers();

  // loading may have taken a while; don’t count it as a frame
  clock.reset();

  loop {
    // handle events
    context.window.glfw.poll_events();

    let mut actions = Vec::new();
    for (_, event) in glfw::flush_messages(&events) {
      match adapt_events(event) {
        Some(DesktopAction::Scene(action)) => actions.push(action),
        Some(DesktopAction::ToggleMultisampling) => switches.toggle_multisampling(),
        Some(DesktopAction::ToggleWireframe) => switches.toggle_wireframe(),

        Some(DesktopAction::ToggleVsync) => {
          vsync = !vsync;
          context.window.glfw.set_swap_interval(swap_interval(vsync));
          log::info!("vsync: {}", on_off(vsync));
        }

        None => (),
      }
    }

    let frame = clock.tick();
    if frame.frame_index % TITLE_REFRESH == 0 {
      context.window.set_title(&format!("{} | {}", title, frame.title()));
    }

    let input = FrameInput {
      frame,
      movement: held_movement(&context.window),
    };
    let back_buffer = context.back_buffer()?;

    match scene.render_frame(&input, back_buffer, actions.into_iter(), &mut context) {
      LoopFeedback::Continue(stepped) => {
        scene = stepped;
        context.window.swap_buffers();
      }

      LoopFeedback::Exit => return Ok(()),
    }
  }
}

fn held_movement(window: &Window) -> Movement {
  movement_from(|key| window.get_key(key) != Action::Release)
}

// Movement from the state of the movement keys.
fn movement_from(is_held: impl Fn(Key) -> bool) -> Movement {
  const BINDINGS: [(Key, Movement); 6] = [
    (Key::W, Movement::FORWARD),
    (Key::S, Movement::BACKWARD),
    (Key::A, Movement::LEFT),
    (Key::D, Movement::RIGHT),
    (Key::R, Movement::UP),
    (Key::F, Movement::DOWN),
  ];

  BINDINGS
    .iter()
    .filter(|(key, _)| is_held(*key))
    .fold(Movement::empty(), |movement, (_, direction)| movement | *direction)
}

fn adapt_events(event: WindowEvent) -> Option<DesktopAction> {
  let scene = |action| Some(DesktopAction::Scene(action));

  match event {
    WindowEvent::Close | WindowEvent::Key(Key::Escape, _, Action::Release, _) => scene(InputAction::Quit),

    WindowEvent::Key(Key::Space, _, Action::Release, mods) => {
      if mods.is_empty() {
        scene(InputAction::MainToggle)
      } else if mods == Modifiers::Shift {
        scene(InputAction::AuxiliaryToggle)
      } else {
        None
      }
    }

    WindowEvent::Key(key, _, Action::Press, _) => {
      log::debug!("key press: {:?}", key);
      match key {
        Key::Enter => scene(InputAction::ResetCamera),
        Key::F1 => Some(DesktopAction::ToggleMultisampling),
        Key::F2 => Some(DesktopAction::ToggleWireframe),
        Key::F3 => scene(InputAction::ToggleFaceCulling),
        Key::F4 => scene(InputAction::ToggleDepthTest),
        Key::F5 => Some(DesktopAction::ToggleVsync),
        Key::Num1 => TessellationMode::from_digit(1).and_then(|m| scene(InputAction::SelectTessellation(m))),
        Key::Num2 => TessellationMode::from_digit(2).and_then(|m| scene(InputAction::SelectTessellation(m))),
        Key::Num3 => TessellationMode::from_digit(3).and_then(|m| scene(InputAction::SelectTessellation(m))),
        _ => None,
      }
    }

    WindowEvent::MouseButton(MouseButton::Button2, action, _) => match action {
      Action::Press => scene(InputAction::LookPressed),
      Action::Release => scene(InputAction::LookReleased),
      _ => None,
    },

    WindowEvent::CursorPos(x, y) => scene(InputAction::CursorMoved {
      x: x as _,
      y: y as _,
    }),

    WindowEvent::FramebufferSize(width, height) => scene(InputAction::Resized {
      width: width.max(0) as _,
      height: height.max(0) as _,
    }),

    _ => None,
  }
}

fn main() {
  env_logger::builder()
    .filter_level(log::LevelFilter::Info)
    .parse_default_env()
    .init();
  let cli_opts = CLIOpts::from_args();

  if cli_opts.list_scenes {
    show_available_scenes();
    return;
  }

  if let Err(e) = pick_and_run_scene(&cli_opts) {
    log::error!("{}", e);
    process::exit(1);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(key: Key, action: Action, mods: Modifiers) -> WindowEvent {
    WindowEvent::Key(key, 0, action, mods)
  }

  #[test]
  fn cli_defaults() {
    let opts = CLIOpts::from_iter_safe(&["tidepool-desktop", "water"]).unwrap();

    assert_eq!(opts.textures, PathBuf::from("data"));
    assert_eq!((opts.width, opts.height), (800, 600));
    assert!(!opts.no_vsync);
    assert!(!opts.list_scenes);
    assert_eq!(opts.sampler, SamplerKind::Trilinear);
    assert_eq!(opts.scene.as_deref(), Some("water"));
  }

  #[test]
  fn cli_overrides() {
    let opts = CLIOpts::from_iter_safe(&[
      "tidepool-desktop",
      "--textures",
      "assets",
      "--width",
      "1280",
      "--height",
      "720",
      "--no-vsync",
      "--sampler",
      "nearest",
      "terrain",
    ])
    .unwrap();

    assert_eq!(opts.textures, PathBuf::from("assets"));
    assert_eq!((opts.width, opts.height), (1280, 720));
    assert!(opts.no_vsync);
    assert_eq!(opts.sampler, SamplerKind::Nearest);
    assert_eq!(opts.scene.as_deref(), Some("terrain"));
  }

  #[test]
  fn cli_rejects_unknown_samplers() {
    assert!(CLIOpts::from_iter_safe(&["tidepool-desktop", "--sampler", "cubic"]).is_err());
  }

  #[test]
  fn escape_and_close_quit() {
    assert_eq!(
      adapt_events(key(Key::Escape, Action::Release, Modifiers::empty())),
      Some(DesktopAction::Scene(InputAction::Quit))
    );
    assert_eq!(
      adapt_events(WindowEvent::Close),
      Some(DesktopAction::Scene(InputAction::Quit))
    );
  }

  #[test]
  fn space_toggles() {
    assert_eq!(
      adapt_events(key(Key::Space, Action::Release, Modifiers::empty())),
      Some(DesktopAction::Scene(InputAction::MainToggle))
    );
    assert_eq!(
      adapt_events(key(Key::Space, Action::Release, Modifiers::Shift)),
      Some(DesktopAction::Scene(InputAction::AuxiliaryToggle))
    );
    assert_eq!(adapt_events(key(Key::Space, Action::Release, Modifiers::Control)), None);
  }

  #[test]
  fn function_keys() {
    let press = |k| adapt_events(key(k, Action::Press, Modifiers::empty()));

    assert_eq!(press(Key::F1), Some(DesktopAction::ToggleMultisampling));
    assert_eq!(press(Key::F2), Some(DesktopAction::ToggleWireframe));
    assert_eq!(press(Key::F3), Some(DesktopAction::Scene(InputAction::ToggleFaceCulling)));
    assert_eq!(press(Key::F4), Some(DesktopAction::Scene(InputAction::ToggleDepthTest)));
    assert_eq!(press(Key::F5), Some(DesktopAction::ToggleVsync));
    assert_eq!(press(Key::Enter), Some(DesktopAction::Scene(InputAction::ResetCamera)));
  }

  #[test]
  fn number_keys_pick_tessellation() {
    let press = |k| adapt_events(key(k, Action::Press, Modifiers::empty()));

    assert_eq!(
      press(Key::Num1),
      Some(DesktopAction::Scene(InputAction::SelectTessellation(TessellationMode::DistanceBased)))
    );
    assert_eq!(
      press(Key::Num2),
      Some(DesktopAction::Scene(InputAction::SelectTessellation(TessellationMode::Flat)))
    );
    assert_eq!(
      press(Key::Num3),
      Some(DesktopAction::Scene(InputAction::SelectTessellation(TessellationMode::Max)))
    );
  }

  #[test]
  fn right_button_looks_around() {
    assert_eq!(
      adapt_events(WindowEvent::MouseButton(MouseButton::Button2, Action::Press, Modifiers::empty())),
      Some(DesktopAction::Scene(InputAction::LookPressed))
    );
    assert_eq!(
      adapt_events(WindowEvent::MouseButton(MouseButton::Button2, Action::Release, Modifiers::empty())),
      Some(DesktopAction::Scene(InputAction::LookReleased))
    );
    assert_eq!(
      adapt_events(WindowEvent::MouseButton(MouseButton::Button1, Action::Press, Modifiers::empty())),
      None
    );
  }

  #[test]
  fn framebuffer_size_resizes() {
    assert_eq!(
      adapt_events(WindowEvent::FramebufferSize(1024, 768)),
      Some(DesktopAction::Scene(InputAction::Resized {
        width: 1024,
        height: 768
      }))
    );
  }

  #[test]
  fn held_keys_combine() {
    let movement = movement_from(|key| key == Key::W || key == Key::D || key == Key::R);

    assert_eq!(movement, Movement::FORWARD | Movement::RIGHT | Movement::UP);
    assert_eq!(movement_from(|_| false), Movement::empty());
  }
}
