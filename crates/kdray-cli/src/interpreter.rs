//! The scene command interpreter.
//!
//! Commands are whitespace-separated tokens, so scripts and interactive
//! input share one grammar: a command name followed by its arguments,
//! with line breaks treated like any other whitespace. A malformed
//! command prints an error and its usage line, then the loop continues.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use kdray_math::{Point3, Rgb};
use kdray_scene::{Light, Scene};

use crate::output;

const USAGE: &[(&str, &str)] = &[
    ("newScene", "newScene <width> <height>"),
    ("newLight", "newLight <r> <g> <b> <x> <y> <z>  (intensity, then position)"),
    ("newObject", "newObject <file.ply>"),
    ("load", "load <script file>"),
    ("debug", "debug"),
    ("render", "render <output file (.ppm or .png)>"),
    ("translate", "translate <dx> <dy> <dz>"),
    ("setPosition", "setPosition <x> <y> <z>"),
    ("preview", "preview  (then w/a/s/d/q/e to move, x to exit)"),
    ("help", "help <command>"),
];

/// Whitespace token stream over any buffered reader.
struct Tokens<R> {
    reader: R,
    pending: VecDeque<String>,
}

impl<R: BufRead> Tokens<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
        }
    }

    fn next(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(Some(token));
            }
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_string));
        }
    }
}

/// Interprets scene commands against a single current scene.
///
/// The scene is absent until the first `newScene`; every command that
/// needs one checks and complains instead of panicking.
pub struct Interpreter {
    scene: Option<Scene>,
}

impl Interpreter {
    /// Create an interpreter with no scene.
    pub fn new() -> Self {
        Self { scene: None }
    }

    /// The current scene, if `newScene` has run.
    #[cfg(test)]
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    /// Run every command in a script file.
    pub fn run_file(&mut self, path: &Path) -> Result<()> {
        let file =
            File::open(path).with_context(|| format!("could not open {}", path.display()))?;
        self.run(BufReader::new(file), false)?;
        Ok(())
    }

    /// Run commands from a reader until end of input.
    ///
    /// `interactive` prints a prompt before each command.
    pub fn run<R: BufRead>(&mut self, reader: R, interactive: bool) -> io::Result<()> {
        let mut tokens = Tokens::new(reader);
        if interactive {
            prompt()?;
        }
        while let Some(command) = tokens.next()? {
            self.dispatch(&command, &mut tokens)?;
            if interactive {
                prompt()?;
            }
        }
        Ok(())
    }

    fn dispatch<R: BufRead>(&mut self, command: &str, tokens: &mut Tokens<R>) -> io::Result<()> {
        match command {
            "newScene" => self.new_scene(tokens)?,
            "newLight" => self.new_light(tokens)?,
            "newObject" => self.new_object(tokens)?,
            "load" => self.load(tokens)?,
            "debug" => self.debug(),
            "render" => self.render(tokens)?,
            "translate" => self.translate(tokens)?,
            "setPosition" => self.set_position(tokens)?,
            "preview" => self.preview(tokens)?,
            "help" => help(tokens)?,
            _ => eprintln!("Error: command `{command}` not found, try `help`"),
        }
        Ok(())
    }

    fn new_scene<R: BufRead>(&mut self, tokens: &mut Tokens<R>) -> io::Result<()> {
        let Some([width, height]) = take_numbers::<u32, R, 2>(tokens, "newScene")? else {
            return Ok(());
        };
        match Scene::new(width, height) {
            Ok(scene) => self.scene = Some(scene),
            Err(e) => {
                eprintln!("Error: {e}");
                usage("newScene");
            }
        }
        Ok(())
    }

    fn new_light<R: BufRead>(&mut self, tokens: &mut Tokens<R>) -> io::Result<()> {
        let Some(vals) = take_numbers::<f64, R, 6>(tokens, "newLight")? else {
            return Ok(());
        };
        let Some(scene) = assert_scene(&mut self.scene) else {
            return Ok(());
        };
        let intensity = Rgb::new(vals[0], vals[1], vals[2]);
        let position = Point3::new(vals[3], vals[4], vals[5]);
        match Light::new(position, intensity) {
            Ok(light) => scene.add_light(light),
            Err(e) => {
                eprintln!("Error: {e}");
                usage("newLight");
            }
        }
        Ok(())
    }

    fn new_object<R: BufRead>(&mut self, tokens: &mut Tokens<R>) -> io::Result<()> {
        let Some(filename) = tokens.next()? else {
            usage("newObject");
            return Ok(());
        };
        let Some(scene) = assert_scene(&mut self.scene) else {
            return Ok(());
        };
        match kdray_ply::load(&filename) {
            Ok(mesh) => {
                log::info!("loaded {} ({} triangles)", filename, mesh.len());
                scene.add_object(mesh);
            }
            Err(e) => eprintln!("Error: {e}"),
        }
        Ok(())
    }

    fn load<R: BufRead>(&mut self, tokens: &mut Tokens<R>) -> io::Result<()> {
        let Some(filename) = tokens.next()? else {
            usage("load");
            return Ok(());
        };
        match File::open(&filename) {
            Ok(file) => self.run(BufReader::new(file), false)?,
            Err(e) => eprintln!("Error: could not open {filename}: {e}"),
        }
        Ok(())
    }

    fn debug(&mut self) {
        let Some(scene) = assert_scene(&mut self.scene) else {
            return;
        };
        println!("Num Objects: {}", scene.num_objects());
        println!("Num Lights: {}", scene.num_lights());
        println!("Num Triangles: {}", scene.num_triangles());
        scene.rebuild();
        if let Some(tree) = scene.tree() {
            println!("Tree Nodes: {}", tree.num_nodes());
            println!("Tree Depth: {}", tree.depth());
        }
    }

    fn render<R: BufRead>(&mut self, tokens: &mut Tokens<R>) -> io::Result<()> {
        let Some(filename) = tokens.next()? else {
            usage("render");
            return Ok(());
        };
        let Some(scene) = assert_scene(&mut self.scene) else {
            return Ok(());
        };
        let film = scene.render();
        if let Err(e) = output::save(&film, Path::new(&filename)) {
            eprintln!("Error: {e:#}");
        }
        Ok(())
    }

    fn translate<R: BufRead>(&mut self, tokens: &mut Tokens<R>) -> io::Result<()> {
        let Some([dx, dy, dz]) = take_numbers::<f64, R, 3>(tokens, "translate")? else {
            return Ok(());
        };
        if let Some(scene) = assert_scene(&mut self.scene) {
            scene.camera.translate(dx, dy, dz);
        }
        Ok(())
    }

    fn set_position<R: BufRead>(&mut self, tokens: &mut Tokens<R>) -> io::Result<()> {
        let Some([x, y, z]) = take_numbers::<f64, R, 3>(tokens, "setPosition")? else {
            return Ok(());
        };
        if let Some(scene) = assert_scene(&mut self.scene) {
            scene.camera.set_position(x, y, z);
        }
        Ok(())
    }

    /// Low-resolution silhouette walk: re-renders after every move key.
    fn preview<R: BufRead>(&mut self, tokens: &mut Tokens<R>) -> io::Result<()> {
        let Some(scene) = assert_scene(&mut self.scene) else {
            return Ok(());
        };
        let (width, height) = (scene.camera.width(), scene.camera.height());

        // Terminal cells are taller than wide; halve the pixel aspect and
        // cap the preview at 80 columns.
        scene.camera.set_pixel_aspect(0.5);
        if width > 80 {
            let scaled = ((height as f64) * 80.0 / width as f64).max(1.0) as u32;
            if let Err(e) = scene.camera.set_resolution(80, scaled) {
                eprintln!("Error: {e}");
            }
        }

        print!("{}", scene.render_preview());
        const STEP: f64 = 4.0;
        while let Some(token) = tokens.next()? {
            match token.chars().next() {
                Some('w' | 'W') => scene.camera.translate(0.0, -STEP, 0.0),
                Some('s' | 'S') => scene.camera.translate(0.0, STEP, 0.0),
                Some('a' | 'A') => scene.camera.translate(STEP, 0.0, 0.0),
                Some('d' | 'D') => scene.camera.translate(-STEP, 0.0, 0.0),
                Some('q' | 'Q') => scene.camera.translate(0.0, 0.0, -STEP),
                Some('e' | 'E') => scene.camera.translate(0.0, 0.0, STEP),
                Some('x' | 'X') => break,
                _ => {
                    usage("preview");
                    continue;
                }
            }
            print!("{}", scene.render_preview());
        }

        if let Err(e) = scene.camera.set_resolution(width, height) {
            eprintln!("Error: {e}");
        }
        scene.camera.set_pixel_aspect(1.0);
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn prompt() -> io::Result<()> {
    print!("> ");
    io::stdout().flush()
}

fn assert_scene(scene: &mut Option<Scene>) -> Option<&mut Scene> {
    if scene.is_none() {
        eprintln!("Error: must make a new scene first (newScene <width> <height>)");
    }
    scene.as_mut()
}

fn usage(command: &str) {
    if let Some((_, text)) = USAGE.iter().find(|(name, _)| *name == command) {
        eprintln!("Usage: {text}");
    }
}

fn help<R: BufRead>(tokens: &mut Tokens<R>) -> io::Result<()> {
    match tokens.next()? {
        Some(command) if USAGE.iter().any(|(name, _)| *name == command) => usage(&command),
        Some(command) => eprintln!("Error: command `{command}` not found"),
        None => {
            for (_, text) in USAGE {
                eprintln!("Usage: {text}");
            }
        }
    }
    Ok(())
}

/// Read `N` numeric tokens, printing the command's usage on failure.
fn take_numbers<T, R, const N: usize>(
    tokens: &mut Tokens<R>,
    command: &str,
) -> io::Result<Option<[T; N]>>
where
    T: std::str::FromStr + Copy + Default,
    R: BufRead,
{
    let mut vals = [T::default(); N];
    for val in vals.iter_mut() {
        let Some(token) = tokens.next()? else {
            eprintln!("Error: {command} expects {N} numeric arguments");
            usage(command);
            return Ok(None);
        };
        match token.parse() {
            Ok(parsed) => *val = parsed,
            Err(_) => {
                eprintln!("Error: `{token}` is not a valid number");
                usage(command);
                return Ok(None);
            }
        }
    }
    Ok(Some(vals))
}
