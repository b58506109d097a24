#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod render;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use structopt::StructOpt;

use model::{Bounds, Model, Viewport};

// Playback advances ten recorded frames per second, like the source data
const FRAME_DELAY: Duration = Duration::from_millis(100);

#[derive(StructOpt)]
#[structopt(name = "viewer", about = "Interactive viewer for recorded traffic interactions")]
struct Args {
    /// Root directory of the interaction dataset
    #[structopt(long, parse(from_os_str))]
    root_dir: Option<PathBuf>,
    /// Which recording session to open
    #[structopt(long, default_value = "DR_CHN_Merging_ZS")]
    dataset: String,
    /// Explicit path to a lanelet OSM XML map, instead of --root-dir
    #[structopt(long, parse(from_os_str))]
    map: Option<PathBuf>,
    /// Explicit trackfile paths, merged in order
    #[structopt(long, parse(from_os_str))]
    tracks: Vec<PathBuf>,
}

impl Args {
    fn load(self) -> Result<Model> {
        if let Some(map) = self.map {
            return Model::load(&map, &self.tracks);
        }
        if let Some(root_dir) = self.root_dir {
            return Model::load_dataset(&root_dir, &self.dataset);
        }
        bail!("specify either --root-dir or --map/--tracks");
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::from_args();
    let model = args.load()?;
    // Surface the empty-map error before a window opens
    let bounds = model.map.bounds()?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 600.0])
            .with_title("Interaction Viewer"),
        ..Default::default()
    };
    eframe::run_native(
        "Interaction Viewer",
        options,
        Box::new(move |_cc| Ok(Box::new(ViewerApp::new(model, bounds)))),
    )
    .map_err(|err| anyhow!("eframe failed: {err}"))
}

struct ViewerApp {
    model: Model,
    bounds: Bounds,
    // Lane surfaces never change after load, so triangulate once
    lane_surfaces: Vec<Vec<[glam::DVec2; 3]>>,
    current: usize,
    playing: bool,
    last_step: Instant,
}

impl ViewerApp {
    fn new(model: Model, bounds: Bounds) -> Self {
        let lane_surfaces = model
            .map
            .lanes
            .values()
            .map(|lane| model::lane_triangles(&model.map, lane))
            .collect();
        info!("ready to play {} frames", model.tracks.len());
        Self {
            model,
            bounds,
            lane_surfaces,
            current: 0,
            playing: true,
            last_step: Instant::now(),
        }
    }

    fn step(&mut self, delta: isize) {
        let len = self.model.tracks.len();
        if len == 0 {
            return;
        }
        self.current = (self.current as isize + delta).rem_euclid(len as isize) as usize;
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        ctx.input(|input| {
            if input.key_pressed(egui::Key::Space) {
                self.playing = !self.playing;
            }
            if input.key_pressed(egui::Key::ArrowRight) {
                self.playing = false;
                self.step(1);
            }
            if input.key_pressed(egui::Key::ArrowLeft) {
                self.playing = false;
                self.step(-1);
            }
        });
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keys(ctx);
        let max_index = self.model.tracks.len().saturating_sub(1);

        egui::TopBottomPanel::bottom("playback").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let label = if self.playing { "Pause" } else { "Play" };
                if ui.button(label).clicked() {
                    self.playing = !self.playing;
                }
                if ui.button("<").clicked() {
                    self.playing = false;
                    self.step(-1);
                }
                if ui.button(">").clicked() {
                    self.playing = false;
                    self.step(1);
                }
                ui.add(egui::Slider::new(&mut self.current, 0..=max_index));
                ui.label(format!("frame {} / {}", self.current, max_index));
            });
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let (response, painter) =
                    ui.allocate_painter(ui.available_size(), egui::Sense::hover());
                let rect = response.rect;
                let viewport = Viewport::from_bounds(
                    f64::from(rect.width()),
                    f64::from(rect.height()),
                    self.bounds,
                );

                render::draw_map(
                    &painter,
                    rect,
                    &viewport,
                    &self.model.map,
                    &self.lane_surfaces,
                );
                if let Some(frame) = self.model.tracks.get(self.current) {
                    render::draw_frame(&painter, rect, &viewport, frame);
                }
            });

        if self.playing && !self.model.tracks.is_empty() {
            if self.last_step.elapsed() >= FRAME_DELAY {
                self.step(1);
                self.last_step = Instant::now();
            }
            ctx.request_repaint_after(FRAME_DELAY);
        }
    }
}
