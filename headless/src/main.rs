#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod gif;
mod web;

use std::path::PathBuf;

use anyhow::Result;
use structopt::StructOpt;

use model::Model;

#[derive(StructOpt)]
#[structopt(
    name = "headless",
    about = "Non-interactive renderers for recorded traffic interactions"
)]
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

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Render the recording to an animated GIF
    Gif {
        #[structopt(long, default_value = "out.gif", parse(from_os_str))]
        out: PathBuf,
        #[structopt(long, default_value = "800")]
        width: i32,
        #[structopt(long, default_value = "600")]
        height: i32,
        /// Only render every Nth frame
        #[structopt(long, default_value = "1")]
        step: usize,
    },
    /// Serve the recording to web clients over a WebSocket
    Serve {
        #[structopt(long, default_value = "8765")]
        port: u16,
    },
}

impl Args {
    fn load(&self) -> Result<Model> {
        if let Some(ref map) = self.map {
            return Model::load(map, &self.tracks);
        }
        if let Some(ref root_dir) = self.root_dir {
            return Model::load_dataset(root_dir, &self.dataset);
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

    match args.cmd {
        Command::Gif {
            ref out,
            width,
            height,
            step,
        } => {
            if step == 0 {
                bail!("--step must be at least 1");
            }
            gif::write_gif(&model, out, width, height, step)?;
            info!("wrote {}", out.display());
        }
        Command::Serve { port } => {
            web::serve(&model, port)?;
        }
    }
    Ok(())
}
