use std::path::Path;

use anyhow::{Context, Result};
use clap::{App, Arg, ArgMatches};
use log::{error, info};

mod browser;
mod clock;
mod error;
mod fft;
mod game;
mod gfx;
mod input;
mod module;
mod rng;
mod sys;
mod tables;
mod track;

use browser::DirList;
use clock::StepCounter;
use game::PlaySession;
use rng::{Lfsr, Random4};
use sys::Sys;

fn print_dir_list(list: &DirList) {
    println!("{}:", list.path().display());
    for entry in list.entries() {
        let kind = if entry.is_parent() {
            "parent"
        } else if entry.is_dir {
            "dir"
        } else {
            "mod"
        };
        println!("  {:<6} {}", kind, list.open(entry).display());
    }
}

fn new_sys(matches: &ArgMatches) -> Result<Box<dyn Sys>> {
    if !matches.is_present("headless") {
        #[cfg(feature = "sdl2-sys")]
        return sys::sdl2::new(matches).context("cannot open the game window");
        #[cfg(not(feature = "sdl2-sys"))]
        log::warn!("built without SDL2 support, running headless");
    }
    sys::headless::new(matches)
}

fn main() -> Result<()> {
    env_logger::init();

    let matches = App::new("MOD Runner")
        .version("0.1")
        .arg(
            Arg::with_name("path")
                .help("Module to play, or directory to list")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("seed")
                .short("s")
                .long("seed")
                .help("Seed of the lane generator (0..65535), taken from the clock by default")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("headless")
                .long("headless")
                .help("Play without a window, as fast as possible"),
        )
        .arg(
            Arg::with_name("frames")
                .short("f")
                .long("frames")
                .help("Stop a headless game after this many frames")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("dump")
                .short("d")
                .long("dump")
                .help("Write the last headless frame to this PNG file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("autoplay")
                .short("a")
                .long("autoplay")
                .help("Let the ball steer itself"),
        )
        .get_matches();

    let path = Path::new(matches.value_of("path").unwrap_or("."));
    if path.is_dir() {
        print_dir_list(&DirList::read_or_root(path));
        return Ok(());
    }

    let lfsr = match matches.value_of("seed") {
        Some(seed) => Lfsr::new(
            seed.parse::<u16>()
                .context("expected integer for seed option")?,
        ),
        None => Lfsr::from_clock(),
    };
    let mut rng = Random4::new(lfsr);

    let mut session = match PlaySession::load(path, &mut rng, StepCounter::new()) {
        Ok(session) => session,
        Err(e) => {
            // Back to the listing of the module's directory.
            error!("{}: {}", path.display(), e);
            eprintln!("{}", e.user_message());
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            print_dir_list(&DirList::read_or_root(dir));
            return Ok(());
        }
    };

    let mut sys = new_sys(&matches)?;
    let outcome = sys.game_loop(&mut session)?;

    info!("{:?}", outcome);
    println!(
        "{}: {}.{}% ({} of {} blocks)",
        session.title(),
        session.score_frac() / 10,
        session.score_frac() % 10,
        session.score(),
        session.track().num_blocks()
    );

    Ok(())
}
