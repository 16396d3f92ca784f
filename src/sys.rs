pub mod headless;
#[cfg(feature = "sdl2-sys")]
pub mod sdl2;

use crate::game::{PlayOutcome, PlaySession};

pub trait Sys {
    /// Plays `session` until it ends or the player leaves.
    fn game_loop(&mut self, session: &mut PlaySession) -> anyhow::Result<PlayOutcome>;
}
