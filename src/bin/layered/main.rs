//! layered - terminal front end for the layered synthesis core
//!
//! Run with: cargo run --bin layered
//!
//! Play notes from the computer keyboard, switch engines and modes, and
//! watch what each engine is doing.

mod app;
mod ui;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    app::run()
}
