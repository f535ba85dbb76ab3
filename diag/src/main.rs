//! Davidson diagonalization command-line interface
//!
//! Builds a model operator from a YAML configuration and computes its lowest
//! eigenpairs.

mod app;
mod config;
mod io;

use app::DiagApplication;
use color_eyre::eyre::Result;

fn main() -> Result<()> {
    color_eyre::install()?;
    DiagApplication::from_cli()?.run()
}
