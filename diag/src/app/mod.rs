mod model;
mod report;
mod runner;

use self::model::build_matrix;
use self::report::{report_solution, verify_against_dense};
use self::runner::run_davidson;
use crate::config::{Args, Config};
use crate::io::{setup_output, write_results};
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use std::fs::{self, File};
use tracing::info;

pub struct DiagApplication {
    args: Args,
    config: Config,
}

impl DiagApplication {
    pub fn from_cli() -> Result<Self> {
        let args = Args::parse();
        let config = load_config(&args)?;
        Ok(Self { args, config })
    }

    pub fn run(self) -> Result<()> {
        setup_output(self.args.output.as_ref());
        info!("Configuration loaded from: {}", self.args.config_file);

        let matrix = build_matrix(&self.config.operator, self.args.seed)?;
        let verify = self.args.verify || self.config.is_verify_enabled();
        // the dense check needs the matrix after the solver has consumed its copy
        let reference = verify.then(|| matrix.clone());

        let solution = run_davidson(matrix, &self.args, &self.config)?;
        report_solution(&solution);

        if let Some(reference) = reference {
            let deviation = verify_against_dense(&reference, &solution)?;
            info!("Largest eigenvalue deviation: {:.3e}", deviation);
        }

        if let Some(path) = self.args.results.clone().or(self.config.results_file()) {
            let include_vectors = self.args.eigenvectors || self.config.write_eigenvectors();
            let mut file = File::create(&path)
                .wrap_err_with(|| format!("Unable to create results file: {}", path))?;
            write_results(&mut file, &solution, include_vectors)?;
            info!("Results written to: {}", path);
        }

        Ok(())
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let config_content = fs::read_to_string(&args.config_file)
        .wrap_err_with(|| format!("Unable to read configuration file: {}", args.config_file))?;

    let config = serde_yml::from_str::<Config>(&config_content)
        .wrap_err("Failed to parse configuration file")?
        .with_defaults();

    Ok(config)
}
