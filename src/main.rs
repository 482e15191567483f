//! Synthetic inversion: recover a random force from its own displacements.
//!
//! cargo run --release -- [config.json]
//!
//! Without argument the default configuration is used, see
//! [`elasinv::config::InversionConfig`]. Verbosity is set with
//! `RUST_LOG`, e.g.
//! ```text
//! RUST_LOG=info cargo run --release
//! ```
use elasinv::comm::SerialComm;
use elasinv::config::InversionConfig;
use elasinv::functions::{add_noise, norm_l2, random_vector, relative_error};
use elasinv::inverse::{InverseContext, InversionDriver};
use elasinv::projector::FieldProjector;
use elasinv::Result;

fn run(cfg: &InversionConfig) -> Result<()> {
    let layout = cfg.build_layout()?;
    let stepper = cfg.build_stepper(layout.clone())?;
    log::info!(
        "dt = {}, critical dt = {:.4e}",
        cfg.time.step,
        stepper.critical_timestep()
    );

    // Observations from the same model (inverse crime)
    let (truth, observations) = {
        let projector = FieldProjector::new(
            cfg.build_spatial()?,
            cfg.build_temporal()?,
            &layout,
            cfg.time,
            cfg.dof,
            Box::new(SerialComm),
        )?;
        let ctx = InverseContext::new(projector, Box::new(stepper.clone()), 0.)?;
        let truth = random_vector(ctx.num_params(), 1.);
        let mut observations = ctx.forward(&truth)?;
        add_noise(&mut observations, cfg.noise);
        #[cfg(feature = "hdf5")]
        if let Some(filename) = &cfg.output {
            observations.write(filename, "observations")?;
            elasinv::io::write_control(filename, "truth", &truth)?;
        }
        (truth, observations)
    };

    let mut driver = InversionDriver::new(Box::new(stepper));
    driver.set_basis(cfg.build_spatial()?, cfg.build_temporal()?)?;
    driver.set_regularization(cfg.beta)?;
    driver.set_solver_config(cfg.cg)?;
    driver.set_observations(observations)?;
    if let Some(mask) = cfg.build_mask(&layout) {
        driver.set_observation_mask(mask)?;
    }
    driver.init()?;
    let report = driver.solve()?;
    let control = driver.finish()?;

    log::info!(
        "cg converged: {} ({} hessian applications)",
        report.cg.converged,
        report.hessian_applications
    );
    log::info!(
        "|truth| = {:.6e}, |control| = {:.6e}, relative error = {:.6e}",
        norm_l2(truth.iter()),
        norm_l2(control.iter()),
        relative_error(&control, &truth)
    );
    #[cfg(feature = "hdf5")]
    if let Some(filename) = &cfg.output {
        elasinv::io::write_control(filename, "control", &control)?;
        log::info!("written {}", filename);
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cfg = match std::env::args().nth(1) {
        Some(path) => InversionConfig::from_file(&path),
        None => {
            let cfg = InversionConfig::default();
            cfg.validate().map(|_| cfg)
        }
    };
    let result = cfg.and_then(|cfg| run(&cfg));
    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
