//! Binary entry point for the distributed CPU Gaussian-splat renderer,
//! grounded on `examples/ArthurBrussee-brush/crates/brush-app/src/bin.rs`'s
//! `env_logger` + `anyhow` + `clap::Parser` arrangement (simplified to a
//! synchronous batch run -- this renderer has no GPU backend or UI to
//! initialize, so the teacher's tokio runtime and egui wiring are dropped).

use std::fs::File;
use std::thread;

use anyhow::Context;
use clap::Parser;
use splat_cli::Cli;
use splat_distributed::ChannelTransport;
use splat_io::{GaussianLoader, PlyVertexSource, VertexSource};
use splat_render::Camera;

fn main() -> anyhow::Result<()> {
    env_logger::builder().target(env_logger::Target::Stdout).init();

    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let _span = tracing::trace_span!("splat_cli_run", input = %cli.input.display()).entered();

    let source = PlyVertexSource::load(&cli.input)
        .with_context(|| format!("failed to read vertex stream from {}", cli.input.display()))?;
    log::info!("loaded {} vertices from {}", source.count(), cli.input.display());

    let loader = GaussianLoader::new(cli.render.sh_degree);
    let store = loader.load(&source).context("failed to build primitive store from vertex stream")?;

    let mut camera = Camera::new(cli.render.width, cli.render.height, cli.render.fov_x);
    camera.apply_script(&cli.camera_script());

    let world_size = cli.distributed.world_size.max(1);
    let background = cli.render.background.0;

    log::info!(
        "rendering {} primitives at {}x{} across {} worker(s)",
        store.len(),
        cli.render.width,
        cli.render.height,
        world_size
    );

    let framebuffer = if world_size == 1 {
        let transports = ChannelTransport::mesh(1);
        splat_distributed::run_frame(&transports[0], &store, &camera, background)
            .context("single-worker render failed")?
            .context("rank 0 did not produce a framebuffer")?
    } else {
        let transports = ChannelTransport::mesh(world_size);
        let handles: Vec<_> = transports
            .into_iter()
            .map(|transport| {
                let store = store.clone();
                let camera = camera;
                thread::spawn(move || splat_distributed::run_frame(&transport, &store, &camera, background))
            })
            .collect();

        let mut rank_zero = None;
        for handle in handles {
            let result = handle.join().map_err(|_| anyhow::anyhow!("a worker thread panicked"))?;
            if let Some(fb) = result.context("distributed render failed")? {
                rank_zero = Some(fb);
            }
        }
        rank_zero.context("rank 0 did not produce a framebuffer")?
    };

    let output_file = File::create(&cli.output)
        .with_context(|| format!("failed to create output file {}", cli.output.display()))?;
    framebuffer
        .write_raw(output_file)
        .with_context(|| format!("failed to write output image to {}", cli.output.display()))?;

    log::info!("wrote output image to {}", cli.output.display());
    Ok(())
}
