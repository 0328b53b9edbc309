mod cli;
mod headless;
mod trace;
mod window;

use anyhow::Result;
use ember_engine::device::GpuInit;
use ember_engine::logging::{init_logging, LoggingConfig};

use cli::Mode;

fn main() -> Result<()> {
    let args = cli::parse();

    init_logging(LoggingConfig {
        env_filter: args.log.clone(),
        ..Default::default()
    });

    let frame = args.frame();
    match args.mode {
        Mode::Window => window::run(frame, (args.width, args.height), GpuInit::from_env()),
        Mode::Headless => headless::render_png(&frame, (args.width, args.height), &args.output),
        Mode::Trace => trace::dry_run(&frame),
    }
}
