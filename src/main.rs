use clap::Parser;
use log::error;

mod cli;
mod handler;

use cli::Cli;
use handler::Handler;

fn run(args: &Cli) -> nitf_imhdr::CodecResult<()> {
    let handler = Handler::try_from(args)?;
    let segments = handler.run()?;
    println!("{}", serde_json::to_string_pretty(&segments)?);
    log::info!(
        "Finished reading {} subheader(s) from {:?}",
        segments.len(),
        handler.input
    );
    Ok(())
}

fn main() {
    let args = Cli::parse();
    simple_logger::SimpleLogger::new()
        .with_level(args.level.into())
        .init()
        .unwrap();

    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(1);
    }
}
