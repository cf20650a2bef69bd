use env_logger::Env;
use log::error;

use std::process;

use plate_recognition::{ cli, Lpr, PlateRecord };
use plate_recognition::cli::Invocation;
use plate_recognition::ocr::TesseractEngine;


fn main() {
    let args = match cli::parse_args(std::env::args_os()) {
        Invocation::Run(args) => args,
        Invocation::Builtin(e) => e.exit(),
        Invocation::Usage => emit_and_exit(&cli::usage(), cli::EXIT_BAD_INPUT),
    };

    let filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(filter)).init();

    let config = match args.pipeline_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            emit_and_exit(&PlateRecord::unexpected(e), cli::EXIT_BAD_INPUT)
        }
    };

    let (record, code) = cli::run(&args.input, || {
        let engine = TesseractEngine::new(&config.ocr)?;
        Lpr::new(engine, config.clone())
    });
    emit_and_exit(&record, code)
}

fn emit_and_exit(record: &PlateRecord, code: i32) -> ! {
    match cli::render(record) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("could not serialize result: {}", e),
    }
    process::exit(code)
}
