use trvc::RunConfig;

fn main() {
    env_logger::init();

    let mut rom_path = None;
    let mut step_mode = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--step" | "-s" => step_mode = true,
            _ => rom_path = Some(arg),
        }
    }

    let Some(rom_path) = rom_path else {
        eprintln!("usage: trvc [--step] <rom.bin>");
        std::process::exit(1);
    };

    let config = RunConfig::builder()
        .rom_path(rom_path)
        .step_mode(step_mode)
        .build();

    if let Err(err) = trvc::run(config) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
