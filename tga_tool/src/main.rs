mod filemanager;

use log::error;
use std::path::Path;
use std::process::ExitCode;

const USAGE: &str = "usage:
  tga-tool info <file.tga>
  tga-tool normalize <in.tga> <out.tga>
  tga-tool canvas <out.tga> <width> <height>";

fn main() -> ExitCode {
    lib_tga::init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let result = match args.as_slice() {
        ["info", file] => filemanager::print_info(Path::new(file)),
        ["normalize", input, output] => {
            filemanager::normalize(Path::new(input), Path::new(output))
        }
        ["canvas", output, width, height] => {
            filemanager::write_canvas(Path::new(output), width, height)
        }
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
