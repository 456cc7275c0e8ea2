use std::process::ExitCode;

fn main() -> ExitCode {
    celestial_lens::run()
}
