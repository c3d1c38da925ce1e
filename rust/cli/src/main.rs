use hashvec_error::HashvecError;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = std::env::args().collect();
    match hashvec_cli::hashvec_cli(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {} ({})", err, err.code());
            ExitCode::FAILURE
        }
    }
}
