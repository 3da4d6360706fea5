use std::process::ExitCode;

fn main() -> ExitCode {
    let env = dnssign::env::RealEnv;
    ExitCode::from(dnssign::run(env))
}
