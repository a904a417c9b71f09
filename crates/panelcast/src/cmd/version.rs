use clap::Args;

use crate::exit::{CliResult, SUCCESS};

#[derive(Args, Debug, Default)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("panelcast {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: panelcast");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "build_target: {}",
        option_env!("PANELCAST_BUILD_TARGET").unwrap_or("unknown")
    );

    Ok(SUCCESS)
}
