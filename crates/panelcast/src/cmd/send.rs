use std::io::Read;

use clap::Args;
use tracing::info;

use panelcast_text::{encode_payload, sanitize};

use crate::cmd::{PanelArgs, TransportArgs};
use crate::exit::{delivery_error, io_error, CliResult, SUCCESS};

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub transport: TransportArgs,

    #[command(flatten)]
    pub panel: PanelArgs,

    /// Text to deliver. Read from stdin when omitted.
    pub text: Option<String>,
}

pub fn run(args: SendArgs) -> CliResult<i32> {
    let constraints = args.panel.constraints()?;
    let raw = match args.text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|err| io_error("reading stdin", err))?;
            buf
        }
    };

    let lines = sanitize(&raw, &constraints);
    let payload = encode_payload(&lines);
    info!(lines = lines.len(), bytes = payload.len(), "payload shaped");

    let mut session = args.transport.open()?;
    let ack = session
        .deliver(&payload)
        .map_err(|err| delivery_error("delivery failed", err))?;
    session.close();

    println!("{ack}");
    Ok(SUCCESS)
}
