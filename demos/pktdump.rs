use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::UNIX_EPOCH;
use taptun::ethernet::{mac_destination, mac_ethertype, mac_payload, mac_source, mac_tagging};
use taptun::ipv4::{ipv4_destination, ipv4_payload, ipv4_protocol, ipv4_source, is_ipv4};
use taptun::pcap::{PcapPacket, PcapReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pktdump")]
#[command(about = "Print the Ethernet and IPv4 headers of every packet in a pcap file")]
struct Cli {
    /// Capture file, legacy pcap format with Ethernet link type
    file: PathBuf,
    /// Do not print packet data
    #[arg(short, long)]
    quiet: bool,
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

fn print_packet(pkt: &PcapPacket, quiet: bool) -> Result<(), Box<dyn Error>> {
    let ts = pkt.timestamp.duration_since(UNIX_EPOCH)?;
    print!(
        "{}.{:06} - {} bytes",
        ts.as_secs(),
        ts.subsec_micros(),
        pkt.data.len()
    );
    if pkt.truncated {
        print!(" (truncated)");
    }
    println!();

    let frame = &pkt.data[..];
    println!("Layer 2");
    println!("    Src  MAC: {}", mac_source(frame)?);
    println!("    Dest MAC: {}", mac_destination(frame)?);
    println!("    Tagging:  {:?}", mac_tagging(frame)?);
    println!("    Type:     {}", mac_ethertype(frame)?);
    let payload = mac_payload(frame)?;
    if is_ipv4(payload) {
        println!("Layer 3 - IPv4");
        println!("    Src  IP: {}", ipv4_source(payload)?);
        println!("    Dest IP: {}", ipv4_destination(payload)?);
        println!("    Proto:   {}", ipv4_protocol(payload)?);
        if !quiet {
            println!("Data\n    {}", hex(ipv4_payload(payload)?));
        }
    } else if !quiet {
        println!("Payload\n    {}", hex(payload));
    }
    println!();
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let reader = match PcapReader::open(&cli.file) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: could not read file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for pkt in reader {
        let pkt = match pkt {
            Ok(pkt) => pkt,
            Err(e) => {
                eprintln!("error: could not read packet: {}", e);
                return ExitCode::FAILURE;
            }
        };
        // a short frame only ends the dump of that packet
        if let Err(e) = print_packet(&pkt, cli.quiet) {
            println!("    (malformed: {})\n", e);
        }
    }
    ExitCode::SUCCESS
}
