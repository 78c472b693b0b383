//! Create a TUN or TAP device and print the size of everything read from it.
//!
//! With `--accessor`, reads go through a cancellable accessor and Ctrl-C stops it cleanly.
//! Creating a device usually needs `CAP_NET_ADMIN`.

#[cfg(target_os = "linux")]
mod app {
    use clap::Parser;
    use std::io::{self, Read};
    use std::sync::mpsc::{self, RecvTimeoutError};
    use std::thread;
    use taptun::{is_stopped, Interface};
    use tracing::info;
    use tracing_subscriber::EnvFilter;

    #[derive(Parser)]
    #[command(name = "taptuntest")]
    #[command(about = "Read from a freshly created TUN/TAP device")]
    struct Cli {
        /// Create a TAP device instead of a TUN device
        #[arg(long)]
        tap: bool,
        /// Read through a cancellable accessor, stopped by Ctrl-C
        #[arg(long)]
        accessor: bool,
        /// Interface name; `%d` is replaced by the kernel with a free index
        #[arg(long)]
        name: Option<String>,
    }

    pub fn run() -> io::Result<()> {
        let cli = Cli::parse();

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taptun=debug"));
        tracing_subscriber::fmt().with_env_filter(filter).init();

        let iface = if cli.tap {
            Interface::new_tap(cli.name.as_deref().unwrap_or("tap%d"))?
        } else {
            Interface::new_tun(cli.name.as_deref().unwrap_or("tun%d"))?
        };
        let name = iface.name().to_owned();
        println!("Created interface {}", name);

        let mut buf = vec![0u8; 65536];
        if !cli.accessor {
            loop {
                let n = (&iface).read(&mut buf)?;
                println!("Read {} bytes from interface {}", n, name);
            }
        }

        let accessor = iface.accessor()?;
        let (tx, rx) = mpsc::channel();
        ctrlc::set_handler(move || {
            let _ = tx.send(());
        })
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        let result = thread::scope(|s| {
            let reader = s.spawn(|| -> io::Result<()> {
                loop {
                    let n = accessor.read(&mut buf)?;
                    println!("Read {} bytes from accessor for {}", n, name);
                }
            });
            let acc = &accessor;
            s.spawn(move || loop {
                match rx.recv_timeout(acc.config().poll_timeout) {
                    Ok(()) => {
                        info!("interrupted, stopping accessor");
                        acc.stop();
                        break;
                    }
                    Err(RecvTimeoutError::Timeout) if !acc.is_stopped() => {}
                    Err(_) => break,
                }
            });
            let result = reader.join().unwrap_or_else(|_| {
                Err(io::Error::new(io::ErrorKind::Other, "reader thread panicked"))
            });
            // lets the signal thread exit if the reader ended by itself
            accessor.stop();
            result
        });
        drop(accessor);
        iface.close()?;
        match result {
            Err(e) if is_stopped(&e) => Ok(()),
            r => r,
        }
    }
}

#[cfg(target_os = "linux")]
fn main() {
    if let Err(e) = app::run() {
        eprintln!("Error testing tun/tap device: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(target_os = "linux"))]
fn main() {
    eprintln!("taptuntest creates devices, which is only supported on Linux");
    std::process::exit(1);
}
