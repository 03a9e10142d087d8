use clap::Parser;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

use dohrelay::config::{DEFAULT_BOOTSTRAP_NAMESERVERS, DEFAULT_ENDPOINT, RelayConfig};
use dohrelay::proxy::{self, ProxyConfig};

#[derive(Parser)]
#[command(name = "dohrelay")]
#[command(about = "Relay classic DNS queries to a DNS-over-HTTPS JSON API", long_about = None)]
struct Args {
    /// Port to bind to
    #[arg(short, long, default_value = "53")]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Resolver HTTPS address
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    api: Url,

    /// Disable EDNS client subnet
    #[arg(long)]
    noedns: bool,

    /// Disable DNSSEC validation performed by upstream API
    #[arg(long)]
    cd: bool,

    /// Bootstrap nameserver (ip:port) used to resolve the API host; repeatable
    #[arg(long = "bootstrap", value_name = "ADDR", default_values = DEFAULT_BOOTSTRAP_NAMESERVERS)]
    bootstrap: Vec<SocketAddr>,

    /// HTTPS request timeout in seconds
    #[arg(long, default_value = "5")]
    timeout: u64,

    /// Per-nameserver bootstrap timeout in seconds
    #[arg(long, default_value = "2")]
    bootstrap_timeout: u64,

    /// Print info on each request
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = ProxyConfig {
        bind_addr: SocketAddr::new(args.bind, args.port),
        relay: RelayConfig {
            endpoint: args.api,
            edns_disable: args.noedns,
            checking_disabled: args.cd,
            bootstrap_nameservers: args.bootstrap,
            upstream_timeout: Duration::from_secs(args.timeout),
            bootstrap_timeout: Duration::from_secs(args.bootstrap_timeout),
        },
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(proxy::run(config))
}
