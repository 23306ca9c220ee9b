use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use anyhow::Result;

pub fn parse_addr(address: &str, port: u16) -> Result<SocketAddr> {
    let addr = if address.is_empty() {
        IpAddr::V6(Ipv6Addr::UNSPECIFIED)
    } else {
        IpAddr::from_str(address)?
    };
    Ok(SocketAddr::from((addr, port)))
}
