use std::net::SocketAddrV4;

pub(crate) const VER: u8 = 5;
pub(crate) const NO_AUTH: u8 = 0;

pub(crate) const CMD_CONNECT: u8 = 1;

pub(crate) const ATYP_IPV4: u8 = 1;

pub(crate) const REP_SUCCESS: u8 = 0;

pub const NEGOTIATION_REPLY_LEN: usize = 2;
pub const CONNECT_REPLY_LEN: usize = 10;

pub(crate) const NEGOTIATION_REQUEST: [u8; 3] = [VER, 1, NO_AUTH];

pub(crate) fn connect_request(address: SocketAddrV4) -> [u8; 10] {
    let mut request = [0u8; 10];
    request[0] = VER;
    request[1] = CMD_CONNECT;
    request[2] = 0;
    request[3] = ATYP_IPV4;
    request[4..8].copy_from_slice(&address.ip().octets());
    request[8..10].copy_from_slice(&address.port().to_be_bytes());
    request
}

/// Human readable meaning of a CONNECT reply field (RFC 1928 section 6).
pub fn reply_message(status: u8) -> &'static str {
    match status {
        REP_SUCCESS => "succeeded",
        1 => "general SOCKS server failure",
        2 => "connection not allowed by ruleset",
        3 => "network unreachable",
        4 => "host unreachable",
        5 => "connection refused",
        6 => "TTL expired",
        7 => "command not supported",
        8 => "address type not supported",
        _ => "unassigned reply code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn connect_request_layout() {
        let addr = SocketAddrV4::new(Ipv4Addr::new(93, 184, 216, 34), 443);
        assert_eq!(
            connect_request(addr),
            [0x05, 0x01, 0x00, 0x01, 93, 184, 216, 34, 0x01, 0xbb]
        );
    }

    #[test]
    fn negotiation_request_offers_only_no_auth() {
        assert_eq!(NEGOTIATION_REQUEST, [0x05, 0x01, 0x00]);
    }

    #[test]
    fn reply_messages() {
        assert_eq!(reply_message(0), "succeeded");
        assert_eq!(reply_message(5), "connection refused");
        assert_eq!(reply_message(0x42), "unassigned reply code");
    }
}
