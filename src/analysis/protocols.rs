use std::borrow::Cow;

pub const IPPROTO_ICMP: u8 = 1;
pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;

/// Display name for an IANA protocol number.
pub fn protocol_name(number: u8) -> Cow<'static, str> {
    match number {
        IPPROTO_ICMP => Cow::Borrowed("ICMP"),
        IPPROTO_TCP => Cow::Borrowed("TCP"),
        IPPROTO_UDP => Cow::Borrowed("UDP"),
        other => Cow::Owned(format!("Unknown({})", other)),
    }
}
