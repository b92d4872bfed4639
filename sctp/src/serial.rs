//! Serial number arithmetic (RFC 1982) for TSNs, SSNs and reconfig
//! request sequence numbers, which all wrap their unsigned range.

#[cfg(test)]
#[path = "serial_test.rs"]
mod serial_test;

/// sna32lt: `a < b` with 32-bit wraparound.
pub fn sna32lt(a: u32, b: u32) -> bool {
    (a < b && b - a < 1 << 31) || (a > b && a - b > 1 << 31)
}

pub fn sna32lte(a: u32, b: u32) -> bool {
    a == b || sna32lt(a, b)
}

pub fn sna32gt(a: u32, b: u32) -> bool {
    sna32lt(b, a)
}

pub fn sna32gte(a: u32, b: u32) -> bool {
    a == b || sna32gt(a, b)
}

/// sna16lt: `a < b` with 16-bit wraparound.
pub fn sna16lt(a: u16, b: u16) -> bool {
    (a < b && b - a < 1 << 15) || (a > b && a - b > 1 << 15)
}

pub fn sna16lte(a: u16, b: u16) -> bool {
    a == b || sna16lt(a, b)
}

pub fn sna16gt(a: u16, b: u16) -> bool {
    sna16lt(b, a)
}
