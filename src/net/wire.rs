//! Fixed-size value encodings
//!
//! Values sent with [`Transfer::send_value`](super::Transfer::send_value) are
//! encoded explicitly rather than by copying their in-memory layout: integers
//! and floats travel big-endian (network order), byte arrays verbatim.

use super::{InetAddress, InetHost};

/// A value with a fixed-width wire encoding.
pub trait WireValue: Sized {
    /// Encoded size in bytes
    const SIZE: usize;

    /// Write the encoding into `out`, which is exactly `SIZE` bytes long
    fn encode(&self, out: &mut [u8]);

    /// Read a value from `bytes`, which is exactly `SIZE` bytes long
    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! impl_wire_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl WireValue for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn encode(&self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_be_bytes());
                }

                fn decode(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_be_bytes(raw)
                }
            }
        )*
    };
}

impl_wire_value!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64);

impl<const N: usize> WireValue for [u8; N] {
    const SIZE: usize = N;

    fn encode(&self, out: &mut [u8]) {
        out.copy_from_slice(self);
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut raw = [0u8; N];
        raw.copy_from_slice(bytes);
        raw
    }
}

/// Four octets, most significant first
impl WireValue for InetAddress {
    const SIZE: usize = 4;

    fn encode(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.octets());
    }

    fn decode(bytes: &[u8]) -> Self {
        InetAddress::from_octets(bytes[0], bytes[1], bytes[2], bytes[3])
    }
}

/// Address octets followed by the big-endian port; the family is implied.
impl WireValue for InetHost {
    const SIZE: usize = 6;

    fn encode(&self, out: &mut [u8]) {
        self.address().encode(&mut out[..4]);
        self.port().encode(&mut out[4..]);
    }

    fn decode(bytes: &[u8]) -> Self {
        InetHost::with_address(InetAddress::decode(&bytes[..4]), u16::decode(&bytes[4..]))
    }
}

/// Encode `value` into a freshly allocated `SIZE`-byte buffer
pub fn to_bytes<T: WireValue>(value: &T) -> Vec<u8> {
    let mut buf = vec![0u8; T::SIZE];
    value.encode(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_is_big_endian() {
        assert_eq!(to_bytes(&0x0102_0304u32), vec![1, 2, 3, 4]);
        assert_eq!(to_bytes(&-2i16), vec![0xff, 0xfe]);
        assert_eq!(u32::decode(&[0, 0, 0x11, 0xcb]), 4555);
    }

    #[test]
    fn test_float() {
        let bytes = to_bytes(&1.5f64);
        assert_eq!(bytes.len(), 8);
        assert_eq!(f64::decode(&bytes), 1.5);
    }

    #[test]
    fn test_byte_array() {
        let value = *b"ping";
        assert_eq!(<[u8; 4]>::SIZE, 4);
        assert_eq!(<[u8; 4]>::decode(&to_bytes(&value)), value);
    }

    #[test]
    fn test_host_encoding() {
        let host = InetHost::with_address(InetAddress::from_octets(10, 0, 0, 7), 4555);
        let bytes = to_bytes(&host);
        assert_eq!(bytes, vec![10, 0, 0, 7, 0x11, 0xcb]);
        assert_eq!(InetHost::decode(&bytes), host);
    }
}
