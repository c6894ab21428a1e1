/// A big-endian `u16` as it appears on the wire.
///
/// Has an alignment of 1, so it can be placed in `#[repr(C, packed)]` structures that are read
/// straight out of a datagram.
#[derive(Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
pub(crate) struct U16([u8; 2]);

impl U16 {
    #[inline]
    pub(crate) fn get(self) -> u16 {
        u16::from_be_bytes(self.0)
    }
}

impl From<u16> for U16 {
    #[inline]
    fn from(value: u16) -> Self {
        Self(value.to_be_bytes())
    }
}
