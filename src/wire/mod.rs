//! Primitives to encode and decode the SSH wire types described in
//! [RFC 4251 § 5](https://datatracker.ietf.org/doc/html/rfc4251#section-5).

use zeroize::Zeroize;

use crate::{Error, Result};

mod id;
pub use id::Id;

/// A multi-precision integer in the SSH wire representation:
/// two's-complement big-endian bytes, most significant first,
/// without the `uint32` length prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MpInt(Vec<u8>);

impl Zeroize for MpInt {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl MpInt {
    /// Create an [`MpInt`] from the big-endian magnitude of a
    /// non-negative integer, stripping redundant leading zeroes and
    /// prepending a `0x00` octet where the sign bit would be set.
    pub fn positive(magnitude: &[u8]) -> Self {
        let magnitude = {
            let first = magnitude
                .iter()
                .position(|&byte| byte != 0)
                .unwrap_or(magnitude.len());

            &magnitude[first..]
        };

        match magnitude.first() {
            Some(&byte) if byte & 0x80 != 0 => {
                let mut bytes = Vec::with_capacity(magnitude.len() + 1);
                bytes.push(0);
                bytes.extend_from_slice(magnitude);

                Self(bytes)
            }
            _ => Self(magnitude.to_vec()),
        }
    }

    /// Whether the wire representation encodes a negative integer.
    pub fn is_negative(&self) -> bool {
        matches!(self.0.first(), Some(&byte) if byte & 0x80 != 0)
    }

    /// The raw two's-complement bytes, without the length prefix.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The length of the wire representation, without the length prefix.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this encodes the integer `0`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for MpInt {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for MpInt {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// A `name-list` of comma-separated ASCII names, order being
/// the sender's order of preference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameList(Vec<String>);

impl NameList {
    /// Collect a [`NameList`] from anything yielding names.
    pub fn new<I, T>(names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self(
            names
                .into_iter()
                .map(|name| name.as_ref().to_string())
                .collect(),
        )
    }

    /// The first name in `self` that is also present in `other`,
    /// which is the negociation rule of
    /// [RFC 4253 § 7.1](https://datatracker.ietf.org/doc/html/rfc4253#section-7.1)
    /// when `self` is the client's list.
    pub fn preferred_in(&self, other: &Self) -> Option<&str> {
        self.0
            .iter()
            .find(|name| other.0.iter().any(|entry| entry == *name))
            .map(String::as_str)
    }

    /// Whether the list contains `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|entry| entry == name)
    }

    /// The first name of the list, if any.
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Whether the list holds no names.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the names in the list.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl std::fmt::Display for NameList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

/// A growable byte buffer with a read cursor, implementing typed
/// accessors for the SSH wire types.
///
/// Typed writes append at the end of the buffer, typed reads consume
/// from the read cursor; the read cursor never passes the end.
/// [`Buffer::clear`] and `drop` overwrite the backing storage, so
/// buffers holding key material do not outlive their use.
#[derive(Debug, Default, Clone)]
pub struct Buffer {
    data: Vec<u8>,
    rpos: usize,
}

impl Buffer {
    /// Create an empty [`Buffer`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The bytes written so far, regardless of the read cursor.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// The bytes not yet consumed by typed reads.
    pub fn rest(&self) -> &[u8] {
        &self.data[self.rpos..]
    }

    /// The number of bytes not yet consumed by typed reads.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.rpos
    }

    /// Consume the buffer into the backing bytes.
    pub fn into_vec(mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    /// Overwrite the backing storage and reset both cursors.
    pub fn clear(&mut self) {
        self.data.zeroize();
        self.data.clear();
        self.rpos = 0;
    }

    fn take(&mut self, len: usize) -> Result<&[u8]> {
        if self.remaining() < len {
            return Err(Error::TruncatedPacket);
        }

        let span = &self.data[self.rpos..self.rpos + len];
        self.rpos += len;

        Ok(span)
    }

    /// Append raw bytes.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Append a `byte`.
    pub fn put_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Append a big-endian `uint32`.
    pub fn put_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    /// Append a `boolean`, as a single octet.
    pub fn put_bool(&mut self, value: bool) {
        self.data.push(value.into());
    }

    /// Append a `string`: a `uint32` length followed by the bytes.
    pub fn put_string(&mut self, bytes: &[u8]) {
        self.put_u32(bytes.len() as u32);
        self.data.extend_from_slice(bytes);
    }

    /// Append an `mpint`: a `string` wrapping the two's-complement bytes.
    pub fn put_mpint(&mut self, value: &MpInt) {
        self.put_string(value.as_bytes());
    }

    /// Append a `name-list`: a `string` of comma-separated names.
    pub fn put_name_list(&mut self, value: &NameList) {
        self.put_string(value.to_string().as_bytes());
    }

    /// Consume `len` raw bytes.
    pub fn get_bytes(&mut self, len: usize) -> Result<&[u8]> {
        self.take(len)
    }

    /// Consume a fixed-size span, as an array.
    pub fn get_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);

        Ok(array)
    }

    /// Consume a `byte`.
    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Consume a big-endian `uint32`.
    pub fn get_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.get_array()?))
    }

    /// Consume a `boolean`; any non-zero octet is `true`.
    pub fn get_bool(&mut self) -> Result<bool> {
        Ok(self.get_u8()? != 0)
    }

    /// Consume a `string`, yielding its bytes.
    pub fn get_string(&mut self) -> Result<Vec<u8>> {
        let len = self.get_u32()?;

        // Mirror of the signed 32-bit length limit of the protocol.
        if len > i32::MAX as u32 {
            return Err(Error::InvalidFormat("string length out of bounds"));
        }

        Ok(self.take(len as usize)?.to_vec())
    }

    /// Consume an `mpint`.
    pub fn get_mpint(&mut self) -> Result<MpInt> {
        let bytes = self.get_string()?;

        if bytes.len() > 1 && bytes[0] == 0 && bytes[1] & 0x80 == 0 {
            return Err(Error::InvalidFormat("mpint with redundant leading zero"));
        }

        Ok(MpInt(bytes))
    }

    /// Consume a `name-list`.
    pub fn get_name_list(&mut self) -> Result<NameList> {
        let bytes = self.get_string()?;
        let names = std::str::from_utf8(&bytes)
            .ok()
            .filter(|names| names.is_ascii())
            .ok_or(Error::InvalidFormat("name-list is not ASCII"))?;

        Ok(NameList(
            names
                .split(',')
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect(),
        ))
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data, rpos: 0 }
    }
}

impl From<&[u8]> for Buffer {
    fn from(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
            rpos: 0,
        }
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}
