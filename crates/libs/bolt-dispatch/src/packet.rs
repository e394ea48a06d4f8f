//! Content-derived packets and their JSON envelope.
//!
//! A packet identifier is the SHA-256 digest of a text rendering of the
//! payload. With [`IdentifierMode::Rendered`] that rendering is whatever the
//! payload's `Serialize` impl emits, so two payloads that differ only in field
//! order get different identifiers. [`IdentifierMode::Canonical`] hashes the
//! payload after conversion to a [`JsonValue`], whose object keys are sorted.
//!
//! The hashed rendering is carried into the envelope verbatim, so a receiver
//! can always recompute the identifier from the payload text it was sent.

use core::fmt;
use core::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};

use crate::error::DispatchError;
use crate::DIGEST_LEN;

/// SHA-256 digest identifying a packet. Displays as 64 lowercase hex chars.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PacketId([u8; DIGEST_LEN]);

impl PacketId {
    pub const fn new(digest: [u8; DIGEST_LEN]) -> Self {
        Self(digest)
    }

    /// Digest of `rendering`, byte for byte.
    pub fn digest(rendering: &str) -> Self {
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(Sha256::new().chain_update(rendering.as_bytes()).finalize().as_slice());
        Self(out)
    }

    pub fn from_hex(input: &str) -> Result<Self, DispatchError> {
        let bytes = hex::decode(input)
            .map_err(|err| DispatchError::malformed(format!("invalid packet id '{input}': {err}")))?;
        if bytes.len() != DIGEST_LEN {
            return Err(DispatchError::malformed(format!(
                "invalid packet id '{input}' (expected {} hex chars)",
                DIGEST_LEN * 2
            )));
        }
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{:0>2x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PacketId({self})")
    }
}

impl FromStr for PacketId {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for PacketId {
    type Error = DispatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<PacketId> for String {
    fn from(id: PacketId) -> Self {
        id.to_hex()
    }
}

/// How the text that gets hashed into a [`PacketId`] is produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierMode {
    /// Compact JSON exactly as the payload serializes itself.
    #[default]
    Rendered,
    /// Compact JSON of the payload converted to a value first (sorted keys).
    Canonical,
}

/// Wire envelope: exactly an `id` and a `payload`, in that order.
///
/// `payload` holds the JSON text exactly as it appeared on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    pub id: PacketId,
    pub payload: Box<RawValue>,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    id: &'a PacketId,
    payload: &'a RawValue,
}

/// Immutable pairing of a payload rendering and its derived identifier.
#[derive(Clone, Debug)]
pub struct Packet {
    id: PacketId,
    payload: Box<RawValue>,
}

impl Packet {
    /// Build a packet whose identifier hashes the payload's own rendering.
    pub fn new<T: Serialize + ?Sized>(payload: &T) -> Result<Self, DispatchError> {
        let payload = serde_json::value::to_raw_value(payload)?;
        Ok(Self { id: PacketId::digest(payload.get()), payload })
    }

    /// Build a packet whose identifier ignores object field order.
    ///
    /// Goes through [`JsonValue`], so payloads it cannot hold (e.g. numbers
    /// beyond `u64`/`i64`/`f64`) are rejected here but accepted by [`Packet::new`].
    pub fn canonical<T: Serialize + ?Sized>(payload: &T) -> Result<Self, DispatchError> {
        let rendering = serde_json::to_value(payload)?.to_string();
        Self::from_raw(RawValue::from_string(rendering)?)
    }

    /// Build a packet from a rendering the caller produced itself.
    ///
    /// `rendering` must parse as JSON; it is hashed and transmitted verbatim
    /// apart from surrounding whitespace.
    pub fn from_rendered(rendering: &str) -> Result<Self, DispatchError> {
        Self::from_raw(RawValue::from_string(rendering.to_owned())?)
    }

    fn from_raw(payload: Box<RawValue>) -> Result<Self, DispatchError> {
        Ok(Self { id: PacketId::digest(payload.get()), payload })
    }

    /// Decode a received envelope. The identifier is checked for shape only;
    /// see [`Packet::verify`].
    pub fn from_envelope(envelope: &str) -> Result<Self, DispatchError> {
        let Envelope { id, payload } = serde_json::from_str::<Envelope>(envelope)
            .map_err(|err| DispatchError::malformed(err.to_string()))?;
        Ok(Self { id, payload })
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    /// The payload JSON text that was hashed (or received).
    pub fn payload_text(&self) -> &str {
        self.payload.get()
    }

    /// Deserialize the payload into `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, DispatchError> {
        Ok(serde_json::from_str(self.payload.get())?)
    }

    /// Compact JSON envelope ready for transmission.
    pub fn envelope(&self) -> Result<String, DispatchError> {
        Ok(serde_json::to_string(&EnvelopeRef { id: &self.id, payload: &self.payload })?)
    }

    /// Whether the identifier is the digest of the payload text.
    ///
    /// Holds for every packet this module builds, and for received envelopes
    /// whose sender hashed the payload it transmitted.
    pub fn verify(&self) -> bool {
        PacketId::digest(self.payload.get()) == self.id
    }

    /// Whether the identifier matches the canonical rendering of the payload.
    ///
    /// Always true for packets built with [`Packet::canonical`]; true for the
    /// other constructors only when their rendering happened to be canonical.
    pub fn is_canonical(&self) -> bool {
        serde_json::from_str::<JsonValue>(self.payload.get())
            .map(|value| PacketId::digest(&value.to_string()) == self.id)
            .unwrap_or(false)
    }

    pub fn into_parts(self) -> (PacketId, Box<RawValue>) {
        (self.id, self.payload)
    }
}

impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.payload.get() == other.payload.get()
    }
}

impl Eq for Packet {}

/// Turns payloads into `(identifier, envelope)` pairs.
#[derive(Clone, Copy, Debug, Default)]
pub struct PacketEncoder {
    mode: IdentifierMode,
}

impl PacketEncoder {
    pub fn new(mode: IdentifierMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> IdentifierMode {
        self.mode
    }

    pub fn packet<T: Serialize + ?Sized>(&self, payload: &T) -> Result<Packet, DispatchError> {
        match self.mode {
            IdentifierMode::Rendered => Packet::new(payload),
            IdentifierMode::Canonical => Packet::canonical(payload),
        }
    }

    pub fn encode<T: Serialize + ?Sized>(
        &self,
        payload: &T,
    ) -> Result<(PacketId, String), DispatchError> {
        let packet = self.packet(payload)?;
        let envelope = packet.envelope()?;
        Ok((packet.id, envelope))
    }
}

/// Encode `payload` with the default [`IdentifierMode::Rendered`].
pub fn encode<T: Serialize + ?Sized>(payload: &T) -> Result<(PacketId, String), DispatchError> {
    PacketEncoder::default().encode(payload)
}
